//! Outgoing HTTP response, built up while a request is dispatched.
//!
//! One [`Response`] is threaded through the middleware chain and the router
//! inside the [`Context`](crate::Context). Handlers append to its body,
//! middleware may rewrite any part of it on the way out, and the host sends
//! whatever [`Response::finalize`] yields.

use bytes::{Bytes, BytesMut};
use http_body_util::Full;

use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Body formats handlers commonly produce. Anything else goes through
/// [`Response::header`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// The default for every response.
    Html,
    Json,
    Text,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── Headers ───────────────────────────────────────────────────────────────────

/// Ordered, multi-valued header collection with case-insensitive names.
///
/// A value may hold several lines separated by `\n`; each line is sent as its
/// own header field (see [`Headers::lines`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every value of `name` with `value`, keeping the first slot.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(i) => {
                self.0[i].1 = value;
                let mut seen = 0;
                self.0.retain(|(k, _)| {
                    if k.eq_ignore_ascii_case(name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.0.push((name.to_owned(), value)),
        }
    }

    /// Adds a value without touching existing ones.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_owned(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Header fields as emitted: newline-delimited values become repeated lines.
    pub fn lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(k, v)| v.split('\n').map(move |line| (k.as_str(), line)))
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// The response under construction.
///
/// Defaults to `200 OK`, `Content-Type: text/html; charset=utf-8` and an
/// empty body.
#[derive(Clone, Debug)]
pub struct Response {
    status: Status,
    headers: Headers,
    body: BytesMut,
}

impl Response {
    pub fn new() -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", ContentType::Html.as_str());
        Self { status: Status::OK, headers, body: BytesMut::new() }
    }

    pub fn status(&self) -> Status { self.status }
    pub fn headers(&self) -> &Headers { &self.headers }
    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, status: impl Into<Status>) {
        self.status = status.into();
    }

    pub fn header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn content_type(&mut self, content_type: ContentType) {
        self.headers.set("Content-Type", content_type.as_str());
    }

    /// Appends to the body buffer.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Replaces the body buffer.
    pub fn set_body(&mut self, body: impl AsRef<[u8]>) {
        self.body.clear();
        self.body.extend_from_slice(body.as_ref());
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Drops everything written after `len` bytes. Used to discard the output
    /// of a buffering scope that opened at `len`.
    pub fn truncate_body(&mut self, len: usize) {
        self.body.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Points the client at `url` with `status` (usually 302).
    pub fn redirect(&mut self, url: &str, status: impl Into<Status>) {
        self.set_status(status);
        self.headers.set("Location", url);
    }

    /// Freezes the response into what the host sends.
    ///
    /// 204 and 304 responses lose `Content-Type`, `Content-Length` and any body.
    pub fn finalize(mut self) -> Finalized {
        if matches!(self.status.code(), 204 | 304) {
            self.headers.remove("Content-Type");
            self.headers.remove("Content-Length");
            self.body.clear();
        }
        Finalized {
            status: self.status,
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

// ── Finalized ─────────────────────────────────────────────────────────────────

/// `(status, headers, body)` ready to be emitted.
#[derive(Clone, Debug)]
pub struct Finalized {
    pub status: Status,
    pub headers: Headers,
    pub body: Bytes,
}

impl Finalized {
    /// Drops the body, keeping status and headers (HEAD requests).
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }

    /// Converts into an `http` response for hyper.
    ///
    /// A header line or status code that `http` rejects turns the whole
    /// response into an empty 500.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status.code());
        for (name, value) in self.headers.lines() {
            builder = builder.header(name, value);
        }
        match builder.body(Full::new(self.body)) {
            Ok(res) => res,
            Err(e) => {
                tracing::error!("invalid response head: {e}");
                let mut res = http::Response::new(Full::new(Bytes::new()));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}
