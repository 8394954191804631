//! Incoming HTTP request type.

use bytes::Bytes;

/// An incoming HTTP request, as handed over by the host.
///
/// `uri` is the raw request target (path plus optional query string).
/// `script_name` is the entry-script path of sub-directory deployments; the
/// directory part of it becomes the default base path stripped from `uri`.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) uri: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) script_name: String,
}

impl Request {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Builder-style header append. Repeated names are kept in order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// The raw method as received, before HEAD or override rewriting.
    pub fn method(&self) -> &str { &self.method }
    pub fn uri(&self) -> &str { &self.uri }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn script_name(&self) -> &str { &self.script_name }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The query string without the leading `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, q)| q)
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Directory of the script name with a trailing `/`.
    ///
    /// `/app/index.php` gives `/app/`; an empty script name gives `/`.
    pub fn script_dir(&self) -> String {
        let mut parts: Vec<&str> = self.script_name.split('/').collect();
        parts.pop();
        format!("{}/", parts.join("/"))
    }
}
