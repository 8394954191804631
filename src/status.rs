//! HTTP status codes.
//!
//! [`Status`] is a thin wrapper over the numeric code so handlers may set any
//! value a client understands, while the common ones have names:
//!
//! ```rust
//! use waypost::Status;
//!
//! assert_eq!(Status::NOT_FOUND.code(), 404);
//! assert_eq!(Status::from(304).reason(), "Not Modified");
//! assert!(Status::CREATED.is_successful());
//! ```

use std::fmt;

/// A numeric HTTP status code.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Status(u16);

impl Status {
    // ── 2xx ───────────────────────────────────────────────────────────────────
    pub const OK: Status = Status(200);
    pub const CREATED: Status = Status(201);
    pub const ACCEPTED: Status = Status(202);
    pub const NO_CONTENT: Status = Status(204);

    // ── 3xx ───────────────────────────────────────────────────────────────────
    pub const MOVED_PERMANENTLY: Status = Status(301);
    pub const FOUND: Status = Status(302);
    pub const SEE_OTHER: Status = Status(303);
    pub const NOT_MODIFIED: Status = Status(304);
    pub const TEMPORARY_REDIRECT: Status = Status(307);

    // ── 4xx ───────────────────────────────────────────────────────────────────
    pub const BAD_REQUEST: Status = Status(400);
    pub const UNAUTHORIZED: Status = Status(401);
    pub const FORBIDDEN: Status = Status(403);
    pub const NOT_FOUND: Status = Status(404);
    pub const METHOD_NOT_ALLOWED: Status = Status(405);
    pub const UNPROCESSABLE_ENTITY: Status = Status(422);

    // ── 5xx ───────────────────────────────────────────────────────────────────
    pub const INTERNAL_SERVER_ERROR: Status = Status(500);
    pub const SERVICE_UNAVAILABLE: Status = Status(503);

    pub const fn code(self) -> u16 {
        self.0
    }

    /// Reason phrase for the status line; empty for unregistered codes.
    pub fn reason(self) -> &'static str {
        reason_phrase(self.0)
    }

    pub fn is_informational(self) -> bool {
        (100..200).contains(&self.0)
    }

    pub fn is_successful(self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_ok(self) -> bool {
        self.0 == 200
    }

    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.0)
    }

    /// One of the codes that carries a `Location` to follow: 301, 302, 303, 307.
    pub fn is_redirect(self) -> bool {
        matches!(self.0, 301 | 302 | 303 | 307)
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.0)
    }

    pub fn is_forbidden(self) -> bool {
        self.0 == 403
    }

    pub fn is_not_found(self) -> bool {
        self.0 == 404
    }

    pub fn is_server_error(self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Codes whose response carries no entity: 201, 204, 304.
    pub fn is_empty(self) -> bool {
        matches!(self.0, 201 | 204 | 304)
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.0
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}

fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        226 => "IM Used",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _   => "",
    }
}
