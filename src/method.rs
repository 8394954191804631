//! HTTP method as a typed enum.
//!
//! Routes are stored per method. A registration names a `|`-delimited method
//! set (`"GET|HEAD"`), parsed once by [`Method::parse_set`].

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// The verbs `App::all` registers under.
    pub const ANY: &'static str = "GET|POST|PUT|DELETE|OPTIONS|PATCH|HEAD";

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }

    /// Parses a `|`-delimited method set such as `"GET|POST"`.
    ///
    /// Surrounding whitespace is ignored, duplicates are kept once, and the
    /// order of first appearance is preserved.
    pub fn parse_set(set: &str) -> Result<Vec<Method>, Error> {
        let mut methods = Vec::new();
        for verb in set.split('|').map(str::trim) {
            let method = verb.parse::<Method>()?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        Ok(methods)
    }

    /// Methods a POST may be rewritten to through the override header.
    pub fn is_override_target(self) -> bool {
        matches!(self, Self::Put | Self::Delete | Self::Patch)
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(Error::UnknownMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
