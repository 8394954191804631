//! Route patterns.
//!
//! A pattern is a regular expression over the normalized request path in
//! which every `/{name}` segment stands for a lazy `/(.*?)` wildcard. Raw
//! groups such as `/(\d+)` are allowed too; every capture group becomes one
//! positional parameter. Literal segments are regex source as well, so
//! metacharacters in them stay live: `/file.txt` also matches `/fileXtxt`.
//! Escape them (`/file\.txt`) to match literally.
//!
//! Adjacent wildcards are ambiguous under lazy matching, so a parameter is
//! cut at the start of the following group rather than taken verbatim from
//! its own capture:
//!
//! ```rust
//! use waypost::Pattern;
//!
//! let p = Pattern::new("/a/{x}/{y}/b").unwrap();
//! let params = p.captures("/a/1/2/b").unwrap();
//! assert_eq!(params.get(0), Some("1"));
//! assert_eq!(params.get(1), Some("2"));
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\{(.*?)\}").expect("placeholder regex is valid")
});

/// A compiled route pattern.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source`, anchoring it to the whole path.
    ///
    /// The empty pattern is treated as `/`.
    pub fn new(source: &str) -> Result<Self, Error> {
        let source = if source.is_empty() { "/" } else { source };
        let body = PLACEHOLDER.replace_all(source, "/(.*?)");
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| Error::Pattern {
            pattern: source.to_owned(),
            source: e,
        })?;
        Ok(Self { source: source.to_owned(), regex })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches a normalized path and extracts the positional parameters.
    ///
    /// A parameter whose group is followed by another participating group
    /// ends where that group starts; otherwise it is the group's own text.
    /// Both are trimmed of `/`. Groups that did not participate yield `None`.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let groups: Vec<_> = caps.iter().skip(1).collect();

        let values = groups.iter().enumerate().map(|(i, group)| {
            let group = (*group)?;
            let end = match groups.get(i + 1).copied().flatten() {
                Some(next) if next.start() >= group.start() => next.start().min(group.end()),
                _ => group.end(),
            };
            Some(path[group.start()..end].trim_matches('/').to_owned())
        });

        Some(Params(values.collect()))
    }

    /// Whether `path` matches, without extracting parameters.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// Positional route parameters, in capture-group order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<Option<String>>);

impl Params {
    /// Builds parameters by hand, for calling a handler outside routing.
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    /// The `i`-th parameter, if it exists and captured anything.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.0.get(i).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.0.iter().map(|v| v.as_deref())
    }
}
