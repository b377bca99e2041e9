//! Parsing of the rendezvous `CONNECT <host> <port>` redirect.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Resource endpoint named by a rendezvous redirect.
///
/// Host and port are kept verbatim; connecting surfaces invalid values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedirectTarget {
    host: String,
    port: String,
}

impl RedirectTarget {
    /// Creates a target from its host and port tokens.
    #[must_use]
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// Resource host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resource port, as sent by the rendezvous endpoint.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

impl FromStr for RedirectTarget {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_redirect(line)
    }
}

/// Extracts the second and third whitespace-separated tokens of `line`.
///
/// The leading keyword is not checked and extra tokens are ignored.
///
/// # Errors
///
/// Returns [`ParseError::IncompleteRedirect`] when fewer than three tokens
/// are present.
pub fn parse_redirect(line: &str) -> Result<RedirectTarget, ParseError> {
    let mut tokens = line.split_whitespace().skip(1);
    match (tokens.next(), tokens.next()) {
        (Some(host), Some(port)) => Ok(RedirectTarget::new(host, port)),
        _ => Err(ParseError::IncompleteRedirect {
            line: line.trim_end().to_owned(),
        }),
    }
}
