//! Wire protocol helpers for the TCP-to-serial gateways.
//!
//! The protocol is a single command/response shape: an ASCII command
//! terminated by `\r`, answered by an ASCII response terminated by `\r`
//! that contains one extractable number. There is no framing beyond the
//! terminator; robustness comes from read timeouts and permissive
//! numeric extraction.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// The response carried no extractable numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    raw: String,
}

impl ParseError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw response the number could not be extracted from.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no numeric value in response: {:?}", self.raw)
    }
}

impl std::error::Error for ParseError {}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?(?:\d+\.\d+|\.\d+|\d+)").expect("valid number pattern"));

/// Extract the first floating-point-looking token from a raw device
/// response.
///
/// Everything except digits, `.`, `-` and `+` is treated as a separator,
/// so prefixes and unit suffixes are tolerated:
///
/// ```
/// # use sensor_monitoring::protocol::extract_value;
/// assert_eq!(extract_value("TEMP=23.5 C\r").unwrap(), 23.5);
/// assert_eq!(extract_value("  -4 \r").unwrap(), -4.0);
/// assert!(extract_value("no data").is_err());
/// ```
pub fn extract_value(raw: &str) -> Result<f64, ParseError> {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let token = NUMBER
        .find(&cleaned)
        .ok_or_else(|| ParseError::new(raw))?
        .as_str();

    token.parse::<f64>().map_err(|_| ParseError::new(raw))
}

/// Append the protocol terminator to a command if it is not already
/// present. Commands are stored without the terminator in configuration
/// (`"TE"`), but some entries carry it (`"DR\r"`); both are accepted.
pub fn frame_command(command: &str) -> String {
    if command.ends_with('\r') {
        command.to_owned()
    } else {
        format!("{command}\r")
    }
}
