//! String format predicates.
//!
//! Each [`Format`] is a fixed-grammar regular expression plus range checks on
//! the captured fields. The checks are stateless and independent of the rest
//! of the engine; the string validator calls them for the `format` constraint.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// A supported string format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    DateTime,
    Date,
    Time,
    Hostname,
    Email,
    Ipv4,
    Ipv6,
    Uri,
}

impl Format {
    /// Returns the format's name as written in schema definitions.
    pub fn name(&self) -> &'static str {
        match self {
            Format::DateTime => "date-time",
            Format::Date => "date",
            Format::Time => "time",
            Format::Hostname => "hostname",
            Format::Email => "email",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uri => "uri",
        }
    }

    /// Returns true if `value` conforms to this format.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Format::DateTime => is_date_time(value),
            Format::Date => is_date(value),
            Format::Time => is_time(value),
            Format::Hostname => is_hostname(value),
            Format::Email => is_email(value),
            Format::Ipv4 => is_ipv4(value),
            Format::Ipv6 => is_ipv6(value),
            Format::Uri => is_uri(value),
        }
    }

    /// Checks `value`, failing with [`FormatError::Mismatch`].
    pub fn check(&self, value: &str) -> Result<(), FormatError> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(FormatError::Mismatch {
                format: self.name(),
                value: value.to_string(),
            })
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "date-time" => Ok(Format::DateTime),
            "date" => Ok(Format::Date),
            "time" => Ok(Format::Time),
            "hostname" => Ok(Format::Hostname),
            "email" => Ok(Format::Email),
            "ipv4" => Ok(Format::Ipv4),
            "ipv6" => Ok(Format::Ipv6),
            "uri" => Ok(Format::Uri),
            other => Err(FormatError::Unknown(other.to_string())),
        }
    }
}

/// Errors raised by format checking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The string does not conform to the format.
    #[error("'{value}' is not a valid {format}")]
    Mismatch { format: &'static str, value: String },

    /// The format name is not recognised.
    #[error("unknown format '{0}'")]
    Unknown(String),
}

/// Checks `value` against the format called `name`.
///
/// # Example
///
/// ```rust
/// use schemata::{validate_format, FormatError};
///
/// assert!(validate_format("date", "2024-02-29").is_ok());
/// assert!(validate_format("date", "2023-02-29").is_err());
/// assert!(matches!(validate_format("color", "red"), Err(FormatError::Unknown(_))));
/// ```
pub fn validate_format(name: &str, value: &str) -> Result<(), FormatError> {
    name.parse::<Format>()?.check(value)
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in format pattern compiles"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(\d{4})-(\d{2})-(\d{2})$")
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?(?:[Zz]|([+-])(\d{2}):(\d{2}))?$",
    )
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$")
}

fn local_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$",
    )
}

fn uri_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^[A-Za-z][A-Za-z0-9+.-]*:[^\s]*$")
}

fn field(caps: &regex::Captures<'_>, i: usize) -> u32 {
    caps.get(i)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(u32::MAX)
}

fn is_date(value: &str) -> bool {
    let Some(caps) = date_re().captures(value) else {
        return false;
    };
    let year = field(&caps, 1) as i32;
    NaiveDate::from_ymd_opt(year, field(&caps, 2), field(&caps, 3)).is_some()
}

fn is_time(value: &str) -> bool {
    let Some(caps) = time_re().captures(value) else {
        return false;
    };
    let in_range = field(&caps, 1) <= 23 && field(&caps, 2) <= 59 && field(&caps, 3) <= 60;
    let offset_ok = caps.get(4).is_none() || (field(&caps, 5) <= 23 && field(&caps, 6) <= 59);
    in_range && offset_ok
}

fn is_date_time(value: &str) -> bool {
    match value.find(['T', 't', ' ']) {
        Some(split) => is_date(&value[..split]) && is_time(&value[split + 1..]),
        None => false,
    }
}

fn is_hostname(value: &str) -> bool {
    let trimmed = value.strip_suffix('.').unwrap_or(value);
    !trimmed.is_empty()
        && trimmed.len() <= 253
        && trimmed
            .split('.')
            .all(|label| label.len() <= 63 && label_re().is_match(label))
}

fn is_email(value: &str) -> bool {
    match value.rsplit_once('@') {
        Some((local, domain)) => {
            local.len() <= 64 && local_part_re().is_match(local) && is_hostname(domain)
        }
        None => false,
    }
}

fn is_ipv4(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.len() <= 3
                && octet.bytes().all(|b| b.is_ascii_digit())
                && (octet.len() == 1 || !octet.starts_with('0'))
                && octet.parse::<u16>().is_ok_and(|n| n <= 255)
        })
}

fn is_hex_group(group: &str) -> bool {
    (1..=4).contains(&group.len()) && group.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Counts the 16-bit groups in one side of an IPv6 address, allowing an
/// embedded IPv4 suffix on the last group when `tail` is set.
fn ipv6_groups(part: &str, tail: bool) -> Option<usize> {
    if part.is_empty() {
        return Some(0);
    }
    let groups: Vec<&str> = part.split(':').collect();
    let last = groups.len() - 1;
    let mut count = 0;
    for (i, group) in groups.iter().enumerate() {
        if i == last && tail && group.contains('.') {
            if !is_ipv4(group) {
                return None;
            }
            count += 2;
        } else if is_hex_group(group) {
            count += 1;
        } else {
            return None;
        }
    }
    Some(count)
}

fn is_ipv6(value: &str) -> bool {
    match value.split_once("::") {
        Some((head, tail)) => {
            if tail.contains("::") {
                return false;
            }
            match (ipv6_groups(head, false), ipv6_groups(tail, true)) {
                (Some(h), Some(t)) => h + t < 8,
                _ => false,
            }
        }
        None => ipv6_groups(value, true) == Some(8),
    }
}

fn is_uri(value: &str) -> bool {
    uri_re().is_match(value)
}
