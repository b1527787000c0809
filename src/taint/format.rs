//! Formats revealed by failed parses, and synthesis of values that match them.

use crate::rng::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

// Wider requests are almost certainly garbage from the producer.
const MAX_DIGITS: usize = 64;

/// The format a target expected when it parsed or validated a taint value.
///
/// Wire names are `integer`, `decimal`, `boolean`, `digits:N`, `uuid` and
/// `date`; anything else is kept as [`FormatTag::Unknown`].
///
/// ```
/// use taintfit::FormatTag;
///
/// assert_eq!(FormatTag::from("digits:4"), FormatTag::Digits(4));
/// assert_eq!(FormatTag::from("ipv6"), FormatTag::Unknown("ipv6".into()));
/// assert_eq!(FormatTag::Digits(4).to_string(), "digits:4");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatTag {
    /// A base-ten integer.
    Integer,
    /// A base-ten number with a fractional part.
    Decimal,
    /// `true` or `false`.
    Boolean,
    /// Exactly this many decimal digits.
    Digits(usize),
    /// A hyphenated UUID.
    Uuid,
    /// An ISO-8601 calendar date, `YYYY-MM-DD`.
    Date,
    /// A format this crate cannot synthesize values for.
    Unknown(String),
}

impl FormatTag {
    /// Synthesize a value matching this format.
    ///
    /// Returns `None` for unknown formats, and for digit strings longer than
    /// this crate is willing to synthesize.
    pub fn synthesize(&self, rng: &mut Rng) -> Option<String> {
        let value = match self {
            FormatTag::Integer => rng.gen_i64_in(0, 9_999).to_string(),
            FormatTag::Decimal => {
                format!("{}.{}", rng.gen_i64_in(0, 999), rng.gen_digits(2))
            }
            FormatTag::Boolean => rng.gen_bool().to_string(),
            FormatTag::Digits(len) if *len > MAX_DIGITS => return None,
            FormatTag::Digits(len) => rng.gen_digits(*len),
            FormatTag::Uuid => {
                let variant = ['8', '9', 'a', 'b'][rng.gen_index(4)?];
                format!(
                    "{}-{}-4{}-{}{}-{}",
                    rng.gen_hex(8),
                    rng.gen_hex(4),
                    rng.gen_hex(3),
                    variant,
                    rng.gen_hex(3),
                    rng.gen_hex(12),
                )
            }
            FormatTag::Date => format!(
                "{:04}-{:02}-{:02}",
                rng.gen_i64_in(2000, 2030),
                rng.gen_i64_in(1, 12),
                rng.gen_i64_in(1, 28),
            ),
            FormatTag::Unknown(_) => return None,
        };
        Some(value)
    }

    /// Does `value` already satisfy this format?
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FormatTag::Integer => {
                let digits = value.strip_prefix('-').unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            FormatTag::Decimal => value.parse::<f64>().map_or(false, f64::is_finite),
            FormatTag::Boolean => value == "true" || value == "false",
            FormatTag::Digits(len) => {
                value.len() == *len && value.bytes().all(|b| b.is_ascii_digit())
            }
            FormatTag::Uuid => {
                let groups: Vec<&str> = value.split('-').collect();
                groups.len() == 5
                    && groups
                        .iter()
                        .zip([8, 4, 4, 4, 12])
                        .all(|(g, n)| g.len() == n && g.bytes().all(|b| b.is_ascii_hexdigit()))
            }
            FormatTag::Date => {
                let bytes = value.as_bytes();
                bytes.len() == 10
                    && bytes[4] == b'-'
                    && bytes[7] == b'-'
                    && bytes
                        .iter()
                        .enumerate()
                        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
            }
            FormatTag::Unknown(_) => false,
        }
    }
}

impl From<&str> for FormatTag {
    fn from(s: &str) -> Self {
        match s {
            "integer" => FormatTag::Integer,
            "decimal" => FormatTag::Decimal,
            "boolean" => FormatTag::Boolean,
            "uuid" => FormatTag::Uuid,
            "date" => FormatTag::Date,
            other => match other.strip_prefix("digits:").and_then(|n| n.parse().ok()) {
                Some(len) => FormatTag::Digits(len),
                None => FormatTag::Unknown(other.to_string()),
            },
        }
    }
}

impl From<String> for FormatTag {
    fn from(s: String) -> Self {
        match FormatTag::from(s.as_str()) {
            FormatTag::Unknown(_) => FormatTag::Unknown(s),
            known => known,
        }
    }
}

impl From<FormatTag> for String {
    fn from(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Unknown(name) => name,
            known => known.to_string(),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Integer => f.write_str("integer"),
            FormatTag::Decimal => f.write_str("decimal"),
            FormatTag::Boolean => f.write_str("boolean"),
            FormatTag::Digits(len) => write!(f, "digits:{len}"),
            FormatTag::Uuid => f.write_str("uuid"),
            FormatTag::Date => f.write_str("date"),
            FormatTag::Unknown(name) => f.write_str(name),
        }
    }
}
