//! Field normalizers for loosely typed trip attributes.
//!
//! Callers send the same logical value in several spellings ("oui", "1", 1,
//! "OUI"). Everything here reduces a raw token to the single spelling the
//! model was fit on. Apart from distance, nothing is rejected: unreadable
//! input falls back to a default and the fallback is logged.

use crate::error::ValidationError;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use std::fmt;
use tracing::warn;

pub const YES: &str = "oui";
pub const NO: &str = "non";

/// Weekday names, indexed from Monday = 0.
pub const JOURS: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];

/// A scalar JSON value as the caller sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawToken {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl RawToken {
    /// Textual form used for lookups. Integral floats keep their `.0`, so
    /// `1.0` never reads as `"1"`.
    pub fn to_text(&self) -> String {
        match self {
            RawToken::Int(n) => n.to_string(),
            RawToken::Float(f) => format!("{f:?}"),
            RawToken::Bool(b) => b.to_string(),
            RawToken::Text(s) => s.clone(),
        }
    }

    /// Integer reading of the token, if it has one. Booleans read as 0/1.
    fn as_index(&self) -> Option<i64> {
        match self {
            RawToken::Int(n) => Some(*n),
            RawToken::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            RawToken::Float(_) => None,
            RawToken::Text(s) => s.trim().parse().ok(),
            RawToken::Bool(b) => Some(i64::from(*b)),
        }
    }
}

impl From<&str> for RawToken {
    fn from(s: &str) -> Self {
        RawToken::Text(s.to_string())
    }
}

impl<'de> Deserialize<'de> for RawToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokenVisitor;

        impl<'de> Visitor<'de> for TokenVisitor {
            type Value = RawToken;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, a number or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawToken, E> {
                Ok(RawToken::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawToken, E> {
                Ok(RawToken::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawToken, E> {
                Ok(i64::try_from(v).map_or_else(|_| RawToken::Text(v.to_string()), RawToken::Int))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawToken, E> {
                Ok(RawToken::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawToken, E> {
                Ok(RawToken::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RawToken, E> {
                Ok(RawToken::Text(v))
            }
        }

        deserializer.deserialize_any(TokenVisitor)
    }
}

/// Maps a boolean-like token to `"oui"` / `"non"`. Anything unrecognised is `"non"`.
pub fn yes_no(field: &'static str, raw: &RawToken) -> &'static str {
    let text = raw.to_text().to_lowercase();
    match text.as_str() {
        "oui" | "1" => YES,
        "non" | "0" => NO,
        _ => {
            warn!(field, raw = %text, "unrecognised yes/no value, using \"non\"");
            NO
        }
    }
}

/// Maps an index 0-6 to its weekday name; anything else is lower-cased and
/// passed through. `true`/`false` count as indices 1/0.
pub fn weekday(raw: &RawToken) -> String {
    if let Some(n) = raw.as_index() {
        if let Ok(i) = usize::try_from(n) {
            if let Some(name) = JOURS.get(i) {
                return (*name).to_string();
            }
        }
    }

    let lowered = raw.to_text().to_lowercase();
    if !JOURS.contains(&lowered.as_str()) {
        warn!(field = "jour_semaine", raw = %lowered, "unknown weekday passed through");
    }
    lowered
}

/// Formats an hour as `HH:MM`. Values already containing `:` are kept.
pub fn hour(raw: &RawToken) -> String {
    let text = raw.to_text();
    let text = text.trim();

    let formatted = if text.contains(':') {
        text.to_string()
    } else {
        format!("{}:00", zero_pad(text, 2))
    };

    if !is_clock_time(&formatted) {
        warn!(field = "heure", raw = %text, formatted = %formatted, "hour outside 00:00-23:59");
    }
    formatted
}

/// Distance in kilometres; the only field with a rejection path besides the
/// road condition enum.
pub fn distance_km(raw: &RawToken) -> Result<f64, ValidationError> {
    const FIELD: &str = "distance_km";

    let value = match raw {
        RawToken::Int(n) => *n as f64,
        RawToken::Float(f) => *f,
        RawToken::Text(s) => s.trim().parse::<f64>().map_err(|_| ValidationError::NotANumber {
            field: FIELD,
            raw: s.clone(),
        })?,
        RawToken::Bool(_) => {
            return Err(ValidationError::NotANumber { field: FIELD, raw: raw.to_text() })
        }
    };

    if !value.is_finite() {
        return Err(ValidationError::NotANumber { field: FIELD, raw: raw.to_text() });
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field: FIELD, value });
    }
    // The model reads f32; the value must still be finite and non-zero there.
    let narrowed = value as f32;
    if !narrowed.is_finite() || narrowed <= 0.0 {
        return Err(ValidationError::OutOfRange { field: FIELD, value });
    }
    Ok(value)
}

/// Free-text place identifier, unchanged.
pub fn location(raw: &RawToken) -> String {
    raw.to_text()
}

// Left-pads with zeros, keeping a leading sign in front.
fn zero_pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let pad = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{sign}{pad}{}", &s[1..]),
        _ => format!("{pad}{s}"),
    }
}

fn is_clock_time(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    matches!((h.parse::<u8>(), m.parse::<u8>()), (Ok(h), Ok(m)) if h < 24 && m < 60)
}
