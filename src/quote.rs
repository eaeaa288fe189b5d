//! Turns a raw model output into the fare shown to the caller.

use crate::error::InferenceError;

pub const RANGE_LOW: f64 = 0.9;
pub const RANGE_HIGH: f64 = 1.15;

pub const ALL_KNOWN: &str = "Tout connu";
pub const SOME_UNKNOWN: &str = "⚠️ Certains lieux peuvent être inconnus → prix approximatif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareQuote {
    pub estimate: i64,
    pub min: i64,
    pub max: i64,
}

impl FareQuote {
    /// Rounds to the nearest FCFA (ties to even) after clamping negatives
    /// to zero. The band is asymmetric: overshoot is likelier than
    /// undershoot.
    pub fn from_raw(raw: f64) -> Result<Self, InferenceError> {
        if !raw.is_finite() {
            return Err(InferenceError::NonFinite(raw));
        }
        let estimate = raw.max(0.0).round_ties_even();
        // i64 bound checked on the upper edge of the band
        if estimate * RANGE_HIGH >= i64::MAX as f64 {
            return Err(InferenceError::Overflow(raw));
        }

        Ok(Self {
            estimate: estimate as i64,
            min: (estimate * RANGE_LOW).floor() as i64,
            max: (estimate * RANGE_HIGH).floor() as i64,
        })
    }

    pub fn range_label(&self) -> String {
        format!("{} - {} FCFA", self.min, self.max)
    }
}

pub fn location_advisory(all_known: bool) -> &'static str {
    if all_known {
        ALL_KNOWN
    } else {
        SOME_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_brackets_the_estimate() {
        for raw in [0.0, 1.0, 7.4, 99.5, 1234.56, 2150.0, 18_000.2, 250_000.0] {
            let q = FareQuote::from_raw(raw).unwrap();
            let e = q.estimate as f64;
            assert_eq!(q.min, (e * 0.9).floor() as i64);
            assert_eq!(q.max, (e * 1.15).floor() as i64);
            assert!(q.min <= q.estimate && q.estimate <= q.max, "{q:?}");
        }
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(FareQuote::from_raw(2150.5).unwrap().estimate, 2150);
        assert_eq!(FareQuote::from_raw(2151.5).unwrap().estimate, 2152);
        assert_eq!(FareQuote::from_raw(2150.4).unwrap().estimate, 2150);
    }

    #[test]
    fn negative_output_is_clamped() {
        let q = FareQuote::from_raw(-320.0).unwrap();
        assert_eq!(q, FareQuote { estimate: 0, min: 0, max: 0 });
        assert_eq!(q.range_label(), "0 - 0 FCFA");
    }

    #[test]
    fn label_format() {
        let q = FareQuote { estimate: 2000, min: 1800, max: 2300 };
        assert_eq!(q.range_label(), "1800 - 2300 FCFA");
    }

    #[test]
    fn unusable_outputs_are_errors() {
        assert!(matches!(FareQuote::from_raw(f64::NAN), Err(InferenceError::NonFinite(_))));
        assert!(matches!(FareQuote::from_raw(f64::INFINITY), Err(InferenceError::NonFinite(_))));
        assert!(matches!(FareQuote::from_raw(1e19), Err(InferenceError::Overflow(_))));
    }

    #[test]
    fn advisory_text() {
        assert_eq!(location_advisory(true), "Tout connu");
        assert!(location_advisory(false).contains("inconnus"));
    }
}
