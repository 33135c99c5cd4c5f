//! Witness type for confidence values bounded to [0.0, 1.0].
//!
//! # What Confidence Actually Means Here
//!
//! Different extraction tiers compute confidence in different ways, and the
//! numbers are calibrated against each other only loosely:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ EXACT / ALIAS LOOKUP: "The token is literally in the lexicon."   │
//! │   0.90-0.95. Deterministic; wrong only when the lexicon is.      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ PATTERN MATCH: "A compiled rule fired and its validator agreed." │
//! │   0.85-0.95, optionally scaled by the rule's running precision.  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ PHRASE / WINDOW MATCH: "A 1-3 token window hit the lexicon."     │
//! │   0.80-0.85. More surface area for coincidental hits.            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ INFERENCE / DEFAULT: "Guessed from an adjacent field."           │
//! │   0.30-0.80. Explicitly low; callers see the method tag.         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scorer reconciles these via per-method reliability multipliers; the
//! one thing every tier agrees on is the [0, 1] range, which this type
//! guarantees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A confidence score guaranteed to be in the range [0.0, 1.0].
///
/// This is a "witness type" - its existence proves the value is valid.
/// Once you have a `Confidence`, you never need to check bounds again.
///
/// # Construction
///
/// - [`Confidence::new`]: Returns `None` if out of range (strict parsing)
/// - [`Confidence::saturating`]: Clamps to [0, 1] (lenient, never fails)
/// - [`Confidence::try_from`]: Returns `Err` if out of range
///
/// # Zero-Cost Abstraction
///
/// `Confidence` is `#[repr(transparent)]`, meaning it has the exact same
/// memory layout as `f64`. There is no runtime overhead.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// The minimum valid confidence value.
    pub const MIN: Self = Self(0.0);

    /// The maximum valid confidence value.
    pub const MAX: Self = Self(1.0);

    /// A "no information" confidence of 0.5 (maximum entropy).
    pub const UNCERTAIN: Self = Self(0.5);

    /// Create a confidence score, returning `None` if out of range.
    #[must_use]
    #[inline]
    pub fn new(value: f64) -> Option<Self> {
        if (0.0..=1.0).contains(&value) && !value.is_nan() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a confidence score, clamping to [0.0, 1.0].
    ///
    /// NaN is treated as 0.0.
    #[must_use]
    #[inline]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Get the inner value (guaranteed to be in [0.0, 1.0]).
    #[must_use]
    #[inline]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Check if this is "high confidence" (>= 0.9).
    #[must_use]
    #[inline]
    pub fn is_high(self) -> bool {
        self.0 >= 0.9
    }

    /// Check if this is "low confidence" (< 0.5).
    #[must_use]
    #[inline]
    pub fn is_low(self) -> bool {
        self.0 < 0.5
    }

    /// Scale by a reliability multiplier in [0, 1], saturating.
    #[must_use]
    #[inline]
    pub fn scaled(self, multiplier: f64) -> Self {
        Self::saturating(self.0 * multiplier)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::UNCERTAIN
    }
}

impl fmt::Debug for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Confidence({:.4})", self.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Error when trying to create a Confidence from an invalid value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceError {
    /// The invalid value that was provided.
    pub value: f64,
}

impl fmt::Display for ConfidenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "confidence value {} is outside valid range [0.0, 1.0]",
            self.value
        )
    }
}

impl std::error::Error for ConfidenceError {}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ConfidenceError { value })
    }
}

impl From<Confidence> for f64 {
    #[inline]
    fn from(conf: Confidence) -> Self {
        conf.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid() {
        assert!(Confidence::new(0.0).is_some());
        assert!(Confidence::new(0.5).is_some());
        assert!(Confidence::new(1.0).is_some());
    }

    #[test]
    fn new_invalid() {
        assert!(Confidence::new(-0.1).is_none());
        assert!(Confidence::new(1.1).is_none());
        assert!(Confidence::new(f64::NAN).is_none());
        assert!(Confidence::new(f64::INFINITY).is_none());
    }

    #[test]
    fn saturating_clamps() {
        assert_eq!(Confidence::saturating(0.5).get(), 0.5);
        assert_eq!(Confidence::saturating(-1.0).get(), 0.0);
        assert_eq!(Confidence::saturating(2.0).get(), 1.0);
        assert_eq!(Confidence::saturating(f64::NAN).get(), 0.0);
    }

    #[test]
    fn scaled_stays_bounded() {
        let conf = Confidence::new(0.9).unwrap();
        assert!((conf.scaled(0.9).get() - 0.81).abs() < 1e-10);
        assert_eq!(conf.scaled(2.0).get(), 1.0);
    }

    #[test]
    fn serde_roundtrip() {
        let conf = Confidence::new(0.85).unwrap();
        let json = serde_json::to_string(&conf).unwrap();
        assert_eq!(json, "0.85");
        let restored: Confidence = serde_json::from_str(&json).unwrap();
        assert!((restored.get() - 0.85).abs() < 1e-10);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn saturating_always_valid(value in -10.0f64..10.0) {
            let conf = Confidence::saturating(value);
            prop_assert!(conf.get() >= 0.0);
            prop_assert!(conf.get() <= 1.0);
        }

        #[test]
        fn new_rejects_invalid(value in -10.0f64..10.0) {
            let result = Confidence::new(value);
            if (0.0..=1.0).contains(&value) && !value.is_nan() {
                prop_assert!(result.is_some());
            } else {
                prop_assert!(result.is_none());
            }
        }

        #[test]
        fn scaled_bounded(value in 0.0f64..=1.0, mult in -2.0f64..3.0) {
            let conf = Confidence::new(value).unwrap();
            let scaled = conf.scaled(mult);
            prop_assert!(scaled.get() >= 0.0);
            prop_assert!(scaled.get() <= 1.0);
        }
    }
}
