//! Witness types that encode invariants in the type system.
//!
//! Every confidence value produced by an extractor or the scorer passes
//! through [`Confidence`], so downstream code never re-checks bounds.

mod confidence;

pub use confidence::{Confidence, ConfidenceError};

/// Static assertions for struct layouts.
#[doc(hidden)]
pub mod static_checks {
    use super::*;

    // Confidence is zero-cost (same size as f64)
    const _: () = assert!(std::mem::size_of::<Confidence>() == std::mem::size_of::<f64>());
    const _: () = assert!(std::mem::align_of::<Confidence>() == std::mem::align_of::<f64>());
}
