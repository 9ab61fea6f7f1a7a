//! Appraisal text analysis.
//!
//! Extraction turns model prose into a verdict; aggregation ranks the
//! verdicts into a digest.

pub mod aggregator;
pub mod extractor;

pub use aggregator::*;
pub use extractor::extract;
