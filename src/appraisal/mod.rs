//! Appraisal requests against a vision model.
//!
//! This module provides the provider seam, the Gemini client, prompt
//! construction and the single-pass dispatcher.

pub mod client;
pub mod dispatcher;
pub mod prompt;

#[cfg(test)]
pub mod testing;

pub use client::{GeminiClient, GeminiConfig, VisionProvider};
pub use dispatcher::{AnalysisDispatcher, DEFAULT_MAX_IMAGES};
