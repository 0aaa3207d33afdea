//! Deterministic keyword NLU for user utterances.
//!
//! No external model: intent comes from an ordered keyword table, sentiment
//! from keyword counts with punctuation/caps/history adjustments, and
//! repetition from normalized-text similarity against recent queries. English
//! and Hindi (Devanagari + transliterated) phrases are matched the same way.

pub mod analyzer;
pub mod keywords;
pub mod sanitize;
pub mod similarity;

pub use analyzer::Analyzer;
pub use sanitize::ResponseSanitizer;
pub use similarity::{normalize_query, similarity_ratio};
