//! Search over published content.
//!
//! # Responsibility
//! - Look up published blogs and notes by case-insensitive substring.
//! - Merge per-kind hits into one recency-ordered, capped result list.

pub mod aggregate;
