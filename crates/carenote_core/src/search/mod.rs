//! Field-filter search over students and counseling records.
//!
//! # Responsibility
//! - Expose parameterized, AND-combined filters backed by SQL `LIKE` and
//!   exact matches.
//! - Keep result ordering identical to the matching `list_*` repository call.

pub mod filter;
