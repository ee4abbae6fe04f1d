//! URL handling module for Novel-Ripple
//!
//! This module resolves links found on chapter, TOC and search pages against
//! the source's base URL, and normalizes URLs for visited-page tracking.

mod normalize;

pub use normalize::{is_navigable_href, normalize_url, resolve_link};
