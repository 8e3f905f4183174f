//! Utility functions for display formatting.

pub mod format;

pub use format::{format_price, format_route, format_stops, format_timestamp, truncate_string};
