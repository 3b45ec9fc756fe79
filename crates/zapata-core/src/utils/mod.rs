//! Utility functions for numeric input handling and formatting.

pub mod expression;
pub mod format;

pub use expression::{evaluate, is_math_expression, resolve_input};
pub use format::{format_number, truncate_string};
