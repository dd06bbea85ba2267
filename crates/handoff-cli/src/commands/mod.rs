//! Command handlers grouped by concern.

pub(crate) mod check;
pub(crate) mod push;
