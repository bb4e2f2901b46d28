//! Output renderers: markdown tables, JSON and CSV export.

pub mod export;
pub mod json;
pub mod markdown;
