//! Data models for the army sync tool.
//!
//! Source records mirror the web export JSON; documents mirror what the
//! rendering side reads from the destination store.

mod army;
mod document;
mod watermark;

pub use army::*;
pub use document::*;
pub use watermark::*;
