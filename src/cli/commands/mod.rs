//! CLI command implementations.

mod ask;
mod serve;
mod summarize;

pub use ask::run_ask;
pub use serve::run_serve;
pub use summarize::run_summarize;
