//! Match Engine: two matchers coexist. The Embedding Matcher is primary;
//! the Rule Matcher is the fallback when a user or candidate job lacks an
//! embedding. `engine::MatchEngine` is the seam other crates call through
//! — `jobsignal-dispatch` never reaches into `embedding`/`rule` directly.

pub mod embedding;
pub mod engine;
pub mod rule;
pub mod types;

pub use engine::MatchEngine;
pub use types::{MatchOutcome, MatcherKind};
