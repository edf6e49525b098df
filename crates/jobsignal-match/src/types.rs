/// Outcome of scoring one (user, job) pair, independent of which matcher
/// produced it. `score` is already on the 0-100 scale used throughout the
/// Delivery Dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub score: f64,
    pub reasons: Vec<String>,
    pub matcher: MatcherKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Embedding,
    Rule,
}
