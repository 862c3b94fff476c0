use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold ordering, out-of-range score, etc.).
    ConfigValidation(String),
    /// A route key string that is not one of the six site × shift combinations.
    UnknownRoute(String),
    /// An action label that is not part of the action taxonomy.
    InvalidAction(String),
    /// A score cell that cannot be read as a number in [0, 100].
    InvalidScore(String),
    /// A result whose names contradict its action (e.g. NOT_IN_API with an export name).
    InconsistentResult(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownRoute(route) => write!(f, "unknown route: '{route}'"),
            Self::InvalidAction(action) => write!(f, "unknown action: '{action}'"),
            Self::InvalidScore(value) => write!(f, "cannot parse match score '{value}'"),
            Self::InconsistentResult(msg) => write!(f, "inconsistent result: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
