use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// XP awards must be strictly positive; nothing was mutated.
    InvalidAward { amount: i64 },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAward { amount } => {
                write!(f, "xp award must be positive, got {amount}")
            }
        }
    }
}

impl std::error::Error for EngineError {}
