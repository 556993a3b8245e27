use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidStoreName,
    NoSuchStore { name: String },
    Serde(String),
    LockPoisoned(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidStoreName => {
                write!(f, "store name must be a non-empty string")
            }
            StoreError::NoSuchStore { name } => {
                write!(f, "no store has been created under the name {}", name)
            }
            StoreError::Serde(message) => write!(f, "serialization failed: {}", message),
            StoreError::LockPoisoned(operation) => {
                write!(f, "lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for StoreError {}
