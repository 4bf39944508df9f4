//! Error types for catalog lookups and parsing.

/// Errors raised while loading or querying the combat catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown ship: {0}")]
    UnknownShip(String),

    #[error("unknown weapon: {0}")]
    UnknownWeapon(String),

    #[error("unknown AI profile: {0}")]
    UnknownAiProfile(String),

    #[error("unknown combat profile: {0}")]
    UnknownCombatProfile(String),

    #[error("invalid entry {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
