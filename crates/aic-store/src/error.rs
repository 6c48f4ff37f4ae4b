//! Store errors - using the unified error system

pub use aic_core::{AicError, Result};

/// Store-specific error constructors
pub struct StoreErrorBuilder;

impl StoreErrorBuilder {
    /// SQLite failure
    pub fn sqlite(err: rusqlite::Error) -> AicError {
        AicError::storage(format!("sqlite: {err}"))
    }

    /// Failure opening the database file
    pub fn open_failed(path: &std::path::Path, err: rusqlite::Error) -> AicError {
        AicError::storage(format!("cannot open {}: {err}", path.display()))
    }
}
