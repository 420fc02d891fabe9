//! Storage layer for persisting flow documents.
//!
//! Flows are loaded and saved as a whole; the last save wins. Backends:
//! - `MemStore`: In-memory storage for testing
//! - `FileStore`: One pretty-printed JSON file per flow in a directory
//! - `PostgresStore`: PostgreSQL for production persistence

pub mod data;
mod db;
mod store;

use std::error::Error;

use strum::AsRefStr;

use crate::{ChatflowError, Result};

pub use db::{FileStore, MemStore, PostgresStore};
pub use store::Store;

/// Maps backend errors to ChatflowError.
fn map_db_err(err: impl Error) -> ChatflowError {
    ChatflowError::Store(err.to_string())
}

/// Identifiers for different storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq)]
pub enum StoreIden {
    /// Flow documents.
    #[strum(serialize = "flows")]
    Flows,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Lists every record, ordered by ID.
    fn list(&self) -> Result<Vec<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the backend and registers its collections with the store.
    fn init(
        &self,
        s: &Store,
    ) -> Result<()>;
}
