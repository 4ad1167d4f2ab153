//! Persistence port for transaction records.
//!
//! Handlers depend on [`TransactionRepository`] only; the Postgres adapter and
//! the in-memory test double both live in `crate::adapters`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Transaction;

/// Deadline applied to every store call unless configured otherwise.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Why the backing store could not serve a call.
#[derive(Error, Debug)]
pub enum UnavailableCause {
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Closed set of outcomes a store call can fail with.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("edit conflict")]
    EditConflict,

    #[error("store unavailable: {0}")]
    Unavailable(#[from] UnavailableCause),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Unavailable(UnavailableCause::Database(err))
    }
}

impl RepositoryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(UnavailableCause::Timeout(_)))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Runs a store call under a hard deadline. An expired deadline drops the
/// in-flight future and reports the store as unavailable.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(UnavailableCause::Timeout(limit).into()),
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists `tx` and writes the assigned id, created_at and version back into it.
    async fn insert(&self, tx: &mut Transaction) -> RepositoryResult<()>;

    async fn get(&self, id: i64) -> RepositoryResult<Transaction>;

    /// All records in ascending id order.
    async fn get_all(&self) -> RepositoryResult<Vec<Transaction>>;

    /// Conditional write keyed on `tx.id` and `tx.version`. On success the
    /// bumped version is stored into `tx` and returned.
    async fn update(&self, tx: &mut Transaction) -> RepositoryResult<i32>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;

    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> RepositoryResult<()>;
}
