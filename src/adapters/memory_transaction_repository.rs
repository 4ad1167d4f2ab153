//! In-memory implementation of TransactionRepository.
//!
//! Mirrors the Postgres contract (ids from a sequence, ascending listing,
//! version-checked updates) so handlers can be exercised without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::Transaction;
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Transaction>,
}

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    table: Mutex<Table>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, tx: &mut Transaction) -> RepositoryResult<()> {
        let mut table = self.table.lock().await;
        table.next_id += 1;

        tx.id = table.next_id;
        tx.created_at = Utc::now();
        tx.version = 1;
        table.rows.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> RepositoryResult<Transaction> {
        let table = self.table.lock().await;
        table.rows.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Transaction>> {
        let table = self.table.lock().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn update(&self, tx: &mut Transaction) -> RepositoryResult<i32> {
        let mut table = self.table.lock().await;
        let stored = table.rows.get_mut(&tx.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != tx.version {
            return Err(RepositoryError::EditConflict);
        }

        stored.amount_btc = tx.amount_btc;
        stored.price_per_btc = tx.price_per_btc;
        stored.transaction_type = tx.transaction_type;
        stored.note = tx.note.clone();
        stored.version += 1;

        tx.version = stored.version;
        Ok(stored.version)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        let mut table = self.table.lock().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
