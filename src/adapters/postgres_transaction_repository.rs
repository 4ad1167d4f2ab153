//! Postgres implementation of TransactionRepository.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::Transaction;
use crate::ports::{
    with_deadline, RepositoryError, RepositoryResult, TransactionRepository, DEFAULT_QUERY_TIMEOUT,
};

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &mut Transaction) -> RepositoryResult<()> {
        let (id, created_at, version) = with_deadline(self.query_timeout, async {
            sqlx::query_as::<_, (i64, DateTime<Utc>, i32)>(
                r#"
                INSERT INTO transactions (amount_btc, price_per_btc, transaction_type, note)
                VALUES ($1, $2, $3, $4)
                RETURNING id, created_at, version
                "#,
            )
            .bind(tx.amount_btc)
            .bind(tx.price_per_btc)
            .bind(i16::from(tx.transaction_type))
            .bind(&tx.note)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)
        })
        .await?;

        tx.id = id;
        tx.created_at = created_at;
        tx.version = version;
        Ok(())
    }

    async fn get(&self, id: i64) -> RepositoryResult<Transaction> {
        let row = with_deadline(self.query_timeout, async {
            sqlx::query_as::<_, TransactionRow>(
                r#"
                SELECT id, created_at, amount_btc, price_per_btc, transaction_type, note, version
                FROM transactions
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)
        })
        .await?;

        match row {
            Some(r) => Ok(r.try_into_domain()?),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Transaction>> {
        let rows = with_deadline(self.query_timeout, async {
            sqlx::query_as::<_, TransactionRow>(
                r#"
                SELECT id, created_at, amount_btc, price_per_btc, transaction_type, note, version
                FROM transactions
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)
        })
        .await?;

        // One undecodable row fails the whole listing.
        let transactions = rows
            .into_iter()
            .map(TransactionRow::try_into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    async fn update(&self, tx: &mut Transaction) -> RepositoryResult<i32> {
        // The existence probe and the conditional write share one statement
        // snapshot, so a miss can be classified without a second round-trip.
        let (new_version, found) = with_deadline(self.query_timeout, async {
            sqlx::query_as::<_, (Option<i32>, bool)>(
                r#"
                WITH current AS (
                    SELECT id FROM transactions WHERE id = $5
                ), updated AS (
                    UPDATE transactions
                    SET amount_btc = $1, price_per_btc = $2, transaction_type = $3, note = $4,
                        version = version + 1
                    WHERE id = $5 AND version = $6
                    RETURNING version
                )
                SELECT (SELECT version FROM updated) AS new_version,
                       EXISTS (SELECT 1 FROM current) AS found
                "#,
            )
            .bind(tx.amount_btc)
            .bind(tx.price_per_btc)
            .bind(i16::from(tx.transaction_type))
            .bind(&tx.note)
            .bind(tx.id)
            .bind(tx.version)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)
        })
        .await?;

        match (new_version, found) {
            (Some(version), _) => {
                tx.version = version;
                Ok(version)
            }
            (None, true) => Err(RepositoryError::EditConflict),
            (None, false) => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        let result = with_deadline(self.query_timeout, async {
            sqlx::query("DELETE FROM transactions WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        with_deadline(self.query_timeout, async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    created_at: DateTime<Utc>,
    amount_btc: f64,
    price_per_btc: i64,
    transaction_type: i16,
    note: String,
    version: i32,
}

impl TransactionRow {
    fn try_into_domain(self) -> Result<Transaction, sqlx::Error> {
        let transaction_type =
            i8::try_from(self.transaction_type).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Transaction {
            id: self.id,
            created_at: self.created_at,
            amount_btc: self.amount_btc,
            price_per_btc: self.price_per_btc,
            transaction_type,
            note: self.note,
            version: self.version,
        })
    }
}
