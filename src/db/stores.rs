use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EcomCode, EcomTransaction, PaymentStatus};

/// Access to payment transactions
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions in one of `statuses` whose last update falls in `[start_time, end_time)`.
    async fn find_transactions_by_status_in(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<EcomTransaction>>;

    async fn save(&self, transaction: &EcomTransaction) -> Result<()>;
}

/// Access to activation codes
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// `None` means the store could not answer for this transaction, which is
    /// distinct from a transaction that simply has no codes.
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Option<Vec<EcomCode>>>;

    async fn save(&self, code: &EcomCode) -> Result<()>;
}

#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn find_transactions_by_status_in(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<EcomTransaction>> {
        Ok(EcomTransaction::find_by_status_in(&self.pool, start_time, end_time, statuses).await?)
    }

    async fn save(&self, transaction: &EcomTransaction) -> Result<()> {
        Ok(EcomTransaction::save(&self.pool, transaction).await?)
    }
}

#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Option<Vec<EcomCode>>> {
        // The table always answers; an empty list is still a valid result.
        let codes = EcomCode::find_by_transaction_id(&self.pool, transaction_id).await?;
        Ok(Some(codes))
    }

    async fn save(&self, code: &EcomCode) -> Result<()> {
        Ok(EcomCode::save(&self.pool, code).await?)
    }
}
