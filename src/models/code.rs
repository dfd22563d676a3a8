use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::transaction::PaymentStatus;

/// Course activation code issued for a transaction
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EcomCode {
    pub id: Uuid,
    pub ecom_transaction_id: Uuid,
    pub activate_code: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub updated_at: DateTime<Utc>,
}

impl EcomCode {
    pub async fn find_by_transaction_id(
        pool: &PgPool,
        ecom_transaction_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let codes = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM ecom_codes WHERE ecom_transaction_id = $1 ORDER BY activate_code
            "#,
        )
        .bind(ecom_transaction_id)
        .fetch_all(pool)
        .await?;

        Ok(codes)
    }

    pub async fn save(pool: &PgPool, code: &Self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE ecom_codes
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(code.id)
        .bind(code.status.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }
}
