use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status shared by transactions, activation codes and sync events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Pending,
    Success,
    Failed,
    Timeout,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown payment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(PaymentStatus::Created),
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "TIMEOUT" => Ok(PaymentStatus::Timeout),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EcomTransaction {
    pub id: Uuid,
    pub charge_id: String,
    pub order_id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub contact_method: Option<String>,
    pub time_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EcomTransaction {
    /// Finds transactions in one of `statuses` last updated within `[start_time, end_time)`
    pub async fn find_by_status_in(
        pool: &PgPool,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let transactions = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM ecom_transactions
            WHERE status = ANY($1)
              AND updated_at >= $2
              AND updated_at < $3
            ORDER BY updated_at
            "#,
        )
        .bind(&statuses)
        .bind(start_time)
        .bind(end_time)
        .fetch_all(pool)
        .await?;

        Ok(transactions)
    }

    /// Persists status and timeout stamp
    pub async fn save(pool: &PgPool, transaction: &Self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE ecom_transactions
            SET
                status = $2,
                time_out_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.status.as_str())
        .bind(transaction.time_out_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Moves the transaction to `TIMEOUT`, returning the status it had before.
    pub fn mark_timed_out(&mut self, now: DateTime<Utc>) -> PaymentStatus {
        let original = self.status;
        self.status = PaymentStatus::Timeout;
        self.time_out_at = Some(now);
        original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            PaymentStatus::Created,
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Timeout,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("EXPIRED".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&PaymentStatus::Timeout).unwrap();
        assert_eq!(json, "\"TIMEOUT\"");
    }

    #[test]
    fn test_mark_timed_out_keeps_original_status() {
        let now = Utc::now();
        let mut transaction = EcomTransaction {
            id: Uuid::new_v4(),
            charge_id: "ch1".to_string(),
            order_id: "o1".to_string(),
            user_id: "u1".to_string(),
            status: PaymentStatus::Pending,
            contact_method: None,
            time_out_at: None,
            created_at: now,
            updated_at: now,
        };

        let original = transaction.mark_timed_out(now);

        assert_eq!(original, PaymentStatus::Pending);
        assert_eq!(transaction.status, PaymentStatus::Timeout);
        assert_eq!(transaction.time_out_at, Some(now));
    }
}
