//! In-memory stores backing the reconciler tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::stores::{CodeStore, TransactionStore};
use crate::error::{ReconcileError, Result};
use crate::models::{EcomCode, EcomTransaction, PaymentStatus};

#[derive(Debug, Default)]
struct TransactionState {
    transactions: HashMap<Uuid, EcomTransaction>,
    saves: Vec<EcomTransaction>,
    fail_on_find: bool,
    fail_on_save: HashSet<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionStore {
    state: Arc<RwLock<TransactionState>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, transaction: EcomTransaction) {
        self.state
            .write()
            .unwrap()
            .transactions
            .insert(transaction.id, transaction);
    }

    pub fn get(&self, id: Uuid) -> Option<EcomTransaction> {
        self.state.read().unwrap().transactions.get(&id).cloned()
    }

    /// Every transaction passed to `save`, in call order.
    pub fn saves(&self) -> Vec<EcomTransaction> {
        self.state.read().unwrap().saves.clone()
    }

    pub fn set_fail_on_find(&self, fail: bool) {
        self.state.write().unwrap().fail_on_find = fail;
    }

    pub fn fail_on_save(&self, id: Uuid) {
        self.state.write().unwrap().fail_on_save.insert(id);
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn find_transactions_by_status_in(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<EcomTransaction>> {
        let state = self.state.read().unwrap();

        if state.fail_on_find {
            return Err(ReconcileError::Store("transaction scan failed".to_string()));
        }

        let mut found: Vec<EcomTransaction> = state
            .transactions
            .values()
            .filter(|t| statuses.contains(&t.status))
            .filter(|t| t.updated_at >= start_time && t.updated_at < end_time)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.updated_at);

        Ok(found)
    }

    async fn save(&self, transaction: &EcomTransaction) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_save.contains(&transaction.id) {
            return Err(ReconcileError::Store(format!(
                "cannot save transaction {}",
                transaction.id
            )));
        }

        state
            .transactions
            .insert(transaction.id, transaction.clone());
        state.saves.push(transaction.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CodeState {
    codes: HashMap<Uuid, Vec<EcomCode>>,
    unavailable: HashSet<Uuid>,
    saves: Vec<EcomCode>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCodeStore {
    state: Arc<RwLock<CodeState>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: EcomCode) {
        self.state
            .write()
            .unwrap()
            .codes
            .entry(code.ecom_transaction_id)
            .or_default()
            .push(code);
    }

    /// Makes lookups for `transaction_id` answer with no result at all.
    pub fn set_unavailable(&self, transaction_id: Uuid) {
        self.state.write().unwrap().unavailable.insert(transaction_id);
    }

    pub fn saves(&self) -> Vec<EcomCode> {
        self.state.read().unwrap().saves.clone()
    }

    pub fn find(&self, activate_code: &str) -> Option<EcomCode> {
        self.state
            .read()
            .unwrap()
            .codes
            .values()
            .flatten()
            .find(|c| c.activate_code == activate_code)
            .cloned()
    }
}

#[async_trait]
impl CodeStore for InMemoryCodeStore {
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Option<Vec<EcomCode>>> {
        let state = self.state.read().unwrap();

        if state.unavailable.contains(&transaction_id) {
            return Ok(None);
        }

        Ok(Some(
            state
                .codes
                .get(&transaction_id)
                .cloned()
                .unwrap_or_default(),
        ))
    }

    async fn save(&self, code: &EcomCode) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if let Some(stored) = state
            .codes
            .get_mut(&code.ecom_transaction_id)
            .and_then(|codes| codes.iter_mut().find(|c| c.id == code.id))
        {
            *stored = code.clone();
        }
        state.saves.push(code.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn transaction(status: PaymentStatus, updated_at: DateTime<Utc>) -> EcomTransaction {
        EcomTransaction {
            id: Uuid::new_v4(),
            charge_id: "ch".to_string(),
            order_id: "o".to_string(),
            user_id: "u".to_string(),
            status,
            contact_method: None,
            time_out_at: None,
            created_at: updated_at,
            updated_at,
        }
    }

    #[tokio::test]
    async fn test_find_is_half_open_on_updated_at() {
        let store = InMemoryTransactionStore::new();
        let end = Utc::now();
        let start = end - Duration::hours(1);

        let at_start = transaction(PaymentStatus::Pending, start);
        let at_end = transaction(PaymentStatus::Pending, end);
        store.insert(at_start.clone());
        store.insert(at_end);

        let found = store
            .find_transactions_by_status_in(start, end, &[PaymentStatus::Pending])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, at_start.id);
    }

    #[tokio::test]
    async fn test_unavailable_differs_from_empty() {
        let store = InMemoryCodeStore::new();
        let empty = Uuid::new_v4();
        let missing = Uuid::new_v4();
        store.set_unavailable(missing);

        assert_eq!(
            store.find_by_transaction_id(empty).await.unwrap().map(|c| c.len()),
            Some(0)
        );
        assert!(store.find_by_transaction_id(missing).await.unwrap().is_none());
    }
}
