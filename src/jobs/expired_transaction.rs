use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::{CodeStore, TransactionStore};
use crate::error::Result;
use crate::models::{EcomTransaction, OrderMagento, PaymentEventData, PaymentStatus, UserMagento};
use crate::services::{
    ContactImportService, CourseService, ErrorTracker, ErrorType, MarketplaceService, MessageCode,
    SyncContactService,
};

/// Statuses a transaction can be stuck in
const RECONCILED_STATUSES: [PaymentStatus; 2] = [PaymentStatus::Created, PaymentStatus::Pending];

/// Returns the half-open scan window `[now - lookback - timeout, now - timeout)`.
pub fn timeout_window(
    now: DateTime<Utc>,
    timeout: Duration,
    lookback: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_time = now - timeout;
    (end_time - lookback, end_time)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub timed_out: usize,
    pub codes_cancelled: usize,
    pub codes_unchanged: usize,
    pub code_call_failures: usize,
    pub bifrost_synced: usize,
    pub contacts_created: usize,
    pub stopped_without_codes: usize,
    pub stopped_missing_order: usize,
    pub stopped_missing_user: usize,
    pub error: Option<String>,
}

/// Remote collaborators of the reconciler
#[derive(Clone)]
pub struct Collaborators {
    pub transactions: Arc<dyn TransactionStore>,
    pub codes: Arc<dyn CodeStore>,
    pub courses: Arc<dyn CourseService>,
    pub sync_contacts: Arc<dyn SyncContactService>,
    pub marketplace: Arc<dyn MarketplaceService>,
    pub contacts: Arc<dyn ContactImportService>,
    pub error_tracker: Arc<dyn ErrorTracker>,
}

/// Times out payment transactions left in `CREATED`/`PENDING` and propagates
/// the failure to the course platform, the contact sync service and the CRM.
pub struct ExpiredTransactionReconciler {
    deps: Collaborators,
    transaction_timeout: Duration,
    lookback: Duration,
}

impl ExpiredTransactionReconciler {
    pub fn new(deps: Collaborators, transaction_timeout: Duration, lookback: Duration) -> Self {
        Self {
            deps,
            transaction_timeout,
            lookback,
        }
    }

    /// Runs one reconciliation pass. Never fails: an error stops the pass,
    /// is logged and lands in the report. Work already saved is kept.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        let (start_time, end_time) = timeout_window(now, self.transaction_timeout, self.lookback);

        let mut report = TickReport {
            started_at: Some(now),
            window_start: Some(start_time),
            window_end: Some(end_time),
            ..TickReport::default()
        };

        tracing::info!(
            start_update_time = %start_time,
            end_update_time = %end_time,
            "Starting expired transaction reconciliation"
        );

        if let Err(e) = self
            .reconcile_window(start_time, end_time, now, &mut report)
            .await
        {
            tracing::error!(error = %e, "Expired transaction reconciliation aborted");
            report.error = Some(e.to_string());
        }

        report.finished_at = Some(Utc::now());

        tracing::info!(?report, "Expired transaction reconciliation completed");

        report
    }

    async fn reconcile_window(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let transactions = self
            .deps
            .transactions
            .find_transactions_by_status_in(start_time, end_time, &RECONCILED_STATUSES)
            .await?;
        report.scanned = transactions.len();

        tracing::info!(number_transaction = transactions.len(), "Expired transactions found");

        for transaction in transactions {
            self.sync_expired_transaction(transaction, now, report)
                .await?;
        }

        Ok(())
    }

    /// Reconciles a single expired transaction.
    ///
    /// 1. Mark it `TIMEOUT` and save it
    /// 2. Cancel the course behind each activation code
    /// 3. Report the failure to Bifrost if the payment had reached `PENDING`
    /// 4. Create a C3 contact per ordered course when the user has a phone
    #[tracing::instrument(skip_all, fields(charge_id = %transaction.charge_id))]
    pub async fn sync_expired_transaction(
        &self,
        mut transaction: EcomTransaction,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        tracing::info!(transaction_id = %transaction.id, "Syncing expired transaction");

        let original_status = transaction.mark_timed_out(now);
        self.deps.transactions.save(&transaction).await?;
        report.timed_out += 1;

        let Some(codes) = self.deps.codes.find_by_transaction_id(transaction.id).await? else {
            tracing::info!(
                ecom_transaction_id = %transaction.id,
                "ERROR_ECOM_CODE_NULL"
            );
            report.stopped_without_codes += 1;
            return Ok(());
        };

        for mut code in codes {
            match self.deps.courses.cancel_course(&code.activate_code).await {
                Ok(status) => {
                    if status == StatusCode::OK {
                        code.status = PaymentStatus::Failed;
                        report.codes_cancelled += 1;
                    } else {
                        report.codes_unchanged += 1;
                    }
                    self.deps.codes.save(&code).await?;
                }
                Err(e) if e.is_recoverable() => {
                    self.deps.error_tracker.push_exception(
                        ErrorType::Exception,
                        MessageCode::ApiActivateCode,
                        &e,
                    );
                    report.code_call_failures += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if original_status == PaymentStatus::Pending {
            self.deps
                .sync_contacts
                .update_transaction_bifrost(&PaymentEventData::charge_failed(&transaction.charge_id))
                .await?;
            report.bifrost_synced += 1;
        }

        let Some(order) = self
            .deps
            .marketplace
            .find_order_by_id(&transaction.order_id)
            .await?
        else {
            tracing::error!(
                etl_internal_error = "ERROR_CANNOT_GET_ORDER_MAGENTO",
                order_id = %transaction.order_id,
                charge_id = %transaction.charge_id,
                "Order lookup failed"
            );
            report.stopped_missing_order += 1;
            return Ok(());
        };

        let Some(user) = self
            .deps
            .marketplace
            .find_user_by_id(&transaction.user_id)
            .await?
        else {
            tracing::error!(
                etl_internal_error = "ERROR_CANNOT_GET_USER_MAGENTO",
                user_id = %transaction.user_id,
                charge_id = %transaction.charge_id,
                "User lookup failed"
            );
            report.stopped_missing_user += 1;
            return Ok(());
        };

        if user.has_phone() {
            report.contacts_created += self
                .create_c3_contacts(&order, &user, transaction.contact_method.as_deref())
                .await?;
        }

        tracing::info!("Expired transaction synced");

        Ok(())
    }

    /// Creates one C3 contact per course and marks each one failed in the CRM.
    async fn create_c3_contacts(
        &self,
        order: &OrderMagento,
        user: &UserMagento,
        method: Option<&str>,
    ) -> Result<usize> {
        let failed = PaymentEventData::contact_failed();

        for item in &order.courses {
            let contact_id = self
                .deps
                .contacts
                .import_contact_c3(user, item, method)
                .await?;
            self.deps
                .sync_contacts
                .update_c3_status_in_marol(&contact_id, &failed)
                .await?;
        }

        Ok(order.courses.len())
    }
}
