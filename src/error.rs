use thiserror::Error;

use crate::services::{
    crm::CrmError, http_service::HttpServiceError, marketplace::MarketplaceError,
};

/// Failure that aborts the current reconciliation tick.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Course service error: {0}")]
    CourseService(#[from] HttpServiceError),

    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
