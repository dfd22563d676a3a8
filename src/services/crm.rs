use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::endpoint::{endpoint, EndpointError};
use crate::models::{ItemMagento, PaymentEventData, PaymentStatus, UserMagento};

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(thiserror::Error, Debug)]
pub enum CrmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CRM API error: {status} - {message}")]
    ApiError { status: StatusCode, message: String },

    #[error("Invalid CRM endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),
}

/// Keeps the contact synchronization service and CRM contact status in step
/// with payment outcomes
#[async_trait]
pub trait SyncContactService: Send + Sync {
    async fn update_transaction_bifrost(&self, event: &PaymentEventData) -> Result<(), CrmError>;

    async fn update_c3_status_in_marol(
        &self,
        contact_id: &str,
        event: &PaymentEventData,
    ) -> Result<(), CrmError>;
}

/// Creates C3 contacts in the CRM
#[async_trait]
pub trait ContactImportService: Send + Sync {
    /// Returns the id of the created contact
    async fn import_contact_c3(
        &self,
        user: &UserMagento,
        item: &ItemMagento,
        method: Option<&str>,
    ) -> Result<String, CrmError>;
}

#[derive(Debug, Serialize)]
struct ImportContactRequest<'a> {
    user_id: &'a str,
    full_name: Option<&'a str>,
    email: Option<&'a str>,
    phone: Option<&'a str>,
    course_sku: &'a str,
    course_name: &'a str,
    price: f64,
    payment_method: Option<&'a str>,
    status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
struct ImportContactResponse {
    contact_id: String,
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CrmError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!(status = %status, error = %error_text, "CRM request failed");

    Err(CrmError::ApiError {
        status,
        message: error_text,
    })
}

pub struct HttpSyncContactService {
    client: Client,
    bifrost_api_url: String,
    marol_api_url: String,
    marol_api_key: Secret<String>,
}

impl HttpSyncContactService {
    pub fn new(
        client: Client,
        bifrost_api_url: &str,
        marol_api_url: &str,
        marol_api_key: Secret<String>,
    ) -> Self {
        Self {
            client,
            bifrost_api_url: bifrost_api_url.to_string(),
            marol_api_url: marol_api_url.to_string(),
            marol_api_key,
        }
    }
}

#[async_trait]
impl SyncContactService for HttpSyncContactService {
    #[tracing::instrument(skip(self), fields(id = %event.id, status = %event.status))]
    async fn update_transaction_bifrost(&self, event: &PaymentEventData) -> Result<(), CrmError> {
        let url = endpoint(&self.bifrost_api_url, &["transactions", "status"])?;

        let response = self.client.post(url).json(event).send().await?;
        ensure_success(response).await?;

        tracing::info!("Bifrost transaction status updated");
        Ok(())
    }

    #[tracing::instrument(skip(self, event))]
    async fn update_c3_status_in_marol(
        &self,
        contact_id: &str,
        event: &PaymentEventData,
    ) -> Result<(), CrmError> {
        let url = endpoint(&self.marol_api_url, &["contacts", "c3", contact_id, "status"])?;

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.marol_api_key.expose_secret())
            .json(event)
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }
}

pub struct HttpContactImportService {
    client: Client,
    marol_api_url: String,
    marol_api_key: Secret<String>,
}

impl HttpContactImportService {
    pub fn new(client: Client, marol_api_url: &str, marol_api_key: Secret<String>) -> Self {
        Self {
            client,
            marol_api_url: marol_api_url.to_string(),
            marol_api_key,
        }
    }
}

#[async_trait]
impl ContactImportService for HttpContactImportService {
    #[tracing::instrument(skip(self, user, item), fields(user_id = %user.user_id, sku = %item.sku))]
    async fn import_contact_c3(
        &self,
        user: &UserMagento,
        item: &ItemMagento,
        method: Option<&str>,
    ) -> Result<String, CrmError> {
        let url = endpoint(&self.marol_api_url, &["contacts", "c3"])?;

        let request = ImportContactRequest {
            user_id: &user.user_id,
            full_name: user.full_name.as_deref(),
            email: user.email.as_deref(),
            phone: user.phone.as_deref(),
            course_sku: &item.sku,
            course_name: &item.name,
            price: item.price,
            payment_method: method,
            status: PaymentStatus::Timeout,
        };

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.marol_api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let created: ImportContactResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| CrmError::ApiError {
                status: StatusCode::OK,
                message: format!("Failed to parse response: {}", e),
            })?;

        tracing::info!(contact_id = %created.contact_id, "C3 contact created");

        Ok(created.contact_id)
    }
}

/// A call recorded by [`InMemoryCrm`]
#[derive(Debug, Clone, PartialEq)]
pub enum CrmCall {
    TransactionBifrost(PaymentEventData),
    ContactImported {
        contact_id: String,
        user_id: String,
        sku: String,
        method: Option<String>,
    },
    C3Status {
        contact_id: String,
        event: PaymentEventData,
    },
}

#[derive(Debug, Default)]
struct InMemoryCrmState {
    calls: Vec<CrmCall>,
    next_id: u32,
    fail_bifrost: bool,
}

/// In-memory CRM and contact synchronization service for tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrm {
    state: Arc<RwLock<InMemoryCrmState>>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_bifrost(&self, fail: bool) {
        self.state.write().unwrap().fail_bifrost = fail;
    }

    pub fn calls(&self) -> Vec<CrmCall> {
        self.state.read().unwrap().calls.clone()
    }

    pub fn bifrost_events(&self) -> Vec<PaymentEventData> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CrmCall::TransactionBifrost(event) => Some(event),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SyncContactService for InMemoryCrm {
    async fn update_transaction_bifrost(&self, event: &PaymentEventData) -> Result<(), CrmError> {
        let mut state = self.state.write().unwrap();

        if state.fail_bifrost {
            return Err(CrmError::ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "bifrost unavailable".to_string(),
            });
        }

        state.calls.push(CrmCall::TransactionBifrost(event.clone()));
        Ok(())
    }

    async fn update_c3_status_in_marol(
        &self,
        contact_id: &str,
        event: &PaymentEventData,
    ) -> Result<(), CrmError> {
        self.state.write().unwrap().calls.push(CrmCall::C3Status {
            contact_id: contact_id.to_string(),
            event: event.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ContactImportService for InMemoryCrm {
    async fn import_contact_c3(
        &self,
        user: &UserMagento,
        item: &ItemMagento,
        method: Option<&str>,
    ) -> Result<String, CrmError> {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        let contact_id = format!("C3-{:04}", state.next_id);

        state.calls.push(CrmCall::ContactImported {
            contact_id: contact_id.clone(),
            user_id: user.user_id.clone(),
            sku: item.sku.clone(),
            method: method.map(str::to_string),
        });

        Ok(contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user() -> UserMagento {
        UserMagento {
            user_id: "u1".to_string(),
            full_name: Some("Nguyen Van A".to_string()),
            email: Some("a@example.com".to_string()),
            phone: Some("0123456789".to_string()),
        }
    }

    fn item() -> ItemMagento {
        ItemMagento {
            sku: "PY-101".to_string(),
            name: "Python".to_string(),
            price: 499000.0,
        }
    }

    #[tokio::test]
    async fn test_update_transaction_bifrost_posts_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions/status"))
            .and(body_json(serde_json::json!({ "id": "ch1", "status": "FAILED" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpSyncContactService::new(
            Client::new(),
            &server.uri(),
            &server.uri(),
            Secret::new("key".to_string()),
        );

        service
            .update_transaction_bifrost(&PaymentEventData::charge_failed("ch1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_c3_status_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts/c3/C3-1/status"))
            .and(header("x-api-key", "key"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let service = HttpSyncContactService::new(
            Client::new(),
            &server.uri(),
            &server.uri(),
            Secret::new("key".to_string()),
        );

        let err = service
            .update_c3_status_in_marol("C3-1", &PaymentEventData::contact_failed())
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::ApiError { .. }));
    }

    #[tokio::test]
    async fn test_update_c3_status_encodes_contact_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/contacts/c3/C3%2F9%3Fx/status"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpSyncContactService::new(
            Client::new(),
            &server.uri(),
            &format!("{}/crm/", server.uri()),
            Secret::new("key".to_string()),
        );

        service
            .update_c3_status_in_marol("C3/9?x", &PaymentEventData::contact_failed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_import_contact_returns_contact_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts/c3"))
            .and(body_partial_json(serde_json::json!({
                "user_id": "u1",
                "course_sku": "PY-101",
                "payment_method": "ATM",
                "status": "TIMEOUT"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "contact_id": "C3-77" })),
            )
            .mount(&server)
            .await;

        let service = HttpContactImportService::new(
            Client::new(),
            &server.uri(),
            Secret::new("key".to_string()),
        );

        let contact_id = service
            .import_contact_c3(&user(), &item(), Some("ATM"))
            .await
            .unwrap();
        assert_eq!(contact_id, "C3-77");
    }
}
