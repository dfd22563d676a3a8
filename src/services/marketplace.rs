use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use url::Url;

use super::endpoint::{endpoint, EndpointError};
use crate::models::{OrderMagento, UserMagento};

#[derive(thiserror::Error, Debug)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Marketplace API error: {status} - {message}")]
    ApiError { status: StatusCode, message: String },

    #[error("Invalid marketplace endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),
}

/// Read-only lookups against the marketplace
#[async_trait]
pub trait MarketplaceService: Send + Sync {
    async fn find_order_by_id(&self, order_id: &str)
        -> Result<Option<OrderMagento>, MarketplaceError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserMagento>, MarketplaceError>;
}

pub struct HttpMarketplaceService {
    client: Client,
    api_base_url: String,
    access_token: Secret<String>,
}

impl HttpMarketplaceService {
    pub fn new(client: Client, api_base_url: &str, access_token: Secret<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.to_string(),
            access_token,
        }
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, MarketplaceError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<T>()
                    .await
                    .map_err(|e| MarketplaceError::ApiError {
                        status: StatusCode::OK,
                        message: format!("Failed to parse response: {}", e),
                    })?;
                Ok(Some(body))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(MarketplaceError::ApiError {
                    status: other,
                    message: error_text,
                })
            }
        }
    }
}

#[async_trait]
impl MarketplaceService for HttpMarketplaceService {
    #[tracing::instrument(skip(self))]
    async fn find_order_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderMagento>, MarketplaceError> {
        let url = endpoint(&self.api_base_url, &["orders", order_id])?;
        self.get_optional(url).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserMagento>, MarketplaceError> {
        let url = endpoint(&self.api_base_url, &["users", user_id])?;
        self.get_optional(url).await
    }
}

#[derive(Debug, Default)]
struct InMemoryMarketplaceState {
    orders: HashMap<String, OrderMagento>,
    users: HashMap<String, UserMagento>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketplaceService {
    state: Arc<RwLock<InMemoryMarketplaceState>>,
}

impl InMemoryMarketplaceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, order: OrderMagento) {
        self.state
            .write()
            .unwrap()
            .orders
            .insert(order.order_id.clone(), order);
    }

    pub fn insert_user(&self, user: UserMagento) {
        self.state
            .write()
            .unwrap()
            .users
            .insert(user.user_id.clone(), user);
    }
}

#[async_trait]
impl MarketplaceService for InMemoryMarketplaceService {
    async fn find_order_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderMagento>, MarketplaceError> {
        Ok(self.state.read().unwrap().orders.get(order_id).cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserMagento>, MarketplaceError> {
        Ok(self.state.read().unwrap().users.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpMarketplaceService {
        HttpMarketplaceService::new(
            Client::new(),
            &format!("{}/", server.uri()),
            Secret::new("token".to_string()),
        )
    }

    #[tokio::test]
    async fn test_find_order_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/o1"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order_id": "o1",
                "courses": [
                    { "sku": "PY-101", "name": "Python", "price": 499000.0 },
                    { "sku": "JS-101", "name": "JavaScript" }
                ]
            })))
            .mount(&server)
            .await;

        let order = service(&server).find_order_by_id("o1").await.unwrap().unwrap();
        assert_eq!(order.courses.len(), 2);
        assert_eq!(order.courses[1].sku, "JS-101");
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let user = service(&server).find_user_by_id("u404").await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_user_id_is_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/a%2Fb%3Fc%23d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user_id": "a/b?c#d",
                "phone": "0123456789"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = service(&server)
            .find_user_by_id("a/b?c#d")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_id, "a/b?c#d");
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = service(&server).find_user_by_id("u1").await.unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::ApiError { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
    }
}
