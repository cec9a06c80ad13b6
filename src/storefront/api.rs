//! Pizza service client used by the storefront

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::common::{join_url, Error, Result};
use crate::mock::{ApiRequest, Method, Transport};

use super::model::{
    AuthResponse, CreateFranchiseRequest, CreateStoreRequest, Franchise, FranchiseAdmin,
    LoginRequest, OrderRequest, OrderResponse, Pizza, RegisterRequest, Store, VerifyResponse,
};

/// Typed client for the pizza service endpoints
#[derive(Clone)]
pub struct PizzaApi {
    transport: Arc<dyn Transport>,
    base: String,
}

impl PizzaApi {
    pub fn new(transport: Arc<dyn Transport>, base: impl Into<String>) -> Self {
        Self {
            transport,
            base: base.into(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
        token: Option<&str>,
    ) -> Result<T> {
        let mut request = ApiRequest::new(method.clone(), join_url(&self.base, path));
        if let Some(body) = body {
            request = request.json(body)?;
        }
        if let Some(token) = token {
            request = request.bearer(token);
        }

        let response = self.transport.send(request).await?;
        let body = response.json_body().unwrap_or(Value::Null);

        if !response.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| response.body_text());
            return Err(Error::Api {
                method: method.to_string(),
                path: path.to_string(),
                status: response.status,
                message,
            });
        }

        serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
            url: join_url(&self.base, path),
            message: e.to_string(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest { email, password };
        self.call(Method::PUT, "/api/auth", Some(&body), None).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.call(Method::POST, "/api/auth", Some(&body), None).await
    }

    pub async fn logout(&self, token: &str) -> Result<Value> {
        self.call(Method::DELETE, "/api/auth", None::<&()>, Some(token))
            .await
    }

    pub async fn menu(&self, token: Option<&str>) -> Result<Vec<Pizza>> {
        self.call(Method::GET, "/api/order/menu", None::<&()>, token)
            .await
    }

    pub async fn franchises(&self, token: Option<&str>) -> Result<Vec<Franchise>> {
        self.call(Method::GET, "/api/franchise", None::<&()>, token)
            .await
    }

    /// Franchises administered by a user
    pub async fn user_franchises(&self, user_id: u64, token: &str) -> Result<Vec<Franchise>> {
        let path = format!("/api/franchise/{}", user_id);
        self.call(Method::GET, &path, None::<&()>, Some(token)).await
    }

    pub async fn create_franchise(&self, name: &str, admin_email: &str, token: &str) -> Result<Value> {
        let body = CreateFranchiseRequest {
            name: name.to_string(),
            admins: vec![FranchiseAdmin {
                id: None,
                name: None,
                email: admin_email.to_string(),
            }],
        };
        self.call(Method::POST, "/api/franchise", Some(&body), Some(token))
            .await
    }

    pub async fn close_franchise(&self, franchise_id: u64, token: &str) -> Result<Value> {
        let path = format!("/api/franchise/{}", franchise_id);
        self.call(Method::DELETE, &path, None::<&()>, Some(token)).await
    }

    pub async fn create_store(&self, franchise_id: u64, name: &str, token: &str) -> Result<Store> {
        let path = format!("/api/franchise/{}/store", franchise_id);
        let body = CreateStoreRequest {
            name: name.to_string(),
        };
        self.call(Method::POST, &path, Some(&body), Some(token)).await
    }

    pub async fn close_store(&self, franchise_id: u64, store_id: u64, token: &str) -> Result<Value> {
        let path = format!("/api/franchise/{}/store/{}", franchise_id, store_id);
        self.call(Method::DELETE, &path, None::<&()>, Some(token)).await
    }

    pub async fn order(&self, order: &OrderRequest, token: &str) -> Result<OrderResponse> {
        self.call(Method::POST, "/api/order", Some(order), Some(token))
            .await
    }

    pub async fn verify(&self, jwt: &str, token: &str) -> Result<VerifyResponse> {
        let body = serde_json::json!({ "jwt": jwt });
        self.call(Method::POST, "/api/order/verify", Some(&body), Some(token))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CannedResponder, MockRouter, RequestExpectation};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_sends_put_with_credentials() {
        let mut router = MockRouter::new();
        router
            .route(
                "*/**/api/auth",
                None,
                CannedResponder::json(json!({
                    "user": { "id": 3, "name": "Kai Chen", "email": "d@jwt.com", "roles": [{ "role": "diner" }] },
                    "token": "abcdef"
                }))
                .expect(
                    RequestExpectation::default()
                        .method(Method::PUT)
                        .body(json!({ "email": "d@jwt.com", "password": "a" })),
                ),
            )
            .unwrap();

        let api = PizzaApi::new(Arc::new(router), "http://localhost:3000");
        let auth = api.login("d@jwt.com", "a").await.unwrap();
        assert_eq!(auth.token, "abcdef");
        assert_eq!(auth.user.name, "Kai Chen");
    }

    #[tokio::test]
    async fn test_error_status_carries_message() {
        let api = PizzaApi::new(Arc::new(MockRouter::new()), "http://localhost:3000");
        let err = api.close_franchise(2, "abcdef").await.unwrap_err();
        match err {
            Error::Api { status, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(message, "unknown endpoint");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
