#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use recipe_api::adapters::{Argon2Hasher, LocalStore};
use recipe_api::domain::model::{User, UserProfile};
use recipe_api::{build_router, AppState, Settings};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// 測試用回應
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 以 oneshot 直接呼叫 router 的測試客戶端
#[derive(Clone)]
pub struct TestClient {
    pub state: AppState,
    pub store: Arc<LocalStore>,
    router: Router,
    token: Option<String>,
}

impl TestClient {
    pub fn new() -> Result<Self> {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Result<Self> {
        let store = Arc::new(LocalStore::new());
        let state = AppState::new(store.clone(), Arc::new(Argon2Hasher::new()), settings);
        let router = build_router(state.clone())?;
        Ok(Self {
            state,
            store,
            router,
            token: None,
        })
    }

    /// 建立使用者並以其 token 呼叫
    pub async fn authenticated(&self, email: &str, password: &str) -> Result<(Self, User)> {
        let user = create_user(&self.state, email, password).await?;
        let client = self.clone().with_token_for(&user, password).await?;
        Ok((client, user))
    }

    pub async fn with_token_for(mut self, user: &User, password: &str) -> Result<Self> {
        let token = self
            .state
            .users
            .obtain_token(recipe_api::core::serializers::AuthTokenSerializer {
                email: Some(user.email.clone()),
                password: Some(password.to_string()),
            })
            .await?;
        self.token = Some(token.key);
        Ok(self)
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.call(request).await
    }

    pub async fn send_form(&self, method: Method, uri: &str, form: &[(&str, &str)]) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let body = serde_urlencoded::to_string(form)?;
        self.call(builder.body(Body::from(body))?).await
    }

    pub async fn call(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<TestResponse> {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Result<TestResponse> {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Result<TestResponse> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Result<TestResponse> {
        self.send(Method::DELETE, uri, None).await
    }
}

pub async fn create_user(state: &AppState, email: &str, password: &str) -> Result<User> {
    Ok(state
        .users
        .create_user(email, password, UserProfile::default())
        .await?)
}
