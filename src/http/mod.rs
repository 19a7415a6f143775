pub mod admin;
pub mod auth;
pub mod error;
pub mod payload;
pub mod recipe;
pub mod routes;
pub mod schema;
pub mod user;
pub mod views;
pub mod viewsets;

use crate::adapters::{Argon2Hasher, LocalStore};
use crate::config::Settings;
use crate::core::{AttributeService, RecipeService, UserService};
use crate::domain::ports::{PasswordHasher, Store};
use crate::utils::error::Result;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use recipe::{AttributeViewSet, RecipeViewSet};
pub use routes::ApiRouter;
pub use schema::SchemaClass;
pub use user::{CreateTokenView, CreateUserView, ManageUserView};

/// 所有 handler 共用的狀態
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub recipes: RecipeService,
    pub attributes: AttributeService,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn PasswordHasher>, settings: Settings) -> Self {
        Self {
            users: UserService::new(store.clone(), hasher, settings.auth.min_password_length),
            recipes: RecipeService::new(store.clone()),
            attributes: AttributeService::new(store),
            settings: Arc::new(settings),
        }
    }

    /// 依設定開啟資料檔（未設定時只用記憶體）
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let store = match &settings.storage.data_path {
            Some(path) => {
                tracing::info!("💾 Using data snapshot at {}", path);
                LocalStore::open(path)?
            }
            None => {
                tracing::warn!("⚠️ No storage.data_path configured, data lives in memory only");
                LocalStore::new()
            }
        };
        Ok(Self::new(
            Arc::new(store),
            Arc::new(Argon2Hasher::new()),
            settings,
        ))
    }
}

/// 公開 API 的路由表
pub fn api_routes() -> ApiRouter {
    ApiRouter::new()
        .api_view("/api/user/create/", CreateUserView)
        .api_view("/api/user/token/", CreateTokenView)
        .api_view("/api/user/me/", ManageUserView)
        .viewset("/api/recipe/recipes", RecipeViewSet)
        .viewset("/api/recipe/tags", AttributeViewSet::tags())
        .viewset("/api/recipe/ingredients", AttributeViewSet::ingredients())
}

/// 依設定產生 API 文件；`none` 時回傳 None
pub fn api_document(settings: &Settings) -> Result<Option<serde_json::Value>> {
    schema::document(&api_routes(), settings.schema_class()?, &settings.schema)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "healthy": true }))
}

pub fn build_router(state: AppState) -> Result<Router> {
    let settings = state.settings.clone();
    let api = api_routes();
    let class = settings.schema_class()?;

    let mut router = Router::new();
    if let Some(document) = schema::document(&api, class, &settings.schema)? {
        router = router.merge(schema::routes(document, &settings.schema.title)?);
    } else {
        tracing::info!("📄 Schema generation disabled");
    }

    Ok(router
        .merge(api.into_router())
        .merge(admin::routes())
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
