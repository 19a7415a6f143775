use crate::domain::model::User;
use crate::http::payload::Payload;
use crate::http::AppState;
use crate::utils::error::{AppError, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use utoipa::openapi::{RefOr, Schema};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    pub(crate) fn method_filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }

    pub(crate) fn not_allowed(self) -> AppError {
        AppError::MethodNotAllowed {
            method: self.as_str().to_string(),
        }
    }
}

/// 傳給 view 的請求內容
pub struct ViewRequest {
    pub state: AppState,
    pub user: Option<User>,
    pub id: Option<u64>,
    pub query: HashMap<String, String>,
    pub payload: Payload,
}

impl ViewRequest {
    pub fn user(&self) -> Result<&User> {
        self.user.as_ref().ok_or(AppError::NotAuthenticated)
    }

    /// 路徑上的 id；不是數字時等同找不到
    pub fn id(&self) -> Result<u64> {
        self.id.ok_or(AppError::NotFound)
    }
}

pub(crate) fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    String,
}

#[derive(Debug, Clone)]
pub struct QueryParamDoc {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
}

#[derive(Debug, Clone)]
pub struct BodyDoc {
    pub schema: String,
    pub many: bool,
}

impl BodyDoc {
    pub fn one<T: ToSchema>() -> Self {
        Self {
            schema: T::name().into_owned(),
            many: false,
        }
    }

    pub fn many<T: ToSchema>() -> Self {
        Self {
            schema: T::name().into_owned(),
            many: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseDoc {
    pub status: u16,
    pub description: &'static str,
    pub body: Option<BodyDoc>,
}

/// 單一操作的說明，由 view 提供
#[derive(Debug, Clone, Default)]
pub struct OperationDoc {
    pub summary: String,
    pub query: Vec<QueryParamDoc>,
    pub request: Option<BodyDoc>,
    pub responses: Vec<ResponseDoc>,
}

impl OperationDoc {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        self.query.push(QueryParamDoc {
            name,
            description,
            kind,
        });
        self
    }

    pub fn request(mut self, body: BodyDoc) -> Self {
        self.request = Some(body);
        self
    }

    pub fn response(mut self, status: u16, description: &'static str, body: Option<BodyDoc>) -> Self {
        self.responses.push(ResponseDoc {
            status,
            description,
            body,
        });
        self
    }
}

/// 路由註冊時一併記錄的端點資訊，供 schema 產生器使用
#[derive(Debug, Clone)]
pub struct EndpointDoc {
    /// OpenAPI 格式的路徑，例如 `/api/recipe/recipes/{id}/`
    pub path: String,
    pub verb: Verb,
    pub operation_id: String,
    pub tag: String,
    pub secured: bool,
    pub has_id: bool,
    pub operation: OperationDoc,
}

impl EndpointDoc {
    pub(crate) fn new(
        path: &str,
        verb: Verb,
        action_name: &str,
        secured: bool,
        operation: OperationDoc,
    ) -> Self {
        let segments: Vec<&str> = path
            .trim_start_matches("/api/")
            .split('/')
            .filter(|s| !s.is_empty() && !s.starts_with('{'))
            .collect();
        let tag = segments.first().copied().unwrap_or("api").to_string();
        let mut operation_id = segments.join("_");
        operation_id.push('_');
        operation_id.push_str(action_name);

        Self {
            path: path.to_string(),
            verb,
            operation_id,
            tag,
            secured,
            has_id: path.contains("{id}"),
            operation,
        }
    }
}

pub fn component<T: ToSchema>() -> (String, RefOr<Schema>) {
    (T::name().into_owned(), <T as utoipa::PartialSchema>::schema())
}

/// axum 路由外加端點說明與 schema 元件
#[derive(Default)]
pub struct ApiRouter {
    pub(crate) router: Router<AppState>,
    pub(crate) endpoints: Vec<EndpointDoc>,
    pub(crate) components: BTreeMap<String, RefOr<Schema>>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 不列入文件的路由
    pub fn route(mut self, path: &str, method_router: MethodRouter<AppState>) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn endpoints(&self) -> &[EndpointDoc] {
        &self.endpoints
    }

    pub fn components(&self) -> &BTreeMap<String, RefOr<Schema>> {
        &self.components
    }

    pub(crate) fn add_components(&mut self, components: Vec<(String, RefOr<Schema>)>) {
        self.components.extend(components);
    }

    pub fn into_router(self) -> Router<AppState> {
        self.router
    }
}

/// `/api/recipe/recipes/` → (`/api/recipe/recipes/`, `/api/recipe/recipes/:id/`, `/api/recipe/recipes/{id}/`)
pub(crate) fn collection_and_member(prefix: &str) -> (String, String, String) {
    let base = prefix.trim_end_matches('/');
    (
        format!("{}/", base),
        format!("{}/:id/", base),
        format!("{}/{{id}}/", base),
    )
}
