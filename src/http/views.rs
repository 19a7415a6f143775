//! 以 HTTP 方法分派的 view 與其路由註冊

use crate::http::auth::resolve_user;
use crate::http::payload::Payload;
use crate::http::routes::{ApiRouter, EndpointDoc, OperationDoc, ViewRequest, Verb};
use crate::http::AppState;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use utoipa::openapi::{RefOr, Schema};

pub(crate) type ViewFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

#[async_trait]
pub trait ApiView: Send + Sync + 'static {
    /// 有實作的方法，其他方法回 405
    fn verbs(&self) -> &'static [Verb];

    fn requires_auth(&self) -> bool {
        false
    }

    fn doc(&self, verb: Verb) -> OperationDoc;

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        Vec::new()
    }

    async fn get(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Get.not_allowed())
    }

    async fn post(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Post.not_allowed())
    }

    async fn put(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Put.not_allowed())
    }

    async fn patch(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Patch.not_allowed())
    }

    async fn delete(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Delete.not_allowed())
    }
}

async fn dispatch(view: &dyn ApiView, verb: Verb, req: ViewRequest) -> Result<Response> {
    match verb {
        Verb::Get => view.get(req).await,
        Verb::Post => view.post(req).await,
        Verb::Put => view.put(req).await,
        Verb::Patch => view.patch(req).await,
        Verb::Delete => view.delete(req).await,
    }
}

/// 單一方法的操作名稱，用於 operationId
fn action_name(verb: Verb) -> &'static str {
    match verb {
        Verb::Get => "retrieve",
        Verb::Post => "create",
        Verb::Put => "update",
        Verb::Patch => "partial_update",
        Verb::Delete => "destroy",
    }
}

/// 把 `handler` 掛在 `verb` 上；驗證後才交給 handler
pub(crate) fn bind<H>(
    method_router: Option<MethodRouter<AppState>>,
    verb: Verb,
    requires_auth: bool,
    handler: H,
) -> MethodRouter<AppState>
where
    H: Fn(ViewRequest) -> ViewFuture + Clone + Send + Sync + 'static,
{
    let endpoint = move |State(state): State<AppState>,
                         id: Option<Path<u64>>,
                         Query(query): Query<HashMap<String, String>>,
                         headers: HeaderMap,
                         payload: Payload| {
        let handler = handler.clone();
        async move {
            let result = async {
                let user = resolve_user(&state, &headers, requires_auth).await?;
                let request = ViewRequest {
                    state,
                    user,
                    id: id.map(|Path(id)| id),
                    query,
                    payload,
                };
                handler(request).await
            }
            .await;
            result.unwrap_or_else(IntoResponse::into_response)
        }
    };

    match method_router {
        Some(router) => router.on(verb.method_filter(), endpoint),
        None => axum::routing::on(verb.method_filter(), endpoint),
    }
}

/// 未註冊的方法回 JSON 格式的 405
pub(crate) fn with_method_fallback(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.fallback(|method: Method| async move {
        AppError::MethodNotAllowed {
            method: method.to_string(),
        }
        .into_response()
    })
}

impl ApiRouter {
    /// 註冊 `path` 上的 view，並記錄每個方法的文件
    pub fn api_view<V: ApiView>(mut self, path: &str, view: V) -> Self {
        let view = Arc::new(view);
        let mut method_router = None;

        for &verb in view.verbs() {
            let handler_view = view.clone();
            let handler = move |req: ViewRequest| -> ViewFuture {
                let view = handler_view.clone();
                Box::pin(async move { dispatch(view.as_ref(), verb, req).await })
            };
            method_router = Some(bind(method_router, verb, view.requires_auth(), handler));

            self.endpoints.push(EndpointDoc::new(
                path,
                verb,
                action_name(verb),
                view.requires_auth(),
                view.doc(verb),
            ));
        }

        self.add_components(view.components());
        if let Some(method_router) = method_router {
            self = self.route(path, with_method_fallback(method_router));
        }
        self
    }
}
