//! 以動作（list、create…）分派的 viewset。
//!
//! 集合路徑 `{prefix}/` 對應 list/create，單筆路徑 `{prefix}/{id}/`
//! 對應 retrieve/update/partial_update/destroy。

use crate::http::routes::{
    collection_and_member, ApiRouter, EndpointDoc, OperationDoc, ViewRequest, Verb,
};
use crate::http::views::{bind, with_method_fallback, ViewFuture};
use crate::utils::error::Result;
use async_trait::async_trait;
use axum::response::Response;
use std::sync::Arc;
use utoipa::openapi::{RefOr, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial_update",
            Action::Destroy => "destroy",
        }
    }
}

pub const COLLECTION_ACTIONS: [(Verb, Action); 2] =
    [(Verb::Get, Action::List), (Verb::Post, Action::Create)];

pub const MEMBER_ACTIONS: [(Verb, Action); 4] = [
    (Verb::Get, Action::Retrieve),
    (Verb::Put, Action::Update),
    (Verb::Patch, Action::PartialUpdate),
    (Verb::Delete, Action::Destroy),
];

pub const ALL_ACTIONS: &[Action] = &[
    Action::List,
    Action::Create,
    Action::Retrieve,
    Action::Update,
    Action::PartialUpdate,
    Action::Destroy,
];

#[async_trait]
pub trait ViewSet: Send + Sync + 'static {
    /// 有提供的動作；未列出的動作不會註冊路由
    fn actions(&self) -> &'static [Action];

    fn requires_auth(&self) -> bool {
        true
    }

    fn doc(&self, action: Action) -> OperationDoc;

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        Vec::new()
    }

    async fn list(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Get.not_allowed())
    }

    async fn create(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Post.not_allowed())
    }

    async fn retrieve(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Get.not_allowed())
    }

    async fn update(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Put.not_allowed())
    }

    async fn partial_update(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Patch.not_allowed())
    }

    async fn destroy(&self, _req: ViewRequest) -> Result<Response> {
        Err(Verb::Delete.not_allowed())
    }
}

async fn dispatch(viewset: &dyn ViewSet, action: Action, req: ViewRequest) -> Result<Response> {
    match action {
        Action::List => viewset.list(req).await,
        Action::Create => viewset.create(req).await,
        Action::Retrieve => viewset.retrieve(req).await,
        Action::Update => viewset.update(req).await,
        Action::PartialUpdate => viewset.partial_update(req).await,
        Action::Destroy => viewset.destroy(req).await,
    }
}

impl ApiRouter {
    /// 依動作表註冊 viewset 的集合與單筆路由
    pub fn viewset<V: ViewSet>(mut self, prefix: &str, viewset: V) -> Self {
        let viewset: Arc<dyn ViewSet> = Arc::new(viewset);
        let (collection, member, member_doc) = collection_and_member(prefix);

        for (route_path, doc_path, table) in [
            (&collection, &collection, &COLLECTION_ACTIONS[..]),
            (&member, &member_doc, &MEMBER_ACTIONS[..]),
        ] {
            let mut method_router = None;

            for &(verb, action) in table {
                if !viewset.actions().contains(&action) {
                    continue;
                }

                let handler_viewset = viewset.clone();
                let handler = move |req: ViewRequest| -> ViewFuture {
                    let viewset = handler_viewset.clone();
                    Box::pin(async move { dispatch(viewset.as_ref(), action, req).await })
                };
                method_router = Some(bind(method_router, verb, viewset.requires_auth(), handler));

                self.endpoints.push(EndpointDoc::new(
                    doc_path,
                    verb,
                    action.name(),
                    viewset.requires_auth(),
                    viewset.doc(action),
                ));
            }

            if let Some(method_router) = method_router {
                self = self.route(route_path, with_method_fallback(method_router));
            }
        }

        self.add_components(viewset.components());
        self
    }
}
