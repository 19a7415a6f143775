use crate::core::serializers::{
    AuthTokenSerializer, TokenSerializer, UserDetailSerializer, UserSerializer,
};
use crate::http::routes::{component, json, BodyDoc, OperationDoc, ViewRequest, Verb};
use crate::http::views::ApiView;
use crate::utils::error::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use utoipa::openapi::{RefOr, Schema};

fn user_components() -> Vec<(String, RefOr<Schema>)> {
    vec![
        component::<UserSerializer>(),
        component::<UserDetailSerializer>(),
    ]
}

/// 註冊新使用者
pub struct CreateUserView;

#[async_trait]
impl ApiView for CreateUserView {
    fn verbs(&self) -> &'static [Verb] {
        &[Verb::Post]
    }

    fn doc(&self, _verb: Verb) -> OperationDoc {
        OperationDoc::new("Create a new user in the system.")
            .request(BodyDoc::one::<UserSerializer>())
            .response(201, "User created", Some(BodyDoc::one::<UserDetailSerializer>()))
            .response(400, "Invalid user data", None)
    }

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        user_components()
    }

    async fn post(&self, req: ViewRequest) -> Result<Response> {
        let input: UserSerializer = req.payload.decode()?;
        let user = req.state.users.register(input).await?;
        Ok(json(StatusCode::CREATED, &UserDetailSerializer::from(&user)))
    }
}

/// 以 email 與密碼換取 token
pub struct CreateTokenView;

#[async_trait]
impl ApiView for CreateTokenView {
    fn verbs(&self) -> &'static [Verb] {
        &[Verb::Post]
    }

    fn doc(&self, _verb: Verb) -> OperationDoc {
        OperationDoc::new("Create a new auth token for user.")
            .request(BodyDoc::one::<AuthTokenSerializer>())
            .response(200, "Token for the authenticated user", Some(BodyDoc::one::<TokenSerializer>()))
            .response(400, "Unable to authenticate with provided credentials", None)
    }

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        vec![
            component::<AuthTokenSerializer>(),
            component::<TokenSerializer>(),
        ]
    }

    async fn post(&self, req: ViewRequest) -> Result<Response> {
        let input: AuthTokenSerializer = req.payload.decode()?;
        let token = req.state.users.obtain_token(input).await?;
        Ok(json(StatusCode::OK, &TokenSerializer { token: token.key }))
    }
}

/// 目前登入的使用者
pub struct ManageUserView;

impl ManageUserView {
    async fn save(&self, req: ViewRequest, partial: bool) -> Result<Response> {
        let user = req.user()?;
        let input: UserSerializer = req.payload.decode()?;
        let user = req.state.users.update_profile(user, input, partial).await?;
        Ok(json(StatusCode::OK, &UserDetailSerializer::from(&user)))
    }
}

#[async_trait]
impl ApiView for ManageUserView {
    fn verbs(&self) -> &'static [Verb] {
        &[Verb::Get, Verb::Put, Verb::Patch]
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn doc(&self, verb: Verb) -> OperationDoc {
        let doc = match verb {
            Verb::Get => OperationDoc::new("Retrieve the authenticated user."),
            Verb::Patch => OperationDoc::new("Partially update the authenticated user.")
                .request(BodyDoc::one::<UserSerializer>()),
            _ => OperationDoc::new("Update the authenticated user.")
                .request(BodyDoc::one::<UserSerializer>()),
        };
        doc.response(200, "The authenticated user", Some(BodyDoc::one::<UserDetailSerializer>()))
            .response(401, "Authentication credentials were not provided", None)
    }

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        user_components()
    }

    async fn get(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        Ok(json(StatusCode::OK, &UserDetailSerializer::from(user)))
    }

    async fn put(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, false).await
    }

    async fn patch(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, true).await
    }
}
