use crate::core::attributes::assigned_only;
use crate::core::recipes::RecipeFilter;
use crate::core::serializers::{
    AttributeNameSerializer, IngredientSerializer, RecipeDetailSerializer, RecipeSerializer,
    RecipeWriteSerializer, TagSerializer,
};
use crate::domain::model::{Attribute, AttributeKind};
use crate::http::routes::{
    component, json, no_content, BodyDoc, OperationDoc, ParamKind, ViewRequest,
};
use crate::http::viewsets::{Action, ViewSet, ALL_ACTIONS};
use crate::utils::error::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use utoipa::openapi::{RefOr, Schema};

/// 食譜的完整 CRUD，只看得到自己的食譜
pub struct RecipeViewSet;

impl RecipeViewSet {
    async fn save(&self, req: ViewRequest, partial: bool) -> Result<Response> {
        let user = req.user()?;
        let id = req.id()?;
        let input: RecipeWriteSerializer = req.payload.decode()?;
        let view = req.state.recipes.update(user, id, input, partial).await?;
        Ok(json(StatusCode::OK, &RecipeDetailSerializer::from(&view)))
    }
}

#[async_trait]
impl ViewSet for RecipeViewSet {
    fn actions(&self) -> &'static [Action] {
        ALL_ACTIONS
    }

    fn doc(&self, action: Action) -> OperationDoc {
        let detail = || Some(BodyDoc::one::<RecipeDetailSerializer>());
        let write = BodyDoc::one::<RecipeWriteSerializer>();

        match action {
            Action::List => OperationDoc::new("List recipes for the authenticated user.")
                .query(
                    "tags",
                    ParamKind::String,
                    "Comma separated list of tag IDs to filter",
                )
                .query(
                    "ingredients",
                    ParamKind::String,
                    "Comma separated list of ingredient IDs to filter",
                )
                .response(200, "Recipes", Some(BodyDoc::many::<RecipeSerializer>())),
            Action::Create => OperationDoc::new("Create a new recipe.")
                .request(write)
                .response(201, "Recipe created", detail())
                .response(400, "Invalid recipe data", None),
            Action::Retrieve => OperationDoc::new("Retrieve a recipe.")
                .response(200, "Recipe detail", detail())
                .response(404, "Not found", None),
            Action::Update => OperationDoc::new("Update a recipe.")
                .request(write)
                .response(200, "Recipe detail", detail())
                .response(400, "Invalid recipe data", None),
            Action::PartialUpdate => OperationDoc::new("Partially update a recipe.")
                .request(write)
                .response(200, "Recipe detail", detail())
                .response(400, "Invalid recipe data", None),
            Action::Destroy => OperationDoc::new("Delete a recipe.")
                .response(204, "Recipe deleted", None)
                .response(404, "Not found", None),
        }
    }

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        vec![
            component::<RecipeSerializer>(),
            component::<RecipeDetailSerializer>(),
            component::<RecipeWriteSerializer>(),
            component::<AttributeNameSerializer>(),
            component::<TagSerializer>(),
            component::<IngredientSerializer>(),
        ]
    }

    async fn list(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        let filter = RecipeFilter::from_query(&req.query)?;
        let recipes = req.state.recipes.list(user, &filter).await?;
        let body: Vec<RecipeSerializer> = recipes.iter().map(RecipeSerializer::from).collect();
        Ok(json(StatusCode::OK, &body))
    }

    async fn create(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        let input: RecipeWriteSerializer = req.payload.decode()?;
        let view = req.state.recipes.create(user, input).await?;
        Ok(json(StatusCode::CREATED, &RecipeDetailSerializer::from(&view)))
    }

    async fn retrieve(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        let view = req.state.recipes.retrieve(user, req.id()?).await?;
        Ok(json(StatusCode::OK, &RecipeDetailSerializer::from(&view)))
    }

    async fn update(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, false).await
    }

    async fn partial_update(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, true).await
    }

    async fn destroy(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        req.state.recipes.destroy(user, req.id()?).await?;
        Ok(no_content())
    }
}

/// 標籤或食材：列表、更新、刪除；建立只能透過食譜
pub struct AttributeViewSet {
    kind: AttributeKind,
}

impl AttributeViewSet {
    pub fn tags() -> Self {
        Self {
            kind: AttributeKind::Tag,
        }
    }

    pub fn ingredients() -> Self {
        Self {
            kind: AttributeKind::Ingredient,
        }
    }

    fn serialize(&self, attribute: &Attribute) -> Result<Value> {
        let value = match self.kind {
            AttributeKind::Tag => serde_json::to_value(TagSerializer::from(attribute))?,
            AttributeKind::Ingredient => serde_json::to_value(IngredientSerializer::from(attribute))?,
        };
        Ok(value)
    }

    fn body_doc(&self, many: bool) -> BodyDoc {
        match (self.kind, many) {
            (AttributeKind::Tag, false) => BodyDoc::one::<TagSerializer>(),
            (AttributeKind::Tag, true) => BodyDoc::many::<TagSerializer>(),
            (AttributeKind::Ingredient, false) => BodyDoc::one::<IngredientSerializer>(),
            (AttributeKind::Ingredient, true) => BodyDoc::many::<IngredientSerializer>(),
        }
    }

    async fn save(&self, req: ViewRequest, partial: bool) -> Result<Response> {
        let user = req.user()?;
        let id = req.id()?;
        let input: AttributeNameSerializer = req.payload.decode()?;
        let attribute = req
            .state
            .attributes
            .update(self.kind, user, id, input, partial)
            .await?;
        Ok(json(StatusCode::OK, &self.serialize(&attribute)?))
    }
}

#[async_trait]
impl ViewSet for AttributeViewSet {
    fn actions(&self) -> &'static [Action] {
        &[
            Action::List,
            Action::Update,
            Action::PartialUpdate,
            Action::Destroy,
        ]
    }

    fn doc(&self, action: Action) -> OperationDoc {
        let plural = self.kind.plural();
        match action {
            Action::List => OperationDoc::new(format!("List {} for the authenticated user.", plural))
                .query(
                    "assigned_only",
                    ParamKind::Integer,
                    "Filter by items assigned to recipes (0 or 1)",
                )
                .response(200, "Items", Some(self.body_doc(true))),
            Action::Destroy => OperationDoc::new(format!("Delete one of the user's {}.", plural))
                .response(204, "Deleted", None)
                .response(404, "Not found", None),
            _ => OperationDoc::new(format!("Rename one of the user's {}.", plural))
                .request(BodyDoc::one::<AttributeNameSerializer>())
                .response(200, "Updated", Some(self.body_doc(false)))
                .response(400, "Invalid name", None),
        }
    }

    fn components(&self) -> Vec<(String, RefOr<Schema>)> {
        let serializer = match self.kind {
            AttributeKind::Tag => component::<TagSerializer>(),
            AttributeKind::Ingredient => component::<IngredientSerializer>(),
        };
        vec![serializer, component::<AttributeNameSerializer>()]
    }

    async fn list(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        let assigned = assigned_only(&req.query)?;
        let attributes = req.state.attributes.list(self.kind, user, assigned).await?;
        let body = attributes
            .iter()
            .map(|attribute| self.serialize(attribute))
            .collect::<Result<Vec<_>>>()?;
        Ok(json(StatusCode::OK, &body))
    }

    async fn update(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, false).await
    }

    async fn partial_update(&self, req: ViewRequest) -> Result<Response> {
        self.save(req, true).await
    }

    async fn destroy(&self, req: ViewRequest) -> Result<Response> {
        let user = req.user()?;
        req.state
            .attributes
            .destroy(self.kind, user, req.id()?)
            .await?;
        Ok(no_content())
    }
}
