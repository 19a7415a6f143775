//! OpenAPI 文件產生與 Swagger UI

use crate::config::SchemaConfig;
use crate::http::routes::{ApiRouter, BodyDoc, EndpointDoc, ParamKind, Verb};
use crate::http::AppState;
use crate::utils::error::{AppError, Result};
use askama::Template;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{
    HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{Array, ObjectBuilder, SchemaType, Type};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityRequirement, SecurityScheme};
use utoipa::openapi::{
    ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    Schema,
};

pub const SCHEMA_PATH: &str = "/api/schema/";
pub const DOCS_PATH: &str = "/api/docs/";
pub const SECURITY_SCHEME: &str = "tokenAuth";

/// 由 `schema.default_schema_class` 選擇的文件產生方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaClass {
    OpenApi,
    Disabled,
}

impl FromStr for SchemaClass {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openapi" | "auto" => Ok(SchemaClass::OpenApi),
            "none" | "" => Ok(SchemaClass::Disabled),
            other => Err(AppError::InvalidConfigValueError {
                field: "schema.default_schema_class".to_string(),
                value: other.to_string(),
                reason: "Valid classes: openapi, auto, none".to_string(),
            }),
        }
    }
}

impl fmt::Display for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaClass::OpenApi => write!(f, "openapi"),
            SchemaClass::Disabled => write!(f, "none"),
        }
    }
}

pub trait SchemaGenerator: Send + Sync {
    fn generate(
        &self,
        endpoints: &[EndpointDoc],
        components: &BTreeMap<String, RefOr<Schema>>,
    ) -> Result<Value>;
}

pub fn generator_for(class: SchemaClass, config: &SchemaConfig) -> Option<Box<dyn SchemaGenerator>> {
    match class {
        SchemaClass::OpenApi => Some(Box::new(OpenApiGenerator::new(config))),
        SchemaClass::Disabled => None,
    }
}

/// 產生整份 API 的文件；停用時回傳 None
pub fn document(api: &ApiRouter, class: SchemaClass, config: &SchemaConfig) -> Result<Option<Value>> {
    generator_for(class, config)
        .map(|generator| generator.generate(api.endpoints(), api.components()))
        .transpose()
}

pub struct OpenApiGenerator {
    title: String,
    version: String,
    description: Option<String>,
}

impl OpenApiGenerator {
    pub fn new(config: &SchemaConfig) -> Self {
        Self {
            title: config.title.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
        }
    }

    pub fn build(
        &self,
        endpoints: &[EndpointDoc],
        components: &BTreeMap<String, RefOr<Schema>>,
    ) -> OpenApi {
        let mut info = InfoBuilder::new().title(&self.title).version(&self.version);
        if let Some(description) = &self.description {
            info = info.description(Some(description.as_str()));
        }

        // 同一路徑的各方法合併在同一個 PathItem
        let mut items: BTreeMap<&str, PathItemBuilder> = BTreeMap::new();
        for endpoint in endpoints {
            let item = items
                .remove(endpoint.path.as_str())
                .unwrap_or_else(PathItemBuilder::new);
            items.insert(
                endpoint.path.as_str(),
                item.operation(http_method(endpoint.verb), operation(endpoint)),
            );
        }

        let mut paths = PathsBuilder::new();
        for (path, item) in items {
            paths = paths.path(path, item.build());
        }

        let mut schemas = ComponentsBuilder::new();
        for (name, schema) in components {
            schemas = schemas.schema(name.clone(), schema.clone());
        }
        let components = schemas
            .security_scheme(
                SECURITY_SCHEME,
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token-based authentication with required prefix \"Token\"",
                ))),
            )
            .build();

        OpenApiBuilder::new()
            .info(info.build())
            .paths(paths.build())
            .components(Some(components))
            .build()
    }
}

impl SchemaGenerator for OpenApiGenerator {
    fn generate(
        &self,
        endpoints: &[EndpointDoc],
        components: &BTreeMap<String, RefOr<Schema>>,
    ) -> Result<Value> {
        Ok(serde_json::to_value(self.build(endpoints, components))?)
    }
}

fn http_method(verb: Verb) -> HttpMethod {
    match verb {
        Verb::Get => HttpMethod::Get,
        Verb::Post => HttpMethod::Post,
        Verb::Put => HttpMethod::Put,
        Verb::Patch => HttpMethod::Patch,
        Verb::Delete => HttpMethod::Delete,
    }
}

fn scalar(schema_type: Type) -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .schema_type(SchemaType::Type(schema_type))
            .build(),
    ))
}

fn body_schema(body: &BodyDoc) -> RefOr<Schema> {
    let reference = RefOr::Ref(Ref::from_schema_name(body.schema.as_str()));
    if body.many {
        RefOr::T(Schema::Array(Array::new(reference)))
    } else {
        reference
    }
}

fn operation(endpoint: &EndpointDoc) -> utoipa::openapi::path::Operation {
    let doc = &endpoint.operation;
    let mut builder = OperationBuilder::new()
        .operation_id(Some(endpoint.operation_id.as_str()))
        .summary(Some(doc.summary.as_str()))
        .tag(endpoint.tag.as_str());

    if endpoint.has_id {
        builder = builder.parameter(
            ParameterBuilder::new()
                .name("id")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .description(Some("A unique integer value identifying this object."))
                .schema(Some(scalar(Type::Integer))),
        );
    }

    for param in &doc.query {
        let schema_type = match param.kind {
            ParamKind::Integer => Type::Integer,
            ParamKind::String => Type::String,
        };
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(param.name)
                .parameter_in(ParameterIn::Query)
                .required(Required::False)
                .description(Some(param.description))
                .schema(Some(scalar(schema_type))),
        );
    }

    if let Some(request) = &doc.request {
        let schema = body_schema(request);
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content(
                    "application/json",
                    ContentBuilder::new().schema(Some(schema.clone())).build(),
                )
                .content(
                    "application/x-www-form-urlencoded",
                    ContentBuilder::new().schema(Some(schema)).build(),
                )
                .required(Some(Required::True))
                .build(),
        ));
    }

    for response in &doc.responses {
        let mut response_builder = ResponseBuilder::new().description(response.description);
        if let Some(body) = &response.body {
            response_builder = response_builder.content(
                "application/json",
                ContentBuilder::new().schema(Some(body_schema(body))).build(),
            );
        }
        builder = builder.response(response.status.to_string(), response_builder.build());
    }

    if endpoint.secured {
        builder = builder.security(SecurityRequirement::new(
            SECURITY_SCHEME,
            Vec::<String>::new(),
        ));
    }

    builder.build()
}

#[derive(Template)]
#[template(
    source = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ title }}</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({
      url: "{{ schema_url|safe }}",
      dom_id: "#swagger-ui",
      deepLinking: true,
      persistAuthorization: true,
    });
  </script>
</body>
</html>"##,
    ext = "html"
)]
struct SwaggerUiTemplate<'a> {
    title: &'a str,
    schema_url: &'a str,
}

pub fn render_swagger_ui(title: &str) -> Result<String> {
    Ok(SwaggerUiTemplate {
        title,
        schema_url: SCHEMA_PATH,
    }
    .render()?)
}

/// `/api/schema/` 與 `/api/docs/`；文件在啟動時產生一次
pub fn routes(document: Value, title: &str) -> Result<Router<AppState>> {
    let document = Arc::new(document);
    let page = Arc::new(render_swagger_ui(title)?);

    Ok(Router::new()
        .route(
            SCHEMA_PATH,
            get(move || {
                let document = document.clone();
                async move { Json(Value::clone(&document)) }
            }),
        )
        .route(
            DOCS_PATH,
            get(move || {
                let page = page.clone();
                async move { Html(String::clone(&page)) }
            }),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::OperationDoc;

    #[test]
    fn schema_class_names() {
        assert_eq!("openapi".parse::<SchemaClass>().unwrap(), SchemaClass::OpenApi);
        assert_eq!("AUTO".parse::<SchemaClass>().unwrap(), SchemaClass::OpenApi);
        assert_eq!("none".parse::<SchemaClass>().unwrap(), SchemaClass::Disabled);
        assert!("coreapi".parse::<SchemaClass>().is_err());
    }

    #[test]
    fn secured_operations_reference_token_auth() {
        let endpoints = vec![
            EndpointDoc::new(
                "/api/recipe/tags/",
                Verb::Get,
                "list",
                true,
                OperationDoc::new("List tags")
                    .query("assigned_only", ParamKind::Integer, "0 or 1")
                    .response(200, "Tags", None),
            ),
            EndpointDoc::new(
                "/api/recipe/tags/{id}/",
                Verb::Delete,
                "destroy",
                true,
                OperationDoc::new("Delete tag").response(204, "Deleted", None),
            ),
        ];
        let generator = OpenApiGenerator::new(&SchemaConfig::default());
        let doc = generator.generate(&endpoints, &BTreeMap::new()).unwrap();

        let list = &doc["paths"]["/api/recipe/tags/"]["get"];
        assert_eq!(list["operationId"], "recipe_tags_list");
        assert_eq!(list["security"][0]["tokenAuth"], serde_json::json!([]));
        assert_eq!(list["parameters"][0]["name"], "assigned_only");

        let destroy = &doc["paths"]["/api/recipe/tags/{id}/"]["delete"];
        assert_eq!(destroy["parameters"][0]["in"], "path");
        assert!(doc["components"]["securitySchemes"]["tokenAuth"].is_object());
    }

    #[test]
    fn swagger_page_points_at_schema() {
        let html = render_swagger_ui("Recipe API").unwrap();
        assert!(html.contains("url: \"/api/schema/\""));
        assert!(html.contains("<title>Recipe API</title>"));
        assert!(html.contains("dom_id: \"#swagger-ui\""));
    }
}
