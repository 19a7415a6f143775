mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{create_user, TestClient};
use recipe_api::core::serializers::{AttributeNameSerializer, RecipeWriteSerializer};
use recipe_api::core::{AttributeKind, RecipeFilter};
use recipe_api::domain::model::User;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

const RECIPES_URL: &str = "/api/recipe/recipes/";

fn detail_url(id: u64) -> String {
    format!("{}{}/", RECIPES_URL, id)
}

fn names(items: &[&str]) -> Option<Vec<AttributeNameSerializer>> {
    Some(
        items
            .iter()
            .map(|name| AttributeNameSerializer {
                name: Some(name.to_string()),
            })
            .collect(),
    )
}

/// 建立食譜，未指定的欄位使用預設值
async fn sample_recipe(client: &TestClient, user: &User, title: &str) -> Result<u64> {
    let view = client
        .state
        .recipes
        .create(
            user,
            RecipeWriteSerializer {
                title: Some(title.to_string()),
                time_minutes: Some(22),
                price: Some(Decimal::from_str("5.25")?),
                description: Some("Sample description".to_string()),
                link: Some("http://example.com/recipe.pdf".to_string()),
                ..Default::default()
            },
        )
        .await?;
    Ok(view.recipe.id)
}

fn tag_names(body: &Value, field: &str) -> Vec<String> {
    let mut names: Vec<String> = body[field]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_auth_required() -> Result<()> {
    let client = TestClient::new()?;

    let res = client.get(RECIPES_URL).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_retrieve_recipes_newest_first() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let first = sample_recipe(&client, &user, "First").await?;
    let second = sample_recipe(&client, &user, "Second").await?;

    let res = client.get(RECIPES_URL).await?;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    let ids: Vec<u64> = body
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["id"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(body[0]["price"], "5.25");
    // 列表不含 description
    assert!(body[0].get("description").is_none());
    Ok(())
}

#[tokio::test]
async fn test_recipe_list_limited_to_user() -> Result<()> {
    let client = TestClient::new()?;
    let other = create_user(&client.state, "other@example.com", "password123").await?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    sample_recipe(&client, &other, "Theirs").await?;
    let mine = sample_recipe(&client, &user, "Mine").await?;

    let res = client.get(RECIPES_URL).await?;

    let body = res.json();
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], mine);
    Ok(())
}

#[tokio::test]
async fn test_get_recipe_detail() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Sample recipe title").await?;

    let res = client.get(&detail_url(id)).await?;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["title"], "Sample recipe title");
    assert_eq!(body["description"], "Sample description");
    assert_eq!(body["time_minutes"], 22);
    Ok(())
}

#[tokio::test]
async fn test_create_recipe() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;

    let res = client
        .post(
            RECIPES_URL,
            json!({ "title": "Sample recipe", "time_minutes": 30, "price": "5.99" }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.json()["id"].as_u64().unwrap_or_default();
    let view = client.state.recipes.retrieve(&user, id).await?;
    assert_eq!(view.recipe.title, "Sample recipe");
    assert_eq!(view.recipe.time_minutes, 30);
    assert_eq!(view.recipe.price, Decimal::from_str("5.99")?);
    assert_eq!(view.recipe.user_id, user.id);
    Ok(())
}

#[tokio::test]
async fn test_create_recipe_validation_errors() -> Result<()> {
    let client = TestClient::new()?;
    let (client, _user) = client.authenticated("user@example.com", "test123").await?;

    let res = client
        .post(RECIPES_URL, json!({ "title": "", "price": "1.234" }))
        .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json();
    assert!(body["title"].is_array());
    assert!(body["time_minutes"].is_array());
    assert!(body["price"].is_array());
    Ok(())
}

#[tokio::test]
async fn test_partial_update() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Sample recipe title").await?;

    let res = client
        .patch(&detail_url(id), json!({ "link": "https://example.com/new.pdf" }))
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    let view = client.state.recipes.retrieve(&user, id).await?;
    assert_eq!(view.recipe.link, "https://example.com/new.pdf");
    assert_eq!(view.recipe.title, "Sample recipe title");
    Ok(())
}

#[tokio::test]
async fn test_full_update() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Sample recipe title").await?;

    let res = client
        .put(
            &detail_url(id),
            json!({
                "title": "New recipe title",
                "link": "https://example.com/new-recipe.pdf",
                "description": "New recipe description",
                "time_minutes": 10,
                "price": "2.50",
            }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    let view = client.state.recipes.retrieve(&user, id).await?;
    assert_eq!(view.recipe.title, "New recipe title");
    assert_eq!(view.recipe.description, "New recipe description");
    assert_eq!(view.recipe.time_minutes, 10);
    assert_eq!(view.recipe.price, Decimal::from_str("2.50")?);
    Ok(())
}

#[tokio::test]
async fn test_update_user_field_is_ignored() -> Result<()> {
    let client = TestClient::new()?;
    let other = create_user(&client.state, "other@example.com", "password123").await?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Mine").await?;

    client
        .patch(&detail_url(id), json!({ "user": other.id, "user_id": other.id }))
        .await?;

    let view = client.state.recipes.retrieve(&user, id).await?;
    assert_eq!(view.recipe.user_id, user.id);
    Ok(())
}

#[tokio::test]
async fn test_delete_recipe() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Doomed").await?;

    let res = client.delete(&detail_url(id)).await?;

    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(client.state.recipes.retrieve(&user, id).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_delete_other_users_recipe_error() -> Result<()> {
    let client = TestClient::new()?;
    let other = create_user(&client.state, "other@example.com", "password123").await?;
    let (client, _user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &other, "Theirs").await?;

    let res = client.delete(&detail_url(id)).await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["detail"], "Not found.");
    assert!(client.state.recipes.retrieve(&other, id).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_unknown_recipe_is_not_found() -> Result<()> {
    let client = TestClient::new()?;
    let (client, _user) = client.authenticated("user@example.com", "test123").await?;

    assert_eq!(client.get(&detail_url(999)).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(
        client.get("/api/recipe/recipes/abc/").await?.status,
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test]
async fn test_create_recipe_with_new_tags() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;

    let res = client
        .post(
            RECIPES_URL,
            json!({
                "title": "Thai Prawn Curry",
                "time_minutes": 30,
                "price": "2.50",
                "tags": [{ "name": "Thai" }, { "name": "Dinner" }],
            }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(tag_names(&res.json(), "tags"), vec!["Dinner", "Thai"]);
    let tags = client
        .state
        .attributes
        .list(AttributeKind::Tag, &user, false)
        .await?;
    assert_eq!(tags.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_create_recipe_with_existing_tag() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    client
        .post(
            RECIPES_URL,
            json!({ "title": "Pho", "time_minutes": 60, "price": "4.50", "tags": [{ "name": "Indian" }] }),
        )
        .await?;

    let res = client
        .post(
            RECIPES_URL,
            json!({
                "title": "Pongal",
                "time_minutes": 60,
                "price": "4.50",
                "tags": [{ "name": "Indian" }, { "name": "Breakfast" }],
            }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    let tags = client
        .state
        .attributes
        .list(AttributeKind::Tag, &user, false)
        .await?;
    assert_eq!(tags.len(), 2, "existing tag is reused");
    Ok(())
}

#[tokio::test]
async fn test_update_assigns_and_clears_tags() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;
    let id = sample_recipe(&client, &user, "Lunch dish").await?;

    let res = client
        .patch(&detail_url(id), json!({ "tags": [{ "name": "Lunch" }] }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(tag_names(&res.json(), "tags"), vec!["Lunch"]);

    let res = client
        .patch(&detail_url(id), json!({ "tags": [{ "name": "Breakfast" }] }))
        .await?;
    assert_eq!(tag_names(&res.json(), "tags"), vec!["Breakfast"]);

    let res = client.patch(&detail_url(id), json!({ "tags": [] })).await?;
    assert_eq!(res.status, StatusCode::OK);
    let view = client.state.recipes.retrieve(&user, id).await?;
    assert!(view.tags.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_create_recipe_with_ingredients() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;

    let res = client
        .post(
            RECIPES_URL,
            json!({
                "title": "Cauliflower Tacos",
                "time_minutes": 60,
                "price": "4.30",
                "ingredients": [{ "name": "Cauliflower" }, { "name": "Salt" }],
            }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(
        tag_names(&res.json(), "ingredients"),
        vec!["Cauliflower", "Salt"]
    );

    let id = res.json()["id"].as_u64().unwrap_or_default();
    let res = client
        .patch(&detail_url(id), json!({ "ingredients": [] }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let view = client.state.recipes.retrieve(&user, id).await?;
    assert!(view.ingredients.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_filter_by_tags_and_ingredients() -> Result<()> {
    let client = TestClient::new()?;
    let (client, user) = client.authenticated("user@example.com", "test123").await?;

    let curry = client
        .state
        .recipes
        .create(
            &user,
            RecipeWriteSerializer {
                title: Some("Thai Vegetable Curry".to_string()),
                time_minutes: Some(30),
                price: Some(Decimal::from_str("3.00")?),
                tags: names(&["Vegan"]),
                ingredients: names(&["Feta Cheese"]),
                ..Default::default()
            },
        )
        .await?;
    let tahini = client
        .state
        .recipes
        .create(
            &user,
            RecipeWriteSerializer {
                title: Some("Aubergine with Tahini".to_string()),
                time_minutes: Some(30),
                price: Some(Decimal::from_str("3.00")?),
                tags: names(&["Vegetarian"]),
                ingredients: names(&["Chicken"]),
                ..Default::default()
            },
        )
        .await?;
    let plain = sample_recipe(&client, &user, "Fish and chips").await?;

    let tag_ids = format!("{},{}", curry.tags[0].id, tahini.tags[0].id);
    let res = client.get(&format!("{}?tags={}", RECIPES_URL, tag_ids)).await?;
    let ids: Vec<u64> = res
        .json()
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["id"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![tahini.recipe.id, curry.recipe.id]);
    assert!(!ids.contains(&plain));

    let res = client
        .get(&format!(
            "{}?ingredients={}",
            RECIPES_URL, curry.ingredients[0].id
        ))
        .await?;
    let body = res.json();
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], curry.recipe.id);

    let filter = RecipeFilter::default();
    assert_eq!(client.state.recipes.list(&user, &filter).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_bad_filter_id_is_rejected() -> Result<()> {
    let client = TestClient::new()?;
    let (client, _user) = client.authenticated("user@example.com", "test123").await?;

    let res = client.get(&format!("{}?tags=1,abc", RECIPES_URL)).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["tags"].is_array());
    Ok(())
}
