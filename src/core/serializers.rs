//! Request and response shapes for the public API.
//!
//! Input types keep every field optional so that a missing field can be
//! reported as a field error instead of a parse failure, and so the same type
//! serves full (`PUT`) and partial (`PATCH`) updates.

use crate::core::recipes::RecipeView;
use crate::domain::model::{Attribute, User};
use crate::utils::error::{FieldErrors, Result};
use crate::utils::validation::{check_required_text, check_text, REQUIRED};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const NAME_MAX_LENGTH: usize = 255;
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// 使用者註冊與更新
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserSerializer {
    pub email: Option<String>,
    #[schema(write_only, min_length = 5)]
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserDetailSerializer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserDetailSerializer {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuthTokenSerializer {
    pub email: Option<String>,
    #[schema(write_only)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TokenSerializer {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TagSerializer {
    pub id: u64,
    pub name: String,
}

impl From<&Attribute> for TagSerializer {
    fn from(attribute: &Attribute) -> Self {
        Self {
            id: attribute.id,
            name: attribute.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngredientSerializer {
    pub id: u64,
    pub name: String,
}

impl From<&Attribute> for IngredientSerializer {
    fn from(attribute: &Attribute) -> Self {
        Self {
            id: attribute.id,
            name: attribute.name.clone(),
        }
    }
}

/// 標籤或食材的名稱，更新時與巢狀建立時共用
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AttributeNameSerializer {
    pub name: Option<String>,
}

impl AttributeNameSerializer {
    pub fn validate(&self, partial: bool) -> Result<Option<String>> {
        let mut errors = FieldErrors::new();
        let name = match (&self.name, partial) {
            (None, true) => None,
            (name, _) => check_required_text(&mut errors, "name", name.as_deref(), NAME_MAX_LENGTH)
                .map(str::to_string),
        };
        errors.into_result()?;
        Ok(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecipeWriteSerializer {
    pub title: Option<String>,
    pub time_minutes: Option<u32>,
    #[schema(value_type = Option<String>, example = "5.25")]
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<AttributeNameSerializer>>,
    pub ingredients: Option<Vec<AttributeNameSerializer>>,
}

/// 驗證後的食譜欄位，`None` 代表不變更
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<u32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeWriteSerializer {
    /// `partial` 為 false 時 title、time_minutes、price 為必填
    pub fn validate(self, partial: bool) -> Result<RecipeChanges> {
        let mut errors = FieldErrors::new();

        if let Some(title) = &self.title {
            check_text(&mut errors, "title", title, NAME_MAX_LENGTH, false);
        } else if !partial {
            errors.add("title", REQUIRED);
        }

        if self.time_minutes.is_none() && !partial {
            errors.add("time_minutes", REQUIRED);
        }

        let price = match self.price {
            Some(price) => validate_price(&mut errors, price),
            None => {
                if !partial {
                    errors.add("price", REQUIRED);
                }
                None
            }
        };

        if let Some(link) = &self.link {
            check_text(&mut errors, "link", link, NAME_MAX_LENGTH, true);
        }

        let tags = nested_names(&mut errors, "tags", self.tags);
        let ingredients = nested_names(&mut errors, "ingredients", self.ingredients);

        errors.into_result()?;

        Ok(RecipeChanges {
            title: self.title,
            time_minutes: self.time_minutes,
            price,
            link: self.link,
            description: self.description,
            tags,
            ingredients,
        })
    }
}

fn validate_price(errors: &mut FieldErrors, price: Decimal) -> Option<Decimal> {
    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ),
        );
        return None;
    }

    let limit = Decimal::from(10u64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if normalized.abs() >= limit {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} digits in total.",
                PRICE_MAX_DIGITS
            ),
        );
        return None;
    }

    let mut rescaled = normalized;
    rescaled.rescale(PRICE_DECIMAL_PLACES);
    Some(rescaled)
}

fn nested_names(
    errors: &mut FieldErrors,
    field: &str,
    items: Option<Vec<AttributeNameSerializer>>,
) -> Option<Vec<String>> {
    let items = items?;
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in &items {
        match item.validate(false) {
            Ok(Some(name)) => {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            Ok(None) => {}
            Err(_) => errors.add(field, "Each item needs a non-blank name of at most 255 characters."),
        }
    }
    Some(names)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RecipeSerializer {
    pub id: u64,
    pub title: String,
    pub time_minutes: u32,
    #[schema(value_type = String, example = "5.25")]
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagSerializer>,
    pub ingredients: Vec<IngredientSerializer>,
}

impl From<&RecipeView> for RecipeSerializer {
    fn from(view: &RecipeView) -> Self {
        Self {
            id: view.recipe.id,
            title: view.recipe.title.clone(),
            time_minutes: view.recipe.time_minutes,
            price: view.recipe.price,
            link: view.recipe.link.clone(),
            tags: view.tags.iter().map(TagSerializer::from).collect(),
            ingredients: view
                .ingredients
                .iter()
                .map(IngredientSerializer::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RecipeDetailSerializer {
    #[serde(flatten)]
    pub recipe: RecipeSerializer,
    pub description: String,
}

impl From<&RecipeView> for RecipeDetailSerializer {
    fn from(view: &RecipeView) -> Self {
        Self {
            recipe: RecipeSerializer::from(view),
            description: view.recipe.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AppError;
    use std::str::FromStr;

    fn field_errors(result: Result<RecipeChanges>) -> FieldErrors {
        match result {
            Err(AppError::ValidationError(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn create_requires_core_fields() {
        let errors = field_errors(RecipeWriteSerializer::default().validate(false));
        assert!(errors.contains("title"));
        assert!(errors.contains("time_minutes"));
        assert!(errors.contains("price"));

        assert_eq!(
            RecipeWriteSerializer::default().validate(true).unwrap(),
            RecipeChanges::default()
        );
    }

    #[test]
    fn price_is_rescaled_to_two_places() {
        let input = RecipeWriteSerializer {
            price: Some(Decimal::from_str("5.5").unwrap()),
            ..Default::default()
        };
        let changes = input.validate(true).unwrap();
        assert_eq!(changes.price.unwrap().to_string(), "5.50");
    }

    #[test]
    fn price_limits_are_enforced() {
        for raw in ["1.234", "1000.00", "-1000"] {
            let input = RecipeWriteSerializer {
                price: Some(Decimal::from_str(raw).unwrap()),
                ..Default::default()
            };
            let errors = field_errors(input.validate(true));
            assert!(errors.contains("price"), "{} should be rejected", raw);
        }

        let input = RecipeWriteSerializer {
            price: Some(Decimal::from_str("999.99").unwrap()),
            ..Default::default()
        };
        assert!(input.validate(true).is_ok());
    }

    #[test]
    fn nested_names_are_deduplicated() {
        let input = RecipeWriteSerializer {
            tags: Some(vec![
                AttributeNameSerializer {
                    name: Some("Thai".to_string()),
                },
                AttributeNameSerializer {
                    name: Some("Thai".to_string()),
                },
                AttributeNameSerializer {
                    name: Some("Dinner".to_string()),
                },
            ]),
            ingredients: Some(vec![]),
            ..Default::default()
        };
        let changes = input.validate(true).unwrap();
        assert_eq!(changes.tags, Some(vec!["Thai".to_string(), "Dinner".to_string()]));
        assert_eq!(changes.ingredients, Some(vec![]));
    }

    #[test]
    fn blank_nested_name_is_rejected() {
        let input = RecipeWriteSerializer {
            ingredients: Some(vec![AttributeNameSerializer {
                name: Some(" ".to_string()),
            }]),
            ..Default::default()
        };
        assert!(field_errors(input.validate(true)).contains("ingredients"));
    }

    #[test]
    fn attribute_name_update() {
        assert!(AttributeNameSerializer::default().validate(false).is_err());
        assert_eq!(AttributeNameSerializer::default().validate(true).unwrap(), None);
        let named = AttributeNameSerializer {
            name: Some("Dessert".to_string()),
        };
        assert_eq!(named.validate(false).unwrap(), Some("Dessert".to_string()));
    }
}
