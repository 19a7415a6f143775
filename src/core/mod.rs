pub mod attributes;
pub mod recipes;
pub mod serializers;
pub mod users;

pub use crate::domain::model::{Attribute, AttributeKind, Recipe, User};
pub use crate::domain::ports::{PasswordHasher, Store};
pub use crate::utils::error::Result;
pub use attributes::AttributeService;
pub use recipes::{RecipeFilter, RecipeService, RecipeView};
pub use users::UserService;
