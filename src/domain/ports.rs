use crate::domain::model::{
    Attribute, AttributeId, AttributeKind, AuthToken, NewRecipe, NewUser, Recipe, RecipeId, User,
    UserId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 持久化介面，所有查詢都不做權限檢查，由 core 層負責
#[async_trait]
pub trait Store: Send + Sync {
    /// email 重複時回傳驗證錯誤
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn user(&self, id: UserId) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// 依 id 排序
    async fn users(&self) -> Result<Vec<User>>;
    async fn save_user(&self, user: &User) -> Result<()>;

    async fn token_for_user(&self, user_id: UserId) -> Result<Option<AuthToken>>;
    async fn token(&self, key: &str) -> Result<Option<AuthToken>>;
    async fn insert_token(&self, token: AuthToken) -> Result<()>;

    async fn insert_recipe(&self, user_id: UserId, recipe: NewRecipe) -> Result<Recipe>;
    async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>>;
    async fn recipes_for_user(&self, user_id: UserId) -> Result<Vec<Recipe>>;
    async fn save_recipe(&self, recipe: &Recipe) -> Result<()>;
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool>;

    async fn get_or_create_attribute(
        &self,
        kind: AttributeKind,
        user_id: UserId,
        name: &str,
    ) -> Result<Attribute>;
    async fn attribute(&self, kind: AttributeKind, id: AttributeId) -> Result<Option<Attribute>>;
    async fn attributes_for_user(
        &self,
        kind: AttributeKind,
        user_id: UserId,
    ) -> Result<Vec<Attribute>>;
    async fn save_attribute(&self, attribute: &Attribute) -> Result<()>;
    /// 同時從所有食譜移除
    async fn delete_attribute(&self, kind: AttributeKind, id: AttributeId) -> Result<bool>;
}

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}
