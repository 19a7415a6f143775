use crate::domain::model::{
    Attribute, AttributeId, AttributeKind, AuthToken, NewRecipe, NewUser, Recipe, RecipeId, User,
    UserId,
};
use crate::domain::ports::Store;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<String, AuthToken>,
    recipes: BTreeMap<RecipeId, Recipe>,
    tags: BTreeMap<AttributeId, Attribute>,
    ingredients: BTreeMap<AttributeId, Attribute>,
    next_user_id: u64,
    next_recipe_id: u64,
    next_tag_id: u64,
    next_ingredient_id: u64,
}

impl Tables {
    fn attributes(&self, kind: AttributeKind) -> &BTreeMap<AttributeId, Attribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut BTreeMap<AttributeId, Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn next_attribute_id(&mut self, kind: AttributeKind) -> AttributeId {
        let counter = match kind {
            AttributeKind::Tag => &mut self.next_tag_id,
            AttributeKind::Ingredient => &mut self.next_ingredient_id,
        };
        *counter += 1;
        *counter
    }
}

/// 記憶體資料表，可選擇在每次寫入後把快照存成 JSON 檔
#[derive(Debug, Default)]
pub struct LocalStore {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從快照檔載入；檔案不存在時從空資料開始
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let data = fs::read(&path)?;
            let tables: Tables = serde_json::from_slice(&data)?;
            tracing::info!(
                "📂 Loaded snapshot from {} ({} users, {} recipes)",
                path.display(),
                tables.users.len(),
                tables.recipes.len()
            );
            tables
        } else {
            tracing::info!("📂 No snapshot at {}, starting empty", path.display());
            Tables::default()
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // 先寫暫存檔再改名，避免中途失敗留下半個檔案
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(tables)?)?;
        fs::rename(&tmp_path, path)?;
        tracing::debug!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// 在副本上套用變更，快照寫入成功後才取代記憶體中的資料
    fn apply<T>(&self, tables: &mut Tables, change: impl FnOnce(&mut Tables) -> T) -> Result<T> {
        if self.snapshot_path.is_none() {
            return Ok(change(tables));
        }

        let mut candidate = tables.clone();
        let output = change(&mut candidate);
        self.persist(&candidate)?;
        *tables = candidate;
        Ok(output)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::field(
                "email",
                "user with this email already exists.",
            ));
        }

        self.apply(&mut tables, |tables| {
            tables.next_user_id += 1;
            let created = User {
                id: tables.next_user_id,
                email: user.email,
                password_hash: user.password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                is_active: true,
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
                last_login: None,
                date_joined: Utc::now(),
            };
            tables.users.insert(created.id, created.clone());
            created
        })
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(AppError::NotFound);
        }
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AppError::field(
                "email",
                "user with this email already exists.",
            ));
        }
        self.apply(&mut tables, |tables| {
            tables.users.insert(user.id, user.clone());
        })
    }

    async fn token_for_user(&self, user_id: UserId) -> Result<Option<AuthToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .values()
            .find(|t| t.user_id == user_id)
            .cloned())
    }

    async fn token(&self, key: &str) -> Result<Option<AuthToken>> {
        Ok(self.tables.read().await.tokens.get(key).cloned())
    }

    async fn insert_token(&self, token: AuthToken) -> Result<()> {
        let mut tables = self.tables.write().await;
        // 每個使用者只保留一個 token
        self.apply(&mut tables, |tables| {
            tables.tokens.retain(|_, t| t.user_id != token.user_id);
            tables.tokens.insert(token.key.clone(), token);
        })
    }

    async fn insert_recipe(&self, user_id: UserId, recipe: NewRecipe) -> Result<Recipe> {
        let mut tables = self.tables.write().await;
        self.apply(&mut tables, |tables| {
            tables.next_recipe_id += 1;
            let created = Recipe {
                id: tables.next_recipe_id,
                user_id,
                title: recipe.title,
                description: recipe.description,
                time_minutes: recipe.time_minutes,
                price: recipe.price,
                link: recipe.link,
                tags: Vec::new(),
                ingredients: Vec::new(),
            };
            tables.recipes.insert(created.id, created.clone());
            created
        })
    }

    async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        Ok(self.tables.read().await.recipes.get(&id).cloned())
    }

    async fn recipes_for_user(&self, user_id: UserId) -> Result<Vec<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_recipe(&self, recipe: &Recipe) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.recipes.contains_key(&recipe.id) {
            return Err(AppError::NotFound);
        }
        self.apply(&mut tables, |tables| {
            tables.recipes.insert(recipe.id, recipe.clone());
        })
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.recipes.contains_key(&id) {
            return Ok(false);
        }
        self.apply(&mut tables, |tables| {
            tables.recipes.remove(&id);
        })?;
        Ok(true)
    }

    async fn get_or_create_attribute(
        &self,
        kind: AttributeKind,
        user_id: UserId,
        name: &str,
    ) -> Result<Attribute> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .attributes(kind)
            .values()
            .find(|a| a.user_id == user_id && a.name == name)
        {
            return Ok(existing.clone());
        }

        self.apply(&mut tables, |tables| {
            let created = Attribute {
                id: tables.next_attribute_id(kind),
                user_id,
                kind,
                name: name.to_string(),
            };
            tables
                .attributes_mut(kind)
                .insert(created.id, created.clone());
            created
        })
    }

    async fn attribute(&self, kind: AttributeKind, id: AttributeId) -> Result<Option<Attribute>> {
        Ok(self.tables.read().await.attributes(kind).get(&id).cloned())
    }

    async fn attributes_for_user(
        &self,
        kind: AttributeKind,
        user_id: UserId,
    ) -> Result<Vec<Attribute>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attributes(kind)
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_attribute(&self, attribute: &Attribute) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.attributes(attribute.kind).contains_key(&attribute.id) {
            return Err(AppError::NotFound);
        }
        self.apply(&mut tables, |tables| {
            tables
                .attributes_mut(attribute.kind)
                .insert(attribute.id, attribute.clone());
        })
    }

    async fn delete_attribute(&self, kind: AttributeKind, id: AttributeId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.attributes(kind).contains_key(&id) {
            return Ok(false);
        }
        self.apply(&mut tables, |tables| {
            tables.attributes_mut(kind).remove(&id);
            for recipe in tables.recipes.values_mut() {
                recipe.attributes_mut(kind).retain(|attr_id| *attr_id != id);
            }
        })?;
        Ok(true)
    }
}
