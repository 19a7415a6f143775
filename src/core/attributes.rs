use crate::core::serializers::AttributeNameSerializer;
use crate::domain::model::{Attribute, AttributeId, AttributeKind, User};
use crate::domain::ports::Store;
use crate::utils::error::{AppError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// `?assigned_only=1` 只列出至少被一個食譜使用的項目
pub fn assigned_only(query: &HashMap<String, String>) -> Result<bool> {
    match query.get("assigned_only").map(|v| v.trim()) {
        None | Some("") => Ok(false),
        Some(raw) => raw
            .parse::<i64>()
            .map(|v| v != 0)
            .map_err(|_| AppError::field("assigned_only", "A valid integer is required.")),
    }
}

/// 標籤與食材的列表、更新、刪除
#[derive(Clone)]
pub struct AttributeService {
    store: Arc<dyn Store>,
}

impl AttributeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 依名稱倒序
    pub async fn list(
        &self,
        kind: AttributeKind,
        user: &User,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>> {
        let mut attributes = self.store.attributes_for_user(kind, user.id).await?;

        if assigned_only {
            let assigned: HashSet<AttributeId> = self
                .store
                .recipes_for_user(user.id)
                .await?
                .iter()
                .flat_map(|recipe| recipe.attributes(kind).to_vec())
                .collect();
            attributes.retain(|attribute| assigned.contains(&attribute.id));
        }

        attributes.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(attributes)
    }

    pub async fn update(
        &self,
        kind: AttributeKind,
        user: &User,
        id: AttributeId,
        input: AttributeNameSerializer,
        partial: bool,
    ) -> Result<Attribute> {
        let mut attribute = self.owned(kind, user, id).await?;
        if let Some(name) = input.validate(partial)? {
            attribute.name = name;
            self.store.save_attribute(&attribute).await?;
        }
        Ok(attribute)
    }

    pub async fn destroy(&self, kind: AttributeKind, user: &User, id: AttributeId) -> Result<()> {
        let attribute = self.owned(kind, user, id).await?;
        self.store.delete_attribute(kind, attribute.id).await?;
        tracing::info!(user_id = user.id, "🗑️ Deleted {:?} {}", kind, attribute);
        Ok(())
    }

    async fn owned(&self, kind: AttributeKind, user: &User, id: AttributeId) -> Result<Attribute> {
        match self.store.attribute(kind, id).await? {
            Some(attribute) if attribute.user_id == user.id => Ok(attribute),
            _ => Err(AppError::NotFound),
        }
    }
}
