use crate::core::serializers::{RecipeChanges, RecipeWriteSerializer};
use crate::domain::model::{
    Attribute, AttributeId, AttributeKind, NewRecipe, Recipe, RecipeId, User,
};
use crate::domain::ports::Store;
use crate::utils::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 食譜連同已解析的標籤與食材
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

/// `?tags=1,2&ingredients=3`：符合任一 id 即保留
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<AttributeId>>,
    pub ingredients: Option<Vec<AttributeId>>,
}

impl RecipeFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            tags: parse_id_list("tags", query.get("tags"))?,
            ingredients: parse_id_list("ingredients", query.get("ingredients"))?,
        })
    }

    fn matches(&self, recipe: &Recipe) -> bool {
        let keep = |kind: AttributeKind, wanted: &Option<Vec<AttributeId>>| match wanted {
            Some(ids) => recipe.attributes(kind).iter().any(|id| ids.contains(id)),
            None => true,
        };
        keep(AttributeKind::Tag, &self.tags) && keep(AttributeKind::Ingredient, &self.ingredients)
    }
}

fn parse_id_list(field: &str, raw: Option<&String>) -> Result<Option<Vec<AttributeId>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<AttributeId>().map_err(|_| {
                AppError::field(field, format!("'{}' is not a valid id.", part))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn Store>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 只回傳使用者自己的食譜，id 由大到小
    pub async fn list(&self, user: &User, filter: &RecipeFilter) -> Result<Vec<RecipeView>> {
        let mut recipes: Vec<Recipe> = self
            .store
            .recipes_for_user(user.id)
            .await?
            .into_iter()
            .filter(|recipe| filter.matches(recipe))
            .collect();
        recipes.sort_by(|a, b| b.id.cmp(&a.id));

        let mut views = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            views.push(self.view(recipe).await?);
        }
        Ok(views)
    }

    pub async fn retrieve(&self, user: &User, id: RecipeId) -> Result<RecipeView> {
        let recipe = self.owned(user, id).await?;
        self.view(recipe).await
    }

    pub async fn create(&self, user: &User, input: RecipeWriteSerializer) -> Result<RecipeView> {
        let changes = input.validate(false)?;
        let mut recipe = self
            .store
            .insert_recipe(
                user.id,
                NewRecipe {
                    title: changes.title.clone().unwrap_or_default(),
                    description: changes.description.clone().unwrap_or_default(),
                    time_minutes: changes.time_minutes.unwrap_or_default(),
                    price: changes.price.unwrap_or_default(),
                    link: changes.link.clone().unwrap_or_default(),
                },
            )
            .await?;

        if self.assign_attributes(user, &mut recipe, &changes).await? {
            self.store.save_recipe(&recipe).await?;
        }
        tracing::info!(recipe_id = recipe.id, user_id = user.id, "🍲 Created recipe {}", recipe);
        self.view(recipe).await
    }

    /// `partial` 對應 PATCH；標籤與食材若有提供則整組取代
    pub async fn update(
        &self,
        user: &User,
        id: RecipeId,
        input: RecipeWriteSerializer,
        partial: bool,
    ) -> Result<RecipeView> {
        let mut recipe = self.owned(user, id).await?;
        let changes = input.validate(partial)?;

        if let Some(title) = &changes.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &changes.description {
            recipe.description = description.clone();
        }
        if let Some(time_minutes) = changes.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(link) = &changes.link {
            recipe.link = link.clone();
        }
        self.assign_attributes(user, &mut recipe, &changes).await?;

        self.store.save_recipe(&recipe).await?;
        tracing::debug!(recipe_id = recipe.id, "Updated recipe");
        self.view(recipe).await
    }

    pub async fn destroy(&self, user: &User, id: RecipeId) -> Result<()> {
        let recipe = self.owned(user, id).await?;
        self.store.delete_recipe(recipe.id).await?;
        tracing::info!(recipe_id = id, user_id = user.id, "🗑️ Deleted recipe");
        Ok(())
    }

    /// 別人的食譜一律視為不存在
    async fn owned(&self, user: &User, id: RecipeId) -> Result<Recipe> {
        match self.store.recipe(id).await? {
            Some(recipe) if recipe.user_id == user.id => Ok(recipe),
            _ => Err(AppError::NotFound),
        }
    }

    /// 有任何變更時回傳 true
    async fn assign_attributes(
        &self,
        user: &User,
        recipe: &mut Recipe,
        changes: &RecipeChanges,
    ) -> Result<bool> {
        let mut changed = false;
        for (kind, names) in [
            (AttributeKind::Tag, &changes.tags),
            (AttributeKind::Ingredient, &changes.ingredients),
        ] {
            let Some(names) = names else {
                continue;
            };
            let mut ids = Vec::with_capacity(names.len());
            for name in names {
                let attribute = self
                    .store
                    .get_or_create_attribute(kind, user.id, name)
                    .await?;
                if !ids.contains(&attribute.id) {
                    ids.push(attribute.id);
                }
            }
            *recipe.attributes_mut(kind) = ids;
            changed = true;
        }
        Ok(changed)
    }

    async fn view(&self, recipe: Recipe) -> Result<RecipeView> {
        let tags = self.resolve(AttributeKind::Tag, &recipe.tags).await?;
        let ingredients = self
            .resolve(AttributeKind::Ingredient, &recipe.ingredients)
            .await?;
        Ok(RecipeView {
            recipe,
            tags,
            ingredients,
        })
    }

    async fn resolve(&self, kind: AttributeKind, ids: &[AttributeId]) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(attribute) = self.store.attribute(kind, *id).await? {
                attributes.push(attribute);
            }
        }
        Ok(attributes)
    }
}
