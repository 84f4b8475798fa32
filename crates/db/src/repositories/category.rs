//! Category repository: a two-level tree over `parent_id`.

use chrono::Utc;
use coinpurse_core::budget::CategoryKind;
use coinpurse_shared::types::PageRequest;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use super::budget::delete_for_category;
use crate::entities::{categories, transactions};

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// Category not found.
    #[error("Category {0} not found")]
    NotFound(i32),

    /// Parent category not found.
    #[error("Parent category {0} not found")]
    ParentNotFound(i32),

    /// The parent is itself a child; only two levels are allowed.
    #[error("Category {parent_id} is already a subcategory; maximum depth is 2")]
    DepthExceeded {
        /// The rejected parent.
        parent_id: i32,
    },

    /// A category with children cannot become a child.
    #[error("Category {0} has subcategories and cannot be moved under a parent")]
    HasChildren(i32),

    /// A category cannot be deleted while subcategories exist.
    #[error("Category {0} has subcategories; delete them first")]
    NotEmpty(i32),

    /// A category cannot be its own parent.
    #[error("Category {0} cannot be its own parent")]
    SelfParent(i32),

    /// A subcategory must share its parent's kind.
    #[error("Category kind '{kind}' does not match parent kind '{parent_kind}'")]
    KindMismatch {
        /// Requested kind.
        kind: CategoryKind,
        /// Kind of the parent.
        parent_kind: CategoryKind,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional top-level parent.
    pub parent_id: Option<i32>,
    /// Expense or income; inherited from the parent when absent.
    pub kind: Option<CategoryKind>,
}

/// Input for updating a category. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New parent.
    pub parent_id: Option<Option<i32>>,
    /// New kind.
    pub kind: Option<CategoryKind>,
}

/// A top-level category with its subcategories.
#[derive(Debug, Clone)]
pub struct CategoryNode {
    /// The top-level category.
    pub category: categories::Model,
    /// Its direct children, by id.
    pub children: Vec<categories::Model>,
}

/// Category repository.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category, checking the depth rule.
    pub async fn create(&self, input: CreateCategoryInput) -> Result<categories::Model, CategoryError> {
        let kind = match input.parent_id {
            Some(parent_id) => {
                let parent_kind = check_parent(&self.db, parent_id).await?;
                let kind = input.kind.unwrap_or(parent_kind);
                check_kind(kind, parent_kind)?;
                kind
            }
            None => input.kind.unwrap_or_default(),
        };

        let now = Utc::now();
        let category = categories::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            kind: Set(kind.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            category_id = category.id,
            parent_id = ?category.parent_id,
            kind = %category.kind,
            "Category created"
        );
        Ok(category)
    }

    /// Finds a category by id.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<categories::Model>, CategoryError> {
        Ok(categories::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Lists categories by id.
    pub async fn list(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<categories::Model>, u64), CategoryError> {
        let total = categories::Entity::find().count(&self.db).await?;
        let rows = categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Updates a category. Moving it under a parent re-checks the depth rule;
    /// a new kind on a top-level category carries over to its children.
    pub async fn update(
        &self,
        id: i32,
        input: UpdateCategoryInput,
    ) -> Result<categories::Model, CategoryError> {
        let txn = self.db.begin().await?;

        let existing = categories::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CategoryError::NotFound(id))?;

        let children = categories::Entity::find()
            .filter(categories::Column::ParentId.eq(id))
            .count(&txn)
            .await?;
        let kind = match input.kind {
            Some(kind) => kind,
            None => stored_kind(&existing)?,
        };

        let parent_id = input.parent_id.unwrap_or(existing.parent_id);
        if let Some(parent_id) = parent_id {
            if parent_id == id {
                return Err(CategoryError::SelfParent(id));
            }
            if children > 0 {
                return Err(CategoryError::HasChildren(id));
            }
            let parent_kind = check_parent(&txn, parent_id).await?;
            check_kind(kind, parent_kind)?;
        } else if input.kind.is_some() && children > 0 {
            categories::Entity::update_many()
                .col_expr(categories::Column::Kind, Expr::value(kind.as_str()))
                .filter(categories::Column::ParentId.eq(id))
                .exec(&txn)
                .await?;
        }

        let mut active: categories::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(parent_id) = input.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(kind) = input.kind {
            active.kind = Set(kind.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(category_id = id, parent_id = ?updated.parent_id, "Category updated");
        Ok(updated)
    }

    /// Deletes a childless category and its budgets. Its transactions
    /// become uncategorized.
    pub async fn delete(&self, id: i32) -> Result<(), CategoryError> {
        let txn = self.db.begin().await?;

        let existing = categories::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CategoryError::NotFound(id))?;

        let children = categories::Entity::find()
            .filter(categories::Column::ParentId.eq(id))
            .count(&txn)
            .await?;
        if children > 0 {
            return Err(CategoryError::NotEmpty(id));
        }

        let detached = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::CategoryId,
                Expr::value(Option::<i32>::None),
            )
            .filter(transactions::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        let budgets = delete_for_category(&txn, id).await?;
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(
            category_id = id,
            uncategorized_transactions = detached.rows_affected,
            deleted_budgets = budgets,
            "Category deleted"
        );
        Ok(())
    }

    /// The category itself plus all of its subcategories.
    pub async fn descendant_ids(&self, id: i32) -> Result<Vec<i32>, CategoryError> {
        if categories::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(CategoryError::NotFound(id));
        }
        Ok(descendant_ids(&self.db, id).await?)
    }

    /// Every top-level category with its subcategories, both ordered by id.
    pub async fn hierarchy(&self) -> Result<Vec<CategoryNode>, CategoryError> {
        let all = categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.db)
            .await?;

        let (roots, children): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|category| category.parent_id.is_none());
        Ok(roots
            .into_iter()
            .map(|category| {
                let children = children
                    .iter()
                    .filter(|child| child.parent_id == Some(category.id))
                    .cloned()
                    .collect();
                CategoryNode { category, children }
            })
            .collect())
    }
}

/// Collects `id` and its descendants. The tree is at most two levels deep,
/// so one query for direct children covers everything.
pub(crate) async fn descendant_ids<C>(conn: &C, id: i32) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let children: Vec<i32> = categories::Entity::find()
        .select_only()
        .column(categories::Column::Id)
        .filter(categories::Column::ParentId.eq(id))
        .order_by_asc(categories::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;

    let mut ids = Vec::with_capacity(children.len() + 1);
    ids.push(id);
    ids.extend(children);
    Ok(ids)
}

/// Checks the parent exists and is top-level; returns its kind.
async fn check_parent<C>(conn: &C, parent_id: i32) -> Result<CategoryKind, CategoryError>
where
    C: ConnectionTrait,
{
    let parent = categories::Entity::find_by_id(parent_id)
        .one(conn)
        .await?
        .ok_or(CategoryError::ParentNotFound(parent_id))?;
    if parent.parent_id.is_some() {
        return Err(CategoryError::DepthExceeded { parent_id });
    }
    stored_kind(&parent)
}

fn check_kind(kind: CategoryKind, parent_kind: CategoryKind) -> Result<(), CategoryError> {
    if kind != parent_kind {
        return Err(CategoryError::KindMismatch { kind, parent_kind });
    }
    Ok(())
}

fn stored_kind(category: &categories::Model) -> Result<CategoryKind, CategoryError> {
    category.kind.parse::<CategoryKind>().map_err(|_| {
        CategoryError::Database(DbErr::Type(format!(
            "invalid category kind '{}'",
            category.kind
        )))
    })
}
