//! Category routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use coinpurse_core::budget::CategoryKind;
use coinpurse_db::entities::categories;
use coinpurse_db::repositories::{
    CategoryNode, CategoryRepository, CreateCategoryInput, UpdateCategoryInput,
};
use coinpurse_shared::types::{PageRequest, PageResponse};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, deserialize_some};

/// Creates the category routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/hierarchy", get(category_hierarchy))
        .route(
            "/categories/{category_id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

/// Request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    /// Category name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Top-level parent.
    pub parent_id: Option<i32>,
    /// `expense` or `income`; inherited from the parent when omitted.
    pub kind: Option<CategoryKind>,
}

/// Request body for updating a category.
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    /// Category name.
    pub name: Option<String>,
    /// Description; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    /// Parent; `null` makes it top-level.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<i32>>,
    /// `expense` or `income`.
    pub kind: Option<CategoryKind>,
}

/// Response for a category.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    /// Category ID.
    pub id: i32,
    /// Category name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Parent category.
    pub parent_id: Option<i32>,
    /// `expense` or `income`.
    pub kind: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A top-level category with its subcategories.
#[derive(Debug, Serialize)]
pub struct CategoryTreeResponse {
    /// The top-level category.
    #[serde(flatten)]
    pub category: CategoryResponse,
    /// Direct subcategories.
    pub children: Vec<CategoryResponse>,
}

impl From<CategoryNode> for CategoryTreeResponse {
    fn from(node: CategoryNode) -> Self {
        Self {
            category: node.category.into(),
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<categories::Model> for CategoryResponse {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            parent_id: model.parent_id,
            kind: model.kind,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// GET `/categories`
async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<PageResponse<CategoryResponse>>> {
    let (rows, total) = CategoryRepository::new((*state.db).clone())
        .list(&page)
        .await?;
    Ok(Json(
        PageResponse::new(rows, &page, total).map(CategoryResponse::from),
    ))
}

/// GET `/categories/hierarchy`
async fn category_hierarchy(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryTreeResponse>>> {
    let tree = CategoryRepository::new((*state.db).clone())
        .hierarchy()
        .await?;
    Ok(Json(tree.into_iter().map(Into::into).collect()))
}

/// POST `/categories`
async fn create_category(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Category name cannot be empty"));
    }

    let category = CategoryRepository::new((*state.db).clone())
        .create(CreateCategoryInput {
            name: payload.name,
            description: payload.description,
            parent_id: payload.parent_id,
            kind: payload.kind,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

/// GET `/categories/{category_id}`
async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<CategoryResponse>> {
    CategoryRepository::new((*state.db).clone())
        .find_by_id(category_id)
        .await?
        .map(|category| Json(category.into()))
        .ok_or_else(|| ApiError::not_found(format!("Category {category_id} not found")))
}

/// PATCH `/categories/{category_id}`
async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryResponse>> {
    let category = CategoryRepository::new((*state.db).clone())
        .update(
            category_id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description,
                parent_id: payload.parent_id,
                kind: payload.kind,
            },
        )
        .await?;
    Ok(Json(category.into()))
}

/// DELETE `/categories/{category_id}`
async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> ApiResult<StatusCode> {
    CategoryRepository::new((*state.db).clone())
        .delete(category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
