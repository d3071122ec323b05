use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AppState, ValidJson};
use crate::domain::{Category, NewProduct, Product, ProductError, ProductPatch, Unit};
use crate::store::{ProductFilter, ProductSort};
use crate::{Result, ShopError};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
}

fn not_found() -> ShopError { ShopError::NotFound("Product not found".to_string()) }

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    category: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

impl ListQuery {
    /// `None` when the category names nothing in the catalog.
    fn into_filter(self) -> Option<ProductFilter> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(name) => Some(name.parse::<Category>().ok()?),
        };
        let sort = match self.sort.as_deref() {
            Some("price-low") => ProductSort::PriceLow,
            Some("price-high") => ProductSort::PriceHigh,
            _ => ProductSort::Newest,
        };
        let search = self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Some(ProductFilter { category, search, sort })
    }
}

async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<Product>>> {
    let Some(filter) = query.into_filter() else { return Ok(Json(vec![])) };
    Ok(Json(state.stores.catalog.products(&filter).await?))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    state.stores.catalog.product(id).await?.map(Json).ok_or_else(not_found)
}

/// Admin forms send tags either as a list or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tags { List(Vec<String>), Csv(String) }

impl Tags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Csv(s) => s.split(',').map(str::to_string).collect(),
        }
    }
}

/// Shared by create and partial update; absent fields stay `None`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct ProductBody {
    name: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    price: Option<Decimal>,
    category: Option<String>,
    tags: Option<Tags>,
    image_url: Option<String>,
    stock: Option<i64>,
    unit: Option<String>,
}

impl ProductBody {
    fn into_patch(self) -> std::result::Result<ProductPatch, ProductError> {
        Ok(ProductPatch {
            name: self.name,
            price: self.price,
            category: self.category.as_deref().map(str::parse::<Category>).transpose()?,
            tags: self.tags.map(Tags::into_vec),
            image_url: self.image_url,
            stock: self.stock,
            unit: self.unit.as_deref().map(str::parse::<Unit>).transpose()?,
        })
    }
}

async fn create(State(state): State<AppState>, AdminUser(admin): AdminUser, ValidJson(body): ValidJson<ProductBody>) -> Result<(StatusCode, Json<Product>)> {
    let patch = body.into_patch()?;
    let product = Product::create(NewProduct {
        name: patch.name.ok_or(ProductError::MissingName)?,
        price: patch.price.ok_or(ProductError::NegativePrice)?,
        category: patch.category.ok_or(ProductError::InvalidCategory)?,
        tags: patch.tags.unwrap_or_default(),
        image_url: patch.image_url.ok_or(ProductError::MissingImage)?,
        stock: patch.stock.ok_or(ProductError::NegativeStock)?,
        unit: patch.unit.unwrap_or_default(),
    })?;
    state.stores.catalog.insert_product(&product).await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(State(state): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>, ValidJson(body): ValidJson<ProductBody>) -> Result<Json<Product>> {
    let patch = body.into_patch()?;
    let mut product = state.stores.catalog.product(id).await?.ok_or_else(not_found)?;
    product.apply(patch)?;
    if !state.stores.catalog.update_product(&product).await? { return Err(not_found()); }
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "product updated");
    Ok(Json(product))
}

#[derive(Serialize)]
struct Deleted { message: &'static str }

async fn remove(State(state): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>) -> Result<Json<Deleted>> {
    if !state.stores.catalog.delete_product(id).await? { return Err(not_found()); }
    tracing::info!(product_id = %id, admin_id = %admin.id, "product deleted");
    Ok(Json(Deleted { message: "Product deleted successfully" }))
}
