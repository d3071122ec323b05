//! Persistence ports and their two backends.
//!
//! Four independent collections (products, orders, users, notifications), each
//! behind its own trait so the workflow can be driven against Postgres in
//! production and the in-memory backend in tests or local runs without a
//! database. None of the traits offers transactions: stock changes are relative
//! adjustments applied one statement at a time.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Category, Notification, Order, OrderStatus, Product, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSort { #[default] Newest, PriceLow, PriceHigh }

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    /// Returns false when the product does not exist.
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;
    /// `stock = stock + delta`, applied without reading first. Returns false when the product is gone.
    async fn adjust_stock(&self, id: Uuid, delta: i64) -> StoreResult<bool>;
    async fn count_products(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fails with `Conflict` when another order already carries the same gateway order id.
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn order_by_payment_ref(&self, gateway_order_id: &str) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn all_orders(&self) -> StoreResult<Vec<Order>>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<bool>;
    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64>;
    /// Sum of `total_amount` over every order whose status is not `excluded`.
    async fn revenue_excluding(&self, excluded: OrderStatus) -> StoreResult<Decimal>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    async fn admins(&self) -> StoreResult<Vec<User>>;
    async fn push_order(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notifications(&self, batch: &[Notification]) -> StoreResult<()>;
    /// Newest first, at most `limit`.
    async fn recent_notifications(&self, limit: usize) -> StoreResult<Vec<Notification>>;
    async fn unread_count(&self) -> StoreResult<u64>;
    async fn mark_read(&self, id: Uuid) -> StoreResult<Option<Notification>>;
    async fn mark_all_read(&self) -> StoreResult<u64>;
    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool>;
}

/// Handles to every collection, shared by the workflow and the HTTP layer.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    pub fn in_memory() -> Self { Self::from_backend(Arc::new(MemoryStore::default())) }

    pub fn postgres(pool: sqlx::PgPool) -> Self { Self::from_backend(Arc::new(PgStore::new(pool))) }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CatalogStore + OrderStore + UserStore + NotificationStore + 'static,
    {
        Self { catalog: backend.clone(), orders: backend.clone(), users: backend.clone(), notifications: backend }
    }
}
