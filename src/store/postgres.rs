//! Postgres backend. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{CatalogStore, NotificationStore, OrderStore, ProductFilter, ProductSort, StoreError, StoreResult, UserStore};
use crate::domain::{LineItem, Notification, Order, OrderStatus, Product, ShippingAddress, User};

pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn corrupt(id: Uuid, reason: impl ToString) -> StoreError { StoreError::Corrupt { id, reason: reason.to_string() } }

#[derive(sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, price: Decimal, category: String, tags: Vec<String>, image_url: String, stock: i64, unit: String, created_at: DateTime<Utc> }

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> StoreResult<Self> {
        Ok(Product {
            id: r.id, name: r.name, price: r.price, category: r.category.parse().map_err(|e| corrupt(r.id, e))?,
            tags: r.tags, image_url: r.image_url, stock: r.stock, unit: r.unit.parse().map_err(|e| corrupt(r.id, e))?, created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, products: Json<Vec<LineItem>>, total_amount: Decimal, currency: String, payment_method: String,
    payment_order_id: Option<String>, payment_id: Option<String>, shipping_address: Json<ShippingAddress>, status: String, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> StoreResult<Self> {
        Ok(Order {
            id: r.id, user_id: r.user_id, products: r.products.0, total_amount: r.total_amount, currency: r.currency,
            payment_method: r.payment_method.parse().map_err(|e| corrupt(r.id, e))?, payment_order_id: r.payment_order_id, payment_id: r.payment_id,
            shipping_address: r.shipping_address.0, status: r.status.parse().map_err(|e| corrupt(r.id, e))?, created_at: r.created_at, events: vec![],
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow { id: Uuid, name: String, email: String, password_hash: String, role: String, orders: Vec<Uuid>, created_at: DateTime<Utc> }

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> StoreResult<Self> {
        Ok(User { id: r.id, name: r.name, email: r.email, password_hash: r.password_hash, role: r.role.parse().map_err(|e| corrupt(r.id, e))?, orders: r.orders, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow { id: Uuid, kind: String, title: String, message: String, order_id: Option<Uuid>, user_id: Option<Uuid>, recipient_id: Option<Uuid>, read: bool, created_at: DateTime<Utc> }

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;
    fn try_from(r: NotificationRow) -> StoreResult<Self> {
        Ok(Notification {
            id: r.id, kind: r.kind.parse().map_err(|e| corrupt(r.id, e))?, title: r.title, message: r.message,
            order_id: r.order_id, user_id: r.user_id, recipient_id: r.recipient_id, read: r.read, created_at: r.created_at,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>> where T: TryFrom<R, Error = StoreError> {
    rows.into_iter().map(T::try_from).collect()
}

/// `%needle%` for ILIKE, with the pattern metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

const ORDER_COLUMNS: &str = "id, user_id, products, total_amount, currency, payment_method, payment_order_id, payment_id, shipping_address, status, created_at";

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query("INSERT INTO products (id, name, price, category, tags, image_url, stock, unit, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(p.id).bind(&p.name).bind(p.price).bind(p.category.as_str()).bind(&p.tags).bind(&p.image_url).bind(p.stock).bind(p.unit.as_str()).bind(p.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let order_by = match filter.sort {
            ProductSort::Newest => "created_at DESC, id DESC",
            ProductSort::PriceLow => "price ASC",
            ProductSort::PriceHigh => "price DESC",
        };
        let sql = format!(
            "SELECT * FROM products WHERE ($1::text IS NULL OR category = $1) \
             AND ($2::text IS NULL OR name ILIKE $2 OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE $2)) \
             ORDER BY {order_by}"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(filter.search.as_deref().filter(|s| !s.trim().is_empty()).map(like_pattern))
            .fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn update_product(&self, p: &Product) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE products SET name = $2, price = $3, category = $4, tags = $5, image_url = $6, stock = $7, unit = $8 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(p.price).bind(p.category.as_str()).bind(&p.tags).bind(&p.image_url).bind(p.stock).bind(p.unit.as_str())
            .execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1").bind(id).bind(delta).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_products(&self) -> StoreResult<u64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok(total.0.max(0) as u64)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, o: &Order) -> StoreResult<()> {
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"))
            .bind(o.id).bind(o.user_id).bind(Json(&o.products)).bind(o.total_amount).bind(&o.currency).bind(o.payment_method.as_str())
            .bind(&o.payment_order_id).bind(&o.payment_id).bind(Json(&o.shipping_address)).bind(o.status.as_str()).bind(o.created_at)
            .execute(&self.pool).await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!("payment {} already recorded", o.payment_order_id.as_deref().unwrap_or_default())),
                other => StoreError::Database(other),
            })?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")).bind(id)
            .fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn order_by_payment_ref(&self, gateway_order_id: &str) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_order_id = $1")).bind(gateway_order_id)
            .fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"))
            .bind(user_id).fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn all_orders(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"))
            .fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1").bind(id).bind(status.as_str()).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(status.map(|s| s.as_str())).fetch_one(&self.pool).await?;
        Ok(total.0.max(0) as u64)
    }

    async fn revenue_excluding(&self, excluded: OrderStatus) -> StoreResult<Decimal> {
        let total: (Decimal,) = sqlx::query_as("SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> $1")
            .bind(excluded.as_str()).fetch_one(&self.pool).await?;
        Ok(total.0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, u: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, name, email, password_hash, role, orders, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(u.id).bind(&u.name).bind(&u.email).bind(&u.password_hash).bind(u.role.as_str()).bind(&u.orders).bind(u.created_at)
            .execute(&self.pool).await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!("email {} already registered", u.email)),
                other => StoreError::Database(other),
            })?;
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1").bind(email)
            .fetch_optional(&self.pool).await?.map(User::try_from).transpose()
    }

    async fn update_user(&self, u: &User) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE users SET name = $2, email = $3, password_hash = $4, role = $5 WHERE id = $1")
            .bind(u.id).bind(&u.name).bind(&u.email).bind(&u.password_hash).bind(u.role.as_str())
            .execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn admins(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE role = 'admin' ORDER BY created_at").fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn push_order(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE users SET orders = array_append(orders, $2) WHERE id = $1").bind(user_id).bind(order_id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notifications(&self, batch: &[Notification]) -> StoreResult<()> {
        for n in batch {
            sqlx::query("INSERT INTO notifications (id, kind, title, message, order_id, user_id, recipient_id, read, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
                .bind(n.id).bind(n.kind.as_str()).bind(&n.title).bind(&n.message).bind(n.order_id).bind(n.user_id).bind(n.recipient_id).bind(n.read).bind(n.created_at)
                .execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn recent_notifications(&self, limit: usize) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications ORDER BY created_at DESC, id DESC LIMIT $1")
            .bind(i64::try_from(limit).unwrap_or(i64::MAX)).fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn unread_count(&self) -> StoreResult<u64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE NOT read").fetch_one(&self.pool).await?;
        Ok(total.0.max(0) as u64)
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>("UPDATE notifications SET read = TRUE WHERE id = $1 RETURNING *").bind(id)
            .fetch_optional(&self.pool).await?.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(&self) -> StoreResult<u64> {
        let res = sqlx::query("UPDATE notifications SET read = TRUE WHERE NOT read").execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM notifications WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}
