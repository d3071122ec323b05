//! In-process backend used for local runs without `DATABASE_URL` and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, NotificationStore, OrderStore, ProductFilter, ProductSort, StoreError, StoreResult, UserStore};
use crate::domain::{Notification, Order, OrderStatus, Product, User};

#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    users: RwLock<HashMap<Uuid, User>>,
    notifications: RwLock<Vec<Notification>>,
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut found: Vec<Product> = self.products.read().await.values()
            .filter(|p| filter.category.map_or(true, |c| p.category == c))
            .filter(|p| filter.search.as_deref().map_or(true, |s| p.matches_search(s)))
            .cloned()
            .collect();
        match filter.sort {
            ProductSort::PriceLow => found.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceHigh => found.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Newest => found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))),
        }
        Ok(found)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => { *existing = product.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> StoreResult<bool> {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(p) => { p.stock += delta; Ok(true) }
            None => Ok(false),
        }
    }

    async fn count_products(&self) -> StoreResult<u64> {
        Ok(self.products.read().await.len() as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        if let Some(reference) = order.payment_order_id.as_deref() {
            if orders.values().any(|o| o.payment_order_id.as_deref() == Some(reference)) {
                return Err(StoreError::Conflict(format!("payment {reference} already recorded")));
            }
        }
        let mut stored = order.clone();
        stored.take_events();
        orders.insert(order.id, stored);
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn order_by_payment_ref(&self, gateway_order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.values().find(|o| o.payment_order_id.as_deref() == Some(gateway_order_id)).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let mut found: Vec<Order> = self.orders.read().await.values().filter(|o| o.user_id == user_id).cloned().collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn all_orders(&self) -> StoreResult<Vec<Order>> {
        let mut found: Vec<Order> = self.orders.read().await.values().cloned().collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<bool> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(o) => { o.status = status; Ok(true) }
            None => Ok(false),
        }
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| status.map_or(true, |s| o.status == s)).count() as u64)
    }

    async fn revenue_excluding(&self, excluded: OrderStatus) -> StoreResult<Decimal> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| o.status != excluded).map(|o| o.total_amount).sum())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => { *existing = user.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn admins(&self) -> StoreResult<Vec<User>> {
        let mut admins: Vec<User> = self.users.read().await.values().filter(|u| u.is_admin()).cloned().collect();
        admins.sort_by_key(|u| u.created_at);
        Ok(admins)
    }

    async fn push_order(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(u) => { u.orders.push(order_id); Ok(true) }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notifications(&self, batch: &[Notification]) -> StoreResult<()> {
        self.notifications.write().await.extend_from_slice(batch);
        Ok(())
    }

    async fn recent_notifications(&self, limit: usize) -> StoreResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().rev().take(limit).cloned().collect())
    }

    async fn unread_count(&self) -> StoreResult<u64> {
        Ok(self.notifications.read().await.iter().filter(|n| !n.read).count() as u64)
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications.iter_mut().find(|n| n.id == id).map(|n| { n.read = true; n.clone() }))
    }

    async fn mark_all_read(&self) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for n in notifications.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        Ok(notifications.len() != before)
    }
}
