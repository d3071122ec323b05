//! Order workflow: checkout, payment settlement, status changes, cancellation.
//!
//! Every operation follows the same shape. Validate input without side
//! effects, mutate stock and orders through the stores, then drain the order's
//! domain events to trigger notifications. Admin alerts are written inline
//! (their failures are logged, not returned). Customer SMS/email go out on a
//! spawned task whose handle is handed back to the caller.
//!
//! There are no transactions. Stock is adjusted relatively, so two checkouts
//! racing for the last units can both succeed and drive stock negative.

pub mod pricing;

pub use pricing::{LineMode, OrderLine};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::config::WorkflowSettings;
use crate::domain::{AdminAlert, GatewayRef, LineItem, Order, OrderEvent, OrderStatus, PaymentMethod, PhoneNumber, ShippingAddress, User};
use crate::notify::{CustomerContact, DeliveryReport, Notifier};
use crate::payment::{GatewayIntent, PaymentGateway, PaymentQuote, SettlementProof};
use crate::store::{StoreError, Stores};
use crate::{Result, ShopError};

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub lines: Vec<OrderLine>,
    /// Wire name, parsed here so an unknown method is a validation error.
    pub payment_method: String,
    pub shipping_address: ShippingAddress,
}

#[derive(Clone, Debug)]
pub struct SettlePayment {
    pub proof: SettlementProof,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
}

/// A persisted order plus the still-running customer notification.
#[derive(Debug)]
pub struct Placed {
    pub order: Order,
    pub delivery: JoinHandle<DeliveryReport>,
}

#[derive(Debug)]
pub struct StatusUpdate {
    pub order: Order,
    /// `None` when the status did not change.
    pub delivery: Option<JoinHandle<DeliveryReport>>,
}

#[derive(Clone)]
pub struct OrderWorkflow {
    stores: Stores,
    notifier: Notifier,
    gateway: Option<Arc<dyn PaymentGateway>>,
    settings: WorkflowSettings,
}

fn order_not_found() -> ShopError { ShopError::NotFound("Order not found".to_string()) }

fn payment_reused() -> ShopError { ShopError::InvalidState("Payment has already been used for an order".to_string()) }

impl OrderWorkflow {
    pub fn new(stores: Stores, notifier: Notifier, gateway: Option<Arc<dyn PaymentGateway>>, settings: WorkflowSettings) -> Self {
        Self { stores, notifier, gateway, settings }
    }

    pub fn settings(&self) -> &WorkflowSettings { &self.settings }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.gateway.as_ref().ok_or_else(|| ShopError::InvalidState("Online payment is not configured".to_string()))
    }

    /// Cash on delivery, or an online order whose payment the client vouches for.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.id, lines = input.lines.len()))]
    pub async fn place_order(&self, caller: &User, input: PlaceOrder) -> Result<Placed> {
        let lines = pricing::validate_lines(&input.lines)?;
        let method: PaymentMethod = input.payment_method.parse()?;
        input.shipping_address.validate()?;

        let items = pricing::reserve(self.stores.catalog.as_ref(), &lines, self.settings.line_mode, &self.settings.currency).await?;
        let order = Order::place(caller.id, items, &self.settings.currency, method, input.shipping_address, None)?;
        self.record_placed(caller, order).await
    }

    /// Sizes a gateway payment from live catalog prices. Nothing is reserved.
    #[instrument(skip(self, caller, lines), fields(user_id = %caller.id))]
    pub async fn create_payment_intent(&self, caller: &User, lines: &[OrderLine]) -> Result<GatewayIntent> {
        let gateway = self.gateway()?;
        let lines = pricing::validate_lines(lines)?;
        let priced = pricing::price(self.stores.catalog.as_ref(), &lines).await?;
        let total = pricing::total(&priced, &self.settings.currency)?;
        let quote = PaymentQuote {
            user_id: caller.id,
            currency: self.settings.currency.clone(),
            total,
            lines: pricing::quote_lines(&priced),
            receipt: format!("order_rcpt_{}", chrono::Utc::now().timestamp_millis()),
        };
        let intent = gateway.create_intent(&quote).await?;
        tracing::info!(provider = %intent.provider, gateway_order = %intent.gateway_order_id, amount = intent.amount, "payment intent created");
        Ok(intent)
    }

    /// Verifies or captures the payment, then places a confirmed order at current prices.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.id))]
    pub async fn settle_payment(&self, caller: &User, input: SettlePayment) -> Result<Placed> {
        let lines = pricing::validate_lines(&input.lines)?;
        input.shipping_address.validate()?;
        let gateway = self.gateway()?;

        let settlement = gateway.settle(&input.proof).await.map_err(|e| {
            tracing::warn!(provider = %gateway.provider(), error = %e, "payment settlement rejected");
            ShopError::from(e)
        })?;

        if self.stores.orders.order_by_payment_ref(&settlement.gateway_order_id).await?.is_some() {
            tracing::warn!(provider = %gateway.provider(), gateway_order = %settlement.gateway_order_id, "payment already recorded");
            return Err(payment_reused());
        }

        let items = pricing::reserve(self.stores.catalog.as_ref(), &lines, self.settings.line_mode, &self.settings.currency).await?;
        let gateway_ref = GatewayRef { order_id: settlement.gateway_order_id, payment_id: settlement.gateway_payment_id };
        let order = Order::place(caller.id, items, &self.settings.currency, PaymentMethod::OnlinePayment, input.shipping_address, Some(gateway_ref))?;
        let reserved = order.products.clone();
        match self.record_placed(caller, order).await {
            // Lost a race with another settlement of the same payment.
            Err(ShopError::Store(StoreError::Conflict(reason))) => {
                tracing::warn!(provider = %gateway.provider(), %reason, "payment already recorded, releasing stock");
                self.restock(&reserved).await?;
                Err(payment_reused())
            }
            placed => placed,
        }
    }

    async fn record_placed(&self, caller: &User, mut order: Order) -> Result<Placed> {
        let events = order.take_events();
        self.stores.orders.insert_order(&order).await?;
        if !self.stores.users.push_order(caller.id, order.id).await? {
            tracing::warn!(order_id = %order.id, "ordering user no longer exists");
        }
        for event in events {
            if let OrderEvent::Placed { order_id, user_id, total } = event {
                tracing::info!(%order_id, %user_id, %total, status = %order.status, "order placed");
                self.alert_admins(AdminAlert::order_placed(caller, &order)).await;
            }
        }
        let contact = CustomerContact {
            name: non_blank(&order.shipping_address.full_name).unwrap_or(&caller.name).to_string(),
            phone: PhoneNumber::normalise(&order.shipping_address.phone),
            email: non_blank(&caller.email).map(str::to_string),
        };
        let delivery = self.notifier.order_placed(&order, contact);
        Ok(Placed { order, delivery })
    }

    pub async fn order_for(&self, caller: &User, id: Uuid) -> Result<Order> {
        let order = self.stores.orders.order(id).await?.ok_or_else(order_not_found)?;
        if !caller.can_access(order.user_id) { return Err(ShopError::AccessDenied("Access denied".to_string())); }
        Ok(order)
    }

    pub async fn orders_of(&self, caller: &User) -> Result<Vec<Order>> {
        Ok(self.stores.orders.orders_for_user(caller.id).await?)
    }

    pub async fn all_orders(&self, caller: &User) -> Result<Vec<Order>> {
        if !caller.is_admin() { return Err(ShopError::admin_only()); }
        Ok(self.stores.orders.all_orders().await?)
    }

    #[instrument(skip(self, caller), fields(admin_id = %caller.id))]
    pub async fn update_status(&self, caller: &User, id: Uuid, status: &str) -> Result<StatusUpdate> {
        if !caller.is_admin() { return Err(ShopError::admin_only()); }
        let to: OrderStatus = status.parse()?;
        let mut order = self.stores.orders.order(id).await?.ok_or_else(order_not_found)?;
        if !order.set_status(to, self.settings.transitions)? {
            return Ok(StatusUpdate { order, delivery: None });
        }
        if !self.stores.orders.set_order_status(order.id, order.status).await? { return Err(order_not_found()); }

        let customer = self.stores.users.user(order.user_id).await?;
        for event in order.take_events() {
            if let OrderEvent::StatusChanged { from, to, .. } = event {
                tracing::info!(order_id = %order.id, %from, %to, "order status changed");
                if to == OrderStatus::Delivered {
                    self.alert_admins(AdminAlert::order_delivered(&order, customer.as_ref().map(|u| u.name.as_str()))).await;
                }
            }
        }
        let contact = CustomerContact {
            name: customer.as_ref().and_then(|u| non_blank(&u.name)).or_else(|| non_blank(&order.shipping_address.full_name)).unwrap_or("Customer").to_string(),
            phone: PhoneNumber::normalise(&order.shipping_address.phone),
            email: customer.as_ref().and_then(|u| non_blank(&u.email)).map(str::to_string),
        };
        let delivery = self.notifier.status_changed(&order, contact);
        Ok(StatusUpdate { order, delivery: Some(delivery) })
    }

    /// Soft cancel. Stock comes back only while the order still holds it.
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn cancel_order(&self, caller: &User, id: Uuid) -> Result<Order> {
        let mut order = self.order_for(caller, id).await?;
        order.cancel()?;
        let restock = order.take_events().into_iter().any(|e| matches!(e, OrderEvent::Cancelled { restock: true, .. }));
        if restock { self.restock(&order.products).await?; }
        if !self.stores.orders.set_order_status(order.id, order.status).await? { return Err(order_not_found()); }
        tracing::info!(order_id = %order.id, restock, "order cancelled");
        Ok(order)
    }

    async fn restock(&self, lines: &[LineItem]) -> Result<()> {
        for line in lines {
            if !self.stores.catalog.adjust_stock(line.product_id, i64::from(line.quantity)).await? {
                tracing::warn!(product_id = %line.product_id, "product gone, skipping restock");
            }
        }
        Ok(())
    }

    /// Writes one copy per admin. Failures are logged and swallowed.
    async fn alert_admins(&self, alert: AdminAlert) {
        let order_id = alert.order_id;
        let result = async {
            let admins = self.stores.users.admins().await?;
            let batch = alert.fan_out(&admins);
            self.stores.notifications.insert_notifications(&batch).await?;
            Ok::<_, StoreError>(batch.len())
        }.await;
        match result {
            Ok(n) => tracing::info!(?order_id, kind = %alert.kind, admins = n, "admin notifications created"),
            Err(e) => tracing::error!(?order_id, kind = %alert.kind, error = %e, "failed to create admin notifications"),
        }
    }
}

fn non_blank(s: &str) -> Option<&str> { Some(s.trim()).filter(|s| !s.is_empty()) }

#[cfg(test)]
mod tests;
