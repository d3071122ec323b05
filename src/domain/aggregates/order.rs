//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::domain::aggregates::product::{Product, Unit};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{Money, MoneyError, Quantity, MAX_AMOUNT};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub products: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<OrderEvent>,
}

/// Snapshot of a product at purchase time. Later catalog edits never touch it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    pub unit: Unit,
    pub image_url: String,
}

impl LineItem {
    pub fn snapshot(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id, name: product.name.clone(), price: product.price,
            quantity: quantity.value(), unit: product.unit, image_url: product.image_url.clone(),
        }
    }
    pub fn line_total(&self, currency: &str) -> Result<Money, MoneyError> { Money::new(self.price, currency).multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    #[validate(custom(function = "not_blank", message = "Full name is required"))]
    pub full_name: String,
    #[validate(custom(function = "not_blank", message = "Phone is required"))]
    pub phone: String,
    #[validate(custom(function = "not_blank", message = "Address line 1 is required"))]
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[validate(custom(function = "not_blank", message = "City is required"))]
    pub city: String,
    #[validate(custom(function = "not_blank", message = "State is required"))]
    pub state: String,
    #[validate(custom(function = "not_blank", message = "Pincode is required"))]
    pub pincode: String,
    pub country: String,
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            full_name: String::new(), phone: String::new(), address_line1: String::new(), address_line2: None,
            city: String::new(), state: String::new(), pincode: String::new(), country: "India".to_string(),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::new("blank")) } else { Ok(()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Packed, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { CashOnDelivery, OnlinePayment }

/// Which status changes an admin may make through the status endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may move to any other status.
    #[default]
    Unrestricted,
    /// Delivered and cancelled orders keep their status.
    TerminalLocked,
}

impl TransitionPolicy {
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self { Self::Unrestricted => true, Self::TerminalLocked => from == to || !from.is_terminal() }
    }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Confirmed, Self::Packed, Self::Delivered, Self::Cancelled];
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Packed => "packed", Self::Delivered => "delivered", Self::Cancelled => "cancelled" }
    }
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }
    /// Stock is still held by the order and goes back to the shelf on cancellation.
    pub fn holds_stock(&self) -> bool { matches!(self, Self::Pending | Self::Confirmed) }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::CashOnDelivery => "cash_on_delivery", Self::OnlinePayment => "online_payment" }
    }
    fn initial_status(&self) -> OrderStatus {
        match self { Self::CashOnDelivery => OrderStatus::Pending, Self::OnlinePayment => OrderStatus::Confirmed }
    }
}

impl fmt::Display for OrderStatus { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }
impl fmt::Display for PaymentMethod { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or(OrderError::InvalidStatus)
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "cash_on_delivery" => Ok(Self::CashOnDelivery), "online_payment" => Ok(Self::OnlinePayment), _ => Err(OrderError::InvalidPaymentMethod) }
    }
}

/// Correlation ids returned by a payment gateway once money has been taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayRef { pub order_id: String, pub payment_id: String }

impl Order {
    pub fn place(
        user_id: Uuid,
        items: Vec<LineItem>,
        currency: &str,
        payment_method: PaymentMethod,
        shipping_address: ShippingAddress,
        gateway: Option<GatewayRef>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let total = items.iter()
            .try_fold(Money::zero(currency), |acc, i| i.line_total(currency).and_then(|line| acc.add(&line)))
            .map_err(|e| match e { MoneyError::CurrencyMismatch => OrderError::CurrencyMismatch, MoneyError::Overflow => OrderError::TotalTooLarge })?;
        if total.amount() > MAX_AMOUNT { return Err(OrderError::TotalTooLarge); }
        let (payment_order_id, payment_id) = gateway.map(|g| (Some(g.order_id), Some(g.payment_id))).unwrap_or_default();
        let mut order = Self {
            id: Uuid::now_v7(), user_id, products: items, total_amount: total.amount(), currency: total.currency().to_string(),
            payment_method, payment_order_id, payment_id, shipping_address, status: payment_method.initial_status(),
            created_at: Utc::now(), events: vec![],
        };
        order.raise_event(OrderEvent::Placed { order_id: order.id, user_id, total: order.total_amount });
        Ok(order)
    }

    pub fn total(&self) -> Money { Money::new(self.total_amount, &self.currency) }

    /// Last eight characters of the id, upper-cased; what customers see in messages.
    pub fn short_ref(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 8..].to_uppercase()
    }

    /// Returns whether the status actually changed.
    pub fn set_status(&mut self, to: OrderStatus, policy: TransitionPolicy) -> Result<bool, OrderError> {
        let from = self.status;
        if !policy.allows(from, to) { return Err(OrderError::TransitionLocked { from, to }); }
        if from == to { return Ok(false); }
        self.status = to;
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id, from, to });
        Ok(true)
    }

    /// Soft cancel. Returns whether the line quantities should go back into stock.
    pub fn cancel(&mut self) -> Result<bool, OrderError> {
        if self.status.is_terminal() { return Err(OrderError::CannotCancel); }
        let restock = self.status.holds_stock();
        self.status = OrderStatus::Cancelled;
        self.raise_event(OrderEvent::Cancelled { order_id: self.id, restock });
        Ok(restock)
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, CannotCancel, CurrencyMismatch, TotalTooLarge, InvalidStatus, InvalidPaymentMethod, TransitionLocked { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "At least one product is required"),
            Self::CannotCancel => write!(f, "This order cannot be cancelled"),
            Self::CurrencyMismatch => write!(f, "Line items use different currencies"),
            Self::TotalTooLarge => write!(f, "Order total is too large"),
            Self::InvalidStatus => write!(f, "Invalid status"),
            Self::InvalidPaymentMethod => write!(f, "Invalid payment method"),
            Self::TransitionLocked { from, to } => write!(f, "Cannot change a {from} order to {to}"),
        }
    }
}
