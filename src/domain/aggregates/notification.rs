//! Back-office notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use crate::domain::aggregates::{Order, User};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Admin account this copy was fanned out to.
    pub recipient_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind { OrderPlaced, OrderStatusChanged, PaymentReceived }

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::OrderPlaced => "order_placed", Self::OrderStatusChanged => "order_status_changed", Self::PaymentReceived => "payment_received" }
    }
}

impl fmt::Display for NotificationKind { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for NotificationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" => Ok(Self::OrderPlaced),
            "order_status_changed" => Ok(Self::OrderStatusChanged),
            "payment_received" => Ok(Self::PaymentReceived),
            other => Err(format!("unknown notification type '{other}'")),
        }
    }
}

/// One admin alert before it is copied to every admin account.
#[derive(Clone, Debug)]
pub struct AdminAlert {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl AdminAlert {
    pub fn order_placed(buyer: &User, order: &Order) -> Self {
        Self {
            kind: NotificationKind::OrderPlaced,
            title: "New Order Placed".to_string(),
            message: format!("{} ({}) has placed a new order of {}. Order ID: {}", buyer.name, buyer.email, order.total(), order.id),
            order_id: Some(order.id),
            user_id: Some(order.user_id),
        }
    }

    pub fn order_delivered(order: &Order, customer_name: Option<&str>) -> Self {
        Self {
            kind: NotificationKind::OrderStatusChanged,
            title: "Order Delivered".to_string(),
            message: format!("Order {} has been delivered to {}", order.id, customer_name.unwrap_or("customer")),
            order_id: Some(order.id),
            user_id: Some(order.user_id),
        }
    }

    /// One unread copy per admin, not deduplicated.
    pub fn fan_out(&self, admins: &[User]) -> Vec<Notification> {
        let now = Utc::now();
        admins.iter().filter(|a| a.is_admin()).map(|admin| Notification {
            id: Uuid::now_v7(), kind: self.kind, title: self.title.clone(), message: self.message.clone(),
            order_id: self.order_id, user_id: self.user_id, recipient_id: Some(admin.id), read: false, created_at: now,
        }).collect()
    }
}
