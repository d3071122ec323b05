//! Domain events
use crate::domain::aggregates::OrderStatus;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Raised by the order aggregate; the workflow drains them to decide which side effects to run.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: Uuid, restock: bool },
}
