//! Back-office dashboard rollups.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::OrderStatus;
use crate::store::Stores;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    /// Every order except cancelled ones.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

pub async fn dashboard(stores: &Stores) -> Result<DashboardStats> {
    let (total_products, total_orders, pending_orders, total_revenue) = tokio::try_join!(
        stores.catalog.count_products(),
        stores.orders.count_orders(None),
        stores.orders.count_orders(Some(OrderStatus::Pending)),
        stores.orders.revenue_excluding(OrderStatus::Cancelled),
    )?;
    Ok(DashboardStats { total_products, total_orders, pending_orders, total_revenue })
}
