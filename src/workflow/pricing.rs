//! Turning requested lines into priced, stock-checked line items.

use std::collections::HashMap;
use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{LineItem, Money, OrderError, Product, Quantity, MAX_AMOUNT};
use crate::payment::QuotedLine;
use crate::store::CatalogStore;
use crate::{Result, ShopError};

/// How a multi-line order touches stock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineMode {
    /// Every line is looked up and checked before any stock is written.
    #[default]
    Atomic,
    /// Check and decrement line by line; a later failure leaves earlier decrements in place.
    Sequential,
}

impl LineMode {
    pub fn as_str(&self) -> &'static str { match self { Self::Atomic => "atomic", Self::Sequential => "sequential" } }
}

impl fmt::Display for LineMode { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for LineMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() { "atomic" => Ok(Self::Atomic), "sequential" => Ok(Self::Sequential), other => Err(other.to_string()) }
    }
}

/// One requested line as the client sends it.
#[derive(Clone, Debug, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: Uuid, quantity: i64) -> Self { Self { product_id, quantity } }
}

/// Shape checks that need no store access.
pub(crate) fn validate_lines(lines: &[OrderLine]) -> Result<Vec<(Uuid, Quantity)>> {
    if lines.is_empty() { return Err(ShopError::Validation("At least one product is required".into())); }
    lines.iter()
        .map(|l| Quantity::new(l.quantity).map(|q| (l.product_id, q)).map_err(|e| ShopError::Validation(e.to_string())))
        .collect()
}

async fn load(catalog: &dyn CatalogStore, id: Uuid) -> Result<Product> {
    catalog.product(id).await?.ok_or_else(|| ShopError::NotFound(format!("Product {id} not found")))
}

/// `requested` is everything this order asks of the product so far, not just the current line.
fn check_stock(product: &Product, requested: u32) -> Result<()> {
    if product.has_stock_for(requested) { Ok(()) } else { Err(ShopError::InsufficientStock { product: product.name.clone() }) }
}

async fn decrement(catalog: &dyn CatalogStore, product: &Product, quantity: Quantity) -> Result<()> {
    if !catalog.adjust_stock(product.id, -quantity.as_delta()).await? {
        return Err(ShopError::NotFound(format!("Product {} not found", product.id)));
    }
    Ok(())
}

/// Looks up and stock-checks every line without writing anything.
/// Lines naming the same product are checked against their combined quantity.
pub(crate) async fn price(catalog: &dyn CatalogStore, lines: &[(Uuid, Quantity)]) -> Result<Vec<(Product, Quantity)>> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut requested: HashMap<Uuid, u32> = HashMap::new();
    for &(id, quantity) in lines {
        let product = load(catalog, id).await?;
        let total = requested.entry(id).or_default();
        *total = total.saturating_add(quantity.value());
        check_stock(&product, *total)?;
        priced.push((product, quantity));
    }
    Ok(priced)
}

/// Sum of price × quantity, bounded by what an order can store.
pub(crate) fn total(priced: &[(Product, Quantity)], currency: &str) -> Result<Decimal> {
    let total = priced.iter()
        .try_fold(Money::zero(currency), |acc, (p, q)| Money::new(p.price, currency).multiply(q.value()).and_then(|line| acc.add(&line)))
        .map_err(|_| OrderError::TotalTooLarge)?;
    if total.amount() > MAX_AMOUNT { return Err(OrderError::TotalTooLarge.into()); }
    Ok(total.amount())
}

/// Prices the lines and takes their quantities out of stock.
pub(crate) async fn reserve(catalog: &dyn CatalogStore, lines: &[(Uuid, Quantity)], mode: LineMode, currency: &str) -> Result<Vec<LineItem>> {
    let mut items = Vec::with_capacity(lines.len());
    match mode {
        LineMode::Atomic => {
            let priced = price(catalog, lines).await?;
            total(&priced, currency)?;
            for (product, quantity) in priced {
                decrement(catalog, &product, quantity).await?;
                items.push(LineItem::snapshot(&product, quantity));
            }
        }
        LineMode::Sequential => {
            for &(id, quantity) in lines {
                let product = load(catalog, id).await?;
                check_stock(&product, quantity.value())?;
                decrement(catalog, &product, quantity).await?;
                items.push(LineItem::snapshot(&product, quantity));
            }
        }
    }
    Ok(items)
}

pub(crate) fn quote_lines(priced: &[(Product, Quantity)]) -> Vec<QuotedLine> {
    priced.iter().map(|(p, q)| QuotedLine { name: p.name.clone(), unit_price: p.price, quantity: q.value() }).collect()
}
