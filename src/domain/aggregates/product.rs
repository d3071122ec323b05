//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use crate::domain::value_objects::MAX_AMOUNT;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: Category,
    pub tags: Vec<String>,
    pub image_url: String,
    /// Signed on purpose: concurrent checkouts adjust stock relatively and can oversell.
    pub stock: i64,
    pub unit: Unit,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category { Rice, Pulses, Oils, Snacks, Beverages, Spices, Dairy, Household }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg")] Kg,
    #[serde(rename = "g")] G,
    #[serde(rename = "L")] L,
    #[serde(rename = "mL")] Ml,
    #[default]
    #[serde(rename = "piece")] Piece,
    #[serde(rename = "pack")] Pack,
    #[serde(rename = "dozen")] Dozen,
    #[serde(rename = "box")] Box,
}

impl Category {
    pub const ALL: [Category; 8] = [Self::Rice, Self::Pulses, Self::Oils, Self::Snacks, Self::Beverages, Self::Spices, Self::Dairy, Self::Household];
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rice => "Rice", Self::Pulses => "Pulses", Self::Oils => "Oils", Self::Snacks => "Snacks",
            Self::Beverages => "Beverages", Self::Spices => "Spices", Self::Dairy => "Dairy", Self::Household => "Household",
        }
    }
}

impl Unit {
    pub const ALL: [Unit; 8] = [Self::Kg, Self::G, Self::L, Self::Ml, Self::Piece, Self::Pack, Self::Dozen, Self::Box];
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kg => "kg", Self::G => "g", Self::L => "L", Self::Ml => "mL",
            Self::Piece => "piece", Self::Pack => "pack", Self::Dozen => "dozen", Self::Box => "box",
        }
    }
}

impl fmt::Display for Category { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }
impl fmt::Display for Unit { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) } }

impl FromStr for Category {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.as_str() == s).ok_or(ProductError::InvalidCategory)
    }
}

impl FromStr for Unit {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|u| u.as_str() == s).ok_or(ProductError::InvalidUnit)
    }
}

/// Fields an admin supplies when creating a product.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub category: Category,
    pub tags: Vec<String>,
    pub image_url: String,
    pub stock: i64,
    pub unit: Unit,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
    pub unit: Option<Unit>,
}

impl Product {
    pub fn create(new: NewProduct) -> Result<Self, ProductError> {
        let mut product = Self {
            id: Uuid::now_v7(), name: String::new(), price: Decimal::ZERO, category: new.category,
            tags: vec![], image_url: String::new(), stock: 0, unit: new.unit, created_at: Utc::now(),
        };
        product.apply(ProductPatch {
            name: Some(new.name), price: Some(new.price), category: None, tags: Some(new.tags),
            image_url: Some(new.image_url), stock: Some(new.stock), unit: None,
        })?;
        Ok(product)
    }

    /// Validates every supplied field before writing any of them.
    pub fn apply(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        let name = patch.name.map(|n| n.trim().to_string());
        if name.as_deref().is_some_and(str::is_empty) { return Err(ProductError::MissingName); }
        if patch.price.is_some_and(|p| p.is_sign_negative()) { return Err(ProductError::NegativePrice); }
        if patch.price.is_some_and(|p| p > MAX_AMOUNT) { return Err(ProductError::PriceTooHigh); }
        if patch.stock.is_some_and(|s| s < 0) { return Err(ProductError::NegativeStock); }
        let image_url = patch.image_url.map(|u| u.trim().to_string());
        if image_url.as_deref().is_some_and(str::is_empty) { return Err(ProductError::MissingImage); }

        if let Some(name) = name { self.name = name; }
        if let Some(price) = patch.price { self.price = price; }
        if let Some(category) = patch.category { self.category = category; }
        if let Some(tags) = patch.tags { self.tags = normalise_tags(tags); }
        if let Some(image_url) = image_url { self.image_url = image_url; }
        if let Some(stock) = patch.stock { self.stock = stock; }
        if let Some(unit) = patch.unit { self.unit = unit; }
        Ok(())
    }

    pub fn has_stock_for(&self, quantity: u32) -> bool { self.stock >= i64::from(quantity) }

    /// Case-insensitive substring match over the name and every tag.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() { return true; }
        self.name.to_lowercase().contains(&needle) || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

fn normalise_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NegativePrice, PriceTooHigh, NegativeStock, MissingImage, InvalidCategory, InvalidUnit }
impl std::error::Error for ProductError {}
impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::NegativePrice => write!(f, "Price must be a positive number"),
            Self::PriceTooHigh => write!(f, "Price must be at most {MAX_AMOUNT}"),
            Self::NegativeStock => write!(f, "Stock must be a non-negative integer"),
            Self::MissingImage => write!(f, "Image is required"),
            Self::InvalidCategory => write!(f, "Invalid category"),
            Self::InvalidUnit => write!(f, "Invalid unit"),
        }
    }
}
