//! Value Objects for ShopEase

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest amount the store persists (`NUMERIC(12, 2)`): 9,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn inr(amount: Decimal) -> Self { Self::new(amount, "INR") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        let amount = self.amount.checked_mul(Decimal::from(qty)).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }

    /// Amount in the currency's minor unit (paise, cents), rounded half away from zero.
    pub fn minor_units(&self) -> Result<i64, MoneyError> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    fn symbol(&self) -> Option<&'static str> {
        match self.currency.as_str() { "INR" => Some("₹"), "USD" => Some("$"), "EUR" => Some("€"), "GBP" => Some("£"), _ => None }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.round_dp(2);
        match self.symbol() {
            Some(sym) => write!(f, "{sym}{amount:.2}"),
            None => write!(f, "{} {amount:.2}", self.currency),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::CurrencyMismatch => write!(f, "Currency mismatch"), Self::Overflow => write!(f, "Amount out of range") }
    }
}

/// Quantity of a line item; always at least one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 { return Err(QuantityError::BelowOne); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge)
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn as_delta(&self) -> i64 { i64::from(self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { BelowOne, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::BelowOne => write!(f, "Quantity must be at least 1"), Self::TooLarge => write!(f, "Quantity is too large") }
    }
}

/// Normalised, lower-cased email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        let (local, domain) = value.split_once('@')?;
        if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') { return None; }
        Some(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Phone number in E.164-ish form. Bare ten digit numbers are treated as Indian mobiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn normalise(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() { return None; }
        if trimmed.starts_with('+') { return Some(Self(trimmed.to_string())); }
        if trimmed.len() == 10 { Some(Self(format!("+91{trimmed}"))) } else { Some(Self(format!("+{trimmed}"))) }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::inr(Decimal::new(100, 0));
        let b = Money::inr(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert_eq!(a.add(&Money::new(Decimal::ONE, "usd")), Err(MoneyError::CurrencyMismatch));
    }
    #[test]
    fn test_money_minor_units_and_display() {
        let m = Money::inr(Decimal::new(19995, 3));
        assert_eq!(m.minor_units().unwrap(), 2000);
        assert_eq!(Money::inr(Decimal::new(200, 0)).to_string(), "₹200.00");
        assert_eq!(Money::new(Decimal::new(15, 1), "JPY").to_string(), "JPY 1.50");
    }
    #[test]
    fn test_money_arithmetic_overflow_is_an_error() {
        let huge = Money::inr(Decimal::MAX / Decimal::TWO);
        assert_eq!(huge.multiply(3), Err(MoneyError::Overflow));
        assert_eq!(huge.add(&huge).and_then(|m| m.add(&huge)), Err(MoneyError::Overflow));
        assert_eq!(Money::inr(MAX_AMOUNT).multiply(1).unwrap().amount().to_string(), "9999999999.99");
    }
    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(0), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(-3), Err(QuantityError::BelowOne));
        assert_eq!(Quantity::new(4).unwrap().value(), 4);
    }
    #[test]
    fn test_email() {
        assert_eq!(Email::parse("  Asha@Example.COM ").unwrap().as_str(), "asha@example.com");
        assert!(Email::parse("nope").is_none());
        assert!(Email::parse("a@b").is_none());
    }
    #[test]
    fn test_phone() {
        assert_eq!(PhoneNumber::normalise("9876543210").unwrap().as_str(), "+919876543210");
        assert_eq!(PhoneNumber::normalise(" +14155550100 ").unwrap().as_str(), "+14155550100");
        assert_eq!(PhoneNumber::normalise("447700900123").unwrap().as_str(), "+447700900123");
        assert!(PhoneNumber::normalise("   ").is_none());
    }
}
