//! Domain layer: value objects, aggregates and order lifecycle events.

pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::OrderEvent;
pub use value_objects::{Email, Money, MAX_AMOUNT, MoneyError, PhoneNumber, Quantity, QuantityError};
