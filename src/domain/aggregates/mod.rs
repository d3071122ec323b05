//! Aggregates module
pub mod product;
pub mod order;
pub mod user;
pub mod notification;

pub use product::{Category, NewProduct, Product, ProductError, ProductPatch, Unit};
pub use order::{GatewayRef, LineItem, Order, OrderError, OrderStatus, PaymentMethod, ShippingAddress, TransitionPolicy};
pub use user::{Role, User};
pub use notification::{AdminAlert, Notification, NotificationKind};
