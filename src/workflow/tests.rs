use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::*;
use crate::config::{RazorpayCredentials, WorkflowSettings};
use crate::domain::{NotificationKind, Product, TransitionPolicy};
use crate::payment::razorpay::{self, Razorpay};
use crate::store::{CatalogStore, MemoryStore, NotificationStore, OrderStore, UserStore};
use crate::testing::{self, BarrierCatalog, FakeGateway, Harness};

fn cod(lines: &[(&Product, i64)]) -> PlaceOrder {
    PlaceOrder {
        lines: lines.iter().map(|(p, q)| OrderLine::new(p.id, *q)).collect(),
        payment_method: "cash_on_delivery".into(),
        shipping_address: testing::address(),
    }
}

fn sequential() -> WorkflowSettings { WorkflowSettings { line_mode: LineMode::Sequential, ..Default::default() } }

const RZP_SECRET: &str = "rzp_test_secret";

async fn razorpay_harness() -> Harness {
    let gateway = Razorpay::new(reqwest::Client::new(), RazorpayCredentials { key_id: "rzp_test_key".into(), key_secret: RZP_SECRET.into() });
    Harness::build(WorkflowSettings::default(), Some(Arc::new(gateway)), None).await
}

#[tokio::test]
async fn test_cod_order_end_to_end() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;

    let placed = h.workflow.place_order(&h.customer, cod(&[(&p1, 2)])).await.unwrap();
    let order = &placed.order;
    assert_eq!(order.total_amount, Decimal::new(200, 0));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.products[0].name, "Toor Dal");
    assert_eq!(h.stock_of(p1.id).await, 3);

    let stored_user = h.memory.user(h.customer.id).await.unwrap().unwrap();
    assert_eq!(stored_user.orders, vec![order.id]);
    assert!(h.memory.order(order.id).await.unwrap().is_some());

    let notes = h.memory.recent_notifications(50).await.unwrap();
    assert_eq!(notes.len(), h.admins.len());
    assert!(notes.iter().all(|n| n.kind == NotificationKind::OrderPlaced && n.order_id == Some(order.id)));
    assert!(notes[0].message.contains("Asha (asha@example.com) has placed a new order of ₹200.00"));

    let report = placed.delivery.await.unwrap();
    assert!(report.sms && report.email);
    assert_eq!(h.sms.sent()[0].0, "+919876543210");
    assert_eq!(h.email.sent()[0].to, "asha@example.com");
}

#[tokio::test]
async fn test_total_is_a_snapshot() {
    let h = Harness::new().await;
    let mut p1 = h.stock_product("Basmati Rice", 120, 10).await;
    let p2 = h.stock_product("Mustard Oil", 35, 10).await;
    let order = h.workflow.place_order(&h.customer, cod(&[(&p1, 2), (&p2, 3)])).await.unwrap().order;
    assert_eq!(order.total_amount, Decimal::new(345, 0));

    p1.price = Decimal::new(999, 0);
    h.memory.update_product(&p1).await.unwrap();
    let reread = h.workflow.order_for(&h.customer, order.id).await.unwrap();
    assert_eq!(reread.total_amount, Decimal::new(345, 0));
    assert_eq!(reread.products[0].price, Decimal::new(120, 0));
}

#[tokio::test]
async fn test_insufficient_stock_creates_nothing() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 1).await;
    let err = h.workflow.place_order(&h.customer, cod(&[(&p1, 2)])).await.unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { ref product } if product == "Toor Dal"));
    assert_eq!(err.to_string(), "Insufficient stock for Toor Dal");
    assert_eq!(h.stock_of(p1.id).await, 1);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);
    assert_eq!(h.memory.unread_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_input_has_no_side_effects() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;

    let empty = PlaceOrder { lines: vec![], ..cod(&[]) };
    let zero = cod(&[(&p1, 0)]);
    let method = PlaceOrder { payment_method: "barter".into(), ..cod(&[(&p1, 1)]) };
    let mut no_city = cod(&[(&p1, 1)]);
    no_city.shipping_address.city = " ".into();

    for input in [empty, zero, method, no_city] {
        let err = h.workflow.place_order(&h.customer, input).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)), "{err:?}");
    }
    assert_eq!(h.stock_of(p1.id).await, 5);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);

    let missing = cod(&[(&testing::new_product("Ghost", 1, 1), 1)]);
    assert!(matches!(h.workflow.place_order(&h.customer, missing).await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn test_atomic_mode_checks_every_line_first() {
    let h = Harness::new().await;
    let plenty = h.stock_product("Sugar", 40, 10).await;
    let scarce = h.stock_product("Saffron", 500, 1).await;
    let err = h.workflow.place_order(&h.customer, cod(&[(&plenty, 4), (&scarce, 2)])).await.unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { .. }));
    assert_eq!(h.stock_of(plenty.id).await, 10);
}

#[tokio::test]
async fn test_repeated_product_lines_share_the_stock_check() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;

    let err = h.workflow.place_order(&h.customer, cod(&[(&p1, 3), (&p1, 3)])).await.unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { ref product } if product == "Toor Dal"));
    assert_eq!(h.stock_of(p1.id).await, 5);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);

    let order = h.workflow.place_order(&h.customer, cod(&[(&p1, 2), (&p1, 3)])).await.unwrap().order;
    assert_eq!(order.total_amount, Decimal::new(500, 0));
    assert_eq!(h.stock_of(p1.id).await, 0);
}

#[tokio::test]
async fn test_oversized_order_total_is_a_validation_error() {
    let gateway = Arc::new(FakeGateway::completing());
    let h = Harness::build(WorkflowSettings::default(), Some(gateway.clone()), None).await;
    let mut gold = testing::new_product("Gold Bar", 1, 10);
    gold.price = crate::domain::MAX_AMOUNT;
    h.memory.insert_product(&gold).await.unwrap();

    let err = h.workflow.place_order(&h.customer, cod(&[(&gold, 2)])).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m == "Order total is too large"), "{err:?}");
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);

    let err = h.workflow.create_payment_intent(&h.customer, &[OrderLine::new(gold.id, 2)]).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m == "Order total is too large"), "{err:?}");
    assert!(gateway.quotes().is_empty());
    assert_eq!(h.stock_of(gold.id).await, 10);
}

#[tokio::test]
async fn test_sequential_mode_keeps_earlier_decrements() {
    let h = Harness::build(sequential(), None, None).await;
    let plenty = h.stock_product("Sugar", 40, 10).await;
    let scarce = h.stock_product("Saffron", 500, 1).await;
    let err = h.workflow.place_order(&h.customer, cod(&[(&plenty, 4), (&scarce, 2)])).await.unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { .. }));
    assert_eq!(h.stock_of(plenty.id).await, 6);
    assert_eq!(h.stock_of(scarce.id).await, 1);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_checkouts_oversell() {
    let memory = Arc::new(MemoryStore::default());
    let catalog = Arc::new(BarrierCatalog::new(memory.clone(), 2));
    let h = Harness::with_memory(memory, WorkflowSettings::default(), None, Some(catalog)).await;
    let p1 = h.stock_product("Ghee", 250, 5).await;

    let (a, b) = tokio::join!(
        h.workflow.place_order(&h.customer, cod(&[(&p1, 5)])),
        h.workflow.place_order(&h.customer, cod(&[(&p1, 5)])),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(h.stock_of(p1.id).await, -5);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_cancel_restores_stock_once() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;
    let order = h.workflow.place_order(&h.customer, cod(&[(&p1, 2)])).await.unwrap().order;

    let cancelled = h.workflow.cancel_order(&h.customer, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.stock_of(p1.id).await, 5);

    let again = h.workflow.cancel_order(&h.customer, order.id).await.unwrap_err();
    assert!(matches!(again, ShopError::InvalidState(ref m) if m == "This order cannot be cancelled"));
    assert_eq!(h.stock_of(p1.id).await, 5);
}

#[tokio::test]
async fn test_drained_events_are_not_left_on_orders() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;
    let mut placed = h.workflow.place_order(&h.customer, cod(&[(&p1, 2)])).await.unwrap().order;
    assert!(placed.take_events().is_empty());

    let mut cancelled = h.workflow.cancel_order(&h.customer, placed.id).await.unwrap();
    assert!(cancelled.take_events().is_empty());
    assert_eq!(h.stock_of(p1.id).await, 5);
}

#[tokio::test]
async fn test_cancel_rules_by_status_and_caller() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 10).await;

    let delivered = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;
    h.workflow.update_status(h.admin(), delivered.id, "delivered").await.unwrap();
    assert!(matches!(h.workflow.cancel_order(h.admin(), delivered.id).await, Err(ShopError::InvalidState(_))));
    assert_eq!(h.memory.order(delivered.id).await.unwrap().unwrap().status, OrderStatus::Delivered);
    assert_eq!(h.stock_of(p1.id).await, 9);

    let packed = h.workflow.place_order(&h.customer, cod(&[(&p1, 2)])).await.unwrap().order;
    h.workflow.update_status(h.admin(), packed.id, "packed").await.unwrap();
    h.workflow.cancel_order(&h.customer, packed.id).await.unwrap();
    assert_eq!(h.stock_of(p1.id).await, 7);

    let other = testing::user("Ravi", crate::domain::Role::Customer);
    let pending = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;
    assert!(matches!(h.workflow.cancel_order(&other, pending.id).await, Err(ShopError::AccessDenied(_))));
    assert!(matches!(h.workflow.cancel_order(&h.customer, Uuid::now_v7()).await, Err(ShopError::NotFound(_))));

    h.memory.delete_product(p1.id).await.unwrap();
    let cancelled = h.workflow.cancel_order(h.admin(), pending.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_status_updates_and_admin_alerts() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 10).await;
    let order = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;
    let placed_alerts = h.memory.unread_count().await.unwrap();

    let err = h.workflow.update_status(h.admin(), order.id, "shipped").await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m == "Invalid status"));
    assert_eq!(h.memory.order(order.id).await.unwrap().unwrap().status, OrderStatus::Pending);

    assert!(matches!(h.workflow.update_status(&h.customer, order.id, "packed").await, Err(ShopError::AccessDenied(_))));
    assert!(matches!(h.workflow.update_status(h.admin(), Uuid::now_v7(), "packed").await, Err(ShopError::NotFound(_))));

    let packed = h.workflow.update_status(h.admin(), order.id, "packed").await.unwrap();
    assert_eq!(packed.order.status, OrderStatus::Packed);
    let report = packed.delivery.unwrap().await.unwrap();
    assert!(report.sms && report.email);
    assert_eq!(h.memory.unread_count().await.unwrap(), placed_alerts);

    let delivered = h.workflow.update_status(h.admin(), order.id, "delivered").await.unwrap();
    assert_eq!(h.memory.order(order.id).await.unwrap().unwrap().status, OrderStatus::Delivered);
    let alerts: Vec<_> = h.memory.recent_notifications(50).await.unwrap().into_iter()
        .filter(|n| n.kind == NotificationKind::OrderStatusChanged).collect();
    assert_eq!(alerts.len(), h.admins.len());
    assert!(alerts.iter().all(|n| n.order_id == Some(order.id) && n.message.ends_with("delivered to Asha")));
    delivered.delivery.unwrap().await.unwrap();
    assert!(h.sms.sent().last().unwrap().1.contains("has been delivered"));

    let unchanged = h.workflow.update_status(h.admin(), order.id, "delivered").await.unwrap();
    assert!(unchanged.delivery.is_none());
}

#[tokio::test]
async fn test_terminal_locked_transitions() {
    let settings = WorkflowSettings { transitions: TransitionPolicy::TerminalLocked, ..Default::default() };
    let h = Harness::build(settings, None, None).await;
    let p1 = h.stock_product("Toor Dal", 100, 10).await;
    let order = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;
    h.workflow.update_status(h.admin(), order.id, "cancelled").await.unwrap();
    let err = h.workflow.update_status(h.admin(), order.id, "pending").await.unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(_)));
}

#[tokio::test]
async fn test_order_visibility() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Toor Dal", 100, 10).await;
    let first = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;
    let second = h.workflow.place_order(&h.customer, cod(&[(&p1, 1)])).await.unwrap().order;

    let mine = h.workflow.orders_of(&h.customer).await.unwrap();
    assert_eq!(mine.iter().map(|o| o.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    assert!(matches!(h.workflow.all_orders(&h.customer).await, Err(ShopError::AccessDenied(_))));
    assert_eq!(h.workflow.all_orders(h.admin()).await.unwrap().len(), 2);

    let stranger = testing::user("Ravi", crate::domain::Role::Customer);
    assert!(matches!(h.workflow.order_for(&stranger, first.id).await, Err(ShopError::AccessDenied(_))));
    assert!(h.workflow.order_for(h.admin(), first.id).await.is_ok());
}

#[tokio::test]
async fn test_signature_mismatch_persists_nothing() {
    let h = razorpay_harness().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;
    let input = SettlePayment {
        proof: SettlementProof::Signature { order_id: "order_NqB8kXyZ".into(), payment_id: "pay_NqB9aa11".into(), signature: "ab".repeat(32) },
        lines: vec![OrderLine::new(p1.id, 2)],
        shipping_address: testing::address(),
    };
    let err = h.workflow.settle_payment(&h.customer, input).await.unwrap_err();
    assert!(matches!(err, ShopError::PaymentVerificationFailed));
    assert_eq!(h.stock_of(p1.id).await, 5);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_valid_signature_places_confirmed_order() {
    let h = razorpay_harness().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;
    let signature = razorpay::sign(RZP_SECRET, "order_NqB8kXyZ", "pay_NqB9aa11").unwrap();
    let input = SettlePayment {
        proof: SettlementProof::Signature { order_id: "order_NqB8kXyZ".into(), payment_id: "pay_NqB9aa11".into(), signature },
        lines: vec![OrderLine::new(p1.id, 2)],
        shipping_address: testing::address(),
    };
    let order = h.workflow.settle_payment(&h.customer, input).await.unwrap().order;
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_method, PaymentMethod::OnlinePayment);
    assert_eq!(order.payment_order_id.as_deref(), Some("order_NqB8kXyZ"));
    assert_eq!(order.payment_id.as_deref(), Some("pay_NqB9aa11"));
    assert_eq!(h.stock_of(p1.id).await, 3);
    assert_eq!(h.memory.unread_count().await.unwrap(), h.admins.len() as u64);
}

#[tokio::test]
async fn test_settled_payment_cannot_be_replayed() {
    let h = razorpay_harness().await;
    let p1 = h.stock_product("Toor Dal", 100, 5).await;
    let signature = razorpay::sign(RZP_SECRET, "order_NqB8kXyZ", "pay_NqB9aa11").unwrap();
    let input = SettlePayment {
        proof: SettlementProof::Signature { order_id: "order_NqB8kXyZ".into(), payment_id: "pay_NqB9aa11".into(), signature },
        lines: vec![OrderLine::new(p1.id, 2)],
        shipping_address: testing::address(),
    };
    h.workflow.settle_payment(&h.customer, input.clone()).await.unwrap();

    let err = h.workflow.settle_payment(&h.customer, input).await.unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(ref m) if m == "Payment has already been used for an order"));
    assert_eq!(h.stock_of(p1.id).await, 3);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 1);
    assert_eq!(h.memory.unread_count().await.unwrap(), h.admins.len() as u64);
}

#[tokio::test]
async fn test_capture_gateway_flow() {
    let gateway = Arc::new(FakeGateway::completing());
    let h = Harness::build(WorkflowSettings::default(), Some(gateway.clone()), None).await;
    let p1 = h.stock_product("Honey", 250, 4).await;

    let intent = h.workflow.create_payment_intent(&h.customer, &[OrderLine::new(p1.id, 3)]).await.unwrap();
    assert_eq!(intent.amount, 75_000);
    assert!(intent.approval_url.is_some());
    assert_eq!(gateway.quotes()[0].total, Decimal::new(750, 0));
    assert_eq!(h.stock_of(p1.id).await, 4);

    let input = SettlePayment {
        proof: SettlementProof::Capture { order_id: intent.gateway_order_id.clone() },
        lines: vec![OrderLine::new(p1.id, 3)],
        shipping_address: testing::address(),
    };
    let order = h.workflow.settle_payment(&h.customer, input).await.unwrap().order;
    assert_eq!(order.payment_id.as_deref(), Some("3C679366HH908993F"));
    assert_eq!(h.stock_of(p1.id).await, 1);
}

#[tokio::test]
async fn test_incomplete_capture_persists_nothing() {
    let h = Harness::build(WorkflowSettings::default(), Some(Arc::new(FakeGateway::with_status("PAYER_ACTION_REQUIRED"))), None).await;
    let p1 = h.stock_product("Honey", 250, 4).await;
    let input = SettlePayment {
        proof: SettlementProof::Capture { order_id: "5O190127TN364715T".into() },
        lines: vec![OrderLine::new(p1.id, 1)],
        shipping_address: testing::address(),
    };
    let err = h.workflow.settle_payment(&h.customer, input).await.unwrap_err();
    assert!(matches!(err, ShopError::PaymentNotCompleted { ref status } if status == "PAYER_ACTION_REQUIRED"));
    assert_eq!(h.stock_of(p1.id).await, 4);
    assert_eq!(h.memory.count_orders(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_online_payment_requires_a_gateway() {
    let h = Harness::new().await;
    let p1 = h.stock_product("Honey", 250, 4).await;
    let err = h.workflow.create_payment_intent(&h.customer, &[OrderLine::new(p1.id, 1)]).await.unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(_)));
}
