//! Message bodies for customer SMS and email.

use std::fmt::Write;

use crate::domain::{Order, OrderStatus, ShippingAddress};

struct StatusCopy { title: &'static str, message: &'static str, sms: &'static str, color: &'static str }

fn status_copy(status: OrderStatus) -> StatusCopy {
    match status {
        OrderStatus::Pending => StatusCopy { title: "Order Pending Confirmation", message: "Your order is pending confirmation. We will process it shortly.", sms: "is pending confirmation", color: "#f59e0b" },
        OrderStatus::Confirmed => StatusCopy { title: "Order Confirmed", message: "Your order has been confirmed and is being prepared.", sms: "has been confirmed", color: "#10b981" },
        OrderStatus::Packed => StatusCopy { title: "Order Packed", message: "Your order has been packed and is ready for dispatch!", sms: "has been packed and is ready for dispatch", color: "#8b5cf6" },
        OrderStatus::Delivered => StatusCopy { title: "Order Delivered", message: "Your order has been delivered successfully. Thank you for shopping with us!", sms: "has been delivered", color: "#3b82f6" },
        OrderStatus::Cancelled => StatusCopy { title: "Order Cancelled", message: "Your order has been cancelled. If you have any questions, please contact us.", sms: "has been cancelled", color: "#ef4444" },
    }
}

pub fn order_placed_sms(name: &str, order: &Order) -> String {
    format!(
        "Hello {name}! Your order #{} of {} has been placed successfully. We'll keep you updated! Thank you for shopping with ShopEase!",
        order.short_ref(), order.total(),
    )
}

pub fn status_sms(name: &str, order: &Order) -> String {
    format!("Hello {name}! Your order #{} {}. Thank you for shopping with ShopEase!", order.short_ref(), status_copy(order.status).sms)
}

pub fn status_subject(status: OrderStatus) -> String {
    let s = status.as_str();
    let mut chars = s.chars();
    let capitalised: String = chars.next().map(|c| c.to_uppercase().chain(chars).collect()).unwrap_or_default();
    format!("Order {capitalised} - ShopEase")
}

pub fn order_placed_email(name: &str, order: &Order) -> String {
    let mut body = String::new();
    let _ = write!(body, "<p>Thank you for your order! We're excited to process it for you.</p>");
    let _ = write!(
        body,
        "<div style=\"border-left:4px solid #10b981;padding:16px\"><p><strong>Order ID:</strong> #{}</p><p><strong>Total Amount:</strong> {}</p><p><strong>Payment Method:</strong> {}</p></div>",
        order.short_ref(), order.total(), order.payment_method.as_str().replace('_', " "),
    );
    body.push_str(&items_html(order));
    body.push_str(&address_html(&order.shipping_address));
    body.push_str("<p>We'll send you updates about your order status via email and SMS.</p>");
    layout("Order Confirmation", name, &body)
}

pub fn status_email(name: &str, order: &Order) -> String {
    let copy = status_copy(order.status);
    let mut body = format!("<p>{}</p>", copy.message);
    let _ = write!(
        body,
        "<div style=\"border-left:4px solid {};padding:16px\"><p><strong>Order ID:</strong> #{}</p><p><strong>Status:</strong> {}</p><p><strong>Total Amount:</strong> {}</p></div>",
        copy.color, order.short_ref(), order.status, order.total(),
    );
    body.push_str(&items_html(order));
    body.push_str("<p>You can track your order status anytime from your account dashboard.</p>");
    layout(copy.title, name, &body)
}

fn items_html(order: &Order) -> String {
    if order.products.is_empty() { return String::new(); }
    let mut html = String::from("<h3>Order Items:</h3><ul>");
    for line in &order.products {
        let line_total = line.line_total(&order.currency).map(|m| m.to_string()).unwrap_or_default();
        let _ = write!(
            html, "<li><strong>{}</strong>: {} {} &times; {} = {}</li>",
            escape(&line.name), line.quantity, line.unit,
            crate::domain::Money::new(line.price, &order.currency), line_total,
        );
    }
    html.push_str("</ul>");
    html
}

fn address_html(a: &ShippingAddress) -> String {
    let line2 = a.address_line2.as_deref().filter(|l| !l.trim().is_empty()).map(|l| format!("{}<br>", escape(l))).unwrap_or_default();
    format!(
        "<h3>Shipping Address:</h3><p>{}<br>{}<br>{line2}{}, {} {}<br>{}<br>Phone: {}</p>",
        escape(&a.full_name), escape(&a.address_line1), escape(&a.city), escape(&a.state), escape(&a.pincode), escape(&a.country), escape(&a.phone),
    )
}

fn layout(title: &str, name: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title} - ShopEase</title></head>\
         <body style=\"font-family:Arial,sans-serif\"><h1 style=\"color:#dc2626\">ShopEase</h1><h2>Hello {}!</h2>{body}\
         <p style=\"color:#9ca3af;font-size:12px\">Thank you for shopping with ShopEase! This is an automated email. Please do not reply to this message.</p>\
         </body></html>",
        escape(name),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_sms_copy() {
        let mut order = testing::sample_order();
        let placed = order_placed_sms("Asha", &order);
        assert!(placed.contains(&format!("#{}", order.short_ref())));
        assert!(placed.contains("₹200.00"));

        order.status = OrderStatus::Packed;
        assert_eq!(
            status_sms("Asha", &order),
            format!("Hello Asha! Your order #{} has been packed and is ready for dispatch. Thank you for shopping with ShopEase!", order.short_ref()),
        );
    }

    #[test]
    fn test_status_subject() {
        assert_eq!(status_subject(OrderStatus::Delivered), "Order Delivered - ShopEase");
        assert_eq!(status_subject(OrderStatus::Pending), "Order Pending - ShopEase");
    }

    #[test]
    fn test_email_escapes_customer_input() {
        let mut order = testing::sample_order();
        order.shipping_address.full_name = "<script>x</script>".into();
        let html = order_placed_email("Tom & Jerry", &order);
        assert!(html.contains("Hello Tom &amp; Jerry!"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
