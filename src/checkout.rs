//! Order checkout: formats the cart and customer details into one WhatsApp
//! message and builds the wa.me link that carries it.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::models::{CartItem, CustomerInfo, OrderMode};

/// WhatsApp number that receives orders.
pub const ORDER_PHONE: &str = "918210936795";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("cart is empty")]
    EmptyCart,
}

/// Deterministic order message. Lines appear in cart order; same cart,
/// customer and mode always produce the identical string.
pub fn compose_message(
    items: &[CartItem],
    customer: &CustomerInfo,
    mode: OrderMode,
    delivery_charge: i64,
) -> Result<String, CheckoutError> {
    let name = customer.name.trim();
    let phone = customer.phone.trim();
    if name.is_empty() {
        return Err(CheckoutError::MissingRequiredField("name"));
    }
    if phone.is_empty() {
        return Err(CheckoutError::MissingRequiredField("phone"));
    }
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let subtotal: f64 = items
        .iter()
        .map(|line| line.price * line.quantity as f64)
        .sum();
    let total = match mode {
        OrderMode::Pickup => subtotal,
        OrderMode::Delivery => subtotal + delivery_charge as f64,
    };

    let mut message = String::from("*New Order*\n\n");
    message.push_str(&format!("*Customer:* {name}\n"));
    message.push_str(&format!("*Phone:* {phone}\n"));

    if let Some(notes) = customer
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        message.push_str(&format!("*Notes:* {notes}\n"));
    }

    let address = customer
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    match (mode, address) {
        (OrderMode::Delivery, Some(address)) => {
            message.push_str(&format!("*Address:* {address}\n"));
            message.push_str(&format!("*Delivery:* Yes (+₹{delivery_charge})\n"));
        }
        _ => message.push_str("*Mode:* Dine-in / Takeaway\n"),
    }

    message.push_str("\n*Order Details:*\n");
    for line in items {
        message.push_str(&format!(
            "• {}x {} ({}) - ₹{}\n",
            line.quantity,
            line.name,
            line.portion.label(),
            fmt_amount(line.price * line.quantity as f64)
        ));
        if let Some(serves) = line.serves.as_deref().filter(|s| !s.is_empty()) {
            message.push_str(&format!("   Serves: {serves}\n"));
        }
    }

    message.push_str(&format!("\n*Subtotal:* ₹{}\n", fmt_amount(subtotal)));
    if mode == OrderMode::Delivery {
        message.push_str(&format!("*Delivery Charge:* ₹{delivery_charge}\n"));
    }
    message.push_str(&format!("*Total:* ₹{}\n\nThank you!", fmt_amount(total)));

    Ok(message)
}

pub fn order_url(message: &str) -> String {
    format!(
        "https://wa.me/{ORDER_PHONE}?text={}",
        utf8_percent_encode(message, NON_ALPHANUMERIC)
    )
}

// Whole amounts print without a decimal point, as the shop expects.
fn fmt_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
