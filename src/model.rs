//! Wire and domain types shared across the client.
//!
//! Everything here mirrors the backend's JSON contract: field names are
//! camelCase on the wire, Mongo-style record keys travel as `_id`, and
//! optional fields decode leniently so a sparse payload never fails a
//! whole response.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;

/// Round a currency amount to the cent.
///
/// Prices are plain `f64`s on the wire; every derived amount (line
/// totals, cart totals) is rounded through this before display or
/// comparison.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Kitchen/service progress of an order.
///
/// The variants are ordered; normal operation only ever moves forward.
/// The derived `Ord` drives step rendering: a tracking step is complete
/// iff its index is at most the current status's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Received,
    Preparing,
    Ready,
    Served,
    Completed,
}

impl OrderStatus {
    /// All statuses in progression order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Received,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Completed,
    ];

    /// Zero-based position in the progression.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire/display name (`"received"`, `"preparing"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
        }
    }
}

/// Payment progress, independent of [`OrderStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
}

/// One rendered step of the order-tracking progress strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStep {
    /// The status this step represents.
    pub status: OrderStatus,
    /// Whether the order has reached (or passed) this step.
    pub complete: bool,
    /// Whether this is the order's current step.
    pub current: bool,
}

/// Compute the tracking steps for an order at `current` status.
///
/// A step is complete if its index is at most the current index; exactly
/// one step (the current status) is also marked `current`.
pub fn status_steps(current: OrderStatus) -> Vec<StatusStep> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusStep {
            status,
            complete: status.index() <= current.index(),
            current: status == current,
        })
        .collect()
}

/// Build an `estimatedReadyAt` timestamp from a "ready in N minutes"
/// input, the form the admin dashboard collects.
pub fn eta_in_minutes(minutes: i64) -> DateTime<Utc> {
    Utc::now() + Duration::minutes(minutes)
}

/// Category reference embedded in a menu item (`categoryId` on the wire,
/// populated with its display name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub name: String,
}

/// A menu item as served by `GET /menu` and `GET /admin/menu`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Backend record key.
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub veg: bool,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default, rename = "categoryId")]
    pub category: Option<MenuCategory>,
    #[serde(default)]
    pub is_chefs_special: bool,
    #[serde(default)]
    pub is_all_time_favorite: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub avg_rating: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// One row of a bulk menu upload (`POST /admin/menu/seed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub veg: bool,
    pub category: String,
    #[serde(default)]
    pub is_chefs_special: bool,
    #[serde(default)]
    pub is_all_time_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Partial update for `PATCH /admin/menu/:id`.
///
/// Only changed fields are serialized; an all-`None` patch means "no
/// changes" and is rejected before submission. Built by
/// [`diff_menu_item`](crate::menu::diff_menu_item).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_chefs_special: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_all_time_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MenuItemPatch {
    /// True when no field is set, i.e. the edit form matches the
    /// original item.
    pub fn is_empty(&self) -> bool {
        *self == MenuItemPatch::default()
    }
}

/// An order as held by the admin dashboard and tracking screens.
///
/// Owned by the screen that fetched it; the live feed only patches
/// fields on a matching record (see
/// [`OrderBoard::apply_update`](crate::OrderBoard::apply_update)).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Backend record key.
    #[serde(rename = "_id")]
    pub id: String,
    /// Stable customer-facing order key.
    pub order_id: String,
    pub table_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

/// A line of a placed order, as returned by the order endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Full order detail (`GET /orders/:orderId`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub summary: OrderSummary,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
}

/// One line of a checkout request, copied from a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub menu_item_id: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Order-creation request (`POST /orders`).
///
/// Totals and tax are the backend's concern; the client submits the
/// lines as the shopper built them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub table_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<CheckoutItem>,
    /// Client-generated idempotency key, so a retried submission cannot
    /// create a second order.
    pub client_request_id: String,
}

impl CheckoutRequest {
    /// Build a checkout request from a cart and the customer details
    /// collected by the checkout form. Generates a fresh idempotency key.
    pub fn from_cart(cart: &Cart, customer_name: &str, customer_phone: &str) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|line| CheckoutItem {
                menu_item_id: line.menu_item_id.clone(),
                name: line.name.clone(),
                price: line.price,
                qty: line.qty,
                notes: line.notes.clone(),
            })
            .collect();
        Self {
            table_number: cart.table().to_string(),
            customer_name: customer_name.to_string(),
            customer_phone: customer_phone.to_string(),
            items,
            client_request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Response to a checkout submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: String,
}

/// Partial status update for `PATCH /admin/orders/:orderId/status`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_ready_at: Option<DateTime<Utc>>,
}
