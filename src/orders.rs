//! Order-list state for the admin dashboard and tracking screens.
//!
//! The list itself is owned by the screen that fetched it; the live feed
//! only patches fields on records already in the list. Correctness comes
//! from running both paths: push events keep the list fresh between the
//! screen's periodic full re-fetches.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{OrderStatus, OrderSummary, PaymentStatus};

/// How often screens re-fetch the full order list as a fallback for
/// missed push events.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4 * 60);

/// Partial order fields carried by an `admin_order_updated` push event.
///
/// Every field is optional: the backend sends only what changed plus the
/// matching keys. Unknown fields in the payload are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdate {
    /// Backend record key of the order to patch.
    #[serde(rename = "_id")]
    pub id: Option<String>,
    /// Customer-facing order key, the alternate match field.
    pub order_id: Option<String>,
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub total: Option<f64>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    /// Decode an update from a push event's JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` when the payload is not an object of
    /// the expected shape (e.g. a malformed status string).
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }

    /// Whether this update targets the given order, by `_id` or
    /// `orderId`.
    fn matches(&self, order: &OrderSummary) -> bool {
        self.id.as_deref() == Some(order.id.as_str())
            || self.order_id.as_deref() == Some(order.order_id.as_str())
    }

    /// Shallow-merge this update's present fields onto an order (event
    /// fields win).
    fn merge_into(&self, order: &mut OrderSummary) {
        if let Some(table_number) = &self.table_number {
            order.table_number = table_number.clone();
        }
        if let Some(customer_name) = &self.customer_name {
            order.customer_name = customer_name.clone();
        }
        if let Some(customer_phone) = &self.customer_phone {
            order.customer_phone = customer_phone.clone();
        }
        if let Some(order_status) = self.order_status {
            order.order_status = order_status;
        }
        if let Some(payment_status) = self.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(total) = self.total {
            order.total = total;
        }
        if let Some(estimated_ready_at) = self.estimated_ready_at {
            order.estimated_ready_at = Some(estimated_ready_at);
        }
    }
}

/// Status/search filter for the order table.
#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    /// `None` shows all statuses.
    pub status: Option<OrderStatus>,
    /// Matches the order id (case-insensitive substring) or the customer
    /// phone (substring). Empty matches everything.
    pub query: String,
}

impl BoardFilter {
    fn matches(&self, order: &OrderSummary) -> bool {
        if let Some(status) = self.status
            && order.order_status != status
        {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        order
            .order_id
            .to_lowercase()
            .contains(&self.query.to_lowercase())
            || order.customer_phone.contains(&self.query)
    }
}

/// The order list held by an admin or tracking screen.
///
/// Membership is owned by the fetch path ([`absorb_fetch`](Self::absorb_fetch));
/// the push path ([`apply_update`](Self::apply_update)) only patches
/// existing records and drops events for unknown orders.
///
/// # Examples
///
/// Wiring a board to the live feed, the way the admin dashboard does:
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tableside::{
///     ADMIN_ORDER_UPDATED, FeedConfig, OrderBoard, OrderFeed, OrderUpdate, Session,
/// };
///
/// let feed = OrderFeed::new("http://127.0.0.1:4650", Session::new(), FeedConfig::default());
/// let board = Arc::new(Mutex::new(OrderBoard::new()));
///
/// let for_handler = Arc::clone(&board);
/// feed.on(ADMIN_ORDER_UPDATED, move |payload| {
///     if let Ok(update) = OrderUpdate::from_payload(payload) {
///         for_handler.lock().unwrap().apply_update(&update);
///     }
/// });
/// ```
#[derive(Debug, Default)]
pub struct OrderBoard {
    orders: Vec<OrderSummary>,
}

impl OrderBoard {
    /// An empty board, as a screen starts before its first fetch.
    pub fn new() -> Self {
        Self::default()
    }

    /// The held orders, in fetch order.
    pub fn orders(&self) -> &[OrderSummary] {
        &self.orders
    }

    /// Replace the held list with a poll response.
    ///
    /// Last write wins: a poll response that raced a push event can
    /// regress a status until the next event or poll. That gap is
    /// accepted — push and poll are redundant paths, not ordered ones.
    pub fn absorb_fetch(&mut self, orders: Vec<OrderSummary>) {
        self.orders = orders;
    }

    /// Reconcile a push event into the held list.
    ///
    /// Finds the order matching the update's `_id` or `orderId` and
    /// shallow-merges the update's fields onto it (event fields win).
    /// An update for an unknown order is dropped — the push path never
    /// inserts. Returns whether a record was patched.
    pub fn apply_update(&mut self, update: &OrderUpdate) -> bool {
        match self.orders.iter_mut().find(|order| update.matches(order)) {
            Some(order) => {
                update.merge_into(order);
                true
            }
            None => false,
        }
    }

    /// The orders passing a status/search filter, in held order.
    pub fn filtered(&self, filter: &BoardFilter) -> Vec<&OrderSummary> {
        self.orders
            .iter()
            .filter(|order| filter.matches(order))
            .collect()
    }

    /// True when no orders are held.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// What a customer typed into the track-order box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    /// Exactly ten digits: look up recent orders by phone.
    Phone(String),
    /// Anything else: treat as an order id.
    OrderId(String),
}

/// Classify a track-order input as a phone number or an order id.
pub fn classify_track_query(input: &str) -> TrackQuery {
    let trimmed = input.trim();
    if trimmed.len() == 10 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        TrackQuery::Phone(trimmed.to_string())
    } else {
        TrackQuery::OrderId(trimmed.to_string())
    }
}
