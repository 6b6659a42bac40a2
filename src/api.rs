//! Typed REST client for the ordering backend.
//!
//! One [`ApiClient`] per process, built by the composition root with a
//! shared [`Session`]. Requests ride on the cookie jar by default; when
//! a bearer token is installed in the session it is attached to every
//! request, and any 401 clears it before the error reaches the caller.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::analytics::{
    AnalyticsSummary, CategorySales, DailyOrdersPoint, DateRange, HourlyOrdersPoint,
    ProfitableItem, RepeatCustomers, TopItem, VegSplit,
};
use crate::error::ApiError;
use crate::menu::validate_seed_items;
use crate::model::{
    CheckoutRequest, CheckoutResponse, MenuItem, MenuItemPatch, Order, OrderSummary, SeedMenuItem,
    StatusPatch,
};
use crate::orders::TrackQuery;
use crate::reviews::{Review, ReviewFilter, ReviewFilterResponse, ReviewSubmission};
use crate::session::Session;

/// Envelope of `GET /menu`.
#[derive(Debug, Deserialize)]
struct MenuResponse {
    #[serde(default)]
    items: Vec<MenuItem>,
}

/// Envelope of `GET /orders/recent/:phone`.
#[derive(Debug, Deserialize)]
struct RecentOrdersResponse {
    #[serde(default)]
    orders: Vec<Order>,
}

/// Response of `POST /admin/menu/seed`.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedResponse {
    /// How many rows the backend inserted.
    #[serde(default)]
    pub inserted: u64,
    /// Names of the inserted items.
    #[serde(default)]
    pub items: Vec<String>,
}

/// Decode a list endpoint that may answer either `{ "<key>": [...] }`
/// or a bare array. Anything else decodes as an empty list.
fn list_from_value<T: DeserializeOwned>(
    value: serde_json::Value,
    key: &str,
) -> Result<Vec<T>, serde_json::Error> {
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Object(mut map) => match map.remove(key) {
            Some(list) => serde_json::from_value(list),
            None => Ok(Vec::new()),
        },
        _ => Ok(Vec::new()),
    }
}

/// Pull a human-readable failure message out of an error body.
///
/// The backend answers failures with `{ "message": ... }` or
/// `{ "error": ... }`; anything else falls back to the status line.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

/// Typed client for every REST endpoint the screens use.
///
/// `Clone` is cheap: the underlying connection pool and cookie jar are
/// shared, as is the [`Session`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Build a client against a base URL (e.g.
    /// `"https://host.example/api/v1"`), sharing the given session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// The session this client reports 401s to.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token (when set), send, and translate failure
    /// statuses. A 401 clears the session token before surfacing
    /// [`ApiError::Unauthorized`].
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.clear_token();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // --- Customer-facing endpoints ---

    /// `GET /menu` — the items the menu screen renders.
    pub async fn menu(&self) -> Result<Vec<MenuItem>, ApiError> {
        let response = self.send(self.http.get(self.url("/menu"))).await?;
        let envelope: MenuResponse = Self::decode(response).await?;
        Ok(envelope.items)
    }

    /// `POST /orders` — submit a checkout request; the backend answers
    /// with the new order's id.
    pub async fn place_order(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        let response = self
            .send(self.http.post(self.url("/orders")).json(request))
            .await?;
        Self::decode(response).await
    }

    /// `GET /orders/:orderId` — full order detail for tracking.
    pub async fn order(&self, order_id: &str) -> Result<Order, ApiError> {
        let response = self
            .send(self.http.get(self.url(&format!("/orders/{order_id}"))))
            .await?;
        Self::decode(response).await
    }

    /// `GET /orders/recent/:phone` — a customer's recent orders.
    pub async fn recent_orders(&self, phone: &str) -> Result<Vec<Order>, ApiError> {
        let response = self
            .send(self.http.get(self.url(&format!("/orders/recent/{phone}"))))
            .await?;
        let envelope: RecentOrdersResponse = Self::decode(response).await?;
        Ok(envelope.orders)
    }

    /// Resolve a track-order input: phone inputs load the recent-order
    /// list, anything else loads the single order.
    pub async fn track(&self, query: &TrackQuery) -> Result<Vec<Order>, ApiError> {
        match query {
            TrackQuery::Phone(phone) => self.recent_orders(phone).await,
            TrackQuery::OrderId(order_id) => Ok(vec![self.order(order_id).await?]),
        }
    }

    /// `POST /reviews` — submit the review form.
    pub async fn submit_review(&self, review: &ReviewSubmission) -> Result<(), ApiError> {
        self.send(self.http.post(self.url("/reviews")).json(review))
            .await?;
        Ok(())
    }

    // --- Admin endpoints ---

    /// `GET /orders` — the admin order board's list.
    pub async fn orders(&self) -> Result<Vec<OrderSummary>, ApiError> {
        let response = self.send(self.http.get(self.url("/orders"))).await?;
        let value: serde_json::Value = Self::decode(response).await?;
        Ok(list_from_value(value, "orders")?)
    }

    /// `DELETE /orders/:orderId`.
    pub async fn delete_order(&self, order_id: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(&format!("/orders/{order_id}"))))
            .await?;
        Ok(())
    }

    /// `PATCH /admin/orders/:orderId/status` — update status, payment
    /// status, and/or the ready estimate.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        patch: &StatusPatch,
    ) -> Result<(), ApiError> {
        self.send(
            self.http
                .patch(self.url(&format!("/admin/orders/{order_id}/status")))
                .json(patch),
        )
        .await?;
        Ok(())
    }

    /// `GET /admin/menu` — all items including unavailable ones.
    pub async fn admin_menu(&self) -> Result<Vec<MenuItem>, ApiError> {
        let response = self.send(self.http.get(self.url("/admin/menu"))).await?;
        let value: serde_json::Value = Self::decode(response).await?;
        Ok(list_from_value(value, "items")?)
    }

    /// `POST /admin/menu/seed` — bulk-insert menu items.
    ///
    /// Rows are validated locally first; an invalid upload is rejected
    /// with [`ApiError::Validation`] and never sent.
    pub async fn seed_menu(&self, items: &[SeedMenuItem]) -> Result<SeedResponse, ApiError> {
        validate_seed_items(items)?;
        let body = serde_json::json!({ "items": items });
        let response = self
            .send(self.http.post(self.url("/admin/menu/seed")).json(&body))
            .await?;
        Self::decode(response).await
    }

    /// `PATCH /admin/menu/:id` — apply a partial update built by
    /// [`diff_menu_item`](crate::menu::diff_menu_item).
    ///
    /// An empty patch is rejected with [`ApiError::Validation`] and
    /// never sent.
    pub async fn update_menu_item(
        &self,
        item_id: &str,
        patch: &MenuItemPatch,
    ) -> Result<(), ApiError> {
        if patch.is_empty() {
            return Err(ApiError::Validation("no changes detected".to_string()));
        }
        self.send(
            self.http
                .patch(self.url(&format!("/admin/menu/{item_id}")))
                .json(patch),
        )
        .await?;
        Ok(())
    }

    /// `DELETE /admin/menu/:id`.
    pub async fn delete_menu_item(&self, item_id: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(&format!("/admin/menu/{item_id}"))))
            .await?;
        Ok(())
    }

    /// `GET /reviews` — every stored review.
    pub async fn reviews(&self) -> Result<Vec<Review>, ApiError> {
        let response = self.send(self.http.get(self.url("/reviews"))).await?;
        let value: serde_json::Value = Self::decode(response).await?;
        Ok(list_from_value(value, "reviews")?)
    }

    /// `GET /reviews/filter` — reviews narrowed by rating/date filters.
    pub async fn filter_reviews(
        &self,
        filter: &ReviewFilter,
    ) -> Result<ReviewFilterResponse, ApiError> {
        let response = self
            .send(
                self.http
                    .get(self.url("/reviews/filter"))
                    .query(&filter.query_pairs()),
            )
            .await?;
        Self::decode(response).await
    }

    /// `POST /admin/logout` — end the admin session.
    ///
    /// The local bearer token is cleared whether or not the request
    /// succeeds, matching the screens' behavior of returning to the
    /// login page either way.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.send(self.http.post(self.url("/admin/logout"))).await;
        self.session.clear_token();
        result.map(|_| ())
    }

    // --- Analytics ---

    /// `GET /admin/analytics/summary`.
    pub async fn analytics_summary(&self, range: &DateRange) -> Result<AnalyticsSummary, ApiError> {
        self.get_analytics("/admin/analytics/summary", range).await
    }

    /// `GET /admin/analytics/orders/daily`.
    pub async fn daily_orders(&self, range: &DateRange) -> Result<Vec<DailyOrdersPoint>, ApiError> {
        self.get_analytics("/admin/analytics/orders/daily", range)
            .await
    }

    /// `GET /admin/analytics/orders/hourly` for one day (`YYYY-MM-DD`).
    pub async fn hourly_orders(&self, date: &str) -> Result<Vec<HourlyOrdersPoint>, ApiError> {
        let response = self
            .send(
                self.http
                    .get(self.url("/admin/analytics/orders/hourly"))
                    .query(&[("date", date)]),
            )
            .await?;
        Self::decode(response).await
    }

    /// `GET /admin/analytics/veg-vs-nonveg`.
    pub async fn veg_split(&self, range: &DateRange) -> Result<VegSplit, ApiError> {
        self.get_analytics("/admin/analytics/veg-vs-nonveg", range)
            .await
    }

    /// `GET /admin/analytics/items/top`.
    pub async fn top_items(&self, range: &DateRange) -> Result<Vec<TopItem>, ApiError> {
        self.get_analytics("/admin/analytics/items/top", range).await
    }

    /// `GET /admin/analytics/sales/category`.
    pub async fn category_sales(&self, range: &DateRange) -> Result<Vec<CategorySales>, ApiError> {
        self.get_analytics("/admin/analytics/sales/category", range)
            .await
    }

    /// `GET /admin/analytics/customers/repeat`.
    pub async fn repeat_customers(&self, range: &DateRange) -> Result<RepeatCustomers, ApiError> {
        self.get_analytics("/admin/analytics/customers/repeat", range)
            .await
    }

    /// `GET /admin/analytics/items/profitable`.
    pub async fn profitable_items(&self, range: &DateRange) -> Result<Vec<ProfitableItem>, ApiError> {
        self.get_analytics("/admin/analytics/items/profitable", range)
            .await
    }

    async fn get_analytics<T: DeserializeOwned>(
        &self,
        path: &str,
        range: &DateRange,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.http.get(self.url(path)).query(&range.query_pairs()))
            .await?;
        Self::decode(response).await
    }
}
