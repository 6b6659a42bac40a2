//! Headless client core for a QR table-ordering app.
//!
//! Customers scan a table QR, browse the menu, build a cart, check out,
//! and track their order; staff manage orders and the menu from an
//! admin surface. This crate provides everything those screens drive:
//! the per-table [`CartStore`], the process-wide [`OrderFeed`] push
//! channel, the REST [`ApiClient`], and the pure state rules (menu
//! filtering, order-board reconciliation, review CSV export). Rendering
//! is someone else's job.

mod analytics;
pub use analytics::{
    AnalyticsSummary, CategorySales, DailyOrdersPoint, DateRange, HourlyOrdersPoint,
    ProfitableItem, RepeatCustomers, TopItem, VegSplit,
};
mod api;
pub use api::{ApiClient, SeedResponse};
mod cart;
pub use cart::{Cart, CartLine, CartLinePatch, CartStore};
mod client;
pub use client::EventsClient;
mod context;
pub use context::{AppContext, AppContextBuilder};
mod error;
pub use error::ApiError;
mod live;
pub use live::{ADMIN_ORDER_UPDATED, FeedConfig, HandlerId, OrderFeed};
mod menu;
pub use menu::{
    LabelFilter, MenuFilter, MenuItemForm, VegFilter, categories, categorize, diff_menu_item,
    filter_items, validate_seed_items,
};
mod model;
pub use model::{
    CheckoutItem, CheckoutRequest, CheckoutResponse, MenuCategory, MenuItem, MenuItemPatch, Order,
    OrderItem, OrderStatus, OrderSummary, PaymentStatus, SeedMenuItem, StatusPatch, StatusStep,
    eta_in_minutes, round_money, status_steps,
};
mod orders;
pub use orders::{
    BoardFilter, DEFAULT_POLL_INTERVAL, OrderBoard, OrderUpdate, TrackQuery, classify_track_query,
};
mod reviews;
pub use reviews::{
    ItemReview, RatingType, Review, ReviewFilter, ReviewFilterResponse, ReviewSubmission,
    reviews_to_csv,
};
mod session;
pub use session::Session;

/// Generated gRPC types for the event channel.
pub mod proto {
    tonic::include_proto!("tableside");
}
