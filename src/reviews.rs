//! Review submission, filtering, and CSV export.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer's rating of one ordered item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A stored review as returned by `GET /reviews`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub item_reviews: Vec<ItemReview>,
    #[serde(default)]
    pub staff_rating: Option<u8>,
    #[serde(default)]
    pub ambience_rating: Option<u8>,
    #[serde(default)]
    pub overall_rating: Option<u8>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub suggestions: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review-form payload for `POST /reviews`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub order_id: String,
    pub item_reviews: Vec<ItemReview>,
    pub staff_rating: u8,
    pub ambience_rating: u8,
    pub overall_rating: u8,
    pub experience: String,
    pub suggestions: String,
}

/// Which rating column a review filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingType {
    Staff,
    Ambience,
    Overall,
}

impl RatingType {
    /// Wire name of the rating column (`staffRating`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            RatingType::Staff => "staffRating",
            RatingType::Ambience => "ambienceRating",
            RatingType::Overall => "overallRating",
        }
    }
}

/// Query for `GET /reviews/filter`. Only set fields become query
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub rating_type: Option<RatingType>,
    pub rating: Option<u8>,
    /// Day of month, 1-31.
    pub day: Option<u8>,
    /// Month, 1-12.
    pub month: Option<u8>,
}

impl ReviewFilter {
    /// The query pairs to send, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(rating_type) = self.rating_type {
            pairs.push(("ratingType", rating_type.as_str().to_string()));
        }
        if let Some(rating) = self.rating {
            pairs.push(("rating", rating.to_string()));
        }
        if let Some(day) = self.day {
            pairs.push(("day", day.to_string()));
        }
        if let Some(month) = self.month {
            pairs.push(("month", month.to_string()));
        }
        pairs
    }
}

/// Response shape of `GET /reviews/filter`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilterResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub filters_applied: Option<HashMap<String, String>>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// CSV column headers of the export, in order.
const CSV_HEADERS: [&str; 10] = [
    "Order ID",
    "Customer Name",
    "Customer Phone",
    "Item Reviews",
    "Staff Rating",
    "Ambience Rating",
    "Overall Rating",
    "Experience",
    "Suggestions",
    "Created At",
];

/// Render a review list as CSV for the admin export button.
///
/// Item reviews collapse into one column, each as
/// `name (rating) - comment` joined by ` || `; a missing rating renders
/// as `-`. Fields containing commas, quotes, or newlines are quoted
/// with embedded quotes doubled. Returns just the header line for an
/// empty list.
pub fn reviews_to_csv(reviews: &[Review]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');

    for review in reviews {
        let items = review
            .item_reviews
            .iter()
            .map(|item| {
                format!(
                    "{} ({}) - {}",
                    item.name.as_deref().unwrap_or(""),
                    item.rating
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    item.comment.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join(" || ");

        let rating = |r: Option<u8>| r.map(|v| v.to_string()).unwrap_or_default();
        let fields = [
            review.order_id.clone(),
            review.customer_name.clone().unwrap_or_default(),
            review.customer_phone.clone().unwrap_or_default(),
            items,
            rating(review.staff_rating),
            rating(review.ambience_rating),
            rating(review.overall_rating),
            review.experience.clone().unwrap_or_default(),
            review.suggestions.clone().unwrap_or_default(),
            review.created_at.to_rfc3339(),
        ];

        let row = fields
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }

    out
}

/// Quote a CSV field when needed, doubling embedded quotes.
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
