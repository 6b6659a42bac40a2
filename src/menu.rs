//! Menu browsing and admin menu-management rules.
//!
//! Pure functions over [`MenuItem`]s: the customer-facing filter
//! pipeline and category grouping, and the admin-side bulk-upload
//! validation and partial-update diffing. No I/O here; the
//! [`ApiClient`](crate::ApiClient) calls into this before submitting.

use crate::error::ApiError;
use crate::model::{MenuItem, MenuItemPatch, SeedMenuItem};

/// Category name used for items without a category.
const UNCATEGORIZED: &str = "Other";

/// Veg/non-veg toggle of the menu screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VegFilter {
    #[default]
    All,
    VegOnly,
    NonVegOnly,
}

/// Speciality-label toggle of the menu screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelFilter {
    #[default]
    All,
    ChefsSpecial,
    AllTimeFavorite,
}

/// The menu screen's combined filter state.
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    /// Free-text search over name and description, case-insensitive.
    /// Empty matches everything.
    pub query: String,
    pub veg: VegFilter,
    /// `None` shows all categories; `Some` matches the category's
    /// display name exactly.
    pub category: Option<String>,
    pub label: LabelFilter,
}

impl MenuFilter {
    /// Whether a single item passes every active filter.
    pub fn matches(&self, item: &MenuItem) -> bool {
        if !self.query.is_empty() {
            let query = self.query.to_lowercase();
            let name_hit = item.name.to_lowercase().contains(&query);
            let description_hit = item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query));
            if !name_hit && !description_hit {
                return false;
            }
        }

        match self.veg {
            VegFilter::All => {}
            VegFilter::VegOnly if !item.veg => return false,
            VegFilter::NonVegOnly if item.veg => return false,
            _ => {}
        }

        if let Some(category) = &self.category
            && item.category.as_ref().map(|c| c.name.as_str()) != Some(category.as_str())
        {
            return false;
        }

        match self.label {
            LabelFilter::All => {}
            LabelFilter::ChefsSpecial if !item.is_chefs_special => return false,
            LabelFilter::AllTimeFavorite if !item.is_all_time_favorite => return false,
            _ => {}
        }

        true
    }
}

/// The items passing a filter, in menu order.
pub fn filter_items<'a>(items: &'a [MenuItem], filter: &MenuFilter) -> Vec<&'a MenuItem> {
    items.iter().filter(|item| filter.matches(item)).collect()
}

/// Distinct category names in first-seen order, for the category
/// dropdown. Items without a category contribute nothing.
pub fn categories(items: &[MenuItem]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if let Some(category) = &item.category
            && !seen.iter().any(|existing: &String| existing == &category.name)
        {
            seen.push(category.name.clone());
        }
    }
    seen
}

/// Group items by category name for sectioned rendering.
///
/// Categories appear in first-seen order; items without a category land
/// in an `"Other"` group. Items keep their relative order within each
/// group.
pub fn categorize<'a>(items: &'a [MenuItem]) -> Vec<(String, Vec<&'a MenuItem>)> {
    let mut groups: Vec<(String, Vec<&'a MenuItem>)> = Vec::new();
    for item in items {
        let name = item
            .category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(UNCATEGORIZED);
        match groups.iter_mut().find(|(group, _)| group == name) {
            Some((_, members)) => members.push(item),
            None => groups.push((name.to_string(), vec![item])),
        }
    }
    groups
}

/// Validate a bulk menu upload before submission.
///
/// Every row needs a non-empty name, a non-empty description, and a
/// price greater than zero; an empty upload is rejected outright. On
/// failure the request is never sent.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] naming the first offending row.
pub fn validate_seed_items(items: &[SeedMenuItem]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::Validation(
            "at least one item is required".to_string(),
        ));
    }

    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() || item.description.trim().is_empty() || item.price <= 0.0 {
            return Err(ApiError::Validation(format!(
                "item {}: name, description and a price greater than 0 are required",
                index + 1
            )));
        }
    }
    Ok(())
}

/// The admin edit form's state for one menu item.
#[derive(Debug, Clone, Default)]
pub struct MenuItemForm {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub veg: bool,
    pub available: bool,
    pub is_chefs_special: bool,
    pub is_all_time_favorite: bool,
    /// Category display name; empty means "leave unchanged".
    pub category: String,
    /// Replacement image URL; empty means "leave unchanged".
    pub image_url: String,
}

impl MenuItemForm {
    /// Pre-fill the form from an existing item, the state the edit
    /// dialog opens with.
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone().unwrap_or_default(),
            price: item.price,
            veg: item.veg,
            available: item.available,
            is_chefs_special: item.is_chefs_special,
            is_all_time_favorite: item.is_all_time_favorite,
            category: item
                .category
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            image_url: String::new(),
        }
    }
}

/// Build a partial update containing only the fields the form changed.
///
/// The category is included only when the form sets a non-empty name
/// that differs from the item's current category; a non-empty image URL
/// is always included (the form never shows the current one). An
/// unchanged form produces an empty patch, which
/// [`ApiClient::update_menu_item`](crate::ApiClient::update_menu_item)
/// rejects as "no changes".
pub fn diff_menu_item(original: &MenuItem, form: &MenuItemForm) -> MenuItemPatch {
    let mut patch = MenuItemPatch::default();

    if form.name != original.name {
        patch.name = Some(form.name.clone());
    }
    if form.description != original.description.clone().unwrap_or_default() {
        patch.description = Some(form.description.clone());
    }
    if form.price != original.price {
        patch.price = Some(form.price);
    }
    if form.veg != original.veg {
        patch.veg = Some(form.veg);
    }
    if form.available != original.available {
        patch.available = Some(form.available);
    }
    if form.is_chefs_special != original.is_chefs_special {
        patch.is_chefs_special = Some(form.is_chefs_special);
    }
    if form.is_all_time_favorite != original.is_all_time_favorite {
        patch.is_all_time_favorite = Some(form.is_all_time_favorite);
    }

    let original_category = original.category.as_ref().map(|c| c.name.as_str());
    if !form.category.is_empty() && original_category != Some(form.category.as_str()) {
        patch.category = Some(form.category.clone());
    }
    if !form.image_url.is_empty() {
        patch.image_url = Some(form.image_url.clone());
    }

    patch
}
