//! Per-table shopping carts with durable, table-keyed persistence.
//!
//! Carts are stored as JSON files at `<base_dir>/carts/<table>/cart.json`.
//! Writes are atomic via a temp-rename pattern to prevent corruption from
//! crashes mid-write; loads are lenient so a missing or corrupt file is a
//! fresh empty cart, never an error. Persistence is best-effort by
//! design: a failed write is logged and the in-memory mutation stands.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::round_money;

/// One line of a cart, keyed by the menu item it refers to.
///
/// The cart holds at most one line per `menu_item_id`; adding the same
/// item again merges into the existing line (see [`Cart::add_item`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub menu_item_id: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub veg: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartLine {
    /// This line's contribution to the cart total, rounded to the cent.
    pub fn line_total(&self) -> f64 {
        round_money(self.price * f64::from(self.qty))
    }
}

/// Partial update for a cart line, applied by [`Cart::update_item`].
#[derive(Debug, Clone, Default)]
pub struct CartLinePatch {
    /// New quantity. Values below 1 are clamped to 1 — removal is an
    /// explicit [`Cart::remove_item`] call, not a quantity update.
    pub qty: Option<u32>,
    /// New notes text. `None` leaves the existing notes alone.
    pub notes: Option<String>,
}

/// Persisted shape of a cart file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CartSnapshot {
    lines: Vec<CartLine>,
}

/// Opens per-table [`Cart`]s rooted at a base directory.
///
/// The store itself holds no cart state; each [`cart`](CartStore::cart)
/// call loads that table's persisted lines from disk, so two tables
/// never share state and a reopened table restores exactly what was
/// last persisted.
#[derive(Debug, Clone)]
pub struct CartStore {
    base_dir: PathBuf,
}

impl CartStore {
    /// Create a store rooted at `base_dir`.
    ///
    /// The directory does not need to exist yet; it is created lazily on
    /// the first persisted write.
    pub fn open(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load the cart for a table identifier, creating an empty one if no
    /// cart has been persisted for that table yet.
    pub fn cart(&self, table: &str) -> Cart {
        let path = self.cart_path(table);
        let lines = load_lines(&path);
        Cart {
            table: table.to_owned(),
            path,
            lines,
        }
    }

    /// Lists all table identifiers with a persisted cart, sorted.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if reading the carts directory fails for a
    /// reason other than it not existing.
    pub fn list_tables(&self) -> io::Result<Vec<String>> {
        let carts_dir = self.base_dir.join("carts");
        let entries = match fs::read_dir(&carts_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut tables: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                entry
                    .file_type()
                    .ok()?
                    .is_dir()
                    .then(|| entry.file_name().to_string_lossy().into_owned())
            })
            .collect();

        tables.sort();
        Ok(tables)
    }

    /// Path of the persisted cart file for a table.
    fn cart_path(&self, table: &str) -> PathBuf {
        self.base_dir.join("carts").join(table).join("cart.json")
    }
}

/// Read persisted cart lines, treating missing or corrupt files as an
/// empty cart.
fn load_lines(path: &Path) -> Vec<CartLine> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read persisted cart; starting empty"
            );
            return Vec::new();
        }
    };

    match serde_json::from_slice::<CartSnapshot>(&bytes) {
        Ok(snapshot) => snapshot.lines,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "corrupt cart file; starting empty"
            );
            Vec::new()
        }
    }
}

/// A single shopper's in-progress order for one table.
///
/// The single source of truth for the Menu and Checkout screens. All
/// mutations persist the updated cart before returning; persistence
/// failures are logged and never surface to the caller, so the
/// in-memory state always reflects what the shopper did.
#[derive(Debug)]
pub struct Cart {
    table: String,
    path: PathBuf,
    lines: Vec<CartLine>,
}

impl Cart {
    /// The table identifier this cart is scoped to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Current lines in insertion order (the display order).
    pub fn items(&self) -> &[CartLine] {
        &self.lines
    }

    /// True when the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `price * qty` over all lines, rounded to the cent.
    /// Recomputed on every call; an empty cart totals 0.
    pub fn total(&self) -> f64 {
        round_money(
            self.lines
                .iter()
                .map(|line| line.price * f64::from(line.qty))
                .sum(),
        )
    }

    /// Sum of quantities over all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.qty).sum()
    }

    /// Add a line to the cart, merging with an existing line for the
    /// same menu item.
    ///
    /// On merge the quantities are summed and the incoming notes win
    /// when present (`None` leaves the existing notes alone). A
    /// quantity below 1 is clamped to 1. Cannot fail.
    pub fn add_item(&mut self, mut line: CartLine) {
        line.qty = line.qty.max(1);

        match self
            .lines
            .iter_mut()
            .find(|existing| existing.menu_item_id == line.menu_item_id)
        {
            Some(existing) => {
                existing.qty += line.qty;
                if line.notes.is_some() {
                    existing.notes = line.notes;
                }
            }
            None => self.lines.push(line),
        }

        self.persist();
    }

    /// Apply a partial update to the line for `menu_item_id`.
    ///
    /// No-op when the item is not in the cart. A quantity below 1 is
    /// clamped to 1; dropping a line is [`remove_item`](Cart::remove_item),
    /// which the caller invokes instead when the shopper zeroes a line.
    pub fn update_item(&mut self, menu_item_id: &str, patch: CartLinePatch) {
        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.menu_item_id == menu_item_id)
        else {
            return;
        };

        if let Some(qty) = patch.qty {
            line.qty = qty.max(1);
        }
        if let Some(notes) = patch.notes {
            line.notes = Some(notes);
        }

        self.persist();
    }

    /// Remove the line for `menu_item_id`. No-op when absent.
    pub fn remove_item(&mut self, menu_item_id: &str) {
        let before = self.lines.len();
        self.lines.retain(|line| line.menu_item_id != menu_item_id);
        if self.lines.len() != before {
            self.persist();
        }
    }

    /// Empty the cart for this table. Called on checkout completion or
    /// an explicit user clear — carts never expire on their own.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.persist();
    }

    /// Persist the current lines atomically (write temp file, rename).
    ///
    /// Best-effort: failures are logged and swallowed so the in-memory
    /// mutation that triggered the write always takes effect.
    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            tracing::warn!(
                table = %self.table,
                path = %self.path.display(),
                error = %e,
                "failed to persist cart; in-memory state unaffected"
            );
        }
    }

    fn try_persist(&self) -> io::Result<()> {
        let dir = self
            .path
            .parent()
            .expect("cart path always has a parent directory");
        fs::create_dir_all(dir)?;

        let snapshot = CartSnapshot {
            lines: self.lines.clone(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn line(id: &str, price: f64, qty: u32) -> CartLine {
        CartLine {
            menu_item_id: id.to_string(),
            name: format!("item {id}"),
            price,
            qty,
            notes: None,
            veg: false,
            image_url: None,
        }
    }

    #[test]
    fn add_same_item_merges_quantities() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 120.0, 2));
        cart.add_item(line("m1", 120.0, 3));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 5);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn add_clamps_zero_quantity_to_one() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 50.0, 0));
        assert_eq!(cart.items()[0].qty, 1);
    }

    #[test]
    fn merge_notes_last_write_wins_when_present() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        let mut first = line("m1", 50.0, 1);
        first.notes = Some("no onions".to_string());
        cart.add_item(first);

        let mut second = line("m1", 50.0, 1);
        second.notes = Some("extra spicy".to_string());
        cart.add_item(second);
        assert_eq!(cart.items()[0].notes.as_deref(), Some("extra spicy"));

        // A later add with no notes leaves the existing notes alone.
        cart.add_item(line("m1", 50.0, 1));
        assert_eq!(cart.items()[0].notes.as_deref(), Some("extra spicy"));
    }

    #[test]
    fn update_item_changes_quantity() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 50.0, 2));
        cart.update_item(
            "m1",
            CartLinePatch {
                qty: Some(7),
                notes: None,
            },
        );
        assert_eq!(cart.items()[0].qty, 7);
    }

    #[test]
    fn update_item_clamps_zero_to_one() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 50.0, 2));
        cart.update_item(
            "m1",
            CartLinePatch {
                qty: Some(0),
                notes: None,
            },
        );
        assert_eq!(cart.items()[0].qty, 1);
    }

    #[test]
    fn update_unknown_item_is_noop() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 50.0, 2));
        cart.update_item(
            "missing",
            CartLinePatch {
                qty: Some(9),
                notes: None,
            },
        );
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 2);
    }

    #[test]
    fn remove_unknown_item_is_noop() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m1", 50.0, 2));
        cart.remove_item("missing");
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn remove_then_re_add_matches_never_removed() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        // Cart A: add, remove, re-add to quantity 3.
        let mut a = store.cart("a");
        a.add_item(line("m1", 50.0, 2));
        a.remove_item("m1");
        a.add_item(line("m1", 50.0, 3));

        // Cart B: the item was never removed, same final quantity.
        let mut b = store.cart("b");
        b.add_item(line("m1", 50.0, 3));

        assert_eq!(a.items(), b.items());
    }

    #[test]
    fn total_matches_sum_to_the_cent() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        assert_eq!(cart.total(), 0.0);

        cart.add_item(line("m1", 10.10, 3));
        cart.add_item(line("m2", 0.2, 1));
        assert_eq!(cart.total(), 30.5);

        cart.update_item(
            "m1",
            CartLinePatch {
                qty: Some(1),
                notes: None,
            },
        );
        assert_eq!(cart.total(), 10.3);

        cart.remove_item("m2");
        assert_eq!(cart.total(), 10.1);
    }

    #[test]
    fn line_total_rounds_to_cents() {
        let l = line("m1", 33.335, 2);
        assert_eq!(l.line_total(), 66.67);
    }

    #[test]
    fn reload_restores_persisted_cart() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        {
            let mut cart = store.cart("12");
            cart.add_item(line("m1", 120.0, 2));
            let mut with_notes = line("m2", 80.0, 1);
            with_notes.notes = Some("less salt".to_string());
            cart.add_item(with_notes);
        }

        // A fresh handle simulates a page reload.
        let reloaded = store.cart("12");
        assert_eq!(reloaded.items().len(), 2);
        assert_eq!(reloaded.items()[0].menu_item_id, "m1");
        assert_eq!(reloaded.items()[0].qty, 2);
        assert_eq!(reloaded.items()[1].notes.as_deref(), Some("less salt"));
        assert_eq!(reloaded.total(), 320.0);
    }

    #[test]
    fn tables_do_not_share_state() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        let mut twelve = store.cart("12");
        twelve.add_item(line("m1", 100.0, 1));

        let mut seven = store.cart("7");
        seven.add_item(line("m9", 60.0, 4));
        seven.clear();

        let twelve_again = store.cart("12");
        assert_eq!(twelve_again.items().len(), 1);
        assert_eq!(twelve_again.items()[0].menu_item_id, "m1");

        let seven_again = store.cart("7");
        assert!(seven_again.is_empty());
    }

    #[test]
    fn clear_empties_and_persists() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        let mut cart = store.cart("12");
        cart.add_item(line("m1", 100.0, 1));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0.0);

        assert!(store.cart("12").is_empty());
    }

    #[test]
    fn corrupt_cart_file_loads_empty() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        let path = tmp.path().join("carts/12/cart.json");
        fs::create_dir_all(path.parent().unwrap()).expect("create dir");
        fs::write(&path, b"definitely not json").expect("write corrupt file");

        let cart = store.cart("12");
        assert!(cart.is_empty());
    }

    #[test]
    fn insertion_order_preserved_for_display() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        let mut cart = store.cart("12");

        cart.add_item(line("m3", 10.0, 1));
        cart.add_item(line("m1", 10.0, 1));
        cart.add_item(line("m2", 10.0, 1));
        // Merging does not move a line.
        cart.add_item(line("m1", 10.0, 1));

        let ids: Vec<&str> = cart
            .items()
            .iter()
            .map(|l| l.menu_item_id.as_str())
            .collect();
        assert_eq!(ids, vec!["m3", "m1", "m2"]);
    }

    #[test]
    fn list_tables_sorted() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        store.cart("9").add_item(line("m1", 10.0, 1));
        store.cart("12").add_item(line("m1", 10.0, 1));
        store.cart("3").add_item(line("m1", 10.0, 1));

        let tables = store.list_tables().expect("list should succeed");
        assert_eq!(tables, vec!["12", "3", "9"]);
    }

    #[test]
    fn list_tables_empty_when_nothing_persisted() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());
        assert!(store.list_tables().expect("list").is_empty());
    }

    #[test]
    fn persist_uses_atomic_temp_rename() {
        let tmp = TempDir::new().expect("temp dir");
        let store = CartStore::open(tmp.path());

        let mut cart = store.cart("12");
        cart.add_item(line("m1", 10.0, 1));

        let final_path = tmp.path().join("carts/12/cart.json");
        let tmp_path = final_path.with_extension("json.tmp");
        assert!(final_path.exists(), "cart file should exist");
        assert!(
            !tmp_path.exists(),
            "temp file should not exist after successful save"
        );
    }
}
