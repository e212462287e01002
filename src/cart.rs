//! In-memory cart state for the point-of-sale screen.
//!
//! The cart holds transient lines only; nothing persists until the sale is
//! submitted through [`crate::api::ApiClient::create_sale`], after which the
//! host clears the cart. Stock ceilings come from the catalog snapshot the
//! host last fetched; the cart never mutates inventory itself.

use serde::{Deserialize, Serialize};

use crate::models::{InventoryItem, NewSale, SaleItem};
use crate::pricing::{price_cart, Discount, PricingError, PricingResult};

/// One product entry in the active, unsaved cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub category: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshot a catalog item into a new line with quantity 1. The price is
    /// frozen at this moment; later catalog refreshes do not touch the cart.
    fn from_item(item: &InventoryItem) -> Self {
        CartLine {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            unit_price: item.price,
            quantity: 1,
        }
    }

    pub fn line_subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Bounded most-recently-added list for the quick re-add strip.
///
/// Insertion de-duplicates and moves an existing id to the front; the list
/// never exceeds its cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentItems {
    ids: Vec<String>,
    cap: usize,
}

impl RecentItems {
    pub fn new(cap: usize) -> Self {
        RecentItems {
            ids: Vec::new(),
            cap,
        }
    }

    pub fn push(&mut self, id: &str) {
        self.ids.retain(|existing| existing != id);
        self.ids.insert(0, id.to_string());
        self.ids.truncate(self.cap);
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// The active cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    recent: RecentItems,
}

impl Cart {
    /// Create an empty cart. `recent_cap` bounds the quick re-add list
    /// (see [`crate::config::PosConfig::recent_items_cap`]).
    pub fn new(recent_cap: usize) -> Self {
        Cart {
            lines: Vec::new(),
            recent: RecentItems::new(recent_cap),
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn recent_items(&self) -> &[String] {
        self.recent.ids()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Add one unit of a catalog item.
    ///
    /// Out-of-stock items are ignored. When the item is already in the cart
    /// the quantity grows only while it is below the item's stock (silently
    /// capped); otherwise a new line with quantity 1 is inserted. Every
    /// attempt on an in-stock item refreshes the recency list.
    pub fn add_item(&mut self, item: &InventoryItem) {
        if item.stock <= 0 {
            return;
        }

        match self.lines.iter_mut().find(|l| l.id == item.id) {
            Some(line) => {
                if i64::from(line.quantity) < item.stock {
                    line.quantity += 1;
                }
            }
            None => self.lines.push(CartLine::from_item(item)),
        }

        self.recent.push(&item.id);
    }

    /// Adjust a line's quantity by `delta`.
    ///
    /// A result of zero or less removes the line. A result above the item's
    /// current stock in `catalog` rejects the update (quantity unchanged,
    /// not clamped); an item missing from `catalog` counts as stock 0.
    pub fn update_quantity(&mut self, item_id: &str, delta: i32, catalog: &[InventoryItem]) {
        let Some(index) = self.lines.iter().position(|l| l.id == item_id) else {
            return;
        };

        let new_quantity = i64::from(self.lines[index].quantity) + i64::from(delta);
        if new_quantity <= 0 {
            self.lines.remove(index);
            return;
        }

        let max_stock = catalog
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.stock)
            .unwrap_or(0);
        if new_quantity > max_stock {
            return;
        }

        self.lines[index].quantity = new_quantity as u32;
    }

    /// Remove a line unconditionally.
    pub fn remove_item(&mut self, item_id: &str) {
        self.lines.retain(|l| l.id != item_id);
    }

    /// Empty the cart (after a successful sale submission or an explicit
    /// cancel). The recency list survives: it tracks the session, not the
    /// transaction.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Price the current contents. See [`crate::pricing::price_cart`].
    pub fn price(&self, discount: Discount, tax_rate: f64) -> Result<PricingResult, PricingError> {
        price_cart(&self.lines, discount, tax_rate)
    }

    /// Build the sale submission payload from the current contents.
    ///
    /// Each sale item carries the discounted unit price actually charged
    /// plus the original price and the allocated discount, so the backend
    /// record can be reconstructed line by line.
    pub fn build_sale(
        &self,
        discount: Discount,
        tax_rate: f64,
        notes: &str,
    ) -> Result<NewSale, PricingError> {
        let priced = self.price(discount, tax_rate)?;

        Ok(NewSale {
            items: priced
                .lines
                .iter()
                .map(|l| SaleItem {
                    inventory_item_id: l.id.clone(),
                    quantity: l.quantity,
                    price_at_sale: l.discounted_unit_price,
                    original_price: l.unit_price,
                    discount_applied: l.discount_applied,
                })
                .collect(),
            total_discount: priced.discount_amount,
            sales_notes: notes.to_string(),
            total_amount: priced.subtotal - priced.discount_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: f64, stock: i64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            name: format!("Item {id}"),
            category: "Whisky".to_string(),
            price,
            cost: price / 2.0,
            stock,
            sku: None,
            description: None,
        }
    }

    #[test]
    fn adding_out_of_stock_item_is_a_no_op() {
        let mut cart = Cart::new(5);
        cart.add_item(&item("a", 10.0, 0));
        assert!(cart.is_empty());
        assert!(cart.recent_items().is_empty());
    }

    #[test]
    fn adding_same_item_increments_until_stock_cap() {
        let mut cart = Cart::new(5);
        let two_left = item("a", 10.0, 2);

        cart.add_item(&two_left);
        cart.add_item(&two_left);
        cart.add_item(&two_left); // capped, silently ignored

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn update_quantity_removes_line_at_zero() {
        let mut cart = Cart::new(5);
        let catalog = [item("a", 10.0, 10)];
        cart.add_item(&catalog[0]);

        cart.update_quantity("a", -1, &catalog);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_rejects_beyond_known_stock() {
        let mut cart = Cart::new(5);
        let catalog = [item("a", 10.0, 3)];
        cart.add_item(&catalog[0]);
        cart.add_item(&catalog[0]);
        cart.add_item(&catalog[0]);

        cart.update_quantity("a", 1, &catalog);
        assert_eq!(cart.lines()[0].quantity, 3, "update past stock must be rejected");

        cart.update_quantity("a", -2, &catalog);
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn update_quantity_treats_unknown_item_as_stock_zero() {
        let mut cart = Cart::new(5);
        cart.add_item(&item("a", 10.0, 5));

        // Catalog snapshot no longer contains the item: any increase fails,
        // decreases still work.
        cart.update_quantity("a", 1, &[]);
        assert_eq!(cart.lines()[0].quantity, 1);
        cart.update_quantity("a", -1, &[]);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::new(5);
        cart.add_item(&item("a", 10.0, 5));
        cart.add_item(&item("b", 4.0, 5));

        cart.remove_item("a");
        assert_eq!(cart.len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn recency_list_dedups_and_caps() {
        let mut cart = Cart::new(3);
        for id in ["a", "b", "c", "d"] {
            cart.add_item(&item(id, 1.0, 9));
        }
        assert_eq!(cart.recent_items(), ["d", "c", "b"]);

        // Re-adding an existing id moves it to the front without growing.
        cart.add_item(&item("b", 1.0, 9));
        assert_eq!(cart.recent_items(), ["b", "d", "c"]);
    }

    #[test]
    fn recency_survives_clear() {
        let mut cart = Cart::new(5);
        cart.add_item(&item("a", 1.0, 9));
        cart.clear();
        assert_eq!(cart.recent_items(), ["a"]);
    }

    #[test]
    fn build_sale_carries_discounted_unit_prices() {
        let mut cart = Cart::new(5);
        let wine = item("a", 10.0, 10);
        let gin = item("b", 5.0, 10);
        cart.add_item(&wine);
        cart.add_item(&wine);
        cart.add_item(&gin);

        let sale = cart
            .build_sale(Discount::percentage(10.0), 0.16, "loyal customer")
            .expect("build sale");

        assert_eq!(sale.items.len(), 2);
        assert!((sale.total_discount - 2.5).abs() < 1e-9);
        assert!((sale.total_amount - 22.5).abs() < 1e-9);

        let wine_line = &sale.items[0];
        assert_eq!(wine_line.inventory_item_id, "a");
        assert_eq!(wine_line.quantity, 2);
        assert!((wine_line.original_price - 10.0).abs() < 1e-9);
        assert!((wine_line.discount_applied - 2.0).abs() < 1e-9);
        assert!((wine_line.price_at_sale - 9.0).abs() < 1e-9);

        // Line totals reconstruct the pre-tax amount.
        let reconstructed: f64 = sale
            .items
            .iter()
            .map(|i| i.price_at_sale * f64::from(i.quantity))
            .sum();
        assert!((reconstructed - sale.total_amount).abs() < 1e-9);
    }
}
