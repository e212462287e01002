//! Record shapes exchanged with the backend API.
//!
//! All wire payloads are snake_case JSON matching the shop backend. Monetary
//! amounts are plain currency units (`f64`), the same representation the
//! backend stores; quantities and stock levels are integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Role;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A stocked product as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Sale price per unit.
    pub price: f64,
    /// Acquisition cost per unit, used for profit reporting.
    pub cost: f64,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub cost: f64,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A product category (display metadata only; the pricing and report math
/// works off the category label carried by each inventory item).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Payload for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

/// One line of a persisted sale, with finalized per-unit pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub inventory_item_id: String,
    pub quantity: u32,
    /// Unit price actually charged after per-line discount allocation.
    pub price_at_sale: f64,
    /// Unit price before any discount.
    pub original_price: f64,
    /// This line's share of the cart-level discount.
    pub discount_applied: f64,
}

/// A completed transaction as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub cashier_id: String,
    pub items: Vec<SaleItem>,
    pub total_discount: f64,
    pub total_amount: f64,
    #[serde(default, alias = "sales_notes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for submitting a completed sale. Built by [`crate::cart::Cart::build_sale`].
///
/// `total_amount` is the pre-tax amount (subtotal minus discount); tax is a
/// display-level figure at the terminal and is not persisted per sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub items: Vec<SaleItem>,
    pub total_discount: f64,
    pub sales_notes: String,
    pub total_amount: f64,
}

// ---------------------------------------------------------------------------
// Expenses
// ---------------------------------------------------------------------------

/// An operating expense as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by_id: String,
}

/// Payload for recording an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: String,
    pub category: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by_id: String,
}

/// Preset expense categories offered by the expense entry form.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Rent",
    "Utilities",
    "Supplies",
    "Marketing",
    "Staff Salaries",
    "Equipment",
    "Transportation",
    "Insurance",
    "Professional Services",
    "Other",
];

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Payload for creating or replacing a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A staff account as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
}

impl UserAccount {
    /// Display name: the full name when set, the username otherwise.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Payload for creating a staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
}

/// Response of `POST /api/auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_record_accepts_sales_notes_alias() {
        let json = r#"{
            "id": "s1",
            "created_at": "2026-03-01T10:00:00Z",
            "cashier_id": "u1",
            "items": [],
            "total_discount": 0.0,
            "total_amount": 25.0,
            "sales_notes": "walk-in"
        }"#;
        let sale: SaleRecord = serde_json::from_str(json).expect("parse sale");
        assert_eq!(sale.notes.as_deref(), Some("walk-in"));
    }

    #[test]
    fn inventory_item_roundtrip_without_optionals() {
        let json = r#"{
            "id": "i1",
            "name": "Cabernet Sauvignon 750ml",
            "category": "Red Wine",
            "price": 18.5,
            "cost": 11.0,
            "stock": 24
        }"#;
        let item: InventoryItem = serde_json::from_str(json).expect("parse item");
        assert_eq!(item.sku, None);
        let out = serde_json::to_value(&item).expect("serialize item");
        assert!(out.get("sku").is_none(), "unset optionals must not serialize");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let user = UserAccount {
            id: "u1".into(),
            username: "jkamau".into(),
            email: None,
            full_name: Some("  ".into()),
            role: Role::Cashier,
        };
        assert_eq!(user.display_name(), "jkamau");
    }
}
