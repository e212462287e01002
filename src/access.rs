//! Role-based capability resolution.
//!
//! Every screen-level and action-level permission check in the terminal goes
//! through [`can_access`], driven by one feature table. Admins pass every
//! check; other roles only pass the features their row lists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff roles known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    InventoryStaff,
}

impl Role {
    /// The wire string used by the backend for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
            Role::InventoryStaff => "inventory_staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            "inventory_staff" => Ok(Role::InventoryStaff),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Features gated by role.
///
/// The first group gates whole screens, the second individual actions inside
/// the inventory and expense screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    PointOfSale,
    Customers,
    Inventory,
    Reports,
    Users,
    Expenses,
    AddProduct,
    EditProduct,
    DeleteProduct,
    ManageCategories,
    AddExpense,
    EditExpense,
    DeleteExpense,
}

/// Roles allowed per feature, admin excluded (admin always passes).
fn allowed_roles(feature: Feature) -> &'static [Role] {
    match feature {
        Feature::PointOfSale => &[Role::Manager, Role::Cashier, Role::InventoryStaff],
        Feature::Customers => &[Role::Manager, Role::Cashier],
        Feature::Inventory => &[Role::Manager, Role::InventoryStaff],
        Feature::Reports => &[Role::Manager],
        Feature::Users => &[],
        Feature::Expenses => &[Role::Manager],
        Feature::AddProduct => &[],
        Feature::EditProduct => &[Role::Manager],
        Feature::DeleteProduct => &[],
        Feature::ManageCategories => &[],
        Feature::AddExpense => &[Role::Manager],
        Feature::EditExpense => &[Role::Manager],
        Feature::DeleteExpense => &[],
    }
}

/// Whether `role` may use `feature`.
pub fn can_access(role: Role, feature: Feature) -> bool {
    role == Role::Admin || allowed_roles(feature).contains(&role)
}
