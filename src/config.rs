//! Business configuration for the terminal.
//!
//! The tax rate, the low-stock threshold, and the quick re-add cap ship as
//! defaults and may be overridden per terminal through the settings store.
//! Pricing and reporting take these values as parameters; nothing in the
//! computation modules reads configuration on its own.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::{self, DbState};

/// VAT fraction applied after discounts.
pub const DEFAULT_TAX_RATE: f64 = 0.16;

/// Stock level at or below which an item counts as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Bound of the most-recently-added list on the point-of-sale screen.
pub const DEFAULT_RECENT_ITEMS_CAP: usize = 5;

/// Display currency code.
pub const DEFAULT_CURRENCY: &str = "KES";

const SETTINGS_CATEGORY: &str = "business";

/// Terminal business configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosConfig {
    pub tax_rate: f64,
    pub low_stock_threshold: i64,
    pub recent_items_cap: usize,
    pub currency: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            tax_rate: DEFAULT_TAX_RATE,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            recent_items_cap: DEFAULT_RECENT_ITEMS_CAP,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl PosConfig {
    /// Load the configuration from the settings store. Missing or unparsable
    /// values fall back to the defaults (with a warning for the latter).
    pub fn load(db: &DbState) -> Result<PosConfig, String> {
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        let defaults = PosConfig::default();

        Ok(PosConfig {
            tax_rate: read_parsed(&conn, "tax_rate", defaults.tax_rate),
            low_stock_threshold: read_parsed(
                &conn,
                "low_stock_threshold",
                defaults.low_stock_threshold,
            ),
            recent_items_cap: read_parsed(&conn, "recent_items_cap", defaults.recent_items_cap),
            currency: db::get_setting(&conn, SETTINGS_CATEGORY, "currency")
                .unwrap_or(defaults.currency),
        })
    }

    /// Persist the configuration to the settings store.
    pub fn save(&self, db: &DbState) -> Result<(), String> {
        let conn = db.conn.lock().map_err(|e| e.to_string())?;

        db::set_setting(&conn, SETTINGS_CATEGORY, "tax_rate", &self.tax_rate.to_string())?;
        db::set_setting(
            &conn,
            SETTINGS_CATEGORY,
            "low_stock_threshold",
            &self.low_stock_threshold.to_string(),
        )?;
        db::set_setting(
            &conn,
            SETTINGS_CATEGORY,
            "recent_items_cap",
            &self.recent_items_cap.to_string(),
        )?;
        db::set_setting(&conn, SETTINGS_CATEGORY, "currency", &self.currency)?;
        Ok(())
    }
}

/// Read one setting and parse it, falling back to `default` when missing or
/// malformed.
fn read_parsed<T: std::str::FromStr + Copy>(
    conn: &rusqlite::Connection,
    key: &str,
    default: T,
) -> T {
    match db::get_setting(conn, SETTINGS_CATEGORY, key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw = %raw, "unparsable setting, using default");
                default
            }
        },
        None => default,
    }
}
