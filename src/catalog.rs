//! Catalog filtering, sorting, and stock summaries.
//!
//! Backs the product grid on the point-of-sale screen and the inventory
//! management screen. All functions work on the inventory snapshot the host
//! fetched; none of them touch the network.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::InventoryItem;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Stock-state filter on the inventory screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockFilter {
    #[default]
    All,
    /// In stock but at or below the low-stock threshold.
    Low,
    /// Stock exactly zero.
    Out,
}

/// Sort order on the inventory screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Stock,
    Price,
    Margin,
}

/// Combined filter for [`filter_inventory`].
#[derive(Debug, Clone, Default)]
pub struct InventoryFilter<'a> {
    /// Case-insensitive match over name, SKU, and description.
    pub search: Option<&'a str>,
    /// Exact category label.
    pub category: Option<&'a str>,
    pub stock: StockFilter,
    pub sort: SortKey,
    /// Threshold for [`StockFilter::Low`]; comes from
    /// [`crate::config::PosConfig::low_stock_threshold`].
    pub low_stock_threshold: i64,
}

/// Markup percentage over cost; 0 when the cost is not positive.
fn margin_pct(item: &InventoryItem) -> f64 {
    if item.cost > 0.0 {
        (item.price - item.cost) / item.cost * 100.0
    } else {
        0.0
    }
}

/// Search the catalog for the product grid: case-insensitive over name and
/// category.
pub fn search_products<'a>(items: &'a [InventoryItem], term: &str) -> Vec<&'a InventoryItem> {
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&needle)
                || item.category.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Filter and sort the inventory list for the management screen.
pub fn filter_inventory<'a>(
    items: &'a [InventoryItem],
    filter: &InventoryFilter<'_>,
) -> Vec<&'a InventoryItem> {
    let needle = filter
        .search
        .map(str::to_lowercase)
        .filter(|s| !s.trim().is_empty());

    let mut filtered: Vec<&InventoryItem> = items
        .iter()
        .filter(|item| match needle.as_deref() {
            Some(term) => {
                item.name.to_lowercase().contains(term)
                    || item
                        .sku
                        .as_deref()
                        .map(|s| s.to_lowercase().contains(term))
                        .unwrap_or(false)
                    || item
                        .description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(term))
                        .unwrap_or(false)
            }
            None => true,
        })
        .filter(|item| match filter.category {
            Some(category) => item.category == category,
            None => true,
        })
        .filter(|item| match filter.stock {
            StockFilter::All => true,
            StockFilter::Low => item.stock > 0 && item.stock <= filter.low_stock_threshold,
            StockFilter::Out => item.stock == 0,
        })
        .collect();

    match filter.sort {
        SortKey::Name => filtered.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Stock => filtered.sort_by(|a, b| b.stock.cmp(&a.stock)),
        SortKey::Price => filtered.sort_by(|a, b| {
            b.price
                .partial_cmp(&a.price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        }),
        SortKey::Margin => filtered.sort_by(|a, b| {
            margin_pct(b)
                .partial_cmp(&margin_pct(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        }),
    }

    filtered
}

/// Distinct category labels, sorted, for the filter chips. The "All" chip is
/// the host's concern.
pub fn category_labels(items: &[InventoryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Header figures of the inventory screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_items: usize,
    /// Retail value of stock on hand (price x stock).
    pub total_value: f64,
    /// Profit if all stock sold at the current price ((price - cost) x stock).
    pub potential_profit: f64,
    /// In stock but at or below the threshold.
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

/// Compute the inventory screen summary over the full (unfiltered) list.
pub fn summarize_inventory(items: &[InventoryItem], low_stock_threshold: i64) -> InventorySummary {
    InventorySummary {
        total_items: items.len(),
        total_value: items.iter().map(|i| i.price * i.stock as f64).sum(),
        potential_profit: items
            .iter()
            .map(|i| (i.price - i.cost) * i.stock as f64)
            .sum(),
        low_stock_count: items
            .iter()
            .filter(|i| i.stock > 0 && i.stock <= low_stock_threshold)
            .count(),
        out_of_stock_count: items.iter().filter(|i| i.stock == 0).count(),
    }
}
