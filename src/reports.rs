//! Report aggregation for the dashboard screens.
//!
//! Pure functions over collections the host has already fetched: sales,
//! inventory, and expenses go in, a recomputed summary comes out. Nothing is
//! cached between calls, and the reference time is always an explicit
//! parameter so identical inputs yield identical output.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{ExpenseRecord, InventoryItem, SaleRecord};

/// Category label used when a sale item's inventory reference cannot be
/// resolved, or the resolved item carries no category.
const UNCATEGORIZED: &str = "Uncategorized";

/// Category label used for expenses without a category.
const OTHER: &str = "Other";

/// Number of entries kept in the top-seller ranking.
const TOP_ITEMS_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// Dashboard time-range selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    /// Since the start of the reference day.
    #[serde(rename = "day")]
    Today,
    /// The trailing seven days.
    #[serde(rename = "week")]
    Week,
    /// The trailing calendar month.
    #[serde(rename = "month")]
    Month,
    /// The trailing calendar year.
    #[serde(rename = "year")]
    Year,
    /// No time filter.
    #[serde(rename = "all")]
    AllTime,
}

impl TimeRange {
    /// The earliest timestamp included by this range, relative to `now`.
    /// `None` means no filtering. The bound is inclusive: a record stamped
    /// exactly at the cutoff is in range.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Today => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default()
                    .and_utc(),
            ),
            TimeRange::Week => Some(now - Duration::days(7)),
            TimeRange::Month => Some(now.checked_sub_months(Months::new(1)).unwrap_or(now)),
            TimeRange::Year => Some(now.checked_sub_months(Months::new(12)).unwrap_or(now)),
            TimeRange::AllTime => None,
        }
    }

    fn contains(self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => timestamp >= cutoff,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary shapes
// ---------------------------------------------------------------------------

/// Revenue or expense total for one category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// One calendar day of the financial time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub sales: f64,
    pub profit: f64,
    pub expenses: f64,
    pub net_profit: f64,
}

/// Top-seller ranking entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPerformance {
    pub name: String,
    pub quantity: u64,
    pub revenue: f64,
}

/// Per-cashier sales totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashierPerformance {
    pub cashier_id: String,
    pub sales: f64,
    pub transactions: usize,
}

/// The full dashboard summary, recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sales: f64,
    /// Gross profit: sum of (price at sale - inventory cost) x quantity.
    pub total_profit: f64,
    pub total_expenses: f64,
    /// Gross profit minus expenses.
    pub net_profit: f64,
    /// Gross profit as a percentage of sales; 0 when there are no sales.
    pub profit_margin_pct: f64,
    pub transaction_count: usize,
    /// Items at or below the low-stock threshold, over the unfiltered
    /// inventory (stock is a point-in-time quantity, not time-windowed).
    pub low_stock_count: usize,
    pub category_breakdown: Vec<CategoryTotal>,
    pub expense_breakdown: Vec<CategoryTotal>,
    pub time_series: Vec<DailyBucket>,
    pub top_items: Vec<ItemPerformance>,
    pub cashier_performance: Vec<CashierPerformance>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Profit contribution of one sale, resolved against the inventory index.
/// Items whose inventory reference cannot be resolved contribute zero.
fn sale_profit(sale: &SaleRecord, index: &HashMap<&str, &InventoryItem>) -> f64 {
    sale.items
        .iter()
        .filter_map(|item| {
            index
                .get(item.inventory_item_id.as_str())
                .map(|inv| (item.price_at_sale - inv.cost) * f64::from(item.quantity))
        })
        .sum()
}

/// Aggregate the dashboard summary for one time range.
///
/// `now` is the reference instant for the range cutoff; callers pass a fixed
/// value when reproducibility matters (tests, exports). `low_stock_threshold`
/// comes from [`crate::config::PosConfig`].
pub fn aggregate_report(
    sales: &[SaleRecord],
    inventory: &[InventoryItem],
    expenses: &[ExpenseRecord],
    range: TimeRange,
    now: DateTime<Utc>,
    low_stock_threshold: i64,
) -> ReportSummary {
    let index: HashMap<&str, &InventoryItem> =
        inventory.iter().map(|item| (item.id.as_str(), item)).collect();

    let filtered_sales: Vec<&SaleRecord> = sales
        .iter()
        .filter(|s| range.contains(s.created_at, now))
        .collect();
    let filtered_expenses: Vec<&ExpenseRecord> = expenses
        .iter()
        .filter(|e| range.contains(e.created_at, now))
        .collect();

    let total_sales: f64 = filtered_sales.iter().map(|s| s.total_amount).sum();
    let total_expenses: f64 = filtered_expenses.iter().map(|e| e.amount).sum();
    let total_profit: f64 = filtered_sales.iter().map(|s| sale_profit(s, &index)).sum();
    let net_profit = total_profit - total_expenses;
    let profit_margin_pct = if total_sales > 0.0 {
        total_profit / total_sales * 100.0
    } else {
        0.0
    };

    // Revenue by product category. Unresolved references land under the
    // fallback label rather than being dropped.
    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for sale in &filtered_sales {
        for item in &sale.items {
            let category = index
                .get(item.inventory_item_id.as_str())
                .map(|inv| inv.category.trim())
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORIZED);
            *by_category.entry(category.to_string()).or_default() +=
                item.price_at_sale * f64::from(item.quantity);
        }
    }

    // Expense amounts by expense category.
    let mut expense_by_category: BTreeMap<String, f64> = BTreeMap::new();
    for expense in &filtered_expenses {
        let category = if expense.category.trim().is_empty() {
            OTHER
        } else {
            expense.category.trim()
        };
        *expense_by_category.entry(category.to_string()).or_default() += expense.amount;
    }

    // Daily buckets: sales and profit from sales, expenses from expenses.
    // An expense on a day without sales still creates a bucket.
    let mut buckets: BTreeMap<NaiveDate, (f64, f64, f64)> = BTreeMap::new();
    for sale in &filtered_sales {
        let entry = buckets.entry(sale.created_at.date_naive()).or_default();
        entry.0 += sale.total_amount;
        entry.1 += sale_profit(sale, &index);
    }
    for expense in &filtered_expenses {
        let entry = buckets.entry(expense.created_at.date_naive()).or_default();
        entry.2 += expense.amount;
    }
    let time_series: Vec<DailyBucket> = buckets
        .into_iter()
        .map(|(date, (sales, profit, expenses))| DailyBucket {
            date,
            sales,
            profit,
            expenses,
            net_profit: profit - expenses,
        })
        .collect();

    // Top sellers by revenue, keyed by resolved product name.
    let mut item_totals: HashMap<String, (u64, f64)> = HashMap::new();
    for sale in &filtered_sales {
        for item in &sale.items {
            let name = index
                .get(item.inventory_item_id.as_str())
                .map(|inv| inv.name.clone())
                .unwrap_or_else(|| format!("Item {}", item.inventory_item_id));
            let entry = item_totals.entry(name).or_default();
            entry.0 += u64::from(item.quantity);
            entry.1 += item.price_at_sale * f64::from(item.quantity);
        }
    }
    let mut top_items: Vec<ItemPerformance> = item_totals
        .into_iter()
        .map(|(name, (quantity, revenue))| ItemPerformance {
            name,
            quantity,
            revenue,
        })
        .collect();
    top_items.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_items.truncate(TOP_ITEMS_LIMIT);

    // Per-cashier totals, busiest first.
    let mut cashier_totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for sale in &filtered_sales {
        let entry = cashier_totals.entry(sale.cashier_id.as_str()).or_default();
        entry.0 += sale.total_amount;
        entry.1 += 1;
    }
    let mut cashier_performance: Vec<CashierPerformance> = cashier_totals
        .into_iter()
        .map(|(cashier_id, (sales, transactions))| CashierPerformance {
            cashier_id: cashier_id.to_string(),
            sales,
            transactions,
        })
        .collect();
    cashier_performance.sort_by(|a, b| {
        b.sales
            .partial_cmp(&a.sales)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cashier_id.cmp(&b.cashier_id))
    });

    let low_stock_count = inventory
        .iter()
        .filter(|item| item.stock <= low_stock_threshold)
        .count();

    ReportSummary {
        total_sales,
        total_profit,
        total_expenses,
        net_profit,
        profit_margin_pct,
        transaction_count: filtered_sales.len(),
        low_stock_count,
        category_breakdown: into_category_totals(by_category),
        expense_breakdown: into_category_totals(expense_by_category),
        time_series,
        top_items,
        cashier_performance,
    }
}

fn into_category_totals(map: BTreeMap<String, f64>) -> Vec<CategoryTotal> {
    map.into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect()
}

// ---------------------------------------------------------------------------
// Expense screen summary
// ---------------------------------------------------------------------------

/// Summary block of the expense screen, computed over an already filtered
/// list (see [`filter_expenses`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub total_amount: f64,
    pub count: usize,
    pub average_amount: f64,
    pub category_totals: Vec<CategoryTotal>,
    pub top_category: Option<CategoryTotal>,
    /// Total for the calendar month containing `now`.
    pub this_month: f64,
    /// Total for the calendar month before `now`.
    pub last_month: f64,
    /// Percent change this month vs last; 0 when last month had nothing.
    pub monthly_change_pct: f64,
}

/// Summarize expenses for the expense screen.
pub fn summarize_expenses(expenses: &[ExpenseRecord], now: DateTime<Utc>) -> ExpenseSummary {
    let total_amount: f64 = expenses.iter().map(|e| e.amount).sum();
    let count = expenses.len();
    let average_amount = if count > 0 {
        total_amount / count as f64
    } else {
        0.0
    };

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        let category = if expense.category.trim().is_empty() {
            OTHER
        } else {
            expense.category.trim()
        };
        *by_category.entry(category.to_string()).or_default() += expense.amount;
    }
    let category_totals = into_category_totals(by_category);
    let top_category = category_totals
        .iter()
        .max_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal))
        .cloned();

    let last_month_ref = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let in_month = |created_at: DateTime<Utc>, reference: DateTime<Utc>| {
        created_at.year() == reference.year() && created_at.month() == reference.month()
    };

    let this_month: f64 = expenses
        .iter()
        .filter(|e| in_month(e.created_at, now))
        .map(|e| e.amount)
        .sum();
    let last_month: f64 = expenses
        .iter()
        .filter(|e| in_month(e.created_at, last_month_ref))
        .map(|e| e.amount)
        .sum();
    let monthly_change_pct = if last_month > 0.0 {
        (this_month - last_month) / last_month * 100.0
    } else {
        0.0
    };

    ExpenseSummary {
        total_amount,
        count,
        average_amount,
        category_totals,
        top_category,
        this_month,
        last_month,
        monthly_change_pct,
    }
}

/// Filter the expense list for the expense screen: time range, then a
/// case-insensitive search over name/description, then exact category.
/// Newest first.
pub fn filter_expenses(
    expenses: &[ExpenseRecord],
    range: TimeRange,
    search: Option<&str>,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<ExpenseRecord> {
    let needle = search.map(str::to_lowercase).filter(|s| !s.trim().is_empty());

    let mut filtered: Vec<ExpenseRecord> = expenses
        .iter()
        .filter(|e| range.contains(e.created_at, now))
        .filter(|e| match needle.as_deref() {
            Some(term) => {
                e.name.to_lowercase().contains(term)
                    || e.description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(term))
                        .unwrap_or(false)
            }
            None => true,
        })
        .filter(|e| match category {
            Some(c) => e.category == c,
            None => true,
        })
        .cloned()
        .collect();

    filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    filtered
}
