//! Cart pricing: subtotal, discount allocation, tax, and grand total.
//!
//! Pure computation over the in-memory cart. A cart-level discount is
//! allocated across lines proportionally to each line's share of the
//! subtotal, so the submitted sale items carry the exact unit price charged.
//! The tax rate comes from [`crate::config::PosConfig`]; nothing here reads
//! configuration or clocks on its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLine;

/// Validation failures rejected at the pricing boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("line {0}: quantity must be at least 1")]
    ZeroQuantity(String),
    #[error("line {0}: unit price must be a non-negative finite number")]
    InvalidUnitPrice(String),
    #[error("discount value must be a non-negative finite number")]
    InvalidDiscount,
    #[error("tax rate must be a non-negative finite fraction")]
    InvalidTaxRate,
}

/// How a cart-level discount is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` percent of the subtotal.
    Percentage,
    /// `value` as an absolute amount.
    Fixed,
}

/// A cart-level discount entered at the register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: f64,
}

impl Discount {
    pub fn none() -> Self {
        Discount {
            kind: DiscountKind::Percentage,
            value: 0.0,
        }
    }

    pub fn percentage(value: f64) -> Self {
        Discount {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn fixed(value: f64) -> Self {
        Discount {
            kind: DiscountKind::Fixed,
            value,
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

/// One cart line with its discount share resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    /// Unit price before discount.
    pub unit_price: f64,
    /// `unit_price * quantity`.
    pub line_subtotal: f64,
    /// This line's share of the cart discount.
    pub discount_applied: f64,
    /// `(line_subtotal - discount_applied) / quantity`.
    pub discounted_unit_price: f64,
}

/// Full pricing breakdown for the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub lines: Vec<PricedLine>,
}

impl PricingResult {
    /// An all-zero result for an empty cart.
    pub fn empty() -> Self {
        PricingResult {
            subtotal: 0.0,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total: 0.0,
            lines: Vec::new(),
        }
    }
}

/// Price the cart.
///
/// Invariants:
/// - an empty cart yields an all-zero result regardless of the discount
///   (guards the division in the per-line allocation);
/// - the discount amount is clamped to the subtotal, so the total is never
///   negative;
/// - the per-line `discount_applied` values sum to `discount_amount` up to
///   floating-point tolerance.
pub fn price_cart(
    lines: &[CartLine],
    discount: Discount,
    tax_rate: f64,
) -> Result<PricingResult, PricingError> {
    for line in lines {
        if line.quantity == 0 {
            return Err(PricingError::ZeroQuantity(line.id.clone()));
        }
        if !line.unit_price.is_finite() || line.unit_price < 0.0 {
            return Err(PricingError::InvalidUnitPrice(line.id.clone()));
        }
    }
    if !discount.value.is_finite() || discount.value < 0.0 {
        return Err(PricingError::InvalidDiscount);
    }
    if !tax_rate.is_finite() || tax_rate < 0.0 {
        return Err(PricingError::InvalidTaxRate);
    }

    if lines.is_empty() {
        return Ok(PricingResult::empty());
    }

    let subtotal: f64 = lines
        .iter()
        .map(|l| l.unit_price * f64::from(l.quantity))
        .sum();

    // Clamp at subtotal: an oversized fixed discount (or a percentage above
    // 100) must not drive the total negative.
    let discount_amount = if subtotal > 0.0 {
        let raw = match discount.kind {
            DiscountKind::Percentage => subtotal * (discount.value / 100.0),
            DiscountKind::Fixed => discount.value,
        };
        raw.min(subtotal)
    } else {
        0.0
    };

    let priced: Vec<PricedLine> = lines
        .iter()
        .map(|l| {
            let line_subtotal = l.unit_price * f64::from(l.quantity);
            let share = if subtotal > 0.0 {
                line_subtotal / subtotal
            } else {
                0.0
            };
            let discount_applied = discount_amount * share;
            PricedLine {
                id: l.id.clone(),
                name: l.name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_subtotal,
                discount_applied,
                discounted_unit_price: (line_subtotal - discount_applied) / f64::from(l.quantity),
            }
        })
        .collect();

    let tax_amount = (subtotal - discount_amount) * tax_rate;

    Ok(PricingResult {
        subtotal,
        discount_amount,
        tax_amount,
        total: subtotal - discount_amount + tax_amount,
        lines: priced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAX: f64 = 0.16;
    const EPS: f64 = 1e-9;

    fn line(id: &str, price: f64, quantity: u32) -> CartLine {
        CartLine {
            id: id.to_string(),
            name: format!("Item {id}"),
            category: "Red Wine".to_string(),
            unit_price: price,
            quantity,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn worked_example_from_the_register() {
        // 10.00 x2 + 5.00 x1, 10% off, 16% tax
        let lines = [line("a", 10.0, 2), line("b", 5.0, 1)];
        let result = price_cart(&lines, Discount::percentage(10.0), TAX).expect("price");

        assert_close(result.subtotal, 25.0);
        assert_close(result.discount_amount, 2.5);
        assert_close(result.tax_amount, 3.6);
        assert_close(result.total, 26.1);
    }

    #[test]
    fn zero_discount_is_identity_plus_tax() {
        let lines = [line("a", 12.75, 3), line("b", 4.2, 2)];
        let result = price_cart(&lines, Discount::none(), TAX).expect("price");

        assert_close(result.total, result.subtotal * (1.0 + TAX));
        let reconstructed: f64 = result
            .lines
            .iter()
            .map(|l| l.discounted_unit_price * f64::from(l.quantity))
            .sum();
        assert_close(reconstructed, result.subtotal);
    }

    #[test]
    fn allocated_discounts_sum_to_discount_amount() {
        let lines = [line("a", 9.99, 3), line("b", 7.5, 1), line("c", 2.25, 4)];
        let result = price_cart(&lines, Discount::fixed(6.0), TAX).expect("price");

        assert_close(result.discount_amount, 6.0);
        let allocated: f64 = result.lines.iter().map(|l| l.discount_applied).sum();
        assert_close(allocated, result.discount_amount);
    }

    #[test]
    fn empty_cart_prices_to_zero_without_division_error() {
        let result = price_cart(&[], Discount::percentage(50.0), TAX).expect("price");
        assert_eq!(result, PricingResult::empty());

        let result = price_cart(&[], Discount::fixed(100.0), TAX).expect("price");
        assert_close(result.total, 0.0);
    }

    #[test]
    fn pricing_is_idempotent() {
        let lines = [line("a", 3.3, 7), line("b", 11.0, 1)];
        let first = price_cart(&lines, Discount::percentage(12.5), TAX).expect("price");
        let second = price_cart(&lines, Discount::percentage(12.5), TAX).expect("price");
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_fixed_discount_clamps_to_subtotal() {
        let lines = [line("a", 10.0, 1)];
        let result = price_cart(&lines, Discount::fixed(25.0), TAX).expect("price");

        assert_close(result.discount_amount, 10.0);
        assert_close(result.tax_amount, 0.0);
        assert_close(result.total, 0.0);
        assert_close(result.lines[0].discounted_unit_price, 0.0);
    }

    #[test]
    fn percentage_above_hundred_clamps_too() {
        let lines = [line("a", 8.0, 2)];
        let result = price_cart(&lines, Discount::percentage(150.0), TAX).expect("price");
        assert_close(result.discount_amount, 16.0);
        assert_close(result.total, 0.0);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let zero_qty = [line("a", 10.0, 0)];
        assert_eq!(
            price_cart(&zero_qty, Discount::none(), TAX),
            Err(PricingError::ZeroQuantity("a".into()))
        );

        let bad_price = [line("a", -1.0, 1)];
        assert_eq!(
            price_cart(&bad_price, Discount::none(), TAX),
            Err(PricingError::InvalidUnitPrice("a".into()))
        );

        let ok = [line("a", 1.0, 1)];
        assert_eq!(
            price_cart(&ok, Discount::fixed(-2.0), TAX),
            Err(PricingError::InvalidDiscount)
        );
        assert_eq!(
            price_cart(&ok, Discount::none(), f64::NAN),
            Err(PricingError::InvalidTaxRate)
        );
    }

    #[test]
    fn discount_serde_matches_register_payload() {
        let parsed: Discount =
            serde_json::from_str(r#"{"type":"percentage","value":10.0}"#).expect("parse discount");
        assert_eq!(parsed, Discount::percentage(10.0));
        let parsed: Discount =
            serde_json::from_str(r#"{"type":"fixed","value":5.5}"#).expect("parse discount");
        assert_eq!(parsed.kind, DiscountKind::Fixed);
    }
}
