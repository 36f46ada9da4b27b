//! Totals engine.
//!
//! Pure functions from line items, global rates, and display flags to the
//! invoice totals. Nothing here fails: non-finite inputs count as zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coerce::finite_or_zero;
use crate::error::Error;
use crate::model::LineItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub total_vat: f64,
    pub total_fees: f64,
    pub grand_total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsFlags {
    /// When off, every item counts as quantity 1.
    pub show_quantity: bool,
    pub include_vat: bool,
    pub include_transaction_fees: bool,
    /// Fees are still computed but left out of the grand total.
    pub absorb_fees: bool,
}

/// How an item-level rate competes with the global rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverridePolicy {
    /// An item rate wins only when it is set and non-zero; an item rate of 0
    /// falls back to the global rate. Matches invoices saved by earlier builds.
    #[default]
    NonZero,
    /// Any item rate that is set wins, including 0.
    Explicit,
}

impl fmt::Display for OverridePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverridePolicy::NonZero => f.write_str("non-zero"),
            OverridePolicy::Explicit => f.write_str("explicit"),
        }
    }
}

impl FromStr for OverridePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "non-zero" | "nonzero" => Ok(OverridePolicy::NonZero),
            "explicit" => Ok(OverridePolicy::Explicit),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

pub fn effective_quantity(item: &LineItem, show_quantity: bool) -> f64 {
    if show_quantity {
        f64::from(item.quantity)
    } else {
        1.0
    }
}

pub fn item_subtotal(item: &LineItem, show_quantity: bool) -> f64 {
    effective_quantity(item, show_quantity) * finite_or_zero(item.unit_price)
}

pub fn effective_rate(item_rate: Option<f64>, global_rate: f64, policy: OverridePolicy) -> f64 {
    let global_rate = finite_or_zero(global_rate);
    match item_rate.map(finite_or_zero) {
        None => global_rate,
        Some(rate) if rate == 0.0 && policy == OverridePolicy::NonZero => global_rate,
        Some(rate) => rate,
    }
}

pub fn compute_totals(
    line_items: &[LineItem],
    global_vat_rate: f64,
    global_fee_rate: f64,
    flags: TotalsFlags,
    policy: OverridePolicy,
) -> Totals {
    let subtotal = line_items
        .iter()
        .fold(0.0, |sum, item| sum + item_subtotal(item, flags.show_quantity));

    let total_vat = if flags.include_vat {
        line_items.iter().fold(0.0, |sum, item| {
            let rate = effective_rate(item.vat_rate, global_vat_rate, policy);
            sum + item_subtotal(item, flags.show_quantity) * rate / 100.0
        })
    } else {
        0.0
    };

    let total_fees = if flags.include_transaction_fees {
        line_items.iter().fold(0.0, |sum, item| {
            let rate = effective_rate(item.transaction_fee_rate, global_fee_rate, policy);
            sum + item_subtotal(item, flags.show_quantity) * rate / 100.0
        })
    } else {
        0.0
    };

    let grand_total = subtotal + total_vat + if flags.absorb_fees { 0.0 } else { total_fees };

    Totals {
        subtotal,
        total_vat,
        total_fees,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ON: TotalsFlags = TotalsFlags {
        show_quantity: true,
        include_vat: true,
        include_transaction_fees: true,
        absorb_fees: false,
    };

    fn item(quantity: u32, unit_price: f64, vat: Option<f64>, fee: Option<f64>) -> LineItem {
        LineItem {
            vat_rate: vat,
            transaction_fee_rate: fee,
            ..LineItem::new("i", "Work", quantity, unit_price)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_items_give_zero_totals() {
        let totals = compute_totals(&[], 20.0, 3.0, ALL_ON, OverridePolicy::NonZero);
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn per_item_rates_override_global() {
        let items = [item(40, 75.0, Some(20.0), Some(2.9))];
        let totals = compute_totals(&items, 5.0, 1.0, ALL_ON, OverridePolicy::NonZero);
        assert!(approx(totals.subtotal, 3000.0));
        assert!(approx(totals.total_vat, 600.0));
        assert!(approx(totals.total_fees, 87.0));
        assert!(approx(totals.grand_total, 3687.0));
    }

    #[test]
    fn zero_item_rate_falls_back_to_global_by_default() {
        let items = [item(1, 100.0, Some(0.0), Some(0.0))];
        let totals = compute_totals(&items, 10.0, 2.0, ALL_ON, OverridePolicy::NonZero);
        assert!(approx(totals.total_vat, 10.0));
        assert!(approx(totals.total_fees, 2.0));
    }

    #[test]
    fn explicit_policy_honours_zero_rate() {
        let items = [item(1, 100.0, Some(0.0), None)];
        let totals = compute_totals(&items, 10.0, 2.0, ALL_ON, OverridePolicy::Explicit);
        assert_eq!(totals.total_vat, 0.0);
        assert!(approx(totals.total_fees, 2.0));
    }

    #[test]
    fn hidden_quantity_counts_as_one() {
        let items = [item(5, 10.0, None, None), item(3, 2.5, None, None)];
        let flags = TotalsFlags { show_quantity: false, ..ALL_ON };
        let totals = compute_totals(&items, 0.0, 0.0, flags, OverridePolicy::NonZero);
        assert_eq!(totals.subtotal, 12.5);
    }

    #[test]
    fn absorbed_fees_are_tracked_but_not_charged() {
        let items = [item(1, 1000.0, None, None)];
        let flags = TotalsFlags { absorb_fees: true, ..ALL_ON };
        let totals = compute_totals(&items, 10.0, 3.0, flags, OverridePolicy::NonZero);
        assert!(approx(totals.total_fees, 30.0));
        assert!(approx(totals.grand_total, 1100.0));
    }

    #[test]
    fn excluded_vat_and_fees_are_zero() {
        let items = [item(2, 50.0, Some(20.0), Some(3.0))];
        let flags = TotalsFlags {
            include_vat: false,
            include_transaction_fees: false,
            ..ALL_ON
        };
        let totals = compute_totals(&items, 0.0, 0.0, flags, OverridePolicy::NonZero);
        assert_eq!(totals.total_vat, 0.0);
        assert_eq!(totals.total_fees, 0.0);
        assert_eq!(totals.grand_total, 100.0);
    }

    #[test]
    fn non_finite_inputs_are_zeroed() {
        let items = [item(2, f64::NAN, Some(f64::INFINITY), None), item(1, 10.0, None, None)];
        let totals = compute_totals(&items, f64::NAN, 0.0, ALL_ON, OverridePolicy::NonZero);
        assert_eq!(totals.subtotal, 10.0);
        assert_eq!(totals.total_vat, 0.0);
        assert!(totals.grand_total.is_finite());
    }

    #[test]
    fn policy_parses_from_kebab_case() {
        assert_eq!("non-zero".parse::<OverridePolicy>().unwrap(), OverridePolicy::NonZero);
        assert_eq!("Explicit".parse::<OverridePolicy>().unwrap(), OverridePolicy::Explicit);
        assert!("always".parse::<OverridePolicy>().is_err());
    }
}
