//! Cart pricing calculations.

use crate::cart::LineItem;
use crate::format::NumberFormat;
use crate::ids::RowId;
use serde::{Deserialize, Serialize};

/// Aggregate amounts for a cart, unrounded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CartPricing {
    /// Sum of unit price times quantity, before tax.
    pub subtotal: f64,
    /// Sum of line taxes.
    pub tax: f64,
    /// Sum of flat per-line discounts.
    pub discount: f64,
    /// Tax-inclusive line totals minus discounts.
    pub total: f64,
}

impl CartPricing {
    /// Price a set of line items.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Self {
        let mut pricing = CartPricing::default();
        let mut gross = 0.0;
        for item in items {
            pricing.subtotal += item.line_subtotal();
            pricing.tax += item.line_tax();
            pricing.discount += item.discount();
            gross += item.line_total();
        }
        pricing.total = gross - pricing.discount;
        pricing
    }

    /// Amounts rendered with `format`.
    pub fn formatted(&self, format: &NumberFormat) -> FormattedPricing {
        FormattedPricing {
            subtotal: format.format(self.subtotal),
            tax: format.format(self.tax),
            discount: format.format(self.discount),
            total: format.format(self.total),
        }
    }
}

/// Display strings for cart totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedPricing {
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
}

/// Pricing breakdown for a single line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemPricing {
    pub row_id: RowId,
    pub unit_price: f64,
    pub quantity: f64,
    /// Unit price times quantity.
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    /// Tax-inclusive total minus discount.
    pub total: f64,
}

impl LineItemPricing {
    pub fn from_item(item: &LineItem) -> Self {
        let discount_amount = item.discount();
        Self {
            row_id: item.row_id().clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            subtotal: item.line_subtotal(),
            discount_amount,
            tax_amount: item.line_tax(),
            total: item.line_total() - discount_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{OptionSet, DISCOUNT_KEY};
    use crate::ids::ProductId;

    fn item(product: &str, unit_price: f64, quantity: f64, tax: f64, options: OptionSet) -> LineItem {
        LineItem::new(ProductId::new(product), "Item", unit_price, quantity, options, tax)
    }

    #[test]
    fn test_totals_with_tax() {
        let items = [item("p1", 100.0, 2.0, 10.0, OptionSet::new())];
        let pricing = CartPricing::from_items(&items);
        let formatted = pricing.formatted(&NumberFormat::default());

        assert_eq!(formatted.subtotal, "200.00");
        assert_eq!(formatted.tax, "20.00");
        assert_eq!(formatted.total, "220.00");
        assert_eq!(pricing.discount, 0.0);
    }

    #[test]
    fn test_totals_with_discount() {
        let items = [item(
            "p1",
            50.0,
            4.0,
            0.0,
            OptionSet::new().with(DISCOUNT_KEY, 5.0),
        )];
        let formatted = CartPricing::from_items(&items).formatted(&NumberFormat::default());
        assert_eq!(formatted.discount, "5.00");
        assert_eq!(formatted.total, "195.00");
    }

    #[test]
    fn test_mixed_lines() {
        let items = [
            item("p1", 10.0, 1.0, 21.0, OptionSet::new()),
            item("p2", 5.0, 3.0, 21.0, OptionSet::new().with(DISCOUNT_KEY, "1")),
        ];
        let pricing = CartPricing::from_items(&items);
        assert!((pricing.subtotal - 25.0).abs() < 1e-9);
        assert!((pricing.tax - 5.25).abs() < 1e-9);
        assert!((pricing.discount - 1.0).abs() < 1e-9);
        assert!((pricing.total - 29.25).abs() < 1e-9);
    }

    #[test]
    fn test_line_pricing_subtracts_flat_discount() {
        let line = item("p1", 10.0, 2.0, 0.0, OptionSet::new().with(DISCOUNT_KEY, 1.0)).pricing();
        assert_eq!(line.subtotal, 20.0);
        assert_eq!(line.discount_amount, 1.0);
        assert_eq!(line.total, 19.0);
    }
}
