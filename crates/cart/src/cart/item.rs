//! Line items and their inputs.

use crate::cart::{LineItemPricing, OptionSet};
use crate::format::NumberFormat;
use crate::ids::{ProductId, RowId};
use crate::validation::numeric;
use cart_db::CartRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A price or quantity as supplied by a caller.
///
/// Numeric text such as `"9.95"` is accepted and normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value, if finite.
    pub fn normalize(&self) -> Option<f64> {
        numeric(&self.to_json())
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Amount::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(n.to_string())),
            Amount::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for Amount {
    fn from(n: f64) -> Self {
        Amount::Number(n)
    }
}

impl From<i32> for Amount {
    fn from(n: i32) -> Self {
        Amount::Number(f64::from(n))
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Amount::Text(s.to_string())
    }
}

impl From<String> for Amount {
    fn from(s: String) -> Self {
        Amount::Text(s)
    }
}

/// A row in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    row_id: RowId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Product name for display.
    pub name: String,
    /// Price per unit before tax.
    pub unit_price: f64,
    pub quantity: f64,
    /// Extra attributes; a `discount` entry is taken off the line total once.
    pub options: OptionSet,
    tax_rate: f64,
}

impl LineItem {
    /// Create a line item. The row id is derived here and never changes.
    ///
    /// A `totalStock` option is dropped; it only bounds merges.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: f64,
        quantity: f64,
        options: OptionSet,
        tax_rate: f64,
    ) -> Self {
        let options = options.without_stock();
        Self {
            row_id: RowId::derive(&product_id, &options),
            product_id,
            name: name.into(),
            unit_price,
            quantity,
            options,
            tax_rate,
        }
    }

    pub fn row_id(&self) -> &RowId {
        &self.row_id
    }

    /// Tax rate in percent captured when the item was created.
    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }

    pub fn unit_tax(&self) -> f64 {
        self.unit_price * self.tax_rate / 100.0
    }

    pub fn unit_price_with_tax(&self) -> f64 {
        self.unit_price + self.unit_tax()
    }

    pub fn line_subtotal(&self) -> f64 {
        self.unit_price * self.quantity
    }

    pub fn line_tax(&self) -> f64 {
        self.unit_tax() * self.quantity
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price_with_tax() * self.quantity
    }

    /// Flat line discount from the options.
    pub fn discount(&self) -> f64 {
        self.options.discount()
    }

    /// Raw pricing breakdown.
    pub fn pricing(&self) -> LineItemPricing {
        LineItemPricing::from_item(self)
    }

    /// Amounts rendered with `format`.
    pub fn formatted(&self, format: &NumberFormat) -> FormattedLineItem {
        FormattedLineItem {
            unit_price: format.format(self.unit_price),
            unit_price_with_tax: format.format(self.unit_price_with_tax()),
            unit_tax: format.format(self.unit_tax()),
            subtotal: format.format(self.line_subtotal()),
            tax: format.format(self.line_tax()),
            total: format.format(self.line_total()),
        }
    }

    /// Apply a partial update. The row id is kept.
    pub(crate) fn apply(&mut self, fields: ItemFields) {
        if let Some(product_id) = fields.product_id {
            self.product_id = product_id;
        }
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(unit_price) = fields.unit_price {
            self.unit_price = unit_price;
        }
        if let Some(quantity) = fields.quantity {
            self.quantity = quantity;
        }
        if let Some(options) = fields.options {
            self.options = options.without_stock();
        }
    }

    /// Durable-store shape of this item.
    pub fn to_row(&self) -> CartRow {
        CartRow {
            row_id: self.row_id.to_string(),
            product_id: self.product_id.to_string(),
            name: self.name.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
            options: self.options.to_json_map(),
        }
    }
}

/// Display strings for one line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedLineItem {
    pub unit_price: String,
    pub unit_price_with_tax: String,
    pub unit_tax: String,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
}

/// Validation record for a full line item.
pub(crate) fn item_record(
    product_id: &ProductId,
    name: &str,
    unit_price: &Amount,
    quantity: &Amount,
) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("product_id".into(), Value::String(product_id.to_string()));
    record.insert("name".into(), Value::String(name.to_string()));
    record.insert("price".into(), unit_price.to_json());
    record.insert("quantity".into(), quantity.to_json());
    record
}

/// Fields to change on an existing row. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFields {
    pub product_id: Option<ProductId>,
    pub name: Option<String>,
    pub unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub options: Option<OptionSet>,
}

impl ItemFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_id(mut self, product_id: impl Into<ProductId>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = Some(options);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.product_id.is_none()
            && self.name.is_none()
            && self.unit_price.is_none()
            && self.quantity.is_none()
            && self.options.is_none()
    }

    /// Validation record holding only the provided fields.
    pub(crate) fn record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        if let Some(product_id) = &self.product_id {
            record.insert("product_id".into(), Value::String(product_id.to_string()));
        }
        if let Some(name) = &self.name {
            record.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(unit_price) = self.unit_price {
            record.insert("price".into(), Amount::Number(unit_price).to_json());
        }
        if let Some(quantity) = self.quantity {
            record.insert("quantity".into(), Amount::Number(quantity).to_json());
        }
        record
    }
}

/// Change requested by [`Cart::update`](crate::Cart::update).
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPatch {
    /// Set the quantity only.
    Quantity(f64),
    /// Set any subset of fields.
    Fields(ItemFields),
}

impl From<f64> for ItemPatch {
    fn from(quantity: f64) -> Self {
        ItemPatch::Quantity(quantity)
    }
}

impl From<i32> for ItemPatch {
    fn from(quantity: i32) -> Self {
        ItemPatch::Quantity(f64::from(quantity))
    }
}

impl From<ItemFields> for ItemPatch {
    fn from(fields: ItemFields) -> Self {
        ItemPatch::Fields(fields)
    }
}
