//! Field validation for line item input.
//!
//! Input is checked as a JSON object against a [`RuleSet`]. The first
//! failing rule produces a human-readable message such as
//! `"The price must be a number."`.

use serde_json::{Map, Value};

/// A single field rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Present, not null, and not blank text.
    Required,
    /// A finite number, or text that parses as one.
    Numeric,
    /// Numeric and at least the bound.
    Min(f64),
}

/// Ordered rules per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    fields: Vec<(String, Vec<Rule>)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rules for a field.
    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push((name.into(), rules.into_iter().collect()));
        self
    }

    /// Rules for a complete line item.
    pub fn line_item() -> Self {
        Self::new()
            .field("product_id", [Rule::Required])
            .field("name", [Rule::Required])
            .field("price", [Rule::Required, Rule::Numeric, Rule::Min(0.0)])
            .field("quantity", [Rule::Required, Rule::Numeric, Rule::Min(1.0)])
    }

    /// Keep only the rules for fields present in `record`.
    pub fn restricted_to(mut self, record: &Map<String, Value>) -> Self {
        self.fields.retain(|(name, _)| record.contains_key(name));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Checks a record against rules.
pub trait FieldValidator: Send + Sync {
    /// Return the first failure message, if any.
    fn validate(&self, record: &Map<String, Value>, rules: &RuleSet) -> Result<(), String>;
}

/// Default [`FieldValidator`] evaluating [`Rule`]s in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl FieldValidator for RuleValidator {
    fn validate(&self, record: &Map<String, Value>, rules: &RuleSet) -> Result<(), String> {
        for (field, field_rules) in rules.iter() {
            let value = record.get(field);
            let label = field.replace('_', " ");

            if !is_present(value) {
                if field_rules.contains(&Rule::Required) {
                    return Err(format!("The {label} field is required."));
                }
                continue;
            }

            for rule in field_rules {
                match rule {
                    Rule::Required => {}
                    Rule::Numeric => {
                        if value.and_then(numeric).is_none() {
                            return Err(format!("The {label} must be a number."));
                        }
                    }
                    Rule::Min(bound) => {
                        if let Some(n) = value.and_then(numeric) {
                            if n < *bound {
                                return Err(format!("The {label} must be at least {bound}."));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Numeric reading of a JSON value.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
