//! Decimal formatting for monetary amounts.

use serde::{Deserialize, Serialize};

/// How amounts are rendered as text.
///
/// Rounding is half away from zero, so `2.345` with two decimals is `"2.35"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    /// Digits after the decimal point.
    pub decimals: u32,
    /// Separator between whole and fractional digits.
    pub decimal_point: String,
    /// Separator between groups of three whole digits.
    #[serde(rename = "thousand_seperator", alias = "thousands_separator")]
    pub thousands_separator: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimals: 2,
            decimal_point: ".".to_string(),
            thousands_separator: ",".to_string(),
        }
    }
}

impl NumberFormat {
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_decimal_point(mut self, point: impl Into<String>) -> Self {
        self.decimal_point = point.into();
        self
    }

    pub fn with_thousands_separator(mut self, separator: impl Into<String>) -> Self {
        self.thousands_separator = separator.into();
        self
    }

    /// Round and render an amount.
    pub fn format(&self, value: f64) -> String {
        let decimals = self.decimals.min(15);
        let factor = 10f64.powi(decimals as i32);
        // f64::round already rounds half away from zero.
        let rounded = (value.abs() * factor).round() / factor;
        let fixed = format!("{:.*}", decimals as usize, rounded);

        let (whole, fraction) = match fixed.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
        if value < 0.0 && rounded != 0.0 {
            out.push('-');
        }
        let len = whole.len();
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push_str(&self.thousands_separator);
            }
            out.push(digit);
        }
        if let Some(fraction) = fraction {
            out.push_str(&self.decimal_point);
            out.push_str(fraction);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(220.0), "220.00");
        assert_eq!(fmt.format(0.0), "0.00");
        assert_eq!(fmt.format(1234567.891), "1,234,567.89");
    }

    #[test]
    fn test_half_away_from_zero() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format(2.125), "2.13");
        assert_eq!(fmt.format(-2.125), "-2.13");
        assert_eq!(fmt.format(0.5), "0.50");
        assert_eq!(NumberFormat::default().with_decimals(0).format(2.5), "3");
    }

    #[test]
    fn test_negative_zero_is_unsigned() {
        assert_eq!(NumberFormat::default().format(-0.001), "0.00");
    }

    #[test]
    fn test_custom_separators() {
        let fmt = NumberFormat::default()
            .with_decimal_point(",")
            .with_thousands_separator(".");
        assert_eq!(fmt.format(1234.5), "1.234,50");

        let plain = NumberFormat::default()
            .with_decimals(3)
            .with_thousands_separator("");
        assert_eq!(plain.format(98765.4321), "98765.432");
    }

    #[test]
    fn test_deserialize_config_spelling() {
        let fmt: NumberFormat =
            serde_json::from_str(r#"{"decimals": 1, "thousand_seperator": " "}"#).unwrap();
        assert_eq!(fmt.decimals, 1);
        assert_eq!(fmt.decimal_point, ".");
        assert_eq!(fmt.format(1000.25), "1 000.3");
    }
}
