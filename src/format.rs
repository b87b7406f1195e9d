//! Display formatting for metric values.

use serde::{Deserialize, Serialize};

use crate::model::ValueFormat;

/// How metric values are rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    /// Prefix for currency values
    pub currency_symbol: String,
    /// Decimal places for currency and unformatted values
    pub decimals: usize,
    /// Decimal places for percentages
    pub percent_decimals: usize,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            decimals: 2,
            percent_decimals: 1,
        }
    }
}

/// Render a metric value.
///
/// Null and non-finite values have no display string. Without a format the
/// value is grouped by thousands with up to `decimals` places and trailing
/// zeros trimmed.
pub fn format_value(value: Option<f64>, format: Option<ValueFormat>, settings: &FormatSettings) -> Option<String> {
    let v = value.filter(|v| v.is_finite())?;
    let text = match format {
        Some(ValueFormat::Currency) => {
            let body = group_thousands(&format!("{:.*}", settings.decimals, v.abs()));
            let sign = if v < 0.0 { "-" } else { "" };
            format!("{}{}{}", sign, settings.currency_symbol, body)
        }
        Some(ValueFormat::Integer) => group_thousands(&format!("{:.0}", v)),
        Some(ValueFormat::Percent) => format!("{:.*}%", settings.percent_decimals, v),
        None => {
            let fixed = format!("{:.*}", settings.decimals, v);
            let trimmed = if fixed.contains('.') {
                fixed.trim_end_matches('0').trim_end_matches('.')
            } else {
                fixed.as_str()
            };
            group_thousands(trimmed)
        }
    };
    // a negative that rounded to zero drops its sign
    let rounded_to_zero = !text.bytes().any(|b| matches!(b, b'1'..=b'9'));
    match text.strip_prefix('-') {
        Some(unsigned) if rounded_to_zero => Some(unsigned.to_string()),
        _ => Some(text),
    }
}

/// Insert `,` separators into the integer part of a plain decimal string.
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
