use serde_json::Value;

use tessera_api::value::{js_string, to_number, value_at_path};
use tessera_api::{RenderNode, StatCardBlock, StatFormat};

use crate::render::context::RenderContext;

/// A headline figure read from the data context (or given literally).
pub fn build(block: &StatCardBlock, ctx: &RenderContext) -> RenderNode {
    let stat = |display: String, value: Value, loading: bool, error: Option<String>| RenderNode::Stat {
        label: block.label.clone(),
        display,
        value,
        loading,
        error,
    };

    if let Some(literal) = &block.value {
        return stat(format_value(literal, block), literal.clone(), false, None);
    }

    let key = ctx.config().data_key_or_default(block.data_key.as_deref());
    let envelope = ctx.data.by_key(key);
    if envelope.loading {
        return stat(String::new(), Value::Null, true, None);
    }
    if let Some(error) = &envelope.error {
        return stat(String::new(), Value::Null, false, Some(error.clone()));
    }

    let headline = envelope.headline();
    let value = match block.field.as_deref().filter(|f| !f.is_empty()) {
        Some(field) => value_at_path(headline, field).cloned().unwrap_or(Value::Null),
        None => headline.clone(),
    };
    stat(format_value(&value, block), value, false, None)
}

fn format_value(value: &Value, block: &StatCardBlock) -> String {
    let body = match block.format {
        StatFormat::Raw => match value {
            Value::Null => String::new(),
            other => js_string(other),
        },
        StatFormat::Number => group_thousands(to_number(value), block.decimals.unwrap_or(0)),
        StatFormat::Currency => group_thousands(to_number(value), block.decimals.unwrap_or(2)),
        StatFormat::Percent => format!("{}%", group_thousands(to_number(value), block.decimals.unwrap_or(1))),
    };
    format!(
        "{}{}{}",
        block.prefix.as_deref().unwrap_or_default(),
        body,
        block.suffix.as_deref().unwrap_or_default()
    )
}

/// Fixed decimals with `,` between thousands: `1234567.891` → `1,234,567.89`.
pub fn group_thousands(n: f64, decimals: u8) -> String {
    let formatted = format!("{:.*}", decimals as usize, n.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    let negative = n < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
