//! Placeholder interpolation for block strings

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tessera_api::value::js_string;

/// `${name}` or `{name}`; the first alternative wins at a `$`.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}|\{(\w+)\}").unwrap());

/// Replace `${name}` / `{name}` placeholders with values from `params`.
///
/// Placeholders whose name is not a key of `params` are left exactly as
/// written so that missing bindings stay visible in the output.
pub fn interpolate(template: &str, params: &Map<String, Value>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match params.get(name) {
                Some(value) => js_string(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
