use crate::error::Rejection;
use crate::types::Style;
use serde_json::Value;

/// Keys accepted in annotation styles and layer styles.
pub const STYLE_KEYS: &[&str] = &[
    "color",
    "fillColor",
    "opacity",
    "fillOpacity",
    "weight",
    "dashArray",
    "lineCap",
    "lineJoin",
];

/// Keys accepted in a layer's config.
pub const LAYER_CONFIG_KEYS: &[&str] = &["color"];

const MAX_COLOR_LEN: usize = 20;
const MAX_DASH_LEN: usize = 50;
const LINE_CAPS: &[&str] = &["butt", "round", "square"];
const LINE_JOINS: &[&str] = &["miter", "round", "bevel"];

/// Keeps allow-listed keys from an annotation style, checking each value.
pub fn sanitize_style(style: &Style) -> Result<Style, Rejection> {
    sanitize(style, STYLE_KEYS)
}

/// Keeps allow-listed keys from a layer config, checking each value.
pub fn sanitize_layer_config(config: &Style) -> Result<Style, Rejection> {
    sanitize(config, LAYER_CONFIG_KEYS)
}

fn sanitize(input: &Style, allowed: &[&str]) -> Result<Style, Rejection> {
    let mut clean = Style::new();

    for (key, value) in input {
        if !allowed.contains(&key.as_str()) {
            tracing::debug!(key = %key, "dropping style key outside allow-list");
            continue;
        }
        check_value(key, value)?;
        clean.insert(key.clone(), value.clone());
    }

    Ok(clean)
}

fn check_value(key: &str, value: &Value) -> Result<(), Rejection> {
    let reject = |reason| Rejection::InvalidStyle {
        key: key.to_string(),
        reason,
    };

    match key {
        "color" | "fillColor" => match value.as_str() {
            Some(s) if s.starts_with('#') && s.len() <= MAX_COLOR_LEN => Ok(()),
            _ => Err(reject("must be a hex color string")),
        },
        "opacity" | "fillOpacity" => match value.as_f64() {
            Some(v) if (0.0..=1.0).contains(&v) => Ok(()),
            _ => Err(reject("must be a number between 0 and 1")),
        },
        "weight" => match value.as_f64() {
            Some(v) if v >= 0.0 => Ok(()),
            _ => Err(reject("must be a non-negative number")),
        },
        "dashArray" => match value.as_str() {
            Some(s) if is_dash_pattern(s) => Ok(()),
            _ => Err(reject("must be a comma separated list of numbers")),
        },
        "lineCap" => match value.as_str() {
            Some(s) if LINE_CAPS.contains(&s) => Ok(()),
            _ => Err(reject("must be one of butt, round, square")),
        },
        "lineJoin" => match value.as_str() {
            Some(s) if LINE_JOINS.contains(&s) => Ok(()),
            _ => Err(reject("must be one of miter, round, bevel")),
        },
        _ => Ok(()),
    }
}

fn is_dash_pattern(s: &str) -> bool {
    s.len() <= MAX_DASH_LEN
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, ',' | ' ' | '.'))
}
