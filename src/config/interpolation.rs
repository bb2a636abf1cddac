//! Environment variable interpolation for configuration strings.
//!
//! String values may reference environment variables as `{NAME}`:
//!
//! ```toml
//! [services.database]
//! image = "postgres:{POSTGRES_VERSION}"
//! ```
//!
//! A string is rewritten only when *every* placeholder in it names a
//! set variable. Otherwise it is left exactly as written. Step commands
//! under `[tests.steps]` are never interpolated: they are shell commands,
//! and `{posargs}` belongs to the step executor.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use toml::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Extract the placeholder names in a string.
pub fn extract_variables(input: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(input)
        .map(|c| c[1].to_string())
        .collect()
}

/// Resolve a single string against `vars`.
///
/// Returns the input unchanged if any placeholder is missing from `vars`.
pub fn interpolate_str(input: &str, vars: &HashMap<String, String>) -> String {
    let names = extract_variables(input);
    if names.is_empty() || !names.iter().all(|n| vars.contains_key(n)) {
        return input.to_string();
    }

    PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| vars[&caps[1]].clone())
        .into_owned()
}

/// Recursively interpolate every string in a TOML value.
pub fn interpolate_value(value: &mut Value, vars: &HashMap<String, String>) {
    match value {
        Value::String(s) => {
            let resolved = interpolate_str(s, vars);
            if resolved != *s {
                tracing::debug!("Interpolated config value '{}' -> '{}'", s, resolved);
                *s = resolved;
            }
        }
        Value::Array(items) => {
            for item in items {
                interpolate_value(item, vars);
            }
        }
        Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                interpolate_value(item, vars);
            }
        }
        _ => {}
    }
}

/// Interpolate a whole configuration document, skipping `tests.steps`.
pub fn interpolate_config(value: &mut Value, vars: &HashMap<String, String>) {
    let Value::Table(root) = value else {
        return;
    };

    for (section, item) in root.iter_mut() {
        match (section.as_str(), item) {
            ("tests", Value::Table(tests)) => {
                for (key, entry) in tests.iter_mut() {
                    if key != "steps" {
                        interpolate_value(entry, vars);
                    }
                }
            }
            (_, item) => interpolate_value(item, vars),
        }
    }
}
