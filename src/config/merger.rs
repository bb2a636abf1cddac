//! Deep merge algorithm for TOML configuration values.
//!
//! `teststack.local.toml` is layered over `teststack.toml`. This module
//! implements the merge semantics.
//!
//! # Merge Rules
//!
//! - Tables are merged recursively
//! - Arrays are replaced entirely (not merged)
//! - Scalars in overlay replace scalars in base

use toml::Value;

/// Deep merge two TOML values.
///
/// Later values override earlier values at the point of conflict.
/// Tables are merged recursively. Arrays are replaced entirely.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            let mut result = base_table.clone();

            for (key, overlay_value) in overlay_table {
                let merged = match base_table.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }

            Value::Table(result)
        }

        // Overlay is not a table, or base is not a table: overlay wins
        (_, overlay) => overlay.clone(),
    }
}

/// Merge multiple configs in order (later overrides earlier).
pub fn merge_configs(configs: &[Value]) -> Value {
    configs
        .iter()
        .fold(Value::Table(Default::default()), |acc, config| {
            deep_merge(&acc, config)
        })
}
