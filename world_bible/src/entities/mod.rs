//! Entity records and naming.

mod names;

pub use names::*;

use serde_json::Value;

/// Default key holding an entity's name.
pub const DEFAULT_NAME_KEY: &str = "Name";

/// An entity is an arbitrary nested record identified by a name field.
pub type Entity = Value;

/// Read an entity's name using the first key of `name_keys` that holds a
/// non-blank string.
pub fn entity_name<'a>(entity: &'a Entity, name_keys: &[&str]) -> Option<&'a str> {
    let map = entity.as_object()?;
    name_keys
        .iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|name| !name.is_empty())
}
