use std::collections::HashMap;

use crate::schema::Schema;

/// One environment value bound to a schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvValue {
    /// Dotted path of the field.
    pub key: String,
    /// The variable it was read from.
    pub var: String,
    pub raw: String,
}

/// Collect the env values for every field with an env var name.
///
/// A field's name is its explicit `environ` name or, with `auto_environ`, the
/// name derived from its path; the schema has already picked one, so a field
/// never reads two variables. Values stay raw strings here and are parsed
/// according to the field's type during resolution.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_values(schema: &Schema, vars: impl IntoIterator<Item = (String, String)>) -> Vec<EnvValue> {
    let vars: HashMap<String, String> = vars.into_iter().collect();
    schema
        .leaves()
        .into_iter()
        .filter_map(|(key, field)| {
            let var = field.environ_name()?;
            let raw = vars.get(var)?;
            Some(EnvValue {
                key,
                var: var.to_string(),
                raw: raw.clone(),
            })
        })
        .collect()
}
