//! Static definition loading
//!
//! A definition is `{"type": "<shape>", "values": [{...}, ...]}`. Every value is
//! validated before any record is produced, so a load either yields one record
//! per value, in input order, or fails as a whole.

use crate::error::{StaticLoadError, StaticResult};
use crate::shape::{Shape, ShapeCatalog};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// Reserved identifier field
pub const ID_FIELD: &str = "id";

/// One produced reference record
#[derive(Debug, Clone, PartialEq)]
pub struct StaticRecord {
    id: String,
    fields: Map<String, Value>,
}

impl StaticRecord {
    /// Identifier, as supplied or generated
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fields other than the identifier
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Full JSON object, identifier first
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        object.extend(self.fields.clone());
        Value::Object(object)
    }
}

impl Serialize for StaticRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Records produced by one load
#[derive(Debug, Clone, PartialEq)]
pub struct StaticBatch {
    record_type: String,
    records: Vec<StaticRecord>,
}

impl StaticBatch {
    /// Canonical shape name
    #[inline]
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Records in input order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[StaticRecord] {
        &self.records
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a successful load
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take the records
    #[must_use]
    pub fn into_records(self) -> Vec<StaticRecord> {
        self.records
    }
}

/// Validates static definitions against a [`ShapeCatalog`]
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    catalog: ShapeCatalog,
}

impl StaticLoader {
    /// Create loader over a catalog
    #[inline]
    #[must_use]
    pub fn new(catalog: ShapeCatalog) -> Self {
        Self { catalog }
    }

    /// Shapes this loader knows
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    /// Load a definition whose `type` field names the shape
    ///
    /// # Errors
    /// See [`StaticLoadError`].
    pub fn load(&self, bytes: &[u8]) -> StaticResult<StaticBatch> {
        self.load_with(None, bytes)
    }

    /// Load a definition for an explicit shape
    ///
    /// A `type` field in the document, if any, must name the same shape.
    ///
    /// # Errors
    /// See [`StaticLoadError`].
    pub fn load_as(&self, record_type: &str, bytes: &[u8]) -> StaticResult<StaticBatch> {
        self.load_with(Some(record_type), bytes)
    }

    fn load_with(&self, requested: Option<&str>, bytes: &[u8]) -> StaticResult<StaticBatch> {
        let document: Value = serde_json::from_slice(bytes).map_err(StaticLoadError::InvalidJson)?;
        let Value::Object(mut document) = document else {
            return Err(StaticLoadError::unknown_type(
                requested.unwrap_or_default(),
                "definition must be a JSON object with a values collection",
            ));
        };

        let shape = self.resolve_shape(requested, document.get("type"))?;
        let values = match document.remove("values") {
            Some(Value::Array(values)) => values,
            Some(_) => {
                return Err(StaticLoadError::unknown_type(
                    &shape.name,
                    "values must be an array",
                ))
            }
            None => {
                return Err(StaticLoadError::unknown_type(
                    &shape.name,
                    "definition has no values collection",
                ))
            }
        };
        if values.is_empty() {
            return Err(StaticLoadError::EmptyValueSet {
                record_type: shape.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        let definitions = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                validate(shape, &value, &mut seen)
                    .map_err(|message| StaticLoadError::invalid_definition(&shape.name, index, message))?;
                match value {
                    Value::Object(fields) => Ok(fields),
                    _ => Err(StaticLoadError::invalid_definition(&shape.name, index, "not an object")),
                }
            })
            .collect::<StaticResult<Vec<_>>>()?;

        let mut generated = 0usize;
        let records: Vec<StaticRecord> = definitions
            .into_iter()
            .map(|mut fields| {
                let id = match fields.shift_remove(ID_FIELD) {
                    Some(Value::String(id)) => id,
                    _ => {
                        generated += 1;
                        Uuid::new_v4().to_string()
                    }
                };
                StaticRecord { id, fields }
            })
            .collect();

        tracing::info!(
            record_type = %shape.name,
            records = records.len(),
            generated_ids = generated,
            "loaded static definition"
        );
        Ok(StaticBatch {
            record_type: shape.name.clone(),
            records,
        })
    }

    fn resolve_shape(&self, requested: Option<&str>, declared: Option<&Value>) -> StaticResult<&Shape> {
        let declared = match declared {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.as_str()),
            Some(other) => {
                return Err(StaticLoadError::unknown_type(
                    other.to_string(),
                    "type must be a string",
                ))
            }
        };
        let Some(name) = requested.or(declared) else {
            return Err(StaticLoadError::unknown_type("", "definition names no type"));
        };
        let shape = self.catalog.resolve(name).ok_or_else(|| {
            StaticLoadError::unknown_type(
                name,
                format!("known types are {}", self.catalog.names().join(", ")),
            )
        })?;
        if let Some(declared) = declared {
            if !shape.answers_to(declared) {
                return Err(StaticLoadError::unknown_type(
                    declared,
                    format!("document type does not match requested type '{}'", shape.name),
                ));
            }
        }
        Ok(shape)
    }
}

/// Check one value definition against its shape
fn validate(shape: &Shape, value: &Value, seen: &mut HashSet<String>) -> Result<(), String> {
    let Value::Object(fields) = value else {
        return Err(format!("expected an object, got {}", json_type(value)));
    };

    for name in &shape.required {
        if fields.get(name).map_or(true, Value::is_null) {
            return Err(format!("missing required field '{name}'"));
        }
    }
    for name in &shape.strings {
        match fields.get(name) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(Value::String(_)) => return Err(format!("field '{name}' is empty")),
            Some(other) => {
                return Err(format!("field '{name}' must be a string, got {}", json_type(other)))
            }
        }
    }
    for name in &shape.objects {
        match fields.get(name) {
            None | Some(Value::Null | Value::Object(_)) => {}
            Some(other) => {
                return Err(format!("field '{name}' must be an object, got {}", json_type(other)))
            }
        }
    }

    match fields.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(id)) => {
            Uuid::parse_str(id).map_err(|e| format!("id '{id}' is not a valid UUID: {e}"))?;
            if seen.insert(id.clone()) {
                Ok(())
            } else {
                Err(format!("id '{id}' appears more than once"))
            }
        }
        Some(other) => Err(format!("id must be a string, got {}", json_type(other))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
