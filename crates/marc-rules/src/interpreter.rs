//! Field mapping interpreter
//!
//! Applies a [`RuleSet`] to a [`RawRecord`]:
//! - scalar targets: entries in document order, fields in record order,
//!   first satisfying pair wins
//! - array targets: fields in record order, every satisfied entry adds one element
//! - targets with nothing satisfied fall back to the first declared default
//!
//! The leader is visible to rules as the control field `LDR`.

use crate::path::{Segment, TargetPath};
use crate::rule::{RuleEntry, TargetRules, ValueSource};
use crate::ruleset::RuleSet;
use marc_record::{Field, RawRecord, LEADER_TAG};
use serde_json::{Map, Value};
use std::cell::OnceCell;

/// JSON object produced for one record
pub type DomainRecord = Map<String, Value>;

/// Map one record
///
/// Pure: the same record and rule set always yield the same output.
#[must_use]
pub fn map(record: &RawRecord, rules: &RuleSet) -> DomainRecord {
    let leader = Field::control(LEADER_TAG, record.leader().as_str());
    let fields: Vec<&Field> = std::iter::once(&leader).chain(record.fields()).collect();

    let mut out = Map::new();
    apply_targets(rules.targets(), &fields, &mut out);
    out
}

fn apply_targets(targets: &[TargetRules], fields: &[&Field], out: &mut Map<String, Value>) {
    for target in targets {
        if target.path().is_array() {
            let mut elements: Vec<Value> = fields
                .iter()
                .flat_map(|field| {
                    target
                        .entries()
                        .iter()
                        .filter_map(move |entry| evaluate(entry, field))
                })
                .collect();
            if elements.is_empty() {
                elements.extend(target.default().cloned());
            }
            for element in elements {
                append(out, target.path(), element);
            }
        } else {
            let value = target
                .entries()
                .iter()
                .find_map(|entry| fields.iter().find_map(|field| evaluate(entry, field)))
                .or_else(|| target.default().cloned());
            if let Some(value) = value {
                set_path(out, target.path().segments(), value);
            }
        }
    }
}

/// Value an entry yields for a field, if the field satisfies it
fn evaluate(entry: &RuleEntry, field: &Field) -> Option<Value> {
    if field.tag() != entry.tag() {
        return None;
    }

    let subject = OnceCell::new();
    let conditions_hold = entry.conditions().iter().all(|condition| {
        condition.holds(field, || {
            subject.get_or_init(|| entry.subject_text(field)).as_str()
        })
    });
    if !conditions_hold {
        return None;
    }

    match entry.source() {
        ValueSource::Extract(extraction) => {
            let text = extraction.extract(field);
            (!text.is_empty()).then_some(Value::String(text))
        }
        ValueSource::Static(value) => Some(value.clone()),
        ValueSource::Nested(targets) => {
            let mut object = Map::new();
            apply_targets(targets, &[field], &mut object);
            (!object.is_empty()).then_some(Value::Object(object))
        }
    }
}

/// Descend to the object at `segments`, replacing non-objects on the way
fn object_at<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[Segment],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.name())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut()?;
    }
    Some(current)
}

/// Set a scalar path
fn set_path(root: &mut Map<String, Value>, segments: &[Segment], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    if let Some(object) = object_at(root, parents) {
        object.insert(last.name().to_string(), value);
    }
}

/// Append one element to the array a path names
fn append(root: &mut Map<String, Value>, path: &TargetPath, value: Value) {
    let (to_array, element_path) = path.split_at_array();
    let Some((array_segment, parents)) = to_array.split_last() else {
        return;
    };
    let Some(object) = object_at(root, parents) else {
        return;
    };

    let slot = object
        .entry(array_segment.name())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }

    let element = if element_path.is_empty() {
        value
    } else {
        let mut object = Map::new();
        set_path(&mut object, element_path, value);
        Value::Object(object)
    };
    if let Some(items) = slot.as_array_mut() {
        items.push(element);
    }
}
