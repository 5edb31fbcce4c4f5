//! Testing utilities for the MARC loader workspace
//!
//! Shared fixtures: an ISO 2709 record builder and small rule documents.

#![allow(missing_docs)]

use marc_record::{
    RawRecord, FIELD_TERMINATOR, LEADER_LEN, RECORD_TERMINATOR, SUBFIELD_DELIMITER,
};

/// Builds one ISO 2709 record field by field
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    status_and_type: String,
    fields: Vec<(String, Vec<u8>)>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status_and_type: "nam a".to_string(),
            fields: Vec::new(),
        }
    }

    /// Leader positions 5-9 (status, type, level, control, encoding)
    #[must_use]
    pub fn with_leader_codes(mut self, codes: &str) -> Self {
        assert_eq!(codes.len(), 5, "leader codes cover positions 5-9");
        self.status_and_type = codes.to_string();
        self
    }

    #[must_use]
    pub fn control(mut self, tag: &str, data: &str) -> Self {
        self.fields.push((tag.to_string(), data.as_bytes().to_vec()));
        self
    }

    /// Data field; `indicators` is the two indicator characters
    #[must_use]
    pub fn field(mut self, tag: &str, indicators: &str, subfields: &[(char, &str)]) -> Self {
        let mut body = indicators.as_bytes().to_vec();
        for (code, value) in subfields {
            body.push(SUBFIELD_DELIMITER);
            let mut buf = [0u8; 4];
            body.extend_from_slice(code.encode_utf8(&mut buf).as_bytes());
            body.extend_from_slice(value.as_bytes());
        }
        self.fields.push((tag.to_string(), body));
        self
    }

    /// Serialize to ISO 2709 bytes
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut data = Vec::new();
        for (tag, body) in &self.fields {
            let length = body.len() + 1;
            directory.extend_from_slice(format!("{tag}{length:04}{:05}", data.len()).as_bytes());
            data.extend_from_slice(body);
            data.push(FIELD_TERMINATOR);
        }
        directory.push(FIELD_TERMINATOR);

        let base = LEADER_LEN + directory.len();
        let total = base + data.len() + 1;
        let mut out = format!("{total:05}{}22{base:05} a 4500", self.status_and_type).into_bytes();
        out.extend_from_slice(&directory);
        out.extend_from_slice(&data);
        out.push(RECORD_TERMINATOR);
        out
    }

    /// Build and decode
    #[must_use]
    pub fn build_record(&self) -> RawRecord {
        RawRecord::parse(&self.build()).unwrap()
    }
}

/// Concatenate several records into one stream
#[must_use]
pub fn concat_records(builders: &[RecordBuilder]) -> Vec<u8> {
    builders.iter().flat_map(RecordBuilder::build).collect()
}

/// A book record with control number, ISBNs, title and subjects
#[must_use]
pub fn sample_book(control_number: &str, title: &str) -> RecordBuilder {
    RecordBuilder::new()
        .control("001", control_number)
        .control("008", "850101s1985    nyu           000 0 eng d")
        .field("020", "  ", &[('a', "0394502884")])
        .field("100", "1 ", &[('a', "Doe, Jane,"), ('d', "1950-")])
        .field("245", "10", &[('a', title), ('b', "a subtitle /"), ('c', "Jane Doe.")])
        .field("650", " 0", &[('a', "Cataloging"), ('x', "Data processing.")])
        .field("650", " 0", &[('a', "Metadata.")])
}

/// Rules that cover the fields of [`sample_book`]
#[must_use]
pub fn sample_rules() -> serde_json::Value {
    serde_json::json!({
        "hrid": [{ "tag": "001" }],
        "language": [{ "tag": "008", "range": { "start": 35, "end": 38 } }],
        "title": [{
            "tag": "245",
            "subfields": ["a", "b"],
            "transform": ["trim_punctuation"]
        }],
        "identifiers[]": [{
            "tag": "020",
            "object": {
                "value": [{ "subfields": ["a"] }],
                "identifierType": [{ "value": "ISBN" }]
            }
        }],
        "contributors[].name": [{
            "tag": "100",
            "subfields": ["a"],
            "transform": ["trim_punctuation"]
        }],
        "subjects[]": [{
            "tag": "650",
            "subfields": "all",
            "separator": "--",
            "transform": ["trim_punctuation"]
        }],
        "source": [{ "tag": "999", "default": "MARC" }]
    })
}

#[must_use]
pub fn sample_rules_bytes() -> Vec<u8> {
    serde_json::to_vec(&sample_rules()).unwrap()
}

/// Static definition with three fixed identifiers
#[must_use]
pub fn material_types_with_ids(ids: [&str; 3]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": "material_types",
        "values": [
            { "id": ids[0], "name": "book" },
            { "id": ids[1], "name": "dvd" },
            { "id": ids[2], "name": "microform" }
        ]
    }))
    .unwrap()
}
