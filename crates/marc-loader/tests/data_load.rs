use marc_loader::{DecodeErrorPolicy, LoaderConfig, LoaderService};
use marc_test_utils::{concat_records, sample_book, sample_rules_bytes, RecordBuilder};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;

const TENANT: &str = "diku";

fn service(config: LoaderConfig) -> LoaderService {
    let service = LoaderService::new(config.with_assign_instance_ids(false));
    let response = service.load_rules(TENANT, &sample_rules_bytes()).unwrap();
    assert_eq!(response.status, 201);
    assert!(response.body.is_empty());
    service
}

fn parse_line(line: &str) -> (usize, Value) {
    let (ordinal, json) = line.split_once('|').unwrap();
    (ordinal.parse().unwrap(), serde_json::from_str(json).unwrap())
}

#[test]
fn each_record_becomes_one_numbered_line() {
    let service = service(LoaderConfig::default());
    let bytes = concat_records(&[
        sample_book("ocm1", "First"),
        sample_book("ocm2", "Second"),
        sample_book("ocm3", "Third"),
    ]);

    let response = service.load_data(TENANT, "s1", &bytes).unwrap();
    assert_eq!(response.status, 201);
    assert!(response.skipped.is_empty());

    let lines: Vec<(usize, Value)> = response.lines().map(parse_line).collect();
    let ordinals: Vec<usize> = lines.iter().map(|(n, _)| *n).collect();
    let hrids: Vec<&str> = lines.iter().map(|(_, v)| v["hrid"].as_str().unwrap()).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);
    assert_eq!(hrids, vec!["ocm1", "ocm2", "ocm3"]);
    assert_eq!(lines[1].1["title"], json!("Second a subtitle"));
}

#[test]
fn mapped_line_is_exact() {
    let service = service(LoaderConfig::default());
    let bytes = RecordBuilder::new()
        .field("245", "00", &[('a', "X")])
        .build();

    let response = service.load_data(TENANT, "s1", &bytes).unwrap();
    assert_eq!(response.body, "1|{\"title\":\"X\",\"source\":\"MARC\"}\n");
}

#[test]
fn empty_body_yields_no_lines() {
    let service = service(LoaderConfig::default());
    let response = service.load_data(TENANT, "s1", b"").unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.body, "");
}

#[test]
fn data_load_without_rules_is_rejected() {
    let service = LoaderService::default();
    let err = service
        .load_data(TENANT, "s1", &sample_book("1", "A").build())
        .unwrap_err();
    assert_eq!(err.kind(), "NoRuleSet");
    assert_eq!(err.status(), 400);
}

#[test]
fn rules_are_per_tenant() {
    let service = service(LoaderConfig::default());
    let err = service
        .load_data("other", "s1", &sample_book("1", "A").build())
        .unwrap_err();
    assert_eq!(err.kind(), "NoRuleSet");
    assert_eq!(err.to_string(), "no rule set loaded for tenant 'other'");
}

#[test]
fn rejected_rules_keep_the_previous_set() {
    let service = service(LoaderConfig::default());
    let err = service.load_rules(TENANT, b"{\"title\": [").unwrap_err();
    assert_eq!(err.kind(), "InvalidRuleSyntax");
    assert_eq!(err.status(), 400);

    let err = service
        .load_rules(TENANT, br#"{"title": [{"tag": "24"}]}"#)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidRuleSchema");

    let response = service.load_data(TENANT, "s1", &sample_book("1", "A").build()).unwrap();
    assert_eq!(response.lines().count(), 1);
}

#[test]
fn reloading_rules_replaces_them() {
    let service = service(LoaderConfig::default());
    service
        .load_rules(TENANT, br#"{"hrid": [{"tag": "001"}]}"#)
        .unwrap();
    let response = service.load_data(TENANT, "s1", &sample_book("ocm9", "A").build()).unwrap();
    assert_eq!(response.body, "1|{\"hrid\":\"ocm9\"}\n");
}

#[test]
fn malformed_record_aborts_by_default() {
    let service = service(LoaderConfig::default());
    let mut bytes = sample_book("1", "A").build();
    bytes.extend_from_slice(b"12x45 not a record\x1d");
    bytes.extend(sample_book("3", "C").build());

    let err = service.load_data(TENANT, "s1", &bytes).unwrap_err();
    assert_eq!(err.kind(), "MalformedRecord");
    assert_eq!(err.status(), 400);
    assert!(err.to_string().contains("record #2"));
}

#[test]
fn skip_policy_leaves_ordinal_gap() {
    let service = service(LoaderConfig::new().with_decode_error_policy(DecodeErrorPolicy::Skip));
    let mut bytes = sample_book("1", "A").build();
    let bad_offset = bytes.len() as u64;
    bytes.extend_from_slice(b"12x45 not a record\x1d");
    bytes.extend(sample_book("3", "C").build());

    let response = service.load_data(TENANT, "s1", &bytes).unwrap();
    let ordinals: Vec<usize> = response.lines().map(|l| parse_line(l).0).collect();
    assert_eq!(ordinals, vec![1, 3]);

    assert_eq!(response.skipped.len(), 1);
    let failure = &response.skipped[0];
    assert_eq!(failure.ordinal, Some(2));
    assert_eq!(failure.offset, bad_offset);
    assert_eq!(failure.kind, "MalformedRecord");
}

#[test]
fn truncated_tail() {
    let mut bytes = concat_records(&[sample_book("1", "A"), sample_book("2", "B")]);
    bytes.extend_from_slice(b"00200nam a22");

    let err = service(LoaderConfig::default())
        .load_data(TENANT, "s1", &bytes)
        .unwrap_err();
    assert_eq!(err.kind(), "TruncatedStream");

    let response = service(LoaderConfig::new().with_decode_error_policy(DecodeErrorPolicy::Skip))
        .load_data(TENANT, "s1", &bytes)
        .unwrap();
    assert_eq!(response.lines().count(), 2);
    assert_eq!(response.skipped[0].kind, "TruncatedStream");
    assert_eq!(response.skipped[0].ordinal, Some(3));
}

#[test]
fn generated_instance_ids() {
    let service = LoaderService::new(LoaderConfig::default());
    service.load_rules(TENANT, &sample_rules_bytes()).unwrap();
    let bytes = concat_records(&[sample_book("1", "A"), sample_book("2", "B")]);

    let response = service.load_data(TENANT, "s1", &bytes).unwrap();
    let ids: Vec<String> = response
        .lines()
        .map(|l| {
            let (_, value) = parse_line(l);
            let object = value.as_object().unwrap();
            assert_eq!(object.keys().next().map(String::as_str), Some("id"));
            object["id"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[test]
fn mapped_id_is_kept() {
    let service = LoaderService::new(LoaderConfig::default());
    service.load_rules(TENANT, br#"{"id": [{"tag": "001"}]}"#).unwrap();
    let response = service.load_data(TENANT, "s1", &sample_book("ocm7", "A").build()).unwrap();
    assert_eq!(response.body, "1|{\"id\":\"ocm7\"}\n");
}

#[test]
fn config_file_drives_the_service() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "decode_error_policy = \"skip\"").unwrap();
    writeln!(file, "assign_instance_ids = false").unwrap();
    writeln!(file, "default_separator = \"/\"").unwrap();
    let config = LoaderConfig::from_path(file.path()).unwrap();

    let service = LoaderService::new(config);
    service
        .load_rules(TENANT, br#"{"title": [{"tag": "245", "subfields": ["a", "b"]}]}"#)
        .unwrap();
    let mut bytes = b"xxxxx\x1d".to_vec();
    bytes.extend(
        RecordBuilder::new()
            .field("245", "00", &[('a', "Main"), ('b', "Sub")])
            .build(),
    );

    let response = service.load_data(TENANT, "s1", &bytes).unwrap();
    assert_eq!(response.body, "2|{\"title\":\"Main/Sub\"}\n");
    assert_eq!(response.skipped.len(), 1);
}
