use marc_static::StaticLoader;
use proptest::prelude::*;
use serde_json::{json, Value};

fn uuid_string() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| {
        let hex = format!("{n:032x}");
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    })
}

proptest! {
    #[test]
    fn prop_supplied_ids_come_back_in_order(
        ids in proptest::collection::hash_set(uuid_string(), 1..20)
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let values: Vec<Value> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| json!({ "id": id, "name": format!("type {i}") }))
            .collect();
        let bytes = serde_json::to_vec(&json!({ "type": "material_types", "values": values })).unwrap();

        let batch = StaticLoader::default().load(&bytes).unwrap();
        let loaded: Vec<&str> = batch.records().iter().map(|r| r.id()).collect();
        prop_assert_eq!(loaded, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_generated_ids_are_unique(count in 1..50usize) {
        let values: Vec<Value> = (0..count).map(|i| json!({ "name": format!("t{i}") })).collect();
        let bytes = serde_json::to_vec(&json!({ "type": "loan_types", "values": values })).unwrap();

        let batch = StaticLoader::default().load(&bytes).unwrap();
        let unique: std::collections::HashSet<&str> = batch.records().iter().map(|r| r.id()).collect();
        prop_assert_eq!(unique.len(), count);
    }

    #[test]
    fn prop_non_json_is_invalid_json(text in "x[a-z ]{0,40}") {
        let err = StaticLoader::default().load(text.as_bytes()).unwrap_err();
        prop_assert_eq!(err.kind(), "InvalidJson");
    }
}
