use marc_loader::{LoaderConfig, LoaderService};
use marc_test_utils::{concat_records, sample_book, sample_rules_bytes, RecordBuilder};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_n_records_give_n_ordered_lines(titles in proptest::collection::vec("[A-Za-z ]{1,20}", 0..12)) {
        let service = LoaderService::new(LoaderConfig::default());
        service.load_rules("diku", &sample_rules_bytes()).unwrap();

        let builders: Vec<RecordBuilder> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| sample_book(&format!("ocm{i}"), title))
            .collect();
        let response = service.load_data("diku", "s", &concat_records(&builders)).unwrap();

        let ordinals: Vec<usize> = response
            .lines()
            .map(|line| line.split_once('|').unwrap().0.parse().unwrap())
            .collect();
        prop_assert_eq!(ordinals, (1..=titles.len()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_lines_never_contain_newlines(title in "[^\u{1d}\u{1e}\u{1f}]{1,40}") {
        let service = LoaderService::new(LoaderConfig::default());
        service.load_rules("diku", &sample_rules_bytes()).unwrap();

        let response = service.load_data("diku", "s", &sample_book("1", &title).build()).unwrap();
        prop_assert_eq!(response.lines().count(), 1);
        prop_assert!(response.body.ends_with('\n'));
    }
}
