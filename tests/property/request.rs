//! Property tests for request building.
//!
//! Invariants tested:
//! - Header names are case-insensitive and the last write wins
//! - Query parameters keep insertion order, duplicates included
//! - Building never panics on arbitrary URLs

use proptest::prelude::*;
use std::collections::HashMap;
use tower_rest::Request;

fn header_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["accept", "x-trace", "authorization", "x-tenant"]).prop_flat_map(
        |name| {
            prop::collection::vec(any::<bool>(), name.len()).prop_map(move |upper| {
                name.chars()
                    .zip(upper)
                    .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                    .collect::<String>()
            })
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: each header appears once, with the value written last
    #[test]
    fn headers_are_last_write_wins(
        writes in prop::collection::vec((header_name(), "[a-z0-9]{1,8}"), 0..16),
    ) {
        let mut expected = HashMap::new();
        let mut req = Request::get("http://localhost/");
        for (name, value) in &writes {
            expected.insert(name.to_ascii_lowercase(), value.clone());
            req = req.header(name.clone(), value.clone());
        }

        let built = req.build().unwrap();
        prop_assert_eq!(built.headers().len(), expected.len());
        for (name, value) in &expected {
            prop_assert_eq!(built.headers().get_all(name.as_str()).iter().count(), 1);
            prop_assert_eq!(built.headers()[name.as_str()].to_str().unwrap(), value.as_str());
        }
    }

    /// Property: query parameters are appended in insertion order
    #[test]
    fn query_keeps_insertion_order(
        params in prop::collection::vec(("[a-z]{1,4}", "[a-z0-9]{0,6}"), 1..10),
    ) {
        let mut req = Request::get("http://localhost/items");
        for (name, value) in &params {
            req = req.query(name.clone(), value.clone());
        }

        let built = req.build().unwrap();
        let expected = params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        prop_assert_eq!(built.uri().query(), Some(expected.as_str()));
    }

    /// Property: arbitrary URLs produce a request or an error, never a panic
    #[test]
    fn build_never_panics(url in ".{0,40}") {
        let _ = Request::get(url).header("accept", "*/*").build();
    }
}
