//! Property tests for the dispatcher.
//!
//! Invariants tested:
//! - Group results follow input order whatever the completion order
//! - Every input gets exactly one result

use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower_rest_dispatch::Dispatcher;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: the i-th result belongs to the i-th input
    #[test]
    fn group_preserves_input_order(delays in prop::collection::vec(0u64..20, 0..16)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dispatcher = Dispatcher::new();
            let futures = delays.iter().copied().enumerate().map(|(i, ms)| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                i
            });

            let results = dispatcher.dispatch_group(futures).await.unwrap();
            prop_assert_eq!(results.len(), delays.len());
            for (i, result) in results.into_iter().enumerate() {
                prop_assert_eq!(result, Ok(i));
            }
            Ok(())
        })?;
    }
}
