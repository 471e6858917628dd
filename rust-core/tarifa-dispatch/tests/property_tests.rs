// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for target parsing and dispatch

use std::sync::Arc;

use proptest::prelude::*;
use tarifa_dispatch::{split_service_method, DispatchError, Dispatcher};

struct Adder;

/// Generate identifier-like segments
fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,12}"
}

fn adder() -> Dispatcher<Adder> {
    Dispatcher::builder("AdderV1", Arc::new(Adder))
        .register("Add", |_svc: Arc<Adder>, (a, b): (i32, i32)| async move {
            Ok::<_, std::fmt::Error>(a.wrapping_add(b))
        })
        .unwrap()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_two_segments_always_split(service in arb_segment(), method in arb_segment()) {
        let target = format!("{service}.{method}");
        prop_assert_eq!(
            split_service_method(&target),
            Some((service.as_str(), method.as_str()))
        );
    }

    #[test]
    fn test_other_segment_counts_are_unsupported(
        segments in prop::collection::vec(arb_segment(), 0..6)
    ) {
        prop_assume!(segments.len() != 2);
        let target = segments.join(".");

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let dispatcher = adder();
            let mut reply = i32::MIN;
            let result = dispatcher.dispatch(&target, Box::new((1, 2)), &mut reply).await;
            let unsupported = matches!(result, Err(DispatchError::UnsupportedMethod { .. }));
            prop_assert!(unsupported);
            prop_assert_eq!(reply, i32::MIN);

            Ok(())
        })?;
    }

    #[test]
    fn test_dispatch_equals_direct_call(a in any::<i32>(), b in any::<i32>(), service in arb_segment()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let dispatcher = adder();
            let target = format!("{service}.Add");
            let sum: i32 = dispatcher.call_typed(&target, (a, b)).await.unwrap();
            prop_assert_eq!(sum, a.wrapping_add(b));

            Ok(())
        })?;
    }
}
