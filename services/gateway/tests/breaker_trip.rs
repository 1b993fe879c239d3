//! §8 scenario 3: three consecutive upstream failures trip a Free-tier
//! breaker; the next call is rejected fast, without contacting upstream.

mod common;

use std::time::Instant;

#[tokio::test]
async fn three_failures_trip_the_breaker_and_reject_without_upstream_contact() {
    let harness = common::build(&["ethereum"]);
    let scripted = harness.scripted.get("ethereum").unwrap();
    scripted.set_failing();

    for _ in 0..3 {
        let resp = harness.request(common::post("/api/v1/universal/ethereum/latest_block", hyper::Body::empty())).await;
        assert_eq!(resp.status(), 200, "universal dispatcher always answers 200, error folded into the envelope");
    }
    let calls_after_trip = scripted.call_count();
    assert_eq!(calls_after_trip, 3);

    let started = Instant::now();
    let resp = harness.request(common::get("/v1/ethereum/latest")).await;
    let elapsed = started.elapsed();

    assert_eq!(resp.status(), 503);
    assert!(elapsed.as_millis() <= 5, "open breaker should reject without an upstream round trip, took {elapsed:?}");
    assert_eq!(scripted.call_count(), calls_after_trip, "open breaker must not reach the backend");
}
