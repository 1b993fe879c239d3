//! §8 scenario 1: two concurrent universal calls for the same key collapse
//! into a single upstream call, and both responses carry identical data.

mod common;

use hyper::body::to_bytes;
use std::time::Duration;

#[tokio::test]
async fn concurrent_requests_share_one_upstream_call() {
    let harness = common::build(&["ethereum"]);
    let scripted = harness.scripted.get("ethereum").unwrap();
    scripted.set_delay(Duration::from_millis(200));
    scripted.set_response(serde_json::json!({ "height": 800_000 }));

    let req_a = common::post("/api/v1/universal/ethereum/latest_block", hyper::Body::empty());
    let req_b = common::post("/api/v1/universal/ethereum/latest_block", hyper::Body::empty());

    let (resp_a, resp_b) = tokio::join!(harness.request(req_a), harness.request(req_b));
    assert_eq!(resp_a.status(), 200);
    assert_eq!(resp_b.status(), 200);

    let body_a = to_bytes(resp_a.into_body()).await.unwrap();
    let body_b = to_bytes(resp_b.into_body()).await.unwrap();
    let json_a: serde_json::Value = serde_json::from_slice(&body_a).unwrap();
    let json_b: serde_json::Value = serde_json::from_slice(&body_b).unwrap();
    assert_eq!(json_a["data"], json_b["data"]);
    assert_eq!(json_a["data"]["height"], 800_000);

    assert_eq!(scripted.call_count(), 1, "second caller should wait on the single-flight leader, not re-fetch");
}
