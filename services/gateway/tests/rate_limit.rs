//! §8 scenario 2: a Free key (100/hour) gets 100 successes then a 429, and
//! its `rate_remaining` reaches zero.

mod common;

#[tokio::test]
async fn free_tier_101st_request_is_rate_limited() {
    let harness = common::build(&["bitcoin"]);
    harness.scripted.get("bitcoin").unwrap().set_response(serde_json::json!({ "network": "bitcoin" }));

    let mut ok_count = 0;
    let mut limited_count = 0;
    for _ in 0..101 {
        let resp = harness.request(common::get("/v1/bitcoin/status")).await;
        match resp.status().as_u16() {
            200 => ok_count += 1,
            429 => limited_count += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok_count, 100);
    assert_eq!(limited_count, 1);

    let now = gw_types::unix_now();
    let record = harness.server.api_keys.validate_key(common::API_KEY, now).unwrap();
    assert_eq!(record.rate_remaining, 0);
}
