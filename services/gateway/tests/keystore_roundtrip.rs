//! §8 scenario 6: save, load with the right and wrong password, then
//! delete, through the admin keystore endpoints.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine};
use hyper::body::to_bytes;
use hyper::{Body, Request};

const ADMIN_KEY: &str = "test-admin-key";

fn admin_req(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder().method(method).uri(uri).header("X-Admin-Key", ADMIN_KEY).body(body).unwrap()
}

#[tokio::test]
async fn save_load_wrong_password_then_delete() {
    let harness = common::build(&["bitcoin"]);

    let save_body = serde_json::json!({
        "id": "k1",
        "password": "pw",
        "data": STANDARD.encode(b"hello"),
    });
    let resp = harness
        .request(admin_req("POST", "/api/v1/admin/keystore/save", Body::from(save_body.to_string())))
        .await;
    assert_eq!(resp.status(), 200);

    let resp = harness.request(admin_req("GET", "/api/v1/admin/keystore/load?id=k1&password=pw", Body::empty())).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
    let data = STANDARD.decode(body["data"].as_str().unwrap()).unwrap();
    assert_eq!(data, b"hello");

    let resp = harness
        .request(admin_req("GET", "/api/v1/admin/keystore/load?id=k1&password=wrong", Body::empty()))
        .await;
    assert_eq!(resp.status(), 401);

    let resp = harness.request(admin_req("DELETE", "/api/v1/admin/keystore/delete?id=k1", Body::empty())).await;
    assert_eq!(resp.status(), 200);

    let resp = harness.request(admin_req("GET", "/api/v1/admin/keystore/load?id=k1&password=pw", Body::empty())).await;
    assert_eq!(resp.status(), 404);
}
