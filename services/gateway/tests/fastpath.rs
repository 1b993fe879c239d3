//! §8 scenario 5: a published fastpath snapshot is served verbatim to
//! many concurrent callers, with an exact `Content-Length`.

mod common;

use hyper::body::to_bytes;

const SNAPSHOT: &[u8] = br#"{"height":800000,"hash":"00..aa"}"#;

#[tokio::test]
async fn concurrent_reads_all_see_the_published_snapshot() {
    let harness = common::build(&["bitcoin"]);
    harness.server.fastpath_latest.publish(bytes::Bytes::from_static(SNAPSHOT));

    let mut handles = Vec::with_capacity(200);
    for _ in 0..200 {
        let server = harness.server.clone();
        handles.push(tokio::spawn(async move {
            gateway::router::route(server, common::get("/v1/bitcoin/latest")).await
        }));
    }

    for handle in handles {
        let resp = handle.await.unwrap();
        assert_eq!(resp.status(), 200);
        let content_length = resp.headers().get("content-length").map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&body[..], SNAPSHOT);
        if let Some(len) = content_length {
            assert_eq!(len, SNAPSHOT.len().to_string());
        }
    }
}
