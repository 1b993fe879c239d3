//! `POST /generate-key` (§6.1, §4.2). Requires a valid API key; mints a
//! fresh Free-tier key for the caller.

use gw_ratelimit::ApiKeyRecord;
use hyper::{Body, Response};
use serde_json::json;
use std::sync::Arc;

use crate::handlers::health::json_response;
use crate::server::Server;

pub async fn generate(server: Arc<Server>, _caller: ApiKeyRecord) -> Response<Body> {
    let now = gw_types::unix_now();
    let key = server.api_keys.generate_key(now);
    json_response(
        200,
        &json!({
            "key": key,
            "tier": "free",
            "expires_in_seconds": 365 * 24 * 3600,
        }),
    )
}
