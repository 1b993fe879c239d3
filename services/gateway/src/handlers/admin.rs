//! Admin keystore endpoints under `/api/v1/admin/keystore/*` (§6.1, §6.4).
//! All require the admin key; authentication happens in the router before
//! these are called.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use hyper::{Body, Request, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::query_param;
use crate::error::GatewayError;
use crate::handlers::health::json_response;
use crate::server::Server;

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub id: String,
    pub password: String,
    /// Base64-encoded plaintext payload to seal.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub id: String,
    /// Verbatim encrypted keystore blob.
    pub raw: String,
}

pub async fn list(server: Arc<Server>) -> Result<Response<Body>, GatewayError> {
    let ids = server
        .keystore
        .list()
        .map_err(|e| GatewayError::encoding_error(e.to_string()))?;
    Ok(json_response(200, &json!({ "ids": ids })))
}

pub async fn save(server: Arc<Server>, body: Bytes) -> Result<Response<Body>, GatewayError> {
    let req: SaveRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::bad_request(format!("invalid request body: {e}")))?;
    let data = STANDARD
        .decode(&req.data)
        .map_err(|e| GatewayError::bad_request(format!("data must be base64: {e}")))?;
    let now = gw_types::unix_now();
    server
        .keystore
        .save(&req.id, &req.password, &data, now)
        .map_err(|e| GatewayError::encoding_error(e.to_string()))?;
    Ok(json_response(200, &json!({ "saved": req.id })))
}

pub async fn load(server: Arc<Server>, req: &Request<Body>) -> Result<Response<Body>, GatewayError> {
    let id = query_param(req, "id").ok_or_else(|| GatewayError::bad_request("missing id"))?;
    let password = query_param(req, "password").ok_or_else(|| GatewayError::bad_request("missing password"))?;
    let data = server.keystore.load(&id, &password).map_err(|e| match e {
        gw_keystore::KeystoreError::NotFound => GatewayError::not_found(),
        gw_keystore::KeystoreError::AuthenticationFailed => {
            GatewayError::new(gw_types::ErrorKind::AuthInvalid, "wrong password")
        }
        other => GatewayError::encoding_error(other.to_string()),
    })?;
    Ok(json_response(200, &json!({ "data": STANDARD.encode(data) })))
}

pub async fn delete(server: Arc<Server>, req: &Request<Body>) -> Result<Response<Body>, GatewayError> {
    let id = query_param(req, "id").ok_or_else(|| GatewayError::bad_request("missing id"))?;
    server.keystore.delete(&id).map_err(|e| match e {
        gw_keystore::KeystoreError::NotFound => GatewayError::not_found(),
        other => GatewayError::encoding_error(other.to_string()),
    })?;
    Ok(json_response(200, &json!({ "deleted": id })))
}

pub async fn import(server: Arc<Server>, body: Bytes) -> Result<Response<Body>, GatewayError> {
    let req: ImportRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::bad_request(format!("invalid request body: {e}")))?;
    server
        .keystore
        .import(&req.id, req.raw.as_bytes())
        .map_err(|e| GatewayError::encoding_error(e.to_string()))?;
    Ok(json_response(200, &json!({ "imported": req.id })))
}
