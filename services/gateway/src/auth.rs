//! API key and admin key resolution (§6.1).

use gw_ratelimit::ApiKeyRecord;
use hyper::Request;

use crate::error::GatewayError;
use crate::server::Server;

pub fn extract_api_key(req: &Request<hyper::Body>) -> Option<String> {
    if let Some(header) = req.headers().get("X-API-Key") {
        if let Ok(value) = header.to_str() {
            return Some(value.to_string());
        }
    }
    query_param(req, "api_key")
}

pub fn extract_admin_key(req: &Request<hyper::Body>) -> Option<String> {
    if let Some(header) = req.headers().get("X-Admin-Key") {
        if let Ok(value) = header.to_str() {
            return Some(value.to_string());
        }
    }
    query_param(req, "admin_key")
}

pub fn query_param(req: &Request<hyper::Body>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

pub fn client_ip_of(req: &Request<hyper::Body>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn user_agent_of(req: &Request<hyper::Body>) -> String {
    req.headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Validate the caller's API key and record usage against it (§4.1,
/// §8 scenario 2) -- every authenticated request updates `last_used`,
/// `request_count`, and `rate_remaining` on the key's record.
pub fn authenticate(server: &Server, req: &Request<hyper::Body>) -> Result<ApiKeyRecord, GatewayError> {
    let raw_key = extract_api_key(req).ok_or_else(GatewayError::auth_missing)?;
    let now = gw_types::unix_now();
    let record = server
        .api_keys
        .validate_key(&raw_key, now)
        .ok_or_else(GatewayError::auth_invalid)?;
    server
        .api_keys
        .update_usage(&raw_key, &client_ip_of(req), &user_agent_of(req), now);
    Ok(record)
}

pub fn authenticate_admin(server: &Server, req: &Request<hyper::Body>) -> Result<(), GatewayError> {
    let supplied = extract_admin_key(req).ok_or_else(GatewayError::admin_required)?;
    if supplied == server.admin_key {
        Ok(())
    } else {
        Err(GatewayError::admin_required())
    }
}
