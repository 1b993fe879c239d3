//! Manual path/method routing over raw hyper (§6.1). No routing framework:
//! a flat match over `(method, path segments)`, following the same style
//! as the teacher's health-check service.

use hyper::body::to_bytes;
use hyper::{Body, Method, Request, Response};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{authenticate, authenticate_admin, client_ip_of, query_param};
use crate::error::GatewayError;
use crate::handlers::{admin, chain, health, keys, stream, universal};
use crate::middleware::{apply_security_headers, sanitize_path};
use crate::server::Server;

pub async fn route(server: Arc<Server>, mut req: Request<Body>) -> Response<Body> {
    let path = req.uri().path().to_string();
    if let Err(err) = sanitize_path(&path) {
        return err.into_response();
    }
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    let mut response = match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => health::health(server.clone()).await,
        (&Method::GET, ["version"]) => health::version().await,
        (&Method::GET, ["status"]) => health::status(server.clone()).await,
        (&Method::GET, ["metrics"]) => health::metrics(server.clone()).await,

        (&Method::GET, ["v1", chain_name, "latest"]) => match authenticate(&server, &req) {
            Ok(key) => {
                let _permit = server.concurrency.acquire(key.hash, key.tier.budgets().concurrent_ceiling).await;
                chain::latest(server.clone(), key, chain_name.to_string()).await
            }
            Err(e) => e.into_response(),
        },
        (&Method::GET, ["v1", chain_name, "status"]) => match authenticate(&server, &req) {
            Ok(key) => {
                let _permit = server.concurrency.acquire(key.hash, key.tier.budgets().concurrent_ceiling).await;
                chain::status(server.clone(), key, chain_name.to_string()).await
            }
            Err(e) => e.into_response(),
        },
        (&Method::GET, ["v1", chain_name, "metrics"]) => match authenticate(&server, &req) {
            Ok(key) => match chain::metrics(server.clone(), key, chain_name.to_string()).await {
                Ok(r) => r,
                Err(e) => e.into_response(),
            },
            Err(e) => e.into_response(),
        },
        (&Method::GET, ["v1", chain_name, "stream"]) => {
            let key = match authenticate(&server, &req) {
                Ok(key) => key,
                Err(e) => return e.into_response(),
            };
            let client_ip = client_ip_of(&req);
            match stream::upgrade(server.clone(), key, chain_name.to_string(), client_ip, req).await {
                Ok(r) => return r,
                Err(e) => e.into_response(),
            }
        }

        (&Method::GET, ["api", "v1", "universal", chain_name, method_name])
        | (&Method::POST, ["api", "v1", "universal", chain_name, method_name]) => {
            let key = match authenticate(&server, &req) {
                Ok(key) => key,
                Err(e) => return e.into_response(),
            };
            let _permit = server.concurrency.acquire(key.hash, key.tier.budgets().concurrent_ceiling).await;
            let client_ip = client_ip_of(&req);
            let params = match extract_params(&mut req).await {
                Ok(p) => p,
                Err(e) => return e.into_response(),
            };
            universal::dispatch(
                server.clone(),
                key,
                chain_name.to_string(),
                method_name.to_string(),
                params,
                client_ip,
            )
            .await
        }

        (&Method::POST, ["generate-key"]) => match authenticate(&server, &req) {
            Ok(key) => keys::generate(server.clone(), key).await,
            Err(e) => e.into_response(),
        },

        (&Method::GET, ["api", "v1", "admin", "keystore", "list"]) => {
            match authenticate_admin(&server, &req) {
                Ok(()) => admin::list(server.clone()).await.unwrap_or_else(|e| e.into_response()),
                Err(e) => e.into_response(),
            }
        }
        (&Method::GET, ["api", "v1", "admin", "keystore", "load"])
        | (&Method::POST, ["api", "v1", "admin", "keystore", "load"]) => {
            if let Err(e) = authenticate_admin(&server, &req) {
                return e.into_response();
            }
            admin::load(server.clone(), &req).await.unwrap_or_else(|e| e.into_response())
        }
        (&Method::DELETE, ["api", "v1", "admin", "keystore", "delete"])
        | (&Method::POST, ["api", "v1", "admin", "keystore", "delete"]) => {
            if let Err(e) = authenticate_admin(&server, &req) {
                return e.into_response();
            }
            admin::delete(server.clone(), &req).await.unwrap_or_else(|e| e.into_response())
        }
        (&Method::POST, ["api", "v1", "admin", "keystore", action @ ("save" | "import")]) => {
            if let Err(e) = authenticate_admin(&server, &req) {
                return e.into_response();
            }
            let body = match to_bytes(req.into_body()).await {
                Ok(b) => b,
                Err(e) => return GatewayError::bad_request(e.to_string()).into_response(),
            };
            let result = match *action {
                "save" => admin::save(server.clone(), body).await,
                "import" => admin::import(server.clone(), body).await,
                _ => unreachable!(),
            };
            result.unwrap_or_else(|e| e.into_response())
        }

        _ => GatewayError::not_found().into_response(),
    };

    apply_security_headers(&mut response);
    response
}

async fn extract_params(req: &mut Request<Body>) -> Result<Value, GatewayError> {
    if req.method() == Method::GET {
        return match query_param(req, "params") {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| GatewayError::bad_request(format!("params must be JSON: {e}"))),
            None => Ok(Value::Array(vec![])),
        };
    }
    let body = to_bytes(req.body_mut()).await.map_err(|e| GatewayError::bad_request(e.to_string()))?;
    if body.is_empty() {
        return Ok(Value::Array(vec![]));
    }
    serde_json::from_slice(&body).map_err(|e| GatewayError::bad_request(format!("invalid JSON body: {e}")))
}
