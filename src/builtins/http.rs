//! HTTP builtins: http-get, http-post, http-put, http-delete, http-request
//!
//! Every request runs on a promise worker and carries a hard 30-second
//! timeout. Responses are maps with `:status`, `:headers`, `:body`, `:url`,
//! `:ok` (true iff 2xx), and `:json` when the body parses as JSON. Network
//! and protocol failures surface as promise rejections.

use super::json::{decode_if_json, encode_body};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::promise::{reason_from_error, Promise};
use crate::value::{Map, MapKey, Value};
use lispy_macros::builtin;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "LisPy-HTTP/1.0";
const TIMEOUT_SECS: u64 = 30;

/// Keyword-style header keys (`:content-type`) lose their leading colon
fn header_name(key: &MapKey) -> String {
    match key {
        MapKey::Symbol(s) => s.strip_prefix(':').unwrap_or(s).to_string(),
        MapKey::Str(s) => s.clone(),
        other => other.to_value().to_string(),
    }
}

fn collect_headers(function: &str, value: &Value) -> Result<Vec<(String, String)>> {
    match value {
        Value::Map(map) => Ok(map
            .sorted_entries()
            .iter()
            .map(|(key, val)| (header_name(key), val.to_string()))
            .collect()),
        other => Err(Error::type_mismatch(function, "a headers map", other)),
    }
}

fn expect_url(function: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(url) => Ok(url.clone()),
        other => Err(Error::type_mismatch(function, "a URL string", other)),
    }
}

enum RequestBody {
    None,
    Text(String),
    Json(String),
}

fn prepare_body(body: Option<&Value>) -> Result<RequestBody> {
    match body {
        None | Some(Value::Nil) => Ok(RequestBody::None),
        Some(Value::Str(text)) => Ok(RequestBody::Text(text.clone())),
        Some(other) => Ok(RequestBody::Json(encode_body(other)?)),
    }
}

fn response_to_value(response: ureq::Response, url: &str) -> Result<Value> {
    let status = response.status();

    let mut headers = Map::new();
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            headers.insert(MapKey::Str(name.clone()), Value::Str(value.to_string()));
        }
    }

    let body = response
        .into_string()
        .map_err(|e| Error::Http(format!("failed to read response body: {}", e)))?;

    let mut result = Map::new();
    result.insert(MapKey::keyword("status"), Value::Int(status as i64));
    result.insert(MapKey::keyword("headers"), Value::Map(headers));
    result.insert(MapKey::keyword("url"), Value::Str(url.to_string()));
    result.insert(
        MapKey::keyword("ok"),
        Value::Bool((200..300).contains(&status)),
    );
    if let Some(json) = decode_if_json(&body) {
        result.insert(MapKey::keyword("json"), json);
    }
    result.insert(MapKey::keyword("body"), Value::Str(body));
    Ok(Value::Map(result))
}

/// Build and dispatch the request on a promise worker
fn perform(
    method: String,
    url: String,
    body: RequestBody,
    headers: Vec<(String, String)>,
) -> Arc<Promise> {
    if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
        return Promise::rejected(reason_from_error(Error::Http(format!(
            "invalid URL '{}': only http and https URLs are supported",
            url
        ))));
    }

    Promise::spawn(move || {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build();

        let mut request = agent.request(&method, &url);
        match &body {
            RequestBody::None => {}
            RequestBody::Text(_) => request = request.set("Content-Type", "text/plain"),
            RequestBody::Json(_) => request = request.set("Content-Type", "application/json"),
        }
        let mut has_user_agent = false;
        for (name, value) in &headers {
            if name.eq_ignore_ascii_case("user-agent") {
                has_user_agent = true;
            }
            request = request.set(name, value);
        }
        if !has_user_agent {
            request = request.set("User-Agent", USER_AGENT);
        }

        let outcome = match &body {
            RequestBody::None => request.call(),
            RequestBody::Text(text) | RequestBody::Json(text) => request.send_string(text),
        };

        match outcome {
            Ok(response) => response_to_value(response, &url),
            // non-2xx responses still produce a response map, with :ok false
            Err(ureq::Error::Status(_, response)) => response_to_value(response, &url),
            Err(e) => Err(Error::Http(e.to_string())),
        }
    })
}

#[builtin(name = "http-get")]
/// `(http-get url [headers])` - GET request returning a promise.
pub fn http_get(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("http-get", "1-2", args.len()));
    }
    let url = expect_url("http-get", &args[0])?;
    let headers = match args.get(1) {
        Some(headers) => collect_headers("http-get", headers)?,
        None => Vec::new(),
    };
    Ok(Value::Promise(perform(
        "GET".to_string(),
        url,
        RequestBody::None,
        headers,
    )))
}

#[builtin(name = "http-post")]
/// `(http-post url body [headers])` - POST returning a promise. String
/// bodies send as text/plain, structured values JSON-encode.
pub fn http_post(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::arity("http-post", "2-3", args.len()));
    }
    let url = expect_url("http-post", &args[0])?;
    let body = prepare_body(Some(&args[1]))?;
    let headers = match args.get(2) {
        Some(headers) => collect_headers("http-post", headers)?,
        None => Vec::new(),
    };
    Ok(Value::Promise(perform("POST".to_string(), url, body, headers)))
}

#[builtin(name = "http-put")]
/// `(http-put url body [headers])` - PUT returning a promise.
pub fn http_put(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::arity("http-put", "2-3", args.len()));
    }
    let url = expect_url("http-put", &args[0])?;
    let body = prepare_body(Some(&args[1]))?;
    let headers = match args.get(2) {
        Some(headers) => collect_headers("http-put", headers)?,
        None => Vec::new(),
    };
    Ok(Value::Promise(perform("PUT".to_string(), url, body, headers)))
}

#[builtin(name = "http-delete")]
/// `(http-delete url [headers])` - DELETE returning a promise.
pub fn http_delete(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("http-delete", "1-2", args.len()));
    }
    let url = expect_url("http-delete", &args[0])?;
    let headers = match args.get(1) {
        Some(headers) => collect_headers("http-delete", headers)?,
        None => Vec::new(),
    };
    Ok(Value::Promise(perform(
        "DELETE".to_string(),
        url,
        RequestBody::None,
        headers,
    )))
}

#[builtin(name = "http-request")]
/// `(http-request method url [body [headers]])` - generic request with an
/// explicit method string.
pub fn http_request(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 || args.len() > 4 {
        return Err(Error::arity("http-request", "2-4", args.len()));
    }
    let method = match &args[0] {
        Value::Str(method) => method.to_uppercase(),
        other => return Err(Error::type_mismatch("http-request", "a method string", other)),
    };
    let url = expect_url("http-request", &args[1])?;
    let body = prepare_body(args.get(2))?;
    let headers = match args.get(3) {
        Some(headers) => collect_headers("http-request", headers)?,
        None => Vec::new(),
    };
    Ok(Value::Promise(perform(method, url, body, headers)))
}

/// Register all HTTP builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_http_get(env);
    register_http_post(env);
    register_http_put(env);
    register_http_delete(env);
    register_http_request(env);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Settled;

    fn env() -> Arc<Environment> {
        Environment::new()
    }

    #[test]
    fn test_invalid_url_rejects() {
        let e = env();
        let result = http_get(&[Value::Str("ftp://example.com".to_string())], &e).unwrap();
        match result {
            Value::Promise(p) => match p.wait() {
                Settled::Rejected(reason) => {
                    assert!(reason.to_string().contains("HTTPError"));
                }
                other => panic!("Expected rejection, got {:?}", other),
            },
            other => panic!("Expected promise, got {}", other.repr()),
        }
    }

    #[test]
    fn test_empty_url_rejects() {
        let e = env();
        let result = http_get(&[Value::Str(String::new())], &e).unwrap();
        match result {
            Value::Promise(p) => assert!(matches!(p.wait(), Settled::Rejected(_))),
            other => panic!("Expected promise, got {}", other.repr()),
        }
    }

    #[test]
    fn test_header_name_strips_keyword_colon() {
        assert_eq!(header_name(&MapKey::keyword("accept")), "accept");
        assert_eq!(header_name(&MapKey::Str("X-Token".to_string())), "X-Token");
    }

    #[test]
    fn test_headers_must_be_a_map() {
        let e = env();
        let result = http_get(
            &[
                Value::Str("https://example.com".to_string()),
                Value::Int(5),
            ],
            &e,
        );
        assert!(matches!(result, Err(Error::Type(_))));
    }
}
