//! Blocking HTTP client for the schema-compiler service.
//!
//! Remote calls return [`Either`]: transport failures and non-2xx responses
//! are ordinary outcomes the owning parameter inspects, not crate errors.
//! No timeout is applied — a started call runs to completion, matching the
//! rest of the pipeline's no-cancellation model.

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use crate::core::context::Context;
use crate::core::either::Either;

pub const SERVER_URL_OPTION: &str = "server-url";
pub const DEFAULT_SERVER_URL: &str = "https://compiler.dsl-platform.com/platform";

fn service_url(context: &Context, path: &str) -> String {
    let base = context
        .get(SERVER_URL_OPTION)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SERVER_URL);
    format!("{}/{}", base.trim_end_matches('/'), path)
}

pub fn get(context: &Context, path: &str) -> Either<String> {
    send(Client::new().get(service_url(context, path)))
}

pub fn put(context: &Context, path: &str, body: &Value) -> Either<String> {
    send(Client::new().put(service_url(context, path)).json(body))
}

pub fn post(context: &Context, path: &str, body: &Value) -> Either<String> {
    send(Client::new().post(service_url(context, path)).json(body))
}

fn send(request: RequestBuilder) -> Either<String> {
    let response = match request.send() {
        Ok(response) => response,
        Err(err) => return Either::fail(format!("HTTP request failed: {err}")),
    };
    let status = response.status();
    let body = match response.text() {
        Ok(body) => body,
        Err(err) => return Either::fail(format!("Error reading response: {err}")),
    };
    if status.is_success() {
        Either::success(body)
    } else {
        Either::fail(format!("HTTP {}: {body}", status.as_u16()))
    }
}
