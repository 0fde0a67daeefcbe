//! Small response/body utilities shared by the handler modules, in the
//! same spirit as `garage_api`'s `helpers.rs`.

use hyper::{Body, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use ringstore_util::error::Error;

pub fn json_response(status: StatusCode, body: &impl Serialize) -> Result<Response<Body>, Error> {
	let bytes = serde_json::to_vec(body)?;
	Ok(Response::builder()
		.status(status)
		.header("content-type", "application/json")
		.body(Body::from(bytes))
		.expect("static response builder cannot fail"))
}

pub fn json_ok_response(body: &impl Serialize) -> Result<Response<Body>, Error> {
	json_response(StatusCode::OK, body)
}

pub fn not_found_response() -> Response<Body> {
	json_response(StatusCode::NOT_FOUND, &serde_json::json!({ "error": "no such route" }))
		.expect("static body is always serializable")
}

pub fn method_not_allowed_response() -> Response<Body> {
	json_response(
		StatusCode::METHOD_NOT_ALLOWED,
		&serde_json::json!({ "error": "method not allowed" }),
	)
	.expect("static body is always serializable")
}

/// Reads and parses the request body as JSON. A missing or malformed
/// body is reported as `BadRequest`, never as an internal error.
pub async fn parse_json_body<T: DeserializeOwned>(req: Request<Body>) -> Result<T, Error> {
	let bytes = hyper::body::to_bytes(req.into_body())
		.await
		.map_err(|e| Error::BadRequest(format!("Unable to read request body: {}", e)))?;
	if bytes.is_empty() {
		return Err(Error::BadRequest("Request body is required".to_string()));
	}
	serde_json::from_slice(&bytes)
		.map_err(|e| Error::BadRequest(format!("Malformed JSON body: {}", e)))
}

/// Extracts a single query parameter's value from a raw query string
/// (`a=1&b=2`), percent-decoding it.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
	let query = query?;
	for pair in query.split('&') {
		let mut it = pair.splitn(2, '=');
		let key = it.next().unwrap_or("");
		if key == name {
			let value = it.next().unwrap_or("");
			return Some(
				percent_encoding::percent_decode_str(value)
					.decode_utf8_lossy()
					.into_owned(),
			);
		}
	}
	None
}
