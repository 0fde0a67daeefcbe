//! Peer-internal routes (spec §4.4.3): local-only store access used by
//! the coordinator's own fan-out. These handlers MUST NOT replicate —
//! they touch the local [`ringstore_store::Store`] and nothing else.

use hyper::{Body, Request, Response};
use serde_json::json;

use ringstore_coordinator::Coordinator;
use ringstore_util::error::Error;

use crate::helpers::{json_ok_response, parse_json_body};

#[derive(serde::Deserialize)]
struct PutBody {
	value: String,
}

pub async fn handle_get(coordinator: &Coordinator, key: &str) -> Result<Response<Body>, Error> {
	match coordinator.store.get(key) {
		Some(value) => json_ok_response(&json!({ "key": key, "value": value })),
		None => Err(Error::NotFound(key.to_string())),
	}
}

pub async fn handle_put(
	coordinator: &Coordinator,
	key: &str,
	req: Request<Body>,
) -> Result<Response<Body>, Error> {
	let body: PutBody = parse_json_body(req).await?;
	coordinator.store.put(key, body.value.clone());
	json_ok_response(&json!({ "key": key, "value": body.value }))
}

pub async fn handle_delete(coordinator: &Coordinator, key: &str) -> Result<Response<Body>, Error> {
	let deleted = coordinator.store.delete(key);
	json_ok_response(&json!({ "deleted": deleted }))
}
