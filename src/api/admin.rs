//! Admin/observability routes (spec §6): join protocol entry points plus
//! read-only cluster introspection.

use hyper::{Body, Request, Response};
use serde_json::json;

use ringstore_coordinator::Coordinator;
use ringstore_membership::JoinRequest;
use ringstore_util::error::Error;

use crate::helpers::{json_ok_response, parse_json_body};

fn require_join_fields(body: &JoinRequest) -> Result<(), Error> {
	if body.node_id.is_empty() || body.address.is_empty() {
		return Err(Error::BadRequest("node_id and address required".to_string()));
	}
	Ok(())
}

pub async fn handle_join(coordinator: &Coordinator, req: Request<Body>) -> Result<Response<Body>, Error> {
	let body: JoinRequest = parse_json_body(req).await?;
	require_join_fields(&body)?;
	let view = coordinator
		.membership
		.handle_join(body.node_id, body.address)
		.await;
	json_ok_response(&json!({
		"message": "welcome to the cluster",
		"peers": view.peers,
	}))
}

pub async fn handle_notify_join(
	coordinator: &Coordinator,
	req: Request<Body>,
) -> Result<Response<Body>, Error> {
	let body: JoinRequest = parse_json_body(req).await?;
	require_join_fields(&body)?;
	coordinator
		.membership
		.handle_notify_join(body.node_id, body.address);
	json_ok_response(&json!({ "message": "ok" }))
}

pub async fn handle_peers(coordinator: &Coordinator) -> Result<Response<Body>, Error> {
	let view = coordinator.membership.snapshot();
	json_ok_response(&json!({ "peers": view.peers }))
}

pub async fn handle_status(coordinator: &Coordinator) -> Result<Response<Body>, Error> {
	let view = coordinator.membership.snapshot();
	let keys = coordinator.store.keys();
	let sample: Vec<&String> = keys.iter().take(10).collect();

	let cluster_nodes: Vec<&String> = view.peers.keys().collect();

	json_ok_response(&json!({
		"node_id": coordinator.membership.node_id,
		"address": coordinator.membership.address,
		"local_keys": keys.len(),
		"cluster_nodes": cluster_nodes,
		"all_keys_sample": sample,
		"hash_ring_nodes": view.ring.get_all_nodes(),
		"replication_factor": coordinator.replication_factor,
	}))
}
