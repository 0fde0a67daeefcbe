//! Client-facing routes (spec §6): `/keys/{key}` GET/PUT/DELETE. The
//! only layer in the crate that talks to [`ringstore_coordinator::Coordinator`]
//! on behalf of an external caller.

use hyper::{Body, Request, Response};
use serde_json::json;

use ringstore_coordinator::{Coordinator, ConsistencyLevel, ReadOutcome, WriteOutcome};
use ringstore_util::error::Error;

use crate::helpers::{json_ok_response, parse_json_body, query_param};

#[derive(serde::Deserialize)]
struct PutBody {
	value: serde_json::Value,
	#[serde(default)]
	consistency: Option<String>,
}

/// Coerces an arbitrary JSON value to the string the local store holds,
/// mirroring the reference's write-path coercion (spec §9): strings are
/// stored as-is, every other JSON type is stored as its canonical JSON
/// text.
fn stringify_value(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

pub async fn handle_get(
	coordinator: &Coordinator,
	key: &str,
	query: Option<&str>,
) -> Result<Response<Body>, Error> {
	let consistency_str = query_param(query, "consistency").unwrap_or_else(|| "one".to_string());
	let consistency = ConsistencyLevel::parse(&consistency_str);

	match coordinator.get(key, &consistency).await {
		ReadOutcome::Found { value, sources } => {
			let mut body = json!({
				"key": key,
				"value": value,
				"consistency_level": consistency.as_str(),
				"queried_node": coordinator.membership.node_id,
			});
			let obj = body.as_object_mut().expect("constructed as an object");
			if sources.len() == 1 {
				obj.insert("source_node".to_string(), json!(sources[0]));
			} else {
				obj.insert("source_nodes".to_string(), json!(sources));
			}
			json_ok_response(&body)
		}
		ReadOutcome::NotFound => Err(Error::NotFound(key.to_string())),
		ReadOutcome::Conflict { values } => Err(Error::Conflict {
			key: key.to_string(),
			values,
		}),
	}
}

pub async fn handle_put(
	coordinator: &Coordinator,
	key: &str,
	req: Request<Body>,
) -> Result<Response<Body>, Error> {
	let body: PutBody = parse_json_body(req).await?;
	if body.value.is_null() {
		return Err(Error::BadRequest("Missing 'value'".to_string()));
	}
	let consistency_str = body.consistency.clone().unwrap_or_else(|| "quorum".to_string());
	let consistency = ConsistencyLevel::parse(&consistency_str);
	let stored_value = stringify_value(&body.value);

	let outcome = coordinator.put(key, stored_value, consistency).await;
	response_for_write(
		json!({
			"key": key,
			"value": body.value,
		}),
		outcome,
	)
}

pub async fn handle_delete(
	coordinator: &Coordinator,
	key: &str,
	query: Option<&str>,
) -> Result<Response<Body>, Error> {
	let consistency_str = query_param(query, "consistency").unwrap_or_else(|| "quorum".to_string());
	let consistency = ConsistencyLevel::parse(&consistency_str);

	let outcome = coordinator.delete(key, consistency).await;
	response_for_write(json!({ "message": format!("key {} deleted", key) }), outcome)
}

fn response_for_write(mut base: serde_json::Value, outcome: WriteOutcome) -> Result<Response<Body>, Error> {
	let obj = base.as_object_mut().expect("constructed as an object");
	obj.insert("successful_replicas".to_string(), json!(outcome.successful_replicas));
	obj.insert("attempted_replicas".to_string(), json!(outcome.attempted_replicas));
	obj.insert(
		"total_possible_replicas".to_string(),
		json!(outcome.total_possible_replicas),
	);
	obj.insert("consistency_level".to_string(), json!(outcome.consistency_level));
	obj.insert("coordinated_by".to_string(), json!(outcome.coordinated_by));
	if !outcome.errors.is_empty() {
		obj.insert("errors".to_string(), json!(outcome.errors));
	}

	if outcome.success {
		json_ok_response(&base)
	} else {
		Err(Error::ConsistencyUnmet {
			consistency: outcome.consistency_level,
			successful: outcome.successful_replicas,
			attempted: outcome.attempted_replicas,
			total_possible: outcome.total_possible_replicas,
			errors: outcome.errors,
		})
	}
}
