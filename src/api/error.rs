//! Maps the workspace's common [`ringstore_util::error::Error`] onto
//! HTTP status codes and JSON diagnostic bodies (spec §7), the same way
//! the teacher's `garage_api::admin::error::Error` keeps HTTP concerns
//! out of the lower layers' error type.

use hyper::{Body, Response, StatusCode};
use serde_json::json;

use ringstore_util::error::Error;

pub fn status_for(err: &Error) -> StatusCode {
	match err {
		Error::BadRequest(_) => StatusCode::BAD_REQUEST,
		Error::NotFound(_) => StatusCode::NOT_FOUND,
		Error::Conflict { .. } => StatusCode::CONFLICT,
		Error::ConsistencyUnmet { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		_ => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

pub fn error_response(err: Error) -> Response<Body> {
	let status = status_for(&err);
	let body = match err {
		Error::BadRequest(msg) => json!({ "error": msg }),
		Error::NotFound(msg) => json!({ "error": msg }),
		Error::Conflict { values, .. } => json!({
			"error": "Inconsistent data across replicas",
			"values_found": values.iter().map(|(_, v)| v).collect::<Vec<_>>(),
			"source_nodes": values.iter().map(|(n, _)| n).collect::<Vec<_>>(),
		}),
		Error::ConsistencyUnmet {
			consistency,
			successful,
			attempted,
			total_possible,
			errors,
		} => json!({
			"error": format!(
				"Write failed: consistency '{}' not met ({}/{})",
				consistency, successful, attempted
			),
			"successful_replicas": successful,
			"attempted_replicas": attempted,
			"total_possible_replicas": total_possible,
			"consistency_level": consistency,
			"errors": errors,
		}),
		other => json!({ "error": other.to_string() }),
	};

	crate::helpers::json_response(status, &body).unwrap_or_else(|_| {
		Response::builder()
			.status(StatusCode::INTERNAL_SERVER_ERROR)
			.body(Body::from("internal error"))
			.expect("static response builder cannot fail")
	})
}
