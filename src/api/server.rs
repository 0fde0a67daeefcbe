//! HTTP entry point: binds a hyper server and routes every request to
//! the handler modules (spec §6). Routing is a plain method+path match;
//! there is no framework here, matching the direct `hyper` usage the
//! rest of the corpus favors over a routing crate.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server};

use ringstore_coordinator::Coordinator;
use ringstore_util::error::Error;

use crate::helpers::{method_not_allowed_response, not_found_response};
use crate::{admin, client, internal};

/// Everything a request handler needs. Holds only the coordinator,
/// since it already owns the store and membership table it was built
/// from (spec §9: collaborators are explicitly passed, not ambient).
pub struct Context {
	pub coordinator: Arc<Coordinator>,
}

pub async fn serve(addr: SocketAddr, ctx: Arc<Context>) -> Result<(), Error> {
	let make_svc = make_service_fn(move |_conn| {
		let ctx = ctx.clone();
		async move {
			Ok::<_, Infallible>(service_fn(move |req| {
				let ctx = ctx.clone();
				async move { Ok::<_, Infallible>(dispatch(ctx, req).await) }
			}))
		}
	});

	info!("Listening on {}", addr);
	Server::bind(&addr)
		.serve(make_svc)
		.await
		.map_err(|e| Error::Message(format!("HTTP server error: {}", e)))
}

async fn dispatch(ctx: Arc<Context>, req: Request<Body>) -> Response<Body> {
	let method = req.method().clone();
	let path = req.uri().path().to_string();
	let query = req.uri().query().map(str::to_string);
	let segments = decode_segments(&path);
	let segment_refs: Vec<&str> = segments.iter().map(String::as_str).collect();

	let coordinator = &ctx.coordinator;
	let result = match (&method, segment_refs.as_slice()) {
		(&Method::GET, ["keys", key]) => client::handle_get(coordinator, key, query.as_deref()).await,
		(&Method::PUT, ["keys", key]) => client::handle_put(coordinator, key, req).await,
		(&Method::DELETE, ["keys", key]) => client::handle_delete(coordinator, key, query.as_deref()).await,

		(&Method::GET, ["internal", "store", key]) => internal::handle_get(coordinator, key).await,
		(&Method::PUT, ["internal", "store", key]) => internal::handle_put(coordinator, key, req).await,
		(&Method::DELETE, ["internal", "delete", key]) => internal::handle_delete(coordinator, key).await,

		(&Method::POST, ["admin", "join"]) => admin::handle_join(coordinator, req).await,
		(&Method::POST, ["admin", "notify_join"]) => admin::handle_notify_join(coordinator, req).await,
		(&Method::GET, ["admin", "peers"]) => admin::handle_peers(coordinator).await,
		(&Method::GET, ["admin", "status"]) => admin::handle_status(coordinator).await,

		(_, ["keys", _])
		| (_, ["internal", "store", _])
		| (_, ["internal", "delete", _])
		| (_, ["admin", "join"])
		| (_, ["admin", "notify_join"])
		| (_, ["admin", "peers"])
		| (_, ["admin", "status"]) => return method_not_allowed_response(),

		_ => return not_found_response(),
	};

	match result {
		Ok(resp) => resp,
		Err(e) => crate::error::error_response(e),
	}
}

/// Splits and percent-decodes a request path into its segments,
/// dropping empty ones so both `/keys/x` and `/keys/x/` route the same.
fn decode_segments(path: &str) -> Vec<String> {
	path.split('/')
		.filter(|s| !s.is_empty())
		.map(|s| {
			percent_encoding::percent_decode_str(s)
				.decode_utf8_lossy()
				.into_owned()
		})
		.collect()
}
