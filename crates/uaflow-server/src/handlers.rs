//! Request handlers for protocol methods.
//!
//! Each handler implements one JSON-RPC method of the endpoint.

use crate::runtime::{BuildInfo, SharedAddressSpace};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use uaflow_core::protocol::{
    codes, BrowseParams, BrowseResponse, CallParams, CreateSessionParams, DataValue, ReadParams,
    ReadResponse, Response, SessionCreated, SessionParams, WriteParams, WriteResponse,
};
use uaflow_core::{NodeId, StatusCode};
use uaflow_graph::{AddressSpaceStats, CallResult};

/// Sessions opened on one connection.
pub type Sessions = HashSet<String>;

/// Handles the server.info method.
pub async fn handle_info(
    space: SharedAddressSpace,
    build_info: &BuildInfo,
    id: Option<Value>,
) -> Response {
    let space = space.read().await;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct InfoResult<'a> {
        build_info: &'a BuildInfo,
        stats: AddressSpaceStats,
        namespaces: Vec<&'static str>,
    }

    Response::success(
        id,
        InfoResult {
            build_info,
            stats: space.stats(),
            namespaces: vec!["http://opcfoundation.org/UA/"],
        },
    )
}

/// Handles the session.create method.
pub fn handle_session_create(
    sessions: &mut Sessions,
    build_info: &BuildInfo,
    id: Option<Value>,
    params: CreateSessionParams,
) -> Response {
    let session_id = uuid::Uuid::new_v4().to_string();
    debug!(
        "Session {} created for {}",
        session_id,
        params.client_name.as_deref().unwrap_or("anonymous client")
    );
    sessions.insert(session_id.clone());

    Response::success(
        id,
        SessionCreated {
            session_id,
            server: serde_json::to_value(build_info).unwrap_or(Value::Null),
        },
    )
}

/// Handles the session.close method.
pub fn handle_session_close(
    sessions: &mut Sessions,
    id: Option<Value>,
    params: SessionParams,
) -> Response {
    sessions.remove(&params.session_id);
    debug!("Session {} closed", params.session_id);
    Response::success(id, serde_json::json!({ "closed": true }))
}

/// Handles the browse method.
pub async fn handle_browse(
    space: SharedAddressSpace,
    id: Option<Value>,
    params: BrowseParams,
) -> Response {
    let space = space.read().await;

    let results = params
        .nodes_to_browse
        .iter()
        .map(|node| space.browse(node, params.direction))
        .collect();

    Response::success(id, BrowseResponse { results })
}

/// Handles the read method.
///
/// Reads of variables backed by host metrics are recomputed here.
pub async fn handle_read(space: SharedAddressSpace, id: Option<Value>, params: ReadParams) -> Response {
    let space = space.read().await;

    let results = params
        .node_ids
        .iter()
        .map(|node| match space.read_value(node) {
            Ok(value) => DataValue {
                value: Some(value),
                status_code: StatusCode::Good,
            },
            Err(status_code) => DataValue {
                value: None,
                status_code,
            },
        })
        .collect();

    Response::success(id, ReadResponse { results })
}

/// Handles the write method.
pub async fn handle_write(
    space: SharedAddressSpace,
    id: Option<Value>,
    params: WriteParams,
) -> Response {
    let space = space.read().await;
    if !space.contains(&params.node_id) {
        return node_not_found(id, &params.node_id);
    }
    let status_code = space.write_value(&params.node_id, &params.value);
    debug!("Write {} -> {}", params.node_id, status_code);
    Response::success(id, WriteResponse { status_code })
}

/// Handles the call method.
///
/// The call is validated under the read lock and runs after the lock is
/// released, so a slow handler never blocks structural changes.
pub async fn handle_call(space: SharedAddressSpace, id: Option<Value>, params: CallParams) -> Response {
    let prepared = {
        let space = space.read().await;
        if !space.contains(&params.method_id) {
            return node_not_found(id, &params.method_id);
        }

        if let Some(object) = &params.object_id {
            let owner = space.parent_of(&params.method_id).map(|r| r.source);
            if owner.as_ref() != Some(object) {
                return Response::success(id, CallResult::bad(StatusCode::BadMethodInvalid));
            }
        }

        space.prepare_call(&params.method_id, &params.input_arguments)
    };

    let result = match prepared {
        Ok(call) => call.invoke().await,
        Err(status) => CallResult::bad(status),
    };
    debug!("Call {} -> {}", params.method_id, result.status_code);
    Response::success(id, result)
}

fn node_not_found(id: Option<Value>, node: &NodeId) -> Response {
    Response::error(id, codes::NODE_NOT_FOUND, format!("Node not found: {}", node))
}
