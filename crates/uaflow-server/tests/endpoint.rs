//! Drives a running server over its WebSocket endpoint.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uaflow_core::FlowMessage;
use uaflow_server::{model, CommandDispatcher, Effect, ServerConfig, ServerLifecycle};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Rpc {
    socket: Socket,
    next_id: u64,
}

impl Rpc {
    async fn connect(url: &str) -> Self {
        let (socket, _) = connect_async(url).await.unwrap();
        Self { socket, next_id: 1 }
    }

    async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        self.socket
            .send(Message::Text(request.to_string()))
            .await
            .unwrap();

        loop {
            match self.socket.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn session(&mut self) -> String {
        let created = self.call("session.create", json!({"clientName": "test"})).await;
        created["result"]["sessionId"].as_str().unwrap().to_string()
    }
}

async fn start() -> (Arc<Mutex<ServerLifecycle>>, String) {
    let mut lifecycle = ServerLifecycle::websocket(ServerConfig {
        name: "Plant".into(),
        port: 0,
        ..ServerConfig::default()
    });
    lifecycle.start().await.unwrap();
    let url = lifecycle.endpoint_url().unwrap().to_string();
    (Arc::new(Mutex::new(lifecycle)), url)
}

#[tokio::test]
async fn browse_read_write_call() {
    let (lifecycle, url) = start().await;
    let mut rpc = Rpc::connect(&url).await;
    let session = rpc.session().await;

    let info = rpc.call("server.info", Value::Null).await;
    assert_eq!(
        info["result"]["buildInfo"]["productName"],
        "PlantOPC UA server"
    );

    let browsed = rpc
        .call(
            "browse",
            json!({"sessionId": session, "nodesToBrowse": [model::vendor_name()]}),
        )
        .await;
    let names: Vec<&str> = browsed["result"]["results"][0]["references"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["browseName"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["Equipment", "Physical Assets", "MyVariable2", "FreeMemory", "Counter", "Bark"]
    );
    let bark = browsed["result"]["results"][0]["references"][5]["nodeId"].clone();

    let rejected = rpc
        .call(
            "write",
            json!({"sessionId": session, "nodeId": model::my_variable2(),
                   "value": {"dataType": "String", "value": "loud"}}),
        )
        .await;
    assert_eq!(rejected["result"]["statusCode"], "BadTypeMismatch");

    let read = rpc
        .call(
            "read",
            json!({"sessionId": session, "nodeIds": [model::my_variable2(), "ns=4;s=Ghost"]}),
        )
        .await;
    assert_eq!(read["result"]["results"][0]["value"]["value"], 10.0);
    assert_eq!(read["result"]["results"][1]["statusCode"], "BadNodeIdUnknown");

    let called = rpc
        .call(
            "call",
            json!({"sessionId": session, "objectId": model::vendor_name(), "methodId": bark,
                   "inputArguments": [{"dataType": "UInt32", "value": 2},
                                      {"dataType": "UInt32", "value": 3}]}),
        )
        .await;
    assert_eq!(called["result"]["statusCode"], "Good");
    assert_eq!(
        called["result"]["outputArguments"][0]["value"][1]["value"],
        "Whaff!!"
    );

    lifecycle.lock().await.shutdown().await;
}

#[tokio::test]
async fn dynamic_nodes_are_visible_to_clients() {
    let (lifecycle, url) = start().await;
    let dispatcher = CommandDispatcher::new(lifecycle.clone());

    let outcome = dispatcher
        .dispatch(FlowMessage::new(
            json!({"opcuaCommand": "addEquipment", "nodeName": "Mixer"}),
        ))
        .await;
    assert!(matches!(outcome.effect, Effect::NodeAdded(_)));

    let mut rpc = Rpc::connect(&url).await;
    let session = rpc.session().await;
    let browsed = rpc
        .call(
            "browse",
            json!({"sessionId": session, "nodesToBrowse": [model::equipment()]}),
        )
        .await;
    assert_eq!(
        browsed["result"]["results"][0]["references"][0]["browseName"],
        "Mixer1"
    );

    lifecycle.lock().await.shutdown().await;
}

#[tokio::test]
async fn restart_closes_connections_and_serves_a_new_endpoint() {
    let (lifecycle, url) = start().await;
    let mut rpc = Rpc::connect(&url).await;
    rpc.session().await;

    lifecycle.lock().await.restart().await.unwrap();

    // The old connection is closed by the server.
    let closed = loop {
        match rpc.socket.next().await {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break true,
            Some(Ok(_)) => continue,
        }
    };
    assert!(closed);

    let new_url = lifecycle.lock().await.endpoint_url().unwrap().to_string();
    let mut rpc = Rpc::connect(&new_url).await;
    let session = rpc.session().await;
    let browsed = rpc
        .call(
            "browse",
            json!({"sessionId": session, "nodesToBrowse": [model::equipment()]}),
        )
        .await;
    assert_eq!(
        browsed["result"]["results"][0]["references"],
        json!([])
    );

    lifecycle.lock().await.shutdown().await;
}

#[tokio::test]
async fn shutdown_does_not_wait_for_stalled_handshakes() {
    let (lifecycle, url) = start().await;

    // A peer that opens TCP but never sends the upgrade request.
    let stalled = TcpStream::connect(url.trim_start_matches("ws://"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopped = tokio::time::timeout(Duration::from_secs(5), async {
        lifecycle.lock().await.shutdown().await;
    })
    .await;
    assert!(stopped.is_ok(), "shutdown waited on a stalled handshake");
    assert!(!lifecycle.lock().await.is_ready());

    drop(stalled);
}
