use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use configd::core::Backend;

mod common;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    socket
}

async fn send(socket: &mut Socket, message: Value) {
    socket
        .send(Message::text(message.to_string()))
        .await
        .unwrap();
}

async fn recv(socket: &mut Socket) -> Value {
    loop {
        match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message {:?}", other),
        }
    }
}

fn request(sid: u64, operation: &str, data: Value) -> Value {
    json!({"q": format!("/configuration/{}", operation), "sid": sid, "d": data})
}

#[tokio::test(flavor = "multi_thread")]
async fn streaming_session() {
    let mut config = common::config();
    config.configuration.set_backend(Some(Backend::Memory));
    let mut initializer = configd::config::Initializer::from_config(config);

    // Ephemeral ports.
    initializer.set_listener(TcpListener::bind(("127.0.0.1", 0)).await.unwrap());
    let http_listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = http_listener.local_addr().unwrap();
    initializer.set_http_listener(http_listener);

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown2 = shutdown.clone();
    let server_handler =
        tokio::spawn(async move { initializer.run_configd(shutdown2.notified()).await });

    let owner = common::issue("acme", "Owner");
    let member = common::issue("acme", "Member");
    let mut socket = connect(addr).await;

    // Success answers with the payload, then a complete signal carrying the same sid.
    send(
        &mut socket,
        request(1, "createRepository", json!({"token": owner, "repository": "FX"})),
    )
    .await;
    assert_eq!(
        recv(&mut socket).await,
        json!({"q": "/configuration/createRepository", "sid": 1, "d": {}})
    );
    assert_eq!(recv(&mut socket).await, json!({"sig": 1, "sid": 1}));

    // Binary messages are read like text messages.
    let save = request(
        2,
        "save",
        json!({"token": owner, "repository": "FX", "key": "Gold", "value": {"instrument": "XAU"}}),
    );
    socket
        .send(Message::binary(save.to_string().into_bytes()))
        .await
        .unwrap();
    assert_eq!(
        recv(&mut socket).await,
        json!({"q": "/configuration/save", "sid": 2, "d": {}})
    );
    assert_eq!(recv(&mut socket).await, json!({"sig": 1, "sid": 2}));

    // Failures come as a single error signal.
    send(
        &mut socket,
        request(3, "delete", json!({"token": member, "repository": "FX", "key": "Gold"})),
    )
    .await;
    let error = recv(&mut socket).await;
    assert_eq!(error["sig"], 2);
    assert_eq!(error["sid"], 3);
    assert_eq!(
        error["d"],
        json!({
            "errorCode": 500,
            "errorMessage": "Role 'Member' has insufficient permissions for the requested operation: delete"
        })
    );

    send(
        &mut socket,
        json!({"sid": 4, "d": {"token": owner}}),
    )
    .await;
    let error = recv(&mut socket).await;
    assert_eq!((error["sig"].clone(), error["sid"].clone()), (json!(2), json!(4)));
    assert_eq!(error["d"]["errorMessage"], "Please specify 'q'");

    // Interleaved requests on one socket, every answer is matched by sid.
    let sids: Vec<u64> = (10..30).collect();
    for sid in &sids {
        send(
            &mut socket,
            request(
                *sid,
                "save",
                json!({"token": owner, "repository": "FX", "key": format!("key{}", sid), "value": sid}),
            ),
        )
        .await;
    }
    let mut answered: HashMap<u64, Vec<Value>> = HashMap::new();
    let mut completed = BTreeSet::new();
    while completed.len() < sids.len() {
        let message = recv(&mut socket).await;
        let sid = message["sid"].as_u64().unwrap();
        if message.get("sig") == Some(&json!(1)) {
            // The payload always precedes its complete signal.
            assert_eq!(answered.get(&sid).map(Vec::len), Some(1));
            completed.insert(sid);
        } else {
            assert_eq!(message["d"], json!({}));
            answered.entry(sid).or_default().push(message);
        }
    }
    assert_eq!(completed.into_iter().collect::<Vec<_>>(), sids);

    send(
        &mut socket,
        request(40, "entries", json!({"token": member, "repository": "FX"})),
    )
    .await;
    let entries = recv(&mut socket).await;
    assert_eq!(entries["sid"], 40);
    assert_eq!(entries["d"]["entries"].as_array().unwrap().len(), 21);
    assert_eq!(recv(&mut socket).await, json!({"sig": 1, "sid": 40}));

    socket.close(None).await.unwrap();

    shutdown.notify_one();
    server_handler.await.unwrap().unwrap();
}
