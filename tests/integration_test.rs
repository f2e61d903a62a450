use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;

use configd::client::tcp::Client;
use configd::client::Api;
use configd::protocol::{Entry, Revision};
use configd::{ConfigdError, Key, RepositoryName};

mod common;

fn repository(name: &str) -> RepositoryName {
    RepositoryName::new(name).unwrap()
}

fn key(k: &str) -> Key {
    Key::new(k).unwrap()
}

fn remote_message(err: ConfigdError) -> (u16, String) {
    match err {
        ConfigdError::Remote { code, message } => (code, message),
        err => panic!("unexpected error {:?}", err),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn configuration_crud() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let root_dir = common::temp_dir();
    let mut initializer = configd::config::Initializer::from_config(common::config());

    initializer.set_root_dir(root_dir.path());

    // Ephemeral ports.
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    initializer.set_listener(listener);
    initializer.set_http_listener(TcpListener::bind(("127.0.0.1", 0)).await.unwrap());

    initializer.init_dir().await.unwrap();
    assert!(root_dir.path().join("organizations").is_dir());

    // ctrl-c mock
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown2 = shutdown.clone();

    let server_handler =
        tokio::spawn(async move { initializer.run_configd(shutdown2.notified()).await });

    let mut owner = Client::from_addr(addr, common::issue("acme", "Owner"))
        .await
        .unwrap();
    let mut member = Client::from_addr(addr, common::issue("acme", "Member"))
        .await
        .unwrap();

    let fx = repository("FX");
    let gold = json!({"name": "Gold", "instrument": "XAU"});

    // Members can not create repositories.
    let err = member.create_repository(fx.clone()).await.unwrap_err();
    assert!(err.is_access_denied());

    owner.create_repository(fx.clone()).await.unwrap();
    let err = owner.create_repository(fx.clone()).await.unwrap_err();
    assert_eq!(
        remote_message(err),
        (500, "Repository with name: 'FX' already exists".to_owned())
    );

    let err = member.fetch(fx.clone(), key("Gold"), None).await.unwrap_err();
    assert_eq!(remote_message(err), (500, "Key 'Gold' not found".to_owned()));

    owner
        .save(fx.clone(), key("Gold"), gold.clone())
        .await
        .unwrap();
    owner
        .save(fx.clone(), key("Silver"), json!("XAG"))
        .await
        .unwrap();

    assert_eq!(member.fetch(fx.clone(), key("Gold"), None).await.unwrap(), gold);
    assert_eq!(
        member.entries(fx.clone(), None).await.unwrap(),
        vec![
            Entry {
                key: "Gold".into(),
                value: gold.clone(),
            },
            Entry {
                key: "Silver".into(),
                value: json!("XAG"),
            },
        ]
    );

    // Versions of an entry.
    let err = owner
        .create_entry(fx.clone(), key("Silver"), json!("XAG"))
        .await
        .unwrap_err();
    assert_eq!(
        remote_message(err),
        (500, "Repository 'FX' key 'Silver' already exists".to_owned())
    );
    assert_eq!(
        owner
            .update_entry(fx.clone(), key("Silver"), json!(null))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        member
            .fetch(fx.clone(), key("Silver"), Some(1))
            .await
            .unwrap(),
        json!("XAG")
    );
    let history = member.history(fx.clone(), key("Silver")).await.unwrap();
    assert_eq!(
        history,
        vec![
            Revision {
                version: 1,
                value: json!("XAG"),
            },
            Revision {
                version: 2,
                value: json!(null),
            },
        ]
    );

    let err = member.delete(fx.clone(), key("Gold")).await.unwrap_err();
    assert!(err.is_access_denied());

    owner.delete(fx.clone(), key("Gold")).await.unwrap();
    assert!(member.fetch(fx.clone(), key("Gold"), None).await.is_err());

    // Other organizations do not see the repository.
    let mut other = Client::from_addr(addr, common::issue("globex", "Owner"))
        .await
        .unwrap();
    let err = other.entries(fx.clone(), None).await.unwrap_err();
    assert_eq!(remote_message(err), (500, "Repository 'FX' not found".to_owned()));

    // Tokens from unknown keys are rejected.
    let mut anonymous = Client::from_addr(addr, "garbage").await.unwrap();
    let err = anonymous.entries(fx, None).await.unwrap_err();
    assert_eq!(remote_message(err), (500, "Token verification failed".to_owned()));

    // Notify shutdown
    shutdown.notify_one();

    drop(owner);
    drop(member);
    drop(other);
    drop(anonymous);

    // Wait graceful shutdown
    server_handler.await.unwrap().unwrap();
}
