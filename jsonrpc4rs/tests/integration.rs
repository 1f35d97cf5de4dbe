// integration.rs
//
// End-to-end coverage across both transports: a real `Server` bound to a
// loopback port, a real `Client` talking to it, no mocked transport layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use serde::Deserialize;
use serde_json::json;

use jsonrpc4rs::discovery::StaticList;
use jsonrpc4rs::registry::{MethodError, ServiceBuilder};
use jsonrpc4rs::{new_client, new_server, param_spec, AddressSource, Client, ClientOptions};

#[derive(Debug, Deserialize)]
struct AddParams {
    a: i64,
    b: i64,
}
param_spec!(AddParams { a, b });

struct Calculator;

fn calculator_service(name: &str) -> jsonrpc4rs::registry::Service {
    ServiceBuilder::new(name, Calculator)
        .method("Add", |_t: Arc<Calculator>, p: AddParams| async move {
            std::result::Result::<i64, MethodError>::Ok(p.a + p.b)
        })
        .build()
}

/// Ports are picked from a fixed, widely-spaced range per test so
/// concurrently running `#[tokio::test]`s in this binary never collide.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);

fn next_port(base: u16) -> u16 {
    base + NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

#[tokio::test]
async fn http_add_round_trips() {
    let port = next_port(18100);
    let service_name = format!("CalcHttp{port}");
    jsonrpc4rs::registry::register(calculator_service(&service_name)).unwrap();

    let mut server = new_server("http", port).unwrap();
    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        server.start().await.unwrap();
    });
    event_rx.recv().await;

    let client = new_client(
        "client",
        "http",
        AddressSource::Static(format!("127.0.0.1:{port}")),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    let result = client
        .call(&format!("{service_name}.Add"), json!({"a": 2, "b": 3}), false)
        .await
        .unwrap();
    assert_eq!(result, json!(5));
}

#[tokio::test]
async fn http_batch_with_unknown_method_reports_per_element_error() {
    let port = next_port(18200);
    let service_name = format!("CalcHttpBatch{port}");
    jsonrpc4rs::registry::register(calculator_service(&service_name)).unwrap();

    let mut server = new_server("http", port).unwrap();
    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        server.start().await.unwrap();
    });
    event_rx.recv().await;

    let client = new_client(
        "client",
        "http",
        AddressSource::Static(format!("127.0.0.1:{port}")),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    client
        .batch_append(&format!("{service_name}.NoSuchMethod"), json!({}), false)
        .await;
    client
        .batch_append(&format!("{service_name}.Add"), json!({"a": 10, "b": 1}), false)
        .await;

    let results = client.batch_call().await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].as_ref().unwrap_err().contains("Method not found"));
    assert_eq!(results[1], Ok(json!(11)));
}

#[tokio::test]
async fn rate_limit_denies_beyond_burst() {
    let port = next_port(18300);
    let service_name = format!("CalcRate{port}");
    jsonrpc4rs::registry::register(calculator_service(&service_name)).unwrap();

    let mut server = new_server("http", port).unwrap();
    server.set_rate_limit(0.001, 1);
    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        server.start().await.unwrap();
    });
    event_rx.recv().await;

    let client = new_client(
        "client",
        "http",
        AddressSource::Static(format!("127.0.0.1:{port}")),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    let first = client
        .call(&format!("{service_name}.Add"), json!({"a": 1, "b": 1}), false)
        .await;
    assert!(first.is_ok());

    let second = client
        .call(&format!("{service_name}.Add"), json!({"a": 1, "b": 1}), false)
        .await;
    assert!(second.unwrap_err().to_string().contains("Too many requests"));
}

#[tokio::test]
async fn tcp_handles_a_frame_near_the_two_megabyte_cap() {
    let port = next_port(18400);
    let service_name = format!("CalcTcpBig{port}");

    #[derive(Debug, Deserialize)]
    struct EchoParams {
        blob: String,
    }
    param_spec!(EchoParams { blob });

    let svc = ServiceBuilder::new(&service_name, Calculator)
        .method("Echo", |_t: Arc<Calculator>, p: EchoParams| async move {
            std::result::Result::<usize, MethodError>::Ok(p.blob.len())
        })
        .build();
    jsonrpc4rs::registry::register(svc).unwrap();

    let mut server = new_server("tcp", port).unwrap();
    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        server.start().await.unwrap();
    });
    event_rx.recv().await;

    let client = new_client(
        "client",
        "tcp",
        AddressSource::Static(format!("127.0.0.1:{port}")),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    let blob = "x".repeat(1024 * 1024);
    let result = client
        .call(&format!("{service_name}.Echo"), json!({"blob": blob}), false)
        .await
        .unwrap();
    assert_eq!(result, json!(1024 * 1024));
}

#[tokio::test]
async fn static_discovery_fans_out_across_two_servers() {
    let port_a = next_port(18500);
    let port_b = port_a + 1;
    let service_name = format!("CalcFanout{port_a}");
    jsonrpc4rs::registry::register(calculator_service(&service_name)).unwrap();

    for port in [port_a, port_b] {
        let mut server = new_server("http", port).unwrap();
        let mut event_rx = server.get_event();
        tokio::spawn(async move {
            server.start().await.unwrap();
        });
        event_rx.recv().await;
    }

    let discovery = Arc::new(StaticList::new(format!(
        "127.0.0.1:{port_a},127.0.0.1:{port_b}"
    )));

    let client = new_client(
        "client",
        "http",
        AddressSource::Discovery(discovery),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    for _ in 0..10 {
        let result = client
            .call(&format!("{service_name}.Add"), json!({"a": 4, "b": 5}), false)
            .await
            .unwrap();
        assert_eq!(result, json!(9));
    }
}

#[tokio::test]
async fn before_hook_rejects_before_invocation() {
    let port = next_port(18600);
    let service_name = format!("CalcHook{port}");
    jsonrpc4rs::registry::register(calculator_service(&service_name)).unwrap();

    let mut server = new_server("http", port).unwrap();
    server.set_before_func(|_id, method, _params| {
        if method == "Add" {
            Err("not allowed here".to_string())
        } else {
            Ok(())
        }
    });
    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        server.start().await.unwrap();
    });
    event_rx.recv().await;

    let client = new_client(
        "client",
        "http",
        AddressSource::Static(format!("127.0.0.1:{port}")),
        ClientOptions::default(),
    )
    .await
    .unwrap();

    let err = client
        .call(&format!("{service_name}.Add"), json!({"a": 1, "b": 2}), false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not allowed here"));
}

