//! End-to-end tests: client → gateway → mock origin.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use caching_gateway::config::{GatewayConfig, RouteConfig, StrategyKind};
use caching_gateway::http::HttpServer;
use caching_gateway::lifecycle::{BackgroundTasks, Shutdown};

mod common;

fn base_config(gateway: SocketAddr, origin: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway.to_string();
    config.upstream.origin = format!("http://{}", origin);
    config
}

fn route(name: &str, prefix: &str, strategy: StrategyKind) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        host: None,
        path_prefix: Some(prefix.into()),
        strategy,
        cache_name: "runtime".into(),
        network_timeout_secs: None,
    }
}

async fn spawn_gateway(config: GatewayConfig) -> (Shutdown, BackgroundTasks) {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let server = HttpServer::new(config).unwrap();
    let background = server.background();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (shutdown, background)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_cache_first_serves_cached_entry_on_repeat() {
    let origin_addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_programmable_origin(origin_addr, move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            (200, format!("v{}", n))
        }
    })
    .await;

    let mut config = base_config(gateway_addr, origin_addr);
    config
        .routes
        .push(route("assets", "/assets", StrategyKind::CacheFirst));
    let (shutdown, background) = spawn_gateway(config).await;

    let client = client();
    let first = client
        .get(format!("http://{}/assets/app.js", gateway_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(first.status(), 200);
    assert_eq!(first.text().await.unwrap(), "v1");

    // Let the background cache write settle before the second request.
    background.wait_idle().await;

    let second = client
        .get(format!("http://{}/assets/app.js", gateway_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(second.text().await.unwrap(), "v1", "second hit must be cached");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "origin hit exactly once");

    shutdown.trigger();
}

#[tokio::test]
async fn test_network_first_timeout_falls_back_to_cache() {
    let origin_addr: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28422".parse().unwrap();

    let slow = Arc::new(AtomicBool::new(false));
    let flag = slow.clone();
    common::start_programmable_origin(origin_addr, move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3)).await;
                (200, "late".to_string())
            } else {
                (200, "fresh".to_string())
            }
        }
    })
    .await;

    let mut config = base_config(gateway_addr, origin_addr);
    let mut api_route = route("api", "/api", StrategyKind::NetworkFirst);
    api_route.network_timeout_secs = Some(1);
    config.routes.push(api_route);
    let (shutdown, background) = spawn_gateway(config).await;

    let client = client();
    let warm = client
        .get(format!("http://{}/api/data", gateway_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(warm.text().await.unwrap(), "fresh");
    background.wait_idle().await;

    // Origin now takes 3s; the 1s network timeout should serve the cache.
    slow.store(true, Ordering::SeqCst);
    let fallback = client
        .get(format!("http://{}/api/data", gateway_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(
        fallback.text().await.unwrap(),
        "fresh",
        "timeout must fall back to the cached value"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_stale_while_revalidate_refreshes_behind() {
    let origin_addr: SocketAddr = "127.0.0.1:28431".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28432".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_programmable_origin(origin_addr, move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            (200, format!("v{}", n))
        }
    })
    .await;

    let mut config = base_config(gateway_addr, origin_addr);
    config
        .routes
        .push(route("feed", "/feed", StrategyKind::StaleWhileRevalidate));
    let (shutdown, background) = spawn_gateway(config).await;

    let client = client();
    let first = client
        .get(format!("http://{}/feed/latest", gateway_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(first.text().await.unwrap(), "v1");
    background.wait_idle().await;

    // Stale value served immediately, revalidation bumps the cache to v2.
    let second = client
        .get(format!("http://{}/feed/latest", gateway_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(second.text().await.unwrap(), "v1");
    background.wait_idle().await;

    let third = client
        .get(format!("http://{}/feed/latest", gateway_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(third.text().await.unwrap(), "v2");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_request_passes_through() {
    let origin_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28442".parse().unwrap();

    common::start_mock_origin(origin_addr, "straight from origin").await;

    let mut config = base_config(gateway_addr, origin_addr);
    config
        .routes
        .push(route("assets", "/assets", StrategyKind::CacheFirst));
    let (shutdown, _background) = spawn_gateway(config).await;

    let response = client()
        .get(format!("http://{}/unrouted/page", gateway_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "straight from origin");

    shutdown.trigger();
}

#[tokio::test]
async fn test_responses_carry_request_ids() {
    let origin_addr: SocketAddr = "127.0.0.1:28451".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28452".parse().unwrap();

    common::start_mock_origin(origin_addr, "ok").await;

    let mut config = base_config(gateway_addr, origin_addr);
    config
        .routes
        .push(route("all", "/", StrategyKind::NetworkOnly));
    let (shutdown, _background) = spawn_gateway(config).await;

    let response = client()
        .get(format!("http://{}/anything", gateway_addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert!(
        response.headers().contains_key("x-request-id"),
        "request id middleware should stamp responses"
    );

    shutdown.trigger();
}
