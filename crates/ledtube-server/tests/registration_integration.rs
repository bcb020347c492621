//! Integration tests for the registration listener.
//!
//! Each test binds a listener on an ephemeral loopback port and drives it
//! with real TCP connections, either through `ledtube_client::register` or
//! with hand-written payloads for the malformed cases.
//!
//! Covered:
//!
//! - The 4-byte little-endian encoding of 5005 registers port 5005.
//! - A second registration from the same address overwrites the first.
//! - Empty and over-long payloads are rejected and the loop keeps accepting.
//! - In serial mode a silent client only delays others until the read timeout.
//! - In concurrent mode a silent client does not delay anyone.
//! - Clearing the `running` flag ends the accept loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use ledtube_core::{new_shared_registry, SharedRegistry};
use ledtube_server::infrastructure::network::registration::{
    start_registration_server, AcceptMode, ListenerConfig,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

struct Harness {
    addr: SocketAddr,
    registry: SharedRegistry,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

async fn start(mode: AcceptMode, read_timeout: Duration) -> Harness {
    let registry = new_shared_registry();
    let running = Arc::new(AtomicBool::new(true));
    let config = ListenerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        mode,
        read_timeout,
    };
    let (addr, handle) =
        start_registration_server(config, Arc::clone(&registry), Arc::clone(&running))
            .await
            .expect("listener must bind");
    Harness {
        addr,
        registry,
        running,
        handle,
    }
}

/// Polls until `ip` maps to `port` or two seconds pass.
async fn wait_for_entry(registry: &SharedRegistry, ip: IpAddr, port: u16) -> bool {
    for _ in 0..100 {
        if registry.read().await.get(ip) == Some(port) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

async fn send_raw(addr: SocketAddr, payload: &[u8]) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    if !payload.is_empty() {
        stream.write_all(payload).await.unwrap();
    }
    stream.shutdown().await.ok();
}

#[tokio::test]
async fn test_little_endian_5005_registers_port_5005() {
    // Arrange
    let h = start(AcceptMode::Serial, Duration::from_secs(1)).await;

    // Act
    send_raw(h.addr, &[0x8D, 0x13, 0x00, 0x00]).await;

    // Assert
    assert!(wait_for_entry(&h.registry, LOCALHOST, 5005).await);
    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_reregistration_overwrites_previous_port() {
    let h = start(AcceptMode::Serial, Duration::from_secs(1)).await;

    ledtube_client::register(h.addr, 5005).await.unwrap();
    assert!(wait_for_entry(&h.registry, LOCALHOST, 5005).await);

    ledtube_client::register(h.addr, 6006).await.unwrap();
    assert!(wait_for_entry(&h.registry, LOCALHOST, 6006).await);

    assert_eq!(h.registry.read().await.len(), 1, "one entry per address");
    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_listener_survives_malformed_payloads() {
    // Arrange
    let h = start(AcceptMode::Serial, Duration::from_secs(1)).await;

    // Act: empty, zero, and over-long registrations
    send_raw(h.addr, &[]).await;
    send_raw(h.addr, &[0x00, 0x00]).await;
    send_raw(h.addr, &[0x8D, 0x13, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]).await;
    ledtube_client::register(h.addr, 7007).await.unwrap();

    // Assert: only the valid registration landed
    assert!(wait_for_entry(&h.registry, LOCALHOST, 7007).await);
    assert_eq!(h.registry.read().await.len(), 1);
    assert!(!h.handle.is_finished(), "accept loop must still be running");
    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_serial_mode_silent_client_delays_until_read_timeout() {
    let h = start(AcceptMode::Serial, Duration::from_millis(500)).await;

    // A client that connects and never writes.
    let _silent = TcpStream::connect(h.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    ledtube_client::register(h.addr, 8008).await.unwrap();

    // Not yet: the listener is still waiting on the silent client.
    assert_eq!(h.registry.read().await.get(LOCALHOST), None);
    // After the read timeout the queued registration is served.
    assert!(wait_for_entry(&h.registry, LOCALHOST, 8008).await);
    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_concurrent_mode_silent_client_does_not_block_others() {
    let h = start(AcceptMode::Concurrent, Duration::from_secs(30)).await;

    let _silent = TcpStream::connect(h.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    ledtube_client::register(h.addr, 9009).await.unwrap();

    assert!(wait_for_entry(&h.registry, LOCALHOST, 9009).await);
    h.running.store(false, Ordering::Relaxed);
}

/// Linux routes all of 127.0.0.0/8 to loopback, which gives us distinct
/// source addresses without extra interfaces.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_distinct_addresses_register_concurrently_without_lost_updates() {
    use tokio::net::TcpSocket;

    let h = start(AcceptMode::Concurrent, Duration::from_secs(1)).await;

    let clients: Vec<(Ipv4Addr, u16)> = (2..=9u8)
        .map(|i| (Ipv4Addr::new(127, 0, 0, i), 5000 + u16::from(i)))
        .collect();

    let mut tasks = Vec::new();
    for (ip, port) in clients.clone() {
        let server = h.addr;
        tasks.push(tokio::spawn(async move {
            let socket = TcpSocket::new_v4().unwrap();
            socket.bind(SocketAddr::from((ip, 0))).unwrap();
            let mut stream = socket.connect(server).await.unwrap();
            stream
                .write_all(&ledtube_core::encode_registration_port(port))
                .await
                .unwrap();
            stream.shutdown().await.ok();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for (ip, port) in &clients {
        assert!(
            wait_for_entry(&h.registry, IpAddr::V4(*ip), *port).await,
            "missing registration for {ip}"
        );
    }
    assert_eq!(h.registry.read().await.len(), clients.len());
    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_clearing_running_flag_stops_accept_loop() {
    let h = start(AcceptMode::Serial, Duration::from_secs(1)).await;

    h.running.store(false, Ordering::Relaxed);

    tokio::time::timeout(Duration::from_secs(2), h.handle)
        .await
        .expect("accept loop must exit")
        .unwrap();
}
