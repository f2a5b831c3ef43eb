//! Server Tests
//!
//! End-to-end over loopback sockets: a full server per test, raw requests in,
//! raw responses out.
//!
//! ## Test Scopes
//! - **Lifecycle**: POST, GET, PUT and DELETE against a running server.
//! - **Robustness**: malformed and empty connections do not stop the accept loop.
//! - **Federation**: two servers naming each other as peers aggregate once each,
//!   without looping.

#[cfg(test)]
mod tests {
    use crate::config::ServerConfig;
    use crate::federation::types::PeerDescriptor;
    use crate::server::ChirpServer;
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn test_config(root: &Path, peers: Vec<PeerDescriptor>) -> ServerConfig {
        ServerConfig {
            hostname: "127.0.0.1".to_string(),
            document_root: root.to_path_buf(),
            peers,
            worker_count: 2,
            peer_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(500),
            ..ServerConfig::default()
        }
    }

    async fn start(listener: TcpListener, config: ServerConfig) -> SocketAddr {
        let server = ChirpServer::from_listener(listener, config).unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn start_standalone(root: &Path) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        start(listener, test_config(root, Vec::new())).await
    }

    /// Sends `raw` and returns the status code and body of the reply.
    async fn send(addr: SocketAddr, raw: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut reply))
            .await
            .expect("server did not close the connection")
            .unwrap();

        let reply = String::from_utf8(reply).unwrap();
        let (head, body) = reply.split_once("\r\n\r\n").unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, body.to_string())
    }

    fn request(method: &str, target: &str, body: &str) -> String {
        format!(
            "{} {} HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\n\r\n{}",
            method,
            target,
            body.len(),
            body
        )
    }

    fn chirps_of(body: &str) -> Vec<Value> {
        let value: Value = serde_json::from_str(body).unwrap();
        value["chirps"].as_array().unwrap().clone()
    }

    // ============================================================
    // LIFECYCLE
    // ============================================================

    #[tokio::test]
    async fn test_identity_and_seeded_store() {
        let root = TempDir::new().unwrap();
        std::fs::write(
            root.path().join("chirps.json"),
            r#"{"chirps":[
                {"id":-2,"username":"a","content":"seeded","posted_at":"2024-01-01T00:00:00Z"},
                {"id":3,"username":"b","content":"no timestamp"}
            ]}"#,
        )
        .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = ChirpServer::from_listener(listener, test_config(root.path(), Vec::new())).unwrap();

        assert_eq!(server.local_identity(), format!("127.0.0.1:{}", port));
        let store = server.store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(-2).unwrap().content, "seeded");

        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        let (status, _) = send(
            addr,
            &request("POST", "/chirps", r#"{"username":"c","content":"new"}"#),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(store.get(-1).unwrap().content, "new");
    }

    #[tokio::test]
    async fn test_chirp_lifecycle_over_sockets() {
        let root = TempDir::new().unwrap();
        let addr = start_standalone(root.path()).await;

        let (status, body) = send(
            addr,
            &request("POST", "/chirps", r#"{"username":"a","content":"hi"}"#),
        )
        .await;
        assert_eq!(status, 201);
        let created: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(created["id"], 0);

        let (status, body) = send(addr, &request("GET", "/chirps", "")).await;
        assert_eq!(status, 200);
        assert_eq!(chirps_of(&body).len(), 1);

        let edit = json!({
            "id": 0,
            "username": "a",
            "content": "edited",
            "posted_at": created["posted_at"],
        })
        .to_string();
        let (status, body) = send(addr, &request("PUT", "/chirps/0", &edit)).await;
        assert_eq!(status, 201);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["content"], "edited");

        let (status, _) = send(addr, &request("DELETE", "/chirps/0", "")).await;
        assert_eq!(status, 200);
        let (status, _) = send(addr, &request("DELETE", "/chirps/0", "")).await;
        assert_eq!(status, 404);

        let (_, body) = send(addr, &request("GET", "/chirps", "")).await;
        assert!(chirps_of(&body).is_empty());
    }

    #[tokio::test]
    async fn test_seed_file_is_served() {
        let root = TempDir::new().unwrap();
        std::fs::write(
            root.path().join("chirps.json"),
            r#"[{"id":3,"username":"s","content":"seeded","posted_at":"2024-01-01T00:00:00"}]"#,
        )
        .unwrap();
        let addr = start_standalone(root.path()).await;

        let (_, body) = send(addr, &request("GET", "/chirps", "")).await;
        let chirps = chirps_of(&body);
        assert_eq!(chirps.len(), 1);
        assert_eq!(chirps[0]["content"], "seeded");

        let (_, body) = send(
            addr,
            &request("POST", "/chirps", r#"{"username":"a","content":"next"}"#),
        )
        .await;
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["id"], 4);
    }

    // ============================================================
    // ROBUSTNESS
    // ============================================================

    #[tokio::test]
    async fn test_malformed_request_gets_400_and_server_keeps_serving() {
        let root = TempDir::new().unwrap();
        let addr = start_standalone(root.path()).await;

        let (status, _) = send(addr, "GARBAGE\r\n\r\n").await;
        assert_eq!(status, 400);

        let (status, _) = send(
            addr,
            "POST /chirps HTTP/1.1\r\nContent-Length: lots\r\n\r\n",
        )
        .await;
        assert_eq!(status, 400);

        let (status, _) = send(addr, &request("GET", "/chirps", "")).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_empty_and_stalled_connections_are_dropped() {
        let root = TempDir::new().unwrap();
        let addr = start_standalone(root.path()).await;

        drop(TcpStream::connect(addr).await.unwrap());

        // Never finishes its headers; closed after the read timeout.
        let mut stalled = TcpStream::connect(addr).await.unwrap();
        stalled.write_all(b"GET /chirps HTTP/1.1\r\n").await.unwrap();
        let mut buf = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(3), stalled.read_to_end(&mut buf)).await;
        assert!(read.is_ok(), "stalled connection was not closed");
        assert!(buf.is_empty());

        let (status, _) = send(addr, &request("GET", "/chirps", "")).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_unknown_method_and_options() {
        let root = TempDir::new().unwrap();
        let addr = start_standalone(root.path()).await;

        let (status, body) = send(addr, &request("PATCH", "/chirps/1", "")).await;
        assert_eq!(status, 405);
        assert!(body.contains("405 Method Not Allowed"));

        let (status, body) = send(addr, &request("OPTIONS", "/chirps", "")).await;
        assert_eq!(status, 200);
        assert!(body.is_empty());
    }

    // ============================================================
    // FEDERATION
    // ============================================================

    #[tokio::test]
    async fn test_mutual_peers_aggregate_without_looping() {
        // ARRANGE: two servers that name each other as peers
        let root_a = TempDir::new().unwrap();
        let root_b = TempDir::new().unwrap();
        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port_a = listener_a.local_addr().unwrap().port();
        let port_b = listener_b.local_addr().unwrap().port();

        let addr_a = start(
            listener_a,
            test_config(root_a.path(), vec![PeerDescriptor::new("127.0.0.1", port_b)]),
        )
        .await;
        let addr_b = start(
            listener_b,
            test_config(root_b.path(), vec![PeerDescriptor::new("127.0.0.1", port_a)]),
        )
        .await;

        send(addr_a, &request("POST", "/chirps", r#"{"username":"a","content":"from a"}"#)).await;
        send(addr_b, &request("POST", "/chirps", r#"{"username":"b","content":"from b"}"#)).await;

        // ACT
        let (status_a, body_a) = send(addr_a, &request("GET", "/chirps", "")).await;
        let (status_b, body_b) = send(addr_b, &request("GET", "/chirps", "")).await;

        // ASSERT: each sees its own chirp then the other's, exactly once
        assert_eq!(status_a, 200);
        assert_eq!(status_b, 200);
        let contents = |body: &str| {
            chirps_of(body)
                .iter()
                .map(|c| c["content"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(contents(&body_a), vec!["from a", "from b"]);
        assert_eq!(contents(&body_b), vec!["from b", "from a"]);
    }

    #[tokio::test]
    async fn test_via_naming_the_peer_suppresses_fan_out() {
        let root = TempDir::new().unwrap();
        let peer = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer_port = peer.local_addr().unwrap().port();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = start(
            listener,
            test_config(root.path(), vec![PeerDescriptor::new("127.0.0.1", peer_port)]),
        )
        .await;

        let raw = format!(
            "GET /chirps HTTP/1.1\r\nVia: 127.0.0.1:{}\r\n\r\n",
            peer_port
        );
        let (status, body) = send(addr, &raw).await;

        assert_eq!(status, 200);
        assert!(chirps_of(&body).is_empty());
        let dialled = tokio::time::timeout(Duration::from_millis(200), peer.accept()).await;
        assert!(dialled.is_err(), "peer named in Via was contacted");
    }

    #[tokio::test]
    async fn test_unreachable_peer_becomes_placeholder() {
        let root = TempDir::new().unwrap();
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = closed.local_addr().unwrap().port();
        drop(closed);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = start(
            listener,
            test_config(root.path(), vec![PeerDescriptor::new("127.0.0.1", dead_port)]),
        )
        .await;

        let (status, body) = send(addr, &request("GET", "/chirps", "")).await;

        assert_eq!(status, 200);
        let chirps = chirps_of(&body);
        assert_eq!(chirps.len(), 1);
        assert_eq!(chirps[0]["username"], "SYSTEM");
        assert_eq!(
            chirps[0]["content"],
            format!("Failed to connect to server: 127.0.0.1:{}", dead_port)
        );
    }
}
