//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use rest_server::{RestServer, ServerConfig};

/// A server bound to an ephemeral local port.
pub struct TestServer {
    pub server: RestServer,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn close(self) {
        self.server.close().await.unwrap();
    }
}

/// Default configuration bound to loopback.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config
}

/// Register endpoints through `configure`, then listen on port 0.
pub async fn start_server<F>(configure: F) -> TestServer
where
    F: FnOnce(&RestServer),
{
    let server = RestServer::new(test_config());
    configure(&server);
    let addr = server.listen(Some(0)).await.unwrap();

    TestServer {
        server,
        addr,
        client: reqwest::Client::new(),
    }
}

pub fn fixtures(dir: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(dir)
}
