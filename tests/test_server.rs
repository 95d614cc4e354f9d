//! Local HTTP server for tests
//!
//! Serves fixed HTML pages so Chrome-backed tests never depend on external
//! websites. Each instance binds a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use tokio::sync::oneshot;
use warp::Filter;

/// Content of `/login`
pub const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Sign in</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body>
    <h1>Login</h1>
    <form action="/session" method="post">
        <input name="username" type="text" placeholder="Username">
        <input name="password" type="password" placeholder="Password">
        <button type="submit">Sign in</button>
    </form>
    <a href="/forgot">Forgot password?</a>
    <a href="/register">Create an account</a>
</body>
</html>"#;

/// Renders its heading from script after a short delay
const DYNAMIC_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Loading</title>
</head>
<body>
    <div id="app"></div>
    <script>
        setTimeout(function () {
            document.getElementById('app').innerHTML =
                '<h2>Rendered later</h2><p>Inserted by script.</p>';
        }, 200);
    </script>
</body>
</html>"#;

pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a new test server on a random available port
    pub async fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let index = warp::path::end().map(|| warp::reply::html(LOGIN_HTML));
        let login = warp::path("login").map(|| warp::reply::html(LOGIN_HTML));
        let dynamic = warp::path("dynamic").map(|| warp::reply::html(DYNAMIC_HTML));

        let routes = index.or(login).or(dynamic);

        let (addr, server) =
            warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                shutdown_rx.await.ok();
            });

        tokio::spawn(server);

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this server (e.g., "http://127.0.0.1:12345")
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to answer a request
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let url = self.url();
        let max_attempts = 10;

        for attempt in 1..=max_attempts {
            match reqwest::get(&url).await {
                Ok(response) if response.status().is_success() => {
                    println!("✅ Test server ready on: {}", url);
                    return Ok(());
                }
                Ok(response) => {
                    println!(
                        "⚠️ Attempt {}: Server returned status {}",
                        attempt,
                        response.status()
                    );
                }
                Err(e) => {
                    println!("⚠️ Attempt {}: Server not ready - {}", attempt, e);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }

        anyhow::bail!(
            "Server did not become ready after {} attempts",
            max_attempts
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
