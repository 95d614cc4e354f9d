//! Headless Chrome fetching against the local test server
//!
//! These launch a real browser (downloading one on first use), so they are
//! ignored by default. Run with `cargo test -- --ignored`.

mod fakes;
mod test_server;

use fakes::ScriptedBackend;
use gherkin_studio::{
    validate_url, AppConfig, Category, ChromeFetcher, FetchError, LaunchOptions, PageFetcher,
    Pipeline, SettleOptions,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use test_server::TestServer;

fn fetcher() -> ChromeFetcher {
    ChromeFetcher::new(
        LaunchOptions {
            no_sandbox: true,
            ..LaunchOptions::default()
        },
        SettleOptions::default(),
    )
}

#[tokio::test]
#[ignore = "launches Chrome"]
async fn test_fetch_returns_rendered_html() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;

    let url = validate_url(&format!("{}/login", server.url()))?;
    let html = fetcher().fetch(&url).await?;

    assert!(html.contains("<h1>Login</h1>"));
    assert!(html.contains("Create an account"));
    Ok(())
}

#[tokio::test]
#[ignore = "launches Chrome"]
async fn test_fetch_waits_for_script_rendered_content() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;

    let url = validate_url(&format!("{}/dynamic", server.url()))?;
    let html = fetcher().fetch(&url).await?;

    assert!(
        html.contains("Rendered later"),
        "settle wait should capture content inserted after load"
    );
    Ok(())
}

#[tokio::test]
#[ignore = "launches Chrome"]
async fn test_unreachable_host_is_a_fetch_error() -> anyhow::Result<()> {
    // Bind then drop a listener so the port is known to be closed
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };

    let url = validate_url(&format!("http://127.0.0.1:{}/", port))?;
    let result = fetcher().fetch(&url).await;

    assert!(matches!(
        result,
        Err(FetchError::Network(_)) | Err(FetchError::Failed(_))
    ));
    Ok(())
}

#[tokio::test]
#[ignore = "launches Chrome"]
async fn test_pipeline_over_real_browser() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;

    let backend = Arc::new(ScriptedBackend::new());
    let pipeline = Pipeline::new(&AppConfig::default(), Arc::new(fetcher()), backend.clone());

    let enabled: BTreeSet<Category> = [Category::Headings, Category::Links, Category::Forms]
        .into_iter()
        .collect();
    let report = pipeline
        .run(&format!("{}/login", server.url()), &enabled)
        .await?;

    assert_eq!(report.stats[&Category::Headings], 1);
    assert_eq!(report.stats[&Category::Links], 2);
    assert_eq!(report.stats[&Category::Forms], 1);
    assert!(report.errors.is_empty());
    Ok(())
}
