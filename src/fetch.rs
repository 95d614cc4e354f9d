//! Page fetching: URL in, rendered HTML out.

use crate::browser::{ChromeDriver, LaunchOptions, SettleOptions};
use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// Retrieves the fully rendered HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Parse `raw` and require an absolute http(s) URL with a host.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl(format!("{} ({})", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "{} (unsupported scheme '{}')",
            trimmed,
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl(format!("{} (missing host)", trimmed)));
    }
    Ok(url)
}

/// Fetches pages with a fresh headless Chrome per call.
pub struct ChromeFetcher {
    launch: LaunchOptions,
    settle: SettleOptions,
}

impl ChromeFetcher {
    pub fn new(launch: LaunchOptions, settle: SettleOptions) -> Self {
        Self { launch, settle }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.launch_options(), config.settle_options())
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let driver = ChromeDriver::launch(&self.launch).await?;
        let rendered = driver.render(url.as_str(), &self.settle).await;

        if let Err(e) = driver.close().await {
            log::debug!("Browser did not close cleanly: {}", e);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert_eq!(
            validate_url("https://example.com/login").unwrap().as_str(),
            "https://example.com/login"
        );
        assert!(validate_url("  http://localhost:8080/  ").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_malformed_input() {
        for raw in [
            "",
            "example.com",
            "not a url",
            "ftp://example.com/file",
            "file:///etc/passwd",
            "mailto:someone@example.com",
            "javascript:alert(1)",
        ] {
            assert!(
                matches!(validate_url(raw), Err(FetchError::InvalidUrl(_))),
                "accepted {:?}",
                raw
            );
        }
    }
}
