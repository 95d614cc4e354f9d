// spider_chrome re-exports chromiumoxide API
use crate::error::FetchError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const CHROME_HINT: &str = "\n\n\
    Chrome not found. You can:\n\
    - Install Chrome: https://www.google.com/chrome/\n\
    - Ubuntu/Debian: sudo apt install chromium-browser\n\
    - Fedora: sudo dnf install chromium\n\
    - macOS: brew install --cask google-chrome\n\
    - Or set fetch.chrome_path in gherkin-studio.yaml\n\
    - Linux sandbox issue? Set fetch.no_sandbox: true";

const SETTLE_PROBE: &str =
    "document.readyState + '|' + document.getElementsByTagName('*').length";

/// How Chrome is launched for a single fetch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub chrome_path: Option<String>,
    pub no_sandbox: bool,
    pub headless: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            no_sandbox: false,
            headless: true,
        }
    }
}

/// Timing budget for loading and settling a page.
#[derive(Debug, Clone)]
pub struct SettleOptions {
    /// Upper bound on waiting for the load event
    pub navigation_timeout: Duration,
    /// Upper bound on waiting for scripts to stop mutating the DOM
    pub settle_timeout: Duration,
    /// How long the DOM must stay unchanged to count as settled
    pub idle_quiet: Duration,
    /// Interval between DOM probes
    pub poll_interval: Duration,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_timeout: Duration::from_millis(7000),
            idle_quiet: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// A private headless Chrome with its own throwaway profile directory.
///
/// One driver serves one fetch; nothing (cookies, cache, storage) leaks
/// between fetches. The profile directory is removed on close or drop.
pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
    handler: JoinHandle<()>,
}

impl ChromeDriver {
    /// Launch a fresh browser instance
    pub async fn launch(options: &LaunchOptions) -> Result<Self, FetchError> {
        // Unique profile per instance so parallel fetches never share state
        let unique_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let temp_dir = std::env::temp_dir().join(format!(
            "gherkin-studio-{}-{}",
            std::process::id(),
            unique_id
        ));
        std::fs::create_dir_all(&temp_dir).map_err(|e| {
            FetchError::Failed(format!("Failed to create temp profile directory: {}", e))
        })?;

        let mut config = if options.headless {
            BrowserConfig::builder()
        } else {
            BrowserConfig::builder().with_head()
        };
        config = config.user_data_dir(&temp_dir);

        if options.no_sandbox {
            config = config.arg("--no-sandbox");
        }

        if let Some(path) = &options.chrome_path {
            config = config.chrome_executable(path);
        } else {
            match Self::ensure_chrome_installed().await {
                Ok(path) => {
                    config = config.chrome_executable(path);
                }
                Err(e) => {
                    // Let chromiumoxide look for a system install instead
                    log::warn!("Auto-download failed ({}), trying system Chrome...", e);
                }
            }
        }

        let launched = match config.build() {
            Ok(config) => Browser::launch(config)
                .await
                .map_err(|e| FetchError::Failed(format!("{}{}", e, CHROME_HINT))),
            Err(e) => Err(FetchError::Failed(format!("{}{}", e, CHROME_HINT))),
        };
        let (browser, mut handler) = match launched {
            Ok(pair) => pair,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&temp_dir);
                return Err(e);
            }
        };

        let handler = tokio::spawn(async move {
            while (handler.next().await).is_some() {
                // Handle browser events
            }
        });

        log::debug!("Launched Chrome with profile {:?}", temp_dir);

        Ok(Self {
            browser,
            temp_dir: Some(temp_dir),
            handler,
        })
    }

    /// Navigate, wait for load and DOM quiescence, and return the rendered
    /// document markup.
    pub async fn render(&self, url: &str, settle: &SettleOptions) -> Result<String, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Failed(format!("Failed to create page: {}", e)))?;

        // Subscribe before navigating so a fast load event is not missed
        let mut load_events = page.event_listener::<EventLoadEventFired>().await?;

        log::info!("🌐 Navigating to {}", url);
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("oneshot canceled") {
                FetchError::Failed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                FetchError::Failed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = response.result.error_text.as_deref() {
            log::warn!("❌ Navigation error from browser: {}", error_text);
            return Err(classify_navigation_error(url, error_text));
        }

        match tokio::time::timeout(settle.navigation_timeout, load_events.next()).await {
            Ok(Some(_)) => log::debug!("✓ Page load event fired"),
            Ok(None) => log::warn!("Load event stream closed before firing"),
            Err(_) => {
                return Err(FetchError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_secs: settle.navigation_timeout.as_secs(),
                })
            }
        }

        wait_for_quiet_dom(&page, settle).await;

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::Failed(format!("Failed to read page content: {}", e)))?;
        log::info!("✓ Rendered {} ({} KB)", url, html.len() / 1024);

        let _ = page.close().await;
        Ok(html)
    }

    /// Shut the browser down and remove its profile directory
    pub async fn close(mut self) -> Result<(), FetchError> {
        let result = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        if let Some(temp_dir) = self.temp_dir.take() {
            let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        }
        result
            .map(|_| ())
            .map_err(|e| FetchError::Failed(format!("Failed to close browser: {}", e)))
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf, FetchError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| FetchError::Failed("Cannot determine cache directory".to_string()))?
            .join("gherkin-studio")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| FetchError::Failed(format!("Failed to create cache dir: {}", e)))?;

        let marker = cache_dir.join(".downloaded");
        if marker.exists() {
            if let Some(executable) = find_chrome_in_cache(&cache_dir) {
                return Ok(executable);
            }
        }

        log::info!("📥 Downloading Chrome for Testing (first time only, ~150MB)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| FetchError::Failed(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| FetchError::Failed(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker, "downloaded")
            .await
            .map_err(|e| FetchError::Failed(format!("Failed to write marker: {}", e)))?;

        log::info!("✅ Chrome downloaded successfully!");
        Ok(info.executable_path)
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        self.handler.abort();
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
    [
        "chrome",
        "chrome.exe",
        "Google Chrome.app/Contents/MacOS/Google Chrome",
        "chrome-linux/chrome",
        "chrome-mac/Chromium.app/Contents/MacOS/Chromium",
        "chrome-win/chrome.exe",
    ]
    .iter()
    .map(|p| cache_dir.join(p))
    .find(|p| p.exists())
}

/// Poll readyState and element count until both hold still for
/// `idle_quiet`, giving up silently after `settle_timeout`.
async fn wait_for_quiet_dom(page: &Page, settle: &SettleOptions) {
    let started = Instant::now();
    let mut last: Option<String> = None;
    let mut stable_since = Instant::now();

    while started.elapsed() < settle.settle_timeout {
        let probe = match page.evaluate(SETTLE_PROBE).await {
            Ok(result) => result.into_value::<String>().ok(),
            Err(e) => {
                log::debug!("DOM probe failed: {}", e);
                None
            }
        };

        match (&probe, &last) {
            (Some(now), Some(before)) if now == before => {
                if now.starts_with("complete|") && stable_since.elapsed() >= settle.idle_quiet {
                    log::debug!("✓ DOM settled after {:?}", started.elapsed());
                    return;
                }
            }
            _ => {
                stable_since = Instant::now();
                last = probe;
            }
        }

        tokio::time::sleep(settle.poll_interval).await;
    }

    log::debug!(
        "DOM still changing after {:?}; capturing as-is",
        settle.settle_timeout
    );
}

/// Map a Chrome `net::ERR_*` navigation error onto the fetch error kinds.
pub fn classify_navigation_error(url: &str, error_text: &str) -> FetchError {
    const NETWORK: &[&str] = &[
        "ERR_NAME_NOT_RESOLVED",
        "ERR_CONNECTION_REFUSED",
        "ERR_CONNECTION_RESET",
        "ERR_CONNECTION_CLOSED",
        "ERR_CONNECTION_FAILED",
        "ERR_CONNECTION_TIMED_OUT",
        "ERR_INTERNET_DISCONNECTED",
        "ERR_ADDRESS_UNREACHABLE",
        "ERR_NETWORK_CHANGED",
        "ERR_TIMED_OUT",
    ];

    if NETWORK.iter().any(|code| error_text.contains(code)) {
        FetchError::Network(format!("{} ({})", error_text, url))
    } else {
        FetchError::Failed(format!("{} ({})", error_text, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_network_errors() {
        for text in [
            "net::ERR_NAME_NOT_RESOLVED",
            "net::ERR_CONNECTION_REFUSED",
            "net::ERR_INTERNET_DISCONNECTED",
        ] {
            assert!(matches!(
                classify_navigation_error("https://x.test", text),
                FetchError::Network(_)
            ));
        }
    }

    #[test]
    fn test_classify_other_errors() {
        let err = classify_navigation_error("https://x.test", "net::ERR_ABORTED");
        assert!(matches!(err, FetchError::Failed(_)));
        assert!(err.to_string().contains("ERR_ABORTED"));
    }

    #[test]
    fn test_find_chrome_in_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_chrome_in_cache(dir.path()).is_none());
        std::fs::write(dir.path().join("chrome"), "").unwrap();
        assert_eq!(
            find_chrome_in_cache(dir.path()),
            Some(dir.path().join("chrome"))
        );
    }
}
