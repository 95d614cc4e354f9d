pub mod browser;
pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod generate;
pub mod pipeline;
pub mod server;

//  Re-export commonly used items
pub use browser::chrome::{ChromeDriver, LaunchOptions, SettleOptions};
pub use config::{load_config, AppConfig};
pub use draft::{Draft, FeatureDocument, Session, SourceKind};
pub use error::{ConfigError, DraftError, Error, FetchError, GenerationError, Result};
pub use extract::{extract, extract_with_base, CategorizedInventory, Category, UiElement};
pub use fetch::{validate_url, ChromeFetcher, PageFetcher};
pub use generate::{
    generate_from_story, CategoryGenerator, CategoryResult, CategoryStatus, ClaudeCliBackend,
    GenerativeBackend, OpenAiBackend,
};
pub use pipeline::{CategoryFailure, GenerationReport, Pipeline};
