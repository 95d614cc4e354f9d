//! Scenario generation
//!
//! Each enabled category with extracted elements is turned into a prompt
//! (see `prompts`) and sent to a `GenerativeBackend`. Failures stay local to
//! the category that produced them.

pub mod backend;
pub mod generator;
pub mod prompts;
pub mod story;

pub use backend::{ClaudeCliBackend, GenerativeBackend, OpenAiBackend};
pub use generator::{
    clean_response, count_scenarios, CategoryGenerator, CategoryResult, CategoryStatus,
};
pub use story::generate_from_story;
