//! Test doubles for the two external collaborators.
//!
//! `ScriptedBackend` answers prompts per category and records which
//! categories it was asked about. `StaticFetcher` serves fixed markup or a
//! fixed failure and counts calls.

#![allow(dead_code)]

use async_trait::async_trait;
use gherkin_studio::generate::prompts;
use gherkin_studio::{Category, FetchError, GenerationError, GenerativeBackend, PageFetcher};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// The login page: 1 heading, 2 links, 1 form with two inputs and a submit
/// button.
pub const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Sign in</title>
</head>
<body>
    <h1>Login</h1>
    <form action="/session" method="post">
        <label for="username">Username</label>
        <input id="username" name="username" type="text" required>
        <label for="password">Password</label>
        <input id="password" name="password" type="password" required>
        <button type="submit">Sign in</button>
    </form>
    <a href="/forgot">Forgot password?</a>
    <a href="/register">Create an account</a>
</body>
</html>"#;

enum Reply {
    Text(String),
    Fail(String),
}

pub struct ScriptedBackend {
    replies: HashMap<Category, Reply>,
    story_reply: String,
    calls: Mutex<Vec<Category>>,
    story_calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Every category answers with one scenario named after the category.
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            story_reply: "Feature: User story\n\n  Scenario: Happy path\n    Given a user\n    Then it works"
                .to_string(),
            calls: Mutex::new(Vec::new()),
            story_calls: AtomicUsize::new(0),
        }
    }

    pub fn reply_for(mut self, category: Category, text: &str) -> Self {
        self.replies.insert(category, Reply::Text(text.to_string()));
        self
    }

    pub fn fail_for(mut self, category: Category, reason: &str) -> Self {
        self.replies.insert(category, Reply::Fail(reason.to_string()));
        self
    }

    /// Categories prompted so far, sorted
    pub fn calls(&self) -> Vec<Category> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn story_calls(&self) -> usize {
        self.story_calls.load(Ordering::SeqCst)
    }

    pub fn default_reply(category: Category) -> String {
        format!(
            "@{c}\nScenario: Verify {c}\n  Then the user should see the {c}",
            c = category
        )
    }
}

fn prompted_category(prompt: &str) -> Option<Category> {
    Category::ALL.into_iter().find(|c| {
        prompt.contains(&format!(
            "following {} elements",
            prompts::strategy(*c).noun
        ))
    })
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let Some(category) = prompted_category(prompt) else {
            self.story_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(self.story_reply.clone());
        };

        self.calls.lock().unwrap().push(category);
        match self.replies.get(&category) {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail(reason)) => Err(GenerationError::Backend(reason.clone())),
            None => Ok(Self::default_reply(category)),
        }
    }
}

pub struct StaticFetcher {
    html: Option<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn html(html: &str) -> Self {
        Self {
            html: Some(html.to_string()),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every fetch with a network error
    pub fn unreachable(reason: &str) -> Self {
        Self {
            html: None,
            failure: Some(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (&self.html, &self.failure) {
            (_, Some(reason)) => Err(FetchError::Network(reason.clone())),
            (Some(html), None) => Ok(html.clone()),
            (None, None) => Err(FetchError::Failed("nothing to serve".to_string())),
        }
    }
}
