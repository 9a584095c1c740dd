//! Plain-text extraction from web pages.
//!
//! The main-content pass reads the first `article`, `main` or `[role=main]`
//! element. When that yields under [`MIN_MAIN_CHARS`] characters the whole
//! document is read too and the longer text wins.

use std::sync::LazyLock;
use std::time::Duration;

use scraper::{ElementRef, Html, Node, Selector};

use crate::{Error, Result};

pub const USER_AGENT: &str = "Mozilla/5.0 (KnowledgeGraphVisualizer/1.0)";
pub const MIN_MAIN_CHARS: usize = 400;
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

static MAIN_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("article, main, [role=main]").ok());
static BODY_SELECTOR: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("body").ok());

#[derive(Debug, Clone)]
pub struct TextExtractor {
    http: reqwest::Client,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    /// Downloads `url` and returns its readable text.
    pub async fn extract(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let html = response
            .text()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let text = html_to_text(&html);
        tracing::info!(url, chars = text.chars().count(), "extracted page text");
        Ok(text)
    }
}

/// Readable text of an HTML document, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let main = main_content(&document)
        .map(element_text)
        .unwrap_or_default();
    if main.chars().count() >= MIN_MAIN_CHARS {
        return main;
    }

    let full = element_text(document.root_element());
    if full.chars().count() > main.chars().count() {
        full
    } else {
        main
    }
}

fn main_content(document: &Html) -> Option<ElementRef<'_>> {
    [&*MAIN_SELECTOR, &*BODY_SELECTOR]
        .into_iter()
        .flatten()
        .find_map(|selector| document.select(selector).next())
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}
