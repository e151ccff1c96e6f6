//! Fetch-and-extract a single web page. Out of scope for the user-memory
//! store proper — see `duckduckgo.rs` for the same rationale.

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};

use super::web::{collapse_whitespace, WebHost, WebLink};

#[derive(Debug, Default, Deserialize)]
pub struct VisitWebsiteArgs {
    pub url: Option<String>,
    pub max_chars: Option<i32>,
    pub max_links: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct VisitWebsiteResult {
    pub requested_url: String,
    pub url: String,
    pub status_code: i32,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub links: Vec<WebLink>,
    pub truncated: bool,
}

pub fn handle(args: VisitWebsiteArgs, host: &dyn WebHost) -> Result<VisitWebsiteResult> {
    let raw_url = args.url.unwrap_or_default().trim().to_string();
    if raw_url.is_empty() {
        return Err(MemoryError::InvalidArgument("url is required".into()));
    }
    host.ensure_network_allowed()?;

    let max_chars = args.max_chars.unwrap_or(6000).clamp(400, 40_000) as usize;
    let max_links = args.max_links.unwrap_or(20).clamp(0, 100) as usize;

    let payload = host.fetch_web_url(&raw_url)?;
    let is_html = payload.content_type.to_lowercase().contains("html");

    let title = if is_html { host.extract_html_title(&payload.text) } else { String::new() };
    let mut content = if is_html {
        host.html_to_text(&payload.text)
    } else {
        collapse_whitespace(&payload.text)
    };
    let char_count = content.chars().count();
    let exceeds_cap = char_count > max_chars;
    if exceeds_cap {
        content = content.chars().take(max_chars).collect();
    }
    content = content.trim().to_string();

    let effective_url = if payload.url.is_empty() { raw_url.clone() } else { payload.url.clone() };
    let links = if is_html {
        host.extract_html_links(&payload.text, &effective_url, max_links)
    } else {
        Vec::new()
    };

    Ok(VisitWebsiteResult {
        requested_url: host.normalize_http_url(&raw_url),
        url: effective_url,
        status_code: if payload.status_code == 0 { 200 } else { payload.status_code },
        content_type: payload.content_type,
        title,
        content,
        links,
        truncated: payload.truncated || exceeds_cap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::web::WebPayload;

    struct StubHost {
        content_type: &'static str,
    }
    impl WebHost for StubHost {
        fn ensure_network_allowed(&self) -> Result<()> {
            Ok(())
        }
        fn fetch_web_url(&self, url: &str) -> Result<WebPayload> {
            Ok(WebPayload {
                text: "hello   world".into(),
                url: url.to_string(),
                status_code: 200,
                content_type: self.content_type.into(),
                truncated: false,
            })
        }
        fn parse_duckduckgo_results(&self, _html: &str, _limit: usize) -> Vec<super::super::web::SearchResult> {
            Vec::new()
        }
        fn extract_html_title(&self, _html: &str) -> String {
            "Title".into()
        }
        fn html_to_text(&self, html: &str) -> String {
            html.to_string()
        }
        fn extract_html_links(&self, _html: &str, _base_url: &str, _limit: usize) -> Vec<WebLink> {
            Vec::new()
        }
        fn normalize_http_url(&self, raw: &str) -> String {
            raw.to_string()
        }
    }

    #[test]
    fn rejects_empty_url() {
        let err = handle(VisitWebsiteArgs::default(), &StubHost { content_type: "text/html" }).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn collapses_whitespace_for_non_html() {
        let result = handle(
            VisitWebsiteArgs { url: Some("https://example.com/a.txt".into()), ..Default::default() },
            &StubHost { content_type: "text/plain" },
        )
        .unwrap();
        assert_eq!(result.content, "hello world");
    }
}
