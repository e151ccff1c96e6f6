//! Shared host-capability surface for the two web-adjacent stubs. Actual
//! HTTP and HTML parsing live entirely on the host side — these plugins
//! only validate arguments, clamp limits, and shape the response.

use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct WebPayload {
    pub text: String,
    pub url: String,
    pub status_code: i32,
    pub content_type: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebLink {
    pub text: String,
    pub url: String,
}

pub trait WebHost {
    fn ensure_network_allowed(&self) -> Result<()>;
    fn fetch_web_url(&self, url: &str) -> Result<WebPayload>;
    fn parse_duckduckgo_results(&self, html: &str, limit: usize) -> Vec<SearchResult>;
    fn extract_html_title(&self, html: &str) -> String;
    fn html_to_text(&self, html: &str) -> String;
    fn extract_html_links(&self, html: &str, base_url: &str, limit: usize) -> Vec<WebLink>;
    fn normalize_http_url(&self, raw: &str) -> String;
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
