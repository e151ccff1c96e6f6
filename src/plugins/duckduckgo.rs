//! DuckDuckGo HTML-endpoint search. Out of scope for the user-memory store
//! proper — kept as a thin stub so a host wiring this crate's binary can
//! still offer the same tool surface as the original plugin set.

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};

use super::web::{percent_encode, SearchResult, WebHost};

#[derive(Debug, Default, Deserialize)]
pub struct DuckDuckGoArgs {
    pub query: Option<String>,
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DuckDuckGoResult {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchResult>,
    pub source: &'static str,
    pub search_url: String,
    pub response_url: String,
    pub status_code: i32,
}

pub fn handle(args: DuckDuckGoArgs, host: &dyn WebHost) -> Result<DuckDuckGoResult> {
    let query = args.query.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Err(MemoryError::InvalidArgument("query is required".into()));
    }
    host.ensure_network_allowed()?;

    let limit = args.limit.unwrap_or(5).clamp(1, 10) as usize;
    let search_url = format!("https://duckduckgo.com/html/?q={}", percent_encode(&query));
    let payload = host.fetch_web_url(&search_url)?;
    let results = host.parse_duckduckgo_results(&payload.text, limit);
    let response_url = if payload.url.is_empty() {
        search_url.clone()
    } else {
        payload.url
    };
    let status_code = if payload.status_code == 0 { 200 } else { payload.status_code };

    Ok(DuckDuckGoResult {
        query,
        count: results.len(),
        results,
        source: "duckduckgo",
        search_url,
        response_url,
        status_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubHost;
    impl WebHost for StubHost {
        fn ensure_network_allowed(&self) -> Result<()> {
            Ok(())
        }
        fn fetch_web_url(&self, url: &str) -> Result<super::super::web::WebPayload> {
            Ok(super::super::web::WebPayload {
                text: "<html></html>".into(),
                url: url.to_string(),
                status_code: 200,
                content_type: "text/html".into(),
                truncated: false,
            })
        }
        fn parse_duckduckgo_results(&self, _html: &str, _limit: usize) -> Vec<SearchResult> {
            vec![SearchResult { title: "Example".into(), url: "https://example.com".into() }]
        }
        fn extract_html_title(&self, _html: &str) -> String {
            String::new()
        }
        fn html_to_text(&self, _html: &str) -> String {
            String::new()
        }
        fn extract_html_links(&self, _html: &str, _base_url: &str, _limit: usize) -> Vec<super::super::web::WebLink> {
            Vec::new()
        }
        fn normalize_http_url(&self, raw: &str) -> String {
            raw.to_string()
        }
    }

    #[test]
    fn rejects_empty_query() {
        let err = handle(DuckDuckGoArgs::default(), &StubHost).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn returns_parsed_results() {
        let result = handle(
            DuckDuckGoArgs { query: Some("rust".into()), limit: Some(3) },
            &StubHost,
        )
        .unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.source, "duckduckgo");
    }
}
