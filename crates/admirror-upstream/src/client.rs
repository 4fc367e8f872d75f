use admirror::RateLimiter;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::models::PagedResponse;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Upper bound on pages per collection, in case the upstream keeps handing out cursors
const MAX_PAGES: usize = 10_000;

const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct AdPlatformClient {
    base_url: String,
    default_headers: HeaderMap,
    client: reqwest::Client,
    page_size: usize,
}

impl AdPlatformClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        page_size: usize,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", api_key)
                .parse()
                .map_err(|e| format!("Invalid API key format: {}", e))?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: headers,
            client,
            page_size: page_size.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn describe_send_error(e: reqwest::Error, url: &str) -> String {
        let cause = if e.is_timeout() {
            "timed out (see request_timeout_secs)"
        } else if e.is_connect() {
            "could not connect"
        } else {
            "request failed"
        };
        format!("GET {} {}: {}", url, cause, e)
    }

    /// Body of a 2xx response; anything else becomes an `HTTP <status>` error
    async fn read_body(response: reqwest::Response, url: &str) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body from {}: {}", url, e))?;
        if status.is_success() {
            return Ok(body);
        }

        let excerpt = match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
            Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
            None => body,
        };
        Err(format!("HTTP {} error from {}: {}", status.as_u16(), url, excerpt).into())
    }

    /// Default headers plus the current trace context
    fn traced_headers(&self) -> HeaderMap {
        use opentelemetry::global;
        use opentelemetry::Context;

        struct HeaderInjector {
            headers: HeaderMap,
        }
        impl opentelemetry::propagation::Injector for HeaderInjector {
            fn set(&mut self, key: &str, value: String) {
                if let Ok(header_name) = reqwest::header::HeaderName::from_bytes(key.as_bytes()) {
                    if let Ok(header_value) = reqwest::header::HeaderValue::from_str(&value) {
                        self.headers.insert(header_name, header_value);
                    }
                }
            }
        }

        let mut injector = HeaderInjector {
            headers: self.default_headers.clone(),
        };
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&Context::current(), &mut injector);
        });
        injector.headers
    }

    /// Fetches one page of `path`
    #[tracing::instrument(name = "upstream.get_page", skip(self), fields(base_url = %self.base_url))]
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        cursor: Option<&str>,
    ) -> Result<PagedResponse<T>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut query = vec![("limit", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .headers(self.traced_headers())
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                let message = Self::describe_send_error(e, &url);
                error!("[AdPlatformClient] {}", message);
                message
            })?;

        let response_text = Self::read_body(response, &url).await.map_err(|e| {
            error!("[AdPlatformClient] {}", e);
            e
        })?;

        let page: PagedResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                "[AdPlatformClient] Failed to parse page from {}: {} - Response: {}",
                url,
                e,
                response_text.chars().take(200).collect::<String>()
            );
            format!("Failed to parse response from {}: {}", url, e)
        })?;

        debug!(
            "[AdPlatformClient] Page from {}: {} items, next_cursor={:?}",
            url,
            page.data.len(),
            page.next_cursor
        );
        Ok(page)
    }

    /// Follows `next_cursor` until the collection is exhausted.
    /// Acquires a permit from `limiter` before every request.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        limiter: &RateLimiter,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            limiter.acquire().await;
            let page = self.get_page::<T>(path, cursor.as_deref()).await?;
            let next = page.next().map(str::to_string);
            items.extend(page.data);

            match next {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(format!(
                        "Upstream returned the same cursor twice for {} (page {})",
                        path, page_number
                    )
                    .into());
                }
                Some(next) => cursor = Some(next),
                None => {
                    info!(
                        "[AdPlatformClient] Fetched {} items from {} in {} page(s)",
                        items.len(),
                        path,
                        page_number
                    );
                    return Ok(items);
                }
            }
        }

        Err(format!("Gave up on {} after {} pages", path, MAX_PAGES).into())
    }
}
