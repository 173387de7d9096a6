//! HTTP client for the remote product catalog.
//!
//! Thin wrapper over the catalog's JSON API: keyword search, full paginated
//! listing, and by-id lookup. No caching, no rate limiting, no internal
//! retries: a non-2xx status or unparsable body is a hard failure for that
//! call.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::schema::CatalogConfig;
use crate::errors::CatalogError;

use super::types::{Product, SearchResult};

/// Client for the product catalog API.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    client: Client,
}

/// Pull `(products, total)` out of a list-shaped response body.
fn parse_page_body(body: &Value) -> Result<(Vec<Product>, u64), CatalogError> {
    let raw_products = body
        .get("products")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Upstream {
            status: 200,
            message: "response body has no 'products' array".to_string(),
        })?;
    let products: Vec<Product> = raw_products.iter().map(Product::from_value).collect();
    let total = body
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(products.len() as u64);
    Ok((products, total))
}

/// Truncate an error body for diagnostics.
fn short_body(text: &str) -> String {
    const MAX: usize = 200;
    if text.len() > MAX {
        format!("{}...", &text[..MAX])
    } else {
        text.to_string()
    }
}

impl CatalogClient {
    pub fn new(cfg: &CatalogConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// GET a URL and parse the JSON body, mapping failures to [`CatalogError`].
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, CatalogError> {
        debug!("catalog GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message: short_body(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| CatalogError::Upstream {
            status: status.as_u16(),
            message: format!("unparsable response body: {}", e),
        })
    }

    /// Keyword search. Returns one page of normalized products plus the
    /// advertised total and the query actually used.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        skip: u32,
    ) -> Result<SearchResult, CatalogError> {
        let url = format!("{}/search", self.base_url);
        let body = self
            .get_json(
                &url,
                &[
                    ("q", query.to_string()),
                    ("limit", limit.to_string()),
                    ("skip", skip.to_string()),
                ],
            )
            .await?;
        let (products, total) = parse_page_body(&body)?;
        Ok(SearchResult {
            products,
            total,
            query: query.to_string(),
        })
    }

    /// Fetch the entire catalog by paging `skip` forward by `limit` until a
    /// short page arrives or the advertised total is reached. Any page
    /// failure fails the whole call; there is no partial-result return.
    pub async fn get_all(&self, limit: u32, skip: u32) -> Result<Vec<Product>, CatalogError> {
        let limit = limit.max(1);
        let mut skip = skip;
        let mut all: Vec<Product> = Vec::new();

        loop {
            let body = self
                .get_json(
                    &self.base_url,
                    &[("limit", limit.to_string()), ("skip", skip.to_string())],
                )
                .await?;
            let (products, total) = parse_page_body(&body)?;
            let page_len = products.len();
            all.extend(products);

            if (page_len as u32) < limit || (all.len() as u64) >= total {
                break;
            }
            skip += limit;
        }

        Ok(all)
    }

    /// Fetch a single product by id. A 404 maps to [`CatalogError::NotFound`].
    pub async fn get_by_id(&self, id: i64) -> Result<Product, CatalogError> {
        let url = format!("{}/{}", self.base_url, id);
        match self.get_json(&url, &[]).await {
            Ok(body) => Ok(Product::from_value(&body)),
            Err(CatalogError::Upstream { status: 404, .. }) => Err(CatalogError::NotFound(id)),
            Err(e) => Err(e),
        }
    }
}
