//! HTTP client for the catalog API.

use serde::Serialize;
use thiserror::Error;

use vendora_core::ProductId;

use crate::types::{AvailabilityRecord, CatalogProduct};

/// Failure modes of a catalog call.
///
/// These are transport/integration failures, deliberately distinct from the
/// cart's capacity and availability verdicts: the checkout flow must be able
/// to tell "some items are out of stock" apart from "we couldn't check".
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Read-side catalog collaborator.
///
/// `check_availability` is a single batched round trip; implementations must
/// not fan out per item. Static dispatch only (engines are generic over the
/// client), so plain async fns suffice.
pub trait CatalogClient {
    /// Fetch one product; `Ok(None)` when the catalog doesn't know the id.
    fn fetch_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<CatalogProduct>, CatalogError>>;

    /// Batched stock/activity lookup for the given ids.
    ///
    /// Response order is unspecified and ids may be missing; callers index
    /// the records by id.
    fn check_availability(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<AvailabilityRecord>, CatalogError>>;
}

/// Catalog client over the storefront's REST API.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct VerifyStockRequest<'a> {
    product_ids: &'a [ProductId],
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: Some(token.into()),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl CatalogClient for HttpCatalogClient {
    async fn fetch_product(&self, id: ProductId) -> Result<Option<CatalogProduct>, CatalogError> {
        let url = format!("{}/products/{}", self.base_url, id);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(CatalogError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        let product = resp
            .json::<CatalogProduct>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Some(product))
    }

    async fn check_availability(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<AvailabilityRecord>, CatalogError> {
        let url = format!("{}/products/verify-stock", self.base_url);
        let resp = self
            .authed(self.http.post(&url))
            .json(&VerifyStockRequest { product_ids: ids })
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CatalogError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        resp.json::<Vec<AvailabilityRecord>>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}
