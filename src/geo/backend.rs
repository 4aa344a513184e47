use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::query::Expr;
use super::region::Region;

/// Handle to a raster the backend evaluated, clipped to its region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterResult {
    /// Opaque identifier issued by the backend; used to sample or render it.
    pub handle: String,
    pub expression: Expr,
    pub region: Region,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to geospatial backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geospatial backend error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("malformed geospatial backend response: {0}")]
    Malformed(String),
}

/// The external engine that evaluates dataset expressions.
#[async_trait::async_trait]
pub trait GeoBackend: Send + Sync {
    /// Evaluate `expr` clipped to `region` and return a raster handle.
    async fn evaluate(&self, expr: &Expr, region: &Region) -> Result<RasterResult, BackendError>;

    /// Count the unmasked pixels of `layer` at the given sampling scale.
    async fn count_pixels(&self, layer: &RasterResult, scale_m: u32) -> Result<u64, BackendError>;
}

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    expression: &'a Expr,
    region: &'a Region,
}

#[derive(Deserialize)]
struct EvaluateResponse {
    handle: String,
}

#[derive(Serialize)]
struct CountRequest<'a> {
    handle: &'a str,
    scale: u32,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// JSON-over-HTTP client for a geospatial evaluation service.
pub struct HttpGeoBackend {
    pub endpoint: String,
    client: reqwest::Client,
}

impl HttpGeoBackend {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, BackendError> {
        let response = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl GeoBackend for HttpGeoBackend {
    async fn evaluate(&self, expr: &Expr, region: &Region) -> Result<RasterResult, BackendError> {
        let response: EvaluateResponse = self
            .post(
                "/v1/evaluate",
                &EvaluateRequest {
                    expression: expr,
                    region,
                },
            )
            .await?;

        log::debug!("Backend: evaluated expression as {}", response.handle);

        Ok(RasterResult {
            handle: response.handle,
            expression: expr.clone(),
            region: region.clone(),
        })
    }

    async fn count_pixels(&self, layer: &RasterResult, scale_m: u32) -> Result<u64, BackendError> {
        let response: CountResponse = self
            .post(
                "/v1/count",
                &CountRequest {
                    handle: &layer.handle,
                    scale: scale_m,
                },
            )
            .await?;
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let backend =
            HttpGeoBackend::new("http://localhost:8080/".to_string(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(backend.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_evaluate_request_shape() {
        let expr = Expr::image("ESA/WorldCover/v100/2020");
        let region = Region::from_km(78.4867, 17.3850, 30);
        let body = serde_json::to_value(EvaluateRequest {
            expression: &expr,
            region: &region,
        })
        .unwrap();
        assert_eq!(body["expression"]["op"], "image");
        assert_eq!(body["region"]["buffer_m"], 30_000.0);
    }
}
