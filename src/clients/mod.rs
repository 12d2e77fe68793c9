/// Forecast service client module
use crate::config::ClientConfig;
use crate::domain::{ForecastPayload, ForecastRequest, Overlay, OverlayRequest, StatesSummary};
use crate::errors::{ClientError, ClientResult};
use reqwest::{header::CONTENT_TYPE, Client, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// HTTP client wrapper with common configuration
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> ClientResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Response read to completion within the deadline
struct RawResponse {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// Client for the forecast service.
///
/// Stateless apart from its configuration: every call is independent, there is
/// no caching and no retry. Clones share the underlying connection pool.
#[derive(Clone)]
pub struct ForecastClient {
    http_client: HttpClient,
    config: ClientConfig,
}

impl ForecastClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(&config.user_agent)?,
            config,
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Build the `GET /forecast` request without sending it
    pub fn forecast_request(&self, req: &ForecastRequest) -> ClientResult<Request> {
        req.validate()?;
        self.http_client
            .get_client()
            .get(self.endpoint("forecast"))
            .query(&req.query_pairs())
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("cannot build request: {}", e)))
    }

    /// Fetch the forecast payload for one location
    pub async fn fetch_forecast(&self, req: &ForecastRequest) -> ClientResult<ForecastPayload> {
        let request = self.forecast_request(req)?;
        let deadline = req.timeout.unwrap_or(self.config.default_timeout);
        let payload: ForecastPayload = self.get_json(request, deadline).await?;
        Ok(payload.normalized())
    }

    /// Fetch per-state risk used to pre-color the choropleth
    pub async fn fetch_states_summary(&self, skip_satellite: bool) -> ClientResult<StatesSummary> {
        let request = self
            .http_client
            .get_client()
            .get(self.endpoint("states/summary"))
            .query(&[("skip_nasa", skip_satellite.to_string())])
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("cannot build request: {}", e)))?;

        self.get_json(request, self.config.default_timeout).await
    }

    /// Fetch the latest satellite raster overlay; the image is not decoded
    pub async fn fetch_latest_overlay(&self, req: &OverlayRequest) -> ClientResult<Overlay> {
        if let Some(bbox) = &req.bbox {
            bbox.validate()?;
        }
        let request = self
            .http_client
            .get_client()
            .get(self.endpoint("tempo/latest_overlay.png"))
            .query(&req.query_pairs())
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("cannot build request: {}", e)))?;

        let raw = self.execute(request, self.config.default_timeout).await?;
        Ok(Overlay {
            content_type: raw.content_type,
            data: raw.body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: Request,
        deadline: Duration,
    ) -> ClientResult<T> {
        let raw = self.execute(request, deadline).await?;
        serde_json::from_slice(&raw.body)
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    /// Send a request and read its body under one deadline.
    ///
    /// On expiry the in-flight future is dropped, which closes the connection
    /// and releases the timer.
    async fn execute(&self, request: Request, deadline: Duration) -> ClientResult<RawResponse> {
        let url = request.url().clone();
        let started = Instant::now();
        debug!(%url, deadline_ms = deadline.as_millis() as u64, "sending request");

        let exchange = async {
            let resp = self
                .http_client
                .get_client()
                .execute(request)
                .await
                .map_err(|e| transport_error(e, deadline))?;

            let status = resp.status().as_u16();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp
                .bytes()
                .await
                .map_err(|e| transport_error(e, deadline))?;

            Ok::<_, ClientError>(RawResponse {
                status,
                content_type,
                body: body.to_vec(),
            })
        };

        let raw = match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(deadline)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match raw {
            Ok(raw) if (200..300).contains(&raw.status) => {
                info!(%url, status = raw.status, elapsed_ms, "request completed");
                Ok(raw)
            }
            Ok(raw) => {
                let detail = extract_detail(&raw.body);
                warn!(%url, status = raw.status, ?detail, elapsed_ms, "request rejected");
                Err(ClientError::Http {
                    status: raw.status,
                    detail,
                })
            }
            Err(e) => {
                warn!(%url, error = %e, elapsed_ms, "request failed");
                Err(e)
            }
        }
    }
}

fn transport_error(err: reqwest::Error, deadline: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(deadline)
    } else {
        ClientError::Network(err)
    }
}

/// `detail` from a structured error body, else the raw text
fn extract_detail(body: &[u8]) -> Option<String> {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        match json.get("detail") {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
