//! Shared HTTP base used by every API module

pub mod types;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result, TransportError};

pub use types::{
    BoundingBox, Context, Feature, FeatureCollection, LineString, Location, PointGeometry,
    RouteGeometry,
};

/// Query parameters as ordered key/value pairs
pub type Params = Vec<(String, String)>;

/// Body of a Mapbox error response
#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Token holder and HTTP client shared by the API wrappers
pub struct Base {
    config: ClientConfig,
    client: Client,
}

impl Base {
    /// Create a new API base for the given access token
    pub fn new(token: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(token))
    }

    /// Create a new API base from a full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::from)?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL for a query path, without the token
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET `path` with the provided parameters plus the access token.
    ///
    /// Rate limiting (429) and authorization (401) failures are mapped to
    /// [`ApiError`]s; every other status is returned to the caller.
    pub fn query_request(&self, path: &str, params: &[(String, String)]) -> Result<Response> {
        let url = self.url(path);
        if self.config.debug {
            debug!("GET {} {:?}", url, params);
        }

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("access_token", self.config.access_token.as_str())])
            .send()
            .map_err(TransportError::from)?;

        if self.config.debug {
            debug!("{} -> {}", url, response.status());
        }

        check_status(response.status())?;
        Ok(response)
    }

    /// GET `path` and decode the JSON body into `T`
    pub fn query_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let response = self.query_request(path, params)?;
        let status = response.status();
        let body = response.bytes().map_err(TransportError::from)?;

        if status == StatusCode::BAD_REQUEST {
            return Err(match api_message(&body) {
                Some(message) => ApiError::Message(message).into(),
                None => ApiError::Message("Bad Request (400) - no message".into()).into(),
            });
        }
        if !status.is_success() {
            if let Some(message) = api_message(&body) {
                return Err(ApiError::Message(message).into());
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            }
            .into());
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Query `{api}/{version}/{mode}/{query}` and decode the JSON body
    pub fn query<T: DeserializeOwned>(
        &self,
        api: &str,
        version: &str,
        mode: &str,
        query: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        self.query_json(&format!("{}/{}/{}/{}", api, version, mode, query), params)
    }
}

/// Map the fixed status codes onto API errors
pub(crate) fn check_status(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimitExceeded.into()),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
        _ => Ok(()),
    }
}

/// Extract the `message` field of a JSON error body
pub(crate) fn api_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiMessage>(body)
        .ok()
        .map(|m| m.message)
}

/// Join locations as `lng,lat;lng,lat` for use in a request path
pub(crate) fn coordinate_path(locations: &[Location]) -> String {
    locations
        .iter()
        .map(|l| format!("{:.6},{:.6}", l.longitude, l.latitude))
        .collect::<Vec<_>>()
        .join(";")
}

/// Join displayable values with a separator
pub(crate) fn join<T: std::fmt::Display>(values: &[T], separator: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
