//! Internet connectivity check used to pick the online or offline path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::http::{TransportError, build_client, get};

/// Endpoint that answers `204 No Content` when the internet is reachable.
pub const DEFAULT_PROBE_URL: &str = "http://clients3.google.com/generate_204";

/// The probe could not reach its endpoint.
#[derive(Debug, Error)]
#[error("Check the internet connection.")]
pub struct ConnectivityError {
    /// Underlying transport failure.
    #[source]
    pub source: TransportError,
}

/// Reports whether remote sources are reachable.
#[async_trait(?Send)]
pub trait ConnectivityProbe {
    /// Succeed when the network is usable.
    async fn check(&self) -> Result<(), ConnectivityError>;
}

/// Probe issuing a single GET against a lightweight endpoint.
#[derive(Debug, Clone)]
pub struct HttpConnectivityProbe {
    client: Client,
    url: String,
}

impl HttpConnectivityProbe {
    /// Build a probe for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            url: url.into(),
        })
    }
}

#[async_trait(?Send)]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> Result<(), ConnectivityError> {
        let response = get(&self.client, &self.url)
            .await
            .map_err(|source| ConnectivityError { source })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(ConnectivityError {
            source: TransportError::Http {
                url: self.url.clone(),
                status: status.as_u16(),
                message: status.to_string(),
            },
        })
    }
}
