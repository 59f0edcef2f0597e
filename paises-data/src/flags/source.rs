use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::http::{TransportError, build_client, convert_reqwest_error, copy_body, get};

/// Downloads flag documents.
#[async_trait(?Send)]
pub trait FlagSource {
    /// Stream the document at `url` into `sink`, returning the byte count.
    async fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

#[async_trait(?Send)]
impl<T: FlagSource + ?Sized> FlagSource for &T {
    async fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).download(url, sink).await
    }
}

/// HTTP implementation of [`FlagSource`].
#[derive(Debug, Clone)]
pub struct HttpFlagSource {
    client: Client,
}

impl HttpFlagSource {
    /// Build a source with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait(?Send)]
impl FlagSource for HttpFlagSource {
    async fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let response = get(&self.client, url)
            .await?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))?;
        copy_body(response, url, sink).await
    }
}
