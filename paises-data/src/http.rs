//! Transport plumbing shared by every HTTP collaborator.

use std::io::{self, Write};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use thiserror::Error;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "paises/0.1";

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Builder failure.
        source: reqwest::Error,
    },
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, TransportError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(timeout)
        .build()
        .map_err(|source| TransportError::Client { source })
}

pub(crate) async fn get(client: &Client, url: &str) -> Result<Response, TransportError> {
    client
        .get(url)
        .header(USER_AGENT, DEFAULT_USER_AGENT)
        .send()
        .await
        .map_err(|err| convert_reqwest_error(err, url))
}

/// Stream the body of a successful response into `sink`.
pub(crate) async fn copy_body(
    response: Response,
    url: &str,
    sink: &mut dyn Write,
) -> Result<u64, TransportError> {
    let mut written = 0_u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| convert_reqwest_error(err, url))?;
        sink.write_all(&chunk)
            .map_err(|source| TransportError::Network {
                url: url.to_owned(),
                source,
            })?;
        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
    }
    Ok(written)
}

pub(crate) fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
