//! Remote source of the country list.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use paises_core::Country;
use reqwest::Client;
use thiserror::Error;

use crate::http::{TransportError, build_client, convert_reqwest_error, get};

/// REST Countries v2 endpoint returning every country.
pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v2/all";

/// Errors raised while fetching the remote country list.
#[derive(Debug, Error)]
pub enum CountryFetchError {
    /// The server answered with a non-success status; `message` is the body.
    #[error("country list request to {url} failed with status {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode country list from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider of the full, denormalised country list.
#[async_trait(?Send)]
pub trait CountrySource {
    /// Fetch every country the source knows about.
    async fn fetch_countries(&self) -> Result<Vec<Country>, CountryFetchError>;
}

/// HTTP implementation of [`CountrySource`] for the REST Countries v2 shape.
#[derive(Debug, Clone)]
pub struct HttpCountrySource {
    client: Client,
    url: String,
}

impl HttpCountrySource {
    /// Build a source for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            url: url.into(),
        })
    }
}

#[async_trait(?Send)]
impl CountrySource for HttpCountrySource {
    async fn fetch_countries(&self) -> Result<Vec<Country>, CountryFetchError> {
        debug!("requesting country list from {}", self.url);
        let response = get(&self.client, &self.url).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, &self.url))?;

        if !status.is_success() {
            return Err(CountryFetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let countries = decode_countries(&body).map_err(|source| CountryFetchError::Decode {
            url: self.url.clone(),
            source,
        })?;
        info!("fetched {} countries from {}", countries.len(), self.url);
        Ok(countries)
    }
}

/// Decode a REST Countries v2 payload.
///
/// # Examples
/// ```
/// let countries = paises_data::decode_countries(br#"[{"alpha3Code":"PRT","name":"Portugal","capital":null}]"#)
///     .expect("decode payload");
/// assert_eq!(countries[0].name.as_deref(), Some("Portugal"));
/// assert_eq!(countries[0].capital, None);
/// ```
pub fn decode_countries(body: &[u8]) -> Result<Vec<Country>, serde_json::Error> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn decodes_nested_members() {
        let body = r#"[{
            "alpha3Code": "ESP",
            "name": "Spain",
            "currencies": [{"code": "EUR", "name": "Euro", "symbol": "€"}],
            "languages": [{"iso639_1": "es", "iso639_2": "spa", "name": "Spanish", "nativeName": "Español"}],
            "latlng": [40.0, -4.0]
        }]"#;
        let countries = decode_countries(body.as_bytes()).expect("decode payload");
        let spain = countries.first().expect("one country");
        assert_eq!(spain.currencies.len(), 1);
        assert_eq!(spain.languages.len(), 1);
        assert!(spain.lat_lng.is_some());
        let euro = spain.currencies.first().cloned().flatten().expect("euro present");
        assert_eq!(euro.symbol.as_deref(), Some("€"));
    }

    #[rstest]
    fn rejects_non_array_payloads() {
        assert!(decode_countries(br#"{"status": 404}"#).is_err());
    }
}
