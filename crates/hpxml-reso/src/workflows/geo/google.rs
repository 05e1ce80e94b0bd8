use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{AddressQuery, GeocodedAddress, Geocoder, GeolocationError};

const SERVICE: &str = "google";

/// Google Maps geocoding, used to verify and clean an address before it is normalized.
pub struct GoogleGeocoder {
    url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl GoogleGeocoder {
    pub fn new(url: String, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            url,
            api_key,
            agent,
        }
    }
}

impl Geocoder for GoogleGeocoder {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn geocode(&self, query: &AddressQuery) -> Result<GeocodedAddress, GeolocationError> {
        let address = query.one_line();
        debug!(%address, "geocoding address");

        let response: GoogleResponse = self
            .agent
            .get(&self.url)
            .query("key", &self.api_key)
            .query("address", &address)
            .call()
            .map_err(|error| GeolocationError::transport(SERVICE, error))?
            .into_json()
            .map_err(|source| GeolocationError::Decode {
                service: SERVICE,
                source,
            })?;

        response.into_single(address)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodedAddress>,
}

impl GoogleResponse {
    fn into_single(mut self, address: String) -> Result<GeocodedAddress, GeolocationError> {
        if self.status != "OK" {
            return Err(GeolocationError::Status {
                service: SERVICE,
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            });
        }

        match self.results.len() {
            1 => Ok(self.results.remove(0)),
            count => Err(GeolocationError::NotSingular {
                service: SERVICE,
                address,
                count,
            }),
        }
    }
}
