//! Remote address services consumed by the converter, and the cache in front of them.

pub mod cache;
mod google;
mod tamu;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, GeoServicesConfig};
use crate::workflows::reso::ResoConverter;

pub use cache::{
    cached_lookup, AddressCache, CacheError, FileAddressCache, InMemoryAddressCache,
    NoopAddressCache,
};
pub use google::GoogleGeocoder;
pub use tamu::TamuNormalizer;

#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("{service} returned {status} - {message}")]
    Status {
        service: &'static str,
        status: String,
        message: String,
    },
    #[error("{service} could not find a single location for address: {address} ({count} candidates)")]
    NotSingular {
        service: &'static str,
        address: String,
        count: usize,
    },
    #[error("{service} request failed: {detail}")]
    Transport {
        service: &'static str,
        detail: String,
    },
    #[error("{service} returned an unreadable response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl GeolocationError {
    /// Keeps only the status code or transport error kind. The request URL
    /// carries the API key and must not reach logs or responses.
    pub(crate) fn transport(service: &'static str, error: ureq::Error) -> Self {
        let detail = match error {
            ureq::Error::Status(code, _) => format!("HTTP status {code}"),
            ureq::Error::Transport(transport) => transport.kind().to_string(),
        };
        Self::Transport { service, detail }
    }
}

/// The unparsed street address as it appears in the audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl AddressQuery {
    pub fn cache_key(&self, service: &str) -> String {
        format!(
            "{service}|{}|{}|{}|{}",
            self.street, self.city, self.state, self.zip
        )
    }

    pub fn one_line(&self) -> String {
        [&self.street, &self.city, &self.state, &self.zip]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Street address split into its parts by the normalization service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NormalizedAddress {
    pub number: Option<String>,
    pub number_fractional: Option<String>,
    pub pre_directional: Option<String>,
    pub street_name: Option<String>,
    pub suffix: Option<String>,
    pub post_directional: Option<String>,
    pub suite_type: Option<String>,
    pub suite_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "ZIP")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|candidate| candidate == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

impl GeocodedAddress {
    /// Replaces the parts of `query` the geocoder resolved.
    pub fn refine(&self, query: &AddressQuery) -> AddressQuery {
        let mut refined = query.clone();
        let mut street_number = None;
        let mut route = None;

        for component in &self.address_components {
            if component.has_type("street_number") {
                street_number = Some(component.long_name.as_str());
            } else if component.has_type("route") {
                route = Some(component.long_name.as_str());
            } else if component.has_type("locality") {
                refined.city = component.long_name.clone();
            } else if component.has_type("administrative_area_level_1") {
                refined.state = component.short_name.clone();
            } else if component.has_type("postal_code") {
                refined.zip = component.long_name.clone();
            }
        }

        if street_number.is_some() || route.is_some() {
            refined.street = [street_number, route]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
        }

        refined
    }
}

pub trait AddressNormalizer: Send + Sync {
    /// Short name used in cache keys and errors.
    fn service(&self) -> &'static str;
    fn normalize(&self, query: &AddressQuery) -> Result<NormalizedAddress, GeolocationError>;
}

pub trait Geocoder: Send + Sync {
    fn service(&self) -> &'static str;
    fn geocode(&self, query: &AddressQuery) -> Result<GeocodedAddress, GeolocationError>;
}

/// Configured address services, shared by the CLI and the HTTP surface.
pub struct GeoServices {
    cache: Box<dyn AddressCache>,
    normalizer: Option<Box<dyn AddressNormalizer>>,
    geocoder: Option<Box<dyn Geocoder>>,
}

impl GeoServices {
    pub fn new(cache: Box<dyn AddressCache>) -> Self {
        Self {
            cache,
            normalizer: None,
            geocoder: None,
        }
    }

    pub fn from_config(config: &GeoServicesConfig) -> Result<Self, CacheError> {
        let cache = FileAddressCache::open(&config.cache_path)?;
        let mut services = Self::new(Box::new(cache));

        if let Some(key) = &config.tamu_api_key {
            services = services.with_normalizer(Box::new(TamuNormalizer::new(
                config.tamu_url.clone(),
                key.clone(),
            )));
        }
        if let Some(key) = &config.google_maps_key {
            services = services.with_geocoder(Box::new(GoogleGeocoder::new(
                config.google_geocode_url.clone(),
                key.clone(),
            )));
        }

        Ok(services)
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn AddressNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Box<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// A converter over these services. Geocoding is opt-in per conversion.
    pub fn converter(&self, geocode: bool) -> Result<ResoConverter<'_>, ConfigError> {
        let mut converter = ResoConverter::new(self.cache.as_ref());
        if let Some(normalizer) = &self.normalizer {
            converter = converter.with_normalizer(normalizer.as_ref());
        }
        if geocode {
            let geocoder = self
                .geocoder
                .as_ref()
                .ok_or(ConfigError::MissingGeocodingKey)?;
            converter = converter.with_geocoder(geocoder.as_ref());
        }
        Ok(converter)
    }
}
