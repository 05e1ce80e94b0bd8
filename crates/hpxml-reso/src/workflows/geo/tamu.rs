use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{AddressNormalizer, AddressQuery, GeolocationError, NormalizedAddress};

const SERVICE: &str = "tamu";
const API_VERSION: &str = "4.01";

/// Texas A&M GeoServices address normalization. It splits an address into
/// its parts but does not check the address exists.
pub struct TamuNormalizer {
    url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl TamuNormalizer {
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

impl AddressNormalizer for TamuNormalizer {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn normalize(&self, query: &AddressQuery) -> Result<NormalizedAddress, GeolocationError> {
        debug!(address = %query.one_line(), "normalizing address");

        let response: TamuResponse = self
            .agent
            .get(&self.url)
            .query("apiKey", &self.api_key)
            .query("version", API_VERSION)
            .query("nonParsedStreetAddress", &query.street)
            .query("nonParsedCity", &query.city)
            .query("nonParsedState", &query.state)
            .query("nonParsedZip", &query.zip)
            .query("responseFormat", "json")
            .call()
            .map_err(|error| GeolocationError::transport(SERVICE, error))?
            .into_json()
            .map_err(|source| GeolocationError::Decode {
                service: SERVICE,
                source,
            })?;

        response.into_single(query)
    }
}

#[derive(Debug, Deserialize)]
struct TamuResponse {
    #[serde(rename = "QueryStatusCode")]
    query_status_code: String,
    #[serde(rename = "StreetAddresses", default)]
    street_addresses: Option<Vec<NormalizedAddress>>,
}

impl TamuResponse {
    fn into_single(self, query: &AddressQuery) -> Result<NormalizedAddress, GeolocationError> {
        if self.query_status_code != "Success" {
            return Err(GeolocationError::Status {
                service: SERVICE,
                status: self.query_status_code,
                message: String::new(),
            });
        }

        let mut addresses = self.street_addresses.unwrap_or_default();
        match addresses.len() {
            1 => Ok(addresses.remove(0)),
            count => Err(GeolocationError::NotSingular {
                service: SERVICE,
                address: query.one_line(),
                count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::workflows::reso::ConversionError;

    fn query() -> AddressQuery {
        AddressQuery {
            street: "123 Main St Apt 4".to_string(),
            city: "Boulder".to_string(),
            state: "CO".to_string(),
            zip: "80302".to_string(),
        }
    }

    fn parse(raw: &str) -> TamuResponse {
        serde_json::from_str(raw).expect("fixture deserializes")
    }

    #[test]
    fn single_success_yields_the_address() {
        let response = parse(
            r#"{
                "version": "4.01",
                "QueryStatusCode": "Success",
                "StreetAddresses": [{
                    "Number": "123", "NumberFractional": "", "PreDirectional": "",
                    "StreetName": "Main", "Suffix": "St", "PostDirectional": "",
                    "SuiteType": "Apt", "SuiteNumber": "4",
                    "City": "Boulder", "State": "CO", "ZIP": "80302"
                }]
            }"#,
        );
        let address = response.into_single(&query()).expect("single address");
        assert_eq!(address.number.as_deref(), Some("123"));
        assert_eq!(address.suite_type.as_deref(), Some("Apt"));
        assert_eq!(address.zip.as_deref(), Some("80302"));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let response = parse(r#"{"QueryStatusCode": "APIKeyInvalid", "StreetAddresses": null}"#);
        let error = response.into_single(&query()).expect_err("bad key");
        assert_eq!(error.to_string(), "tamu returned APIKeyInvalid - ");
    }

    #[test]
    fn zero_or_many_candidates_are_errors() {
        let response = parse(r#"{"QueryStatusCode": "Success", "StreetAddresses": []}"#);
        assert!(matches!(
            response.into_single(&query()),
            Err(GeolocationError::NotSingular { count: 0, .. })
        ));

        let response = parse(
            r#"{"QueryStatusCode": "Success", "StreetAddresses": [{"Number": "1"}, {"Number": "2"}]}"#,
        );
        assert!(matches!(
            response.into_single(&query()),
            Err(GeolocationError::NotSingular { count: 2, .. })
        ));
    }

    #[test]
    fn transport_errors_do_not_expose_the_api_key() {
        let normalizer =
            TamuNormalizer::new("http://127.0.0.1:9/".to_string(), "SECRET-KEY-123".to_string());
        let error = normalizer
            .normalize(&query())
            .expect_err("nothing listens on the discard port");
        assert!(matches!(error, GeolocationError::Transport { service: "tamu", .. }));

        let message = AppError::from(ConversionError::from(error)).to_string();
        assert!(!message.contains("SECRET-KEY-123"), "{message}");
        assert!(!message.contains("apiKey"), "{message}");
    }
}
