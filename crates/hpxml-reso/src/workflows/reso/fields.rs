use serde::Serialize;

use crate::workflows::geo::{AddressQuery, NormalizedAddress};

pub const LIVING_AREA_UNITS: &str = "Square Feet";
pub const LIVING_AREA_SOURCE: &str = "Other";
pub const HOME_ENERGY_SCORE_BODY: &str = "US DOE";

/// RESO fields for one building. Serialization follows declaration order,
/// which mirrors the listing schema's field grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResoRecord {
    #[serde(flatten)]
    pub address: ResoAddress,
    pub living_area: Option<f64>,
    pub living_area_units: String,
    pub living_area_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_verification: Option<GreenVerification>,
    pub heating: Vec<String>,
    pub cooling: Vec<String>,
}

impl ResoRecord {
    /// Pretty JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only writes valid UTF-8.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResoAddress {
    pub street_number: Option<String>,
    pub street_number_numeric: Option<u64>,
    pub street_dir_prefix: Option<String>,
    pub street_name: Option<String>,
    pub street_suffix: Option<String>,
    pub street_dir_suffix: Option<String>,
    pub unit_number: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
}

impl ResoAddress {
    pub fn from_normalized(normalized: &NormalizedAddress) -> Self {
        Self {
            street_number: join_parts([&normalized.number, &normalized.number_fractional]),
            street_number_numeric: non_empty(&normalized.number)
                .and_then(|number| number.parse::<u64>().ok()),
            street_dir_prefix: non_empty(&normalized.pre_directional),
            street_name: non_empty(&normalized.street_name),
            street_suffix: non_empty(&normalized.suffix),
            street_dir_suffix: non_empty(&normalized.post_directional),
            unit_number: join_parts([&normalized.suite_type, &normalized.suite_number]),
            city: non_empty(&normalized.city),
            state_or_province: non_empty(&normalized.state),
            postal_code: non_empty(&normalized.zip),
        }
    }

    /// Without a normalization service only the locality fields are known.
    pub fn from_query(query: &AddressQuery) -> Self {
        Self {
            city: non_empty_str(&query.city),
            state_or_province: non_empty_str(&query.state),
            postal_code: non_empty_str(&query.zip),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreenVerification {
    #[serde(rename = "DOEHomeEnergyScore")]
    pub doe_home_energy_score: HomeEnergyScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HomeEnergyScore {
    pub body: String,
    pub year: Option<i32>,
    pub metric: Option<i64>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

fn non_empty_str(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty_str)
}

fn join_parts<const N: usize>(parts: [&Option<String>; N]) -> Option<String> {
    let joined = parts
        .into_iter()
        .filter_map(non_empty)
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}
