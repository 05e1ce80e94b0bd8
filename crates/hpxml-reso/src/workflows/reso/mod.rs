mod describe;
mod equipment;
mod fields;
mod query;
mod selector;

use chrono::{Datelike, NaiveDate};
use roxmltree::{Document, Node};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::workflows::geo::{
    cached_lookup, AddressCache, AddressNormalizer, AddressQuery, Geocoder, GeolocationError,
    NormalizedAddress,
};

pub use describe::{capitalize_words, describe, split_camel_case};
pub use equipment::{
    extract_units, CoolingSystem, Efficiency, EquipmentKind, EquipmentUnit, HeatPump,
    HeatingSystem, RankingMetrics, SystemRole,
};
pub use fields::{
    GreenVerification, HomeEnergyScore, ResoAddress, ResoRecord, HOME_ENERGY_SCORE_BODY,
    LIVING_AREA_SOURCE, LIVING_AREA_UNITS,
};
pub use query::{
    query_element, query_many, query_one, query_one_with, query_text, query_value, require,
    Match, ShapeError, HPXML_NAMESPACE,
};
pub use selector::{common_metric, select_order, RankingMetric};

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to read HPXML document: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid HPXML document: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("unexpected HPXML document shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("address lookup failed: {0}")]
    Geolocation(#[from] GeolocationError),
}

/// Converts HPXML buildings into RESO records.
///
/// Every conversion is independent; the only state that outlives a call is
/// whatever the injected [`AddressCache`] keeps.
pub struct ResoConverter<'a> {
    cache: &'a dyn AddressCache,
    normalizer: Option<&'a dyn AddressNormalizer>,
    geocoder: Option<&'a dyn Geocoder>,
}

impl<'a> ResoConverter<'a> {
    pub fn new(cache: &'a dyn AddressCache) -> Self {
        Self {
            cache,
            normalizer: None,
            geocoder: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: &'a dyn AddressNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_geocoder(mut self, geocoder: &'a dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn convert_path<P: AsRef<Path>>(
        &self,
        path: P,
        building_id: Option<&str>,
    ) -> Result<ResoRecord, ConversionError> {
        let xml = std::fs::read_to_string(path)?;
        self.convert_str(&xml, building_id)
    }

    pub fn convert_reader<R: Read>(
        &self,
        mut reader: R,
        building_id: Option<&str>,
    ) -> Result<ResoRecord, ConversionError> {
        let mut xml = String::new();
        reader.read_to_string(&mut xml)?;
        self.convert_str(&xml, building_id)
    }

    pub fn convert_str(
        &self,
        xml: &str,
        building_id: Option<&str>,
    ) -> Result<ResoRecord, ConversionError> {
        let document = Document::parse(xml)?;
        self.convert_document(&document, building_id)
    }

    /// Converts one building: the one with `building_id`, or the first in the document.
    pub fn convert_document(
        &self,
        document: &Document<'_>,
        building_id: Option<&str>,
    ) -> Result<ResoRecord, ConversionError> {
        let building = select_building(document.root_element(), building_id)?;
        let resolved_id = query_text(building, "BuildingID/@id")?;
        info!(building_id = resolved_id.unwrap_or_default(), "converting building");

        let address = self.address(building)?;
        let living_area = query_value(
            building,
            "descendant::BuildingConstruction/ConditionedFloorArea/text()",
        )?;
        let walk_score = walk_score(building)?;
        let green_verification = home_energy_score(building)?.map(|score| GreenVerification {
            doe_home_energy_score: score,
        });
        let heating = describe_role(building, SystemRole::Heating)?;
        let cooling = describe_role(building, SystemRole::Cooling)?;

        Ok(ResoRecord {
            address,
            living_area,
            living_area_units: LIVING_AREA_UNITS.to_string(),
            living_area_source: LIVING_AREA_SOURCE.to_string(),
            walk_score,
            green_verification,
            heating,
            cooling,
        })
    }

    fn address(&self, building: Node<'_, '_>) -> Result<ResoAddress, ConversionError> {
        let Some(mut query) = street_address(building)? else {
            warn!("building has no street address");
            return Ok(ResoAddress::default());
        };

        if let Some(geocoder) = self.geocoder {
            let key = query.cache_key(geocoder.service());
            let geocoded = cached_lookup(self.cache, &key, || geocoder.geocode(&query))?;
            query = geocoded.refine(&query);
        }

        match self.normalizer {
            Some(normalizer) => {
                let key = query.cache_key(normalizer.service());
                let normalized: NormalizedAddress =
                    cached_lookup(self.cache, &key, || normalizer.normalize(&query))?;
                Ok(ResoAddress::from_normalized(&normalized))
            }
            None => Ok(ResoAddress::from_query(&query)),
        }
    }
}

/// Extract, rank and describe every unit able to serve `role`.
pub fn describe_role(building: Node<'_, '_>, role: SystemRole) -> Result<Vec<String>, ShapeError> {
    let units = extract_units(building, role)?;
    let primary = primary_reference(building, role)?;
    let ordered = select_order(units, role, primary)?;
    ordered.iter().map(|unit| describe(unit, role)).collect()
}

/// The declared primary unit id. A reference element without `idref` is malformed.
fn primary_reference<'a, 'input: 'a>(
    building: Node<'a, 'input>,
    role: SystemRole,
) -> Result<Option<&'a str>, ShapeError> {
    let path = role.primary_reference_path();
    let Some(reference) = query_element(building, path)? else {
        return Ok(None);
    };
    require(query_text(reference, "@idref")?, &format!("{path}/@idref")).map(Some)
}

fn select_building<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    building_id: Option<&str>,
) -> Result<Node<'a, 'input>, ShapeError> {
    let buildings: Vec<Node<'a, 'input>> = query_many(root, "descendant::Building")
        .iter()
        .filter_map(Match::element)
        .collect();

    let found = match building_id {
        None => buildings.first().copied(),
        Some(wanted) => {
            let mut found = None;
            for building in buildings {
                if query_text(building, "BuildingID/@id")? == Some(wanted) {
                    found = Some(building);
                    break;
                }
            }
            found
        }
    };

    found.ok_or_else(|| ShapeError::BuildingNotFound {
        id: building_id.map(str::to_string),
    })
}

fn street_address(building: Node<'_, '_>) -> Result<Option<AddressQuery>, ShapeError> {
    for block in query_many(building, "descendant::Address")
        .iter()
        .filter_map(Match::element)
    {
        if query_text(block, "AddressType/text()")? != Some("street") {
            continue;
        }

        let street = [
            query_text(block, "Address1/text()")?,
            query_text(block, "Address2/text()")?,
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
        let text = |expr: &str| -> Result<String, ShapeError> {
            Ok(query_text(block, expr)?.unwrap_or_default().to_string())
        };

        return Ok(Some(AddressQuery {
            street,
            city: text("CityMunicipality/text()")?,
            state: text("StateCode/text()")?,
            zip: text("ZipCode/text()")?,
        }));
    }

    Ok(None)
}

fn walk_score(building: Node<'_, '_>) -> Result<Option<i64>, ShapeError> {
    for score in query_many(building, "descendant::EnergyScore")
        .iter()
        .filter_map(Match::element)
    {
        if query_text(score, "ScoreType/text()")? == Some("other")
            && query_text(score, "extension/ScoreType/text()")? == Some("WalkScore")
        {
            return query_value(score, "Score/text()");
        }
    }

    Ok(None)
}

fn home_energy_score(building: Node<'_, '_>) -> Result<Option<HomeEnergyScore>, ShapeError> {
    for score in query_many(building, "descendant::EnergyScore")
        .iter()
        .filter_map(Match::element)
    {
        if query_text(score, "ScoreType/text()")? != Some("US DOE Home Energy Score") {
            continue;
        }

        let year = query_one_with(score, "extension/AssessmentDate/text()", |raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.year())
        })?;

        return Ok(Some(HomeEnergyScore {
            body: HOME_ENERGY_SCORE_BODY.to_string(),
            year,
            metric: query_value(score, "Score/text()")?,
            url: None,
        }));
    }

    Ok(None)
}
