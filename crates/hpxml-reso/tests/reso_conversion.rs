use std::sync::Mutex;

use hpxml_reso::workflows::geo::{
    AddressComponent, AddressNormalizer, AddressQuery, GeocodedAddress, Geocoder,
    GeolocationError, InMemoryAddressCache, NoopAddressCache, NormalizedAddress,
};
use hpxml_reso::workflows::reso::{
    ConversionError, ResoConverter, ShapeError, HOME_ENERGY_SCORE_BODY,
};

const HOUSE: &str = include_str!("fixtures/house.xml");
const PRIMARY_HEATING: &str = r#"<PrimaryHeatingSystem idref="hp-1"/>"#;

struct FakeNormalizer {
    response: Result<NormalizedAddress, String>,
    queries: Mutex<Vec<AddressQuery>>,
}

impl FakeNormalizer {
    fn returning(address: NormalizedAddress) -> Self {
        Self {
            response: Ok(address),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn failing(status: &str) -> Self {
        Self {
            response: Err(status.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<AddressQuery> {
        self.queries.lock().expect("queries lock").clone()
    }
}

impl AddressNormalizer for FakeNormalizer {
    fn service(&self) -> &'static str {
        "fake-normalizer"
    }

    fn normalize(&self, query: &AddressQuery) -> Result<NormalizedAddress, GeolocationError> {
        self.queries.lock().expect("queries lock").push(query.clone());
        self.response
            .clone()
            .map_err(|status| GeolocationError::Status {
                service: "fake-normalizer",
                status,
                message: "address could not be parsed".to_string(),
            })
    }
}

struct FakeGeocoder {
    calls: Mutex<usize>,
}

impl Geocoder for FakeGeocoder {
    fn service(&self) -> &'static str {
        "fake-geocoder"
    }

    fn geocode(&self, _query: &AddressQuery) -> Result<GeocodedAddress, GeolocationError> {
        *self.calls.lock().expect("calls lock") += 1;
        let component = |long_name: &str, short_name: &str, kind: &str| AddressComponent {
            long_name: long_name.to_string(),
            short_name: short_name.to_string(),
            types: vec![kind.to_string()],
        };
        Ok(GeocodedAddress {
            address_components: vec![
                component("1600", "1600", "street_number"),
                component("Pennsylvania Avenue Northwest", "Pennsylvania Ave NW", "route"),
                component("Washington", "Washington", "locality"),
                component("District of Columbia", "DC", "administrative_area_level_1"),
                component("20500", "20500", "postal_code"),
            ],
        })
    }
}

fn white_house() -> NormalizedAddress {
    let text = |value: &str| Some(value.to_string());
    NormalizedAddress {
        number: text("1600"),
        street_name: text("Pennsylvania"),
        suffix: text("Ave"),
        post_directional: text("NW"),
        city: text("Washington"),
        state: text("DC"),
        zip: text("20500"),
        ..NormalizedAddress::default()
    }
}

fn top_level_keys(json: &str) -> Vec<String> {
    json.lines()
        .filter(|line| line.starts_with("    \""))
        .filter_map(|line| line.trim().split('"').nth(1))
        .map(str::to_string)
        .collect()
}

#[test]
fn converts_a_full_audit() {
    let normalizer = FakeNormalizer::returning(white_house());
    let record = ResoConverter::new(&NoopAddressCache)
        .with_normalizer(&normalizer)
        .convert_str(HOUSE, None)
        .expect("conversion succeeds");

    assert_eq!(record.address.street_number.as_deref(), Some("1600"));
    assert_eq!(record.address.street_number_numeric, Some(1600));
    assert_eq!(record.address.street_dir_prefix, None);
    assert_eq!(record.address.street_name.as_deref(), Some("Pennsylvania"));
    assert_eq!(record.address.street_suffix.as_deref(), Some("Ave"));
    assert_eq!(record.address.street_dir_suffix.as_deref(), Some("NW"));
    assert_eq!(record.address.unit_number, None);
    assert_eq!(record.address.city.as_deref(), Some("Washington"));
    assert_eq!(record.address.state_or_province.as_deref(), Some("DC"));
    assert_eq!(record.address.postal_code.as_deref(), Some("20500"));

    assert_eq!(record.living_area, Some(2150.0));
    assert_eq!(record.living_area_units, "Square Feet");
    assert_eq!(record.living_area_source, "Other");
    assert_eq!(record.walk_score, Some(88));

    let score = &record
        .green_verification
        .as_ref()
        .expect("home energy score present")
        .doe_home_energy_score;
    assert_eq!(score.body, HOME_ENERGY_SCORE_BODY);
    assert_eq!(score.year, Some(2016));
    assert_eq!(score.metric, Some(7));
    assert_eq!(score.url, None);

    assert_eq!(
        record.heating,
        vec![
            "Air To Air Heat Pump, 8.5 HSPF".to_string(),
            "Natural Gas Furnace, 95% Efficient".to_string(),
        ]
    );
    assert_eq!(
        record.cooling,
        vec![
            "Air To Air Heat Pump, 15 SEER".to_string(),
            "Central Air Conditioning, 13 SEER".to_string(),
        ]
    );

    let queries = normalizer.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].street, "1600 pennsylvania ave nw");
    assert_eq!(queries[0].zip, "20500");
}

#[test]
fn ranks_heating_by_load_fraction_without_a_declared_primary() {
    let xml = HOUSE.replace(PRIMARY_HEATING, "");
    let record = ResoConverter::new(&NoopAddressCache)
        .convert_str(&xml, None)
        .expect("conversion succeeds");

    assert_eq!(
        record.heating,
        vec![
            "Natural Gas Furnace, 95% Efficient".to_string(),
            "Air To Air Heat Pump, 8.5 HSPF".to_string(),
        ]
    );
}

#[test]
fn declared_primary_missing_from_the_plant_is_ignored() {
    let xml = HOUSE.replace(PRIMARY_HEATING, r#"<PrimaryHeatingSystem idref="boiler-9"/>"#);
    let record = ResoConverter::new(&NoopAddressCache)
        .convert_str(&xml, None)
        .expect("conversion succeeds");

    assert_eq!(record.heating[0], "Natural Gas Furnace, 95% Efficient");
}

#[test]
fn duplicate_primary_ids_fail_the_conversion() {
    let xml = HOUSE.replace(
        r#"<SystemIdentifier id="furnace-1"/>"#,
        r#"<SystemIdentifier id="hp-1"/>"#,
    );
    let error = ResoConverter::new(&NoopAddressCache)
        .convert_str(&xml, None)
        .expect_err("primary reference is ambiguous");

    assert!(matches!(
        error,
        ConversionError::Shape(ShapeError::AmbiguousPrimary { count: 2, .. })
    ));
}

#[test]
fn lone_heat_pump_serves_both_roles() {
    let xml = r#"<HPXML xmlns="http://hpxmlonline.com/2014/6">
  <Building>
    <BuildingID id="hp-only"/>
    <BuildingDetails><Systems><HVAC><HVACPlant>
      <HeatPump>
        <SystemIdentifier id="hp"/>
        <HeatPumpType>mini-split</HeatPumpType>
        <AnnualCoolEfficiency><Units>SEER</Units><Value>16</Value></AnnualCoolEfficiency>
        <AnnualHeatEfficiency><Units>HSPF</Units><Value>2.5</Value></AnnualHeatEfficiency>
      </HeatPump>
    </HVACPlant></HVAC></Systems></BuildingDetails>
  </Building>
</HPXML>"#;
    let record = ResoConverter::new(&NoopAddressCache)
        .convert_str(xml, None)
        .expect("conversion succeeds");

    assert_eq!(record.heating, vec!["Mini Split Heat Pump, 2.5 HSPF".to_string()]);
    assert_eq!(record.cooling, vec!["Mini Split Heat Pump, 16 SEER".to_string()]);
    assert_eq!(record.living_area, None);
    assert!(record.address.city.is_none());
}

#[test]
fn cooling_without_a_shared_metric_keeps_document_order() {
    let xml = r#"<HPXML xmlns="http://hpxmlonline.com/2014/6">
  <Building>
    <BuildingID id="two-acs"/>
    <BuildingDetails><Systems><HVAC><HVACPlant>
      <CoolingSystem>
        <SystemIdentifier id="room"/>
        <CoolingSystemType>room air conditioner</CoolingSystemType>
        <CoolingCapacity>8000</CoolingCapacity>
      </CoolingSystem>
      <CoolingSystem>
        <SystemIdentifier id="central"/>
        <CoolingSystemType>central air conditioning</CoolingSystemType>
      </CoolingSystem>
    </HVACPlant></HVAC></Systems></BuildingDetails>
  </Building>
</HPXML>"#;
    let record = ResoConverter::new(&NoopAddressCache)
        .convert_str(xml, None)
        .expect("conversion succeeds");

    assert_eq!(
        record.cooling,
        vec![
            "Room Air Conditioner".to_string(),
            "Central Air Conditioning".to_string(),
        ]
    );
    assert!(record.heating.is_empty());
}

#[test]
fn repeated_conversions_are_identical_and_reuse_the_cache() {
    let cache = InMemoryAddressCache::default();
    let normalizer = FakeNormalizer::returning(white_house());
    let converter = ResoConverter::new(&cache).with_normalizer(&normalizer);

    let first = converter
        .convert_str(HOUSE, Some("house-1"))
        .expect("first conversion")
        .to_json_pretty()
        .expect("serializes");
    let second = converter
        .convert_str(HOUSE, Some("house-1"))
        .expect("second conversion")
        .to_json_pretty()
        .expect("serializes");

    assert_eq!(first, second);
    assert_eq!(normalizer.queries().len(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn json_places_optional_sections_between_living_area_and_equipment() {
    let record = ResoConverter::new(&NoopAddressCache)
        .convert_str(HOUSE, None)
        .expect("conversion succeeds");
    let json = record.to_json_pretty().expect("serializes");

    let keys = top_level_keys(&json);
    let tail: Vec<&str> = keys.iter().skip(10).map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "LivingArea",
            "LivingAreaUnits",
            "LivingAreaSource",
            "WalkScore",
            "GreenVerification",
            "Heating",
            "Cooling",
        ]
    );
    assert!(json.contains("\"DOEHomeEnergyScore\": {"));
    assert!(json.contains("\"URL\": null"));
}

#[test]
fn geocoding_refines_the_address_before_normalization() {
    let cache = InMemoryAddressCache::default();
    let normalizer = FakeNormalizer::returning(white_house());
    let geocoder = FakeGeocoder {
        calls: Mutex::new(0),
    };
    let converter = ResoConverter::new(&cache)
        .with_geocoder(&geocoder)
        .with_normalizer(&normalizer);

    converter.convert_str(HOUSE, None).expect("first conversion");
    converter.convert_str(HOUSE, None).expect("second conversion");

    let queries = normalizer.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].street, "1600 Pennsylvania Avenue Northwest");
    assert_eq!(queries[0].state, "DC");
    assert_eq!(*geocoder.calls.lock().expect("calls lock"), 1);
    assert_eq!(cache.len(), 2);
}

#[test]
fn normalization_failures_abort_the_conversion() {
    let cache = InMemoryAddressCache::default();
    let normalizer = FakeNormalizer::failing("QueryError");
    let error = ResoConverter::new(&cache)
        .with_normalizer(&normalizer)
        .convert_str(HOUSE, None)
        .expect_err("lookup fails");

    match error {
        ConversionError::Geolocation(GeolocationError::Status { status, .. }) => {
            assert_eq!(status, "QueryError");
        }
        other => panic!("expected geolocation error, got {other:?}"),
    }
    assert!(cache.is_empty());
}

#[test]
fn unknown_building_id_is_reported() {
    let error = ResoConverter::new(&NoopAddressCache)
        .convert_str(HOUSE, Some("house-2"))
        .expect_err("no such building");
    assert!(error.to_string().contains("house-2"));
}
