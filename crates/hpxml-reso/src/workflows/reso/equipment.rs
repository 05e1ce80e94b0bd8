use roxmltree::Node;
use serde::Serialize;

use super::query::{query_element, query_many, query_text, query_value, Match, ShapeError};

/// Which half of the HVAC plant a pipeline is describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Heating,
    Cooling,
}

impl SystemRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::Cooling => "cooling",
        }
    }

    /// Equipment kinds that can serve this role. Extraction and description
    /// both consult this table, so the two always agree.
    pub const fn kinds(self) -> [EquipmentKind; 2] {
        match self {
            Self::Heating => [EquipmentKind::HeatingSystem, EquipmentKind::HeatPump],
            Self::Cooling => [EquipmentKind::CoolingSystem, EquipmentKind::HeatPump],
        }
    }

    pub fn serves(self, kind: EquipmentKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub(crate) const fn primary_reference_path(self) -> &'static str {
        match self {
            Self::Heating => "descendant::PrimaryHeatingSystem",
            Self::Cooling => "descendant::PrimaryCoolingSystem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EquipmentKind {
    HeatingSystem,
    CoolingSystem,
    HeatPump,
}

impl EquipmentKind {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::HeatingSystem => "HeatingSystem",
            Self::CoolingSystem => "CoolingSystem",
            Self::HeatPump => "HeatPump",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "HeatingSystem" => Some(Self::HeatingSystem),
            "CoolingSystem" => Some(Self::CoolingSystem),
            "HeatPump" => Some(Self::HeatPump),
            _ => None,
        }
    }
}

/// A rated efficiency. `text` is the value as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Efficiency {
    pub value: f64,
    pub text: String,
    pub units: String,
}

/// Sort keys in precedence order. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankingMetrics {
    pub fraction_load_served: Option<f64>,
    pub floor_area_served: Option<f64>,
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatingSystem {
    pub id: Option<String>,
    pub fraction_heat_load_served: Option<f64>,
    pub floor_area_served: Option<f64>,
    pub heating_capacity: Option<f64>,
    /// Tag name of the `HeatingSystemType` child, e.g. `WallFurnace`.
    pub system_type: Option<String>,
    pub electric_distribution: Option<String>,
    pub district_steam_type: Option<String>,
    pub fuel: Option<String>,
    pub efficiency: Option<Efficiency>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoolingSystem {
    pub id: Option<String>,
    pub fraction_cool_load_served: Option<f64>,
    pub floor_area_served: Option<f64>,
    pub cooling_capacity: Option<f64>,
    pub system_type: Option<String>,
    pub efficiency: Option<Efficiency>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatPump {
    pub id: Option<String>,
    pub fraction_heat_load_served: Option<f64>,
    pub fraction_cool_load_served: Option<f64>,
    pub floor_area_served: Option<f64>,
    pub heating_capacity: Option<f64>,
    pub cooling_capacity: Option<f64>,
    pub heat_pump_type: Option<String>,
    pub heat_efficiency: Option<Efficiency>,
    pub cool_efficiency: Option<Efficiency>,
}

/// One heating or cooling device, read once from the document.
#[derive(Debug, Clone, PartialEq)]
pub enum EquipmentUnit {
    HeatingSystem(HeatingSystem),
    CoolingSystem(CoolingSystem),
    HeatPump(HeatPump),
}

impl EquipmentUnit {
    pub fn kind(&self) -> EquipmentKind {
        match self {
            Self::HeatingSystem(_) => EquipmentKind::HeatingSystem,
            Self::CoolingSystem(_) => EquipmentKind::CoolingSystem,
            Self::HeatPump(_) => EquipmentKind::HeatPump,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::HeatingSystem(unit) => unit.id.as_deref(),
            Self::CoolingSystem(unit) => unit.id.as_deref(),
            Self::HeatPump(unit) => unit.id.as_deref(),
        }
    }

    /// Role-specific ranking metrics; a unit that cannot serve `role` has none.
    pub fn metrics(&self, role: SystemRole) -> RankingMetrics {
        match (self, role) {
            (Self::HeatingSystem(unit), SystemRole::Heating) => RankingMetrics {
                fraction_load_served: unit.fraction_heat_load_served,
                floor_area_served: unit.floor_area_served,
                capacity: unit.heating_capacity,
            },
            (Self::CoolingSystem(unit), SystemRole::Cooling) => RankingMetrics {
                fraction_load_served: unit.fraction_cool_load_served,
                floor_area_served: unit.floor_area_served,
                capacity: unit.cooling_capacity,
            },
            (Self::HeatPump(unit), SystemRole::Heating) => RankingMetrics {
                fraction_load_served: unit.fraction_heat_load_served,
                floor_area_served: unit.floor_area_served,
                capacity: unit.heating_capacity,
            },
            (Self::HeatPump(unit), SystemRole::Cooling) => RankingMetrics {
                fraction_load_served: unit.fraction_cool_load_served,
                floor_area_served: unit.floor_area_served,
                capacity: unit.cooling_capacity,
            },
            _ => RankingMetrics::default(),
        }
    }

    fn read(kind: EquipmentKind, node: Node<'_, '_>) -> Result<Self, ShapeError> {
        let id = owned_text(node, "SystemIdentifier/@id")?;
        let floor_area_served: Option<f64> = query_value(node, "FloorAreaServed/text()")?;

        let unit = match kind {
            EquipmentKind::HeatingSystem => Self::HeatingSystem(HeatingSystem {
                id,
                fraction_heat_load_served: query_value(node, "FractionHeatLoadServed/text()")?,
                floor_area_served,
                heating_capacity: query_value(node, "HeatingCapacity/text()")?,
                system_type: query_element(node, "HeatingSystemType/*")?
                    .map(|element| element.tag_name().name().to_string()),
                electric_distribution: owned_text(
                    node,
                    "HeatingSystemType/ElectricResistance/ElectricDistribution/text()",
                )?,
                district_steam_type: owned_text(
                    node,
                    "HeatingSystemType/DistrictSteam/DistrictSteamType/text()",
                )?,
                fuel: owned_text(node, "HeatingSystemFuel/text()")?,
                efficiency: read_efficiency(node, "AnnualHeatingEfficiency")?,
            }),
            EquipmentKind::CoolingSystem => Self::CoolingSystem(CoolingSystem {
                id,
                fraction_cool_load_served: query_value(node, "FractionCoolLoadServed/text()")?,
                floor_area_served,
                cooling_capacity: query_value(node, "CoolingCapacity/text()")?,
                system_type: owned_text(node, "CoolingSystemType/text()")?,
                efficiency: read_efficiency(node, "AnnualCoolingEfficiency")?,
            }),
            EquipmentKind::HeatPump => Self::HeatPump(HeatPump {
                id,
                fraction_heat_load_served: query_value(node, "FractionHeatLoadServed/text()")?,
                fraction_cool_load_served: query_value(node, "FractionCoolLoadServed/text()")?,
                floor_area_served,
                heating_capacity: query_value(node, "HeatingCapacity/text()")?,
                cooling_capacity: query_value(node, "CoolingCapacity/text()")?,
                heat_pump_type: owned_text(node, "HeatPumpType/text()")?,
                heat_efficiency: read_efficiency(node, "AnnualHeatEfficiency")?,
                cool_efficiency: read_efficiency(node, "AnnualCoolEfficiency")?,
            }),
        };

        Ok(unit)
    }
}

/// Every unit under `building` able to serve `role`, in document order.
pub fn extract_units(building: Node<'_, '_>, role: SystemRole) -> Result<Vec<EquipmentUnit>, ShapeError> {
    query_many(building, "descendant::*")
        .iter()
        .filter_map(Match::element)
        .filter_map(|node| {
            EquipmentKind::from_tag(node.tag_name().name())
                .filter(|kind| role.serves(*kind))
                .map(|kind| (kind, node))
        })
        .map(|(kind, node)| EquipmentUnit::read(kind, node))
        .collect()
}

fn owned_text(node: Node<'_, '_>, expr: &str) -> Result<Option<String>, ShapeError> {
    Ok(query_text(node, expr)?.map(str::to_string))
}

// Only the first rating element counts; a rating needs both value and units.
fn read_efficiency(node: Node<'_, '_>, element: &str) -> Result<Option<Efficiency>, ShapeError> {
    let Some(rating) = query_many(node, element).first().and_then(Match::element) else {
        return Ok(None);
    };

    let (Some(text), Some(units)) = (
        query_text(rating, "Value/text()")?,
        query_text(rating, "Units/text()")?,
    ) else {
        return Ok(None);
    };

    let value = text
        .parse::<f64>()
        .map_err(|_| ShapeError::Unconvertible {
            path: format!("{element}/Value"),
            value: text.to_string(),
            expected: "f64",
        })?;

    Ok(Some(Efficiency {
        value,
        text: text.to_string(),
        units: units.to_string(),
    }))
}
