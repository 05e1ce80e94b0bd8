use regex::Regex;
use std::sync::LazyLock;

use super::equipment::{CoolingSystem, Efficiency, EquipmentUnit, HeatPump, HeatingSystem, SystemRole};
use super::query::ShapeError;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("static pattern compiles"));

/// Human-readable description of `unit` acting in `role`.
///
/// Fails only when the unit's kind cannot serve the role, which extraction
/// never produces.
pub fn describe(unit: &EquipmentUnit, role: SystemRole) -> Result<String, ShapeError> {
    if !role.serves(unit.kind()) {
        return Err(ShapeError::UnexpectedEquipment {
            kind: unit.kind().tag().to_string(),
            role: role.label(),
        });
    }

    let description = match (unit, role) {
        (EquipmentUnit::HeatPump(heat_pump), SystemRole::Heating) => with_efficiency(
            heat_pump_label(heat_pump),
            heat_pump
                .heat_efficiency
                .as_ref()
                .map(|rating| percent_efficient(rating).unwrap_or_else(|| verbatim_efficiency(rating))),
        ),
        (EquipmentUnit::HeatPump(heat_pump), SystemRole::Cooling) => with_efficiency(
            heat_pump_label(heat_pump),
            heat_pump.cool_efficiency.as_ref().map(verbatim_efficiency),
        ),
        (EquipmentUnit::HeatingSystem(system), _) => describe_heating_system(system),
        (EquipmentUnit::CoolingSystem(system), _) => describe_cooling_system(system),
    };

    Ok(description)
}

fn heat_pump_label(heat_pump: &HeatPump) -> String {
    match heat_pump.heat_pump_type.as_deref().map(capitalize_words) {
        Some(kind) if !kind.is_empty() => format!("{kind} Heat Pump"),
        _ => "Heat Pump".to_string(),
    }
}

fn describe_heating_system(system: &HeatingSystem) -> String {
    let system_type = system.system_type.as_deref().map(|tag| {
        let label = split_camel_case(tag);
        let replacement = if label == "Electric Resistance" {
            system.electric_distribution.as_deref().map(capitalize_words)
        } else if label == "District Steam" {
            system.district_steam_type.clone()
        } else {
            None
        };
        replacement.unwrap_or(label)
    });

    let fuel = system.fuel.as_deref().map(fuel_label);
    let label = [fuel, system_type]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let efficiency = system.efficiency.as_ref().map(|rating| {
        percent_efficient(rating).unwrap_or_else(|| format!("{:?} {}", rating.value, rating.units))
    });
    with_efficiency(label, efficiency)
}

fn describe_cooling_system(system: &CoolingSystem) -> String {
    let label = system
        .system_type
        .as_deref()
        .map(capitalize_words)
        .unwrap_or_default();
    let efficiency = system
        .efficiency
        .as_ref()
        .map(|efficiency| format!("{:.0} {}", efficiency.value, efficiency.units));
    with_efficiency(label, efficiency)
}

fn with_efficiency(label: String, efficiency: Option<String>) -> String {
    match efficiency {
        Some(efficiency) if label.is_empty() => efficiency,
        Some(efficiency) => format!("{label}, {efficiency}"),
        None => label,
    }
}

/// AFUE and Percent ratings are fractions; they render as whole percentages.
fn percent_efficient(efficiency: &Efficiency) -> Option<String> {
    match efficiency.units.as_str() {
        "AFUE" | "Percent" => Some(format!("{:.0}% Efficient", efficiency.value * 100.0)),
        _ => None,
    }
}

fn verbatim_efficiency(efficiency: &Efficiency) -> String {
    format!("{} {}", efficiency.text, efficiency.units)
}

fn fuel_label(raw: &str) -> String {
    let fuel = capitalize_words(raw).replace("Electricity", "Electric");
    if fuel.contains("Fuel Oil") {
        "Fuel Oil".to_string()
    } else if fuel.contains("Coal") {
        "Coal".to_string()
    } else {
        fuel
    }
}

/// `WallFurnace` -> `Wall Furnace`.
pub fn split_camel_case(tag: &str) -> String {
    CAMEL_BOUNDARY.replace_all(tag, "${1} ${2}").into_owned()
}

/// Splits on whitespace, `-` and `_`, then capitalizes each word.
pub fn capitalize_words(value: &str) -> String {
    value
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
