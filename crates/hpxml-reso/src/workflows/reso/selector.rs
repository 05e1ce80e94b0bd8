use tracing::{debug, warn};

use super::equipment::{EquipmentUnit, RankingMetrics, SystemRole};
use super::query::ShapeError;

/// Sort keys, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMetric {
    FractionLoadServed,
    FloorAreaServed,
    Capacity,
}

impl RankingMetric {
    pub const fn precedence() -> [Self; 3] {
        [Self::FractionLoadServed, Self::FloorAreaServed, Self::Capacity]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FractionLoadServed => "fraction of load served",
            Self::FloorAreaServed => "floor area served",
            Self::Capacity => "capacity",
        }
    }

    fn value(self, metrics: &RankingMetrics) -> Option<f64> {
        match self {
            Self::FractionLoadServed => metrics.fraction_load_served,
            Self::FloorAreaServed => metrics.floor_area_served,
            Self::Capacity => metrics.capacity,
        }
    }
}

/// First metric, in precedence order, that every unit reports.
pub fn common_metric(units: &[EquipmentUnit], role: SystemRole) -> Option<RankingMetric> {
    RankingMetric::precedence().into_iter().find(|metric| {
        units
            .iter()
            .all(|unit| metric.value(&unit.metrics(role)).is_some())
    })
}

/// Orders `units` so the primary unit for `role` comes first.
///
/// A declared primary that matches exactly one unit is moved to the front and
/// the rest keep document order. A declared primary that matches nothing is
/// ignored; one that matches several units is a [`ShapeError::AmbiguousPrimary`].
/// Otherwise units are sorted, largest first, by the first metric every unit
/// reports. Ties and the no-common-metric case keep document order.
pub fn select_order(
    mut units: Vec<EquipmentUnit>,
    role: SystemRole,
    explicit_primary: Option<&str>,
) -> Result<Vec<EquipmentUnit>, ShapeError> {
    if let Some(primary_id) = explicit_primary {
        let positions: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.id() == Some(primary_id))
            .map(|(index, _)| index)
            .collect();

        match positions.as_slice() {
            [index] => {
                let primary = units.remove(*index);
                units.insert(0, primary);
                debug!(role = role.label(), primary_id, "using declared primary system");
                return Ok(units);
            }
            [] => {
                warn!(
                    role = role.label(),
                    primary_id, "declared primary system not found; ranking instead"
                );
            }
            matches => {
                return Err(ShapeError::AmbiguousPrimary {
                    role: role.label(),
                    id: primary_id.to_string(),
                    count: matches.len(),
                });
            }
        }
    }

    if units.len() <= 1 {
        return Ok(units);
    }

    let Some(metric) = common_metric(&units, role) else {
        debug!(
            role = role.label(),
            units = units.len(),
            "no metric shared by every unit; keeping document order"
        );
        return Ok(units);
    };

    debug!(
        role = role.label(),
        metric = metric.label(),
        units = units.len(),
        "ranking systems"
    );

    let mut keyed: Vec<(f64, EquipmentUnit)> = units
        .into_iter()
        .filter_map(|unit| metric.value(&unit.metrics(role)).map(|key| (key, unit)))
        .collect();
    // `sort_by` is stable, so ties stay in document order.
    keyed.sort_by(|(left, _), (right, _)| right.total_cmp(left));

    Ok(keyed.into_iter().map(|(_, unit)| unit).collect())
}
