//! Static emission factor table and the emission calculator.
//!
//! The table is read once at startup from a JSON document of the shape
//! `{ category: { activity_id: { factor, unit, name, description } } }`
//! and is immutable afterwards. It is shared between handlers behind an
//! [`std::sync::Arc`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TrackerError;

/// Number of decimal places kept in computed emissions.
const EMISSION_DECIMALS: usize = 3;

/// One entry as it appears in the JSON source.
#[derive(Debug, Deserialize)]
struct RawFactor {
    factor: f64,
    unit: String,
    name: String,
    description: String,
}

/// A single emission factor with its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionFactor {
    /// Category the activity belongs to (e.g. `"transport"`).
    pub category: String,
    /// Globally unique activity identifier (e.g. `"car_gasoline"`).
    pub activity_id: String,
    /// kg CO₂ per unit of activity. Finite and non-negative.
    pub factor: f64,
    /// Display unit (e.g. `"kg CO₂/km"`).
    pub unit: String,
    /// Human-readable activity name.
    pub name: String,
    /// Short description of the activity.
    pub description: String,
}

/// Public view of an activity: the factor itself is not exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublicActivity {
    /// Human-readable activity name.
    pub name: String,
    /// Display unit.
    pub unit: String,
    /// Short description of the activity.
    pub description: String,
}

/// Result of a single emission calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    /// Activity identifier the calculation was made for.
    pub activity_type: String,
    /// Quantity supplied by the caller, unchanged.
    pub quantity: f64,
    /// `round(factor * quantity, 3)` in kg CO₂.
    pub co2_emissions: f64,
    /// Display unit of the factor.
    pub unit: String,
    /// Human-readable activity name.
    pub name: String,
    /// Short description of the activity.
    pub description: String,
}

/// Read-only emission factor table grouped by category.
///
/// Categories and activities iterate in lexicographic order, so every
/// derived view is deterministic.
#[derive(Debug, Clone, Default)]
pub struct EmissionFactorTable {
    categories: BTreeMap<String, BTreeMap<String, EmissionFactor>>,
}

impl EmissionFactorTable {
    /// Loads the table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if the file cannot be read or its
    /// content is rejected by [`EmissionFactorTable::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!(
                "cannot read emission factors from {}: {e}",
                path.display()
            ))
        })?;
        let table = Self::from_json_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            categories = table.categories.len(),
            activities = table.len(),
            "emission factors loaded"
        );
        Ok(table)
    }

    /// Parses the table from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] on malformed JSON, on a factor that
    /// is negative or not finite, or when an activity id appears in more
    /// than one category.
    pub fn from_json_str(json: &str) -> Result<Self, TrackerError> {
        let raw: BTreeMap<String, BTreeMap<String, RawFactor>> = serde_json::from_str(json)
            .map_err(|e| TrackerError::Config(format!("malformed emission factors: {e}")))?;

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut categories = BTreeMap::new();

        for (category, activities) in raw {
            let mut entries = BTreeMap::new();
            for (activity_id, f) in activities {
                if !f.factor.is_finite() || f.factor < 0.0 {
                    return Err(TrackerError::Config(format!(
                        "factor for '{activity_id}' must be finite and non-negative, got {}",
                        f.factor
                    )));
                }
                if let Some(other) = seen.insert(activity_id.clone(), category.clone()) {
                    return Err(TrackerError::Config(format!(
                        "activity '{activity_id}' is defined in both '{other}' and '{category}'"
                    )));
                }
                entries.insert(
                    activity_id.clone(),
                    EmissionFactor {
                        category: category.clone(),
                        activity_id,
                        factor: f.factor,
                        unit: f.unit,
                        name: f.name,
                        description: f.description,
                    },
                );
            }
            categories.insert(category, entries);
        }

        Ok(Self { categories })
    }

    /// Total number of activities across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if the table holds no activities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds an activity by id. The first category containing it wins.
    #[must_use]
    pub fn get(&self, activity_id: &str) -> Option<&EmissionFactor> {
        self.categories
            .values()
            .find_map(|activities| activities.get(activity_id))
    }

    /// Iterates over every factor in category order.
    pub fn iter(&self) -> impl Iterator<Item = &EmissionFactor> {
        self.categories.values().flat_map(BTreeMap::values)
    }

    /// Computes emissions for `quantity` units of `activity_id`.
    ///
    /// Returns `None` when the activity is unknown. Quantities are not
    /// bounds-checked: zero and negative values scale the factor as-is.
    #[must_use]
    pub fn calculate(&self, activity_id: &str, quantity: f64) -> Option<Calculation> {
        let factor = self.get(activity_id)?;
        Some(Calculation {
            activity_type: factor.activity_id.clone(),
            quantity,
            co2_emissions: round_emissions(factor.factor * quantity),
            unit: factor.unit.clone(),
            name: factor.name.clone(),
            description: factor.description.clone(),
        })
    }

    /// The table grouped by category with factors omitted.
    #[must_use]
    pub fn public_activities(&self) -> BTreeMap<String, BTreeMap<String, PublicActivity>> {
        self.categories
            .iter()
            .map(|(category, activities)| {
                let view = activities
                    .iter()
                    .map(|(id, f)| {
                        (
                            id.clone(),
                            PublicActivity {
                                name: f.name.clone(),
                                unit: f.unit.clone(),
                                description: f.description.clone(),
                            },
                        )
                    })
                    .collect();
                (category.clone(), view)
            })
            .collect()
    }

    /// Category names in table order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }
}

/// Rounds the exact binary value to [`EMISSION_DECIMALS`] places.
///
/// Goes through correctly rounded decimal formatting rather than scaling,
/// which would round twice and overflow near `f64::MAX`.
#[must_use]
pub fn round_emissions(value: f64) -> f64 {
    format!("{value:.prec$}", prec = EMISSION_DECIMALS)
        .parse()
        .unwrap_or(value)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const BUNDLED: &str = include_str!("../../data/emission_factors.json");

    fn bundled() -> EmissionFactorTable {
        let Ok(table) = EmissionFactorTable::from_json_str(BUNDLED) else {
            panic!("bundled factor table must parse");
        };
        table
    }

    #[test]
    fn car_gasoline_ten_km() {
        let table = bundled();
        let Some(calc) = table.calculate("car_gasoline", 10.0) else {
            panic!("car_gasoline should exist");
        };
        assert_eq!(calc.co2_emissions, 2.1);
        assert_eq!(calc.quantity, 10.0);
        assert_eq!(calc.unit, "kg CO₂/km");
    }

    #[test]
    fn unknown_activity_is_none() {
        assert!(bundled().calculate("nonexistent", 1.0).is_none());
    }

    #[test]
    fn known_products_round_to_three_places() {
        let table = bundled();
        let cases = [
            ("car_gasoline", 0.25, 0.052),
            ("car_gasoline", -0.25, -0.052),
            ("bus", 10.0, 0.89),
            ("train", 100.0, 4.1),
            ("beef", 2.0, 54.0),
            ("water", 7.0, 0.002),
        ];
        for (activity, quantity, expected) in cases {
            let Some(calc) = table.calculate(activity, quantity) else {
                panic!("{activity} should be found");
            };
            assert_eq!(calc.co2_emissions, expected, "{activity} x {quantity}");
        }
    }

    #[test]
    fn every_factor_stays_within_half_a_gram() {
        let table = bundled();
        for factor in table.iter() {
            for step in 1..2000 {
                let quantity = f64::from(step) * 0.1;
                let Some(calc) = table.calculate(&factor.activity_id, quantity) else {
                    panic!("{} should be found", factor.activity_id);
                };
                let raw = factor.factor * quantity;
                assert!(
                    (calc.co2_emissions - raw).abs() <= 0.000_5 + 4.0 * raw.abs() * f64::EPSILON,
                    "{} x {quantity}: {} vs {raw}",
                    factor.activity_id,
                    calc.co2_emissions
                );
            }
        }
    }

    #[test]
    fn huge_products_stay_finite() {
        let table = bundled();
        let Some(calc) = table.calculate("car_gasoline", 1e306) else {
            panic!("car_gasoline should exist");
        };
        assert!(calc.co2_emissions.is_finite());
        assert_eq!(calc.co2_emissions, 0.21 * 1e306);
        assert_eq!(round_emissions(f64::MAX), f64::MAX);
    }

    #[test]
    fn negative_quantity_is_symmetric() {
        let table = bundled();
        let pos = table.calculate("beef", 1.5).map(|c| c.co2_emissions);
        let neg = table.calculate("beef", -1.5).map(|c| c.co2_emissions);
        assert_eq!(pos.map(|v| -v), neg);
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        assert_eq!(round_emissions(0.123_456), 0.123);
        assert_eq!(round_emissions(0.000_3 * 7.0), 0.002);
        assert_eq!(round_emissions(-2.000_4), -2.0);
        assert_eq!(round_emissions(0.21 * 0.25), 0.052);
    }

    #[test]
    fn categories_are_sorted_and_stable() {
        let table = bundled();
        let cats = table.categories();
        assert_eq!(cats, vec!["energy", "food", "household", "transport"]);
        assert_eq!(cats, table.categories());
    }

    #[test]
    fn public_view_hides_factor() {
        let table = bundled();
        let view = table.public_activities();
        let Ok(json) = serde_json::to_value(&view) else {
            panic!("public view must serialize");
        };
        assert_eq!(json["transport"]["car_gasoline"]["name"], "Car (Gasoline)");
        assert!(json["transport"]["car_gasoline"].get("factor").is_none());
        assert_eq!(view.values().map(BTreeMap::len).sum::<usize>(), table.len());
    }

    #[test]
    fn duplicate_activity_ids_are_rejected() {
        let json = r#"{
            "a": {"x": {"factor": 1.0, "unit": "u", "name": "n", "description": "d"}},
            "b": {"x": {"factor": 2.0, "unit": "u", "name": "n", "description": "d"}}
        }"#;
        let Err(err) = EmissionFactorTable::from_json_str(json) else {
            panic!("duplicate ids must fail");
        };
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn negative_factor_is_rejected() {
        let json = r#"{"a": {"x": {"factor": -1.0, "unit": "u", "name": "n", "description": "d"}}}"#;
        assert!(EmissionFactorTable::from_json_str(json).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = EmissionFactorTable::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }
}
