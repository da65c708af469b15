//! Scenario data for the dispatch models: sets, capacities, costs and hourly profiles.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use validator::Validate;

use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Generator {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub region: Option<String>,
    #[validate(range(min = 0.0))]
    pub marginal_cost: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub fixed_om: f64,
    #[validate(range(min = 0.0))]
    pub capacity: f64,
    /// Availability factor, either one value for every hour or one per hour
    #[serde(default = "full_availability")]
    #[validate(length(min = 1))]
    pub availability: Vec<f64>,
}

fn full_availability() -> Vec<f64> {
    vec![1.0]
}

impl Generator {
    pub fn availability_at(&self, hour: usize) -> f64 {
        if self.availability.len() == 1 {
            self.availability[0]
        } else {
            self.availability[hour]
        }
    }

    /// Available capacity in `hour` (0-based).
    pub fn available_capacity(&self, hour: usize) -> f64 {
        self.capacity * self.availability_at(hour)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Storage {
    #[validate(length(min = 1))]
    pub id: String,
    /// Cost per unit charged or discharged
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub cost: f64,
    /// Charge/discharge rate limit; unlimited when absent
    #[serde(default)]
    pub power_capacity: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_level: f64,
    /// Level before the first hour; half of `max_level` when absent
    #[serde(default)]
    pub initial_level: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub efficiency: f64,
}

impl Storage {
    pub fn initial_level(&self) -> f64 {
        self.initial_level.unwrap_or(self.max_level / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Line {
    #[validate(length(min = 1))]
    pub id: String,
    /// Fraction of imported power lost in transit
    #[serde(default)]
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub loss: f64,
    #[validate(range(min = 0.0))]
    pub capacity: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub cost: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub fixed_om: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Region {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(range(min = 0.0))]
    pub generation_limit: f64,
}

/// Everything a dispatch model needs to be formulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Scenario {
    #[validate(range(min = 1))]
    pub hours: usize,
    /// Utility of one unit of served demand
    #[serde(default = "unit_utility")]
    pub utility: f64,
    /// Upper bound on served demand in each hour
    pub max_demand: Vec<f64>,
    #[validate(nested)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    #[validate(nested)]
    pub storages: Vec<Storage>,
    #[serde(default)]
    #[validate(nested)]
    pub lines: Vec<Line>,
    #[serde(default)]
    #[validate(nested)]
    pub regions: Vec<Region>,
}

fn unit_utility() -> f64 {
    1.0
}

fn ensure_finite(id: &str, field: &str, value: f64) -> Result<(), DispatchError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DispatchError::Validation(format!(
            "{id}: {field} must be finite, got {value}"
        )))
    }
}

impl Scenario {
    /// Load a scenario from a `.json` or `.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DispatchError::Scenario(format!("{}: {}", path.display(), e)))?;
        let scenario: Scenario = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| DispatchError::Scenario(format!("{}: {}", path.display(), e)))?,
            _ => toml::from_str(&text)
                .map_err(|e| DispatchError::Scenario(format!("{}: {}", path.display(), e)))?,
        };
        scenario.check()?;
        Ok(scenario)
    }

    /// Field-level validation plus the cross-field rules serde cannot express.
    pub fn check(&self) -> Result<(), DispatchError> {
        self.validate()?;

        if self.max_demand.len() != self.hours {
            return Err(DispatchError::Validation(format!(
                "max_demand has {} entries for {} hours",
                self.max_demand.len(),
                self.hours
            )));
        }
        if !self.utility.is_finite() {
            return Err(DispatchError::Validation("utility is not finite".to_string()));
        }
        if let Some(d) = self.max_demand.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(DispatchError::Validation(format!(
                "max_demand must be non-negative, got {d}"
            )));
        }
        if self.generators.is_empty() {
            return Err(DispatchError::Validation("no generators".to_string()));
        }

        let duplicate = self
            .generators
            .iter()
            .map(|g| &g.id)
            .chain(self.storages.iter().map(|s| &s.id))
            .chain(self.lines.iter().map(|l| &l.id))
            .duplicates()
            .next();
        if let Some(id) = duplicate {
            return Err(DispatchError::Validation(format!("duplicate id '{id}'")));
        }

        // Range validation lets NaN and infinities through
        for g in &self.generators {
            ensure_finite(&g.id, "marginal_cost", g.marginal_cost)?;
            ensure_finite(&g.id, "fixed_om", g.fixed_om)?;
            ensure_finite(&g.id, "capacity", g.capacity)?;
        }
        for s in &self.storages {
            ensure_finite(&s.id, "cost", s.cost)?;
            ensure_finite(&s.id, "max_level", s.max_level)?;
            ensure_finite(&s.id, "efficiency", s.efficiency)?;
        }
        for l in &self.lines {
            ensure_finite(&l.id, "loss", l.loss)?;
            ensure_finite(&l.id, "capacity", l.capacity)?;
            ensure_finite(&l.id, "cost", l.cost)?;
            ensure_finite(&l.id, "fixed_om", l.fixed_om)?;
        }
        for r in &self.regions {
            ensure_finite(&r.id, "generation_limit", r.generation_limit)?;
        }

        let regions: HashSet<&str> = self.regions.iter().map(|r| r.id.as_str()).collect();
        for g in &self.generators {
            let n = g.availability.len();
            if n != 1 && n != self.hours {
                return Err(DispatchError::Validation(format!(
                    "{}: availability has {} entries, expected 1 or {}",
                    g.id, n, self.hours
                )));
            }
            if g.availability.iter().any(|a| !a.is_finite() || *a < 0.0) {
                return Err(DispatchError::Validation(format!(
                    "{}: availability must be non-negative",
                    g.id
                )));
            }
            if let Some(region) = &g.region {
                if !regions.is_empty() && !regions.contains(region.as_str()) {
                    return Err(DispatchError::Validation(format!(
                        "{}: unknown region '{}'",
                        g.id, region
                    )));
                }
            }
        }

        for s in &self.storages {
            let initial = s.initial_level();
            if !(0.0..=s.max_level).contains(&initial) {
                return Err(DispatchError::Validation(format!(
                    "{}: initial level {} outside [0, {}]",
                    s.id, initial, s.max_level
                )));
            }
            if let Some(q) = s.power_capacity {
                if !q.is_finite() || q < 0.0 {
                    return Err(DispatchError::Validation(format!(
                        "{}: power capacity must be non-negative",
                        s.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Indices of the generators located in `region`.
    pub fn generators_in(&self, region: &str) -> Vec<usize> {
        self.generators
            .iter()
            .enumerate()
            .filter(|(_, g)| g.region.as_deref() == Some(region))
            .map(|(i, _)| i)
            .collect()
    }

    /// Three generators, two storages and two lines over 24 hours, with
    /// availability and demand caps drawn from a seeded generator.
    pub fn model_i_sample(seed: u64) -> Self {
        const HOURS: usize = 24;
        let mut rng = StdRng::seed_from_u64(seed);
        let availability = Uniform::new(0.8, 1.2);

        let gens = [
            ("G1", "g", 20.0, 100.0, 300.0),
            ("G2", "other", 25.0, 120.0, 250.0),
            ("G3", "g", 30.0, 140.0, 400.0),
        ];
        let generators = gens
            .iter()
            .map(|&(id, region, marginal_cost, fixed_om, capacity)| Generator {
                id: id.to_string(),
                region: Some(region.to_string()),
                marginal_cost,
                fixed_om,
                capacity,
                availability: (0..HOURS).map(|_| rng.sample(availability)).collect(),
            })
            .collect();

        let max_demand = (0..HOURS)
            .map(|_| rng.gen_range(500..700) as f64)
            .collect();

        Self {
            hours: HOURS,
            utility: 50.0,
            max_demand,
            generators,
            storages: vec![
                Storage {
                    id: "S1".to_string(),
                    cost: 10.0,
                    power_capacity: Some(200.0),
                    max_level: 400.0,
                    initial_level: Some(100.0),
                    efficiency: 0.9,
                },
                Storage {
                    id: "S2".to_string(),
                    cost: 12.0,
                    power_capacity: Some(150.0),
                    max_level: 350.0,
                    initial_level: Some(80.0),
                    efficiency: 0.85,
                },
            ],
            lines: vec![
                Line {
                    id: "L1".to_string(),
                    loss: 0.02,
                    capacity: 500.0,
                    cost: 5.0,
                    fixed_om: 50.0,
                },
                Line {
                    id: "L2".to_string(),
                    loss: 0.03,
                    capacity: 600.0,
                    cost: 6.0,
                    fixed_om: 60.0,
                },
            ],
            regions: Vec::new(),
        }
    }

    /// Five generators split over DK1 and DK2 with fixed availability, two
    /// storages starting half full, and a flat demand cap of 500.
    pub fn model_ii_sample() -> Self {
        const HOURS: usize = 24;
        let gens = [
            ("G1", "DK1", 20.0, 5.0, 300.0, 1.0),
            ("G2", "DK1", 25.0, 6.0, 250.0, 0.9),
            ("G3", "DK1", 30.0, 7.0, 400.0, 0.8),
            ("G4", "DK2", 35.0, 8.0, 200.0, 0.7),
            ("G5", "DK2", 40.0, 9.0, 350.0, 0.6),
        ];
        let generators = gens
            .iter()
            .map(|&(id, region, marginal_cost, fixed_om, capacity, availability)| Generator {
                id: id.to_string(),
                region: Some(region.to_string()),
                marginal_cost,
                fixed_om,
                capacity,
                availability: vec![availability],
            })
            .collect();

        Self {
            hours: HOURS,
            utility: 0.5,
            max_demand: vec![500.0; HOURS],
            generators,
            storages: vec![
                Storage {
                    id: "Storage1".to_string(),
                    cost: 0.0,
                    power_capacity: None,
                    max_level: 500.0,
                    initial_level: None,
                    efficiency: 0.9,
                },
                Storage {
                    id: "Storage2".to_string(),
                    cost: 0.0,
                    power_capacity: None,
                    max_level: 400.0,
                    initial_level: None,
                    efficiency: 0.85,
                },
            ],
            lines: vec![
                Line {
                    id: "L1".to_string(),
                    loss: 0.02,
                    capacity: 500.0,
                    cost: 1.0,
                    fixed_om: 0.0,
                },
                Line {
                    id: "L2".to_string(),
                    loss: 0.03,
                    capacity: 600.0,
                    cost: 1.0,
                    fixed_om: 0.0,
                },
            ],
            regions: vec![
                Region {
                    id: "DK1".to_string(),
                    generation_limit: 800.0,
                },
                Region {
                    id: "DK2".to_string(),
                    generation_limit: 800.0,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_valid() {
        Scenario::model_i_sample(42).check().unwrap();
        Scenario::model_ii_sample().check().unwrap();
    }

    #[test]
    fn test_model_i_sample_is_reproducible() {
        assert_eq!(Scenario::model_i_sample(7), Scenario::model_i_sample(7));
        assert_ne!(
            Scenario::model_i_sample(7).max_demand,
            Scenario::model_i_sample(8).max_demand
        );
    }

    #[test]
    fn test_model_i_sample_ranges() {
        let s = Scenario::model_i_sample(42);
        assert!(s.max_demand.iter().all(|d| (500.0..700.0).contains(d)));
        for g in &s.generators {
            assert_eq!(g.availability.len(), 24);
            assert!(g.availability.iter().all(|a| (0.8..1.2).contains(a)));
        }
    }

    #[test]
    fn test_broadcast_availability() {
        let s = Scenario::model_ii_sample();
        assert_eq!(s.generators[1].availability_at(0), 0.9);
        assert_eq!(s.generators[1].availability_at(23), 0.9);
        assert!((s.generators[4].available_capacity(5) - 210.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_initial_level_is_half_full() {
        let s = Scenario::model_ii_sample();
        assert_eq!(s.storages[0].initial_level(), 250.0);
    }

    #[test]
    fn test_regions() {
        let s = Scenario::model_ii_sample();
        assert_eq!(s.generators_in("DK1"), vec![0, 1, 2]);
        assert_eq!(s.generators_in("DK2"), vec![3, 4]);
        assert!(s.generators_in("SE3").is_empty());
    }

    #[test]
    fn test_check_rejects_inconsistent_data() {
        let mut s = Scenario::model_ii_sample();
        s.max_demand.pop();
        assert!(s.check().is_err());

        let mut s = Scenario::model_ii_sample();
        s.generators[0].availability = vec![1.0, 1.0];
        assert!(s.check().is_err());

        let mut s = Scenario::model_ii_sample();
        s.generators[0].region = Some("SE3".to_string());
        assert!(s.check().is_err());

        let mut s = Scenario::model_ii_sample();
        s.storages[0].initial_level = Some(1000.0);
        assert!(s.check().is_err());

        let mut s = Scenario::model_ii_sample();
        s.lines[0].id = "G1".to_string();
        assert!(s.check().is_err());

        let mut s = Scenario::model_ii_sample();
        s.storages[0].efficiency = 0.0;
        assert!(matches!(s.check(), Err(DispatchError::Validation(_))));
    }

    #[test]
    fn test_check_rejects_non_finite_values() {
        let mut s = Scenario::model_ii_sample();
        s.generators[0].marginal_cost = f64::NAN;
        assert!(matches!(s.check(), Err(DispatchError::Validation(_))));

        let mut s = Scenario::model_ii_sample();
        s.lines[1].capacity = f64::INFINITY;
        assert!(matches!(s.check(), Err(DispatchError::Validation(_))));

        let mut s = Scenario::model_ii_sample();
        s.storages[0].efficiency = f64::NAN;
        assert!(matches!(s.check(), Err(DispatchError::Validation(_))));

        let mut s = Scenario::model_ii_sample();
        s.regions[0].generation_limit = f64::INFINITY;
        assert!(s.check().is_err());
    }

    #[test]
    fn test_from_path_rejects_nan_cost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        let text = toml::to_string(&Scenario::model_ii_sample())
            .unwrap()
            .replacen("marginal_cost = 20.0", "marginal_cost = nan", 1);
        assert!(text.contains("marginal_cost = nan"));
        fs::write(&path, text).unwrap();
        assert!(matches!(
            Scenario::from_path(&path),
            Err(DispatchError::Validation(_))
        ));
    }

    #[test]
    fn test_from_path_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let text = serde_json::to_string(&Scenario::model_ii_sample()).unwrap();
        fs::write(&path, text).unwrap();
        let loaded = Scenario::from_path(&path).unwrap();
        assert_eq!(loaded, Scenario::model_ii_sample());
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        assert!(matches!(
            Scenario::from_path("/nonexistent/scenario.toml"),
            Err(DispatchError::Scenario(_))
        ));
    }
}
