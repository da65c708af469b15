use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Termination status reported with a solution. Infeasible and unbounded
/// programs surface as [`DispatchError`](crate::error::DispatchError) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub charge: f64,
    pub discharge: f64,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub import: f64,
    pub export: f64,
    /// Net power arriving over the line after losses
    pub flow: f64,
}

/// Dispatch in one hour (hours are numbered from 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    pub hour: usize,
    pub served_demand: f64,
    pub generation: BTreeMap<String, f64>,
    pub storage: BTreeMap<String, StorageRecord>,
    pub lines: BTreeMap<String, LineRecord>,
}

impl HourRecord {
    pub fn total_generation(&self) -> f64 {
        self.generation.values().sum()
    }

    pub fn total_charge(&self) -> f64 {
        self.storage.values().map(|s| s.charge).sum()
    }

    pub fn total_discharge(&self) -> f64 {
        self.storage.values().map(|s| s.discharge).sum()
    }

    pub fn net_flow(&self) -> f64 {
        self.lines.values().map(|l| l.flow).sum()
    }
}

/// Optimal dispatch returned by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSolution {
    pub model: String,
    pub status: SolveStatus,
    /// Objective value including fixed operating costs
    pub welfare: f64,
    pub fixed_welfare: f64,
    pub hours: Vec<HourRecord>,
}

impl DispatchSolution {
    pub fn hourly(&self) -> impl Iterator<Item = &HourRecord> {
        self.hours.iter()
    }

    pub fn hour(&self, hour: usize) -> Option<&HourRecord> {
        self.hours.iter().find(|r| r.hour == hour)
    }

    pub fn total_served(&self) -> f64 {
        self.hours.iter().map(|h| h.served_demand).sum()
    }

    pub fn total_generation(&self) -> f64 {
        self.hours.iter().map(|h| h.total_generation()).sum()
    }

    /// Output of one generator across all hours.
    pub fn generation_of(&self, id: &str) -> Vec<f64> {
        self.hours
            .iter()
            .map(|h| h.generation.get(id).copied().unwrap_or(0.0))
            .collect()
    }

    /// Storage level trajectory of one storage across all hours.
    pub fn levels_of(&self, id: &str) -> Vec<f64> {
        self.hours
            .iter()
            .filter_map(|h| h.storage.get(id).map(|s| s.level))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hour: usize, served: f64) -> HourRecord {
        let mut generation = BTreeMap::new();
        generation.insert("G1".to_string(), served);
        let mut storage = BTreeMap::new();
        storage.insert(
            "S1".to_string(),
            StorageRecord {
                charge: 1.0,
                discharge: 0.0,
                level: hour as f64,
            },
        );
        HourRecord {
            hour,
            served_demand: served,
            generation,
            storage,
            lines: BTreeMap::new(),
        }
    }

    #[test]
    fn test_totals() {
        let sol = DispatchSolution {
            model: "ModelI".to_string(),
            status: SolveStatus::Optimal,
            welfare: 0.0,
            fixed_welfare: 0.0,
            hours: vec![record(1, 10.0), record(2, 20.0)],
        };
        assert_eq!(sol.total_served(), 30.0);
        assert_eq!(sol.total_generation(), 30.0);
        assert_eq!(sol.generation_of("G1"), vec![10.0, 20.0]);
        assert_eq!(sol.generation_of("G9"), vec![0.0, 0.0]);
        assert_eq!(sol.levels_of("S1"), vec![1.0, 2.0]);
        assert_eq!(sol.hour(2).map(|h| h.total_charge()), Some(1.0));
        assert!(sol.hour(3).is_none());
    }

    #[test]
    fn test_json_contains_hours() {
        let sol = DispatchSolution {
            model: "ModelII".to_string(),
            status: SolveStatus::Optimal,
            welfare: 1.5,
            fixed_welfare: 0.0,
            hours: vec![record(1, 5.0)],
        };
        let json = sol.to_json().unwrap();
        let back: DispatchSolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hours.len(), 1);
        assert_eq!(back.model, "ModelII");
        assert_eq!(back.status, SolveStatus::Optimal);
        assert!(json.contains("\"status\": \"optimal\""));
    }
}
