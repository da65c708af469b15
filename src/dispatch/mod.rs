//! Hourly dispatch welfare models
//!
//! Three linear formulations of an electricity market that maximise the
//! utility of served demand net of generation, storage and transmission
//! costs:
//! - ModelI: import/export lines, storage with split round-trip efficiency
//! - ModelII: regional generation limits, availability-scaled capacity
//! - ModelIII: single-direction line flows and a terminal storage condition

#[cfg(feature = "optimization")]
pub mod formulation;
pub mod model_i;
pub mod model_ii;
pub mod model_iii;
pub mod scenario;
pub mod solution;

#[cfg(feature = "optimization")]
pub use formulation::{DispatchVars, Formulation, LineFlows};
pub use model_i::ModelI;
pub use model_ii::ModelII;
pub use model_iii::ModelIII;
pub use scenario::{Generator, Line, Region, Scenario, Storage};
pub use solution::{DispatchSolution, HourRecord, LineRecord, SolveStatus, StorageRecord};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::info;

use crate::error::DispatchError;

pub trait DispatchModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validate `scenario` and declare its linear program.
    #[cfg(feature = "optimization")]
    fn formulate(&self, scenario: &Scenario) -> Result<Formulation, DispatchError>;

    /// Validate the scenario, formulate and solve.
    fn solve(&self, scenario: &Scenario) -> Result<DispatchSolution, DispatchError> {
        scenario.check()?;
        info!(
            model = self.name(),
            hours = scenario.hours,
            generators = scenario.generators.len(),
            storages = scenario.storages.len(),
            lines = scenario.lines.len(),
            "solving dispatch"
        );
        #[cfg(feature = "optimization")]
        {
            self.formulate(scenario)?.solve(self.name(), scenario)
        }
        #[cfg(not(feature = "optimization"))]
        {
            Err(DispatchError::SolverUnavailable)
        }
    }
}

/// Selects one of the dispatch formulations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ModelKind {
    #[serde(rename = "i")]
    #[strum(to_string = "i", serialize = "1", serialize = "model_i")]
    I,
    #[serde(rename = "ii")]
    #[strum(to_string = "ii", serialize = "2", serialize = "model_ii")]
    II,
    #[serde(rename = "iii")]
    #[strum(to_string = "iii", serialize = "3", serialize = "model_iii")]
    III,
}

impl ModelKind {
    pub fn build(self) -> Box<dyn DispatchModel> {
        match self {
            ModelKind::I => Box::new(ModelI),
            ModelKind::II => Box::new(ModelII),
            ModelKind::III => Box::new(ModelIII),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!(ModelKind::from_str("ii").unwrap(), ModelKind::II);
        assert_eq!(ModelKind::from_str("III").unwrap(), ModelKind::III);
        assert_eq!(ModelKind::from_str("1").unwrap(), ModelKind::I);
        assert_eq!(ModelKind::from_str("model_ii").unwrap(), ModelKind::II);
        assert!(ModelKind::from_str("iv").is_err());
        assert_eq!(ModelKind::II.to_string(), "ii");
    }

    #[test]
    fn test_build_names() {
        let names: Vec<_> = ModelKind::iter().map(|k| k.build().name()).collect();
        assert_eq!(names, vec!["ModelI", "ModelII", "ModelIII"]);
    }
}
