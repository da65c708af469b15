//! ModelI: welfare maximisation with import/export lines and storage.
//!
//! Welfare per hour is the utility of served demand minus generation,
//! storage and export costs, and the fixed O&M of generators and lines.
//! Storage losses are split evenly between charging (`√η`) and discharging
//! (`1/√η`).

#[cfg(feature = "optimization")]
use super::formulation::{weighted_sum, EfficiencySplit, Formulation, LineFlows};
#[cfg(feature = "optimization")]
use super::Scenario;
use super::DispatchModel;
#[cfg(feature = "optimization")]
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelI;

impl DispatchModel for ModelI {
    fn name(&self) -> &'static str {
        "ModelI"
    }

    #[cfg(feature = "optimization")]
    fn formulate(&self, scenario: &Scenario) -> Result<Formulation, DispatchError> {
        scenario.check()?;
        let mut f = Formulation::new(scenario, LineFlows::ImportExport);
        let hours = scenario.hours as f64;

        let gen_costs: Vec<f64> = scenario.generators.iter().map(|g| g.marginal_cost).collect();
        let storage_costs: Vec<f64> = scenario.storages.iter().map(|s| s.cost).collect();
        let line_costs: Vec<f64> = scenario.lines.iter().map(|l| l.cost).collect();
        let utility = vec![scenario.utility];

        f.objective = weighted_sum(&utility, std::slice::from_ref(&f.vars.served))
            - weighted_sum(&gen_costs, &f.vars.generation)
            - weighted_sum(&storage_costs, &f.vars.discharge)
            - weighted_sum(&storage_costs, &f.vars.charge)
            - weighted_sum(&line_costs, &f.vars.export);

        let fixed_gen: f64 = scenario.generators.iter().map(|g| g.fixed_om * g.capacity).sum();
        let fixed_lines: f64 = scenario.lines.iter().map(|l| l.fixed_om * l.capacity).sum();
        f.fixed_welfare = -hours * (fixed_gen + fixed_lines);

        f.add_demand_served(scenario);
        f.add_line_capacity(scenario);
        f.add_energy_balance(scenario);
        f.add_storage_balance(scenario, EfficiencySplit::SquareRoot);
        f.add_generation_capacity(scenario);
        f.add_demand_cap(scenario);
        f.add_storage_limits(scenario);
        Ok(f)
    }
}

#[cfg(all(test, feature = "optimization"))]
mod tests {
    use super::*;
    use crate::dispatch::{Generator, Storage};

    fn single_generator() -> Scenario {
        Scenario {
            hours: 2,
            utility: 50.0,
            max_demand: vec![100.0, 100.0],
            generators: vec![Generator {
                id: "G1".to_string(),
                region: None,
                marginal_cost: 10.0,
                fixed_om: 1.0,
                capacity: 80.0,
                availability: vec![1.0],
            }],
            storages: Vec::new(),
            lines: Vec::new(),
            regions: Vec::new(),
        }
    }

    #[test]
    fn test_generation_limited_by_capacity() {
        let sol = ModelI.solve(&single_generator()).unwrap();
        assert_eq!(sol.model, "ModelI");
        for h in sol.hourly() {
            assert!((h.served_demand - 80.0).abs() < 1e-6);
            assert!((h.generation["G1"] - 80.0).abs() < 1e-6);
        }
        // 2 hours × (50 − 10) × 80 minus 2 hours × fixed O&M of 80
        let expected = 2.0 * 40.0 * 80.0 - 2.0 * 80.0;
        assert!((sol.welfare - expected).abs() < 1e-4, "welfare {}", sol.welfare);
        assert!((sol.fixed_welfare + 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_demand_cap_binds() {
        let mut scenario = single_generator();
        scenario.max_demand = vec![30.0, 60.0];
        let sol = ModelI.solve(&scenario).unwrap();
        assert!((sol.generation_of("G1")[0] - 30.0).abs() < 1e-6);
        assert!((sol.generation_of("G1")[1] - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_unprofitable_generation_is_idle() {
        let mut scenario = single_generator();
        scenario.utility = 5.0;
        let sol = ModelI.solve(&scenario).unwrap();
        assert!(sol.total_served().abs() < 1e-6);
    }

    #[test]
    fn test_idle_storage_keeps_level() {
        let mut scenario = single_generator();
        scenario.storages.push(Storage {
            id: "S1".to_string(),
            cost: 1.0,
            power_capacity: Some(10.0),
            max_level: 40.0,
            initial_level: Some(25.0),
            efficiency: 0.81,
        });
        let sol = ModelI.solve(&scenario).unwrap();
        for level in sol.levels_of("S1") {
            assert!((level - 25.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_formulation_size() {
        let scenario = Scenario::model_i_sample(42);
        let f = ModelI.formulate(&scenario).unwrap();
        // per hour: served, balance, 2 lines × 2 caps, 2 storage balances,
        // 3 generator caps, demand cap, 2 storages × 3 limits
        assert_eq!(f.constraint_count(), 24 * (1 + 1 + 4 + 2 + 3 + 1 + 6));
    }
}
