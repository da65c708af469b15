//! ModelIII: index-based dispatch with one-way line flows.
//!
//! Served demand equals generation plus line inflow. Storage uses the split
//! `√η` efficiency and must end the horizon at its initial level. Fixed O&M
//! is charged per hour for generators and once for lines.

#[cfg(feature = "optimization")]
use super::formulation::{weighted_sum, EfficiencySplit, Formulation, LineFlows};
#[cfg(feature = "optimization")]
use super::Scenario;
use super::DispatchModel;
#[cfg(feature = "optimization")]
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelIII;

impl DispatchModel for ModelIII {
    fn name(&self) -> &'static str {
        "ModelIII"
    }

    #[cfg(feature = "optimization")]
    fn formulate(&self, scenario: &Scenario) -> Result<Formulation, DispatchError> {
        scenario.check()?;
        let mut f = Formulation::new(scenario, LineFlows::Single);
        let hours = scenario.hours as f64;

        let gen_costs: Vec<f64> = scenario.generators.iter().map(|g| g.marginal_cost).collect();
        let storage_costs: Vec<f64> = scenario.storages.iter().map(|s| s.cost).collect();
        let line_costs: Vec<f64> = scenario.lines.iter().map(|l| l.cost).collect();
        let utility = vec![scenario.utility];

        f.objective = weighted_sum(&utility, std::slice::from_ref(&f.vars.served))
            - weighted_sum(&gen_costs, &f.vars.generation)
            - weighted_sum(&storage_costs, &f.vars.discharge)
            - weighted_sum(&storage_costs, &f.vars.charge)
            - weighted_sum(&line_costs, &f.vars.flow);

        let fixed_gen: f64 = scenario.generators.iter().map(|g| g.fixed_om * g.capacity).sum();
        let fixed_lines: f64 = scenario.lines.iter().map(|l| l.fixed_om * l.capacity).sum();
        f.fixed_welfare = -hours * fixed_gen - fixed_lines;

        f.add_demand_served(scenario);
        f.add_storage_balance(scenario, EfficiencySplit::SquareRoot);
        f.add_energy_balance(scenario);
        f.add_demand_cap(scenario);
        f.add_storage_limits(scenario);
        f.add_terminal_storage(scenario);
        f.add_generation_capacity(scenario);
        f.add_line_capacity(scenario);
        Ok(f)
    }
}

#[cfg(all(test, feature = "optimization"))]
mod tests {
    use super::*;
    use crate::dispatch::{Generator, Line, Storage};

    fn scenario() -> Scenario {
        Scenario {
            hours: 4,
            utility: 1.0,
            max_demand: vec![50.0, 80.0, 120.0, 60.0],
            generators: vec![Generator {
                id: "G1".to_string(),
                region: None,
                marginal_cost: 0.2,
                fixed_om: 0.0,
                capacity: 100.0,
                availability: vec![1.0],
            }],
            storages: vec![Storage {
                id: "S1".to_string(),
                cost: 0.01,
                power_capacity: Some(30.0),
                max_level: 60.0,
                initial_level: Some(20.0),
                efficiency: 0.81,
            }],
            lines: vec![Line {
                id: "L1".to_string(),
                loss: 0.0,
                capacity: 40.0,
                cost: 0.05,
                fixed_om: 1.0,
            }],
            regions: Vec::new(),
        }
    }

    #[test]
    fn test_terminal_level_matches_initial() {
        let sol = ModelIII.solve(&scenario()).unwrap();
        let levels = sol.levels_of("S1");
        assert_eq!(levels.len(), 4);
        assert!((levels[3] - 20.0).abs() < 1e-6);
        assert!(levels.iter().all(|&l| l <= 60.0 + 1e-6 && l >= -1e-6));
    }

    #[test]
    fn test_serves_up_to_caps() {
        let sol = ModelIII.solve(&scenario()).unwrap();
        for h in sol.hourly() {
            let cap = [50.0, 80.0, 120.0, 60.0][h.hour - 1];
            assert!(h.served_demand <= cap + 1e-6);
            // served = generation + inflow
            assert!((h.served_demand - h.total_generation() - h.net_flow()).abs() < 1e-6);
            // generation + discharge = served + charge
            let lhs = h.total_generation() + h.total_discharge();
            let rhs = h.served_demand + h.total_charge();
            assert!((lhs - rhs).abs() < 1e-6);
        }
        // capacity 100 suffices for the first, second and last hour
        assert!((sol.hours[0].served_demand - 50.0).abs() < 1e-6);
        assert!((sol.hours[1].served_demand - 80.0).abs() < 1e-6);
        assert!((sol.hours[3].served_demand - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_line_cost_charged_once() {
        let f = ModelIII.formulate(&scenario()).unwrap();
        assert!((f.fixed_welfare + 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_formulate_rejects_unchecked_scenarios() {
        let mut empty = scenario();
        empty.hours = 0;
        empty.max_demand.clear();
        assert!(matches!(
            ModelIII.formulate(&empty),
            Err(DispatchError::Validation(_))
        ));

        let mut short_profile = scenario();
        short_profile.generators[0].availability = vec![1.0, 0.5];
        assert!(matches!(
            ModelIII.formulate(&short_profile),
            Err(DispatchError::Validation(_))
        ));
    }
}
