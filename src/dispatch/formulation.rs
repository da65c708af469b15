//! Linear program assembly shared by the dispatch models.
//!
//! A model fills in a [`Formulation`]: the variable blocks, a welfare
//! objective and its constraint set. Solving hands the program to the
//! minilp backend of `good_lp` and reads the variable values back into a
//! [`DispatchSolution`].

use good_lp::solvers::minilp::minilp;
use good_lp::{
    constraint, variable, Constraint, Expression, IntoAffineExpression, ProblemVariables, Solution,
    SolverModel, Variable,
};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

use super::scenario::Scenario;
use super::solution::{DispatchSolution, HourRecord, LineRecord, SolveStatus, StorageRecord};
use crate::error::DispatchError;

/// How transmission is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFlows {
    /// Separate non-negative import and export per line
    ImportExport,
    /// One non-negative flow per line
    Single,
}

/// Decision variables, indexed `[unit][hour]` (hours 0-based).
#[derive(Debug, Clone)]
pub struct DispatchVars {
    pub served: Vec<Variable>,
    pub generation: Vec<Vec<Variable>>,
    pub discharge: Vec<Vec<Variable>>,
    pub charge: Vec<Vec<Variable>>,
    pub level: Vec<Vec<Variable>>,
    pub import: Vec<Vec<Variable>>,
    pub export: Vec<Vec<Variable>>,
    pub flow: Vec<Vec<Variable>>,
}

impl DispatchVars {
    pub fn new(problem: &mut ProblemVariables, scenario: &Scenario, flows: LineFlows) -> Self {
        let n = scenario.hours;
        let mut block = |count: usize| -> Vec<Vec<Variable>> {
            (0..count)
                .map(|_| problem.add_vector(variable().min(0.0), n))
                .collect()
        };
        let generation = block(scenario.generators.len());
        let discharge = block(scenario.storages.len());
        let charge = block(scenario.storages.len());
        let level = block(scenario.storages.len());
        let (import, export, flow) = match flows {
            LineFlows::ImportExport => (
                block(scenario.lines.len()),
                block(scenario.lines.len()),
                Vec::new(),
            ),
            LineFlows::Single => (Vec::new(), Vec::new(), block(scenario.lines.len())),
        };
        let served = problem.add_vector(variable().min(0.0), n);
        Self {
            served,
            generation,
            discharge,
            charge,
            level,
            import,
            export,
            flow,
        }
    }

    pub fn total_generation(&self, h: usize) -> Expression {
        self.generation.iter().map(|g| g[h]).sum()
    }

    pub fn total_discharge(&self, h: usize) -> Expression {
        self.discharge.iter().map(|s| s[h]).sum()
    }

    pub fn total_charge(&self, h: usize) -> Expression {
        self.charge.iter().map(|s| s[h]).sum()
    }

    /// Net import over all lines after losses: `Σ (1 − ll)·import − export`.
    pub fn net_import(&self, scenario: &Scenario, h: usize) -> Expression {
        scenario
            .lines
            .iter()
            .enumerate()
            .map(|(l, line)| (1.0 - line.loss) * self.import[l][h] - self.export[l][h])
            .sum()
    }

    pub fn total_flow(&self, h: usize) -> Expression {
        self.flow.iter().map(|x| x[h]).sum()
    }
}

/// How round-trip storage efficiency is applied to charge and discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfficiencySplit {
    /// `√η` on charge and `1/√η` on discharge, so a full cycle loses `1 − η`
    SquareRoot,
    /// `η` on charge and `1/η` on discharge
    Full,
}

/// `Σ_unit Σ_hour weight[unit] · x[unit][hour]`
pub fn weighted_sum(weights: &[f64], block: &[Vec<Variable>]) -> Expression {
    weights
        .iter()
        .zip(block)
        .flat_map(|(&w, xs)| xs.iter().map(move |&x| w * x))
        .sum()
}

/// A fully declared dispatch program, ready to be solved.
pub struct Formulation {
    pub problem: ProblemVariables,
    pub vars: DispatchVars,
    /// Welfare terms that depend on the decision variables
    pub objective: Expression,
    /// Welfare terms that do not (fixed operating costs)
    pub fixed_welfare: f64,
    pub constraints: Vec<Constraint>,
}

impl Formulation {
    pub fn new(scenario: &Scenario, flows: LineFlows) -> Self {
        let mut problem = ProblemVariables::new();
        let vars = DispatchVars::new(&mut problem, scenario, flows);
        Self {
            problem,
            vars,
            objective: 0.0_f64.into_expression(),
            fixed_welfare: 0.0,
            constraints: Vec::new(),
        }
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Served demand equals own generation plus what arrives over the lines.
    pub fn add_demand_served(&mut self, scenario: &Scenario) {
        for h in 0..scenario.hours {
            let arriving = if self.vars.flow.is_empty() {
                self.vars.net_import(scenario, h)
            } else {
                self.vars.total_flow(h)
            };
            self.constraints.push(constraint!(
                self.vars.served[h] == self.vars.total_generation(h) + arriving
            ));
        }
    }

    /// Generation plus discharge covers served demand plus charging.
    pub fn add_energy_balance(&mut self, scenario: &Scenario) {
        for h in 0..scenario.hours {
            self.constraints.push(constraint!(
                self.vars.total_generation(h) + self.vars.total_discharge(h)
                    == self.vars.served[h] + self.vars.total_charge(h)
            ));
        }
    }

    pub fn add_demand_cap(&mut self, scenario: &Scenario) {
        for (h, &cap) in scenario.max_demand.iter().enumerate() {
            self.constraints.push(constraint!(self.vars.served[h] <= cap));
        }
    }

    /// Output bounded by availability-scaled capacity.
    pub fn add_generation_capacity(&mut self, scenario: &Scenario) {
        for (i, g) in scenario.generators.iter().enumerate() {
            for h in 0..scenario.hours {
                self.constraints.push(constraint!(
                    self.vars.generation[i][h] <= g.available_capacity(h)
                ));
            }
        }
    }

    pub fn add_line_capacity(&mut self, scenario: &Scenario) {
        for (l, line) in scenario.lines.iter().enumerate() {
            for h in 0..scenario.hours {
                if self.vars.flow.is_empty() {
                    self.constraints
                        .push(constraint!(self.vars.import[l][h] <= line.capacity));
                    self.constraints
                        .push(constraint!(self.vars.export[l][h] <= line.capacity));
                } else {
                    self.constraints
                        .push(constraint!(self.vars.flow[l][h] <= line.capacity));
                }
            }
        }
    }

    /// Level dynamics: `S[h] = S[h−1] + η_c·charge − discharge/η_d`, with
    /// `S[−1]` the initial level.
    pub fn add_storage_balance(&mut self, scenario: &Scenario, split: EfficiencySplit) {
        for (s, storage) in scenario.storages.iter().enumerate() {
            let eta = match split {
                EfficiencySplit::SquareRoot => storage.efficiency.sqrt(),
                EfficiencySplit::Full => storage.efficiency,
            };
            for h in 0..scenario.hours {
                let previous = if h == 0 {
                    storage.initial_level().into_expression()
                } else {
                    self.vars.level[s][h - 1].into_expression()
                };
                self.constraints.push(constraint!(
                    self.vars.level[s][h]
                        == previous + self.vars.charge[s][h] * eta
                            - self.vars.discharge[s][h] * (1.0 / eta)
                ));
            }
        }
    }

    /// Level within `[0, max_level]`; charge and discharge within the power
    /// capacity when one is given.
    pub fn add_storage_limits(&mut self, scenario: &Scenario) {
        for (s, storage) in scenario.storages.iter().enumerate() {
            for h in 0..scenario.hours {
                self.constraints
                    .push(constraint!(self.vars.level[s][h] <= storage.max_level));
                if let Some(q) = storage.power_capacity {
                    self.constraints.push(constraint!(self.vars.charge[s][h] <= q));
                    self.constraints
                        .push(constraint!(self.vars.discharge[s][h] <= q));
                }
            }
        }
    }

    /// The last level returns to the initial level.
    pub fn add_terminal_storage(&mut self, scenario: &Scenario) {
        let Some(last) = scenario.hours.checked_sub(1) else {
            return;
        };
        for (s, storage) in scenario.storages.iter().enumerate() {
            self.constraints.push(constraint!(
                self.vars.level[s][last] == storage.initial_level()
            ));
        }
    }

    /// Maximise welfare and collect the hourly dispatch.
    pub fn solve(self, model: &str, scenario: &Scenario) -> Result<DispatchSolution, DispatchError> {
        let Formulation {
            problem,
            vars,
            objective,
            fixed_welfare,
            constraints,
        } = self;

        let started = Instant::now();
        debug!(model, constraints = constraints.len(), "handing program to minilp");
        let mut lp = problem.maximise(objective.clone()).using(minilp);
        for c in constraints {
            lp = lp.with(c);
        }
        // minilp only returns a solution once it has reached the optimum
        let solution = lp.solve()?;
        let status = SolveStatus::Optimal;

        let welfare = objective.eval_with(&solution) + fixed_welfare;
        info!(
            model,
            %status,
            welfare,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatch solved"
        );

        let hours = (0..scenario.hours)
            .map(|h| extract_hour(&solution, &vars, scenario, h))
            .collect();

        Ok(DispatchSolution {
            model: model.to_string(),
            status,
            welfare,
            fixed_welfare,
            hours,
        })
    }
}

fn extract_hour<S: Solution>(
    solution: &S,
    vars: &DispatchVars,
    scenario: &Scenario,
    h: usize,
) -> HourRecord {
    let generation = scenario
        .generators
        .iter()
        .zip(&vars.generation)
        .map(|(g, v)| (g.id.clone(), solution.value(v[h])))
        .collect();

    let storage = scenario
        .storages
        .iter()
        .enumerate()
        .map(|(s, st)| {
            let record = StorageRecord {
                charge: solution.value(vars.charge[s][h]),
                discharge: solution.value(vars.discharge[s][h]),
                level: solution.value(vars.level[s][h]),
            };
            (st.id.clone(), record)
        })
        .collect();

    let mut lines = BTreeMap::new();
    for (l, line) in scenario.lines.iter().enumerate() {
        let record = if vars.flow.is_empty() {
            let import = solution.value(vars.import[l][h]);
            let export = solution.value(vars.export[l][h]);
            LineRecord {
                import,
                export,
                flow: (1.0 - line.loss) * import - export,
            }
        } else {
            let flow = solution.value(vars.flow[l][h]);
            LineRecord {
                import: flow,
                export: 0.0,
                flow,
            }
        };
        lines.insert(line.id.clone(), record);
    }

    HourRecord {
        hour: h + 1,
        served_demand: solution.value(vars.served[h]),
        generation,
        storage,
        lines,
    }
}
