//! The shared cost expression registers.
//!
//! Every submodel contributes additively to a per-timepoint register and a per-period register;
//! the composer turns them into the objective by weighting each timepoint's register by the
//! timepoint's weight. A second pair of registers tracks the generator submodel's contributions
//! alone, so that generator costs can be itemised separately in the results.
use crate::solver::{QuadExpr, Solution};
use crate::system::System;

/// The two shared cost expression registers (plus the generator-only pair).
#[derive(Debug)]
pub struct CostRegisters {
    period: QuadExpr,
    timepoint: Vec<QuadExpr>,
    generator_period: QuadExpr,
    generator_timepoint: Vec<QuadExpr>,
}

/// Itemised cost totals evaluated from a solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    /// The weighted sum of the per-timepoint operational costs
    pub per_timepoint: f64,
    /// The per-period (fixed/investment) cost
    pub per_period: f64,
    /// The sum of the two components
    pub total: f64,
}

impl CostRegisters {
    /// Create empty registers for the given number of timepoints
    pub fn new(n_timepoints: usize) -> Self {
        Self {
            period: QuadExpr::new(),
            timepoint: vec![QuadExpr::new(); n_timepoints],
            generator_period: QuadExpr::new(),
            generator_timepoint: vec![QuadExpr::new(); n_timepoints],
        }
    }

    /// Add a term to the per-period cost
    pub fn add_period_cost(&mut self, term: &QuadExpr) {
        self.period.add_scaled(term, 1.0);
    }

    /// Add a term to the given timepoint's operational cost
    pub fn add_timepoint_cost(&mut self, timepoint: usize, term: &QuadExpr) {
        self.timepoint[timepoint].add_scaled(term, 1.0);
    }

    /// Add a generator term to the per-period cost.
    ///
    /// The term also lands in the generator-only register for itemised output.
    pub fn add_generator_period_cost(&mut self, term: &QuadExpr) {
        self.period.add_scaled(term, 1.0);
        self.generator_period.add_scaled(term, 1.0);
    }

    /// Add a generator term to the given timepoint's operational cost.
    ///
    /// The term also lands in the generator-only register for itemised output.
    pub fn add_generator_timepoint_cost(&mut self, timepoint: usize, term: &QuadExpr) {
        self.timepoint[timepoint].add_scaled(term, 1.0);
        self.generator_timepoint[timepoint].add_scaled(term, 1.0);
    }

    /// Assemble the objective: the weighted sum of per-timepoint costs plus the period cost
    pub fn objective(&self, system: &System) -> QuadExpr {
        let mut objective = QuadExpr::new();
        for (t, timepoint) in system.iter_timepoints() {
            objective.add_scaled(&self.timepoint[t], timepoint.weight);
        }
        objective.add_scaled(&self.period, 1.0);
        objective
    }

    /// Evaluate the itemised system costs at a solution
    pub fn breakdown(&self, solution: &Solution, system: &System) -> CostBreakdown {
        Self::eval(&self.timepoint, &self.period, solution, system)
    }

    /// Evaluate the itemised generator-only costs at a solution
    pub fn generator_breakdown(&self, solution: &Solution, system: &System) -> CostBreakdown {
        Self::eval(
            &self.generator_timepoint,
            &self.generator_period,
            solution,
            system,
        )
    }

    fn eval(
        timepoint: &[QuadExpr],
        period: &QuadExpr,
        solution: &Solution,
        system: &System,
    ) -> CostBreakdown {
        let per_timepoint = system
            .iter_timepoints()
            .map(|(t, tp)| tp.weight * solution.eval_quad(&timepoint[t]))
            .sum();
        let per_period = solution.eval_quad(period);

        CostBreakdown {
            per_timepoint,
            per_period,
            total: per_timepoint + per_period,
        }
    }
}
