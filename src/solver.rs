//! A thin convex-QP layer over the Clarabel interior-point solver.
//!
//! Model assembly code builds a [`Problem`] out of variables, linear constraints and additive
//! quadratic objective terms. [`Problem::solve`] lowers the problem to Clarabel's conic form
//!
//! ```text
//! minimise    ½ xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ ZeroCone × NonnegativeCone
//! ```
//!
//! and maps the termination status back. Only convex problems are supported; a non-convex
//! quadratic objective is a programming error and will be rejected by the solver.
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

/// A linear expression: a weighted sum of variables plus a constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    /// The (variable, coefficient) terms of the expression
    pub terms: Vec<(Variable, f64)>,
    /// The constant offset
    pub constant: f64,
}

impl LinearExpr {
    /// An empty expression
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression consisting of a single term
    pub fn term(var: Variable, coeff: f64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0.0,
        }
    }

    /// Append a term to the expression
    pub fn push(&mut self, var: Variable, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Add `scale` times another expression to this one
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(var, coeff)| (var, coeff * scale)));
        self.constant += other.constant * scale;
    }
}

/// A quadratic expression: a linear part plus pairwise product terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadExpr {
    /// The linear (and constant) part
    pub linear: LinearExpr,
    /// The (variable, variable, coefficient) product terms
    pub quad: Vec<(Variable, Variable, f64)>,
}

impl QuadExpr {
    /// An empty expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a linear term
    pub fn add_linear(&mut self, var: Variable, coeff: f64) {
        self.linear.push(var, coeff);
    }

    /// Append a product term `coeff · a · b`
    pub fn add_quadratic(&mut self, a: Variable, b: Variable, coeff: f64) {
        self.quad.push((a, b, coeff));
    }

    /// Add to the constant offset
    pub fn add_constant(&mut self, value: f64) {
        self.linear.constant += value;
    }

    /// Add `scale` times another expression to this one
    pub fn add_scaled(&mut self, other: &QuadExpr, scale: f64) {
        self.linear.add_scaled(&other.linear, scale);
        self.quad.extend(
            other
                .quad
                .iter()
                .map(|&(a, b, coeff)| (a, b, coeff * scale)),
        );
    }
}

/// The sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Left-hand side equals the right-hand side
    Equal,
    /// Left-hand side is at most the right-hand side
    LessEqual,
    /// Left-hand side is at least the right-hand side
    GreaterEqual,
}

/// The termination status reported by the solver.
///
/// Mirrors Clarabel's status values so that failures can be surfaced verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SolveStatus {
    Solved,
    AlmostSolved,
    PrimalInfeasible,
    AlmostPrimalInfeasible,
    DualInfeasible,
    AlmostDualInfeasible,
    MaxIterations,
    MaxTime,
    NumericalError,
    InsufficientProgress,
    SetupError,
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => Self::Solved,
            SolverStatus::AlmostSolved => Self::AlmostSolved,
            SolverStatus::PrimalInfeasible => Self::PrimalInfeasible,
            SolverStatus::AlmostPrimalInfeasible => Self::AlmostPrimalInfeasible,
            SolverStatus::DualInfeasible => Self::DualInfeasible,
            SolverStatus::AlmostDualInfeasible => Self::AlmostDualInfeasible,
            SolverStatus::MaxIterations => Self::MaxIterations,
            SolverStatus::MaxTime => Self::MaxTime,
            SolverStatus::InsufficientProgress => Self::InsufficientProgress,
            _ => Self::NumericalError,
        }
    }
}

/// A single linear constraint row.
#[derive(Debug, Clone)]
struct Row {
    expr: LinearExpr,
    sense: Sense,
    rhs: f64,
}

/// A convex quadratic optimisation problem under construction.
#[derive(Default)]
pub struct Problem {
    bounds: Vec<(f64, f64)>,
    fixed: Vec<Option<f64>>,
    rows: Vec<Row>,
    objective: QuadExpr,
}

impl Problem {
    /// Create an empty problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a real variable with the given bounds.
    ///
    /// Use `f64::NEG_INFINITY` / `f64::INFINITY` for unbounded sides.
    pub fn add_variable(&mut self, lb: f64, ub: f64) -> Variable {
        assert!(lb <= ub, "Variable bounds are inverted");
        let var = Variable(self.bounds.len());
        self.bounds.push((lb, ub));
        self.fixed.push(None);
        var
    }

    /// Fix a variable to a constant value.
    ///
    /// The variable is substituted out of the problem before solving, so the extracted value is
    /// exact rather than subject to solver tolerance.
    pub fn fix(&mut self, var: Variable, value: f64) {
        self.fixed[var.0] = Some(value);
    }

    /// Add a linear constraint `expr (sense) rhs`
    pub fn add_constraint(&mut self, expr: LinearExpr, sense: Sense, rhs: f64) {
        self.rows.push(Row { expr, sense, rhs });
    }

    /// Add a term to the (additive) quadratic objective
    pub fn add_objective(&mut self, expr: &QuadExpr) {
        self.objective.add_scaled(expr, 1.0);
    }

    /// The number of variables added so far
    pub fn num_variables(&self) -> usize {
        self.bounds.len()
    }

    /// The number of constraint rows added so far
    pub fn num_constraints(&self) -> usize {
        self.rows.len()
    }

    /// Write a human-readable dump of the problem, for debugging.
    pub fn dump<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "variables: {} ({} fixed)",
            self.bounds.len(),
            self.fixed.iter().filter(|f| f.is_some()).count()
        )?;
        for (idx, (lb, ub)) in self.bounds.iter().enumerate() {
            match self.fixed[idx] {
                Some(value) => writeln!(writer, "  x{idx} fixed at {value}")?,
                None => writeln!(writer, "  x{idx} in [{lb}, {ub}]")?,
            }
        }

        writeln!(writer, "constraints: {}", self.rows.len())?;
        for (idx, row) in self.rows.iter().enumerate() {
            let sense = match row.sense {
                Sense::Equal => "==",
                Sense::LessEqual => "<=",
                Sense::GreaterEqual => ">=",
            };
            write!(writer, "  c{idx}:")?;
            write_linear(writer, &row.expr)?;
            writeln!(writer, " {sense} {}", row.rhs)?;
        }

        writeln!(writer, "minimise:")?;
        for (a, b, coeff) in &self.objective.quad {
            write!(writer, " + {coeff}*x{}*x{}", a.0, b.0)?;
        }
        write_linear(writer, &self.objective.linear)?;
        writeln!(writer)?;

        Ok(())
    }

    /// Solve the problem, consuming it.
    ///
    /// # Returns
    ///
    /// The solution if the solver reports (almost) optimality, or the termination status
    /// otherwise.
    pub fn solve(self) -> Result<Solution, SolveStatus> {
        let lowered = self.lower();

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|_| SolveStatus::SetupError)?;
        let mut solver = DefaultSolver::new(
            &lowered.quadratic,
            &lowered.linear,
            &lowered.constraints,
            &lowered.rhs,
            &lowered.cones,
            settings,
        );
        solver.solve();

        let solution = solver.solution;
        match solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                // Scatter the solver's values back over the full variable set, with fixed
                // variables taking their exact values
                let mut values = vec![0.0; self.bounds.len()];
                for (idx, value) in values.iter_mut().enumerate() {
                    *value = match self.fixed[idx] {
                        Some(fixed) => fixed,
                        None => solution.x[lowered.free_index[idx].unwrap()],
                    };
                }

                Ok(Solution {
                    objective: solution.obj_val + lowered.objective_constant,
                    iterations: solution.iterations,
                    values,
                })
            }
            status => Err(status.into()),
        }
    }

    /// Lower the problem to Clarabel's conic form.
    ///
    /// Fixed variables are substituted out: their contributions move to the right-hand sides and
    /// the objective constant, and the remaining variables are compacted to contiguous column
    /// indices. Equality rows come first (zero cone), then all inequalities including variable
    /// bounds (nonnegative cone).
    fn lower(&self) -> Lowered {
        let mut free_index = vec![None; self.bounds.len()];
        let mut n_free = 0;
        for (idx, fixed) in self.fixed.iter().enumerate() {
            if fixed.is_none() {
                free_index[idx] = Some(n_free);
                n_free += 1;
            }
        }

        // Fold a row's fixed variables into its right-hand side and coalesce repeated terms
        let lower_row = |expr: &LinearExpr, rhs: f64| -> (HashMap<usize, f64>, f64) {
            let mut coeffs: HashMap<usize, f64> = HashMap::new();
            let mut rhs = rhs - expr.constant;
            for &(var, coeff) in &expr.terms {
                match self.fixed[var.0] {
                    Some(value) => rhs -= coeff * value,
                    None => *coeffs.entry(free_index[var.0].unwrap()).or_insert(0.0) += coeff,
                }
            }
            (coeffs, rhs)
        };

        let mut entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut rhs_all = Vec::new();
        let mut push_row = |coeffs: &HashMap<usize, f64>, rhs: f64, rhs_all: &mut Vec<f64>| {
            let row = rhs_all.len();
            for (&col, &coeff) in coeffs {
                *entries.entry((col, row)).or_insert(0.0) += coeff;
            }
            rhs_all.push(rhs);
        };

        // Equality rows (zero cone)
        for row in self.rows.iter().filter(|r| r.sense == Sense::Equal) {
            let (coeffs, rhs) = lower_row(&row.expr, row.rhs);
            push_row(&coeffs, rhs, &mut rhs_all);
        }
        let n_eq = rhs_all.len();

        // Inequality rows (nonnegative cone), normalised to `terms <= rhs`
        for row in self.rows.iter().filter(|r| r.sense != Sense::Equal) {
            let (mut coeffs, mut rhs) = lower_row(&row.expr, row.rhs);
            if row.sense == Sense::GreaterEqual {
                coeffs.values_mut().for_each(|c| *c = -*c);
                rhs = -rhs;
            }
            push_row(&coeffs, rhs, &mut rhs_all);
        }

        // Bounds on free variables
        for (idx, &(lb, ub)) in self.bounds.iter().enumerate() {
            let Some(col) = free_index[idx] else {
                continue;
            };
            if lb.is_finite() {
                push_row(&HashMap::from([(col, -1.0)]), -lb, &mut rhs_all);
            }
            if ub.is_finite() {
                push_row(&HashMap::from([(col, 1.0)]), ub, &mut rhs_all);
            }
        }
        let n_ineq = rhs_all.len() - n_eq;

        let mut cones = Vec::new();
        if n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_ineq));
        }

        // Objective: upper-triangular P (Clarabel reads only the upper triangle), dense q and a
        // folded constant
        let mut quad_entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut linear = vec![0.0; n_free];
        let mut constant = self.objective.linear.constant;
        for &(var, coeff) in &self.objective.linear.terms {
            match self.fixed[var.0] {
                Some(value) => constant += coeff * value,
                None => linear[free_index[var.0].unwrap()] += coeff,
            }
        }
        for &(a, b, coeff) in &self.objective.quad {
            match (self.fixed[a.0], self.fixed[b.0]) {
                (Some(va), Some(vb)) => constant += coeff * va * vb,
                (Some(va), None) => linear[free_index[b.0].unwrap()] += coeff * va,
                (None, Some(vb)) => linear[free_index[a.0].unwrap()] += coeff * vb,
                (None, None) => {
                    let (i, j) = (free_index[a.0].unwrap(), free_index[b.0].unwrap());
                    if i == j {
                        // ½xᵀPx contributes P[i,i]/2 per squared term
                        *quad_entries.entry((i, i)).or_insert(0.0) += 2.0 * coeff;
                    } else {
                        *quad_entries.entry((i.max(j), i.min(j))).or_insert(0.0) += coeff;
                    }
                }
            }
        }

        Lowered {
            constraints: csc_from_entries(rhs_all.len(), n_free, &entries),
            quadratic: csc_from_entries(n_free, n_free, &quad_entries),
            linear,
            rhs: rhs_all,
            cones,
            free_index,
            objective_constant: constant,
        }
    }
}

/// The conic form of a [`Problem`], ready to hand to Clarabel.
struct Lowered {
    constraints: CscMatrix<f64>,
    quadratic: CscMatrix<f64>,
    linear: Vec<f64>,
    rhs: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
    free_index: Vec<Option<usize>>,
    objective_constant: f64,
}

/// Build a CSC matrix from (column, row) → value entries.
///
/// `BTreeMap` iteration order is exactly the column-major order CSC requires.
fn csc_from_entries(
    nrows: usize,
    ncols: usize,
    entries: &BTreeMap<(usize, usize), f64>,
) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::with_capacity(entries.len());
    let mut nzval = Vec::with_capacity(entries.len());

    let mut col = 0;
    colptr.push(0);
    for (&(c, r), &v) in entries {
        while col < c {
            colptr.push(rowval.len());
            col += 1;
        }
        rowval.push(r);
        nzval.push(v);
    }
    while col < ncols {
        colptr.push(rowval.len());
        col += 1;
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

fn write_linear<W: Write>(writer: &mut W, expr: &LinearExpr) -> io::Result<()> {
    for (var, coeff) in &expr.terms {
        write!(writer, " + {coeff}*x{}", var.0)?;
    }
    if expr.constant != 0.0 {
        write!(writer, " + {}", expr.constant)?;
    }
    Ok(())
}

/// The primal solution to a solved problem.
#[derive(Debug)]
pub struct Solution {
    objective: f64,
    iterations: u32,
    values: Vec<f64>,
}

impl Solution {
    /// The value of the given variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.0]
    }

    /// The objective value, including any constant terms
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// The number of interior-point iterations the solver took
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Evaluate a linear expression at the solution
    pub fn eval_linear(&self, expr: &LinearExpr) -> f64 {
        expr.terms
            .iter()
            .map(|&(var, coeff)| coeff * self.value(var))
            .sum::<f64>()
            + expr.constant
    }

    /// Evaluate a quadratic expression at the solution
    pub fn eval_quad(&self, expr: &QuadExpr) -> f64 {
        self.eval_linear(&expr.linear)
            + expr
                .quad
                .iter()
                .map(|&(a, b, coeff)| coeff * self.value(a) * self.value(b))
                .sum::<f64>()
    }
}
