use log::{debug, warn};

use crate::problem::{ConstraintOp, LpProblem, ProblemError};
use crate::solution::Solution;

/// Simplex solver for bounded linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots (both phases together) before giving up
    max_iterations: usize,
    /// Tolerance for pivot selection and zero tests
    tolerance: f64,
    /// Largest constraint or bound violation accepted in a returned point
    feasibility_tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-6,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tol: f64) -> Self {
        self.feasibility_tolerance = tol;
        self
    }

    pub fn feasibility_tolerance(&self) -> f64 {
        self.feasibility_tolerance
    }

    /// Solve the LP problem using the two-phase simplex method.
    ///
    /// Input that fails [`LpProblem::validate`] is rejected before any
    /// pivoting. Every other outcome, including solver breakdown, is
    /// reported through [`Solution::status`].
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, ProblemError> {
        problem.validate()?;

        let form = StandardForm::from_problem(problem);
        let mut tableau = Tableau::new(&form);
        let mut iterations = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                PhaseOutcome::Optimal => {}
                PhaseOutcome::Unbounded | PhaseOutcome::IterationLimit => {
                    warn!("phase 1 stopped without converging after {} pivots", iterations);
                    return Ok(Solution::numerical_error(iterations));
                }
            }
            if !self.artificials_cleared(&tableau) {
                debug!("phase 1 left artificial variables positive: infeasible");
                return Ok(Solution::infeasible(iterations));
            }
            self.drive_out_artificials(&mut tableau, &mut iterations);
        }
        debug!("feasible basis found after {} pivots", iterations);

        // Phase 2: Optimize
        tableau.load_objective(&form.costs);
        let entering_limit = tableau.artificial_start();
        match self.run(&mut tableau, entering_limit, &mut iterations) {
            PhaseOutcome::Optimal => {}
            PhaseOutcome::Unbounded => {
                debug!("phase 2 found an unbounded ray after {} pivots", iterations);
                let mut solution = Solution::unbounded(iterations);
                if !problem.objective.minimize {
                    solution.objective_value = f64::INFINITY;
                }
                return Ok(solution);
            }
            PhaseOutcome::IterationLimit => {
                warn!("iteration limit of {} reached in phase 2", self.max_iterations);
                return Ok(Solution::numerical_error(iterations));
            }
        }

        Ok(self.extract_solution(&tableau, &form, problem, iterations))
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> PhaseOutcome {
        // Auxiliary objective: maximize -sum(artificials)
        let art_start = tableau.artificial_start();
        let obj = tableau.obj_row();
        let n_cols = tableau.n_cols();

        tableau.data[obj].iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj][j] = -1.0;
        }
        // Price out the artificials that start in the basis
        for i in 0..obj {
            if tableau.basis[i] >= art_start {
                let row = tableau.data[i].clone();
                for (o, r) in tableau.data[obj].iter_mut().zip(&row) {
                    *o += r;
                }
            }
        }

        self.run(tableau, n_cols - 1, iterations)
    }

    fn artificials_cleared(&self, tableau: &Tableau) -> bool {
        let art_start = tableau.artificial_start();
        let rhs = tableau.rhs_col();
        let scale = 1.0
            + (0..tableau.obj_row())
                .map(|i| tableau.data[i][rhs].abs())
                .fold(0.0, f64::max);

        (0..tableau.obj_row())
            .filter(|&i| tableau.basis[i] >= art_start)
            .all(|i| tableau.data[i][rhs].abs() <= self.feasibility_tolerance * scale)
    }

    /// Pivot zero-level artificials out of the basis. A row whose
    /// non-artificial entries are all zero is a redundant equality and keeps
    /// its artificial; phase 2 never selects it in the ratio test.
    fn drive_out_artificials(&self, tableau: &mut Tableau, iterations: &mut usize) {
        let art_start = tableau.artificial_start();
        let rhs = tableau.rhs_col();

        for i in 0..tableau.obj_row() {
            if tableau.basis[i] < art_start {
                continue;
            }
            let best = (0..art_start)
                .map(|j| (j, tableau.data[i][j].abs()))
                .filter(|&(_, a)| a > self.tolerance)
                .max_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((col, _)) => {
                    tableau.data[i][rhs] = 0.0;
                    tableau.pivot(i, col);
                    *iterations += 1;
                }
                None => debug!("constraint row {} is redundant", i),
            }
        }
    }

    /// Primal simplex iterations using Bland's rule. Only columns below
    /// `entering_limit` may enter the basis.
    fn run(&self, tableau: &mut Tableau, entering_limit: usize, iterations: &mut usize) -> PhaseOutcome {
        loop {
            let Some(col) = self.entering_column(tableau, entering_limit) else {
                return PhaseOutcome::Optimal;
            };
            let Some(row) = self.leaving_row(tableau, col) else {
                return PhaseOutcome::Unbounded;
            };
            if *iterations >= self.max_iterations {
                return PhaseOutcome::IterationLimit;
            }
            tableau.pivot(row, col);
            *iterations += 1;
        }
    }

    /// Lowest-index column with a positive reduced cost
    fn entering_column(&self, tableau: &Tableau, limit: usize) -> Option<usize> {
        let obj = &tableau.data[tableau.obj_row()];
        (0..limit).find(|&j| obj[j] > self.tolerance)
    }

    /// Minimum ratio test; ties go to the row whose basic variable has the
    /// lowest index
    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs = tableau.rhs_col();
        let mut best: Option<(usize, f64)> = None;

        for i in 0..tableau.obj_row() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs].max(0.0) / val;
            best = match best {
                None => Some((i, ratio)),
                Some((r, min)) => {
                    let smaller = ratio < min - self.tolerance;
                    let tied = ratio <= min + self.tolerance && tableau.basis[i] < tableau.basis[r];
                    if smaller || tied { Some((i, ratio)) } else { Some((r, min)) }
                }
            };
        }

        best.map(|(i, _)| i)
    }

    fn extract_solution(&self, tableau: &Tableau, form: &StandardForm, problem: &LpProblem, iterations: usize) -> Solution {
        let rhs = tableau.rhs_col();
        let mut y = vec![0.0; form.n_struct];
        for (i, &basic) in tableau.basis.iter().enumerate() {
            if basic < form.n_struct {
                y[basic] = tableau.data[i][rhs];
            }
        }

        let mut values: Vec<f64> = form.columns.iter().map(|map| map.value(&y)).collect();
        if let Some(reason) = self.verify(problem, &values) {
            warn!("rejecting simplex result: {}", reason);
            return Solution::numerical_error(iterations);
        }

        // Snap values that sit within tolerance outside their bounds
        for (v, b) in values.iter_mut().zip(&problem.bounds) {
            *v = v.clamp(b.lower, b.upper);
        }

        let objective_value = problem
            .objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        Solution::optimal(values, objective_value, iterations)
    }

    /// Describe the first violated requirement, if any
    fn verify(&self, problem: &LpProblem, values: &[f64]) -> Option<String> {
        if let Some(j) = values.iter().position(|v| !v.is_finite()) {
            return Some(format!("{} is not finite", problem.variables[j]));
        }

        for ((name, b), &v) in problem.variables.iter().zip(&problem.bounds).zip(values) {
            if !b.contains(v, self.feasibility_tolerance * (1.0 + v.abs())) {
                return Some(format!("{} = {} outside [{}, {}]", name, v, b.lower, b.upper));
            }
        }

        for c in &problem.constraints {
            let lhs = LpProblem::activity(c, values);
            let tol = self.feasibility_tolerance * (1.0 + c.rhs.abs());
            let violated = match c.op {
                ConstraintOp::Le => lhs > c.rhs + tol,
                ConstraintOp::Ge => lhs < c.rhs - tol,
                ConstraintOp::Eq => (lhs - c.rhs).abs() > tol,
            };
            if violated {
                return Some(format!("{} has activity {} against rhs {}", c.name, lhs, c.rhs));
            }
        }

        None
    }
}

/// How an original variable is expressed through nonnegative tableau columns
#[derive(Debug, Clone, Copy)]
enum ColumnMap {
    /// x = offset + y
    Shifted { col: usize, offset: f64 },
    /// x = offset - y
    Mirrored { col: usize, offset: f64 },
    /// x = y_pos - y_neg
    Split { pos: usize, neg: usize },
}

impl ColumnMap {
    fn value(&self, y: &[f64]) -> f64 {
        match *self {
            ColumnMap::Shifted { col, offset } => offset + y[col],
            ColumnMap::Mirrored { col, offset } => offset - y[col],
            ColumnMap::Split { pos, neg } => y[pos] - y[neg],
        }
    }
}

struct Row {
    coefficients: Vec<f64>,
    op: ConstraintOp,
    rhs: f64,
}

/// The problem rewritten over nonnegative columns with nonnegative right-hand sides
struct StandardForm {
    columns: Vec<ColumnMap>,
    n_struct: usize,
    rows: Vec<Row>,
    /// Maximization costs over the structural columns
    costs: Vec<f64>,
}

impl StandardForm {
    fn from_problem(problem: &LpProblem) -> Self {
        let mut columns = Vec::with_capacity(problem.num_variables());
        let mut n_struct = 0;
        for b in &problem.bounds {
            let map = if b.lower.is_finite() {
                ColumnMap::Shifted { col: n_struct, offset: b.lower }
            } else if b.upper.is_finite() {
                ColumnMap::Mirrored { col: n_struct, offset: b.upper }
            } else {
                n_struct += 1;
                ColumnMap::Split { pos: n_struct - 1, neg: n_struct }
            };
            n_struct += 1;
            columns.push(map);
        }

        let mut rows = Vec::with_capacity(problem.num_constraints());
        for c in &problem.constraints {
            let (coefficients, rhs) = expand(&columns, n_struct, &c.coefficients, c.rhs);
            rows.push(Row { coefficients, op: c.op, rhs });
        }

        // Finite upper bounds of shifted columns become explicit rows
        for (map, b) in columns.iter().zip(&problem.bounds) {
            if let ColumnMap::Shifted { col, .. } = *map {
                if b.upper.is_finite() {
                    let mut coefficients = vec![0.0; n_struct];
                    coefficients[col] = 1.0;
                    rows.push(Row {
                        coefficients,
                        op: ConstraintOp::Le,
                        rhs: b.upper - b.lower,
                    });
                }
            }
        }

        for row in &mut rows {
            if row.rhs < 0.0 {
                row.rhs = -row.rhs;
                row.coefficients.iter_mut().for_each(|a| *a = -*a);
                row.op = match row.op {
                    ConstraintOp::Le => ConstraintOp::Ge,
                    ConstraintOp::Ge => ConstraintOp::Le,
                    ConstraintOp::Eq => ConstraintOp::Eq,
                };
            }
        }

        // Simplex maximizes, so minimization costs are negated
        let sign = if problem.objective.minimize { -1.0 } else { 1.0 };
        let (mut costs, _) = expand(&columns, n_struct, &problem.objective.coefficients, 0.0);
        costs.iter_mut().for_each(|c| *c *= sign);

        Self {
            columns,
            n_struct,
            rows,
            costs,
        }
    }
}

/// Rewrite `coefficients · x (op) rhs` over the structural columns
fn expand(columns: &[ColumnMap], n_struct: usize, coefficients: &[f64], rhs: f64) -> (Vec<f64>, f64) {
    let mut row = vec![0.0; n_struct];
    let mut rhs = rhs;
    for (map, &a) in columns.iter().zip(coefficients) {
        match *map {
            ColumnMap::Shifted { col, offset } => {
                row[col] += a;
                rhs -= a * offset;
            }
            ColumnMap::Mirrored { col, offset } => {
                row[col] -= a;
                rhs -= a * offset;
            }
            ColumnMap::Split { pos, neg } => {
                row[pos] += a;
                row[neg] -= a;
            }
        }
    }
    (row, rhs)
}

/// Dense simplex tableau. The last row holds reduced costs (positive means
/// the column can improve the objective), the last column the right-hand side.
struct Tableau {
    data: Vec<Vec<f64>>,
    basis: Vec<usize>,
    n_struct: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn new(form: &StandardForm) -> Self {
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for row in &form.rows {
            match row.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let n_rows = form.rows.len();
        let total_cols = form.n_struct + n_slack + n_artificial + 1; // +1 for RHS
        let mut data = vec![vec![0.0; total_cols]; n_rows + 1];
        let mut basis = vec![0; n_rows];

        let mut slack_idx = form.n_struct;
        let mut artificial_idx = form.n_struct + n_slack;

        for (i, row) in form.rows.iter().enumerate() {
            data[i][..form.n_struct].copy_from_slice(&row.coefficients);
            data[i][total_cols - 1] = row.rhs;

            match row.op {
                ConstraintOp::Le => {
                    data[i][slack_idx] = 1.0;
                    basis[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    data[i][slack_idx] = -1.0;
                    slack_idx += 1;
                    data[i][artificial_idx] = 1.0;
                    basis[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    data[i][artificial_idx] = 1.0;
                    basis[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        Self {
            data,
            basis,
            n_struct: form.n_struct,
            n_slack,
            n_artificial,
        }
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    fn rhs_col(&self) -> usize {
        self.n_cols() - 1
    }

    fn artificial_start(&self) -> usize {
        self.n_struct + self.n_slack
    }

    /// Install phase 2 costs and price out the current basis
    fn load_objective(&mut self, costs: &[f64]) {
        let obj = self.obj_row();
        self.data[obj].iter_mut().for_each(|v| *v = 0.0);
        self.data[obj][..costs.len()].copy_from_slice(costs);

        for i in 0..obj {
            let factor = self.data[obj][self.basis[i]];
            if factor != 0.0 {
                let row = self.data[i].clone();
                for (o, r) in self.data[obj].iter_mut().zip(&row) {
                    *o -= factor * r;
                }
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basis[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        self.data[row].iter_mut().for_each(|v| *v /= pivot_val);
        let pivot_row = self.data[row].clone();

        // Eliminate column in other rows
        for (i, data_row) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = data_row[col];
            if factor != 0.0 {
                for (v, p) in data_row.iter_mut().zip(&pivot_row) {
                    *v -= factor * p;
                }
            }
        }
    }
}

enum PhaseOutcome {
    Optimal,
    Unbounded,
    IterationLimit,
}
