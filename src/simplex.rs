//! A dense two-phase simplex solver.
//!
//! Minimizes a linear objective over non-negative variables subject to
//! linear constraints with `<=`, `=` or `>=` relations. Phase one finds a
//! basic feasible point through artificial variables, phase two optimizes
//! the real objective. Bland's rule keeps degenerate problems from
//! cycling.

use log::debug;

use crate::error::SimplexError;

/// Pivoting tolerance. Deliberately much tighter than the crate's
/// domain-comparison tolerance: vertex coordinates come out of repeated
/// eliminations and need all the precision the tableau can keep.
const EPSILON: f64 = 1e-9;

/// How much phase one is allowed to leave in the artificial variables
/// before the program is declared infeasible.
const FEASIBILITY_EPSILON: f64 = 1e-7;

/// The relation of a constraint row to its right-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

/// A single linear constraint `coefficients . x  <relation>  rhs`.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(coefficients: Vec<f64>, relation: Relation, rhs: f64) -> Constraint {
        Constraint {
            coefficients,
            relation,
            rhs,
        }
    }
}

/// The point reached by the solver and the objective value there.
#[derive(Clone, Debug)]
pub struct Optimum {
    pub point: Vec<f64>,
    pub value: f64,
}

/// A linear program over implicitly non-negative variables.
#[derive(Clone, Debug)]
pub struct LinearProgram {
    objective: Vec<f64>,
    constant: f64,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    /// A program minimizing `objective . x + constant`.
    pub fn new(objective: Vec<f64>, constant: f64) -> LinearProgram {
        LinearProgram {
            objective,
            constant,
            constraints: Vec::new(),
        }
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn variables(&self) -> usize {
        self.objective.len()
    }

    pub fn constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Minimize the objective over the feasible region.
    pub fn minimize(&self) -> Result<Optimum, SimplexError> {
        let variables = self.objective.len();
        for (index, constraint) in self.constraints.iter().enumerate() {
            if constraint.coefficients.len() != variables {
                return Err(SimplexError::DimensionMismatch {
                    index,
                    found: constraint.coefficients.len(),
                    expected: variables,
                });
            }
        }

        let mut tableau = Tableau::build(&self.objective, &self.constraints);
        debug!(
            "simplex: {} variables, {} constraints, {} artificials",
            variables,
            self.constraints.len(),
            tableau.artificials
        );

        if tableau.artificials > 0 {
            tableau.run_phase_one()?;
        }
        tableau.run_phase_two(&self.objective)?;

        let point = tableau.extract_point(variables);
        let value = self
            .objective
            .iter()
            .zip(&point)
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.constant;
        Ok(Optimum { point, value })
    }
}

/// The working tableau: one row per constraint plus a priced cost row.
///
/// Column layout is `[structural | slack/surplus | artificial]` with the
/// right-hand side as the final entry of each row.
struct Tableau {
    rows: Vec<Vec<f64>>,
    cost: Vec<f64>,
    basis: Vec<usize>,
    /// First artificial column; also the column count of phase two.
    artificial_start: usize,
    artificials: usize,
}

impl Tableau {
    fn build(objective: &[f64], constraints: &[Constraint]) -> Tableau {
        let variables = objective.len();

        // Orient every row so its right-hand side is non-negative.
        let oriented: Vec<(Vec<f64>, Relation, f64)> = constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    let flipped = match c.relation {
                        Relation::LessOrEqual => Relation::GreaterOrEqual,
                        Relation::Equal => Relation::Equal,
                        Relation::GreaterOrEqual => Relation::LessOrEqual,
                    };
                    (
                        c.coefficients.iter().map(|v| -v).collect(),
                        flipped,
                        -c.rhs,
                    )
                } else {
                    (c.coefficients.clone(), c.relation, c.rhs)
                }
            })
            .collect();

        let slacks = oriented
            .iter()
            .filter(|(_, relation, _)| *relation != Relation::Equal)
            .count();
        let artificials = oriented
            .iter()
            .filter(|(_, relation, _)| *relation != Relation::LessOrEqual)
            .count();
        let artificial_start = variables + slacks;
        let width = artificial_start + artificials + 1;

        let mut rows = Vec::with_capacity(oriented.len());
        let mut basis = Vec::with_capacity(oriented.len());
        let mut next_slack = variables;
        let mut next_artificial = artificial_start;

        for (coefficients, relation, rhs) in oriented {
            let mut row = vec![0.0; width];
            row[..variables].copy_from_slice(&coefficients);
            *row.last_mut().expect("row width is at least one") = rhs;
            match relation {
                Relation::LessOrEqual => {
                    row[next_slack] = 1.0;
                    basis.push(next_slack);
                    next_slack += 1;
                }
                Relation::GreaterOrEqual => {
                    row[next_slack] = -1.0;
                    next_slack += 1;
                    row[next_artificial] = 1.0;
                    basis.push(next_artificial);
                    next_artificial += 1;
                }
                Relation::Equal => {
                    row[next_artificial] = 1.0;
                    basis.push(next_artificial);
                    next_artificial += 1;
                }
            }
            rows.push(row);
        }

        Tableau {
            rows,
            cost: vec![0.0; width],
            basis,
            artificial_start,
            artificials,
        }
    }

    /// Minimize the sum of the artificial variables, then drive them out
    /// of the basis and drop their columns.
    fn run_phase_one(&mut self) -> Result<(), SimplexError> {
        let width = self.width();
        self.cost = vec![0.0; width];
        for column in self.artificial_start..width - 1 {
            self.cost[column] = 1.0;
        }
        self.price_out_basis();
        self.iterate()?;

        let residue = -self.cost[width - 1];
        if residue > FEASIBILITY_EPSILON {
            return Err(SimplexError::Infeasible);
        }

        // Pivot surviving artificials out on any usable column; a row
        // that offers none is redundant and is dropped.
        let mut row = 0;
        while row < self.rows.len() {
            if self.basis[row] < self.artificial_start {
                row += 1;
                continue;
            }
            match (0..self.artificial_start).find(|&col| self.rows[row][col].abs() > EPSILON) {
                Some(col) => {
                    self.pivot(row, col);
                    row += 1;
                }
                None => {
                    self.rows.remove(row);
                    self.basis.remove(row);
                }
            }
        }

        // Truncate the artificial columns away.
        let rhs = width - 1;
        for row in &mut self.rows {
            let value = row[rhs];
            row.truncate(self.artificial_start);
            row.push(value);
        }
        self.artificials = 0;
        Ok(())
    }

    fn run_phase_two(&mut self, objective: &[f64]) -> Result<(), SimplexError> {
        let width = self.width();
        self.cost = vec![0.0; width];
        self.cost[..objective.len()].copy_from_slice(objective);
        self.price_out_basis();
        self.iterate()
    }

    /// Subtract basic-variable costs so that every basic column prices
    /// at zero.
    fn price_out_basis(&mut self) {
        for row in 0..self.rows.len() {
            let basic_cost = self.cost[self.basis[row]];
            if basic_cost != 0.0 {
                for column in 0..self.width() {
                    self.cost[column] -= basic_cost * self.rows[row][column];
                }
            }
        }
    }

    /// Run simplex iterations with Bland's rule until optimal.
    fn iterate(&mut self) -> Result<(), SimplexError> {
        let columns = self.width() - 1;
        loop {
            let entering = match (0..columns).find(|&col| self.cost[col] < -EPSILON) {
                Some(col) => col,
                None => return Ok(()),
            };

            let mut leaving: Option<usize> = None;
            let mut best = f64::INFINITY;
            for row in 0..self.rows.len() {
                let coefficient = self.rows[row][entering];
                if coefficient <= EPSILON {
                    continue;
                }
                let ratio = *self.rows[row].last().expect("rows are non-empty") / coefficient;
                let improves = match leaving {
                    None => true,
                    Some(current) => {
                        ratio < best - EPSILON
                            || (ratio < best + EPSILON && self.basis[row] < self.basis[current])
                    }
                };
                if improves {
                    best = best.min(ratio);
                    leaving = Some(row);
                }
            }

            match leaving {
                Some(row) => self.pivot(row, entering),
                None => return Err(SimplexError::Unbounded),
            }
        }
    }

    fn pivot(&mut self, pivot_row: usize, pivot_col: usize) {
        let width = self.width();
        let pivot = self.rows[pivot_row][pivot_col];
        for column in 0..width {
            self.rows[pivot_row][column] /= pivot;
        }
        self.rows[pivot_row][pivot_col] = 1.0;

        for row in 0..self.rows.len() {
            if row == pivot_row {
                continue;
            }
            let factor = self.rows[row][pivot_col];
            if factor != 0.0 {
                for column in 0..width {
                    let addend = factor * self.rows[pivot_row][column];
                    self.rows[row][column] -= addend;
                }
                self.rows[row][pivot_col] = 0.0;
            }
        }

        let factor = self.cost[pivot_col];
        if factor != 0.0 {
            for column in 0..width {
                let addend = factor * self.rows[pivot_row][column];
                self.cost[column] -= addend;
            }
            self.cost[pivot_col] = 0.0;
        }

        self.basis[pivot_row] = pivot_col;
    }

    fn extract_point(&self, variables: usize) -> Vec<f64> {
        let mut point = vec![0.0; variables];
        for (row, &basic) in self.basis.iter().enumerate() {
            if basic < variables {
                point[basic] = self.rows[row].last().expect("rows are non-empty").max(0.0);
            }
        }
        point
    }

    fn width(&self) -> usize {
        self.rows
            .first()
            .map_or(self.artificial_start + self.artificials + 1, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn solve(
        objective: Vec<f64>,
        constant: f64,
        constraints: Vec<Constraint>,
    ) -> Result<Optimum, SimplexError> {
        let mut program = LinearProgram::new(objective, constant);
        for constraint in constraints {
            program.add_constraint(constraint);
        }
        program.minimize()
    }

    #[test]
    fn test_maximization_via_negated_objective() {
        // max x + y over x + y <= 4, x <= 2.
        let optimum = solve(
            vec![-1.0, -1.0],
            0.0,
            vec![
                Constraint::new(vec![1.0, 1.0], Relation::LessOrEqual, 4.0),
                Constraint::new(vec![1.0, 0.0], Relation::LessOrEqual, 2.0),
            ],
        )
        .expect("test");
        assert_abs_diff_eq!(optimum.value, -4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            optimum.point[0] + optimum.point[1],
            4.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_equality_constraints_need_phase_one() {
        let optimum = solve(
            vec![1.0, 2.0],
            0.0,
            vec![Constraint::new(vec![1.0, 1.0], Relation::Equal, 3.0)],
        )
        .expect("test");
        // The cheap variable carries the whole constraint.
        assert_abs_diff_eq!(optimum.point[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(optimum.point[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(optimum.value, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_greater_or_equal_and_objective_constant() {
        // min 2x + 3y - 1 with x + y >= 2, y >= 0.5.
        let optimum = solve(
            vec![2.0, 3.0],
            -1.0,
            vec![
                Constraint::new(vec![1.0, 1.0], Relation::GreaterOrEqual, 2.0),
                Constraint::new(vec![0.0, 1.0], Relation::GreaterOrEqual, 0.5),
            ],
        )
        .expect("test");
        assert_abs_diff_eq!(optimum.point[0], 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(optimum.point[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(optimum.value, 2.0 * 1.5 + 3.0 * 0.5 - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_rhs_is_reoriented() {
        // x >= 1 written as -x <= -1.
        let optimum = solve(
            vec![1.0],
            0.0,
            vec![Constraint::new(vec![-1.0], Relation::LessOrEqual, -1.0)],
        )
        .expect("test");
        assert_abs_diff_eq!(optimum.point[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_infeasible() {
        let result = solve(
            vec![1.0],
            0.0,
            vec![
                Constraint::new(vec![1.0], Relation::LessOrEqual, 1.0),
                Constraint::new(vec![1.0], Relation::GreaterOrEqual, 2.0),
            ],
        );
        assert_eq!(result.unwrap_err(), SimplexError::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let result = solve(
            vec![-1.0],
            0.0,
            vec![Constraint::new(vec![1.0], Relation::GreaterOrEqual, 1.0)],
        );
        assert_eq!(result.unwrap_err(), SimplexError::Unbounded);
    }

    #[test]
    fn test_degenerate_vertex() {
        // (1, 0) is over-determined: three constraints meet there.
        let optimum = solve(
            vec![-1.0, -1.0],
            0.0,
            vec![
                Constraint::new(vec![1.0, 1.0], Relation::LessOrEqual, 1.0),
                Constraint::new(vec![1.0, 0.0], Relation::LessOrEqual, 1.0),
                Constraint::new(vec![1.0, -1.0], Relation::LessOrEqual, 1.0),
            ],
        )
        .expect("test");
        assert_abs_diff_eq!(optimum.value, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_redundant_equality_rows_are_dropped() {
        let optimum = solve(
            vec![1.0, 1.0],
            0.0,
            vec![
                Constraint::new(vec![1.0, 1.0], Relation::Equal, 2.0),
                Constraint::new(vec![2.0, 2.0], Relation::Equal, 4.0),
            ],
        )
        .expect("test");
        assert_abs_diff_eq!(optimum.value, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_variable_program_is_a_feasibility_check() {
        let feasible = solve(
            vec![],
            7.5,
            vec![Constraint::new(vec![], Relation::LessOrEqual, 3.0)],
        )
        .expect("test");
        assert!(feasible.point.is_empty());
        assert_abs_diff_eq!(feasible.value, 7.5);

        let infeasible = solve(
            vec![],
            0.0,
            vec![Constraint::new(vec![], Relation::Equal, 5.0)],
        );
        assert_eq!(infeasible.unwrap_err(), SimplexError::Infeasible);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = solve(
            vec![1.0, 1.0],
            0.0,
            vec![Constraint::new(vec![1.0], Relation::LessOrEqual, 1.0)],
        );
        assert_eq!(
            result.unwrap_err(),
            SimplexError::DimensionMismatch {
                index: 0,
                found: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_no_constraints() {
        // Non-negativity alone: minimum of a non-negative objective is 0.
        let optimum = solve(vec![2.0, 1.0], 0.0, vec![]).expect("test");
        assert_abs_diff_eq!(optimum.value, 0.0);

        let unbounded = solve(vec![-2.0], 0.0, vec![]);
        assert_eq!(unbounded.unwrap_err(), SimplexError::Unbounded);
    }
}
