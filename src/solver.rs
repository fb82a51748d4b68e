//! The equilibrium solver.
//!
//! Given a graph, a payment time for every contract and an equilibrium
//! time, the solver finds how much principal to forgive on each contract
//! so that every party's equity vanishes at the equilibrium time, while
//! forgiving as little as possible in total.
//!
//! The pipeline works as follows:
//! - clone every contract and shift its origin so a compounding tick
//!   lands exactly on its payment time (continuous contracts need no
//!   shift); this makes values before and after the payment compose
//! - build one linear equation per node: the cuts, grown from their
//!   payment times to the equilibrium time, must absorb exactly the
//!   node's no-cut equity
//! - reduce the system to reduced row echelon form; an inconsistent
//!   system yields the no-solution sentinel
//! - express the dependent cuts through the free ones and minimize the
//!   total cut with the simplex backend, keeping every cut between zero
//!   and the contract's value at its payment time
//! - read the free cuts off the optimum and back-substitute the
//!   dependent ones

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::assignment::{DebtCutAssignment, TimeAssignment};
use crate::contract::Contract;
use crate::error::SolveError;
use crate::graph::{ContractId, Graph, NodeId};
use crate::matrix::Matrix;
use crate::simplex::{Constraint, LinearProgram, Relation};
use crate::tolerance::Tolerance;

/// This trait abstracts over the debt-cut computation.
///
/// The default implementation is [`EquilibrialCutFinder`]; alternative
/// strategies can be installed on a graph with
/// [`Graph::set_debt_cut_finder`].
pub trait DebtCutFinder {
    /// Compute the cuts bringing `graph` to equilibrium at
    /// `equilibrium_time`, with each cut applied at its payment time
    /// from `times`.
    fn compute(
        &self,
        graph: &Graph,
        equilibrium_time: f64,
        times: &TimeAssignment,
    ) -> Result<DebtCutAssignment, SolveError>;
}

/// The default two-stage finder: Gauss-Jordan reduction followed by
/// simplex minimization of the total cut.
#[derive(Clone, Copy, Debug)]
pub struct EquilibrialCutFinder {
    tolerance: Tolerance,
}

impl EquilibrialCutFinder {
    pub fn new(tolerance: Tolerance) -> EquilibrialCutFinder {
        EquilibrialCutFinder { tolerance }
    }
}

impl Default for EquilibrialCutFinder {
    fn default() -> Self {
        EquilibrialCutFinder::new(Tolerance::default())
    }
}

impl DebtCutFinder for EquilibrialCutFinder {
    fn compute(
        &self,
        graph: &Graph,
        equilibrium_time: f64,
        times: &TimeAssignment,
    ) -> Result<DebtCutAssignment, SolveError> {
        if !equilibrium_time.is_finite() {
            return Err(SolveError::NonFiniteEquilibriumTime(equilibrium_time));
        }

        let columns = collect_columns(graph, equilibrium_time, times)?;
        let row_of: HashMap<NodeId, usize> = graph
            .nodes()
            .enumerate()
            .map(|(row, (id, _))| (id, row))
            .collect();

        let mut matrix = build_matrix(&columns, &row_of, self.tolerance);
        debug!(
            "equilibrium system: {} nodes x {} contracts",
            row_of.len(),
            columns.len()
        );

        let reduction_start = Instant::now();
        let rank = matrix.reduce();
        let reduction_time = reduction_start.elapsed();

        if !matrix.has_solution()? {
            warn!("the equilibrium system is over-constrained; returning the sentinel");
            let mut sentinel = DebtCutAssignment::no_solution();
            sentinel.record_timings(reduction_time, Duration::ZERO);
            return Ok(sentinel);
        }

        let variables = columns.len();
        let pivots: Vec<usize> = (0..rank)
            .map(|row| {
                (0..variables)
                    .find(|&col| !self.tolerance.is_zero(matrix.get(row, col)))
                    .expect("every reduced row up to the rank has a leading entry")
            })
            .collect();

        let mut lp_index: Vec<Option<usize>> = vec![None; variables];
        let mut free_columns = Vec::with_capacity(variables - rank);
        for col in 0..variables {
            if !pivots.contains(&col) {
                lp_index[col] = Some(free_columns.len());
                free_columns.push(col);
            }
        }
        debug!(
            "rank {}, {} free of {} variables",
            rank,
            free_columns.len(),
            variables
        );

        let program = formulate(&matrix, &columns, &pivots, &lp_index, &free_columns);
        let minimization_start = Instant::now();
        let optimum = program.minimize()?;
        let minimization_time = minimization_start.elapsed();

        let mut cuts = DebtCutAssignment::new(equilibrium_time);
        for (index, &col) in free_columns.iter().enumerate() {
            cuts.put(columns[col].id, optimum.point[index])?;
        }
        for (row, &pivot) in pivots.iter().enumerate() {
            let mut cut = matrix.get(row, variables);
            for col in pivot + 1..variables {
                if let Some(index) = lp_index[col] {
                    cut -= matrix.get(row, col) * optimum.point[index];
                }
            }
            let cut = if self.tolerance.is_zero(cut) {
                0.0
            } else {
                cut.max(0.0)
            };
            cuts.put(columns[pivot].id, cut)?;
        }
        cuts.record_timings(reduction_time, minimization_time);
        Ok(cuts)
    }
}

/// One matrix column: a contract, aligned to its payment time, with the
/// quantities the solver needs about it.
struct Column {
    id: ContractId,
    lender: NodeId,
    debtor: NodeId,
    /// Contract value at the payment time, before any cut.
    pre_cut_value: f64,
    /// Growth from the payment time to the equilibrium time.
    growth: f64,
}

/// Validate the inputs and assemble one column per contract, in node
/// iteration order and per-node outgoing order.
fn collect_columns(
    graph: &Graph,
    equilibrium_time: f64,
    times: &TimeAssignment,
) -> Result<Vec<Column>, SolveError> {
    let mut columns = Vec::with_capacity(graph.contract_count());
    for (_, node) in graph.nodes() {
        for (_, contracts) in node.debtors() {
            for &id in contracts {
                let edge = graph.contract(id)?;
                let payment = times.get(edge.debtor(), id)?;
                if payment < edge.contract().timestamp() {
                    return Err(SolveError::PaymentBeforeOrigin {
                        contract: id,
                        payment,
                        timestamp: edge.contract().timestamp(),
                    });
                }
                if equilibrium_time < payment {
                    return Err(SolveError::EquilibriumPrecedesPayment {
                        contract: id,
                        payment,
                        equilibrium: equilibrium_time,
                    });
                }
                let aligned: Contract = edge.contract().aligned_at(payment);
                let pre_cut_value = aligned.value_at(payment - aligned.timestamp())?;
                let growth = aligned.growth_factor(equilibrium_time - payment)?;
                columns.push(Column {
                    id,
                    lender: edge.lender(),
                    debtor: edge.debtor(),
                    pre_cut_value,
                    growth,
                });
            }
        }
    }
    Ok(columns)
}

/// The augmented equilibrium matrix: one row per node, one column per
/// contract plus the augmentation.
///
/// A cut on a contract, applied at the payment time, relieves the debtor
/// and costs the lender; grown to the equilibrium time it must absorb
/// the node's no-cut equity, which sits in the augmentation column.
fn build_matrix(columns: &[Column], row_of: &HashMap<NodeId, usize>, tolerance: Tolerance) -> Matrix {
    let variables = columns.len();
    let mut matrix = Matrix::zero(row_of.len(), variables + 1, tolerance);
    for (col, column) in columns.iter().enumerate() {
        let lender_row = row_of[&column.lender];
        let debtor_row = row_of[&column.debtor];
        let grown_value = column.pre_cut_value * column.growth;

        matrix.set(lender_row, col, column.growth);
        matrix.set(debtor_row, col, -column.growth);
        matrix.set(
            lender_row,
            variables,
            matrix.get(lender_row, variables) + grown_value,
        );
        matrix.set(
            debtor_row,
            variables,
            matrix.get(debtor_row, variables) - grown_value,
        );
    }
    matrix
}

/// Express the total cut through the free variables and bound every cut
/// by `[0, pre-cut value]`.
fn formulate(
    matrix: &Matrix,
    columns: &[Column],
    pivots: &[usize],
    lp_index: &[Option<usize>],
    free_columns: &[usize],
) -> LinearProgram {
    let variables = columns.len();

    // Substituting each dependent cut through its row folds the row's
    // right-hand side into the constant and its coefficients into the
    // free variables' objective coefficients.
    let mut objective = vec![1.0; free_columns.len()];
    let mut constant = 0.0;
    for (row, &pivot) in pivots.iter().enumerate() {
        constant += matrix.get(row, variables);
        for col in pivot + 1..variables {
            if let Some(index) = lp_index[col] {
                objective[index] -= matrix.get(row, col);
            }
        }
    }

    let mut program = LinearProgram::new(objective, constant);
    for (row, &pivot) in pivots.iter().enumerate() {
        let mut coefficients = vec![0.0; free_columns.len()];
        for col in pivot + 1..variables {
            if let Some(index) = lp_index[col] {
                coefficients[index] = -matrix.get(row, col);
            }
        }
        let rhs = matrix.get(row, variables);
        // 0 <= dependent cut <= value of the pivot contract.
        program.add_constraint(Constraint::new(
            coefficients.clone(),
            Relation::GreaterOrEqual,
            -rhs,
        ));
        program.add_constraint(Constraint::new(
            coefficients,
            Relation::LessOrEqual,
            columns[pivot].pre_cut_value - rhs,
        ));
    }
    for (index, &col) in free_columns.iter().enumerate() {
        let mut coefficients = vec![0.0; free_columns.len()];
        coefficients[index] = 1.0;
        program.add_constraint(Constraint::new(
            coefficients,
            Relation::LessOrEqual,
            columns[col].pre_cut_value,
        ));
    }
    program
}
