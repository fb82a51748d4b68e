//! The two mappings that bracket a solver run: payment times in, debt
//! cuts out.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::AssignmentError;
use crate::graph::{ContractId, NodeId};

/// When each contract's cut is applied, keyed by the receiving (debtor)
/// node and the contract.
#[derive(Clone, Debug, Default)]
pub struct TimeAssignment {
    times: BTreeMap<(NodeId, ContractId), f64>,
    max_time: Option<f64>,
}

impl TimeAssignment {
    pub fn new() -> TimeAssignment {
        TimeAssignment::default()
    }

    /// Record the payment time of `contract` as received by `node`.
    pub fn put(
        &mut self,
        node: NodeId,
        contract: ContractId,
        time: f64,
    ) -> Result<(), AssignmentError> {
        if !time.is_finite() {
            return Err(AssignmentError::NonFiniteTime(time));
        }
        self.times.insert((node, contract), time);
        self.max_time = Some(self.max_time.map_or(time, |max| max.max(time)));
        Ok(())
    }

    pub fn get(&self, node: NodeId, contract: ContractId) -> Result<f64, AssignmentError> {
        self.times
            .get(&(node, contract))
            .copied()
            .ok_or(AssignmentError::MissingPaymentTime { node, contract })
    }

    /// The latest payment time recorded so far.
    pub fn max_time(&self) -> Option<f64> {
        self.max_time
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// The solver's output: how much principal to forgive on each contract
/// so the graph reaches equilibrium at `equilibrium_time`.
///
/// A failed run is represented by the *no-solution sentinel*: an empty
/// assignment whose equilibrium time is negative infinity.
#[derive(Clone, Debug)]
pub struct DebtCutAssignment {
    cuts: BTreeMap<ContractId, f64>,
    equilibrium_time: f64,
    sum: f64,
    reduction_time: Duration,
    minimization_time: Duration,
}

impl DebtCutAssignment {
    pub fn new(equilibrium_time: f64) -> DebtCutAssignment {
        DebtCutAssignment {
            cuts: BTreeMap::new(),
            equilibrium_time,
            sum: 0.0,
            reduction_time: Duration::ZERO,
            minimization_time: Duration::ZERO,
        }
    }

    /// The sentinel returned when the equilibrium system is inconsistent.
    pub fn no_solution() -> DebtCutAssignment {
        DebtCutAssignment::new(f64::NEG_INFINITY)
    }

    pub fn is_no_solution(&self) -> bool {
        self.equilibrium_time == f64::NEG_INFINITY
    }

    /// Record the amount forgiven on `contract`.
    pub fn put(&mut self, contract: ContractId, cut: f64) -> Result<(), AssignmentError> {
        if !cut.is_finite() || cut < 0.0 {
            return Err(AssignmentError::InvalidCut(cut));
        }
        if let Some(previous) = self.cuts.insert(contract, cut) {
            self.sum -= previous;
        }
        self.sum += cut;
        Ok(())
    }

    pub fn get(&self, contract: ContractId) -> Result<f64, AssignmentError> {
        self.cuts
            .get(&contract)
            .copied()
            .ok_or(AssignmentError::MissingCut(contract))
    }

    pub fn contains(&self, contract: ContractId) -> bool {
        self.cuts.contains_key(&contract)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContractId, f64)> + '_ {
        self.cuts.iter().map(|(&contract, &cut)| (contract, cut))
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// The total amount forgiven across all contracts.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn equilibrium_time(&self) -> f64 {
        self.equilibrium_time
    }

    /// Wall-clock time spent reducing the equilibrium matrix.
    pub fn reduction_time(&self) -> Duration {
        self.reduction_time
    }

    /// Wall-clock time spent in the simplex backend.
    pub fn minimization_time(&self) -> Duration {
        self.minimization_time
    }

    pub(crate) fn record_timings(&mut self, reduction: Duration, minimization: Duration) {
        self.reduction_time = reduction;
        self.minimization_time = minimization;
    }
}
