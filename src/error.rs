//! Error types, one enum per concern.

use thiserror::Error;

use crate::graph::{ContractId, NodeId};

/// Invalid contract attributes or evaluation arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error("invalid duration `{0}`: durations must be finite and non-negative")]
    InvalidDuration(f64),

    #[error("invalid principal `{0}`: the principal must be finite and non-negative")]
    InvalidPrincipal(f64),

    #[error("invalid interest rate `{0}`: the rate must be finite and non-negative")]
    InvalidInterestRate(f64),

    #[error(
        "invalid compounding periods `{0}`: must be strictly positive \
         (use a continuous contract for infinitely many periods)"
    )]
    InvalidCompoundingPeriods(f64),

    #[error("invalid timestamp `{0}`: timestamps must be finite")]
    InvalidTimestamp(f64),

    #[error("debt cut `{cut}` is invalid for a contract worth `{value}` at the cut moment")]
    InvalidCut { cut: f64, value: f64 },
}

/// Structural errors on the contract graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("a node named `{0}` already exists in this graph")]
    DuplicateNode(String),

    #[error("{0} does not belong to this graph")]
    UnknownNode(NodeId),

    #[error("{0} does not belong to this graph")]
    UnknownContract(ContractId),

    #[error("a node cannot extend a loan to itself")]
    SelfLoop,

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Errors on the payment-time and debt-cut mappings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssignmentError {
    #[error("payment time `{0}` must be finite")]
    NonFiniteTime(f64),

    #[error("no payment time has been assigned to {contract} received by {node}")]
    MissingPaymentTime { node: NodeId, contract: ContractId },

    #[error("debt cut `{0}` must be finite and non-negative")]
    InvalidCut(f64),

    #[error("no debt cut has been assigned to {0}")]
    MissingCut(ContractId),
}

/// Misuse of the row-reduction engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("row factor `{0}` must be finite")]
    NonFiniteFactor(f64),

    #[error("the matrix must be reduced before probing it for solutions")]
    NotReduced,
}

/// Terminal outcomes of the simplex backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplexError {
    #[error("the linear program has no feasible point")]
    Infeasible,

    #[error("the objective is unbounded below on the feasible region")]
    Unbounded,

    #[error("constraint {index} has {found} coefficients, expected {expected}")]
    DimensionMismatch {
        index: usize,
        found: usize,
        expected: usize,
    },
}

/// Anything that can abort a debt-cut computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("equilibrium time `{0}` must be finite")]
    NonFiniteEquilibriumTime(f64),

    #[error("equilibrium time `{equilibrium}` precedes the payment time `{payment}` of {contract}")]
    EquilibriumPrecedesPayment {
        contract: ContractId,
        payment: f64,
        equilibrium: f64,
    },

    #[error("payment time `{payment}` of {contract} precedes the contract origin `{timestamp}`")]
    PaymentBeforeOrigin {
        contract: ContractId,
        payment: f64,
        timestamp: f64,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Simplex(#[from] SimplexError),
}
