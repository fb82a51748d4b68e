//! Equilibrial debt cuts on graphs of loan contracts.
//!
//! Parties are nodes of a directed multigraph; every edge is a loan
//! contract growing with time. Given a payment time for each contract
//! and a future equilibrium time, the solver computes how much principal
//! to forgive on each contract so that every party's net position is
//! zero at the equilibrium time, forgiving as little as possible in
//! total.
//!
//! # Example
//!
//! ```
//! use loancut::{Contract, Graph, TimeAssignment};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = Graph::new("pair");
//! let u = graph.add_node("u")?;
//! let v = graph.add_node("v")?;
//! let uv = graph.add_debtor(u, v, Contract::continuous("u->v", 1.0, 0.1, 0.0)?)?;
//! let vu = graph.add_debtor(v, u, Contract::continuous("v->u", 1.0, 0.1, 0.0)?)?;
//!
//! let mut times = TimeAssignment::new();
//! times.put(v, uv, 1.0)?;
//! times.put(u, vu, 1.0)?;
//!
//! let cuts = graph.find_equilibrial_debt_cuts(2.0, &times)?;
//! let settled = graph.apply_debt_cuts(&cuts, &times)?;
//! assert!(settled.is_in_equilibrium_at(2.0)?);
//! # Ok(())
//! # }
//! ```

pub mod assignment;
pub mod contract;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod simplex;
pub mod solver;
pub mod tolerance;

pub use assignment::{DebtCutAssignment, TimeAssignment};
pub use contract::{Compounding, Contract, ContractBuilder};
pub use error::{
    AssignmentError, ContractError, GraphError, MatrixError, SimplexError, SolveError,
};
pub use graph::{ContractId, Edge, Graph, Node, NodeId};
pub use solver::{DebtCutFinder, EquilibrialCutFinder};
pub use tolerance::{default_tolerance, set_default_tolerance, Tolerance};
