//! The directed multigraph of parties and loan contracts.
//!
//! Nodes and contracts live in arenas owned by the graph and are
//! addressed by [`NodeId`] and [`ContractId`]. Parallel edges are
//! ordinary: a lender may hold any number of contracts against the same
//! debtor. Removal leaves tombstones so ids stay stable.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fmt::Write as _;

use log::debug;

use crate::assignment::{DebtCutAssignment, TimeAssignment};
use crate::contract::Contract;
use crate::error::{GraphError, SolveError};
use crate::solver::{DebtCutFinder, EquilibrialCutFinder};
use crate::tolerance::Tolerance;

/// Index of a node in its graph's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// Index of a contract in its graph's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContractId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "contract #{}", self.0)
    }
}

/// A named party.
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    out: BTreeMap<NodeId, Vec<ContractId>>,
    inc: BTreeMap<NodeId, Vec<ContractId>>,
    max_timestamp: Option<f64>,
}

impl Node {
    fn new(name: &str) -> Node {
        Node {
            name: name.to_string(),
            out: BTreeMap::new(),
            inc: BTreeMap::new(),
            max_timestamp: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The debtors this node lends to, with the contracts extended to
    /// each, in insertion order per debtor.
    pub fn debtors(&self) -> impl Iterator<Item = (NodeId, &[ContractId])> {
        self.out.iter().map(|(&id, list)| (id, list.as_slice()))
    }

    /// The lenders this node borrows from.
    pub fn lenders(&self) -> impl Iterator<Item = (NodeId, &[ContractId])> {
        self.inc.iter().map(|(&id, list)| (id, list.as_slice()))
    }

    /// The latest origin timestamp among contracts ever attached here.
    pub fn max_timestamp(&self) -> Option<f64> {
        self.max_timestamp
    }

    fn saw_timestamp(&mut self, timestamp: f64) {
        self.max_timestamp = Some(self.max_timestamp.map_or(timestamp, |max| max.max(timestamp)));
    }
}

/// A contract placed between two nodes.
#[derive(Clone, Debug)]
pub struct Edge {
    lender: NodeId,
    debtor: NodeId,
    contract: Contract,
}

impl Edge {
    pub fn lender(&self) -> NodeId {
        self.lender
    }

    pub fn debtor(&self) -> NodeId {
        self.debtor
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }
}

/// A named container of nodes and the contracts between them.
pub struct Graph {
    name: String,
    tolerance: Tolerance,
    nodes: Vec<Option<Node>>,
    ids: HashMap<String, NodeId>,
    edges: Vec<Option<Edge>>,
    edge_count: usize,
    contract_count: usize,
    max_timestamp: Option<f64>,
    finder: Box<dyn DebtCutFinder>,
}

impl Graph {
    /// An empty graph with the process-default tolerance.
    pub fn new(name: &str) -> Graph {
        Graph::with_tolerance(name, Tolerance::default())
    }

    pub fn with_tolerance(name: &str, tolerance: Tolerance) -> Graph {
        Graph {
            name: name.to_string(),
            tolerance,
            nodes: Vec::new(),
            ids: HashMap::new(),
            edges: Vec::new(),
            edge_count: 0,
            contract_count: 0,
            max_timestamp: None,
            finder: Box::new(EquilibrialCutFinder::new(tolerance)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Add a party. Names are unique within a graph.
    pub fn add_node(&mut self, name: &str) -> Result<NodeId, GraphError> {
        if self.ids.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(name)));
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Extend `contract` from `lender` to `debtor`.
    ///
    /// The contract is appended to the lender's outgoing sequence for
    /// that debtor and mirrored into the debtor's incoming view; the two
    /// always stay in lockstep.
    pub fn add_debtor(
        &mut self,
        lender: NodeId,
        debtor: NodeId,
        contract: Contract,
    ) -> Result<ContractId, GraphError> {
        if lender == debtor {
            return Err(GraphError::SelfLoop);
        }
        self.node(lender)?;
        self.node(debtor)?;

        let id = ContractId(self.edges.len());
        let timestamp = contract.timestamp();
        self.edges.push(Some(Edge {
            lender,
            debtor,
            contract,
        }));

        let lender_node = self.node_mut(lender)?;
        let pair_is_new = !lender_node.out.contains_key(&debtor);
        lender_node.out.entry(debtor).or_default().push(id);
        lender_node.saw_timestamp(timestamp);

        let debtor_node = self.node_mut(debtor)?;
        debtor_node.inc.entry(lender).or_default().push(id);
        debtor_node.saw_timestamp(timestamp);

        if pair_is_new {
            self.edge_count += 1;
        }
        self.contract_count += 1;
        self.max_timestamp =
            Some(self.max_timestamp.map_or(timestamp, |max| max.max(timestamp)));
        Ok(id)
    }

    /// Detach every contract incident to `id`, leaving the node in place.
    pub fn clear_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        let out = std::mem::take(&mut node.out);
        let inc = std::mem::take(&mut node.inc);

        for (debtor, contracts) in out {
            self.edge_count -= 1;
            self.contract_count -= contracts.len();
            for contract in contracts {
                self.edges[contract.0] = None;
            }
            if let Some(debtor_node) = self.nodes[debtor.0].as_mut() {
                debtor_node.inc.remove(&id);
            }
        }
        for (lender, contracts) in inc {
            self.edge_count -= 1;
            self.contract_count -= contracts.len();
            for contract in contracts {
                self.edges[contract.0] = None;
            }
            if let Some(lender_node) = self.nodes[lender.0].as_mut() {
                lender_node.out.remove(&id);
            }
        }
        Ok(())
    }

    /// Remove a node and all its incident contracts.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.clear_node(id)?;
        let node = self.nodes[id.0].take().expect("clear_node checked the slot");
        self.ids.remove(&node.name);
        Ok(())
    }

    /// Live nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|node| (NodeId(index), node)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Live contracts in arena order.
    pub fn contracts(&self) -> impl Iterator<Item = (ContractId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|edge| (ContractId(index), edge)))
    }

    pub fn contract(&self, id: ContractId) -> Result<&Edge, GraphError> {
        self.edges
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownContract(id))
    }

    /// Number of ordered (lender, debtor) pairs joined by at least one
    /// contract.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Total number of contracts.
    pub fn contract_count(&self) -> usize {
        self.contract_count
    }

    /// The latest contract origin ever added to this graph.
    pub fn max_timestamp(&self) -> Option<f64> {
        self.max_timestamp
    }

    /// The net position of a node at `time`: outgoing contract values
    /// minus incoming contract values.
    pub fn equity(&self, id: NodeId, time: f64) -> Result<f64, GraphError> {
        let node = self.node(id)?;
        let mut equity = 0.0;
        for (_, contracts) in node.debtors() {
            for &contract in contracts {
                let edge = self.contract(contract)?;
                equity += edge.contract.value_at(time - edge.contract.timestamp())?;
            }
        }
        for (_, contracts) in node.lenders() {
            for &contract in contracts {
                let edge = self.contract(contract)?;
                equity -= edge.contract.value_at(time - edge.contract.timestamp())?;
            }
        }
        Ok(equity)
    }

    /// Is every node's equity within tolerance of zero at `time`?
    pub fn is_in_equilibrium_at(&self, time: f64) -> Result<bool, GraphError> {
        for (id, _) in self.nodes() {
            if !self.tolerance.is_zero(self.equity(id, time)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The largest equity magnitude over all nodes at `time`.
    pub fn max_equity(&self, time: f64) -> Result<f64, GraphError> {
        let mut max = 0.0f64;
        for (id, _) in self.nodes() {
            max = max.max(self.equity(id, time)?.abs());
        }
        Ok(max)
    }

    /// The total value flowing along contracts at `time`: the sum of all
    /// outgoing contract values over all nodes.
    pub fn total_flow_at(&self, time: f64) -> Result<f64, GraphError> {
        let mut flow = 0.0;
        for (_, edge) in self.contracts() {
            flow += edge.contract.value_at(time - edge.contract.timestamp())?;
        }
        Ok(flow)
    }

    /// A human-readable report of the graph state at `time`.
    pub fn describe(&self, time: f64) -> Result<String, GraphError> {
        let mut report = String::new();
        let _ = writeln!(report, "graph `{}` at time {:.4}:", self.name, time);
        for (id, node) in self.nodes() {
            let _ = writeln!(
                report,
                "  {:<12} equity {:>12.6}",
                node.name(),
                self.equity(id, time)?
            );
        }
        let _ = writeln!(
            report,
            "  nodes: {}, linked pairs: {}, contracts: {}",
            self.node_count(),
            self.edge_count,
            self.contract_count
        );
        let _ = writeln!(
            report,
            "  total flow: {:.6}, max |equity|: {:.6}, in equilibrium: {}",
            self.total_flow_at(time)?,
            self.max_equity(time)?,
            self.is_in_equilibrium_at(time)?
        );
        Ok(report)
    }

    /// Replace the solver used by [`Graph::find_equilibrial_debt_cuts`].
    pub fn set_debt_cut_finder(&mut self, finder: Box<dyn DebtCutFinder>) {
        self.finder = finder;
    }

    /// Compute the debt cuts that bring this graph to equilibrium at
    /// `equilibrium_time`, delegating to the installed finder.
    pub fn find_equilibrial_debt_cuts(
        &self,
        equilibrium_time: f64,
        times: &TimeAssignment,
    ) -> Result<DebtCutAssignment, SolveError> {
        self.finder.compute(self, equilibrium_time, times)
    }

    /// A new graph in which every contract present in `cuts` is replaced
    /// by its settled version: origin moved to the payment time and
    /// principal reduced by the forgiven amount. Contracts absent from
    /// `cuts` are not copied.
    pub fn apply_debt_cuts(
        &self,
        cuts: &DebtCutAssignment,
        times: &TimeAssignment,
    ) -> Result<Graph, SolveError> {
        let mut settled = Graph::with_tolerance(&self.name, self.tolerance);
        let mut mapping = HashMap::new();
        for (id, node) in self.nodes() {
            let new_id = settled.add_node(node.name())?;
            mapping.insert(id, new_id);
        }
        for (id, edge) in self.contracts() {
            if !cuts.contains(id) {
                continue;
            }
            let payment = times.get(edge.debtor, id)?;
            let aligned = edge.contract.aligned_at(payment);
            let settled_contract = aligned.apply_debt_cut(cuts.get(id)?, payment)?;
            settled.add_debtor(mapping[&edge.lender], mapping[&edge.debtor], settled_contract)?;
        }
        debug!(
            "settled {} of {} contracts into `{}`",
            settled.contract_count(),
            self.contract_count(),
            settled.name
        );
        Ok(settled)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.node_count())
            .field("linked_pairs", &self.edge_count)
            .field("contracts", &self.contract_count)
            .finish()
    }
}
