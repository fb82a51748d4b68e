//! Demo driver: build a random loan graph, compute its equilibrial debt
//! cuts and show the state before and after applying them.
//!
//! Run with `RUST_LOG=debug` to see the solver at work. An optional
//! first argument seeds the random generator.

use anyhow::Result;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use loancut::{Contract, Graph, NodeId, TimeAssignment};

const PARTIES: usize = 6;
const CONTRACTS: usize = 14;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .map(|argument| argument.parse())
        .transpose()?
        .unwrap_or(42);
    let mut rng = StdRng::seed_from_u64(seed);

    info!("building a random loan graph (seed {seed})");
    let (graph, times) = random_graph(&mut rng);
    let equilibrium_time = times.max_time().expect("the graph has contracts") + 5.0;

    println!("{}", graph.describe(equilibrium_time)?);

    let cuts = graph.find_equilibrial_debt_cuts(equilibrium_time, &times)?;
    if cuts.is_no_solution() {
        println!("the equilibrium system is over-constrained; nothing to apply");
        return Ok(());
    }
    info!(
        "matrix reduction took {:?}, minimization took {:?}",
        cuts.reduction_time(),
        cuts.minimization_time()
    );

    for (id, cut) in cuts.iter() {
        let edge = graph.contract(id)?;
        println!("forgive {:>10.6} on `{}`", cut, edge.contract().name());
    }
    println!("total debt forgiven: {:.6}\n", cuts.sum());

    let settled = graph.apply_debt_cuts(&cuts, &times)?;
    println!("{}", settled.describe(equilibrium_time)?);
    Ok(())
}

/// A reproducible random graph with a payment time for every contract.
fn random_graph(rng: &mut StdRng) -> (Graph, TimeAssignment) {
    let mut graph = Graph::new("demo");
    let parties: Vec<NodeId> = (0..PARTIES)
        .map(|index| {
            graph
                .add_node(&format!("party-{index}"))
                .expect("party names are unique")
        })
        .collect();

    let mut placed = Vec::new();
    for index in 0..CONTRACTS {
        let lender = parties[rng.gen_range(0..parties.len())];
        let debtor = loop {
            let candidate = parties[rng.gen_range(0..parties.len())];
            if candidate != lender {
                break candidate;
            }
        };
        let name = format!("loan-{index}");
        let principal = rng.gen_range(1.0..25.0);
        let rate = rng.gen_range(0.01..0.1);
        let timestamp = rng.gen_range(0.0..3.0);
        let contract = if rng.gen_bool(0.5) {
            let periods = rng.gen_range(1..=12) as f64;
            Contract::periodic(&name, principal, rate, periods, timestamp)
                .expect("generated attributes are valid")
        } else {
            Contract::continuous(&name, principal, rate, timestamp)
                .expect("generated attributes are valid")
        };
        let id = graph
            .add_debtor(lender, debtor, contract)
            .expect("lender and debtor are distinct parties of this graph");
        placed.push((debtor, id));
    }

    let mut times = TimeAssignment::new();
    let horizon = graph.max_timestamp().expect("contracts were added");
    for (debtor, id) in placed {
        times
            .put(debtor, id, horizon + rng.gen_range(0.5..2.5))
            .expect("payment times are finite");
    }
    (graph, times)
}
