//! batmesh - B.A.T.M.A.N.-style mesh routing simulator
//!
//! Scripted scenarios, a topology visualizer, and an interactive console,
//! all driving the simulation core through its command/query surface.

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use batmesh_simulation::{Address, NetworkBuilder, Node, persist, scenarios};

#[derive(Parser)]
#[command(
    name = "batmesh",
    about = "Discrete-time simulation of a B.A.T.M.A.N.-style mesh routing protocol",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two-node advert convergence
    Pair,

    /// Unicast relay across a three-node chain
    Chain,

    /// Route poisoning through a spoofed originator
    Spoof,

    /// Random node/link churn
    Churn {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,
    },

    /// Build and print a topology
    Topology {
        /// Shape: line, ring, star, full, random
        #[arg(short, long, default_value = "ring")]
        shape: String,

        /// Number of nodes (max 254)
        #[arg(short, long, default_value = "6")]
        nodes: usize,

        /// Link probability for random topologies
        #[arg(short, long, default_value = "0.4")]
        connection_prob: f64,
    },

    /// Interactive simulation console
    Interactive {
        /// Number of pre-wired nodes
        #[arg(short, long, default_value = "4")]
        nodes: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Pair => {
            scenarios::run_pair_scenario();
        }
        Commands::Chain => {
            scenarios::run_chain_scenario();
        }
        Commands::Spoof => {
            scenarios::run_spoof_scenario();
        }
        Commands::Churn { ticks } => {
            scenarios::run_churn_scenario(ticks);
        }
        Commands::Topology {
            shape,
            nodes,
            connection_prob,
        } => {
            let net = match shape.as_str() {
                "line" => NetworkBuilder::new(nodes).line(),
                "ring" => NetworkBuilder::new(nodes).ring(),
                "star" => NetworkBuilder::new(nodes).star(),
                "full" => NetworkBuilder::new(nodes).full_mesh(),
                "random" => NetworkBuilder::new(nodes).random(connection_prob),
                other => {
                    eprintln!("unknown shape: {other}, using ring");
                    NetworkBuilder::new(nodes).ring()
                }
            };
            println!("{}", net.report_topology());
        }
        Commands::Interactive { nodes } => {
            run_interactive(nodes)?;
        }
    }

    Ok(())
}

fn run_interactive(nodes: usize) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let mut net = NetworkBuilder::new(nodes).ring();
    println!("{}", net.report_topology());

    println!("Interactive mode. Commands:");
    println!("  add <addr> <interval> [oneway] [spoof <addr>]  - register a node");
    println!("  remove <addr>                - unregister a node");
    println!("  link <addr> <neighbor>       - declare a one-direction neighbor");
    println!("  unlink <addr> <neighbor>     - drop a neighbor");
    println!("  send <from> <to> <ttl> <msg> - queue a unicast");
    println!("  step [n]                     - advance n ticks (default 1)");
    println!("  net                          - network report");
    println!("  node <addr>                  - node report");
    println!("  topo                         - declared links");
    println!("  events                       - recent events");
    println!("  save <file> / load <file>    - persist or restore the network");
    println!("  quit                         - exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.trim().split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "add" => match parse_add(&parts) {
                Some(node) => {
                    let address = node.address();
                    if net.add_node(node) {
                        println!("  added {address}");
                    } else {
                        println!("  {address} already registered");
                    }
                }
                None => println!("  usage: add <addr> <interval> [oneway] [spoof <addr>]"),
            },
            "remove" => {
                if let Some(address) = parse_addr(parts.get(1)) {
                    if net.remove_node(address) {
                        println!("  removed {address}");
                    } else {
                        println!("  {address} not registered");
                    }
                }
            }
            "link" | "unlink" => {
                let (Some(a), Some(b)) = (parse_addr(parts.get(1)), parse_addr(parts.get(2)))
                else {
                    println!("  usage: {} <addr> <neighbor>", parts[0]);
                    continue;
                };
                let ok = if parts[0] == "link" {
                    net.add_link(a, b)
                } else {
                    net.remove_link(a, b)
                };
                println!("  {}", if ok { "ok" } else { "no change" });
            }
            "send" => {
                let (Some(from), Some(to), Some(ttl)) = (
                    parse_addr(parts.get(1)),
                    parse_addr(parts.get(2)),
                    parts.get(3).and_then(|s| s.parse::<i64>().ok()),
                ) else {
                    println!("  usage: send <from> <to> <ttl> <message>");
                    continue;
                };
                let data = parts[4..].join(" ").into_bytes();
                if net.send_message(from, to, ttl, data) {
                    println!("  queued {from} -> {to}");
                } else {
                    println!("  dropped: {to} unreachable from {from}");
                }
            }
            "step" => {
                let n: u64 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                net.tick(n);
                println!("  advanced {n} tick(s), now at {}", net.clock());
            }
            "net" => print!("{}", net.report()),
            "node" => {
                if let Some(address) = parse_addr(parts.get(1)) {
                    match net.report_node(address) {
                        Some(report) => print!("{report}"),
                        None => println!("  {address} not registered"),
                    }
                }
            }
            "topo" => print!("{}", net.report_topology()),
            "events" => {
                for event in net.events().iter().rev().take(20) {
                    println!("  {event:?}");
                }
            }
            "save" => {
                if let Some(path) = parts.get(1) {
                    match persist::save(&net, path) {
                        Ok(()) => println!("  saved to {path}"),
                        Err(err) => println!("  save failed: {err}"),
                    }
                }
            }
            "load" => {
                if let Some(path) = parts.get(1) {
                    match persist::load(path) {
                        Ok(restored) => {
                            net = restored;
                            println!("  loaded {path}, at tick {}", net.clock());
                        }
                        Err(err) => println!("  load failed: {err}"),
                    }
                }
            }
            "quit" | "exit" | "q" => break,
            other => println!("  unknown command: {other}"),
        }
    }

    Ok(())
}

fn parse_addr(part: Option<&&str>) -> Option<Address> {
    match part?.parse() {
        Ok(address) => Some(address),
        Err(err) => {
            println!("  {err}");
            None
        }
    }
}

fn parse_add(parts: &[&str]) -> Option<Node> {
    let address: Address = parts.get(1)?.parse().ok()?;
    let interval: u64 = parts.get(2)?.parse().ok()?;
    let directional = parts.contains(&"oneway");
    let mut node = Node::new(address, interval, directional);
    if let Some(pos) = parts.iter().position(|p| *p == "spoof") {
        let spoof: Address = parts.get(pos + 1)?.parse().ok()?;
        node = node.with_spoof(spoof);
    }
    Some(node)
}
