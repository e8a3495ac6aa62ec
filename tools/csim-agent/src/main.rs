use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use env_logger::Builder;
use log::info;

use csim_cloud::core::error::SimError;
use csim_cloud::handshake::agent::{serve, DecisionMaker, EpsilonGreedy};
use csim_cloud::handshake::{AgentState, FileSlots};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Reference external agent answering simulator state files with VM decisions
struct Args {
    /// Path to the state file written by the simulator
    #[arg(long, default_value = "state.json")]
    state: PathBuf,

    /// Path to the decision file read by the simulator
    #[arg(long, default_value = "action.json")]
    decision: PathBuf,

    /// Number of VMs to choose from
    #[arg(long)]
    vms: u32,

    /// Probability of choosing a random VM
    #[arg(long, default_value_t = 0.1)]
    epsilon: f64,

    /// Task size mapped onto the last VM
    #[arg(long, default_value_t = 500000)]
    max_task_size: u64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 50)]
    poll_ms: u64,

    /// Stop after this number of decisions (serve forever if not set)
    #[arg(long)]
    limit: Option<u64>,
}

struct LoggingAgent {
    inner: EpsilonGreedy,
}

impl DecisionMaker for LoggingAgent {
    fn decide(&mut self, state: &AgentState) -> i64 {
        let vm_index = self.inner.decide(state);
        info!(
            "cpu_load={:.2} ram_load={:.2} task_size={} -> vm {}",
            state.cpu_load, state.ram_load, state.task_size, vm_index
        );
        vm_index
    }
}

fn main() -> Result<(), SimError> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let slots = FileSlots::new(args.state, args.decision);
    let mut agent = LoggingAgent {
        inner: EpsilonGreedy::new(args.vms, args.epsilon, args.max_task_size, args.seed),
    };
    info!(
        "waiting for states in {} (decisions go to {})",
        slots.state_path().display(),
        slots.decision_path().display()
    );
    let served = serve(&slots, &mut agent, Duration::from_millis(args.poll_ms), args.limit)?;
    info!("served {} decisions", served);
    Ok(())
}
