use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use env_logger::Builder;
use log::warn;

use csim_cloud::core::config::{parse_config_value, SimulationConfig};
use csim_cloud::core::error::SimError;
use csim_cloud::core::metrics::{write_csv, CloudletMetrics, RunSummary};
use csim_cloud::experiment::{Experiment, RunResult};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Runs cloudlet scheduling simulation
struct Args {
    /// Path to YAML file with simulation configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Scheduling policy overriding the one from config, can be repeated to compare policies
    #[arg(short, long)]
    policy: Vec<String>,

    /// Compare the configured policy with FirstFit and RoundRobin baselines
    #[arg(long)]
    compare: bool,

    /// Random seed overriding the one from config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print per-cloudlet results table
    #[arg(long)]
    table: bool,

    /// Path to produced CSV file with per-cloudlet metrics (policy name is appended when several policies run)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of threads to use (default - use all available cores)
    #[arg(short, long, default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get()))]
    threads: usize,
}

fn main() -> Result<(), SimError> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let mut config = SimulationConfig::from_file(&args.config.to_string_lossy())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut policies = if args.policy.is_empty() {
        vec![config.policy.clone()]
    } else {
        args.policy.clone()
    };
    if args.compare {
        for baseline in ["FirstFit", "RoundRobin"] {
            if !policies.iter().any(|p| parse_config_value(p).0 == baseline) {
                policies.push(baseline.to_string());
            }
        }
    }

    let results = Experiment::new(config, policies).run(args.threads)?;
    for result in &results {
        if args.table {
            print_table(result);
        }
        print_summary(&result.summary);
        if let Some(stats) = &result.handshake {
            println!(
                "Agent handshakes: {} states written, {} decisions read, {} abandoned",
                stats.state_writes, stats.decision_reads, stats.abandoned
            );
        }
        if let Some(err) = &result.error {
            warn!("run with {} aborted: {}", result.policy, err);
        }
    }
    if results.len() > 1 {
        print_comparison(&results);
    }

    if let Some(output) = &args.output {
        for result in &results {
            let path = if results.len() > 1 {
                policy_output_path(output, &result.policy)
            } else {
                output.clone()
            };
            write_csv(&result.metrics, File::create(&path)?)?;
            println!("Metrics for {} saved to {}", result.policy, path.display());
        }
    }

    match results.into_iter().find_map(|result| result.error) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn policy_output_path(output: &Path, policy: &str) -> PathBuf {
    let stem = output.file_stem().map_or("metrics".into(), |s| s.to_string_lossy());
    let (policy_name, _) = parse_config_value(policy);
    output.with_file_name(format!("{}-{}.csv", stem, policy_name))
}

fn print_table(result: &RunResult) {
    println!("\n{:=^88}", format!(" {} ", result.policy));
    println!(
        "{:>8} {:>4} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Cloudlet", "VM", "Length", "Arrival", "Start", "Finish", "Exec", "Wait", "Cost"
    );
    let mut metrics: Vec<&CloudletMetrics> = result.metrics.iter().collect();
    metrics.sort_by_key(|m| m.cloudlet_id);
    for m in metrics {
        println!(
            "{:>8} {:>4} {:>8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.4}",
            m.cloudlet_id,
            m.vm_id,
            m.length,
            m.arrival_time,
            m.start_time,
            m.finish_time,
            m.execution_time,
            m.wait_time,
            m.cost
        );
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n===== {} =====", summary.policy);
    println!("Tasks processed: {}/{}", summary.processed, summary.submitted);
    println!("Avg turnaround time: {:.2} s", summary.avg_turnaround_time);
    println!("Avg wait time: {:.2} s", summary.avg_wait_time);
    println!("Makespan: {:.2} s", summary.makespan);
    println!("Total cost: ${:.4}", summary.total_cost);
}

fn print_comparison(results: &[RunResult]) {
    println!("\n{:<40} {:>10} {:>12} {:>10} {:>10}", "Policy", "Processed", "Turnaround", "Wait", "Cost");
    for result in results {
        let summary = &result.summary;
        println!(
            "{:<40} {:>10} {:>12.2} {:>10.2} {:>10.4}",
            summary.policy, summary.processed, summary.avg_turnaround_time, summary.avg_wait_time, summary.total_cost
        );
    }
}
