use std::env;
use std::fs;
use std::process;
use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;

use csim_cloud::core::config::{NumericParam, SimulationConfig, WorkloadConfig};
use csim_cloud::core::error::SimError;
use csim_cloud::experiment::{run_simulation, Experiment};
use csim_cloud::handshake::agent::{serve, EpsilonGreedy};
use csim_cloud::handshake::FileSlots;
use csim_cloud::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

#[test]
fn test_basic_config() {
    let config = SimulationConfig::from_file(&name_wrapper("basic.yaml")).unwrap();
    assert_eq!(config.seed, 42);
    assert_eq!(config.number_of_hosts(), 2);
    assert_eq!(config.number_of_vms(), 5);
    assert_eq!(config.clock_tick_period, Some(10.));
    assert_eq!(
        config.vms[0].mips,
        NumericParam::Linear {
            start: 1000.,
            step: 100.
        }
    );
    assert_eq!(
        config.workload,
        WorkloadConfig::Linear {
            count: 10,
            base_length: 10000,
            step: 500,
            start_time: 0.
        }
    );

    let mut cloud_sim = CloudSimulation::from_config(&config).unwrap();
    {
        let datacenter = cloud_sim.datacenter();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.hosts()[1].name, "host1");
        let rates: Vec<f64> = datacenter.vms().iter().map(|vm| vm.rate()).collect();
        assert_eq!(rates, vec![1000., 1100., 1200., 1300., 1400.]);
    }
    cloud_sim.run().unwrap();

    let summary = cloud_sim.summary();
    assert_eq!(summary.policy, "FirstFit");
    assert_eq!(summary.processed, 10);
    assert_abs_diff_eq!(summary.makespan, 24.5, epsilon = 1e-9);
    let samples = cloud_sim.monitoring().unwrap().borrow().samples().len();
    assert_eq!(samples, 4);
}

#[test]
fn test_random_hardware_is_reproducible() {
    let config = SimulationConfig::from_file(&name_wrapper("random.yaml")).unwrap();
    let describe = || {
        let cloud_sim = CloudSimulation::from_config(&config).unwrap();
        let datacenter = cloud_sim.datacenter();
        let datacenter = datacenter.borrow();
        let hosts: Vec<(usize, f64, u64)> = datacenter
            .hosts()
            .iter()
            .map(|host| (host.pes().len(), host.mips_total(), host.ram_total()))
            .collect();
        hosts
    };
    let hosts = describe();
    assert_eq!(hosts.len(), 3);
    for (pes, mips, ram) in &hosts {
        assert!((4..=16).contains(pes));
        assert!(*mips >= 1000. * *pes as f64 && *mips <= 5000. * *pes as f64);
        assert!((16384..=65536).contains(ram));
    }
    assert_eq!(describe(), hosts);
}

#[test]
fn test_setup_errors() {
    let mut config = SimulationConfig::from_file(&name_wrapper("basic.yaml")).unwrap();
    config.policy = "Random".to_string();
    assert_eq!(
        CloudSimulation::from_config(&config).err(),
        Some(SimError::UnknownPolicy("Random".to_string()))
    );

    config.policy = "FirstFit".to_string();
    config.vms[0].pes = NumericParam::Value(8);
    assert!(matches!(
        CloudSimulation::from_config(&config).err(),
        Some(SimError::InsufficientCapacity { vm_id: 0, .. })
    ));
}

#[test]
fn test_policy_comparison() {
    let config = SimulationConfig::from_file(&name_wrapper("basic.yaml")).unwrap();
    let experiment = Experiment::new(config, vec!["FirstFit".to_string(), "RoundRobin".to_string()]);
    let results = experiment.run(2).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].policy, "FirstFit");
    assert_eq!(results[1].policy, "RoundRobin");
    for result in &results {
        assert!(result.error.is_none());
        assert_eq!(result.summary.processed, 10);
        assert_eq!(result.metrics.len(), 10);
        assert!(result.handshake.is_none());
    }
    assert_abs_diff_eq!(results[0].summary.makespan, 24.5, epsilon = 1e-9);
    assert_abs_diff_eq!(results[1].summary.makespan, 22.5, epsilon = 1e-9);
    // round robin starts everything at once
    assert_eq!(results[1].summary.avg_wait_time, 0.);
}

#[test]
fn test_external_agent_from_config() {
    let dir = env::temp_dir().join(format!("csim-config-agent-{}", process::id()));
    fs::create_dir_all(&dir).unwrap();
    let mut config = SimulationConfig::from_file(&name_wrapper("agent.yaml")).unwrap();
    config.agent.state_path = dir.join("state.json");
    config.agent.decision_path = dir.join("action.json");

    let slots = FileSlots::new(config.agent.state_path.clone(), config.agent.decision_path.clone());
    let agent = thread::spawn(move || {
        let mut maker = EpsilonGreedy::new(3, 0., 4000, 1);
        serve(&slots, &mut maker, Duration::from_millis(1), Some(4)).unwrap()
    });
    let result = run_simulation(&config).unwrap();
    assert_eq!(agent.join().unwrap(), 4);

    assert!(result.error.is_none());
    assert_eq!(result.summary.processed, 4);
    let mut vms: Vec<(u64, u32)> = result.metrics.iter().map(|m| (m.cloudlet_id, m.vm_id)).collect();
    vms.sort_unstable();
    assert_eq!(vms, vec![(0, 0), (1, 1), (2, 2), (3, 2)]);
    let stats = result.handshake.unwrap();
    assert_eq!(stats.state_writes, 4);
    assert_eq!(stats.decision_reads, 4);
    assert_eq!(stats.abandoned, 0);

    fs::remove_dir_all(dir).unwrap();
}
