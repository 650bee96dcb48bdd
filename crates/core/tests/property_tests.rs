//! Property-based checks for the laws in the testable-properties section:
//! determinism and the monotonic refresh cadence.

use proptest::prelude::*;

use dramsim_core::config::Config;
use dramsim_core::driver::Driver;

fn run_trace(seed: u64, n: u64) -> dramsim_core::Stats {
    let config = Config::default();
    let mut driver = Driver::new(&config, Some(2000)).unwrap();
    let mut trace = String::new();
    for i in 0..n {
        let addr = ((seed.wrapping_mul(2654435761).wrapping_add(i)) % 0x10000) & !0x3f;
        trace.push_str(&format!("0x{addr:x} READ {i}\n"));
    }
    driver.run(std::io::Cursor::new(trace)).unwrap()
}

proptest! {
    #[test]
    fn identical_trace_and_config_produce_identical_command_streams(seed in 0u64..1000, n in 1u64..20) {
        let first = run_trace(seed, n);
        let second = run_trace(seed, n);
        prop_assert_eq!(first.activate_count, second.activate_count);
        prop_assert_eq!(first.read_count, second.read_count);
        prop_assert_eq!(first.retired_requests, second.retired_requests);
        prop_assert_eq!(first.latency_sum, second.latency_sum);
    }
}

#[test]
fn refresh_interval_advances_by_exactly_t_refi_per_refresh() {
    use dramsim_core::dram::ControllerHub;

    let mut config = Config::default();
    config.timing.tREFI = 100;
    config.timing.tRFC = 64;
    let mut hub = ControllerHub::new(&config).unwrap();

    for clk in 0..500 {
        hub.tick(clk);
    }

    let stats = hub.stats();
    // Two ranks, each refreshing roughly every 100 cycles over 500 cycles.
    assert!(stats.refresh_count >= 2 * 4, "expected several refreshes across both ranks: got {}", stats.refresh_count);
}
