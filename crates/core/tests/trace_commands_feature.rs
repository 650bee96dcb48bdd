//! Exercises the `trace-commands` feature's tracing output path. Only
//! compiled when the feature is enabled (`cargo test --features trace-commands`).

#![cfg(feature = "trace-commands")]

use dramsim_core::config::Config;
use dramsim_core::dram::ControllerHub;

#[test]
fn issuing_a_command_emits_a_trace_event() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let config = Config::default();
    let mut hub = ControllerHub::new(&config).unwrap();
    let _ = hub.submit(0, 0x40, false);
    for clk in 0..10 {
        hub.tick(clk);
    }
    // No panics and an activation happened; the tracing event itself is
    // asserted indirectly since capturing TestWriter output needs a custom
    // subscriber layer, out of scope for this smoke test.
    assert!(hub.stats().activate_count >= 1);
}
