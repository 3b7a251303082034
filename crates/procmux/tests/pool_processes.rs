//! End-to-end scheduling of real shell children through the router.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use procmux::{ChildCommand, ChildProcess, MessageRouter, PoolError, ProcessPool, RouterError};
use procmux_protocol::JsonCodec;
use rstest::rstest;

type Outputs = Arc<Mutex<Vec<String>>>;

fn shell_job(label: &str, script: &str, outputs: &Outputs) -> ChildProcess {
    let echoes = Arc::clone(outputs);
    let messages = Arc::clone(outputs);
    let router = MessageRouter::with_codec(JsonCodec)
        .on_echo(move |text| {
            if let Ok(mut seen) = echoes.lock() {
                seen.push(format!("echo {text}"));
            }
        })
        .on_message(move |value| {
            if let Ok(mut seen) = messages.lock() {
                seen.push(format!("message {value}"));
            }
        });
    ChildProcess::new(ChildCommand::new("sh").arg("-c").arg(script))
        .with_label(label)
        .with_sink(router)
}

fn collected(outputs: &Outputs) -> Vec<String> {
    let mut seen = outputs.lock().map(|seen| seen.clone()).unwrap_or_default();
    seen.sort();
    seen
}

#[rstest]
#[case::one_slot(1)]
#[case::three_slots(3)]
fn pool_routes_every_child_message(#[case] concurrency: usize) {
    let outputs = Outputs::default();
    let jobs: Vec<ChildProcess> = (0..4)
        .map(|index| {
            let script = format!(
                r#"printf '{{"type":"echo","payload":"job {index}"}}\n{{"type":"application","payload":{index}}}\n'"#
            );
            shell_job(&format!("job-{index}"), &script, &outputs)
        })
        .collect();

    let mut pool = ProcessPool::new(jobs.into_iter());
    pool.set_concurrency(concurrency).expect("valid concurrency");
    pool.set_poll_interval(Duration::from_millis(10));
    pool.run().expect("pool runs to completion");

    assert_eq!(
        collected(&outputs),
        vec![
            "echo job 0",
            "echo job 1",
            "echo job 2",
            "echo job 3",
            "message 0",
            "message 1",
            "message 2",
            "message 3",
        ]
    );
}

#[test]
fn malformed_child_output_stops_the_pool_with_a_router_error() {
    let outputs = Outputs::default();
    let jobs = vec![shell_job("noisy", "echo 'not a message'", &outputs)];

    let mut pool = ProcessPool::new(jobs.into_iter());
    pool.set_poll_interval(Duration::from_millis(10));
    let error = pool.run().expect_err("decoding failure");

    assert!(matches!(error, PoolError::Process { slot: 0, .. }));
    assert!(matches!(
        error.router_error(),
        Some(RouterError::Decoding { label, line, .. })
            if label == "noisy" && line == "not a message"
    ));
}

#[test]
fn stopping_the_pool_terminates_long_running_children() {
    let outputs = Outputs::default();
    let jobs: Vec<ChildProcess> = (0..2)
        .map(|index| shell_job(&format!("sleeper-{index}"), "exec sleep 30", &outputs))
        .collect();

    let mut pool = ProcessPool::new(jobs.into_iter());
    pool.set_concurrency(2).expect("valid concurrency");
    pool.set_poll_interval(Duration::from_millis(10));
    pool.start().expect("pool starts");
    assert_eq!(pool.active_count(), 2);

    pool.stop(Duration::from_secs(5), None);
    pool.wait().expect("pool drains");

    assert_eq!(pool.active_count(), 0);
    assert!(!pool.is_running());
}
