//! Behaviour-driven tests for pool scheduling.

use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::error::ConfigurationError;
use crate::pool::{PoolState, ProcessPool};
use crate::process::ProcessHandle;

use super::support::{Ledger, ScriptedHandle, jobs};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

type ScriptedPool = ProcessPool<std::vec::IntoIter<ScriptedHandle>>;

#[derive(Default)]
struct PoolWorld {
    ledger: Ledger,
    pool: Option<ScriptedPool>,
    started: bool,
    concurrency_error: Option<ConfigurationError>,
}

impl PoolWorld {
    fn pool(&mut self) -> &mut ScriptedPool {
        self.pool.as_mut().expect("pool should be configured")
    }
}

#[fixture]
fn world() -> PoolWorld {
    PoolWorld::default()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a pool with {slots} slots over {count} jobs lasting {lifetime} ticks")]
fn given_pool(world: &mut PoolWorld, slots: usize, count: usize, lifetime: usize) {
    let mut pool = ProcessPool::new(jobs(count, lifetime, &world.ledger).into_iter());
    pool.set_concurrency(slots).expect("valid concurrency");
    pool.set_poll_interval(Duration::from_millis(1));
    world.pool = Some(pool);
}

#[given("a finish hook that restarts each job once")]
fn given_restart_hook(world: &mut PoolWorld) {
    let pool = world.pool.take().expect("pool should be configured");
    world.pool = Some(pool.on_finished(|handle: &mut ScriptedHandle| {
        if handle.generation() == 0 {
            handle.restart().ok()
        } else {
            None
        }
    }));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the pool is started")]
fn when_started(world: &mut PoolWorld) {
    world.pool().start().expect("pool should start");
    world.started = true;
}

#[when("the pool is asked to finish")]
fn when_finish(world: &mut PoolWorld) {
    world.pool().finish();
}

#[when("the pool is stopped with a grace period")]
fn when_stopped(world: &mut PoolWorld) {
    world.pool().stop(Duration::from_secs(1), None);
}

#[when("the pool runs to completion")]
fn when_run(world: &mut PoolWorld) {
    let started = world.started;
    let pool = world.pool();
    if started {
        pool.wait().expect("pool should drain");
    } else {
        pool.run().expect("pool should run");
    }
}

#[when("the concurrency is set to {value}")]
fn when_set_concurrency(world: &mut PoolWorld, value: usize) {
    world.concurrency_error = world.pool().set_concurrency(value).err();
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("{count} jobs were started")]
fn then_started(world: &mut PoolWorld, count: usize) {
    assert_eq!(world.ledger.started().len(), count);
}

#[then("{count} jobs finished")]
fn then_finished(world: &mut PoolWorld, count: usize) {
    assert_eq!(world.ledger.state().finished.len(), count);
}

#[then("{count} jobs were stopped")]
fn then_stopped(world: &mut PoolWorld, count: usize) {
    assert_eq!(world.ledger.stopped().len(), count);
}

#[then("at most {count} jobs ran at the same time")]
fn then_peak(world: &mut PoolWorld, count: usize) {
    let peak = world.ledger.peak_running();
    assert!(peak <= count, "expected at most {count} concurrent jobs, saw {peak}");
}

#[then("the pool is stopped")]
fn then_pool_stopped(world: &mut PoolWorld) {
    assert_eq!(world.pool().state(), PoolState::Stopped);
    assert_eq!(world.pool().active_count(), 0);
}

#[then("the pool reports an invalid concurrency")]
fn then_invalid_concurrency(world: &mut PoolWorld) {
    assert!(matches!(
        world.concurrency_error,
        Some(ConfigurationError::InvalidConcurrency { value: 0 })
    ));
    assert_eq!(world.pool().concurrency(), 1);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/pool_scheduling.feature",
    name = "Two slots run three jobs"
)]
fn two_slots_run_three_jobs(world: PoolWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/pool_scheduling.feature",
    name = "Finishing drains running jobs without pulling more"
)]
fn finishing_drains(world: PoolWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/pool_scheduling.feature",
    name = "A finish hook restarts each job once"
)]
fn finish_hook_restarts(world: PoolWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/pool_scheduling.feature",
    name = "Stopping the pool stops running jobs"
)]
fn stopping_the_pool(world: PoolWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/pool_scheduling.feature",
    name = "Zero concurrency is rejected"
)]
fn zero_concurrency(world: PoolWorld) {
    drop(world);
}
