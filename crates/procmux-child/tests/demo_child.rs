//! End-to-end runs of the demo child under a real controller.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use procmux::{ChildCommand, ChildProcess, MessageRouter, ProcessHandle, RouterError};
use procmux_protocol::{Base64Codec, Codec, ExceptionEnvelope, JsonCodec};
use rstest::rstest;
use serde_json::{Value, json};

const DEMO_CHILD: &str = env!("CARGO_BIN_EXE_procmux-demo-child");

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Echo(String),
    Message(Value),
    Exception(ExceptionEnvelope),
}

#[derive(Clone, Default)]
struct Events(Arc<Mutex<Vec<Event>>>);

impl Events {
    fn record(&self, event: Event) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event);
        }
    }

    fn snapshot(&self) -> Vec<Event> {
        self.0.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

fn recording_router<C: Codec>(codec: C, events: &Events) -> MessageRouter<C> {
    let echoes = events.clone();
    let messages = events.clone();
    let exceptions = events.clone();
    MessageRouter::with_codec(codec)
        .on_echo(move |text| echoes.record(Event::Echo(text.to_owned())))
        .on_message(move |value| messages.record(Event::Message(value)))
        .on_exception(move |envelope| exceptions.record(Event::Exception(envelope)))
}

fn demo<C: Codec + 'static>(codec: C, args: &[&str], events: &Events) -> ChildProcess {
    ChildProcess::new(ChildCommand::new(DEMO_CHILD).args(args.iter().copied()))
        .with_label("demo")
        .with_sink(recording_router(codec, events))
}

fn run_until_terminated(child: &mut ChildProcess) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !child.is_terminated() {
        child.pump().expect("output routes");
        assert!(Instant::now() < deadline, "demo child did not terminate");
        thread::sleep(Duration::from_millis(10));
    }
}

fn run_to_completion(child: &mut ChildProcess) {
    child.start().expect("demo child starts");
    run_until_terminated(child);
}

#[rstest]
#[case::base64(&[])]
#[case::json(&["--json"])]
fn greeting_reaches_the_controller(#[case] args: &[&str]) {
    let events = Events::default();
    let mut child = if args.is_empty() {
        demo(Base64Codec, args, &events)
    } else {
        demo(JsonCodec, args, &events)
    };

    run_to_completion(&mut child);

    assert_eq!(
        events.snapshot(),
        vec![
            Event::Echo("hello".into()),
            Event::Echo("from writer".into()),
            Event::Message(json!([1, 2, 3])),
        ]
    );
    assert_eq!(child.exit_status().and_then(|status| status.code()), Some(0));
}

#[test]
fn reported_failure_arrives_as_an_exception() {
    let events = Events::default();
    let mut child = demo(JsonCodec, &["--json", "fail"], &events);

    run_to_completion(&mut child);

    let recorded = events.snapshot();
    let [Event::Exception(envelope)] = recorded.as_slice() else {
        panic!("expected one exception, got {recorded:?}");
    };
    assert!(envelope.source_type().ends_with("RequestedFailure"));
    assert!(envelope.description().contains("asked to fail"));
    assert!(envelope.file().ends_with("main.rs"));
    assert_eq!(child.exit_status().and_then(|status| status.code()), Some(1));
}

#[test]
fn panics_arrive_as_exceptions() {
    let events = Events::default();
    let mut child = demo(Base64Codec, &["panic"], &events);

    run_to_completion(&mut child);

    let recorded = events.snapshot();
    let [Event::Exception(envelope)] = recorded.as_slice() else {
        panic!("expected one exception, got {recorded:?}");
    };
    assert!(envelope.description().contains("the demo child panicked"));
    assert!(!child.exit_status().is_some_and(|status| status.success()));
}

#[test]
fn failures_without_a_handler_surface_as_router_errors() {
    let mut child = ChildProcess::new(ChildCommand::new(DEMO_CHILD).arg("fail"))
        .with_label("demo")
        .with_sink(MessageRouter::new().on_echo(|_| {}));
    child.start().expect("demo child starts");

    let deadline = Instant::now() + Duration::from_secs(10);
    let error = loop {
        if let Err(error) = child.pump() {
            break error;
        }
        assert!(Instant::now() < deadline, "no failure was routed");
        thread::sleep(Duration::from_millis(10));
    };

    assert!(matches!(
        error,
        procmux::ProcessError::Delivery(RouterError::ChildFailure { ref label, .. }) if label == "demo"
    ));
}

#[test]
fn sleeping_child_is_stopped_by_signal() {
    let events = Events::default();
    let mut child = demo(Base64Codec, &["sleep"], &events);
    child.start().expect("demo child starts");
    assert!(child.is_running());

    child
        .stop(Duration::from_secs(5), None)
        .expect("signal delivered");
    run_until_terminated(&mut child);

    assert!(events.snapshot().is_empty());
    assert!(!child.is_running());
}
