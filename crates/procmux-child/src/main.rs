//! Demonstration child used by the end-to-end tests.
//!
//! Arguments select the codec and behaviour:
//!
//! - `--json` uses the plain JSON codec instead of base64;
//! - `--plain` writes human-readable output;
//! - `fail` reports an error and exits non-zero;
//! - `panic` panics after installing the panic hook;
//! - `sleep` idles until it is signalled.
//!
//! Without a behaviour argument the child echoes a greeting, writes a line
//! through an echo writer and sends `[1, 2, 3]`.

use std::env;
use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use procmux_child::{CaptureConfig, ChildContext, EmitError, EmitMode, install_panic_hook};
use procmux_protocol::{Base64Codec, JsonCodec};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("the demo child was asked to fail")]
struct RequestedFailure;

fn capture_config(args: &[String]) -> CaptureConfig {
    let mode = if args.iter().any(|arg| arg == "--plain") {
        EmitMode::Plain
    } else {
        EmitMode::Encoded
    };
    if args.iter().any(|arg| arg == "--json") {
        CaptureConfig::new(mode, JsonCodec)
    } else {
        CaptureConfig::new(mode, Base64Codec)
    }
}

fn greet(context: &mut ChildContext) -> Result<(), EmitError> {
    context.echo("hello")?;
    {
        let mut writer = context.echo_writer();
        writeln!(writer, "from writer").map_err(|source| EmitError::Write {
            stream: "stdout",
            source,
        })?;
    }
    context.send(&[1, 2, 3])
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = capture_config(&args);
    install_panic_hook(config.clone());
    let mut context = ChildContext::new(config);

    match args.iter().find(|arg| !arg.starts_with("--")).map(String::as_str) {
        Some("fail") => context.exit_with_exception(&RequestedFailure),
        Some("panic") => panic!("the demo child panicked"),
        Some("sleep") => loop {
            thread::sleep(Duration::from_secs(1));
        },
        _ => match greet(&mut context) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => context.exit_with_exception(&error),
        },
    }
}
