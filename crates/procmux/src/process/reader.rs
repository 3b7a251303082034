//! Background readers feeding pipe output to the controller thread.

use std::io::{self, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::trace;

use super::{PROCESS_TARGET, StreamKind};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Something that happened on one of the child's pipes.
#[derive(Debug)]
pub(super) enum StreamEvent {
    /// Bytes were read.
    Chunk(StreamKind, Vec<u8>),
    /// The pipe reached end of file or failed; no more events follow.
    Closed(StreamKind, Option<io::Error>),
}

/// Spawns a thread that forwards everything read from `pipe`.
pub(super) fn spawn_reader<R>(
    stream: StreamKind,
    mut pipe: R,
    events: Sender<StreamEvent>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("procmux-{stream}"))
        .spawn(move || {
            let mut buffer = [0_u8; READ_BUFFER_SIZE];
            let failure = loop {
                match pipe.read(&mut buffer) {
                    Ok(0) => break None,
                    Ok(read) => {
                        let chunk = buffer.get(..read).unwrap_or_default().to_vec();
                        trace!(target: PROCESS_TARGET, %stream, bytes = read, "read chunk");
                        if events.send(StreamEvent::Chunk(stream, chunk)).is_err() {
                            return;
                        }
                    }
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                    Err(error) => break Some(error),
                }
            };
            // The receiver may already be gone if the handle was dropped.
            drop(events.send(StreamEvent::Closed(stream, failure)));
        })
}
