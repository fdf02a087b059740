//! Background reader for the command stream.
//!
//! Spawns one thread that owns the reader (stdin, a serial device, ...) and
//! forwards chunks over a bounded channel. The control loop drains it
//! through `ByteSource` without ever blocking.
use crossbeam_channel as xch;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::command::ByteSource;

const CHUNK: usize = 256;

pub struct CommandInput {
    rx: xch::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl CommandInput {
    /// `capacity` is the number of read chunks that may queue up while the
    /// controller is not consuming (anything but IDLE).
    pub fn spawn<R: Read + Send + 'static>(mut reader: R, capacity: usize) -> Self {
        let (tx, rx) = xch::bounded::<Vec<u8>>(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut buf = [0u8; CHUNK];
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("command input thread received shutdown signal");
                    break;
                }
                match reader.read(&mut buf) {
                    Ok(0) => {
                        tracing::debug!("command input reached EOF");
                        break;
                    }
                    Ok(n) => {
                        // Consumer gone; exit
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "command input read failed; no further commands");
                        break;
                    }
                }
            }
            tracing::trace!("command input thread exiting");
        });

        Self {
            rx,
            pending: VecDeque::new(),
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// True once the reader thread has exited and every byte was drained.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
            && self.rx.is_empty()
            && self.join_handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl ByteSource for CommandInput {
    fn next_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            let chunk = self.rx.try_recv().ok()?;
            self.pending.extend(chunk);
        }
        self.pending.pop_front()
    }
}

impl Drop for CommandInput {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // A thread parked in read() cannot be woken; it is detached and ends
        // with the process.
        match self.join_handle.take() {
            Some(handle) if handle.is_finished() => {
                if let Err(e) = handle.join() {
                    tracing::warn!(?e, "command input thread panicked");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_until(input: &mut CommandInput, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = Vec::new();
        while got.len() < want && Instant::now() < deadline {
            match input.next_byte() {
                Some(b) => got.push(b),
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        }
        got
    }

    #[test]
    fn forwards_bytes_in_order() {
        let mut input = CommandInput::spawn(std::io::Cursor::new(b"SET 1 2 3 4\nBEGIN\n".to_vec()), 4);
        let got = drain_until(&mut input, 18);
        assert_eq!(got, b"SET 1 2 3 4\nBEGIN\n");
    }

    #[test]
    fn empty_reader_is_exhausted() {
        let mut input = CommandInput::spawn(std::io::empty(), 1);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !input.is_exhausted() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(input.is_exhausted());
        assert_eq!(input.next_byte(), None);
    }
}
