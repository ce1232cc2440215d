// Downloading configuration content over HTTP.
//
// The configuration orchestrator receives a `ConfigFetcher` so tests can serve bytes
// without a network. `HttpFetcher` is the real implementation on top of `ureq`.
//
// A blocking `ureq` call cannot be interrupted from outside. The request and the body
// reads therefore run on a worker thread that hands chunks over a bounded channel,
// while the calling thread waits on that channel in short slices and checks the
// `RunContext` after each one. When the context is cancelled or expires, `fetch`
// returns right away and the worker is abandoned; it ends on its own once the
// connection fails, times out, or notices that nobody is receiving any more.

// Standard I/O traits for the sink and the response body.
use std::io::{self, Read, Write};
// Channel used to pass body chunks from the worker thread to the caller.
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
// Worker thread and the polling interval.
use std::thread;
use std::time::Duration;

// For colored URLs in debug output.
use colored::Colorize;
// Derives `std::error::Error` for `FetchError`.
use thiserror::Error;
// Typed, already-normalized URLs.
use url::Url;

use crate::libs::run_context::{Interrupted, RunContext};
use crate::log_debug;

/// Size of each body chunk handed from the worker to the caller.
const CHUNK_SIZE: usize = 8 * 1024;
/// Chunks the worker may read ahead of the caller.
const CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to download configuration: HTTP status {0}")]
    Status(u16),
    #[error("failed to download configuration: {0}")]
    Transport(String),
    #[error("failed to read the response body: {0}")]
    Body(#[source] io::Error),
    #[error("failed to write configuration: {0}")]
    Write(#[source] io::Error),
    #[error("download interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

/// Fetches the content behind a URL into a writer.
pub trait ConfigFetcher {
    /// Streams the body of a `200 OK` response for `url` into `sink` and returns
    /// the number of bytes written.
    fn fetch(&self, ctx: &RunContext, url: &Url, sink: &mut dyn Write) -> Result<u64, FetchError>;
}

pub struct HttpFetcher {
    agent: ureq::Agent,
    // How long the caller waits on the worker before looking at the context again.
    poll_interval: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        // Identify ourselves; some hosts reject requests without a User-Agent.
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("machine-setup/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, poll_interval: Duration::from_millis(50) }
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What the worker thread sends back: a body chunk, or the error that ended the transfer.
/// The channel closing without an error means the body is complete.
type Message = Result<Vec<u8>, FetchError>;

impl ConfigFetcher for HttpFetcher {
    fn fetch(&self, ctx: &RunContext, url: &Url, sink: &mut dyn Write) -> Result<u64, FetchError> {
        // Don't even open a connection for a context that is already done.
        ctx.check()?;
        log_debug!("[Fetch] GET {}", url.as_str().blue());

        let mut request = self.agent.get(url.as_str());
        // The deadline bounds the whole request so the worker cannot outlive it for long.
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining);
        }

        // Bounded: a slow sink throttles the worker instead of buffering the whole body.
        let (tx, rx) = mpsc::sync_channel::<Message>(CHANNEL_DEPTH);
        // Never joined: on interruption we return while it may still be blocked.
        thread::spawn(move || stream_response(request, tx));

        let written = self.receive(ctx, &rx, sink)?;
        log_debug!("[Fetch] Received {} bytes from {}", written, url);
        Ok(written)
    }
}

impl HttpFetcher {
    /// Drains `rx` into `sink`, checking `ctx` every `poll_interval` while waiting.
    fn receive(&self, ctx: &RunContext, rx: &Receiver<Message>, sink: &mut dyn Write) -> Result<u64, FetchError> {
        let mut total = 0u64;
        loop {
            match rx.recv_timeout(self.poll_interval) {
                // A chunk arrived: make sure we are still wanted, then write it out.
                Ok(Ok(chunk)) => {
                    ctx.check()?;
                    sink.write_all(&chunk).map_err(FetchError::Write)?;
                    total += chunk.len() as u64;
                }
                Ok(Err(e)) => {
                    // A transport timeout caused by our own deadline is an interruption,
                    // not a network fault.
                    ctx.check()?;
                    return Err(e);
                }
                // Nothing yet; the worker may be stuck in connect or read.
                Err(RecvTimeoutError::Timeout) => ctx.check()?,
                // The worker finished the body and dropped its sender.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        sink.flush().map_err(FetchError::Write)?;
        Ok(total)
    }
}

/// Runs on the worker thread: performs the request and forwards the body in chunks.
/// Any send failure means the caller gave up, so the worker just stops.
fn stream_response(request: ureq::Request, tx: SyncSender<Message>) {
    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            let _ = tx.send(Err(FetchError::Status(code)));
            return;
        }
        Err(ureq::Error::Transport(transport)) => {
            let _ = tx.send(Err(FetchError::Transport(transport.to_string())));
            return;
        }
    };
    // Only a plain 200 counts; 204 and friends carry no configuration.
    if response.status() != 200 {
        let _ = tx.send(Err(FetchError::Status(response.status())));
        return;
    }

    let mut reader = response.into_reader();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return, // End of body; dropping `tx` tells the caller we are done.
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(FetchError::Body(e)));
                return;
            }
        };
        if tx.send(Ok(buf[..n].to_vec())).is_err() {
            return;
        }
    }
}
