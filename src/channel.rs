//! Remote read channels.
//!
//! The feed is consumed by polling: ask whether data is ready, read up to a
//! chunk size, check whether the remote side has finished. [`ChannelSource`]
//! opens one channel per named resource (`hist1h`, `hist1m`, `hist1s`, `rt`).

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::error::FeedError;

const RESOURCE_PLACEHOLDER: &str = "{resource}";
const PIPE_READ_BYTES: usize = 8192;

pub trait ReadChannel: Send {
    fn resource(&self) -> &str;
    fn is_read_ready(&mut self) -> bool;
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, FeedError>;
    fn is_finished(&mut self) -> bool;
    fn close(&mut self);
}

pub trait ChannelSource: Send + Sync {
    fn open(&self, resource: &str) -> Result<Box<dyn ReadChannel>, FeedError>;
}

/// Opens a channel by spawning `program args..` with `{resource}` substituted,
/// e.g. `ssh -T hist1h@feed-host`. The child's stdout is the channel.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn render(&self, resource: &str) -> (String, Vec<String>) {
        let program = self.program.replace(RESOURCE_PLACEHOLDER, resource);
        let args = self
            .args
            .iter()
            .map(|arg| arg.replace(RESOURCE_PLACEHOLDER, resource))
            .collect();
        (program, args)
    }
}

impl ChannelSource for CommandSource {
    fn open(&self, resource: &str) -> Result<Box<dyn ReadChannel>, FeedError> {
        let (program, args) = self.render(resource);
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FeedError::open(resource, e))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| FeedError::open(resource, "child stdout not captured"))?;

        let (tx, rx) = mpsc::unbounded_channel::<Result<Vec<u8>, String>>();
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; PIPE_READ_BYTES];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e.to_string()));
                        break;
                    }
                }
            }
        });

        tracing::debug!(resource, program = %program, "Opened command channel");
        Ok(Box::new(CommandChannel {
            resource: resource.to_string(),
            child,
            reader,
            rx,
            pending: VecDeque::new(),
            failure: None,
            eof: false,
        }))
    }
}

pub struct CommandChannel {
    resource: String,
    child: Child,
    reader: JoinHandle<()>,
    rx: mpsc::UnboundedReceiver<Result<Vec<u8>, String>>,
    pending: VecDeque<u8>,
    failure: Option<String>,
    eof: bool,
}

impl CommandChannel {
    fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(Ok(bytes)) => self.pending.extend(bytes),
                Ok(Err(reason)) => self.failure = Some(reason),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.eof = true;
                    break;
                }
            }
        }
    }
}

impl ReadChannel for CommandChannel {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn is_read_ready(&mut self) -> bool {
        self.pump();
        !self.pending.is_empty() || self.failure.is_some()
    }

    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, FeedError> {
        self.pump();
        if self.pending.is_empty() {
            if let Some(reason) = self.failure.take() {
                return Err(FeedError::read(self.resource.as_str(), reason));
            }
        }
        let n = max_bytes.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn is_finished(&mut self) -> bool {
        self.pump();
        self.eof && self.pending.is_empty() && self.failure.is_none()
    }

    fn close(&mut self) {
        self.reader.abort();
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(resource = %self.resource, error = %e, "Channel process already exited");
        }
    }
}

/// Scripted channel: serves the given chunks in order, then either reports
/// end-of-stream, stalls forever, or fails the next read.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    resource: String,
    chunks: VecDeque<Vec<u8>>,
    ends: bool,
    error: Option<String>,
    closed: bool,
}

impl MemoryChannel {
    pub fn new<C: Into<Vec<u8>>>(resource: &str, chunks: impl IntoIterator<Item = C>) -> Self {
        Self {
            resource: resource.to_string(),
            chunks: chunks.into_iter().map(Into::into).collect(),
            ends: true,
            error: None,
            closed: false,
        }
    }

    /// Never reports end-of-stream once the chunks are drained.
    pub fn stalled(mut self) -> Self {
        self.ends = false;
        self
    }

    /// Fails the read that follows the last chunk.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.error = Some(reason.into());
        self.ends = false;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ReadChannel for MemoryChannel {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn is_read_ready(&mut self) -> bool {
        !self.closed && (!self.chunks.is_empty() || self.error.is_some())
    }

    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, FeedError> {
        if self.closed {
            return Err(FeedError::read(self.resource.as_str(), "channel closed"));
        }
        let Some(mut chunk) = self.chunks.pop_front() else {
            return match self.error.take() {
                Some(reason) => Err(FeedError::read(self.resource.as_str(), reason)),
                None => Ok(Vec::new()),
            };
        };
        if chunk.len() > max_bytes {
            let rest = chunk.split_off(max_bytes);
            self.chunks.push_front(rest);
        }
        Ok(chunk)
    }

    fn is_finished(&mut self) -> bool {
        self.ends && self.chunks.is_empty()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Serves a fresh copy of a scripted [`MemoryChannel`] per open. Unknown
/// resources fail to open.
#[derive(Debug, Default)]
pub struct MemorySource {
    scripts: HashMap<String, MemoryChannel>,
    opens: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: MemoryChannel) -> Self {
        self.scripts.insert(channel.resource.clone(), channel);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ChannelSource for MemorySource {
    fn open(&self, resource: &str) -> Result<Box<dyn ReadChannel>, FeedError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.scripts
            .get(resource)
            .cloned()
            .map(|channel| Box::new(channel) as Box<dyn ReadChannel>)
            .ok_or_else(|| FeedError::open(resource, "no such resource"))
    }
}
