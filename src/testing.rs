//! In-memory connector, transport and SFTP channel for tests

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

use crate::sftp::{FileChannel, ProgressCallback, SftpError};
use crate::ssh::{CommandOutput, Connector, SshConfig, SshError, Transport};

/// What the next download attempt does
pub enum Step {
    /// Write chunks of the given sizes, reporting progress after each
    Succeed(Vec<u64>),
    Fail(fn() -> SftpError),
}

/// Download attempts, consumed in order across every channel
#[derive(Default)]
pub struct Script {
    steps: VecDeque<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

#[derive(Default)]
struct State {
    script: Script,
    connects: usize,
    connect_failure: Option<fn() -> SshError>,
    connect_failures_left: usize,
    transports: Vec<Arc<AtomicBool>>,
    transport_closes: usize,
    channels_opened: usize,
    channels_closed: usize,
    attempts: Vec<Instant>,
}

pub struct FakeConnector {
    state: Arc<Mutex<State>>,
}

impl FakeConnector {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(State {
                script,
                ..Default::default()
            })),
        })
    }

    /// Every connect fails with `error`
    pub fn fail_connects_with(&self, error: fn() -> SshError) {
        self.fail_next_connects(usize::MAX, error);
    }

    /// The next `count` connects fail with `error`
    pub fn fail_next_connects(&self, count: usize, error: fn() -> SshError) {
        let mut state = self.state.lock();
        state.connect_failure = Some(error);
        state.connect_failures_left = count;
    }

    /// Simulate a network drop on every transport handed out so far
    pub fn kill_transports(&self) {
        for alive in &self.state.lock().transports {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    pub fn transport_close_count(&self) -> usize {
        self.state.lock().transport_closes
    }

    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts.len()
    }

    pub fn attempt_instants(&self) -> Vec<Instant> {
        self.state.lock().attempts.clone()
    }

    pub fn channels_opened(&self) -> usize {
        self.state.lock().channels_opened
    }

    pub fn channels_closed(&self) -> usize {
        self.state.lock().channels_closed
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &SshConfig) -> Result<Box<dyn Transport>, SshError> {
        let mut state = self.state.lock();
        state.connects += 1;

        if state.connect_failures_left > 0 {
            state.connect_failures_left -= 1;
            if let Some(error) = state.connect_failure {
                return Err(error());
            }
        }

        let alive = Arc::new(AtomicBool::new(true));
        state.transports.push(alive.clone());
        Ok(Box::new(FakeTransport {
            state: self.state.clone(),
            alive,
        }))
    }
}

struct FakeTransport {
    state: Arc<Mutex<State>>,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for FakeTransport {
    fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn open_file_channel(&mut self) -> Result<Box<dyn FileChannel>, SftpError> {
        self.state.lock().channels_opened += 1;
        Ok(Box::new(FakeChannel {
            state: self.state.clone(),
            closed: false,
        }))
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SshError> {
        Ok(CommandOutput {
            stdout: format!("{}\n", command),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn close(&mut self) -> Result<(), SshError> {
        self.alive.store(false, Ordering::SeqCst);
        self.state.lock().transport_closes += 1;
        Ok(())
    }
}

struct FakeChannel {
    state: Arc<Mutex<State>>,
    closed: bool,
}

#[async_trait]
impl FileChannel for FakeChannel {
    async fn download(
        &mut self,
        _remote_path: &str,
        local_path: &Path,
        progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError> {
        let step = {
            let mut state = self.state.lock();
            state.attempts.push(Instant::now());
            state.script.steps.pop_front()
        };

        let chunks = match step {
            Some(Step::Succeed(chunks)) => chunks,
            Some(Step::Fail(error)) => return Err(error()),
            None => return Err(SftpError::Unexpected("script exhausted".to_string())),
        };

        let total: u64 = chunks.iter().sum();
        let mut file = std::fs::File::create(local_path)?;
        let mut transferred = 0;
        for chunk in chunks {
            file.write_all(&vec![0u8; chunk as usize])?;
            transferred += chunk;
            progress(transferred, total);
        }
        Ok(transferred)
    }

    async fn close(&mut self) -> Result<(), SftpError> {
        if !self.closed {
            self.closed = true;
            self.state.lock().channels_closed += 1;
        }
        Ok(())
    }
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Capture events on the current thread until the guard is dropped
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
