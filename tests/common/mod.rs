//! Shared fakes for the integration tests: process table, launcher,
//! heartbeat transport, operator prompt and an in-memory log sink.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storewatch::heartbeat::{HeartbeatError, HeartbeatResponse};
use storewatch::supervisor::SupervisorError;
use storewatch::{
    HeartbeatTransport, Launcher, ProcessEntry, ProcessTable, SiteIdentity, TerminateOutcome,
    UserPrompt,
};
use tracing_subscriber::fmt::MakeWriter;

// ============================================================================
// Process table + launcher sharing one simulated OS
// ============================================================================

/// Simulated OS process list.
#[derive(Default)]
pub struct FakeOs {
    running: Mutex<Vec<ProcessEntry>>,
    next_pid: AtomicU32,
    pub launches: AtomicUsize,
}

impl FakeOs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: AtomicU32::new(1000),
            ..Default::default()
        })
    }

    pub fn start(&self, name: &str) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.running.lock().unwrap().push(ProcessEntry {
            pid,
            name: name.to_string(),
        });
        pid
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl ProcessTable for FakeOs {
    fn matching(&self, name: &str) -> Vec<ProcessEntry> {
        let wanted = name.to_lowercase();
        self.running
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name.to_lowercase() == wanted)
            .cloned()
            .collect()
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        let mut running = self.running.lock().unwrap();
        let before = running.len();
        running.retain(|p| p.pid != pid);
        if running.len() < before {
            TerminateOutcome::Killed
        } else {
            TerminateOutcome::AlreadyGone
        }
    }
}

impl Launcher for FakeOs {
    fn launch(&self, path: &Path) -> Result<Option<u32>, SupervisorError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(self.start(&name)))
    }
}

// ============================================================================
// Heartbeat transport
// ============================================================================

/// Answers every heartbeat the same way and counts calls.
pub struct FakeTransport {
    reply: Option<(u16, &'static str)>,
    pub calls: AtomicUsize,
}

impl FakeTransport {
    fn answering(reply: Option<(u16, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::answering(Some((200, "")))
    }

    pub fn rejecting(status: u16, body: &'static str) -> Arc<Self> {
        Self::answering(Some((status, body)))
    }

    pub fn timing_out() -> Arc<Self> {
        Self::answering(None)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeartbeatTransport for FakeTransport {
    async fn send(&self, _identity: &SiteIdentity) -> Result<HeartbeatResponse, HeartbeatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Some((status, body)) => Ok(HeartbeatResponse {
                status,
                body: body.to_string(),
            }),
            None => Err(HeartbeatError::Transport("operation timed out".to_string())),
        }
    }
}

// ============================================================================
// Operator prompt
// ============================================================================

/// Returns a fixed answer and records every interaction.
#[derive(Default)]
pub struct StubPrompt {
    answer: Option<String>,
    pub asked: AtomicUsize,
    pub errors: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<String>>,
}

impl StubPrompt {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn ask_count(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl UserPrompt for StubPrompt {
    fn ask_string(&self, _title: &str, _message: &str) -> Option<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }

    fn show_error(&self, _title: &str, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn show_info(&self, _title: &str, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}

// ============================================================================
// In-memory log sink
// ============================================================================

/// `MakeWriter` collecting formatted log output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's tracing events into a fresh [`CapturedLogs`], using
/// the production sink format.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let logs = CapturedLogs::default();
    let subscriber =
        tracing_subscriber::registry().with(storewatch::logging::sink_layer(logs.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
