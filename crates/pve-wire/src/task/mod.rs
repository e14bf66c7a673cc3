//! Task completion coordinator.
//!
//! Mutating calls return a task identifier right away; the work finishes
//! later on the node. [`submit`] starts a poller thread that asks a
//! caller-supplied [`StatusCheck`] for the task status every interval and
//! reports the terminal result once through a one-shot channel.
//! [`TaskHandle::wait`] blocks until that result arrives.
//!
//! The poller never retries a failed status check; the first transport error
//! ends the wait. Cancelling or dropping the handle stops the poller at its
//! next pause; the remote task is not affected.

pub mod upid;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{PropertyError, TaskError, TransportError};
use crate::limits::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::schema::{FieldSpec, FromWireMap};
use crate::wire::{wire_enum, WireMap};

pub use upid::Upid;

/// Exit status the remote side reports for a successful task.
pub const EXIT_OK: &str = "OK";

wire_enum! {
    /// Coarse task state as reported by the status endpoint.
    pub enum TaskState as "task state" {
        Running => "running",
        Stopped => "stopped",
    }
}

/// Current status of a remote task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    /// Terminal; `exit_status` is `OK` on success, an error text otherwise.
    Stopped { exit_status: String },
}

impl TaskStatus {
    /// Returns true once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Stopped { .. })
    }
}

static STATUS: FieldSpec<TaskState> = FieldSpec::required("status");
static EXIT_STATUS: FieldSpec<Option<String>> = FieldSpec::optional("exitstatus");

impl FromWireMap for TaskStatus {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        match STATUS.extract(map)? {
            TaskState::Stopped => Ok(TaskStatus::Stopped {
                exit_status: EXIT_STATUS.extract(map)?.unwrap_or_default(),
            }),
            // strict extraction never yields Unknown
            TaskState::Running | TaskState::Unknown => Ok(TaskStatus::Running),
        }
    }
}

/// Capability to fetch a task's current status, supplied by the transport.
pub trait StatusCheck: Send + 'static {
    fn check(&mut self, upid: &Upid) -> Result<TaskStatus, TransportError>;
}

impl<F> StatusCheck for F
where
    F: FnMut(&Upid) -> Result<TaskStatus, TransportError> + Send + 'static,
{
    fn check(&mut self, upid: &Upid) -> Result<TaskStatus, TransportError> {
        self(upid)
    }
}

/// Polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    interval: Duration,
}

impl PollOptions {
    /// Sets the fixed pause between polls, clamped to the minimum.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Returns the pause between polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// One in-flight remote task.
///
/// `wait` takes `&mut self`, so a handle has a single waiter; share the
/// outcome rather than the handle if several parties need it. Dropping the
/// handle stops the poller at its next pause.
#[derive(Debug)]
pub struct TaskHandle {
    upid: Upid,
    receiver: Receiver<Result<(), TaskError>>,
    cancel: Option<Sender<()>>,
    poller: Option<JoinHandle<()>>,
    outcome: Option<Result<(), TaskError>>,
}

/// Starts polling `upid` and returns a handle to wait on.
///
/// The first poll is issued immediately; later polls follow after pausing
/// the full interval. Fails only if the poller thread cannot be spawned.
pub fn submit<C: StatusCheck>(
    upid: Upid,
    options: PollOptions,
    check: C,
) -> std::io::Result<TaskHandle> {
    let (sender, receiver) = mpsc::sync_channel(1);
    let (cancel, cancelled) = mpsc::channel();
    let poller_upid = upid.clone();
    let poller = thread::Builder::new()
        .name(format!("task-poll-{}", upid.node()))
        .spawn(move || {
            let outcome = poll_until_done(&poller_upid, options.interval, check, &cancelled);
            // receiver gone means the handle was dropped; nobody to tell
            let _ = sender.send(outcome);
        })?;

    Ok(TaskHandle {
        upid,
        receiver,
        cancel: Some(cancel),
        poller: Some(poller),
        outcome: None,
    })
}

fn poll_until_done<C: StatusCheck>(
    upid: &Upid,
    interval: Duration,
    mut check: C,
    cancelled: &Receiver<()>,
) -> Result<(), TaskError> {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        tracing::debug!(upid = %upid, attempt, "polling task status");
        match check.check(upid) {
            // the pause doubles as the cancellation point; a dropped handle
            // disconnects the channel
            Ok(TaskStatus::Running) => match cancelled.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!(upid = %upid, attempt, "polling cancelled");
                    return Err(TaskError::Cancelled {
                        upid: upid.to_string(),
                    });
                }
            },
            Ok(TaskStatus::Stopped { exit_status }) => {
                tracing::debug!(upid = %upid, attempt, exit_status = %exit_status, "task stopped");
                return if exit_status == EXIT_OK {
                    Ok(())
                } else {
                    Err(TaskError::Remote {
                        upid: upid.to_string(),
                        exit_status,
                    })
                };
            }
            Err(err) => {
                tracing::debug!(upid = %upid, attempt, error = %err, "status check failed");
                return Err(err.into());
            }
        }
    }
}

impl TaskHandle {
    /// Returns the task identifier.
    pub fn upid(&self) -> &Upid {
        &self.upid
    }

    /// Returns the node the task runs on.
    pub fn node(&self) -> &str {
        self.upid.node()
    }

    /// Blocks until the task reaches a terminal state.
    ///
    /// Later calls return the same outcome without blocking.
    pub fn wait(&mut self) -> Result<(), TaskError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self.receiver.recv().unwrap_or_else(|_| {
            Err(TaskError::PollerLost {
                upid: self.upid.to_string(),
            })
        });
        self.settle(outcome)
    }

    /// Asks the poller to stop at its next pause.
    ///
    /// A status check already in flight still completes; if it reports a
    /// terminal state, that outcome wins. Otherwise `wait` returns
    /// [`TaskError::Cancelled`]. The remote task itself keeps running.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // poller already gone; its outcome is waiting in the channel
            let _ = cancel.send(());
        }
    }

    /// Returns the outcome if the task has already finished, without blocking.
    pub fn try_wait(&mut self) -> Option<Result<(), TaskError>> {
        if let Some(outcome) = &self.outcome {
            return Some(outcome.clone());
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(TaskError::PollerLost {
                upid: self.upid.to_string(),
            }),
        };
        Some(self.settle(outcome))
    }

    fn settle(&mut self, outcome: Result<(), TaskError>) -> Result<(), TaskError> {
        if let Some(poller) = self.poller.take() {
            // the poller has already sent or died; a panic shows up as PollerLost
            let _ = poller.join();
        }
        self.outcome = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::wire::{wire_map_from_json, WireValue};

    const UPID: &str = "UPID:pve1:0000C530:001A2B3C:65A1B2C3:qmstart:100:root@pam:";

    fn upid() -> Upid {
        Upid::parse(UPID).unwrap()
    }

    fn fast() -> PollOptions {
        PollOptions::default().with_interval(Duration::from_millis(1))
    }

    /// Replays `script` one status per poll and counts polls.
    fn scripted(
        script: Vec<Result<TaskStatus, TransportError>>,
    ) -> (Arc<AtomicUsize>, impl StatusCheck) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut script = script.into_iter();
        let check = move |_: &Upid| {
            counter.fetch_add(1, Ordering::SeqCst);
            script.next().unwrap_or_else(|| Err(TransportError::new("script exhausted")))
        };
        (calls, check)
    }

    fn stopped(exit_status: &str) -> Result<TaskStatus, TransportError> {
        Ok(TaskStatus::Stopped {
            exit_status: exit_status.to_string(),
        })
    }

    #[test]
    fn test_success_after_fourth_poll() {
        let (calls, check) = scripted(vec![
            Ok(TaskStatus::Running),
            Ok(TaskStatus::Running),
            Ok(TaskStatus::Running),
            stopped("OK"),
        ]);
        let mut handle = submit(upid(), fast(), check).unwrap();

        assert!(handle.wait().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        // the poller has been joined; no fifth poll can happen
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_transport_error_stops_polling() {
        let (calls, check) = scripted(vec![
            Ok(TaskStatus::Running),
            Err(TransportError::new("connection reset")),
            stopped("OK"),
        ]);
        let mut handle = submit(upid(), fast(), check).unwrap();

        let err = handle.wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("connection reset"));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remote_failure_carries_exit_status() {
        let (_, check) = scripted(vec![stopped("command 'qm start' failed: exit code 1")]);
        let mut handle = submit(upid(), fast(), check).unwrap();

        match handle.wait() {
            Err(TaskError::Remote { upid, exit_status }) => {
                assert_eq!(upid, UPID);
                assert_eq!(exit_status, "command 'qm start' failed: exit code 1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_second_wait_returns_cached_outcome() {
        let (calls, check) = scripted(vec![stopped("OK")]);
        let mut handle = submit(upid(), fast(), check).unwrap();
        assert!(handle.wait().is_ok());
        assert!(handle.wait().is_ok());
        assert!(matches!(handle.try_wait(), Some(Ok(()))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.node(), "pve1");
    }

    #[test]
    fn test_poller_panic_reports_lost() {
        let check = |_: &Upid| -> Result<TaskStatus, TransportError> { panic!("boom") };
        let mut handle = submit(upid(), fast(), check).unwrap();
        assert_eq!(handle.wait().unwrap_err().kind(), ErrorKind::PollerLost);
    }

    #[test]
    fn test_interval_is_respected() {
        let (_, check) = scripted(vec![Ok(TaskStatus::Running), Ok(TaskStatus::Running), stopped("OK")]);
        let options = PollOptions::default().with_interval(Duration::from_millis(30));
        let started = std::time::Instant::now();
        submit(upid(), options, check).unwrap().wait().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_cancel_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let check = move |_: &Upid| -> Result<TaskStatus, TransportError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TaskStatus::Running)
        };
        let options = PollOptions::default().with_interval(Duration::from_secs(10));
        let mut handle = submit(upid(), options, check).unwrap();

        let started = std::time::Instant::now();
        handle.cancel();
        let err = handle.wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_after_completion_keeps_outcome() {
        let (_, check) = scripted(vec![stopped("OK")]);
        let mut handle = submit(upid(), fast(), check).unwrap();
        assert!(handle.wait().is_ok());
        handle.cancel();
        assert!(handle.wait().is_ok());
    }

    #[test]
    fn test_interval_clamped() {
        let options = PollOptions::default().with_interval(Duration::ZERO);
        assert_eq!(options.interval(), MIN_POLL_INTERVAL);
        assert_eq!(PollOptions::default().interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_status_from_wire_map() {
        let map = wire_map_from_json(serde_json::json!({
            "status": "stopped",
            "exitstatus": "OK",
            "upid": UPID,
        }))
        .unwrap();
        assert_eq!(
            TaskStatus::from_wire_map(&map).unwrap(),
            TaskStatus::Stopped { exit_status: "OK".to_string() }
        );

        let mut map = WireMap::default();
        map.insert("status".to_string(), WireValue::from("running"));
        assert!(!TaskStatus::from_wire_map(&map).unwrap().is_terminal());

        map.insert("status".to_string(), WireValue::from("paused"));
        assert_eq!(
            TaskStatus::from_wire_map(&map).unwrap_err().kind(),
            ErrorKind::InvalidProperty
        );
    }
}
