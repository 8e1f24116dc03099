//! Output-pump machinery shared by every shell implementation.
//!
//! Each running shell owns one unbounded multi-producer/single-consumer
//! queue and one background Tokio task (the pump) that drains the queue and
//! publishes output events. Producers enqueue from any thread; the pump is
//! the sole invoker of output listeners, so listeners never race each other.
//!
//! Stopping closes the sender side; the pump drains whatever is already
//! queued and exits. A stop that cannot drain within [`DRAIN_TIMEOUT`] is
//! forced out through a `CancellationToken` and logged, never surfaced.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, ShellError};
use crate::events::EventBus;
use crate::types::{OutputEvent, OutputKind, StartOptions, SubscriptionId, TerminatedEvent};

/// How long `stop` waits for the pump to drain before forcing it out.
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(termhost_core::config::DRAIN_TIMEOUT_MS);

struct CoreState {
    running: bool,
    /// Set while a stop is in flight so a second concurrent `stop` is a
    /// no-op instead of running the hooks twice.
    stopping: bool,
    disposed: bool,
    terminated_fired: bool,
    sender: Option<UnboundedSender<OutputEvent>>,
    stop_token: Option<CancellationToken>,
    pump: Option<JoinHandle<()>>,
    width: u16,
    height: u16,
}

struct CoreInner {
    state: Mutex<CoreState>,
    output: Arc<EventBus<OutputEvent>>,
    terminated: EventBus<TerminatedEvent>,
}

/// Shared lifecycle state and output queue for one shell instance.
///
/// Cloning is cheap (an `Arc` bump); clones address the same shell.
#[derive(Clone)]
pub struct ShellCore {
    inner: Arc<CoreInner>,
}

impl ShellCore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CoreInner {
                state: Mutex::new(CoreState {
                    running: false,
                    stopping: false,
                    disposed: false,
                    terminated_fired: false,
                    sender: None,
                    stop_token: None,
                    pump: None,
                    width: 0,
                    height: 0,
                }),
                output: Arc::new(EventBus::new("output")),
                terminated: EventBus::new("terminated"),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().unwrap().running
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().unwrap().disposed
    }

    /// Last dimensions seen at start or resize, as `(width, height)`.
    pub fn dimensions(&self) -> (u16, u16) {
        let state = self.inner.state.lock().unwrap();
        (state.width, state.height)
    }

    pub fn set_dimensions(&self, width: u16, height: u16) {
        let mut state = self.inner.state.lock().unwrap();
        state.width = width;
        state.height = height;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Transition to running: create a fresh queue and spawn the pump.
    ///
    /// The caller is expected to run its startup hook next and call
    /// [`ShellCore::abort_start`] if that hook fails.
    pub fn start(&self, options: &StartOptions) -> Result<()> {
        if options.terminal_width == 0 || options.terminal_height == 0 {
            return Err(ShellError::InvalidArgument(format!(
                "terminal dimensions must be positive, got {}x{}",
                options.terminal_width, options.terminal_height
            )));
        }

        let mut state = self.inner.state.lock().unwrap();
        if state.disposed {
            return Err(ShellError::Disposed);
        }
        if state.running {
            return Err(ShellError::AlreadyRunning);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let pump = spawn_pump(receiver, token.clone(), Arc::clone(&self.inner.output));

        state.running = true;
        state.terminated_fired = false;
        state.sender = Some(sender);
        state.stop_token = Some(token);
        state.pump = Some(pump);
        state.width = options.terminal_width;
        state.height = options.terminal_height;

        debug!(
            width = options.terminal_width,
            height = options.terminal_height,
            "shell started, output pump spawned"
        );
        Ok(())
    }

    /// Roll back a start whose hook failed: revert the running flag, close
    /// the queue, and join the pump. No `terminated` event fires.
    pub async fn abort_start(&self) {
        let (pump, token) = {
            let mut state = self.inner.state.lock().unwrap();
            state.running = false;
            state.sender = None;
            (state.pump.take(), state.stop_token.take())
        };
        join_pump(pump, token).await;
        debug!("aborted start rolled back");
    }

    /// First half of the stop protocol. Returns `false` when the shell is
    /// not running (or another stop is already in flight), in which case the
    /// caller returns immediately without running its hook.
    pub fn begin_stop(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if !state.running || state.stopping {
            return false;
        }
        state.stopping = true;
        true
    }

    /// Second half of the stop protocol: mark not-running, close the queue,
    /// await the drain, fire `terminated(0, "Stopped")`.
    pub async fn finish_stop(&self) {
        let (pump, token) = {
            let mut state = self.inner.state.lock().unwrap();
            state.running = false;
            state.sender = None;
            (state.pump.take(), state.stop_token.take())
        };
        join_pump(pump, token).await;
        self.fire_terminated(0, Some("Stopped"));
        self.inner.state.lock().unwrap().stopping = false;
    }

    /// Permanently retire the core. Lifecycle calls fail with `Disposed`
    /// from here on.
    pub fn mark_disposed(&self) {
        self.inner.state.lock().unwrap().disposed = true;
    }

    fn fire_terminated(&self, exit_code: i32, reason: Option<&str>) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.terminated_fired {
                return;
            }
            state.terminated_fired = true;
        }
        debug!(exit_code, ?reason, "shell terminated");
        self.inner.terminated.emit(&TerminatedEvent {
            exit_code,
            reason: reason.map(String::from),
        });
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    /// Enqueue raw bytes for delivery on the pump. Thread-safe.
    ///
    /// # Errors
    ///
    /// - `NotRunning` once the queue has been closed by `stop`.
    pub fn enqueue_bytes(&self, data: impl Into<Vec<u8>>, kind: OutputKind) -> Result<()> {
        let state = self.inner.state.lock().unwrap();
        let sender = state.sender.as_ref().ok_or(ShellError::NotRunning)?;
        sender
            .send(OutputEvent {
                data: data.into(),
                kind,
            })
            .map_err(|_| ShellError::NotRunning)
    }

    /// Enqueue UTF-8 text for delivery on the pump. Thread-safe.
    pub fn enqueue_text(&self, text: &str, kind: OutputKind) -> Result<()> {
        self.enqueue_bytes(text.as_bytes().to_vec(), kind)
    }

    /// A cloneable producer handle for command handlers.
    pub fn sink(&self) -> OutputSink {
        OutputSink {
            core: self.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn subscribe_output<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&OutputEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.output.subscribe(listener)
    }

    pub fn unsubscribe_output(&self, id: SubscriptionId) -> bool {
        self.inner.output.unsubscribe(id)
    }

    pub fn subscribe_terminated<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TerminatedEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.terminated.subscribe(listener)
    }

    pub fn unsubscribe_terminated(&self, id: SubscriptionId) -> bool {
        self.inner.terminated.unsubscribe(id)
    }
}

impl Default for ShellCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable output producer handed to command handlers.
///
/// Holds no lifecycle authority: it can only enqueue, and enqueues fail with
/// `NotRunning` once the owning shell has stopped.
#[derive(Clone)]
pub struct OutputSink {
    core: ShellCore,
}

impl OutputSink {
    pub fn write_bytes(&self, data: impl Into<Vec<u8>>, kind: OutputKind) -> Result<()> {
        self.core.enqueue_bytes(data, kind)
    }

    pub fn write_text(&self, text: &str, kind: OutputKind) -> Result<()> {
        self.core.enqueue_text(text, kind)
    }
}

// ---------------------------------------------------------------------------
// Pump internals
// ---------------------------------------------------------------------------

fn spawn_pump(
    mut receiver: UnboundedReceiver<OutputEvent>,
    token: CancellationToken,
    output: Arc<EventBus<OutputEvent>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("output pump cancelled before drain completed");
                    break;
                }
                event = receiver.recv() => match event {
                    Some(event) => output.emit(&event),
                    // Sender dropped and queue fully drained.
                    None => break,
                },
            }
        }
        debug!("output pump exited");
    })
}

/// Await the pump with the drain timeout; force it out via the token when
/// the timeout elapses.
async fn join_pump(pump: Option<JoinHandle<()>>, token: Option<CancellationToken>) {
    let Some(mut pump) = pump else { return };
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut pump).await {
        Ok(_) => {}
        Err(_elapsed) => {
            warn!(
                timeout_ms = DRAIN_TIMEOUT.as_millis() as u64,
                "output pump drain timed out, forcing exit"
            );
            if let Some(token) = token {
                token.cancel();
            }
            let _ = pump.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn started_core() -> ShellCore {
        let core = ShellCore::new();
        core.start(&StartOptions::default()).unwrap();
        core
    }

    #[tokio::test]
    async fn start_twice_fails_with_already_running() {
        let core = started_core();
        let err = core.start(&StartOptions::default()).unwrap_err();
        assert!(matches!(err, ShellError::AlreadyRunning));
        assert!(core.begin_stop());
        core.finish_stop().await;
    }

    #[tokio::test]
    async fn start_rejects_zero_dimensions() {
        let core = ShellCore::new();
        let options = StartOptions {
            terminal_width: 0,
            ..StartOptions::default()
        };
        let err = core.start(&options).unwrap_err();
        assert!(matches!(err, ShellError::InvalidArgument(_)));
        assert!(!core.is_running());
    }

    #[tokio::test]
    async fn events_delivered_in_enqueue_order() {
        let core = started_core();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        core.subscribe_output(move |event: &OutputEvent| {
            seen_clone.lock().unwrap().push(event.data.clone());
            Ok(())
        });

        for i in 0..50u8 {
            core.enqueue_bytes(vec![i], OutputKind::Stdout).unwrap();
        }
        assert!(core.begin_stop());
        core.finish_stop().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        for (i, data) in seen.iter().enumerate() {
            assert_eq!(data, &vec![i as u8]);
        }
    }

    #[tokio::test]
    async fn stop_drains_queue_before_terminated_fires() {
        let core = started_core();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_out = Arc::clone(&order);
        core.subscribe_output(move |event: &OutputEvent| {
            order_out
                .lock()
                .unwrap()
                .push(format!("out:{}", String::from_utf8_lossy(&event.data)));
            Ok(())
        });
        let order_term = Arc::clone(&order);
        core.subscribe_terminated(move |event: &TerminatedEvent| {
            order_term
                .lock()
                .unwrap()
                .push(format!("terminated:{}", event.exit_code));
            Ok(())
        });

        core.enqueue_text("a", OutputKind::Stdout).unwrap();
        core.enqueue_text("b", OutputKind::Stderr).unwrap();
        assert!(core.begin_stop());
        core.finish_stop().await;

        assert_eq!(
            *order.lock().unwrap(),
            vec!["out:a", "out:b", "terminated:0"]
        );
    }

    #[tokio::test]
    async fn enqueue_after_stop_fails_with_not_running() {
        let core = started_core();
        assert!(core.begin_stop());
        core.finish_stop().await;
        let err = core.enqueue_text("late", OutputKind::Stdout).unwrap_err();
        assert!(matches!(err, ShellError::NotRunning));
    }

    #[tokio::test]
    async fn second_stop_is_a_no_op() {
        let core = started_core();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        core.subscribe_terminated(move |_: &TerminatedEvent| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(core.begin_stop());
        core.finish_stop().await;
        assert!(!core.begin_stop());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abort_start_fires_no_terminated_event() {
        let core = started_core();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        core.subscribe_terminated(move |_: &TerminatedEvent| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        core.abort_start().await;
        assert!(!core.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_output_listener_does_not_stall_the_pump() {
        let core = started_core();
        let good = Arc::new(AtomicUsize::new(0));

        core.subscribe_output(|_: &OutputEvent| anyhow::bail!("listener exploded"));
        let good_clone = Arc::clone(&good);
        core.subscribe_output(move |_: &OutputEvent| {
            good_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        core.enqueue_text("x", OutputKind::Stdout).unwrap();
        core.enqueue_text("y", OutputKind::Stdout).unwrap();
        assert!(core.begin_stop());
        core.finish_stop().await;

        assert_eq!(good.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disposed_core_rejects_start() {
        let core = ShellCore::new();
        core.mark_disposed();
        let err = core.start(&StartOptions::default()).unwrap_err();
        assert!(matches!(err, ShellError::Disposed));
    }

    #[tokio::test]
    async fn restart_after_stop_gets_a_fresh_queue() {
        let core = started_core();
        assert!(core.begin_stop());
        core.finish_stop().await;

        core.start(&StartOptions::default()).unwrap();
        assert!(core.is_running());
        core.enqueue_text("fresh", OutputKind::Stdout).unwrap();
        assert!(core.begin_stop());
        core.finish_stop().await;
    }
}
