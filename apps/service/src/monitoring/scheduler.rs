use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::executor::{FetchError, HttpProbe};
use super::types::{ProbeResult, Target};

/// Default buffer between the per-target loops and the consumer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("result sink is closed")]
pub struct SinkClosed;

/// Destination for the results of every monitor loop.
///
/// `publish` may wait (backpressure); only the calling loop waits with it.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn publish(&self, result: ProbeResult) -> Result<(), SinkClosed>;
}

#[async_trait::async_trait]
impl ResultSink for mpsc::Sender<ProbeResult> {
    async fn publish(&self, result: ProbeResult) -> Result<(), SinkClosed> {
        self.send(result).await.map_err(|_| SinkClosed)
    }
}

/// Consumer side of the fan-in channel.
///
/// Ends once every loop feeding it has stopped.
pub struct ResultStream {
    rx: mpsc::Receiver<ProbeResult>,
}

impl ResultStream {
    pub fn new(rx: mpsc::Receiver<ProbeResult>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<ProbeResult> {
        self.rx.recv().await
    }
}

impl futures::Stream for ResultStream {
    type Item = ProbeResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Monitoring scheduler - runs one independent loop per target
pub struct MonitoringScheduler<S> {
    sink: S,
    shutdown_tx: watch::Sender<bool>,
}

impl<S> MonitoringScheduler<S>
where
    S: ResultSink + Clone + 'static,
{
    pub fn new(sink: S) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { sink, shutdown_tx }
    }

    /// Start a loop for every target.
    ///
    /// All probes are built before anything is spawned, so an error leaves
    /// nothing running. The scheduler's own copy of the sink is dropped here:
    /// once the returned loops stop, the sink sees no more producers.
    pub fn start(self, targets: Vec<Target>) -> Result<MonitorHandle, FetchError> {
        let probes = targets.into_iter().map(HttpProbe::new).collect::<Result<Vec<_>, _>>()?;

        info!(count = probes.len(), "Starting monitor loops");

        let tasks = probes
            .into_iter()
            .map(|probe| {
                let sink = self.sink.clone();
                let shutdown = self.shutdown_tx.subscribe();
                tokio::spawn(monitor_loop(probe, sink, shutdown))
            })
            .collect();

        Ok(MonitorHandle { shutdown_tx: self.shutdown_tx, tasks })
    }
}

/// Start polling `targets` and return the merged result stream.
pub fn run(
    targets: Vec<Target>,
    capacity: usize,
) -> Result<(ResultStream, MonitorHandle), FetchError> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = MonitoringScheduler::new(tx).start(targets)?;
    Ok((ResultStream::new(rx), handle))
}

/// Lifecycle handle for the running loops.
///
/// Dropping it detaches the loops; they keep running until their sink closes.
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True once every loop has exited
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Ask every loop to stop and wait for them. In-flight fetches are abandoned.
    pub async fn shutdown(self) {
        info!(count = self.tasks.len(), "Stopping monitor loops");
        self.shutdown_tx.send_replace(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Monitor loop panicked: {}", e);
                }
            }
        }
    }
}

/// Resolves once shutdown was requested. Never resolves if the handle was dropped.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn monitor_loop<S: ResultSink>(
    probe: HttpProbe,
    sink: S,
    mut shutdown: watch::Receiver<bool>,
) {
    let target = probe.target();
    let period = target.interval;

    // First attempt one period after start; late ticks are dropped, not queued
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(target = %target, "Monitor loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            _ = timer.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                debug!(url = %target.url, "Abandoning in-flight fetch");
                break;
            }
            result = probe.fetch_once() => result,
        };

        debug!(
            url = %result.url,
            passed = result.passed,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Tick completed"
        );

        let published = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            published = sink.publish(result) => published,
        };

        if let Err(e) = published {
            warn!(url = %target.url, "Failed to publish check result: {}", e);
            break;
        }
    }

    debug!(url = %target.url, "Monitor loop stopped");
}
