use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::event::Event;
use crate::handle::SchedulerHandle;
use crate::invocation::Invocation;

/// Runs the single-threaded scheduler loop: consumes events off
/// `event_rx`, matches them against the registry under `handle`, and pushes
/// any resulting invocations onto `dispatch_tx`.
///
/// Shaped after the reference `wf-reactor` scheduler's `tokio::select!`
/// event loop, but deliberately *not* its per-engine `JoinSet` fan-out:
/// here the registry lock is held across the whole per-event pass over
/// every function, sequentially, by design — there is exactly one
/// scheduler thread and no per-function concurrency to bound with a
/// semaphore.
pub async fn run_scheduler_loop(
    handle: SchedulerHandle,
    mut event_rx: mpsc::Receiver<Event>,
    dispatch_tx: mpsc::Sender<Invocation>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("scheduler loop draining remaining events before shutdown");
                drain_remaining(&handle, &mut event_rx, &dispatch_tx).await;
                if let Err(err) = handle.checkpoint_now().await {
                    error!(error = %err, "final checkpoint on shutdown failed");
                }
                break;
            }

            event = event_rx.recv() => {
                match event {
                    Some(event) => process_one(&handle, event, &dispatch_tx).await,
                    None => {
                        info!("event queue closed, scheduler loop exiting");
                        break;
                    }
                }
            }
        }
    }
}

async fn process_one(handle: &SchedulerHandle, event: Event, dispatch_tx: &mpsc::Sender<Invocation>) {
    let invocations = {
        let registry_arc = handle.registry_arc();
        let mut registry = registry_arc.lock().await;
        let checkpoint = handle.checkpoint_store();
        registry.dispatch_event(event, &checkpoint)
    };

    for invocation in invocations {
        if dispatch_tx.send(invocation).await.is_err() {
            warn!("dispatch queue closed while handing off a ready invocation");
            break;
        }
    }
}

async fn drain_remaining(
    handle: &SchedulerHandle,
    event_rx: &mut mpsc::Receiver<Event>,
    dispatch_tx: &mpsc::Sender<Invocation>,
) {
    while let Ok(event) = event_rx.try_recv() {
        process_one(handle, event, dispatch_tx).await;
    }
}
