//! The single worker task that drives turns.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::turn::TurnScheduler;

/// Starts the conversation; cheap to clone into request handlers.
#[derive(Clone)]
pub struct ConversationHandle {
    started: Arc<watch::Sender<bool>>,
}

impl ConversationHandle {
    /// Request the conversation to start. Only the first call has an effect.
    pub fn start(&self) -> bool {
        let first = self.started.send_if_modified(|started| {
            if *started {
                false
            } else {
                *started = true;
                true
            }
        });
        if first {
            info!("Conversation start requested");
        }
        first
    }

    pub fn is_started(&self) -> bool {
        *self.started.borrow()
    }
}

/// Spawn the turn loop. It idles until [`ConversationHandle::start`] and then
/// runs until the process exits.
pub fn spawn(scheduler: TurnScheduler) -> (ConversationHandle, JoinHandle<()>) {
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(run(scheduler, rx));
    (
        ConversationHandle {
            started: Arc::new(tx),
        },
        task,
    )
}

async fn run(mut scheduler: TurnScheduler, mut started: watch::Receiver<bool>) {
    let start_requested = started.wait_for(|started| *started).await.is_ok();
    if !start_requested {
        return;
    }

    scheduler.begin_session();
    tokio::time::sleep(scheduler.settings().first_turn_delay).await;

    loop {
        let position = scheduler.position();
        let outcome = AssertUnwindSafe(scheduler.execute_turn())
            .catch_unwind()
            .await;

        let delay = match outcome {
            Ok(Ok(_)) => scheduler.next_delay(),
            Ok(Err(e)) if e.is_fatal() => {
                error!(
                    position,
                    error = %e.format_for_log(),
                    "Turn failed on a configuration problem, retrying same speaker"
                );
                scheduler.settings().retry_delay
            }
            Ok(Err(e)) => {
                warn!(
                    position,
                    error = %e.format_for_log(),
                    retryable = e.is_retryable(),
                    "Turn failed, retrying same speaker"
                );
                scheduler.settings().retry_delay
            }
            Err(panic) => {
                error!(
                    position,
                    panic = %panic_message(panic.as_ref()),
                    "Turn panicked, retrying same speaker"
                );
                scheduler.settings().retry_delay
            }
        };

        tokio::time::sleep(delay).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
