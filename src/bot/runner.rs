//! Long-polling loop.
//!
//! Updates are fetched in batches and each one is handled on its own task, so
//! a slow model call for one user never holds up anyone else. Updates from the
//! same user run one at a time, in the order Telegram delivered them.

use super::handlers::handle_message;
use crate::AppState;
use crate::telegram::TelegramClient;
use crate::telegram::types::{InboundMessage, TelegramUpdate};
use crate::types::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Pause after a failed getUpdates call
const POLL_BACKOFF: Duration = Duration::from_secs(5);
/// How long in-flight handlers may finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Spawns one handler task per update and tracks them until shutdown.
///
/// Each user has a chain of handlers: a new task waits for the completion
/// signal of that user's previous task before it starts.
pub struct Dispatcher {
    state: AppState,
    tasks: JoinSet<()>,
    /// Completion signal of the most recently dispatched task per user
    tails: HashMap<String, oneshot::Receiver<()>>,
}

impl Dispatcher {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            tasks: JoinSet::new(),
            tails: HashMap::new(),
        }
    }

    /// Start handling an update. Returns `false` when the update carries
    /// nothing Aria acts on.
    pub fn dispatch(&mut self, update: TelegramUpdate) -> bool {
        let update_id = update.update_id;
        let Some(message) = InboundMessage::from_update(update) else {
            debug!(update_id, "Ignoring unsupported update");
            return false;
        };

        let span = info_span!("update", update_id, user_id = %message.user_id);
        let state = self.state.clone();
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.tails.insert(message.user_id.clone(), done_rx);
        self.tasks.spawn(
            async move {
                // A predecessor that panicked or was aborted drops its sender
                if let Some(previous) = previous {
                    previous.await.ok();
                }
                handle_message(&state, message).await;
                done_tx.send(()).ok();
            }
            .instrument(span),
        );
        true
    }

    /// Collect finished handlers without waiting.
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                error!(error = %e, "Update handler panicked");
            }
        }
        // Users whose last handler finished no longer need a chain entry
        self.tails
            .retain(|_, done| matches!(done.try_recv(), Err(TryRecvError::Empty)));
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait up to `grace` for in-flight handlers, then abort the rest.
    pub async fn drain(&mut self, grace: Duration) {
        let tasks = &mut self.tasks;
        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Update handler panicked");
                }
            }
        })
        .await;

        if finished.is_err() {
            warn!(remaining = self.tasks.len(), "Aborting unfinished handlers");
            self.tasks.shutdown().await;
        }
        self.tails.clear();
    }
}

/// Poll Telegram until Ctrl-C.
pub async fn run(state: AppState, client: &TelegramClient) -> Result<()> {
    let me = client.get_me().await?;
    info!(
        bot = %me.username.as_deref().unwrap_or("unknown"),
        model = %state.llm.model_name(),
        max_history = state.memory.max_history(),
        "Connected to Telegram"
    );

    if state.access.is_open() {
        warn!("No allow-list configured; the bot answers everyone");
    }

    // Messages sent while the bot was offline are not answered
    if let Err(e) = client.drop_pending_updates().await {
        warn!(error = %e, "Could not drop pending updates");
    }

    let mut dispatcher = Dispatcher::new(state);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Polling for updates");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            result = client.get_updates() => match result {
                Ok(updates) => {
                    for update in updates {
                        dispatcher.dispatch(update);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Telegram polling error");
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("Shutdown signal received");
                            break;
                        }
                        _ = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
            },
        }

        dispatcher.reap();
    }

    dispatcher.drain(SHUTDOWN_GRACE).await;
    info!("Polling stopped");
    Ok(())
}
