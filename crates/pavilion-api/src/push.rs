//! Push connection manager.
//!
//! Owns at most one live WebSocket connection per process, bound to the
//! authenticated user.  The connection runs in a dedicated tokio task;
//! inbound frames are fanned out on a broadcast channel and a small
//! command channel handles teardown, mirroring the command/notification
//! split used elsewhere in the workspace.
//!
//! Delivery is at-most-once: nothing is buffered while disconnected, and
//! gaps across reconnects are expected.  Reconnection is bounded — a fixed
//! delay between attempts, a fixed number of attempts, counter reset on
//! every successful connect.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use pavilion_shared::constants::{PUSH_MAX_RETRIES, PUSH_RETRY_DELAY_SECS};
use pavilion_shared::events::{ChatPushPayload, NotificationPayload, PushFrame};
use pavilion_shared::types::UserId;

/// Events fanned out to every subscriber of the push connection.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// The transport connected (or reconnected).
    Open,
    /// The transport closed and will not reconnect.
    Closed { reason: String },
    /// A transport-level error; reconnection may still follow.
    Error(String),
    /// A server-originated notification.
    Notification(NotificationPayload),
    /// A chat message authored by another user.
    ChatMessage(ChatPushPayload),
}

/// Connection settings.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// WebSocket endpoint, e.g. `wss://host/push`.
    pub url: String,
    /// Maximum consecutive reconnect attempts.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl PushConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_retries: PUSH_MAX_RETRIES,
            retry_delay: Duration::from_secs(PUSH_RETRY_DELAY_SECS),
        }
    }
}

/// Handle to the live connection.  Cloneable; every clone subscribes to
/// the same event stream.
#[derive(Debug, Clone)]
pub struct PushHandle {
    user_id: UserId,
    events: broadcast::Sender<PushEvent>,
    cmd_tx: mpsc::Sender<PushCommand>,
}

impl PushHandle {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Subscribe to the event stream.  Each receiver sees every event from
    /// its subscription point on; lagging receivers drop the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }
}

#[derive(Debug)]
enum PushCommand {
    Shutdown,
}

struct ActiveConnection {
    handle: PushHandle,
    task: JoinHandle<()>,
}

/// Process-wide owner of the single push connection.
pub struct PushManager {
    config: PushConfig,
    active: Mutex<Option<ActiveConnection>>,
}

impl PushManager {
    pub fn new(config: PushConfig) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    /// Connect for `user_id`.
    ///
    /// Calling again for the same user while connected is a no-op that
    /// returns the existing handle.  Calling for a *different* user tears
    /// the old connection down first, so no event of the previous session
    /// can leak into the new one.  Never fails synchronously: transport
    /// errors surface as [`PushEvent::Error`] / [`PushEvent::Closed`].
    pub async fn connect(&self, user_id: UserId, token: String) -> PushHandle {
        let mut guard = self.active.lock().await;

        if let Some(active) = guard.as_ref() {
            if active.handle.user_id == user_id && !active.task.is_finished() {
                debug!(user = %user_id, "Push connection already live, reusing handle");
                return active.handle.clone();
            }
        }
        if let Some(old) = guard.take() {
            info!(old_user = %old.handle.user_id, "Tearing down previous push connection");
            shutdown(old).await;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(256);
        let handle = PushHandle {
            user_id: user_id.clone(),
            events: event_tx.clone(),
            cmd_tx,
        };
        let task = tokio::spawn(run_connection(
            self.config.clone(),
            user_id,
            token,
            event_tx,
            cmd_rx,
        ));

        *guard = Some(ActiveConnection {
            handle: handle.clone(),
            task,
        });
        handle
    }

    /// Tear down the connection if one exists.  Safe to call repeatedly.
    pub async fn disconnect(&self) {
        if let Some(old) = self.active.lock().await.take() {
            info!(user = %old.handle.user_id, "Push disconnect requested");
            shutdown(old).await;
        }
    }

    /// The user the current connection is bound to, if any.
    pub async fn current_user(&self) -> Option<UserId> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.handle.user_id.clone())
    }
}

async fn shutdown(active: ActiveConnection) {
    // The task may already have exited (retries exhausted); a failed send
    // is fine.
    let _ = active.handle.cmd_tx.send(PushCommand::Shutdown).await;
    let _ = active.task.await;
}

/// Connection task: connect, drain frames, reconnect on failure with a
/// fixed delay until the attempt budget runs out or shutdown is requested.
async fn run_connection(
    config: PushConfig,
    user_id: UserId,
    token: String,
    events: broadcast::Sender<PushEvent>,
    mut cmd_rx: mpsc::Receiver<PushCommand>,
) {
    let url = format!("{}?userId={}&token={}", config.url, user_id, token);
    let mut attempts: u32 = 0;

    loop {
        match connect_async(&url).await {
            Ok((stream, _response)) => {
                attempts = 0;
                info!(user = %user_id, "Push channel connected");
                let _ = events.send(PushEvent::Open);

                let (mut write, mut read) = stream.split();
                loop {
                    tokio::select! {
                        cmd = cmd_rx.recv() => {
                            // Shutdown, or all handles dropped.
                            debug!(cmd = ?cmd, "Push connection shutting down");
                            let _ = write.send(Message::Close(None)).await;
                            let _ = events.send(PushEvent::Closed {
                                reason: "disconnected".to_string(),
                            });
                            return;
                        }
                        frame = read.next() => {
                            match frame {
                                Some(Ok(Message::Text(text))) => {
                                    dispatch_frame(text.as_str(), &events);
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    let _ = write.send(Message::Pong(data)).await;
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!(user = %user_id, "Push channel closed by server");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!(user = %user_id, error = %e, "Push channel error");
                                    let _ = events.send(PushEvent::Error(e.to_string()));
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!(user = %user_id, error = %e, "Push connect failed");
                let _ = events.send(PushEvent::Error(e.to_string()));
            }
        }

        attempts += 1;
        if attempts > config.max_retries {
            warn!(user = %user_id, attempts, "Push reconnect attempts exhausted");
            let _ = events.send(PushEvent::Closed {
                reason: "reconnect attempts exhausted".to_string(),
            });
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.retry_delay) => {}
            _ = cmd_rx.recv() => {
                let _ = events.send(PushEvent::Closed {
                    reason: "disconnected".to_string(),
                });
                return;
            }
        }
    }
}

/// Decode one text frame and fan it out.  Malformed frames are logged and
/// dropped — the push layer never mutates local state itself.
fn dispatch_frame(text: &str, events: &broadcast::Sender<PushEvent>) {
    match serde_json::from_str::<PushFrame>(text) {
        Ok(PushFrame::Notification(payload)) => {
            let _ = events.send(PushEvent::Notification(payload));
        }
        Ok(PushFrame::GlobalChatNotification(payload)) => {
            let _ = events.send(PushEvent::ChatMessage(payload));
        }
        Err(e) => {
            warn!(error = %e, len = text.len(), "Dropping undecodable push frame");
        }
    }
}
