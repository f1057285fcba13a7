//! Row-change feed.
//!
//! Database triggers publish every insert, update and delete on the four
//! application tables to the `row_changes` channel. `run_listener` forwards
//! those notifications onto an in-process broadcast bus which the SSE
//! endpoints subscribe to. Delivery is best effort: a slow subscriber that
//! falls behind the channel capacity skips events.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;

pub const CHANGE_CHANNEL: &str = "row_changes";
const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Cvs,
    Interviews,
    Messages,
    JobPostings,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Cvs => "cvs",
            Table::Interviews => "interviews",
            Table::Messages => "messages",
            Table::JobPostings => "job_postings",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "cvs" => Some(Table::Cvs),
            "interviews" => Some(Table::Interviews),
            "messages" => Some(Table::Messages),
            "job_postings" => Some(Table::JobPostings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// Payload emitted by the `notify_row_change` trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct RowChange {
    pub table: Table,
    pub action: ChangeAction,
    pub record_id: Option<Uuid>,
    pub cv_id: Option<Uuid>,
    /// Owner of the row, only sent for `cvs`.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub table: Table,
    pub action: ChangeAction,
    pub record_id: Option<Uuid>,
    pub cv_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(change: RowChange) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            table: change.table,
            action: change.action,
            record_id: change.record_id,
            cv_id: change.cv_id,
            user_id: change.user_id,
            received_at: Utc::now(),
        }
    }

    /// SSE `event:` name, e.g. `cvs.update`.
    pub fn name(&self) -> String {
        let action = match self.action {
            ChangeAction::Insert => "insert",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        };
        format!("{}.{}", self.table.as_str(), action)
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

pub fn parse_notification(payload: &str) -> Result<ChangeEvent> {
    let change: RowChange = serde_json::from_str(payload)?;
    Ok(ChangeEvent::new(change))
}

/// Reconnect delay: doubles per failure up to a ceiling, back to the floor once attached.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    const FLOOR: Duration = Duration::from_secs(1);
    const CEILING: Duration = Duration::from_secs(30);

    fn new() -> Self {
        Self {
            current: Self::FLOOR,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(Self::CEILING);
        delay
    }

    fn reset(&mut self) {
        self.current = Self::FLOOR;
    }
}

async fn listen_once(pool: &PgPool, bus: &EventBus, backoff: &mut Backoff) -> Result<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    backoff.reset();
    tracing::info!(channel = CHANGE_CHANNEL, "realtime listener attached");

    loop {
        let notification = listener.recv().await?;
        match parse_notification(notification.payload()) {
            Ok(event) => {
                tracing::debug!(event = %event.name(), record_id = ?event.record_id, "row change");
                bus.publish(event);
            }
            Err(e) => {
                tracing::warn!(error = %e, payload = notification.payload(), "unreadable row change");
            }
        }
    }
}

/// Keeps a listener attached for the life of the process, backing off between reconnects.
pub async fn run_listener(pool: PgPool, bus: EventBus) {
    let mut backoff = Backoff::new();
    loop {
        if let Err(e) = listen_once(&pool, &bus, &mut backoff).await {
            tracing::error!(error = ?e, "realtime listener error");
        }
        tokio::time::sleep(backoff.next_delay()).await;
    }
}
