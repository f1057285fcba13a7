//! Server-sent change events.
//!
//! Each frame carries `event: <table>.<action>`, `id: evt_...` and the
//! serialized `ChangeEvent` as data. A comment heartbeat goes out every
//! 15 seconds; a subscriber that falls behind receives a `_warning` event
//! naming how many changes it skipped.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    middleware::auth::Claims,
    services::realtime::{ChangeEvent, Table},
    AppState,
};

const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminEventsQuery {
    /// Comma-separated table names, e.g. `cvs,interviews`.
    pub tables: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScope {
    /// Staff see every row change, optionally limited to some tables.
    Staff { tables: Option<Vec<Table>> },
    /// Applicants see their own CV's rows and job posting changes.
    Applicant { user_id: String, cv_id: Option<Uuid> },
}

impl EventScope {
    pub fn staff(tables: Option<&str>) -> Result<Self> {
        let tables = match tables.map(str::trim).filter(|t| !t.is_empty()) {
            None => None,
            Some(raw) => {
                let mut parsed = Vec::new();
                for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    let table = Table::parse(name)
                        .ok_or_else(|| Error::BadRequest(format!("Unknown table: {}", name)))?;
                    if !parsed.contains(&table) {
                        parsed.push(table);
                    }
                }
                Some(parsed)
            }
        };
        Ok(EventScope::Staff { tables })
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            EventScope::Staff { tables: None } => true,
            EventScope::Staff { tables: Some(tables) } => tables.contains(&event.table),
            EventScope::Applicant { cv_id, .. } => {
                event.table == Table::JobPostings
                    || (cv_id.is_some() && event.cv_id == *cv_id)
            }
        }
    }

    /// Like `matches`, but an applicant scope follows the caller's CV when it
    /// is submitted (or resubmitted) after the stream opened.
    pub fn admit(&mut self, event: &ChangeEvent) -> bool {
        if let EventScope::Applicant { user_id, cv_id } = self {
            if event.table == Table::Cvs && event.user_id.as_deref() == Some(user_id.as_str()) {
                *cv_id = event.cv_id;
            }
        }
        self.matches(event)
    }
}

fn event_stream(
    mut rx: broadcast::Receiver<ChangeEvent>,
    mut scope: EventScope,
) -> impl Stream<Item = std::result::Result<SseEvent, Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !scope.admit(&event) {
                        continue;
                    }
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to serialize change event");
                            continue;
                        }
                    };
                    yield Ok(SseEvent::default()
                        .event(event.name())
                        .id(event.id.clone())
                        .data(json));
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "sse subscriber lagged");
                    yield Ok(SseEvent::default()
                        .event("_warning")
                        .data(format!("{{\"message\":\"lagged, skipped {} events\"}}", n)));
                }
                Err(RecvError::Closed) => {
                    tracing::info!("event bus closed, ending stream");
                    break;
                }
            }
        }
    }
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT).text("heartbeat")
}

#[utoipa::path(
    get,
    path = "/api/admin/events",
    params(("tables" = Option<String>, Query, description = "Comma-separated: cvs, interviews, messages, job_postings")),
    responses(
        (status = 200, description = "text/event-stream of row changes"),
        (status = 400, description = "Unknown table name")
    ),
    security(("bearer" = []))
)]
pub async fn admin_events(
    State(state): State<AppState>,
    Query(query): Query<AdminEventsQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    let scope = EventScope::staff(query.tables.as_deref())?;
    tracing::info!(tables = query.tables.as_deref().unwrap_or("*"), "staff sse client connected");
    let rx = state.events.subscribe();
    Ok(Sse::new(event_stream(rx, scope)).keep_alive(keep_alive()))
}

#[utoipa::path(
    get,
    path = "/api/me/events",
    responses((status = 200, description = "text/event-stream of the caller's CV changes and job postings")),
    security(("bearer" = []))
)]
pub async fn applicant_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    let cv_id = match state.cv_service.get_by_user(&claims.sub).await {
        Ok(cv) => Some(cv.id),
        Err(Error::NotFound(_)) => None,
        Err(e) => return Err(e),
    };
    tracing::info!(sub = %claims.sub, cv_id = ?cv_id, "applicant sse client connected");
    let rx = state.events.subscribe();
    let scope = EventScope::Applicant {
        user_id: claims.sub,
        cv_id,
    };
    Ok(Sse::new(event_stream(rx, scope)).keep_alive(keep_alive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::realtime::{ChangeAction, EventBus, RowChange};
    use futures::StreamExt;

    fn event(table: Table, cv_id: Option<Uuid>) -> ChangeEvent {
        ChangeEvent::new(RowChange {
            table,
            action: ChangeAction::Update,
            record_id: Some(Uuid::new_v4()),
            cv_id,
            user_id: None,
        })
    }

    fn cv_inserted(cv_id: Uuid, user_id: &str) -> ChangeEvent {
        ChangeEvent::new(RowChange {
            table: Table::Cvs,
            action: ChangeAction::Insert,
            record_id: Some(cv_id),
            cv_id: Some(cv_id),
            user_id: Some(user_id.to_string()),
        })
    }

    fn applicant(user_id: &str, cv_id: Option<Uuid>) -> EventScope {
        EventScope::Applicant {
            user_id: user_id.to_string(),
            cv_id,
        }
    }

    #[test]
    fn staff_without_filter_sees_everything() {
        let scope = EventScope::staff(None).unwrap();
        assert!(scope.matches(&event(Table::Messages, Some(Uuid::new_v4()))));
        assert!(scope.matches(&event(Table::JobPostings, None)));
    }

    #[test]
    fn staff_table_filter() {
        let scope = EventScope::staff(Some("cvs, interviews,cvs")).unwrap();
        assert_eq!(
            scope,
            EventScope::Staff {
                tables: Some(vec![Table::Cvs, Table::Interviews])
            }
        );
        assert!(scope.matches(&event(Table::Interviews, None)));
        assert!(!scope.matches(&event(Table::Messages, None)));
    }

    #[test]
    fn staff_rejects_unknown_table() {
        assert!(matches!(
            EventScope::staff(Some("cvs,users")),
            Err(Error::BadRequest(_))
        ));
        assert_eq!(EventScope::staff(Some("  ")).unwrap(), EventScope::Staff { tables: None });
    }

    #[test]
    fn applicant_sees_own_rows_and_job_postings() {
        let mine = Uuid::new_v4();
        let scope = applicant("user-1", Some(mine));
        assert!(scope.matches(&event(Table::Messages, Some(mine))));
        assert!(scope.matches(&event(Table::JobPostings, None)));
        assert!(!scope.matches(&event(Table::Messages, Some(Uuid::new_v4()))));
        assert!(!scope.matches(&event(Table::Cvs, None)));
    }

    #[test]
    fn applicant_without_cv_only_sees_job_postings() {
        let scope = applicant("user-1", None);
        assert!(scope.matches(&event(Table::JobPostings, None)));
        assert!(!scope.matches(&event(Table::Cvs, None)));
    }

    #[test]
    fn applicant_scope_follows_cv_submitted_after_connect() {
        let mut scope = applicant("user-1", None);
        let theirs = Uuid::new_v4();
        let mine = Uuid::new_v4();

        assert!(!scope.admit(&cv_inserted(theirs, "user-2")));
        assert!(!scope.admit(&event(Table::Messages, Some(mine))));

        assert!(scope.admit(&cv_inserted(mine, "user-1")));
        assert_eq!(scope, applicant("user-1", Some(mine)));
        assert!(scope.admit(&event(Table::Messages, Some(mine))));
        assert!(!scope.admit(&event(Table::Messages, Some(theirs))));
    }

    #[tokio::test]
    async fn stream_skips_filtered_events() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let scope = EventScope::staff(Some("interviews")).unwrap();
        let stream = event_stream(rx, scope);
        futures::pin_mut!(stream);

        bus.publish(event(Table::Cvs, None));
        bus.publish(event(Table::Interviews, None));

        let first = stream.next().await;
        assert!(matches!(first, Some(Ok(_))));
        // Only the interview change was queued for delivery.
        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
