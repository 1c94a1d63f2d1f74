//! Security event feed: snapshot endpoint and live SSE stream

use axum::{
    extract::{Query, State},
    response::{
        Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use rampart_core::application::ApplicationError;
use rampart_core::domain::SecurityEvent;
use rampart_core::infrastructure::SecurityEventLog;

use crate::presentation::controllers::GatewayState;
use crate::presentation::middleware::application_error_to_response;
use crate::presentation::models::{SecurityEventsQuery, SecurityEventsResponse};

/// GET /admin/security/events?limit=N
pub async fn list_security_events(
    State(state): State<GatewayState>,
    Query(query): Query<SecurityEventsQuery>,
) -> Result<Json<SecurityEventsResponse>, Response> {
    let limit = query.limit.unwrap_or(state.config.events.snapshot_size);
    let events = state
        .events
        .recent(limit)
        .await
        .map_err(|e| application_error_to_response(ApplicationError::from(e)))?;

    Ok(Json(SecurityEventsResponse {
        count: events.len(),
        events,
    }))
}

fn to_sse(name: &'static str, data: &impl serde::Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

fn event_message(event: &SecurityEvent) -> Event {
    to_sse("event", event).id(event.id.to_string())
}

/// Poll the shared log and yield entries newer than the last one sent
fn poll_updates(
    log: Arc<SecurityEventLog>,
    last_id: u64,
    poll_interval: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    stream::unfold(
        (log, last_id, ticker),
        |(log, mut last_id, mut ticker)| async move {
            ticker.tick().await;
            let batch = match log.since(last_id).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::debug!(error = %e, "Security event poll failed");
                    Vec::new()
                }
            };
            if let Some(newest) = batch.iter().map(|e| e.id).max() {
                last_id = newest;
            }
            let messages: Vec<Result<Event, Infallible>> =
                batch.iter().map(|e| Ok(event_message(e))).collect();
            Some((stream::iter(messages), (log, last_id, ticker)))
        },
    )
    .flatten()
}

/// GET /admin/security/events/stream
///
/// Sends one `snapshot` event with the most recent entries, then `event`
/// messages as new entries appear. Polling goes through the shared store so
/// events recorded by any instance reach every subscriber.
pub async fn stream_security_events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let settings = &state.config.events;
    let snapshot = match state.events.recent(settings.snapshot_size).await {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load security event snapshot");
            Vec::new()
        }
    };
    let last_id = snapshot.iter().map(|e| e.id).max().unwrap_or(0);

    let first = to_sse("snapshot", &snapshot);
    let updates = poll_updates(
        state.events.clone(),
        last_id,
        Duration::from_millis(settings.poll_interval_ms.max(1)),
    );

    let stream = stream::once(async move { Ok::<Event, Infallible>(first) }).chain(updates);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(settings.heartbeat_seconds.max(1)))
            .text("heartbeat"),
    )
}
