//! Stream broker: serves a run's delivery queue as Server-Sent Events.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use agentrun_core::{RunId, StatusEvent, WireFrame};

use crate::queue::{DeliveryQueue, Subscription};

/// Logs when an observer goes away, whether the stream ended or the
/// connection dropped.
struct Observer {
    run_id: RunId,
    subscription: Subscription,
}

impl Drop for Observer {
    fn drop(&mut self) {
        debug!(
            run_id = %self.run_id,
            delivered = self.subscription.position(),
            "Observer detached"
        );
    }
}

/// Ordered wire frames for one observer. Ends right after the status frame.
pub fn frames(queue: &DeliveryQueue) -> impl Stream<Item = WireFrame> + Send + 'static {
    let observer = Observer {
        run_id: queue.run_id().clone(),
        subscription: queue.subscribe(),
    };
    debug!(run_id = %observer.run_id, "Observer attached");

    stream::unfold(Some(observer), |observer| async move {
        let mut observer = observer?;
        let message = observer.subscription.next().await?;
        let frame = message.to_frame();
        let next = if message.is_done() { None } else { Some(observer) };
        Some((frame, next))
    })
}

/// Convert a wire frame into an SSE event.
pub fn to_sse(frame: WireFrame) -> Event {
    let result = match &frame {
        WireFrame::Data(event) => Event::default().json_data(event),
        WireFrame::Status(status) => Event::default()
            .event(StatusEvent::EVENT_NAME)
            .json_data(status),
    };
    result.unwrap_or_else(|e| {
        warn!(error = %e, frame = ?frame, "Failed to serialize SSE event");
        Event::default().comment("dropped unserializable event")
    })
}

/// SSE response streaming `queue` until its terminal status event.
pub fn serve(queue: &DeliveryQueue) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = frames(queue).map(|frame| Ok::<_, Infallible>(to_sse(frame)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrun_core::{DeliveryMessage, WireEvent};
    use serde_json::json;

    #[tokio::test]
    async fn test_frames_end_after_status() {
        let queue = DeliveryQueue::new(RunId::new("r"));
        queue.push(DeliveryMessage::chat(json!({"n": 1}))).unwrap();
        queue.push(DeliveryMessage::error("boom")).unwrap();
        queue.finish();

        let frames: Vec<WireFrame> = frames(&queue).collect().await;
        assert_eq!(
            frames,
            vec![
                WireFrame::Data(WireEvent::Chat { message: json!({"n": 1}) }),
                WireFrame::Data(WireEvent::Log {
                    message: "error: boom".to_string()
                }),
                WireFrame::Status(StatusEvent::done()),
            ]
        );
    }

    #[tokio::test]
    async fn test_two_observers_see_same_frames() {
        let queue = DeliveryQueue::new(RunId::new("r"));
        let first = frames(&queue);
        let second = frames(&queue);

        queue.push(DeliveryMessage::chat(json!("a"))).unwrap();
        queue.finish();

        let a: Vec<WireFrame> = first.collect().await;
        let b: Vec<WireFrame> = second.collect().await;
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dropped_observer_does_not_consume() {
        let queue = DeliveryQueue::new(RunId::new("r"));
        queue.push(DeliveryMessage::chat(json!("a"))).unwrap();
        {
            let mut early = Box::pin(frames(&queue));
            assert!(early.next().await.is_some());
        }
        queue.finish();

        let replay: Vec<WireFrame> = frames(&queue).collect().await;
        assert_eq!(replay.len(), 2);
    }
}
