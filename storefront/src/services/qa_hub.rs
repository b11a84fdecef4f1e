//! In-process publish/subscribe hub for product Q&A topics.

use crate::models::{QaLikeUpdate, QaMessage};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

pub fn qa_topic(product_id: Uuid) -> String {
  format!("/topic/product/{}/qa", product_id)
}

pub fn like_topic(product_id: Uuid) -> String {
  format!("/topic/product/{}/qa/like", product_id)
}

/// One message on one topic; the payload is already JSON-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicEvent {
  pub topic: String,
  pub payload: Arc<str>,
}

#[derive(Debug, Clone)]
pub struct QaHub {
  sender: broadcast::Sender<TopicEvent>,
}

impl Default for QaHub {
  fn default() -> Self {
    Self::new(DEFAULT_CAPACITY)
  }
}

impl QaHub {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Self { sender }
  }

  /// Broadcasts `payload` on `topic`; returns how many subscribers received it.
  pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> serde_json::Result<usize> {
    let payload: Arc<str> = serde_json::to_string(payload)?.into();
    let event = TopicEvent {
      topic: topic.to_string(),
      payload,
    };
    // No receivers is not an error; nobody is watching this product right now.
    let delivered = self.sender.send(event).unwrap_or(0);
    tracing::debug!(%topic, delivered, "Published Q&A event.");
    Ok(delivered)
  }

  pub fn publish_question(&self, message: &QaMessage) -> serde_json::Result<usize> {
    self.publish(&qa_topic(message.product_id), message)
  }

  pub fn publish_like(&self, update: &QaLikeUpdate) -> serde_json::Result<usize> {
    self.publish(&like_topic(update.product_id), update)
  }

  pub fn subscriber_count(&self) -> usize {
    self.sender.receiver_count()
  }

  /// Payloads published on `topic` from now on. Lagging subscribers skip what they missed.
  pub fn subscribe(&self, topic: String) -> impl Stream<Item = Arc<str>> + Send + 'static {
    BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| {
      let out = match item {
        Ok(event) if event.topic == topic => Some(event.payload),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
          tracing::warn!(%topic, skipped, "Q&A subscriber lagged; skipping missed events.");
          None
        }
      };
      std::future::ready(out)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn subscribers_only_see_their_topic() {
    let hub = QaHub::new(16);
    let product_a = Uuid::new_v4();
    let product_b = Uuid::new_v4();
    let mut stream_a = Box::pin(hub.subscribe(qa_topic(product_a)));

    let msg_b = QaMessage {
      product_id: product_b,
      user_name: "Hà".into(),
      question: "Còn hàng không?".into(),
      ..Default::default()
    };
    let msg_a = QaMessage {
      product_id: product_a,
      ..msg_b.clone()
    };
    assert_eq!(hub.publish_question(&msg_b).unwrap(), 1);
    hub.publish_question(&msg_a).unwrap();

    let got = tokio::time::timeout(Duration::from_secs(1), stream_a.next()).await.unwrap().unwrap();
    let decoded: QaMessage = serde_json::from_str(&got).unwrap();
    assert_eq!(decoded.product_id, product_a);
  }

  #[tokio::test]
  async fn lagged_subscriber_keeps_streaming() {
    let hub = QaHub::new(2);
    let product = Uuid::new_v4();
    let topic = like_topic(product);
    let mut stream = Box::pin(hub.subscribe(topic.clone()));

    for likes in 0..5 {
      hub
        .publish_like(&QaLikeUpdate {
          id: Uuid::nil(),
          product_id: product,
          likes_count: likes,
        })
        .unwrap();
    }

    let got = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
    let decoded: QaLikeUpdate = serde_json::from_str(&got).unwrap();
    assert_eq!(decoded.likes_count, 3);
  }

  #[test]
  fn publishing_without_subscribers_is_fine() {
    let hub = QaHub::default();
    assert_eq!(hub.publish("/topic/product/x/qa", &"hello").unwrap(), 0);
    assert_eq!(hub.subscriber_count(), 0);
  }
}
