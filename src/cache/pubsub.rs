//! Pub/Sub Module
//!
//! Per-key subscriber channels that receive every value written to the key.
//!
//! Publishing is synchronous with respect to the writer: `set` hands the
//! value to each subscriber in registration order and waits until that
//! subscriber has received it. A subscriber that stops reading stalls every
//! writer to its key. Read subscriptions under a timeout
//! (see [`Subscription::recv_timeout`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::trace;

use crate::cache::{Codec, JsonCodec};
use crate::error::{CacheError, Result};

/// Deliveries a subscriber channel holds while the writer waits for receipt.
const SUBSCRIBER_CAPACITY: usize = 1;

type Payload = Arc<[u8]>;

/// One update in flight, acknowledged by the subscriber on receipt.
#[derive(Debug)]
pub(crate) struct Delivery {
    payload: Payload,
    ack: oneshot::Sender<()>,
}

// == Subscribers ==
/// Registry of subscriber senders, keyed by cache key.
///
/// Senders are never removed; the receiving side owns the channel lifetime.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    channels: RwLock<HashMap<String, Vec<mpsc::Sender<Delivery>>>>,
}

impl Subscribers {
    /// Registers a new channel for `key` and returns its receiving end.
    pub(crate) async fn register(&self, key: &str) -> mpsc::Receiver<Delivery> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.channels
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Sends `payload` to every subscriber of `key`, in registration order.
    ///
    /// Waits for each subscriber to receive the update before moving on to
    /// the next one. Returns the number of subscribers that received it.
    pub(crate) async fn publish(&self, key: &str, payload: &Payload) -> usize {
        // Snapshot so registration is not blocked while we wait on receivers
        let senders = match self.channels.read().await.get(key) {
            Some(senders) => senders.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for tx in &senders {
            let (ack, received) = oneshot::channel();
            let delivery = Delivery {
                payload: Arc::clone(payload),
                ack,
            };

            if tx.send(delivery).await.is_err() {
                trace!("Subscriber for {} dropped its receiver, skipping", key);
                continue;
            }
            match received.await {
                Ok(()) => delivered += 1,
                Err(_) => trace!("Subscriber for {} dropped before receiving", key),
            }
        }
        trace!("Published update for {} to {} subscribers", key, delivered);
        delivered
    }

    /// Total number of registered channels across all keys.
    pub(crate) async fn count(&self) -> usize {
        self.channels.read().await.values().map(Vec::len).sum()
    }
}

// == Subscription ==
/// Receiving end of a key subscription.
///
/// Each update is the value passed to a `set`-family call on the key,
/// decoded with the cache's codec. Receiving an update releases the writer
/// that published it.
#[derive(Debug)]
pub struct Subscription<C: Codec = JsonCodec> {
    key: String,
    rx: mpsc::Receiver<Delivery>,
    codec: Arc<C>,
}

impl<C: Codec> Subscription<C> {
    pub(crate) fn new(key: String, rx: mpsc::Receiver<Delivery>, codec: Arc<C>) -> Self {
        Self { key, rx, codec }
    }

    /// The key this subscription listens to.
    pub fn key(&self) -> &str {
        &self.key
    }

    // == Recv ==
    /// Waits for the next update.
    ///
    /// Fails with [`CacheError::SubscriptionClosed`] once the cache is gone,
    /// or [`CacheError::Decode`] if the update is not a `T`.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        match self.rx.recv().await {
            Some(delivery) => self.accept(delivery),
            None => Err(CacheError::SubscriptionClosed(self.key.clone())),
        }
    }

    /// Like [`Subscription::recv`], bounded by `timeout`.
    pub async fn recv_timeout<T: DeserializeOwned>(&mut self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(delivery)) => self.accept(delivery),
            Ok(None) => Err(CacheError::SubscriptionClosed(self.key.clone())),
            Err(_) => Err(CacheError::RecvTimeout(self.key.clone())),
        }
    }

    /// Returns an update if a writer is already waiting to deliver one.
    pub fn try_recv<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        self.rx.try_recv().ok().map(|delivery| self.accept(delivery))
    }

    fn accept<T: DeserializeOwned>(&self, delivery: Delivery) -> Result<T> {
        // The writer may have given up waiting
        let _ = delivery.ack.send(());
        self.codec
            .decode(&delivery.payload)
            .map_err(|source| CacheError::Decode {
                key: self.key.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: &str) -> Payload {
        Arc::from(JsonCodec.encode(value).unwrap())
    }

    async fn subscription(subs: &Subscribers, key: &str) -> Subscription {
        let rx = subs.register(key).await;
        Subscription::new(key.to_string(), rx, Arc::new(JsonCodec))
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let subs = Subscribers::default();
        assert_eq!(subs.publish("k", &encoded("v")).await, 0);
        assert_eq!(subs.count().await, 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let subs = Subscribers::default();
        let mut first = subscription(&subs, "k").await;
        let mut second = subscription(&subs, "k").await;
        let _other = subs.register("other").await;
        assert_eq!(subs.count().await, 3);

        let payload = encoded("hello");
        let (delivered, a, b) = tokio::join!(
            subs.publish("k", &payload),
            first.recv::<String>(),
            second.recv::<String>()
        );

        assert_eq!(delivered, 2);
        assert_eq!(a.unwrap(), "hello");
        assert_eq!(b.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_publish_waits_for_receipt() {
        let subs = Subscribers::default();
        let mut sub = subscription(&subs, "k").await;
        let payload = encoded("v");

        let pending = tokio::time::timeout(Duration::from_millis(20), subs.publish("k", &payload));
        assert!(pending.await.is_err(), "publish should wait for the subscriber");

        // The abandoned delivery is still readable
        assert_eq!(sub.try_recv::<String>().unwrap().unwrap(), "v");
        assert!(sub.try_recv::<String>().is_none());
    }

    #[tokio::test]
    async fn test_publish_skips_dropped_receivers() {
        let subs = Subscribers::default();
        drop(subs.register("k").await);
        let mut live = subscription(&subs, "k").await;

        let payload = encoded("v");
        let (delivered, received) =
            tokio::join!(subs.publish("k", &payload), live.recv::<String>());

        assert_eq!(delivered, 1);
        assert_eq!(received.unwrap(), "v");
        // Senders stay registered
        assert_eq!(subs.count().await, 2);
    }

    #[tokio::test]
    async fn test_recv_timeout_and_closed() {
        let subs = Subscribers::default();
        let mut sub = subscription(&subs, "k").await;

        let err = sub
            .recv_timeout::<String>(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::RecvTimeout(ref k) if k == "k"));

        drop(subs);
        let err = sub.recv::<String>().await.unwrap_err();
        assert!(matches!(err, CacheError::SubscriptionClosed(_)));
    }

    #[tokio::test]
    async fn test_recv_decode_error() {
        let subs = Subscribers::default();
        let mut sub = subscription(&subs, "k").await;

        let payload = encoded("text");
        let (delivered, received) = tokio::join!(subs.publish("k", &payload), sub.recv::<u32>());

        // Receipt counts even when the subscriber cannot decode the value
        assert_eq!(delivered, 1);
        assert!(matches!(received.unwrap_err(), CacheError::Decode { .. }));
    }
}
