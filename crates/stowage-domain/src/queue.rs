use async_trait::async_trait;

use crate::error::DomainResult;
use crate::reading::RawReading;

/// Producer side of the per-subscriber bounded reading buffer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingProducer: Send + Sync {
    /// Route a reading to the subscriber's lane, keyed by subscriber
    /// identity. The drop-oldest eviction at fixed capacity is a property
    /// of the underlying queue declaration, not of this call.
    async fn publish(&self, subscriber_id: &str, reading: &RawReading) -> DomainResult<()>;
}

/// Consumer side of the per-subscriber bounded reading buffer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingDrain: Send + Sync {
    /// Destructively consume everything buffered for the subscriber at call
    /// time, bounded by the snapshot count taken at drain start, the queue
    /// capacity, and a deadline. Consumed readings are never redelivered.
    ///
    /// Fails with `QueueEmpty` when nothing is buffered. Concurrent drains
    /// against the same subscriber are safe at the broker level (each
    /// reading is delivered once) but each call observes only a subset.
    async fn drain(&self, subscriber_id: &str) -> DomainResult<Vec<RawReading>>;
}
