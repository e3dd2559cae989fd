//! Realtime-database REST adapter
//!
//! Writes are plain HTTP verbs; subscriptions are Server-Sent Event streams.

mod client;
mod sse;

pub use client::{RestConfig, RestStore, StreamCache, StreamStep};
pub use sse::{SseDecoder, SseEvent};
