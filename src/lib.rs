//! feed-relay: posts new RSS/Atom entries to chat webhooks.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ channels ┌──────────────────┐ dispatch ┌──────────┐
//! │ poll.rs  │ ───────► │ ChannelProcessor │ ───────► │  queue   │
//! │ (ticker) │          │  dedup, fan-out  │          │ (mpsc)   │
//! └──────────┘          └──────────────────┘          └──────────┘
//!                              │ existing()                │
//!                              ▼                           ▼
//!                       ┌─────────────┐  upsert()  ┌───────────────┐  POST  ┌─────────┐
//!                       │ RecordStore │ ◄───────── │ ItemProcessor │ ─────► │ webhook │
//!                       └─────────────┘            └───────────────┘        └─────────┘
//! ```
//!
//! * **`source/`**: the `FeedSource` trait, HTTP fetching, RSS and Atom
//!   parsing.
//! * **`channels`**: channel configuration and the JSON registry.
//! * **`pipeline/`**: the channel and item processors.
//! * **`markup/`**: HTML to chat markup conversion.
//! * **`store/`**: processed-record storage (memory or JSON file).
//! * **`notify`**: webhook delivery.
//! * **`dispatch`**: the in-process queue and item worker.
//! * **`poll`**: runs every channel on a timer.
//! * **`main.rs`**: parses flags, wires everything together.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod markup;
pub mod notify;
pub mod pipeline;
pub mod poll;
pub mod source;
pub mod store;
#[cfg(test)]
mod testing;
