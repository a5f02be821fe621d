//! Conversation memory for LightLocal.
//!
//! Holds the exchanges of the running process. Nothing is persisted; the
//! history starts empty and is gone when the process exits.

pub mod history;

pub use history::HistoryStore;
