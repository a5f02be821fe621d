//! # LightLocal Core
//!
//! Domain types, traits, and error definitions for the LightLocal chat
//! front-end. This crate has **no HTTP or UI dependencies**: it defines the
//! domain model that the other crates implement against.
//!
//! The inference backend is defined as a trait here so the chat pipeline can
//! be exercised with scripted providers in tests.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use message::{Exchange, Message, Role};
pub use provider::{
    ChunkReceiver, GenerationOptions, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};
