//! The chat pipeline for LightLocal.
//!
//! One turn flows through three stages:
//! 1. **Assemble**: system prompt, recent history and the new message
//! 2. **Stream**: fragments from the provider, republished cumulatively
//! 3. **Commit**: on success the exchange is appended to history
//!
//! [`ChatSession`] ties the stages together for the CLI and the gateway.

pub mod assembler;
pub mod session;
pub mod settings;
pub mod stream_event;
pub mod streamer;

pub use assembler::ConversationAssembler;
pub use session::{ChatSession, ViewReset};
pub use settings::ChatSettings;
pub use stream_event::TurnEvent;
pub use streamer::{ReplyStream, ResponseStreamer, TurnState};
