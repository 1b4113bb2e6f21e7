//! Browser chat page for the managed inference endpoint.
//!
//! `GET /` serves a single page with a prompt box. The page posts to
//! `POST /api/generate`, which forwards `{"inputs": <prompt>}` to the
//! endpoint and returns its `{"generated_text": ...}` unchanged.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod server;

pub use config::ChatConfig;
pub use error::{ChatError, ChatResult};
pub use server::{router, run, AppState};
