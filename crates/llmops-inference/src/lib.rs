//! Model-serving container for the managed inference endpoint.
//!
//! Implements the platform's bring-your-own-container contract on port 8080:
//!
//! - `GET /ping` answers 200 once the model is loaded and 503 before
//! - `POST /invocations` takes `{"inputs": <prompt>, ...parameters}` as
//!   `application/json` and answers `{"generated_text": <string>}`
//!
//! The model is loaded once, in the background, after the listener is bound.
//! Requests arriving earlier get 503.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod server;

pub use config::{GeneratorType, InferenceConfig};
pub use error::{InferenceError, InferenceResult};
pub use generator::{create_loader, ModelLoader, TextGenerator};
pub use model::{ModelSlot, ModelState};
pub use server::{router, run, AppState};
