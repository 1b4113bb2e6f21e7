//! Process-wide model handle.
//!
//! The slot starts empty, is filled exactly once by the startup task, and is
//! read-only afterwards. Liveness reflects whether that has happened.

use std::sync::{Arc, OnceLock};

use tracing::{error, info};

use crate::error::{InferenceError, InferenceResult};
use crate::generator::{ModelLoader, TextGenerator};

/// Where the model is in its one-time initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Loading,
    Ready,
    Failed,
}

impl ModelState {
    /// Lowercase name used in health responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

/// Holds the loaded generator, or the reason loading failed.
#[derive(Debug, Default)]
pub struct ModelSlot {
    generator: OnceLock<Arc<dyn TextGenerator>>,
    failure: OnceLock<String>,
}

impl ModelSlot {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that already holds `generator`.
    #[must_use]
    pub fn ready(generator: Arc<dyn TextGenerator>) -> Self {
        let slot = Self::new();
        let _ = slot.generator.set(generator);
        slot
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        if self.generator.get().is_some() {
            ModelState::Ready
        } else if self.failure.get().is_some() {
            ModelState::Failed
        } else {
            ModelState::Loading
        }
    }

    /// The generator, once loaded.
    pub fn generator(&self) -> InferenceResult<&Arc<dyn TextGenerator>> {
        match self.generator.get() {
            Some(generator) => Ok(generator),
            None => match self.failure.get() {
                Some(reason) => Err(InferenceError::ModelLoadFailed(reason.clone())),
                None => Err(InferenceError::ModelNotReady),
            },
        }
    }

    /// Run `loader` and store its result. Only the first call has any effect.
    pub async fn initialize(&self, loader: Box<dyn ModelLoader>) {
        if self.state() != ModelState::Loading {
            return;
        }

        match loader.load().await {
            Ok(generator) => {
                if self.generator.set(generator).is_ok() {
                    info!("model loaded");
                }
            }
            Err(e) => {
                error!(error = %e, "model failed to load");
                let _ = self.failure.set(e.to_string());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generator::{EchoGenerator, EchoLoader};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct BrokenLoader;

    #[async_trait]
    impl ModelLoader for BrokenLoader {
        async fn load(self: Box<Self>) -> InferenceResult<Arc<dyn TextGenerator>> {
            Err(InferenceError::ModelLoadFailed("weights missing".to_owned()))
        }
    }

    #[tokio::test]
    async fn slot_becomes_ready_after_load() {
        let slot = ModelSlot::new();
        assert_eq!(slot.state(), ModelState::Loading);
        assert!(matches!(slot.generator(), Err(InferenceError::ModelNotReady)));

        slot.initialize(Box::new(EchoLoader)).await;
        assert_eq!(slot.state(), ModelState::Ready);
        assert!(slot.generator().is_ok());
    }

    #[tokio::test]
    async fn failed_load_is_reported() {
        let slot = ModelSlot::new();
        slot.initialize(Box::new(BrokenLoader)).await;
        assert_eq!(slot.state(), ModelState::Failed);
        assert!(matches!(
            slot.generator(),
            Err(InferenceError::ModelLoadFailed(_))
        ));
    }

    #[tokio::test]
    async fn second_initialise_is_ignored() {
        let slot = ModelSlot::ready(Arc::new(EchoGenerator));
        slot.initialize(Box::new(BrokenLoader)).await;
        assert_eq!(slot.state(), ModelState::Ready);
    }
}
