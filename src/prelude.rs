//! Convenience re-exports.

pub use crate::classify::{classify, NormalizedError, RawError};
pub use crate::config::{KeyRotorConfig, RegistrySettings};
pub use crate::error::{ErrorClass, KeyRotorError, RecoverySuggestion, Result};
pub use crate::generation::Generator;
pub use crate::keys::ApiKey;
pub use crate::models::{ImageModel, ModelSettings, TextModel, VideoModel};
pub use crate::provider::{GeminiClient, ProviderError};
pub use crate::registry::{InMemoryKeyRegistry, KeyRegistry, RpcKeyRegistry, RpcRegistryConfig};
pub use crate::retry::{Orchestrator, RotationPolicy, RunOptions};
pub use crate::types::{
    AspectRatio, EditRequest, GeneratedImages, GeneratedVideo, ImageRequest, InlineImage,
    TextRequest, VideoRequest,
};
