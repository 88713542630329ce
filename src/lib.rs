//! keyrotor: API-key rotation and retry orchestration for generative providers.
//!
//! Every provider call is wrapped as a unit of work and handed to an
//! [`retry::Orchestrator`], which leases a key from a shared
//! [`registry::KeyRegistry`], runs the work with a client bound to that key,
//! and classifies any failure:
//!
//! - quota errors report the key exhausted and rotate to another;
//! - an empty pool or a 500/503 waits and retries;
//! - billing restrictions stop immediately so the call site can fall back.
//!
//! # Quick Start
//!
//! ```no_run
//! use keyrotor::prelude::*;
//!
//! # async fn example() -> keyrotor::error::Result<()> {
//! let generator = KeyRotorConfig::load()?.generator()?;
//! let request = ImageRequest::builder()
//!     .prompt("a lighthouse at dusk, oil painting")
//!     .aspect_ratio(AspectRatio::Landscape)
//!     .build();
//! let result = generator.generate_image(&request).await?;
//! println!("{} image(s) from {}", result.images.len(), result.model);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod generation;
pub mod keys;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
