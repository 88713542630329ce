//! Request and media types shared by the generation operations.

pub mod generation;
pub mod media;

pub use generation::*;
pub use media::*;
