pub mod codec;
pub mod config;
pub mod error;

pub use codec::{Compression, Coordinator, PackedArtifact};
pub use config::CodecConfig;
pub use error::{Error, Result};
