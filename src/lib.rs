pub mod codec;
pub mod config;
mod error;
pub mod logger;
pub mod models;

pub use codec::{AnnotationDecoder, AnnotationEncoder};
pub use config::CodecConfig;
pub use error::{CodecError, Result};
