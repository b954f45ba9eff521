//! Byte codecs, collaborator data shapes, and error categories shared across
//! the web push crates.

pub mod codec;
pub mod error;
pub mod protocol;

pub use codec::{ByteSequence, CodecError};
pub use error::PushError;
