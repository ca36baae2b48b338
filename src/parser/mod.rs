//! Message decoding: header decoding, transfer decoding, part classification,
//! multipart walking, and the top-level message parser.

pub mod classify;
pub mod content_type;
pub mod eml;
pub mod header;
pub mod message;
pub mod multipart;
pub mod transfer;

pub use message::{parse_message, MessageDecoder, ParseMode};
