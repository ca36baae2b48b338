//! `nthmail`: decoding engine for a disposable-inbox mail service.
//!
//! Raw RFC 5322 bytes go in; a [`model::mail::StructuredMessage`] with
//! decoded headers and flattened, transfer-decoded text bodies comes out.
//! [`select::select_body`] then picks the part a viewer should show.

pub mod config;
pub mod error;
pub mod inbox;
pub mod model;
pub mod parser;
pub mod select;
