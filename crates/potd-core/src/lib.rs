//! Core types and the rotation engine for the phrase-of-the-day service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::PhraseStore`]; transport layers drive
//! [`rotation::RotationEngine`].

pub mod clock;
pub mod error;
pub mod phrase;
pub mod rotation;
pub mod store;

pub use error::{Error, Result};
