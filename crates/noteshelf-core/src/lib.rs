//! Core types and trait definitions for noteshelf.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the Subject → Topic → Note hierarchy, the child-ordering contract
//! shared by every layer, and the [`store::NoteStore`] abstraction that
//! storage backends implement.

pub mod error;
pub mod hierarchy;
pub mod id;
pub mod order;
pub mod store;
pub mod user;

pub use error::{Error, Result};
