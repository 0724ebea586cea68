#![forbid(unsafe_code)]

//! SQLite persistence for quorumdoc projects, documents, changes and votes.

mod store;

pub use store::*;
