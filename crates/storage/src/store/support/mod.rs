#![forbid(unsafe_code)]

mod blocks_tx;
mod changes_tx;
mod documents_tx;
mod schema;
mod time;
mod votes_tx;

pub(super) use blocks_tx::*;
pub(super) use changes_tx::*;
pub(super) use documents_tx::*;
pub(super) use schema::install_schema;
pub(super) use time::now_ms;
pub(super) use votes_tx::*;
