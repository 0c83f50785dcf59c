//! Blocking socket runtime.
//!
//! One thread, one connection at a time:
//! - `listener`: listening endpoint with `SO_REUSEADDR` and a backlog of 1
//! - `Connection`: single read, full write, close

mod connection;
mod listener;

pub(crate) use connection::Connection;
pub(crate) use listener::{bind, BACKLOG};
