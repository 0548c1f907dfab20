#![forbid(unsafe_code)]

//! Reference host for the uuidsync engine: command grammar and the
//! command runner used by the `uuidsync` binary.

pub mod app;
pub mod command;

pub use app::{App, Flow};
pub use command::{Command, CommandError};
