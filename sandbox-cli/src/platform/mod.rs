//! Terminal surfaces for the replay CLI

mod cli;

pub use cli::{print_error, StdoutHost};
