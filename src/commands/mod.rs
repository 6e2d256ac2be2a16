pub mod completions;
pub mod config;
pub mod events;
pub mod replay;
pub mod watch;
