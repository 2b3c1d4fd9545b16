//! Public library modules for the CLI crate
pub mod render;
pub mod watch;
