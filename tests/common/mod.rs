//! Common test utilities for native-vids integration tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod chat;
#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fake_ytdlp;

#[allow(unused_imports)]
pub use assertions::*;
pub use chat::*;
pub use config::*;
pub use fake_ytdlp::*;
