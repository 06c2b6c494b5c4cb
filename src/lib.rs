//! tracksync - keeps a local music folder in step with a streaming catalog.

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod index;
pub mod init;
pub mod lyrics;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod playlist;
pub mod processor;
pub mod progress;
pub mod prompt;
pub mod provider;
pub mod tags;

#[cfg(test)]
pub mod testing;

pub use error::{Result, SyncError};
