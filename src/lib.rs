pub mod api;
pub mod commands;
pub mod config;
pub mod downloader;
pub mod errors;
pub mod metadata;
pub mod processing;
pub mod security;
pub mod utils;

#[cfg(test)]
mod test_support;
