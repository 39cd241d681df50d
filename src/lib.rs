pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod init;
pub mod pipeline;
pub mod script;
pub mod storage;
