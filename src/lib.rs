//! Croissant Bot: a Discord music bot built around per-guild playback
//! sessions and their song queues.

pub mod audio;
pub mod bot;
pub mod config;
pub mod sources;
pub mod ui;
