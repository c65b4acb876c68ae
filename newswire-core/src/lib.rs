//! Core types for the newswire ingestion pipeline
//!
//! This crate defines the shared data structures used across the pipeline:
//! feed items pulled from a remote channel, the structured records recovered
//! from their bodies, and the content fingerprint that drives deduplication.

pub mod hash;
pub mod types;

pub use hash::content_hash;
pub use types::{Entry, FeedItem, Record, Report, Section, StoredEntry, TextEntry};
