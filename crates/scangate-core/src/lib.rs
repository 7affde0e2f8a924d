//! ScanGate Core
//!
//! Core types and utilities shared across ScanGate components.
//!
//! This crate provides:
//! - Common types for chat messages, turns, and stream chunks
//! - Error types and result handling
//! - Word chunking and whitespace token counting
//! - Stream encoders for the supported streaming wire formats
//! - A lazy frame sequence and a paced async stream over it

pub mod encoders;
pub mod error;
pub mod stream;
pub mod stream_encoder;
pub mod types;

pub use encoders::{NdjsonEncoder, OpenAiEncoder, SimpleEncoder, TextDeltaEncoder};
pub use error::{Error, Result};
pub use stream::{chunk_words, paced, word_count, FrameSequence, DEFAULT_CHUNK_WORDS, DEFAULT_PACING};
pub use stream_encoder::{StreamEncoder, StreamFormat};
pub use types::{ChatMessage, ChatTurn, ChunkKind, StreamChunk};
