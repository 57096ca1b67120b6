//! Channel layer: reading the shell, buffering output, spotting prompts.
//!
//! This module handles the byte-level side of the interactive session:
//! the background reader, the output transcript, prompt and pager
//! detection and ANSI stripping.

mod ansi;
mod buffer;
mod patterns;
mod pty;
mod reader;

pub use ansi::strip_ansi;
pub use buffer::OutputBuffer;
pub use patterns::{DEFAULT_PAGER_PATTERN, DEFAULT_TERMINATOR, Pager, Terminator};
pub use pty::PtyConfig;
pub use reader::{
    READ_BUFFER_SIZE, RawChunk, SIGNAL_QUEUE_DEPTH, SessionSignal, SignalReceiver, StreamFault,
    StreamReader, signal_queue,
};
