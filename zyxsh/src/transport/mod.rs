//! SSH transport layer wrapping russh.
//!
//! Hands the engine an authenticated, PTY-backed shell as a pair of
//! async byte streams. Everything above this module only sees
//! `AsyncRead`/`AsyncWrite`.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{ShellSink, ShellSource, SshTransport};
