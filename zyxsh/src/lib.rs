//! # zyxsh
//!
//! One-shot command runner for prompt-driven network switch shells over SSH.
//!
//! Many switch CLIs have no exec channel and no structured output: the only
//! way in is an interactive shell that echoes, paginates and prompts. zyxsh
//! opens that shell, waits for the prompt, runs a single command, pages
//! through `--More--` screens and hands back the cleaned output lines.
//!
//! ## Features
//!
//! - Async SSH connections via russh, with keyboard-interactive fallback
//!   and legacy key exchanges for older firmware
//! - Prompt, pagination and idle-time completion detection
//! - Exit reasons that tell complete responses from truncated ones
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zyxsh::DriverBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zyxsh::Error> {
//!     let driver = DriverBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     let response = driver.execute("show vlan").await?;
//!     println!("{}", response);
//!     Ok(())
//! }
//! ```
//!
//! The engine itself is transport-agnostic: [`ScrapeSession`] runs over any
//! `AsyncRead`/`AsyncWrite` pair.

pub mod channel;
pub mod driver;
pub mod error;
pub mod transport;

pub use driver::{
    DeviceDriver, DriverBuilder, ExitReason, Response, ScrapeOptions, ScrapeSession, normalize,
};
pub use error::Error;
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
