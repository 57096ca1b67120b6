//! The scrape engine and the driver around it.
//!
//! A command execution runs in phases over one shell session: wait for the
//! prompt, send the command, collect the response, normalize it, send
//! `exit`. Every phase is a decision function driven by [`wait_for`].

mod builder;
mod collect;
mod device;
mod normalize;
mod prompt;
mod response;
mod session;
mod wait;

pub use builder::DriverBuilder;
pub use collect::{Collector, ExitReason};
pub use device::DeviceDriver;
pub use normalize::normalize;
pub use prompt::PromptWait;
pub use response::Response;
pub use session::{ScrapeOptions, ScrapeSession};
pub use wait::{Step, WaitEvent, wait_for};
