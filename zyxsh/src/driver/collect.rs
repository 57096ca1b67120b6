//! Collecting a command's response and deciding when it is complete.
//!
//! The device never signals the end of a response, so completion is
//! inferred per event, in this order:
//!
//! 1. a chunk with a pager banner is answered with a space and skipped
//! 2. once a line break has been seen, output ending in the prompt
//!    terminator completes the response
//! 3. a quiet period after some output completes the response
//! 4. the deadline or the end of the stream cut it short

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace};
use serde::Serialize;
use tokio::time::Instant;

use super::wait::{Step, WaitEvent};
use crate::channel::{OutputBuffer, Pager, SessionSignal, Terminator};

/// Keystroke that advances a paginated screen.
const PAGER_ADVANCE: &[u8] = b" ";

/// Why response collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The output ended with the prompt terminator.
    Terminator,
    /// The device went quiet after producing output.
    Idle,
    /// The command deadline passed.
    Deadline,
    /// The output stream ended or broke.
    StreamEnd,
}

impl ExitReason {
    /// Whether the response is believed to be complete.
    ///
    /// `Deadline` and `StreamEnd` results may be truncated.
    pub fn is_complete(self) -> bool {
        matches!(self, ExitReason::Terminator | ExitReason::Idle)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::Terminator => "prompt",
            ExitReason::Idle => "idle",
            ExitReason::Deadline => "deadline",
            ExitReason::StreamEnd => "stream end",
        };
        f.write_str(name)
    }
}

/// Decision function and state for the response-collection phase.
#[derive(Debug)]
pub struct Collector {
    output: OutputBuffer,
    /// Set once a chunk carries a line break, so the echoed command line
    /// is not taken for a finished response.
    seen_content: bool,
    last_receive: Instant,
    terminator: Terminator,
    pager: Pager,
    idle_timeout: Duration,
    pages: usize,
}

impl Collector {
    pub fn new(terminator: Terminator, pager: Pager, idle_timeout: Duration) -> Self {
        Self {
            output: OutputBuffer::new(),
            seen_content: false,
            last_receive: Instant::now(),
            terminator,
            pager,
            idle_timeout,
            pages: 0,
        }
    }

    pub fn on_event(&mut self, event: WaitEvent) -> Step<ExitReason> {
        match event {
            WaitEvent::Signal(SessionSignal::Data(chunk)) => {
                self.last_receive = Instant::now();
                self.output.push(chunk.as_bytes());

                if self.pager.is_banner(&chunk.text()) {
                    self.pages += 1;
                    trace!("collect: pager banner, advancing (page {})", self.pages);
                    return Step::Reply(Bytes::from_static(PAGER_ADVANCE));
                }

                if chunk.has_line_break() {
                    self.seen_content = true;
                }

                if self.seen_content && self.output.ends_with_prompt(self.terminator) {
                    return Step::Done(ExitReason::Terminator);
                }

                Step::Continue
            }
            WaitEvent::Signal(SessionSignal::StreamError(fault)) => {
                debug!("collect: stream ended ({})", fault);
                Step::Done(ExitReason::StreamEnd)
            }
            WaitEvent::Signal(SessionSignal::Cancelled) => Step::Done(ExitReason::StreamEnd),
            WaitEvent::Tick(now) => {
                if !self.output.is_empty()
                    && now.saturating_duration_since(self.last_receive) > self.idle_timeout
                {
                    Step::Done(ExitReason::Idle)
                } else {
                    Step::Continue
                }
            }
            WaitEvent::Deadline => Step::Done(ExitReason::Deadline),
        }
    }

    /// Number of pager banners answered so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn output(&self) -> Cow<'_, str> {
        self.output.text()
    }

    /// Finish collection and take the transcript.
    pub fn into_output(mut self) -> String {
        self.output.take()
    }
}
