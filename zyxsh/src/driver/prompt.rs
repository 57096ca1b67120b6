//! Waiting for a freshly started shell to show its prompt.

use std::time::Duration;

use log::{debug, trace};

use super::wait::{Step, WaitEvent};
use crate::channel::{SessionSignal, Terminator};
use crate::error::{ChannelError, Result};

/// Decision function for the prompt-wait phase.
///
/// Any chunk containing the terminator means the shell is ready; no line
/// structure is checked. Text seen here is discarded.
#[derive(Debug)]
pub struct PromptWait {
    terminator: Terminator,
    timeout: Duration,
}

impl PromptWait {
    pub fn new(terminator: Terminator, timeout: Duration) -> Self {
        Self {
            terminator,
            timeout,
        }
    }

    pub fn on_event(&mut self, event: WaitEvent) -> Result<Step<()>> {
        match event {
            WaitEvent::Signal(SessionSignal::Data(chunk)) => {
                if self.terminator.appears_in(chunk.as_bytes()) {
                    debug!("prompt: ready");
                    Ok(Step::Done(()))
                } else {
                    trace!("prompt: discarding {:?}", chunk.text());
                    Ok(Step::Continue)
                }
            }
            WaitEvent::Signal(SessionSignal::StreamError(fault)) => {
                debug!("prompt: stream ended ({})", fault);
                Err(ChannelError::Closed.into())
            }
            WaitEvent::Signal(SessionSignal::Cancelled) => Err(ChannelError::Closed.into()),
            WaitEvent::Tick(_) => Ok(Step::Continue),
            WaitEvent::Deadline => Err(ChannelError::PromptTimeout(self.timeout).into()),
        }
    }
}
