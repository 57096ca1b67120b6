//! The wait loop shared by every phase of a command execution.
//!
//! Each phase is a decision function over [`WaitEvent`]s. The loop owns the
//! timing: it waits for the next signal for at most one poll interval, turns
//! a quiet interval into a [`WaitEvent::Tick`], and hands out
//! [`WaitEvent::Deadline`] once the phase deadline has passed. Replies the
//! decision function asks for are written before the next event is read.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use log::trace;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::channel::{SessionSignal, SignalReceiver};
use crate::error::{ChannelError, Result};

/// What the wait loop observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitEvent {
    /// The reader delivered a signal.
    Signal(SessionSignal),
    /// A poll interval passed without signals.
    Tick(Instant),
    /// The phase deadline passed.
    Deadline,
}

/// What the decision function wants next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Keep waiting.
    Continue,
    /// Write these bytes to the shell, then keep waiting.
    Reply(Bytes),
    /// The phase is over.
    Done(T),
}

/// Run a phase until `decide` finishes it or fails.
///
/// `decide` must return `Done` or an error for [`WaitEvent::Deadline`];
/// the deadline is re-reported on every iteration after it passes.
pub async fn wait_for<W, T, F>(
    signals: &mut SignalReceiver,
    sink: &mut W,
    deadline: Instant,
    poll_interval: Duration,
    mut decide: F,
) -> Result<T>
where
    W: AsyncWrite + Unpin,
    F: FnMut(WaitEvent) -> Result<Step<T>>,
{
    loop {
        let now = Instant::now();
        let event = if now >= deadline {
            WaitEvent::Deadline
        } else {
            let tick = poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                signal = signals.next() => {
                    WaitEvent::Signal(signal.unwrap_or(SessionSignal::Cancelled))
                }
                _ = tokio::time::sleep(tick) => WaitEvent::Tick(Instant::now()),
            }
        };

        match decide(event)? {
            Step::Continue => {}
            Step::Reply(bytes) => {
                trace!("wait: replying {:?}", bytes);
                sink.write_all(&bytes).await.map_err(ChannelError::from)?;
                sink.flush().await.map_err(ChannelError::from)?;
            }
            Step::Done(value) => return Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{RawChunk, signal_queue};
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_deadline() {
        let (_tx, mut signals) = signal_queue(4);
        let mut sink = tokio::io::sink();
        let mut ticks = 0;

        let start = Instant::now();
        let result = wait_for(
            &mut signals,
            &mut sink,
            start + Duration::from_millis(100),
            Duration::from_millis(10),
            |event| match event {
                WaitEvent::Tick(_) => {
                    ticks += 1;
                    Ok(Step::Continue)
                }
                WaitEvent::Deadline => Ok(Step::Done(())),
                other => panic!("unexpected event {:?}", other),
            },
        )
        .await;

        assert!(result.is_ok());
        assert!((9..=10).contains(&ticks), "ticks = {}", ticks);
        assert!(Instant::now() - start >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_signals_delivered_in_order() {
        let (tx, mut signals) = signal_queue(4);
        tx.send(SessionSignal::Data(RawChunk::from("a"))).await.unwrap();
        tx.send(SessionSignal::Data(RawChunk::from("b"))).await.unwrap();
        drop(tx);

        let mut seen = Vec::new();
        let mut sink = tokio::io::sink();
        wait_for(
            &mut signals,
            &mut sink,
            Instant::now() + Duration::from_secs(5),
            Duration::from_millis(10),
            |event| match event {
                WaitEvent::Signal(SessionSignal::Data(chunk)) => {
                    seen.push(chunk.text().into_owned());
                    Ok(Step::Continue)
                }
                WaitEvent::Signal(SessionSignal::Cancelled) => Ok(Step::Done(())),
                _ => Ok(Step::Continue),
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_reply_written_to_sink() {
        let (tx, mut signals) = signal_queue(4);
        tx.send(SessionSignal::Data(RawChunk::from("--More--")))
            .await
            .unwrap();
        let mut sink = tokio_test::io::Builder::new().write(b" ").build();

        let mut replied = false;
        wait_for(
            &mut signals,
            &mut sink,
            Instant::now() + Duration::from_secs(5),
            Duration::from_millis(10),
            |event| match event {
                WaitEvent::Signal(_) if !replied => {
                    replied = true;
                    Ok(Step::Reply(Bytes::from_static(b" ")))
                }
                _ => Ok(Step::Done(())),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_decision_error_propagates() {
        let (_tx, mut signals) = signal_queue(4);
        let mut sink = tokio::io::sink();

        let result: Result<()> = wait_for(
            &mut signals,
            &mut sink,
            Instant::now(),
            Duration::from_millis(10),
            |_| Err(ChannelError::Closed.into()),
        )
        .await;

        assert!(matches!(result, Err(Error::Channel(ChannelError::Closed))));
    }
}
