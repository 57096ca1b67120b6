//! Background reader that turns the shell's output into a signal stream.
//!
//! All reads from the remote shell happen in one spawned task. The engine
//! only ever waits on the bounded signal queue, so deadlines and idle
//! detection stay accurate while a read is in flight.

use std::borrow::Cow;
use std::fmt;
use std::io::ErrorKind;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Maximum bytes taken from the output source per read.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Pending signals the queue holds before the reader waits on the engine.
pub const SIGNAL_QUEUE_DEPTH: usize = 128;

/// Bytes produced by a single read. Chunk boundaries carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk(Bytes);

impl RawChunk {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The chunk as text (lossy UTF-8 conversion).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn has_line_break(&self) -> bool {
        memchr::memchr(b'\n', &self.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RawChunk {
    fn from(text: &str) -> Self {
        Self(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<Bytes> for RawChunk {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Why the output source stopped producing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    /// The remote side closed the stream.
    Eof,
    /// A read failed.
    Io(String),
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFault::Eof => write!(f, "end of stream"),
            StreamFault::Io(msg) => write!(f, "read failed: {}", msg),
        }
    }
}

/// Unit of communication between the reader task and the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The shell produced more output.
    Data(RawChunk),
    /// The stream ended or broke. Sent at most once, always last.
    StreamError(StreamFault),
    /// The reader went away without reporting an error.
    Cancelled,
}

/// Consumer side of the signal queue.
///
/// Yields signals in production order. Once the producer is gone, a single
/// [`SessionSignal::Cancelled`] is yielded and the stream ends.
#[derive(Debug)]
pub struct SignalReceiver {
    rx: mpsc::Receiver<SessionSignal>,
    drained: bool,
}

impl Stream for SignalReceiver {
    type Item = SessionSignal;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.drained {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(signal)) => Poll::Ready(Some(signal)),
            Poll::Ready(None) => {
                self.drained = true;
                Poll::Ready(Some(SessionSignal::Cancelled))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create a bounded signal queue.
pub fn signal_queue(depth: usize) -> (mpsc::Sender<SessionSignal>, SignalReceiver) {
    let (tx, rx) = mpsc::channel(depth);
    (tx, SignalReceiver { rx, drained: false })
}

/// Handle to the background reader task.
///
/// The task checks the cancellation flag between reads and after each read
/// returns; once it observes the flag no further signals are sent. Dropping
/// the handle cancels and aborts the task.
pub struct StreamReader {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl StreamReader {
    /// Spawn a reader over `source`.
    pub fn spawn<R>(source: R) -> (Self, SignalReceiver)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, signals) = signal_queue(SIGNAL_QUEUE_DEPTH);
        let cancel = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(read_loop(source, tx, cancel.clone()));
        (Self { cancel, task }, signals)
    }

    /// Ask the reader to stop. Takes effect at the next read boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.cancel();
        self.task.abort();
    }
}

async fn read_loop<R>(mut source: R, tx: mpsc::Sender<SessionSignal>, cancel: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(READ_BUFFER_SIZE);

    loop {
        if cancel.load(Ordering::Acquire) {
            debug!("reader: cancelled");
            return;
        }

        let result = source.read(&mut buf[..]).await;

        if cancel.load(Ordering::Acquire) {
            trace!("reader: discarding read completed after cancellation");
            return;
        }

        let signal = match result {
            Ok(0) => SessionSignal::StreamError(StreamFault::Eof),
            Ok(n) => {
                trace!("reader: {} bytes", n);
                SessionSignal::Data(RawChunk(Bytes::copy_from_slice(&buf[..n])))
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => SessionSignal::StreamError(StreamFault::Io(e.to_string())),
        };

        let terminal = matches!(signal, SessionSignal::StreamError(_));
        if terminal {
            debug!("reader: {:?}", signal);
        }

        if tx.send(signal).await.is_err() {
            debug!("reader: signal queue closed");
            return;
        }

        if terminal {
            return;
        }
    }
}
