//! One command execution against a live shell.

use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::collect::{Collector, ExitReason};
use super::normalize::normalize;
use super::prompt::PromptWait;
use super::response::Response;
use super::wait::wait_for;
use crate::channel::{Pager, SignalReceiver, StreamReader, Terminator, strip_ansi};
use crate::error::{ChannelError, Result};

/// Command that ends the remote shell session.
const EXIT_COMMAND: &str = "exit\n";

/// Timing and protocol knobs for a scrape.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// How long to wait for the first prompt.
    pub prompt_timeout: Duration,

    /// Hard limit for collecting a command's output.
    pub command_timeout: Duration,

    /// Quiet period after which output is considered complete.
    pub idle_timeout: Duration,

    /// How often the wait loop wakes up when no output arrives.
    pub poll_interval: Duration,

    /// Prompt terminator.
    pub terminator: Terminator,

    /// Pagination banner detector.
    pub pager: Pager,

    /// Remove terminal escape sequences before normalizing.
    pub strip_ansi: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            terminator: Terminator::default(),
            pager: Pager::default(),
            strip_ansi: false,
        }
    }
}

/// Engine driving a single shell session.
///
/// Owns the input sink and the reader task over the output source for the
/// lifetime of one command execution.
pub struct ScrapeSession<W> {
    sink: W,
    signals: SignalReceiver,
    reader: StreamReader,
    options: ScrapeOptions,
}

impl<W> ScrapeSession<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Start reading `source` in the background.
    pub fn new<R>(source: R, sink: W, options: ScrapeOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (reader, signals) = StreamReader::spawn(source);
        Self {
            sink,
            signals,
            reader,
            options,
        }
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Wait for the shell prompt, then run `command`.
    ///
    /// The exit command is sent afterwards no matter how the execution went.
    pub async fn run(mut self, command: &str) -> Result<Response> {
        let result = self.execute(command).await;
        if let Err(e) = self.exit().await {
            debug!("session: exit not delivered: {}", e);
        }
        result
    }

    async fn execute(&mut self, command: &str) -> Result<Response> {
        self.wait_for_prompt().await?;
        self.send_command(command).await
    }

    /// Wait until the shell shows its prompt.
    pub async fn wait_for_prompt(&mut self) -> Result<()> {
        let timeout = self.options.prompt_timeout;
        let mut phase = PromptWait::new(self.options.terminator, timeout);

        wait_for(
            &mut self.signals,
            &mut self.sink,
            Instant::now() + timeout,
            self.options.poll_interval,
            |event| phase.on_event(event),
        )
        .await
    }

    /// Send a command and collect its response.
    ///
    /// Running out of time or losing the stream during collection is not an
    /// error; whatever arrived is returned with the matching
    /// [`ExitReason`].
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();

        debug!("session: sending {:?}", command);
        self.write(format!("{}\n", command).as_bytes()).await?;

        let mut collector = Collector::new(
            self.options.terminator,
            self.options.pager.clone(),
            self.options.idle_timeout,
        );

        let exit_reason = wait_for(
            &mut self.signals,
            &mut self.sink,
            start + self.options.command_timeout,
            self.options.poll_interval,
            |event| Ok(collector.on_event(event)),
        )
        .await?;

        let elapsed = start.elapsed();
        let pages = collector.pages();
        let raw_result = collector.into_output();

        let lines = if self.options.strip_ansi {
            normalize(&strip_ansi(&raw_result))
        } else {
            normalize(&raw_result)
        };

        match exit_reason {
            ExitReason::Deadline | ExitReason::StreamEnd => warn!(
                "{:?}: output may be incomplete (stopped on {} after {:?})",
                command, exit_reason, elapsed
            ),
            _ => debug!(
                "session: {:?} done on {} in {:?}, {} lines, {} pages",
                command,
                exit_reason,
                elapsed,
                lines.len(),
                pages
            ),
        }

        Ok(Response::new(
            command,
            lines,
            raw_result,
            exit_reason,
            pages,
            elapsed,
        ))
    }

    /// Ask the shell to exit and stop the reader. Does not wait for the
    /// shell to react.
    pub async fn exit(&mut self) -> Result<()> {
        let result = self.write(EXIT_COMMAND.as_bytes()).await;
        self.reader.cancel();
        result
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_all(data).await.map_err(ChannelError::from)?;
        self.sink.flush().await.map_err(ChannelError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio::io::{AsyncReadExt, DuplexStream};

    /// Wire a session to the returned fake device end.
    fn connect(options: ScrapeOptions) -> (ScrapeSession<tokio::io::WriteHalf<DuplexStream>>, DuplexStream) {
        let (device, local) = tokio::io::duplex(4096);
        let (source, sink) = tokio::io::split(local);
        (ScrapeSession::new(source, sink, options), device)
    }

    /// Read from the device side until `needle` has been received.
    async fn read_until(device: &mut DuplexStream, needle: &[u8]) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        while !received.windows(needle.len()).any(|w| w == needle) {
            let n = device.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        received
    }

    #[tokio::test]
    async fn test_command_completes_on_prompt() {
        let (session, mut device) = connect(ScrapeOptions::default());

        let switch = tokio::spawn(async move {
            device.write_all(b"\r\nGS1900# ").await.unwrap();
            assert_eq!(read_until(&mut device, b"\n").await, b"show vlan\n");
            device
                .write_all(b"show vlan\r\nVLAN 1 Active\r\nVLAN 2 Active\r\nSwitch#")
                .await
                .unwrap();
            read_until(&mut device, b"exit\n").await
        });

        let response = session.run("show vlan").await.unwrap();
        assert_eq!(response.lines, vec!["VLAN 1 Active", "VLAN 2 Active"]);
        assert_eq!(response.exit_reason, ExitReason::Terminator);
        assert_eq!(response.pages, 0);
        assert!(response.is_complete());

        assert_eq!(switch.await.unwrap(), b"exit\n");
    }

    #[tokio::test]
    async fn test_pagination_sends_single_space() {
        let (session, mut device) = connect(ScrapeOptions::default());

        let switch = tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device
                .write_all(b"show running-config\r\nhostname GS1900\r\n--More--")
                .await
                .unwrap();

            let mut key = [0u8; 1];
            device.read_exact(&mut key).await.unwrap();
            assert_eq!(&key, b" ");

            device
                .write_all(b"rest of output\r\nSwitch#")
                .await
                .unwrap();
            read_until(&mut device, b"exit\n").await
        });

        let response = session.run("show running-config").await.unwrap();
        assert_eq!(response.exit_reason, ExitReason::Terminator);
        assert_eq!(response.pages, 1);
        assert_eq!(
            response.lines,
            vec!["hostname GS1900", "--More--rest of output"]
        );

        // Nothing but the exit command after the single space
        assert_eq!(switch.await.unwrap(), b"exit\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_timeout() {
        let (session, mut device) = connect(ScrapeOptions::default());
        device.write_all(b"Username: ").await.unwrap();

        let err = session.run("show vlan").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PromptTimeout(d)) if d == Duration::from_secs(5)
        ));

        // No command was sent, but the session was still told to exit
        assert_eq!(read_until(&mut device, b"exit\n").await, b"exit\n");
    }

    #[tokio::test]
    async fn test_closed_before_prompt() {
        let (session, mut device) = connect(ScrapeOptions::default());
        device.write_all(b"Connection refused\r\n").await.unwrap();
        drop(device);

        let err = session.run("show vlan").await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_completes_without_prompt() {
        let (session, mut device) = connect(ScrapeOptions::default());

        let switch = tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device
                .write_all(b"show clock\r\n10:00:00 UTC\r\n")
                .await
                .unwrap();
            read_until(&mut device, b"exit\n").await
        });

        let response = session.run("show clock").await.unwrap();
        assert_eq!(response.exit_reason, ExitReason::Idle);
        assert_eq!(response.lines, vec!["10:00:00 UTC"]);
        assert!(response.elapsed >= Duration::from_millis(500));
        assert!(response.elapsed < Duration::from_secs(1));

        switch.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_returns_partial_output() {
        let options = ScrapeOptions {
            command_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let (session, mut device) = connect(options);

        let switch = tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device.write_all(b"ping 10.0.0.1\r\n").await.unwrap();
            // Keeps talking, never idle long enough and never prompts
            for seq in 0..100 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let line = format!("reply seq={}\r\n", seq);
                if device.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        let response = session.run("ping 10.0.0.1").await.unwrap();
        assert_eq!(response.exit_reason, ExitReason::Deadline);
        assert!(!response.is_complete());
        assert_eq!(response.lines.first().map(String::as_str), Some("reply seq=0"));

        switch.abort();
    }

    #[tokio::test]
    async fn test_stream_end_returns_partial_output() {
        let (session, mut device) = connect(ScrapeOptions::default());

        let switch = tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device
                .write_all(b"reload\r\nRebooting...\r\n")
                .await
                .unwrap();
        });

        let response = session.run("reload").await.unwrap();
        assert_eq!(response.exit_reason, ExitReason::StreamEnd);
        assert_eq!(response.lines, vec!["Rebooting..."]);

        switch.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_character_split_across_reads() {
        let (session, mut device) = connect(ScrapeOptions::default());

        let switch = tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device.write_all(b"show desc\r\nport 1 caf\xC3").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            device.write_all(b"\xA9\r\nSwitch#").await.unwrap();
            read_until(&mut device, b"exit\n").await
        });

        let response = session.run("show desc").await.unwrap();
        assert_eq!(response.exit_reason, ExitReason::Terminator);
        assert_eq!(response.lines, vec!["port 1 café"]);

        switch.await.unwrap();
    }

    #[tokio::test]
    async fn test_strip_ansi_before_normalizing() {
        let options = ScrapeOptions {
            strip_ansi: true,
            ..Default::default()
        };
        let (session, mut device) = connect(options);

        tokio::spawn(async move {
            device.write_all(b"Switch# ").await.unwrap();
            read_until(&mut device, b"\n").await;
            device
                .write_all(b"show port\r\n\x1b[1mPort 1\x1b[0m up\r\nSwitch#")
                .await
                .unwrap();
            read_until(&mut device, b"exit\n").await;
        });

        let response = session.run("show port").await.unwrap();
        assert_eq!(response.lines, vec!["Port 1 up"]);
        assert!(response.raw_result.contains("\x1b[1m"));
    }
}
