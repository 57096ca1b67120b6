//! Driver running one command on a device over SSH.

use log::{debug, info};

use super::response::Response;
use super::session::{ScrapeOptions, ScrapeSession};
use crate::error::{DriverError, Result};
use crate::transport::{SshConfig, SshTransport};

/// Connects to a device, runs a single command in its interactive shell
/// and disconnects.
///
/// Every call to [`execute`](Self::execute) opens a fresh connection; no
/// session outlives the call.
#[derive(Debug, Clone)]
pub struct DeviceDriver {
    /// SSH configuration.
    ssh_config: SshConfig,

    /// Engine settings.
    options: ScrapeOptions,
}

impl DeviceDriver {
    pub fn new(ssh_config: SshConfig, options: ScrapeOptions) -> Self {
        Self {
            ssh_config,
            options,
        }
    }

    pub fn ssh_config(&self) -> &SshConfig {
        &self.ssh_config
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Run `command` on the device and return its cleaned output.
    ///
    /// The SSH connection is closed before returning, whether or not the
    /// command succeeded.
    pub async fn execute(&self, command: &str) -> Result<Response> {
        if command.trim().is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "command must not be empty".to_string(),
            }
            .into());
        }

        let transport = SshTransport::connect(self.ssh_config.clone()).await?;
        info!("connected to {}", self.ssh_config.socket_addr());

        let result = match transport.open_shell().await {
            Ok((source, sink)) => {
                ScrapeSession::new(source, sink, self.options.clone())
                    .run(command)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = transport.close().await {
            debug!("disconnect failed: {}", e);
        }

        result
    }
}
