//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::device::DeviceDriver;
use super::session::ScrapeOptions;
use crate::channel::{DEFAULT_PAGER_PATTERN, Pager, PtyConfig, Terminator};
use crate::error::{ChannelError, DriverError, Result};
use crate::transport::config::{AuthMethod, HostKeyVerification, SshConfig};

/// Builder for constructing device drivers.
///
/// # Example
///
/// ```rust,no_run
/// use zyxsh::DriverBuilder;
///
/// # async fn example() -> Result<(), zyxsh::Error> {
/// let driver = DriverBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
///
/// let response = driver.execute("show vlan").await?;
/// for line in response.lines() {
///     println!("{}", line);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    timeout: Duration,
    pty: PtyConfig,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    legacy_kex: bool,
    options: ScrapeOptions,
    pager_pattern: String,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            timeout: Duration::from_secs(10),
            pty: PtyConfig::default(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            legacy_kex: true,
            options: ScrapeOptions::default(),
            pager_pattern: DEFAULT_PAGER_PATTERN.to_string(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Set the connection timeout (default: 10s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.pty.width = width;
        self.pty.height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Accept any host key. For lab use only.
    pub fn danger_disable_host_key_verification(self) -> Self {
        self.host_key_verification(HostKeyVerification::Disabled)
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Prefer legacy Diffie-Hellman key exchanges (default: on).
    pub fn legacy_kex(mut self, enabled: bool) -> Self {
        self.legacy_kex = enabled;
        self
    }

    /// How long to wait for the first prompt (default: 5s).
    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.options.prompt_timeout = timeout;
        self
    }

    /// Hard limit for collecting a command's output (default: 30s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Quiet period that ends collection (default: 500ms).
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.idle_timeout = timeout;
        self
    }

    /// Prompt terminator character (default: `#`).
    pub fn terminator(mut self, terminator: char) -> Self {
        self.options.terminator = Terminator::new(terminator);
        self
    }

    /// Regex matching pagination banners (default: case-insensitive `more`).
    pub fn pager_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pager_pattern = pattern.into();
        self
    }

    /// Strip terminal escape sequences from the output.
    pub fn strip_ansi(mut self, enabled: bool) -> Self {
        self.options.strip_ansi = enabled;
        self
    }

    /// Build the driver.
    ///
    /// This validates the configuration but does not connect.
    pub fn build(self) -> Result<DeviceDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.host.is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "Host is required".to_string(),
            }
            .into());
        }

        let mut options = self.options;
        options.pager = Pager::new(&self.pager_pattern).map_err(ChannelError::from)?;

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            pty: self.pty,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
            legacy_kex: self.legacy_kex,
        };

        Ok(DeviceDriver::new(ssh_config, options))
    }
}
