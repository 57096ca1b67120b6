//! Pseudo-terminal settings for the interactive shell.

/// Terminal requested for the shell channel.
///
/// Switch CLIs wrap and paginate based on these dimensions, so the
/// defaults favour wide lines. Echo is disabled in the terminal modes,
/// although most devices echo the command line themselves regardless.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Terminal type.
    pub term: String,

    /// Terminal width in columns.
    pub width: u32,

    /// Terminal height in rows.
    pub height: u32,

    /// Whether the pty should echo input.
    pub echo: bool,

    /// Input and output line speed.
    pub baud: u32,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            term: "xterm".to_string(),
            width: 200,
            height: 80,
            echo: false,
            baud: 14400,
        }
    }
}
