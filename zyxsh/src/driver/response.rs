//! Response type for command execution results.

use std::time::Duration;

use serde::{Serialize, Serializer};

use super::collect::ExitReason;

/// Response from a command execution.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The cleaned output lines (command echo and trailing prompt removed).
    pub lines: Vec<String>,

    /// The transcript before normalization.
    pub raw_result: String,

    /// Why collection stopped.
    pub exit_reason: ExitReason,

    /// Number of pager screens advanced.
    pub pages: usize,

    /// Time taken from sending the command to the end of collection.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        lines: Vec<String>,
        raw_result: impl Into<String>,
        exit_reason: ExitReason,
        pages: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            lines,
            raw_result: raw_result.into(),
            exit_reason,
            pages,
            elapsed,
        }
    }

    /// Whether collection ended on the prompt or an idle period rather
    /// than being cut short.
    pub fn is_complete(&self) -> bool {
        self.exit_reason.is_complete()
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Check if any result line contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.lines.iter().any(|line| line.contains(pattern))
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(exit_reason: ExitReason) -> Response {
        Response::new(
            "show vlan",
            vec!["VLAN 1 Active".into(), "VLAN 2 Active".into()],
            "show vlan\r\nVLAN 1 Active\r\nVLAN 2 Active\r\nSwitch#",
            exit_reason,
            0,
            Duration::from_millis(42),
        )
    }

    #[test]
    fn test_display_joins_lines() {
        assert_eq!(sample(ExitReason::Terminator).to_string(), "VLAN 1 Active\nVLAN 2 Active");
    }

    #[test]
    fn test_completeness_follows_exit_reason() {
        assert!(sample(ExitReason::Terminator).is_complete());
        assert!(!sample(ExitReason::StreamEnd).is_complete());
        assert!(sample(ExitReason::Idle).contains("VLAN 2"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample(ExitReason::Deadline)).unwrap();
        assert_eq!(json["exit_reason"], "deadline");
        assert_eq!(json["elapsed_ms"], 42);
        assert_eq!(json["lines"][1], "VLAN 2 Active");
    }
}
