//! Turning a raw transcript into result lines.

/// Split a transcript into the lines the caller wants.
///
/// With more than two lines, the first (the echoed command) and the last
/// (the trailing prompt) are dropped. Every remaining line loses one
/// trailing carriage return, and empty lines are skipped.
///
/// The rule is positional only. Responses of two lines or fewer keep their
/// echo and prompt, and a command echo that the terminal wrapped onto
/// several lines leaks its continuation into the result.
pub fn normalize(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.split('\n').collect();
    let body = if lines.len() > 2 {
        &lines[1..lines.len() - 1]
    } else {
        &lines[..]
    };

    body.iter()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_echo_and_prompt() {
        let output = "show vlan\r\nVLAN 1 Active\r\nVLAN 2 Active\r\nSwitch#";
        assert_eq!(normalize(output), vec!["VLAN 1 Active", "VLAN 2 Active"]);
    }

    #[test]
    fn test_skips_empty_lines() {
        let output = "show version\r\n\r\nFirmware V2.60\r\n\r\nBuild 1234\r\nSwitch#";
        assert_eq!(normalize(output), vec!["Firmware V2.60", "Build 1234"]);
    }

    #[test]
    fn test_strips_single_carriage_return() {
        let output = "cmd\r\nvalue\r\r\nSwitch#";
        assert_eq!(normalize(output), vec!["value\r"]);
    }

    #[test]
    fn test_two_lines_kept() {
        assert_eq!(normalize("show vlan\r\nSwitch#"), vec!["show vlan", "Switch#"]);
        assert_eq!(normalize("Switch#"), vec!["Switch#"]);
        assert!(normalize("").is_empty());
    }

    #[test]
    fn test_trailing_newline_counts_as_line() {
        // The empty last segment is the one dropped, the prompt line stays
        let output = "show clock\r\n10:00:00 UTC\r\nSwitch#\r\n";
        assert_eq!(normalize(output), vec!["10:00:00 UTC", "Switch#"]);
    }

    #[test]
    fn test_wrapped_echo_leaks() {
        let output = "show interfaces status very-long-arg\r\nument\r\nport 1 up\r\nSwitch#";
        assert_eq!(normalize(output), vec!["ument", "port 1 up"]);
    }

    #[test]
    fn test_deterministic() {
        let output = "show mac address-table\r\n00:11:22:33:44:55 1 port3\r\nSwitch#";
        assert_eq!(normalize(output), normalize(output));
    }
}
