//! Host environment detection.

use std::io::IsTerminal;

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Whether stdin is an interactive terminal.
///
/// Engine `exec` calls only request a TTY when this holds.
pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// Current terminal size as `(columns, lines)`, with an 80x24 fallback.
pub fn terminal_size() -> (u16, u16) {
    let (rows, cols) = console::Term::stdout().size();
    let cols = if cols == 0 { 80 } else { cols };
    let rows = if rows == 0 { 24 } else { rows };
    (cols, rows)
}
