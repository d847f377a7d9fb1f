//! Colored terminal output utilities.

use std::time::Duration;

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a completed build step with its duration.
    pub(crate) fn step(&self, msg: &str, elapsed: Duration) {
        let _ = self.term.write_line(&format!(
            "{} {}",
            self.green.apply_to(msg),
            self.dim.apply_to(format_elapsed(elapsed))
        ));
    }
}

/// Render a duration as `(12ms)`, or `(1.25s)` from one second up.
fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("({}ms)", elapsed.as_millis())
    } else {
        format!("({:.2}s)", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "(0ms)");
        assert_eq!(format_elapsed(Duration::from_millis(999)), "(999ms)");
        assert_eq!(format_elapsed(Duration::from_millis(1250)), "(1.25s)");
    }
}
