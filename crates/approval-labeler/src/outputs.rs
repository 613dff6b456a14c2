//! Step outputs and workflow command annotations.

// Workflow commands are read by the runner from stdout
#![allow(clippy::disallowed_macros)]

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

/// The three values a completed run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutputs {
    pub is_approved: bool,
    pub should_label_be_set: bool,
    pub should_label_be_removed: bool,
}

impl RunOutputs {
    /// Output name/value pairs, values rendered as `true`/`false`
    #[must_use]
    pub fn entries(&self) -> [(&'static str, String); 3] {
        [
            ("isApproved", self.is_approved.to_string()),
            ("shouldLabelBeSet", self.should_label_be_set.to_string()),
            (
                "shouldLabelBeRemoved",
                self.should_label_be_removed.to_string(),
            ),
        ]
    }

    /// Append outputs to the `GITHUB_OUTPUT` file, or print them to stdout
    /// when running outside of Actions.
    ///
    /// # Errors
    /// Returns an error if the output file cannot be opened or written.
    pub fn write(&self, output_file: Option<&Path>) -> io::Result<()> {
        let mut rendered = String::new();
        for (name, value) in self.entries() {
            rendered.push_str(&format!("{name}={value}\n"));
        }

        match output_file {
            Some(path) => {
                debug!(path = %path.display(), "Writing step outputs");
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(rendered.as_bytes())
            }
            None => {
                print!("{rendered}");
                io::stdout().flush()
            }
        }
    }
}

/// Escape data for a workflow command message
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Render a `::warning::` annotation
#[must_use]
pub fn warning_command(message: &str) -> String {
    format!("::warning::{}", escape_data(message))
}

/// Render an `::error::` annotation
#[must_use]
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Emit a warning annotation on stdout
pub fn emit_warning(message: &str) {
    println!("{}", warning_command(message));
}

/// Emit an error annotation on stdout
pub fn emit_error(message: &str) {
    println!("{}", error_command(message));
}
