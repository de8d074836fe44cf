//! External pandoc conversion.
//!
//! Runs `pandoc --from html --to markdown` with the markup on stdin. A missing
//! binary reports [`ConversionError::Unavailable`] so the chain falls back to
//! the in-process converters.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{ConversionError, Converter};

/// Converts HTML to Markdown by shelling out to pandoc.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
}

impl PandocConverter {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self { program: program.as_ref().to_path_buf() }
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl Converter for PandocConverter {
    fn name(&self) -> &'static str {
        "pandoc"
    }

    fn convert(&self, markup: &str) -> Result<String, ConversionError> {
        let mut child = Command::new(&self.program)
            .args(["--from", "html", "--to", "markdown", "--wrap", "none"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ConversionError::Unavailable(self.program.display().to_string()),
                _ => ConversionError::Failed(e.to_string()),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConversionError::Failed("pandoc stdin unavailable".to_string()))?;

        // Write stdin on its own thread while stdout is drained.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(markup.as_bytes()));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ConversionError::Failed(format!("failed to write to pandoc: {e}"))),
            Err(_) => return Err(ConversionError::Failed("pandoc writer thread panicked".to_string())),
        }

        let output = output.map_err(|e| ConversionError::Failed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Failed(format!("pandoc exited with {}: {}", output.status, stderr.trim())));
        }

        String::from_utf8(output.stdout)
            .map(|markdown| markdown.trim().to_string())
            .map_err(|e| ConversionError::Failed(e.to_string()))
    }
}
