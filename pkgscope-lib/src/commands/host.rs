use core::fmt::Display;
use std::io::Write;

/// The process a command runs in: its two output streams and its exit.
pub trait Host: Send + Sync {
    /// User-facing output, stdout for the binary.
    fn output(&mut self) -> impl Write;

    /// Diagnostics, stderr for the binary.
    fn error(&mut self) -> impl Write;

    /// Terminate with `code`. Capturing hosts only record it.
    fn exit(&mut self, code: i32);

    /// Report a command failure on the error stream and exit with status 1.
    fn fail(&mut self, what: &str, cause: impl Display) {
        let _ = writeln!(self.error(), "❌ {what}: {cause}");
        self.exit(1);
    }
}

/// Host that keeps everything a command prints, for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    pub fn error_text(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

#[cfg(test)]
impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}
