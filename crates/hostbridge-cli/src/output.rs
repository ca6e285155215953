//! Colored terminal output.
//!
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use std::io::Write;

use hostbridge_sdk::MethodKind;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled output writer for the terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Bold text
    pub fn bold(&mut self, text: &str) {
        self.write_styled(text, None, true);
    }

    /// Green bold text
    pub fn success(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Green), true);
    }

    /// Dim text
    pub fn dim(&mut self, text: &str) {
        self.write_styled(text, Some(Color::White), false);
    }

    /// Method kind tag; async methods get none
    pub fn method_kind(&mut self, kind: MethodKind) {
        let color = match kind {
            MethodKind::Async => return,
            MethodKind::Promise => Color::Cyan,
            MethodKind::Sync => Color::Yellow,
        };
        self.write_styled(&format!(" [{}]", kind), Some(color), false);
    }

    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Red bold text on stderr
    pub fn stderr_error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "{}", text);
        let _ = self.stderr.reset();
    }
}
