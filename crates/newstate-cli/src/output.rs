//! Colored output for CLI commands.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use std::io::Write;

use mlua::Value;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
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

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Print one result value on its own line, colored by type.
    pub fn value(&mut self, value: &Value) {
        let color = match value {
            Value::Nil => Some(Color::White),
            Value::Boolean(_) => Some(Color::Yellow),
            Value::Integer(_) | Value::Number(_) => Some(Color::Cyan),
            Value::String(_) => Some(Color::Green),
            _ => Some(Color::Magenta),
        };
        let mut spec = ColorSpec::new();
        spec.set_fg(color);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", format_value(value));
        let _ = self.stdout.reset();
    }

    /// Flush stdout.
    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Write `error: <message>` to stderr.
    pub fn stderr_error(&mut self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error:");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, " {}", message);
    }
}

/// Render a value the way Lua's `tostring` would for plain data.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format_float(*n),
        Value::String(s) => String::from_utf8_lossy(&s.as_bytes()).into_owned(),
        Value::Table(t) => format!("table: {:p}", t.to_pointer()),
        Value::LightUserData(ud) => format!("userdata: {:p}", ud.0),
        other => other.type_name().to_string(),
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        if n.is_sign_negative() { "-nan" } else { "nan" }.to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}
