//! Output lines and the diagnostic echo.
//!
//! The first stdout line is a single JSON object written the way Python's
//! `json.dumps` writes it: `": "` after keys, `", "` between entries,
//! non-ASCII escaped as `\uXXXX`, and floats in `repr` form (`1e-05`,
//! `100.0`). Consumers that compare output bytes rely on this. Non-finite
//! floats are the one divergence: they are written as `null`, where Python
//! writes `NaN` or `Infinity`.

use std::fmt;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::frame::FeatureFrame;

/// The structured result of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Risk { risk_percentage: f64 },
    Error { error: String },
}

impl Outcome {
    pub fn risk(risk_percentage: f64) -> Self {
        Outcome::Risk { risk_percentage }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Outcome::Error {
            error: message.to_string(),
        }
    }

    /// Render as one JSON line, without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut buf = Vec::with_capacity(64);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PythonFormatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// [`Formatter`] matching the output of Python's `json.dumps` with default
/// arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonFormatter;

impl Formatter for PythonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(python_float_repr(value).as_bytes())
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.write_f64(writer, f64::from(value))
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Python's `repr(float)`: shortest round-trip digits, positional notation
/// for exponents in `[-4, 16)`, scientific with a signed two-digit exponent
/// otherwise.
///
/// Only called for finite values: serde_json writes NaN and infinities as
/// `null` before they reach the formatter.
pub fn python_float_repr(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return format!("{value:?}");
    }

    let sci = format!("{value:e}");
    match sci.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => sci,
    }
}

/// Qualitative band of a risk percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_percentage(risk: f64) -> Self {
        if risk < 20.0 {
            RiskLevel::Low
        } else if risk < 50.0 {
            RiskLevel::Moderate
        } else if risk < 80.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Critical => "Critical Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable dump of the row the model saw, its dtypes and the risk
/// band. Not a stable format.
pub fn render_echo(frame: &FeatureFrame, risk: f64) -> String {
    let width = frame.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let mut lines = vec!["=== Final Input to Model ===".to_string()];
    lines.extend(frame.iter().map(|(name, cell)| format!("{name:<width$}  {cell}")));
    lines.push("DTypes:".to_string());
    lines.extend(frame.dtypes().map(|(name, dtype)| format!("{name:<width$}  {dtype}")));
    lines.push("dtype: object".to_string());
    lines.push(format!("Risk level: {}", RiskLevel::from_percentage(risk)));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
