//! Built-in renderers and the formatting helpers they share.
//!
//! Every renderer writes to a generic `io::Write` sink so that the binaries
//! can point them at stdout and tests can point them at a `Vec<u8>`. The
//! renderer contract returns nothing, so write failures are logged and
//! dropped.

use crate::binary::BinaryDigit;
use crate::error::ClockError;
use crate::registry::Renderer;
use crate::state::ClockState;
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use std::fmt;
use std::io::{self, Stdout, Write};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

const LIT: &str = "🌝";
const DARK: &str = "🌚";

/// How a single digit is spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitStyle {
    /// `1` and `0`.
    Binary,
    /// 🌝 for set bits, 🌚 for clear ones.
    Emoji,
    /// The digit's decimal value.
    Decimal,
}

/// Spells out `digit` in `style`.
pub fn format_digit(digit: &BinaryDigit, style: BitStyle) -> String {
    match style {
        BitStyle::Binary => digit
            .bits()
            .iter()
            .map(|&bit| if bit { '1' } else { '0' })
            .collect(),
        BitStyle::Emoji => digit
            .bits()
            .iter()
            .map(|&bit| if bit { LIT } else { DARK })
            .collect(),
        BitStyle::Decimal => digit.decimal_value().to_string(),
    }
}

/// `HH:MM:SS`, read back from the digits.
pub fn format_time(state: &ClockState) -> String {
    state.time_string()
}

fn write_panel<W: Write>(
    out: &mut W,
    state: &ClockState,
    header: &str,
    style: BitStyle,
) -> io::Result<()> {
    writeln!(out, "{header}")?;
    writeln!(out, "Time: {}", format_time(state))?;
    writeln!(out)?;
    for (label, tens, units) in state.rows() {
        writeln!(
            out,
            "{:<8}: {} {}",
            label,
            format_digit(&tens, style),
            format_digit(&units, style)
        )?;
    }
    out.flush()
}

fn write_raw<W: Write>(out: &mut W, state: &ClockState) -> io::Result<()> {
    writeln!(out, "Binary Clock API Raw Data")?;
    writeln!(out, "=========================")?;
    writeln!(out, "Timestamp: {}", state.timestamp())?;
    writeln!(out)?;
    for (label, tens, units) in state.rows() {
        for (place, digit) in [("Tens", tens), ("Units", units)] {
            let bits = digit
                .bit_values()
                .map(|bit| bit.to_string())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                out,
                "{:<14}bit_count={}, decimal_value={}, bits=[{}]",
                format!("{label} {place}:"),
                digit.bit_count(),
                digit.decimal_value(),
                bits
            )?;
        }
    }
    out.flush()
}

fn write_compact<W: Write>(out: &mut W, state: &ClockState) -> io::Result<()> {
    let groups = state
        .rows()
        .iter()
        .map(|(_, tens, units)| {
            format!(
                "{} {}",
                format_digit(tens, BitStyle::Binary),
                format_digit(units, BitStyle::Binary)
            )
        })
        .collect::<Vec<_>>()
        .join(" : ");
    writeln!(out, "{} [{}]", format_time(state), groups)?;
    out.flush()
}

/// Writes the JSON display document: two-space indentation, bit arrays kept
/// on one line, trailing newline.
pub fn write_json<W: Write>(out: &mut W, state: &ClockState) -> io::Result<()> {
    {
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut *out, ContractFormatter::new());
        state.json_document().serialize(&mut serializer)?;
    }
    writeln!(out)?;
    out.flush()
}

/// Pretty-printer for the JSON display contract. Objects are indented like
/// `serde_json`'s `PrettyFormatter`; arrays stay inline with no spaces.
#[derive(Debug, Default)]
struct ContractFormatter {
    depth: usize,
    has_value: bool,
}

impl ContractFormatter {
    fn new() -> Self {
        Self::default()
    }

    fn indent<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        for _ in 0..self.depth {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl Formatter for ContractFormatter {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b",")
        }
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.depth -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            self.indent(writer)?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            writer.write_all(b"\n")?;
        } else {
            writer.write_all(b",\n")?;
        }
        self.indent(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.has_value = true;
        Ok(())
    }
}

/// Wraps a sink and signals `closed` once a write fails with
/// `BrokenPipe`.
pub struct PipeWatch<W> {
    inner: W,
    closed: Arc<Notify>,
}

impl<W: Write> PipeWatch<W> {
    pub fn new(inner: W, closed: Arc<Notify>) -> Self {
        Self { inner, closed }
    }

    fn check<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &result {
            if e.kind() == io::ErrorKind::BrokenPipe {
                debug!("Output closed by the reader");
                self.closed.notify_one();
            }
        }
        result
    }
}

impl<W: Write> Write for PipeWatch<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.check(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.check(result)
    }
}

macro_rules! text_renderer {
    ($(#[$meta:meta])* $name:ident, $label:literal, |$out:ident, $state:ident| $body:expr) => {
        $(#[$meta])*
        pub struct $name<W = Stdout> {
            out: W,
        }

        impl $name<Stdout> {
            /// Renders to standard output.
            pub fn stdout() -> Self {
                Self::new(io::stdout())
            }
        }

        impl<W: Write> $name<W> {
            pub fn new(out: W) -> Self {
                Self { out }
            }

            /// Gives back the sink.
            pub fn into_inner(self) -> W {
                self.out
            }
        }

        impl<W: Write + Send> Renderer for $name<W> {
            fn render(&mut self, state: &ClockState) {
                let $out = &mut self.out;
                let $state = state;
                let result: io::Result<()> = $body;
                if let Err(e) = result {
                    warn!("{} display failed to write: {}", $label, e);
                }
            }
        }
    };
}

text_renderer!(
    /// Moon-emoji panel: 🌝 is a set bit, 🌚 a clear one.
    EmojiRenderer,
    "emoji",
    |out, state| write_panel(out, state, "🌝 Binary Clock 🌚", BitStyle::Emoji)
);

text_renderer!(
    /// The emoji panel drawn with `1` and `0`.
    AsciiRenderer,
    "binary",
    |out, state| write_panel(out, state, "Binary Clock (ASCII)", BitStyle::Binary)
);

text_renderer!(
    /// The JSON display document.
    JsonRenderer,
    "json",
    |out, state| write_json(out, state)
);

text_renderer!(
    /// A dump of every digit's width, value and bits.
    RawRenderer,
    "raw",
    |out, state| write_raw(out, state)
);

text_renderer!(
    /// One line per state: `HH:MM:SS [ttt uuuu : ttt uuuu : ttt uuuu]`.
    CompactRenderer,
    "compact",
    |out, state| write_compact(out, state)
);

text_renderer!(
    /// Clears the terminal and homes the cursor. Register it before the
    /// display it should clear for.
    ClearScreen,
    "clear",
    |out, _state| out.write_all(b"\x1b[2J\x1b[H").and_then(|_| out.flush())
);

/// The built-in display formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Moon emojis (default).
    #[default]
    Emoji,
    /// 0s and 1s.
    Binary,
    /// JSON document.
    Json,
    /// Raw digit data.
    Raw,
    /// Single line per update.
    Compact,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Emoji,
        DisplayMode::Binary,
        DisplayMode::Json,
        DisplayMode::Raw,
        DisplayMode::Compact,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::Emoji => "emoji",
            DisplayMode::Binary => "binary",
            DisplayMode::Json => "json",
            DisplayMode::Raw => "raw",
            DisplayMode::Compact => "compact",
        }
    }

    /// Builds the renderer for this mode, writing to `out`.
    pub fn renderer<W: Write + Send + 'static>(self, out: W) -> Box<dyn Renderer> {
        match self {
            DisplayMode::Emoji => Box::new(EmojiRenderer::new(out)),
            DisplayMode::Binary => Box::new(AsciiRenderer::new(out)),
            DisplayMode::Json => Box::new(JsonRenderer::new(out)),
            DisplayMode::Raw => Box::new(RawRenderer::new(out)),
            DisplayMode::Compact => Box::new(CompactRenderer::new(out)),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DisplayMode {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| ClockError::Parse {
                input: s.to_string(),
                reason: "valid modes: emoji, binary, json, raw, compact".to_string(),
            })
    }
}
