//! Run-formatted rich text: an ordered list of styled runs parsed from a
//! `{ "ops": [ { "insert": ..., "attributes": { ... } } ] }` document.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const BASE_FONT_SIZE: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse `#RRGGBB` or `#RGB`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            6 => Some(Rgb {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
            }),
            3 => {
                let expand = |v: u8| v * 17;
                Some(Rgb {
                    r: expand(channel(0..1)?),
                    g: expand(channel(1..2)?),
                    b: expand(channel(2..3)?),
                })
            }
            _ => None,
        }
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    /// May contain `\n` line breaks
    pub text: String,
    pub color: Rgb,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_size: f32,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Rgb::BLACK,
            bold: false,
            italic: false,
            underline: false,
            font_size: BASE_FONT_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Run {
    Text(TextRun),
    /// Non-text insert (image, formula, ...). Occupies space but draws nothing.
    Embed,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledTextDocument {
    pub runs: Vec<Run>,
}

#[derive(Debug, Error)]
pub enum TextParseError {
    #[error("invalid rich-text JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    ops: Vec<Op>,
}

#[derive(Deserialize)]
struct Op {
    #[serde(default)]
    insert: Option<Value>,
    #[serde(default)]
    attributes: Option<Attributes>,
}

// Unknown attributes are dropped by serde.
#[derive(Default, Deserialize)]
struct Attributes {
    #[serde(default)]
    color: Option<Value>,
    #[serde(default)]
    bold: Option<Value>,
    #[serde(default)]
    italic: Option<Value>,
    #[serde(default)]
    underline: Option<Value>,
    #[serde(default)]
    size: Option<Value>,
}

impl StyledTextDocument {
    /// Parse leniently: malformed input is logged and yields an empty document.
    pub fn parse(source: &str) -> Self {
        match Self::try_parse(source) {
            Ok(doc) => doc,
            Err(err) => {
                log::warn!("Ignoring rich text, rendering nothing: {}", err);
                Self::default()
            }
        }
    }

    pub fn try_parse(source: &str) -> Result<Self, TextParseError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let delta: Delta = serde_json::from_str(source)?;
        let runs = delta.ops.into_iter().filter_map(Op::into_run).collect();
        Ok(Self { runs })
    }

    pub fn is_empty(&self) -> bool {
        !self.runs.iter().any(|run| match run {
            Run::Text(t) => !t.text.trim().is_empty(),
            Run::Embed => false,
        })
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.runs.iter().filter_map(|run| match run {
            Run::Text(t) => Some(t),
            Run::Embed => None,
        })
    }
}

impl Op {
    fn into_run(self) -> Option<Run> {
        let insert = self.insert?;
        let text = match insert {
            Value::String(s) => s,
            Value::Null => return None,
            _ => return Some(Run::Embed),
        };
        let attrs = self.attributes.unwrap_or_default();
        Some(Run::Text(TextRun {
            text,
            color: attrs
                .color
                .as_ref()
                .and_then(Value::as_str)
                .and_then(Rgb::parse_hex)
                .unwrap_or_default(),
            bold: truthy(attrs.bold.as_ref()),
            italic: truthy(attrs.italic.as_ref()),
            underline: truthy(attrs.underline.as_ref()),
            font_size: attrs
                .size
                .as_ref()
                .and_then(resolve_size)
                .unwrap_or(BASE_FONT_SIZE),
        }))
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// `small|large|huge` scale the base size; otherwise a leading number is used.
/// Zero, negative and non-finite sizes are rejected.
pub fn resolve_size(value: &Value) -> Option<f32> {
    let size = match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => match s.trim() {
            "small" => Some(BASE_FONT_SIZE * 0.8),
            "large" => Some(BASE_FONT_SIZE * 1.5),
            "huge" => Some(BASE_FONT_SIZE * 2.0),
            other => leading_number(other),
        },
        _ => None,
    };
    size.filter(|s| s.is_finite() && *s > 0.0)
}

fn leading_number(s: &str) -> Option<f32> {
    let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if int_len == 0 {
        return None;
    }
    let rest = &s[int_len..];
    let frac_len = match rest.strip_prefix('.') {
        Some(after) => {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 {
                digits + 1
            } else {
                0
            }
        }
        None => 0,
    };
    s[..int_len + frac_len].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_text_run(doc: &StyledTextDocument) -> &TextRun {
        assert_eq!(doc.runs.len(), 1);
        match &doc.runs[0] {
            Run::Text(t) => t,
            Run::Embed => panic!("expected text run"),
        }
    }

    #[test]
    fn plain_run_gets_defaults() {
        let doc = StyledTextDocument::parse(r##"{"ops":[{"insert":"#SPAINMWC\n"}]}"##);
        let run = only_text_run(&doc);
        assert_eq!(run, &TextRun::plain("#SPAINMWC\n"));
        assert_eq!(run.color, Rgb::BLACK);
        assert_eq!(run.font_size, 20.0);
        assert!(!run.bold && !run.italic && !run.underline);
    }

    #[test]
    fn attributes_are_resolved() {
        let doc = StyledTextDocument::parse(
            r##"{"ops":[{"insert":"Hi","attributes":{"color":"#FF0046","bold":true,"italic":true,"underline":true,"size":"24px","font":"serif"}}]}"##,
        );
        let run = only_text_run(&doc);
        assert_eq!(run.color, Rgb { r: 255, g: 0, b: 70 });
        assert!(run.bold && run.italic && run.underline);
        assert_eq!(run.font_size, 24.0);
    }

    #[test]
    fn symbolic_sizes_scale_base() {
        let size = |s: &str| resolve_size(&Value::String(s.into()));
        assert_eq!(size("small"), Some(16.0));
        assert_eq!(size("large"), Some(30.0));
        assert_eq!(size("huge"), Some(40.0));
        assert_eq!(size("18.5pt"), Some(18.5));
        assert_eq!(size("12."), Some(12.0));
        assert_eq!(size("medium"), None);
        assert_eq!(resolve_size(&serde_json::json!(32)), Some(32.0));
        assert_eq!(resolve_size(&Value::Bool(false)), None);
    }

    #[test]
    fn non_positive_sizes_keep_the_base_size() {
        assert_eq!(resolve_size(&serde_json::json!(-12)), None);
        assert_eq!(resolve_size(&serde_json::json!(0)), None);
        assert_eq!(resolve_size(&Value::String("-12px".into())), None);
        assert_eq!(resolve_size(&Value::String("0px".into())), None);

        let doc = StyledTextDocument::parse(r#"{"ops":[{"insert":"x","attributes":{"size":-12}}]}"#);
        assert_eq!(only_text_run(&doc).font_size, BASE_FONT_SIZE);
    }

    #[test]
    fn short_hex_and_bad_colors() {
        assert_eq!(Rgb::parse_hex("#fff"), Some(Rgb { r: 255, g: 255, b: 255 }));
        assert_eq!(Rgb::parse_hex("red"), None);
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#gggggg"), None);

        let doc = StyledTextDocument::parse(r#"{"ops":[{"insert":"x","attributes":{"color":"rgb(1,2,3)"}}]}"#);
        assert_eq!(only_text_run(&doc).color, Rgb::BLACK);
    }

    #[test]
    fn embeds_and_non_inserts() {
        let doc = StyledTextDocument::parse(
            r#"{"ops":[{"insert":"a"},{"insert":{"image":"x.png"}},{"retain":3},{"insert":"b"}]}"#,
        );
        assert_eq!(doc.runs.len(), 3);
        assert_eq!(doc.runs[1], Run::Embed);
        assert_eq!(doc.text_runs().count(), 2);
    }

    #[test]
    fn malformed_input_degrades_to_empty() {
        assert!(StyledTextDocument::try_parse("{not json").is_err());
        assert_eq!(StyledTextDocument::parse("{not json"), StyledTextDocument::default());
        assert!(StyledTextDocument::parse(r#"{"nothing":1}"#).runs.is_empty());
        assert!(StyledTextDocument::parse(r#"{"ops":"nope"}"#).runs.is_empty());
        assert!(StyledTextDocument::parse("").runs.is_empty());
    }

    #[test]
    fn whitespace_only_document_is_empty() {
        let doc = StyledTextDocument::parse(r#"{"ops":[{"insert":"\n"}]}"#);
        assert_eq!(doc.runs.len(), 1);
        assert!(doc.is_empty());
    }
}
