use crate::models::{Clipping, Field};
use crate::query::{Matched, Span};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_PUNCTUATION: &str = "\x1b[90m";
const ANSI_MATCH: &str = "\x1b[30;103m";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Ansi,
    Plain,
}

impl Style {
    pub fn resolve(choice: ColorChoice, stdout_is_terminal: bool, no_color: bool) -> Self {
        match choice {
            ColorChoice::Always => Style::Ansi,
            ColorChoice::Never => Style::Plain,
            ColorChoice::Auto if stdout_is_terminal && !no_color => Style::Ansi,
            ColorChoice::Auto => Style::Plain,
        }
    }
}

fn field_color(field: Field) -> &'static str {
    match field {
        Field::Number => "\x1b[34m",
        Field::Title => "\x1b[33m",
        Field::Author => "\x1b[35m",
        Field::PageStart | Field::PageEnd => "\x1b[36m",
        Field::CreatedAt => "\x1b[32m",
        Field::HighlightText => "\x1b[37m",
    }
}

/// Resolves a comma-delimited field list. Unknown names are dropped with a
/// warning; `None` or a list with nothing recognizable selects every field.
pub fn parse_fields(list: Option<&str>) -> Vec<Field> {
    let Some(list) = list else {
        return Field::ALL.to_vec();
    };

    let mut fields = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match Field::from_name(name) {
            Some(field) => fields.push(field),
            None => warn!(field = name, "ignoring unknown field"),
        }
    }

    if fields.is_empty() {
        warn!(list, "no known fields selected, showing all");
        return Field::ALL.to_vec();
    }

    fields
}

pub fn field_value(field: Field, index: usize, clipping: &Clipping) -> String {
    match field {
        Field::Number => index.to_string(),
        Field::Title => clipping.title.clone(),
        Field::Author => clipping.author.clone(),
        Field::PageStart => clipping.page_start.to_string(),
        Field::PageEnd => clipping.page_end.to_string(),
        Field::CreatedAt => clipping.created_at.format(DATE_FORMAT).to_string(),
        Field::HighlightText => clipping.highlight_text.clone(),
    }
}

pub struct Renderer {
    fields: Vec<Field>,
    style: Style,
}

impl Renderer {
    pub fn new(fields: Vec<Field>, style: Style) -> Self {
        Self { fields, style }
    }

    /// One line per clipping. `#` counts from 0 over the clippings given here.
    pub fn render(&self, matched: &[Matched]) -> Vec<String> {
        matched
            .iter()
            .enumerate()
            .map(|(index, m)| self.render_line(index, m))
            .collect()
    }

    pub fn render_line(&self, index: usize, matched: &Matched) -> String {
        let separator = self.paint(ANSI_PUNCTUATION, ",");
        self.fields
            .iter()
            .map(|&field| self.render_cell(field, index, matched))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    fn render_cell(&self, field: Field, index: usize, matched: &Matched) -> String {
        let value = field_value(field, index, matched.clipping);
        let color = field_color(field);

        let body = match (self.style, matched.spans.get(field)) {
            (Style::Ansi, Some(span)) => {
                let before = &value[..span.start];
                let hit = span.as_str(&value);
                let after = &value[span.end..];
                format!(
                    "{}{}{}",
                    self.paint(color, &escape(before)),
                    self.paint(ANSI_MATCH, &escape(hit)),
                    self.paint(color, &escape(after))
                )
            }
            _ => self.paint(color, &escape(&value)),
        };

        let quote = self.paint(ANSI_PUNCTUATION, "\"");
        format!("{}{}{}", quote, body, quote)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        match self.style {
            Style::Ansi if !text.is_empty() => format!("{}{}{}", code, text, ANSI_RESET),
            _ => text.to_string(),
        }
    }

    /// Pretty JSON array with one object per clipping plus its match spans.
    pub fn render_json(&self, matched: &[Matched]) -> Result<String, serde_json::Error> {
        let records: Vec<Value> = matched
            .iter()
            .enumerate()
            .map(|(index, m)| self.json_record(index, m))
            .collect::<Result<_, _>>()?;

        serde_json::to_string_pretty(&records)
    }

    fn json_record(&self, index: usize, matched: &Matched) -> Result<Value, serde_json::Error> {
        let clipping = matched.clipping;
        let mut object = Map::new();

        for &field in &self.fields {
            let value = match field {
                Field::Number => Value::from(index),
                Field::PageStart => Value::from(clipping.page_start),
                Field::PageEnd => Value::from(clipping.page_end),
                _ => Value::from(field_value(field, index, clipping)),
            };
            object.insert(field.name().to_string(), value);
        }

        let spans: Vec<JsonSpan> = [Field::Title, Field::Author, Field::HighlightText]
            .into_iter()
            .filter(|field| self.fields.contains(field))
            .filter_map(|field| {
                let span = matched.spans.get(field)?;
                let haystack = match field {
                    Field::Title => &clipping.title,
                    Field::Author => &clipping.author,
                    _ => &clipping.highlight_text,
                };
                Some(JsonSpan::new(field, span, haystack))
            })
            .collect();

        object.insert("matches".to_string(), serde_json::to_value(spans)?);
        Ok(Value::Object(object))
    }
}

#[derive(Debug, Serialize)]
struct JsonSpan<'a> {
    field: &'static str,
    start: usize,
    end: usize,
    text: &'a str,
}

impl<'a> JsonSpan<'a> {
    fn new(field: Field, span: Span, haystack: &'a str) -> Self {
        Self {
            field: field.name(),
            start: span.start,
            end: span.end,
            text: span.as_str(haystack),
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MatchSpans;
    use chrono::NaiveDate;

    fn meditations() -> Clipping {
        Clipping {
            title: "Meditations".to_string(),
            author: "Marcus Aurelius".to_string(),
            page_start: 482,
            page_end: 483,
            created_at: NaiveDate::from_ymd_opt(2018, 4, 3)
                .unwrap()
                .and_hms_opt(21, 14, 12)
                .unwrap(),
            highlight_text: "Memento mori.".to_string(),
        }
    }

    fn unmatched(clipping: &Clipping) -> Matched<'_> {
        Matched {
            clipping,
            spans: MatchSpans::default(),
        }
    }

    #[test]
    fn test_render_default_fields_plain() {
        let clipping = meditations();
        let renderer = Renderer::new(parse_fields(None), Style::Plain);

        let lines = renderer.render(&[unmatched(&clipping)]);

        assert_eq!(
            lines,
            vec![r#""0","Meditations","Marcus Aurelius","482","483","2018-04-03 21:14","Memento mori.""#]
        );
    }

    #[test]
    fn test_render_counts_emitted_records() {
        let clipping = meditations();
        let renderer = Renderer::new(vec![Field::Number, Field::Title], Style::Plain);

        let lines = renderer.render(&[unmatched(&clipping), unmatched(&clipping)]);

        assert_eq!(lines[0], r#""0","Meditations""#);
        assert_eq!(lines[1], r#""1","Meditations""#);
    }

    #[test]
    fn test_render_escapes_quotes() {
        let mut clipping = meditations();
        clipping.highlight_text = r#"He said "no"."#.to_string();
        let renderer = Renderer::new(vec![Field::HighlightText], Style::Plain);

        let lines = renderer.render(&[unmatched(&clipping)]);

        assert_eq!(lines[0], r#""He said ""no"".""#);
    }

    #[test]
    fn test_render_ansi_marks_match() {
        let clipping = meditations();
        let matched = Matched {
            clipping: &clipping,
            spans: MatchSpans {
                author: Some(Span { start: 0, end: 6 }),
                ..Default::default()
            },
        };
        let renderer = Renderer::new(vec![Field::Author], Style::Ansi);

        let line = renderer.render_line(0, &matched);

        assert_eq!(
            line,
            "\x1b[90m\"\x1b[0m\x1b[30;103mMarcus\x1b[0m\x1b[35m Aurelius\x1b[0m\x1b[90m\"\x1b[0m"
        );
    }

    #[test]
    fn test_render_plain_ignores_spans() {
        let clipping = meditations();
        let matched = Matched {
            clipping: &clipping,
            spans: MatchSpans {
                title: Some(Span { start: 0, end: 4 }),
                ..Default::default()
            },
        };
        let renderer = Renderer::new(vec![Field::Title], Style::Plain);

        assert_eq!(renderer.render_line(0, &matched), r#""Meditations""#);
    }

    #[test]
    fn test_parse_fields_keeps_caller_order_and_drops_unknown() {
        let fields = parse_fields(Some("TEXT, highlightText,#,bookTitle,isbn"));

        assert_eq!(fields, vec![Field::HighlightText, Field::Number, Field::Title]);
    }

    #[test]
    fn test_parse_fields_all_unknown_falls_back() {
        assert_eq!(parse_fields(Some("foo,bar")), Field::ALL.to_vec());
    }

    #[test]
    fn test_render_json_includes_spans() {
        let clipping = meditations();
        let matched = Matched {
            clipping: &clipping,
            spans: MatchSpans {
                highlight_text: Some(Span { start: 8, end: 12 }),
                ..Default::default()
            },
        };
        let renderer = Renderer::new(
            vec![Field::Number, Field::PageStart, Field::HighlightText],
            Style::Plain,
        );

        let json = renderer.render_json(&[matched]).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["#"], 0);
        assert_eq!(value[0]["pageStart"], 482);
        assert_eq!(value[0]["highlightText"], "Memento mori.");
        assert_eq!(value[0]["matches"][0]["field"], "highlightText");
        assert_eq!(value[0]["matches"][0]["text"], "mori");
        assert!(value[0].get("title").is_none());
    }

    #[test]
    fn test_style_resolve() {
        assert_eq!(Style::resolve(ColorChoice::Always, false, true), Style::Ansi);
        assert_eq!(Style::resolve(ColorChoice::Never, true, false), Style::Plain);
        assert_eq!(Style::resolve(ColorChoice::Auto, true, false), Style::Ansi);
        assert_eq!(Style::resolve(ColorChoice::Auto, true, true), Style::Plain);
        assert_eq!(Style::resolve(ColorChoice::Auto, false, false), Style::Plain);
    }
}
