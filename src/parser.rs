use crate::models::Clipping;
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\((.*)\)\s*$").unwrap());
static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*Location (\S+(?:-\S+)?) \| Added on (.+)$").unwrap());

const DELIMITER: &str = "======";

// e.g. "Tuesday, April 3, 2018 9:14:12 PM"
const DATE_FORMATS: &[&str] = &["%A, %B %d, %Y %I:%M:%S %p", "%A, %B %d, %Y %I:%M %p"];

#[derive(Debug, PartialEq)]
pub enum ParseError {
    MalformedTitleLine { line_number: usize, line: String },
    MalformedLocationLine { line_number: usize, line: String },
    InvalidDate { line_number: usize, line: String, value: String },
    IncompleteRecord { line_number: usize, title: String },
    SourceUnavailable { path: String, message: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MalformedTitleLine { line_number, line } => {
                write!(
                    f,
                    "Line {}: expected '<title> (<author>)', found {:?}",
                    line_number, line
                )
            }
            ParseError::MalformedLocationLine { line_number, line } => {
                write!(
                    f,
                    "Line {}: expected '... Location <n>[-<m>] | Added on <date>', found {:?}",
                    line_number, line
                )
            }
            ParseError::InvalidDate {
                line_number,
                line,
                value,
            } => {
                write!(
                    f,
                    "Line {}: invalid date '{}' in {:?}. Expected e.g. 'Tuesday, April 3, 2018 9:14:12 PM'",
                    line_number, value, line
                )
            }
            ParseError::IncompleteRecord { line_number, title } => {
                write!(
                    f,
                    "Line {}: clipping for '{}' ended before its location line",
                    line_number, title
                )
            }
            ParseError::SourceUnavailable { path, message } => {
                write!(f, "Cannot read clippings file '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Title and author taken from the first line of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleLine {
    pub title: String,
    pub author: String,
}

/// Location range and timestamp taken from the second line of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationLine {
    pub page_start: u32,
    pub page_end: u32,
    pub created_at: NaiveDateTime,
}

pub fn is_delimiter(line: &str) -> bool {
    line.contains(DELIMITER)
}

pub fn parse_title_line(line: &str) -> Option<TitleLine> {
    let caps = TITLE_RE.captures(line)?;
    Some(TitleLine {
        title: trim_field(&caps[1]),
        author: trim_field(&caps[2]),
    })
}

/// Splits a location line into its raw range and date parts.
pub fn parse_location_line(line: &str) -> Option<(&str, &str)> {
    let caps = LOCATION_RE.captures(line)?;
    let range = caps.get(1)?.as_str();
    let date = caps.get(2)?.as_str();
    Some((range, date))
}

/// `"482-483"` -> `(482, 483)`, `"1200"` -> `(1200, 1200)`.
pub fn parse_range(range: &str) -> Option<(u32, u32)> {
    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (start.parse().ok()?, end.parse().ok()?),
        None => {
            let single = range.parse().ok()?;
            (single, single)
        }
    };

    if start > end {
        return None;
    }

    Some((start, end))
}

pub fn parse_added_on(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

// Kindle prefixes title lines with a byte order mark.
fn trim_field(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}

#[derive(Debug, Default)]
struct PendingClipping {
    start_line: usize,
    title: Option<TitleLine>,
    location: Option<LocationLine>,
    highlight_text: String,
}

impl PendingClipping {
    fn is_empty(&self) -> bool {
        self.title.is_none()
    }
}

/// Line-at-a-time state machine over a clippings export.
///
/// Each block moves through title -> location -> highlight text and is
/// sealed by a delimiter line. The first malformed line aborts the parse.
#[derive(Debug, Default)]
pub struct ClippingParser {
    pending: PendingClipping,
    clippings: Vec<Clipping>,
}

impl ClippingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line. `line_number` is 1-based and only used for errors.
    pub fn feed(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        if is_delimiter(line) {
            return self.seal(line_number);
        }

        if self.pending.title.is_none() {
            // Stray blank lines between blocks.
            if trim_field(line).is_empty() {
                return Ok(());
            }
            let title = parse_title_line(line).ok_or_else(|| ParseError::MalformedTitleLine {
                line_number,
                line: line.to_string(),
            })?;
            self.pending.start_line = line_number;
            self.pending.title = Some(title);
        } else if self.pending.location.is_none() {
            self.pending.location = Some(parse_location(line_number, line)?);
        } else if !line.trim().is_empty() {
            self.pending.highlight_text.push_str(line);
        }

        Ok(())
    }

    /// Returns every sealed clipping. A trailing block with no delimiter is dropped.
    pub fn finish(self) -> Vec<Clipping> {
        if let Some(title) = &self.pending.title {
            warn!(
                line = self.pending.start_line,
                title = %title.title,
                "ignoring clipping without a closing delimiter"
            );
        }
        self.clippings
    }

    fn seal(&mut self, line_number: usize) -> Result<(), ParseError> {
        let pending = std::mem::take(&mut self.pending);

        if pending.is_empty() {
            debug!(line = line_number, "skipping empty block");
            return Ok(());
        }

        let (title, location) = match (pending.title, pending.location) {
            (Some(title), Some(location)) => (title, location),
            (title, _) => {
                return Err(ParseError::IncompleteRecord {
                    line_number,
                    title: title.map(|t| t.title).unwrap_or_default(),
                })
            }
        };

        debug!(line = pending.start_line, title = %title.title, "parsed clipping");

        self.clippings.push(Clipping {
            title: title.title,
            author: title.author,
            page_start: location.page_start,
            page_end: location.page_end,
            created_at: location.created_at,
            highlight_text: pending.highlight_text,
        });

        Ok(())
    }
}

fn parse_location(line_number: usize, line: &str) -> Result<LocationLine, ParseError> {
    let malformed = || ParseError::MalformedLocationLine {
        line_number,
        line: line.to_string(),
    };

    let (range, date) = parse_location_line(line).ok_or_else(malformed)?;
    let (page_start, page_end) = parse_range(range).ok_or_else(malformed)?;
    let created_at = parse_added_on(date).ok_or_else(|| ParseError::InvalidDate {
        line_number,
        line: line.to_string(),
        value: date.to_string(),
    })?;

    Ok(LocationLine {
        page_start,
        page_end,
        created_at,
    })
}

pub fn parse<I, S>(lines: I) -> Result<Vec<Clipping>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = ClippingParser::new();
    for (idx, line) in lines.into_iter().enumerate() {
        parser.feed(idx + 1, line.as_ref())?;
    }
    Ok(parser.finish())
}

pub fn parse_str(content: &str) -> Result<Vec<Clipping>, ParseError> {
    parse(split_lines(content))
}

/// Splits on LF, CRLF or a lone CR.
pub fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(content);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(|c: char| c == '\r' || c == '\n') {
            Some(idx) => {
                let skip = if current[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[idx + skip..]);
                Some(&current[..idx])
            }
            None => {
                rest = None;
                (!current.is_empty()).then_some(current)
            }
        }
    })
}

pub fn read_clippings(path: &Path) -> Result<Vec<Clipping>, ParseError> {
    let bytes = std::fs::read(path).map_err(|e| ParseError::SourceUnavailable {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let content = String::from_utf8_lossy(&bytes);
    parse_str(&content)
}
