use crate::models::{Clipping, Field};
use regex::{Regex, RegexBuilder};

/// Which command-line query a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Combined,
    Title,
    Author,
    Text,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            QueryKind::Combined => "combined (-q)",
            QueryKind::Title => "title (-b)",
            QueryKind::Author => "author (-a)",
            QueryKind::Text => "highlight text (-t)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, PartialEq)]
pub enum QueryError {
    InvalidRegex {
        kind: QueryKind,
        pattern: String,
        message: String,
    },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidRegex {
                kind,
                pattern,
                message,
            } => {
                write!(f, "Invalid {} query '{}': {}", kind, pattern, message)
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Raw query patterns as given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub combined: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_flags(ascending: bool, descending: bool) -> Self {
        if descending {
            SortOrder::Descending
        } else if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::None
        }
    }
}

/// Compiled, case-insensitive patterns. The combined pattern wins over a
/// field-specific one.
#[derive(Debug, Clone, Default)]
pub struct Query {
    title: Option<Regex>,
    author: Option<Regex>,
    text: Option<Regex>,
}

impl Query {
    pub fn compile(options: &QueryOptions) -> Result<Self, QueryError> {
        if let Some(combined) = compile_pattern(QueryKind::Combined, options.combined.as_deref())? {
            return Ok(Query {
                title: Some(combined.clone()),
                author: Some(combined.clone()),
                text: Some(combined),
            });
        }

        Ok(Query {
            title: compile_pattern(QueryKind::Title, options.title.as_deref())?,
            author: compile_pattern(QueryKind::Author, options.author.as_deref())?,
            text: compile_pattern(QueryKind::Text, options.text.as_deref())?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.text.is_none()
    }

    /// First match per field, or `None` when the clipping is filtered out.
    pub fn matches(&self, clipping: &Clipping) -> Option<MatchSpans> {
        let spans = MatchSpans {
            title: find_span(&self.title, &clipping.title),
            author: find_span(&self.author, &clipping.author),
            highlight_text: find_span(&self.text, &clipping.highlight_text),
        };

        if self.is_empty() || !spans.is_empty() {
            Some(spans)
        } else {
            None
        }
    }
}

fn compile_pattern(kind: QueryKind, pattern: Option<&str>) -> Result<Option<Regex>, QueryError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| QueryError::InvalidRegex {
            kind,
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn find_span(re: &Option<Regex>, haystack: &str) -> Option<Span> {
    let m = re.as_ref()?.find(haystack)?;
    Some(Span {
        start: m.start(),
        end: m.end(),
    })
}

/// Byte range of a match inside a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn as_str(self, haystack: &str) -> &str {
        &haystack[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSpans {
    pub title: Option<Span>,
    pub author: Option<Span>,
    pub highlight_text: Option<Span>,
}

impl MatchSpans {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.highlight_text.is_none()
    }

    pub fn get(&self, field: Field) -> Option<Span> {
        match field {
            Field::Title => self.title,
            Field::Author => self.author,
            Field::HighlightText => self.highlight_text,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matched<'a> {
    pub clipping: &'a Clipping,
    pub spans: MatchSpans,
}

/// Filters by `query` and orders by creation time. Sorting is stable, so
/// clippings with equal timestamps keep file order.
pub fn apply<'a>(clippings: &'a [Clipping], query: &Query, order: SortOrder) -> Vec<Matched<'a>> {
    let mut matched: Vec<Matched<'a>> = clippings
        .iter()
        .filter_map(|clipping| {
            query
                .matches(clipping)
                .map(|spans| Matched { clipping, spans })
        })
        .collect();

    match order {
        SortOrder::None => {}
        SortOrder::Ascending => matched.sort_by_key(|m| m.clipping.created_at),
        SortOrder::Descending => {
            matched.sort_by(|a, b| b.clipping.created_at.cmp(&a.clipping.created_at))
        }
    }

    matched
}
