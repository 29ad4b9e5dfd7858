use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Clipping {
    pub title: String,
    pub author: String,
    pub page_start: u32,
    pub page_end: u32,
    pub created_at: NaiveDateTime,
    pub highlight_text: String,
}

/// A renderable column of a clipping, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Number,
    Title,
    Author,
    PageStart,
    PageEnd,
    CreatedAt,
    HighlightText,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Number,
        Field::Title,
        Field::Author,
        Field::PageStart,
        Field::PageEnd,
        Field::CreatedAt,
        Field::HighlightText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Number => "#",
            Field::Title => "title",
            Field::Author => "author",
            Field::PageStart => "pageStart",
            Field::PageEnd => "pageEnd",
            Field::CreatedAt => "createdAt",
            Field::HighlightText => "highlightText",
        }
    }

    /// Looks a field up by canonical name or by the older export names
    /// (`bookTitle`, `createdDate`, `highlightedText`), ignoring case.
    pub fn from_name(name: &str) -> Option<Field> {
        let lower = name.trim().to_lowercase();
        let field = match lower.as_str() {
            "#" => Field::Number,
            "title" | "booktitle" => Field::Title,
            "author" => Field::Author,
            "pagestart" => Field::PageStart,
            "pageend" => Field::PageEnd,
            "createdat" | "createddate" => Field::CreatedAt,
            "highlighttext" | "highlightedtext" => Field::HighlightText,
            _ => return None,
        };
        Some(field)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
