use bookshelf_db::Record;
use bookshelf_http::{Rule, ValidationErrors, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

const MAX_LEN: usize = 255;

const TITLE_RULES: &[Rule] = &[Rule::Required, Rule::String, Rule::Max(MAX_LEN)];
const ISBN_RULES: &[Rule] = &[Rule::Required, Rule::StringOrInteger, Rule::Max(MAX_LEN)];
const TITLE_PATCH_RULES: &[Rule] = &[Rule::Filled, Rule::String, Rule::Max(MAX_LEN)];
const ISBN_PATCH_RULES: &[Rule] = &[Rule::Filled, Rule::StringOrInteger, Rule::Max(MAX_LEN)];

/// Book as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier
    pub id: i64,
    /// Title of the book
    pub title: String,
    /// ISBN, always rendered as a string
    pub isbn: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Record<BookFields>> for Book {
    fn from(record: Record<BookFields>) -> Self {
        Self {
            id: record.id,
            title: record.data.title,
            isbn: record.data.isbn,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Client-writable columns of a book. Also the validated body of create and
/// full update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub isbn: String,
}

impl BookFields {
    /// Validate a create or full-update body: both fields are required.
    pub fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        let mut validator = Validator::new(body);
        let title = validator.field("title", TITLE_RULES);
        let isbn = validator.field("isbn", ISBN_RULES);

        validator.finish(|| Self {
            title: title.unwrap_or_default(),
            isbn: isbn.unwrap_or_default(),
        })
    }
}

/// Validated body of a partial update. Absent fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub isbn: Option<String>,
}

impl BookPatch {
    /// Validate a partial-update body: fields are optional, but a submitted
    /// field must carry a valid value.
    pub fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        let mut validator = Validator::new(body);
        let title = validator.field("title", TITLE_PATCH_RULES);
        let isbn = validator.field("isbn", ISBN_PATCH_RULES);

        validator.finish(|| Self { title, isbn })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.isbn.is_none()
    }

    pub fn apply(self, fields: &mut BookFields) {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(isbn) = self.isbn {
            fields.isbn = isbn;
        }
    }
}
