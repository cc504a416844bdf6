use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;

/// A book row as stored and as serialized on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    /// Surrogate key assigned by the datastore
    pub id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Expected to be 1-5, not enforced
    pub rating: Option<i32>,
}

/// Fields for a row about to be inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<i32>,
}

/// Body of `POST /books`: either a search or the fields of a new book.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookRequest {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
}

impl BookRequest {
    /// The search term, if this request is a search. Empty terms are not.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|term| !term.is_empty())
    }

    pub fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            rating: self.rating,
        }
    }
}

/// Body of `PATCH /books/{id}`.
///
/// `rating` keeps the raw JSON so an explicit `null` can be told apart from
/// an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingUpdate {
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Error, PartialEq)]
#[error("rating {0} is not an integer")]
pub struct InvalidRating(pub Value);

impl RatingUpdate {
    /// Coerce the requested rating to an integer.
    ///
    /// Integers, finite floats (truncated) and numeric strings are accepted.
    pub fn rating(&self) -> Result<Option<i32>, InvalidRating> {
        self.rating.as_ref().map(coerce_rating).transpose()
    }
}

fn coerce_rating(value: &Value) -> Result<i32, InvalidRating> {
    let invalid = || InvalidRating(value.clone());

    let wide = match value {
        Value::Number(number) => match number.as_i64() {
            Some(int) => int,
            None => match number.as_f64() {
                Some(float) if float.is_finite() && float.abs() < i64::MAX as f64 => {
                    float.trunc() as i64
                }
                _ => return Err(invalid()),
            },
        },
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    i32::try_from(wide).map_err(|_| invalid())
}

/// `GET /books` and search responses.
#[derive(Debug, Clone, Serialize)]
pub struct BooksResponse {
    pub success: bool,
    pub books: Vec<Book>,
    pub total_books: i64,
}

/// Response to a successful insert.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub created: i64,
    pub books: Vec<Book>,
    pub total_books: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted: i64,
    pub books: Vec<Book>,
    pub total_books: i64,
}
