use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A persisted to-do row. `version` is the concurrency token checked on update.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: i64,
    pub fields: TodoFields,
    pub version: i64,
}

/// The mutable part of a to-do item, also the create-request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFields {
    pub user_id: String,
    pub r#type: String,
    pub content: String,
    #[serde(default, with = "end_date")]
    pub end_date: Option<OffsetDateTime>,
}

/// Full-record view of a to-do item as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoView {
    pub id: i64,
    #[serde(flatten)]
    pub fields: TodoFields,
}

impl From<TodoItem> for TodoView {
    fn from(item: TodoItem) -> Self {
        TodoView {
            id: item.id,
            fields: item.fields,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "userName", alias = "username")]
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login response. The submitted password is echoed back in `registration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(flatten)]
    pub registration: Registration,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub username: String,
    pub password: String,
}

/// `endDate` is written as RFC 3339. Reads also take an offset-less
/// ISO 8601 date-time, which is taken as UTC.
mod end_date {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }

    pub(super) fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
            PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(PrimitiveDateTime::assume_utc)
        })
    }
}
