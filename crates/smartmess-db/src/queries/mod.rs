pub mod accounts;
pub mod attendance;
pub mod complaints;
pub mod menus;
pub mod notifications;
pub mod ratings;

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Meal item lists are stored as JSON arrays in TEXT columns.
pub(crate) fn parse_items(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
