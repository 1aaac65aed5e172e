//! `MigrationRecord` - Represents entries in a tenant database's ledger collection

use crate::executor::StoreError;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Bson, Document};
use serde::Serialize;

/// Represents a migration record in a ledger collection
///
/// Stored as `{ name, executedAt, description }`; `description` is omitted
/// when the unit declares none. Existence alone means "applied".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    /// Unit identity (discovery path)
    pub name: String,

    /// When the unit's `execute` returned successfully for this database
    pub executed_at: DateTime<Utc>,

    pub description: Option<String>,
}

impl MigrationRecord {
    #[must_use]
    pub fn new(name: String, executed_at: DateTime<Utc>, description: Option<String>) -> Self {
        Self {
            name,
            executed_at,
            description,
        }
    }

    /// Filter selecting the record of one unit
    pub fn filter_for(name: &str) -> Document {
        doc! { "name": name }
    }

    /// Convert into the stored document; `executedAt` becomes a BSON datetime (millisecond precision)
    pub fn to_document(&self) -> Document {
        let mut document = doc! {
            "name": self.name.as_str(),
            "executedAt": bson::DateTime::from_millis(self.executed_at.timestamp_millis()),
        };
        if let Some(description) = &self.description {
            document.insert("description", description.as_str());
        }
        document
    }

    /// Create a `MigrationRecord` from a stored document
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ParseError` if `name` or `executedAt` is missing or mistyped.
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let name = document
            .get_str("name")
            .map_err(|e| StoreError::ParseError(format!("ledger record name: {e}")))?
            .to_string();

        let executed_at = match document.get("executedAt") {
            Some(Bson::DateTime(dt)) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
                .ok_or_else(|| StoreError::ParseError(format!("ledger record '{name}': executedAt out of range")))?,
            Some(Bson::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::ParseError(format!("ledger record '{name}': executedAt '{s}': {e}")))?,
            Some(other) => {
                return Err(StoreError::ParseError(format!(
                    "ledger record '{name}': executedAt has unexpected type {:?}",
                    other.element_type()
                )))
            }
            None => {
                return Err(StoreError::ParseError(format!(
                    "ledger record '{name}': executedAt is missing"
                )))
            }
        };

        let description = match document.get("description") {
            Some(Bson::String(s)) => Some(s.clone()),
            _ => None,
        };

        Ok(Self {
            name,
            executed_at,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_layout() {
        let executed_at = Utc.with_ymd_and_hms(2022, 12, 18, 19, 28, 0).unwrap();
        let record = MigrationRecord::new(
            "2022/202212181928_add_position.rs".to_string(),
            executed_at,
            Some("Add default positions".to_string()),
        );

        let document = record.to_document();
        assert_eq!(document.get_str("name").unwrap(), "2022/202212181928_add_position.rs");
        assert_eq!(document.get_str("description").unwrap(), "Add default positions");
        assert!(matches!(document.get("executedAt"), Some(Bson::DateTime(_))));

        assert_eq!(MigrationRecord::from_document(&document).unwrap(), record);
    }

    #[test]
    fn test_description_is_omitted_when_absent() {
        let record = MigrationRecord::new("examples/202201010000_hello.rs".to_string(), Utc::now(), None);
        assert!(!record.to_document().contains_key("description"));
    }

    #[test]
    fn test_from_document_rejects_missing_fields() {
        assert!(MigrationRecord::from_document(&doc! { "executedAt": bson::DateTime::now() }).is_err());
        assert!(MigrationRecord::from_document(&doc! { "name": "x" }).is_err());
        assert!(MigrationRecord::from_document(&doc! { "name": "x", "executedAt": 42 }).is_err());
    }

    #[test]
    fn test_from_document_accepts_string_timestamps() {
        let record = MigrationRecord::from_document(&doc! {
            "name": "x",
            "executedAt": "2022-12-18T19:28:00Z",
        })
        .unwrap();
        assert_eq!(record.executed_at, Utc.with_ymd_and_hms(2022, 12, 18, 19, 28, 0).unwrap());
        assert_eq!(record.description, None);
    }
}
