use serde::{Deserialize, Serialize};

use super::error::{RecordError, RecordResult};
use super::value::{ColType, Value};
use crate::file::PageId;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColInfo {
    pub name: String,
    pub col_type: ColType,
}

impl ColInfo {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, col_type: ColType) -> Self {
        Self {
            name: name.into(),
            col_type,
        }
    }
}

/// Table schema plus the entry point into the table's page chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    name: String,
    columns: Vec<ColInfo>,
    header_page_id: PageId,
}

impl TableInfo {
    /// Create a new table descriptor
    pub fn new(name: impl Into<String>, columns: Vec<ColInfo>, header_page_id: PageId) -> Self {
        Self {
            name: name.into(),
            columns,
            header_page_id,
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all columns
    pub fn columns(&self) -> &[ColInfo] {
        &self.columns
    }

    /// Get column count
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Header page of the table's free-space directory
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Size of the region holding all fixed-width columns
    pub fn fixed_size(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.col_type.is_fixed())
            .map(|c| c.col_type.width())
            .sum()
    }

    /// Validate values against this schema
    pub fn validate_record(&self, values: &[Value]) -> RecordResult<()> {
        if values.len() != self.columns.len() {
            return Err(RecordError::SchemaMismatch(format!(
                "Expected {} columns, got {}",
                self.columns.len(),
                values.len()
            )));
        }

        for (value, col) in values.iter().zip(&self.columns) {
            value.check(&col.col_type).map_err(|err| match err {
                RecordError::TypeMismatch { expected, actual } => RecordError::TypeMismatch {
                    expected: format!("{} for column '{}'", expected, col.name),
                    actual,
                },
                other => other,
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> TableInfo {
        TableInfo::new(
            "test_table",
            vec![
                ColInfo::new("id", ColType::Int),
                ColInfo::new("name", ColType::VarString(20)),
                ColInfo::new("code", ColType::String(3)),
                ColInfo::new("score", ColType::Float),
            ],
            PageId::new(0, 0),
        )
    }

    #[test]
    fn test_table_creation() {
        let table = create_test_table();
        assert_eq!(table.name(), "test_table");
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.fixed_size(), 4 + 3 + 4);
    }

    #[test]
    fn test_validate_record() {
        let table = create_test_table();
        let ok = vec![
            Value::Int(1),
            Value::String("Alice".to_string()),
            Value::String("abc".to_string()),
            Value::Float(95.5),
        ];
        assert!(table.validate_record(&ok).is_ok());

        let wrong_type = vec![
            Value::String("1".to_string()),
            Value::String("Alice".to_string()),
            Value::String("abc".to_string()),
            Value::Float(95.5),
        ];
        assert!(matches!(
            table.validate_record(&wrong_type),
            Err(RecordError::TypeMismatch { .. })
        ));

        assert!(matches!(
            table.validate_record(&ok[..2]),
            Err(RecordError::SchemaMismatch(_))
        ));
    }
}
