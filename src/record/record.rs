use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{RecordError, RecordResult};
use super::schema::TableInfo;
use super::value::{LENGTH_PREFIX_SIZE, Value};
use crate::file::PageId;

/// Slot identifier within a data page
pub type SlotId = usize;

/// Physical identifier for a record (page + slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot_id)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (page, slot) = s
            .trim()
            .split_once('#')
            .ok_or_else(|| format!("Invalid record id '{}', expected file:page#slot", s))?;
        let page_id = page.parse()?;
        let slot_id = slot
            .parse()
            .map_err(|_| format!("Invalid slot '{}'", slot))?;
        Ok(Self::new(page_id, slot_id))
    }
}

/// A single record (row) with typed values
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Create a new record
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if record is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by index
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Encoded size of this record. Depends on the actual lengths of
    /// variable-width values, not only on the schema.
    pub fn encoded_size(&self, table: &TableInfo) -> RecordResult<usize> {
        table.validate_record(&self.values)?;
        Ok(self
            .values
            .iter()
            .zip(table.columns())
            .map(|(value, col)| value.encoded_size(&col.col_type))
            .sum())
    }

    /// Serialize record to bytes according to schema
    /// Format: [fixed columns in declaration order] [len + bytes of each variable column]
    pub fn serialize(&self, table: &TableInfo) -> RecordResult<Vec<u8>> {
        let size = self.encoded_size(table)?;
        let mut result = Vec::with_capacity(size);

        // 1. Fixed-width columns
        for (value, col) in self.values.iter().zip(table.columns()) {
            if col.col_type.is_fixed() {
                value.encode_into(&col.col_type, &mut result)?;
            }
        }

        // 2. Variable-width columns, packed after the fixed region
        for (value, col) in self.values.iter().zip(table.columns()) {
            if !col.col_type.is_fixed() {
                value.encode_into(&col.col_type, &mut result)?;
            }
        }

        Ok(result)
    }

    /// Deserialize record from bytes according to schema
    pub fn deserialize(data: &[u8], table: &TableInfo) -> RecordResult<Self> {
        let fixed_size = table.fixed_size();
        if data.len() < fixed_size {
            return Err(RecordError::CorruptRecord(format!(
                "Expected at least {} bytes, got {}",
                fixed_size,
                data.len()
            )));
        }

        let mut values: Vec<Option<Value>> = vec![None; table.column_count()];

        let mut offset = 0;
        for (i, col) in table.columns().iter().enumerate() {
            if col.col_type.is_fixed() {
                let width = col.col_type.width();
                values[i] = Some(Value::decode_fixed(
                    &data[offset..offset + width],
                    &col.col_type,
                )?);
                offset += width;
            }
        }

        for (i, col) in table.columns().iter().enumerate() {
            if col.col_type.is_fixed() {
                continue;
            }

            let prefix_end = offset + LENGTH_PREFIX_SIZE;
            let prefix = data.get(offset..prefix_end).ok_or_else(|| {
                RecordError::CorruptRecord(format!(
                    "Length prefix of column '{}' exceeds record bounds",
                    col.name
                ))
            })?;
            let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

            let end = prefix_end + len;
            let bytes = data.get(prefix_end..end).ok_or_else(|| {
                RecordError::CorruptRecord(format!(
                    "Column '{}' declares {} bytes past record end",
                    col.name, len
                ))
            })?;
            if len > col.col_type.width() {
                return Err(RecordError::CorruptRecord(format!(
                    "Column '{}' length {} exceeds maximum {}",
                    col.name,
                    len,
                    col.col_type.width()
                )));
            }
            values[i] = Some(Value::decode_str(bytes)?);
            offset = end;
        }

        if offset != data.len() {
            return Err(RecordError::CorruptRecord(format!(
                "{} trailing bytes after last column",
                data.len() - offset
            )));
        }

        Ok(Record {
            values: values.into_iter().flatten().collect(),
        })
    }
}
