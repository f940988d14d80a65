use std::fmt;

/// Name of the metadata field holding the extraction timestamp of a row.
pub const EXTRACTED_AT_FIELD: &str = "extracted_at";
/// Name of the metadata field holding the load timestamp of a row.
pub const LOADED_AT_FIELD: &str = "loaded_at";

/// Logical type of a destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    /// Floating point.
    Float,
    /// Fixed point decimal.
    Numeric,
    Boolean,
    Date,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Numeric => "NUMERIC",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Date => "DATE",
            FieldType::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single destination field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Whether the destination rejects nulls in this field.
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
        }
    }

    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, true)
    }

    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, false)
    }
}

/// The destination schema of one source table.
///
/// Field order is the column order of the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Source table name, also the registry key.
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Creates a descriptor whose fields end with the `extracted_at` and `loaded_at` timestamps.
    pub fn with_sync_metadata(name: impl Into<String>, mut fields: Vec<FieldDescriptor>) -> Self {
        fields.push(FieldDescriptor::nullable(
            EXTRACTED_AT_FIELD,
            FieldType::Timestamp,
        ));
        fields.push(FieldDescriptor::nullable(LOADED_AT_FIELD, FieldType::Timestamp));

        Self::new(name, fields)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Returns the name of the destination table, `prefix` followed by the source table name.
    pub fn destination_table_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name)
    }
}
