use std::fmt;

use pg_escape::quote_identifier;

/// A schema qualified Postgres table name.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the name quoted for interpolation into SQL, e.g. `public."Order Details"`.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(
            TableName::new("public", "customers").as_quoted_identifier(),
            "public.customers"
        );
        assert_eq!(
            TableName::new("public", "Order Details").as_quoted_identifier(),
            "public.\"Order Details\""
        );
    }
}
