use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::Value;

/// An extracted row: field names mapped to normalized values, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Row {
        Row::default()
    }

    pub fn with_capacity(capacity: usize) -> Row {
        Row {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name` to `value`, replacing an earlier value of the same field in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N> FromIterator<(N, Value)> for Row
where
    N: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }

        row
    }
}

/// Serializes as a JSON object keyed by field name.
impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_object_in_field_order() {
        let row: Row = [
            ("order_id", Value::Integer(10248)),
            ("freight", Value::Float(32.38)),
            ("ship_region", Value::Null),
            ("customer_id", Value::from("VINET")),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"order_id":10248,"freight":32.38,"ship_region":null,"customer_id":"VINET"}"#
        );
    }

    #[test]
    fn insert_replaces_existing_field() {
        let mut row = Row::new();
        row.insert("loaded_at", Value::Null);
        row.insert("loaded_at", Value::from("2024-05-01T00:00:00Z"));

        assert_eq!(row.len(), 1);
        assert_eq!(
            row.get("loaded_at").and_then(Value::as_str),
            Some("2024-05-01T00:00:00Z")
        );
    }
}
