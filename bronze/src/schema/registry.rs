use std::collections::HashMap;

use crate::bail;
use crate::error::{BronzeResult, ErrorKind};
use crate::schema::{FieldDescriptor, FieldType, TableDescriptor};

/// Tables synchronized when a run does not name any.
pub const DEFAULT_TABLES: [&str; 8] = [
    "customers",
    "orders",
    "order_details",
    "products",
    "employees",
    "suppliers",
    "categories",
    "shippers",
];

/// Immutable map from source table name to its [`TableDescriptor`].
///
/// Built once at start-up and shared read-only between table syncs.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    descriptors: Vec<TableDescriptor>,
    positions: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Builds a registry from `descriptors`, rejecting duplicate table names.
    pub fn new(descriptors: Vec<TableDescriptor>) -> BronzeResult<SchemaRegistry> {
        let mut positions = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            if positions.insert(descriptor.name.clone(), position).is_some() {
                bail!(
                    ErrorKind::ConfigError,
                    "Duplicate table in schema registry",
                    descriptor.name
                );
            }
        }

        Ok(SchemaRegistry {
            descriptors,
            positions,
        })
    }

    /// Returns the registry of the Northwind sample database.
    pub fn northwind() -> SchemaRegistry {
        let descriptors = northwind_descriptors();
        let positions = descriptors
            .iter()
            .enumerate()
            .map(|(position, descriptor)| (descriptor.name.clone(), position))
            .collect();

        SchemaRegistry {
            descriptors,
            positions,
        }
    }

    /// Returns the descriptor of `table_name`.
    ///
    /// Fails with [`ErrorKind::SchemaNotFound`] for tables that are not registered.
    pub fn lookup(&self, table_name: &str) -> BronzeResult<&TableDescriptor> {
        match self.positions.get(table_name) {
            Some(&position) => Ok(&self.descriptors[position]),
            None => bail!(
                ErrorKind::SchemaNotFound,
                "No schema registered for table",
                table_name
            ),
        }
    }

    pub fn contains(&self, table_name: &str) -> bool {
        self.positions.contains_key(table_name)
    }

    /// Returns the registered table names in registration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn required(name: &str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptor::required(name, field_type)
}

fn nullable(name: &str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptor::nullable(name, field_type)
}

fn strings(names: &[&str]) -> impl Iterator<Item = FieldDescriptor> {
    names.iter().map(|name| nullable(name, FieldType::String))
}

fn northwind_descriptors() -> Vec<TableDescriptor> {
    use FieldType::*;

    let customers = std::iter::once(required("customer_id", String))
        .chain(strings(&[
            "company_name",
            "contact_name",
            "contact_title",
            "address",
            "city",
            "region",
            "postal_code",
            "country",
            "phone",
            "fax",
        ]))
        .collect();

    let orders = [
        required("order_id", Integer),
        nullable("customer_id", String),
        nullable("employee_id", Integer),
        nullable("order_date", Date),
        nullable("required_date", Date),
        nullable("shipped_date", Date),
        nullable("ship_via", Integer),
        nullable("freight", Numeric),
    ]
    .into_iter()
    .chain(strings(&[
        "ship_name",
        "ship_address",
        "ship_city",
        "ship_region",
        "ship_postal_code",
        "ship_country",
    ]))
    .collect();

    let order_details = vec![
        required("order_id", Integer),
        required("product_id", Integer),
        nullable("unit_price", Numeric),
        nullable("quantity", Integer),
        nullable("discount", Float),
    ];

    let products = vec![
        required("product_id", Integer),
        nullable("product_name", String),
        nullable("supplier_id", Integer),
        nullable("category_id", Integer),
        nullable("quantity_per_unit", String),
        nullable("unit_price", Numeric),
        nullable("units_in_stock", Integer),
        nullable("units_on_order", Integer),
        nullable("reorder_level", Integer),
        nullable("discontinued", Boolean),
    ];

    let employees = [
        required("employee_id", Integer),
        nullable("last_name", String),
        nullable("first_name", String),
        nullable("title", String),
        nullable("title_of_courtesy", String),
        nullable("birth_date", Date),
        nullable("hire_date", Date),
    ]
    .into_iter()
    .chain(strings(&[
        "address",
        "city",
        "region",
        "postal_code",
        "country",
        "home_phone",
        "extension",
        "notes",
    ]))
    .chain(std::iter::once(nullable("reports_to", Integer)))
    .collect();

    let suppliers = std::iter::once(required("supplier_id", Integer))
        .chain(strings(&[
            "company_name",
            "contact_name",
            "contact_title",
            "address",
            "city",
            "region",
            "postal_code",
            "country",
            "phone",
            "fax",
            "homepage",
        ]))
        .collect();

    let categories = std::iter::once(required("category_id", Integer))
        .chain(strings(&["category_name", "description"]))
        .collect();

    let shippers = std::iter::once(required("shipper_id", Integer))
        .chain(strings(&["company_name", "phone"]))
        .collect();

    vec![
        TableDescriptor::with_sync_metadata("customers", customers),
        TableDescriptor::with_sync_metadata("orders", orders),
        TableDescriptor::with_sync_metadata("order_details", order_details),
        TableDescriptor::with_sync_metadata("products", products),
        TableDescriptor::with_sync_metadata("employees", employees),
        TableDescriptor::with_sync_metadata("suppliers", suppliers),
        TableDescriptor::with_sync_metadata("categories", categories),
        TableDescriptor::with_sync_metadata("shippers", shippers),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EXTRACTED_AT_FIELD, LOADED_AT_FIELD};

    #[test]
    fn every_default_table_has_a_non_empty_descriptor() {
        let registry = SchemaRegistry::northwind();

        assert_eq!(registry.len(), DEFAULT_TABLES.len());
        for table in DEFAULT_TABLES {
            let descriptor = registry.lookup(table).unwrap();
            assert_eq!(descriptor.name, table);
            assert!(descriptor.fields.len() > 2, "{table} has no data fields");
            assert!(descriptor.fields[0].required, "{table} key is nullable");
            assert!(descriptor.field(EXTRACTED_AT_FIELD).is_some());
            assert!(descriptor.field(LOADED_AT_FIELD).is_some());
        }
    }

    #[test]
    fn registration_order_matches_default_tables() {
        let registry = SchemaRegistry::northwind();

        assert!(registry.table_names().eq(DEFAULT_TABLES));
    }

    #[test]
    fn descriptors_keep_column_types() {
        let registry = SchemaRegistry::northwind();

        let orders = registry.lookup("orders").unwrap();
        assert_eq!(
            orders.field("freight").map(|f| f.field_type),
            Some(FieldType::Numeric)
        );
        assert_eq!(
            orders.field("shipped_date").map(|f| f.field_type),
            Some(FieldType::Date)
        );

        let details = registry.lookup("order_details").unwrap();
        assert!(details.field("product_id").unwrap().required);
        assert_eq!(
            details.field("discount").map(|f| f.field_type),
            Some(FieldType::Float)
        );

        let employees = registry.lookup("employees").unwrap();
        assert_eq!(employees.fields.len(), 16 + 2);
        assert_eq!(employees.fields[15].name, "reports_to");
    }

    #[test]
    fn unknown_table_is_schema_not_found() {
        let registry = SchemaRegistry::northwind();

        let err = registry.lookup("invoices").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaNotFound);
        assert_eq!(err.detail(), Some("invoices"));
        assert!(!registry.contains("invoices"));
    }

    #[test]
    fn duplicate_tables_are_rejected() {
        let err = SchemaRegistry::new(vec![
            TableDescriptor::new("shippers", vec![]),
            TableDescriptor::new("shippers", vec![]),
        ])
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
