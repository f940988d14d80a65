use bronze::error::{BronzeResult, ErrorKind};
use bronze::schema::{FieldDescriptor, FieldType, TableDescriptor};
use bronze::types::Row;
use bronze::bronze_error;

/// Name of the named query parameter carrying a JSON encoded row payload.
pub(crate) const ROWS_PARAMETER: &str = "rows";

/// Returns the BigQuery column type of a [`FieldType`].
pub(crate) fn bigquery_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "string",
        FieldType::Integer => "int64",
        FieldType::Float => "float64",
        FieldType::Numeric => "numeric",
        FieldType::Boolean => "bool",
        FieldType::Date => "date",
        FieldType::Timestamp => "timestamp",
    }
}

/// Generates the column specification of a field for a `create table` statement.
fn column_spec(field: &FieldDescriptor) -> String {
    let mut column_spec = format!("`{}` {}", field.name, bigquery_type(field.field_type));

    if field.required {
        column_spec.push_str(" not null");
    }

    column_spec
}

fn column_list(descriptor: &TableDescriptor) -> String {
    descriptor
        .field_names()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generates the `create table` statement of `descriptor`, a no-op when the table exists.
pub(crate) fn create_table_statement(
    full_table_name: &str,
    descriptor: &TableDescriptor,
) -> String {
    let columns_spec = descriptor
        .fields
        .iter()
        .map(column_spec)
        .collect::<Vec<_>>()
        .join(", ");

    format!("create table if not exists {full_table_name} ({columns_spec})")
}

/// Generates an `insert` statement reading rows from the JSON array bound to `@rows`.
///
/// Each array element is an object keyed by field name, values are cast back to the column type.
pub(crate) fn insert_from_payload_statement(
    full_table_name: &str,
    descriptor: &TableDescriptor,
) -> String {
    let projections = descriptor
        .fields
        .iter()
        .map(|field| {
            format!(
                "cast(json_value(r, '$.\"{name}\"') as {typ}) as `{name}`",
                name = field.name,
                typ = bigquery_type(field.field_type)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "insert into {full_table_name} ({columns}) select {projections} \
         from unnest(json_query_array(@{ROWS_PARAMETER})) as r",
        columns = column_list(descriptor)
    )
}

/// Wraps `statements` in a transaction rolled back when any of them fails.
fn transaction_script(statements: &[String]) -> String {
    let mut script = String::from("begin\n  begin transaction;\n");
    for statement in statements {
        script.push_str("  ");
        script.push_str(statement);
        script.push_str(";\n");
    }
    script.push_str(
        "  commit transaction;\n\
         exception when error then\n  \
         rollback transaction;\n  \
         raise using message = @@error.message;\n\
         end;",
    );

    script
}

/// Generates the script replacing every row of a table with the rows bound to `@rows`.
pub(crate) fn replace_rows_script(full_table_name: &str, descriptor: &TableDescriptor) -> String {
    transaction_script(&[
        format!("delete from {full_table_name} where true"),
        insert_from_payload_statement(full_table_name, descriptor),
    ])
}

/// Generates the statement creating an empty staging copy of `full_table_name`.
///
/// The staging table expires on its own if the run dies before dropping it.
pub(crate) fn create_staging_table_statement(
    full_staging_table_name: &str,
    full_table_name: &str,
) -> String {
    format!(
        "create or replace table {full_staging_table_name} like {full_table_name} \
         options (expiration_timestamp = timestamp_add(current_timestamp(), interval 1 hour))"
    )
}

/// Generates the script replacing every row of a table with the rows of its staging table.
pub(crate) fn swap_from_staging_script(
    full_table_name: &str,
    full_staging_table_name: &str,
    descriptor: &TableDescriptor,
) -> String {
    let columns = column_list(descriptor);

    transaction_script(&[
        format!("delete from {full_table_name} where true"),
        format!(
            "insert into {full_table_name} ({columns}) \
             select {columns} from {full_staging_table_name}"
        ),
    ])
}

pub(crate) fn drop_table_statement(full_table_name: &str) -> String {
    format!("drop table if exists {full_table_name}")
}

/// Encodes rows as JSON arrays of at most `max_payload_bytes` bytes each.
///
/// A single row larger than the limit gets a payload of its own, BigQuery has the final word on
/// whether it fits in a request.
pub(crate) fn encode_payloads(rows: &[Row], max_payload_bytes: usize) -> BronzeResult<Vec<String>> {
    let mut payloads = Vec::new();
    let mut payload = String::from("[");

    for row in rows {
        let encoded = serde_json::to_string(row).map_err(|err| {
            bronze_error!(
                ErrorKind::SerializationError,
                "Failed to encode row for BigQuery",
                err
            )
        })?;

        // The closing bracket and, for a non empty payload, the separator.
        let separator = usize::from(payload.len() > 1);
        if payload.len() > 1 && payload.len() + separator + encoded.len() + 1 > max_payload_bytes {
            payload.push(']');
            payloads.push(payload);
            payload = String::from("[");
        }

        if payload.len() > 1 {
            payload.push(',');
        }
        payload.push_str(&encoded);
    }

    if payload.len() > 1 {
        payload.push(']');
        payloads.push(payload);
    }

    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use bronze::schema::SchemaRegistry;
    use bronze::types::Value;

    use super::*;

    fn shippers() -> TableDescriptor {
        SchemaRegistry::northwind()
            .lookup("shippers")
            .unwrap()
            .clone()
    }

    fn shipper(id: i64, company_name: &str) -> Row {
        [
            ("shipper_id", Value::Integer(id)),
            ("company_name", Value::from(company_name)),
            ("phone", Value::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn create_table_statement_maps_types_and_nullability() {
        let statement = create_table_statement("`p.d.bronze_shippers`", &shippers());

        assert_eq!(
            statement,
            "create table if not exists `p.d.bronze_shippers` (`shipper_id` int64 not null, \
             `company_name` string, `phone` string, `extracted_at` timestamp, \
             `loaded_at` timestamp)"
        );
    }

    #[test]
    fn every_field_type_has_a_bigquery_type() {
        assert_eq!(bigquery_type(FieldType::Float), "float64");
        assert_eq!(bigquery_type(FieldType::Numeric), "numeric");
        assert_eq!(bigquery_type(FieldType::Boolean), "bool");
        assert_eq!(bigquery_type(FieldType::Date), "date");
    }

    #[test]
    fn replace_script_deletes_and_inserts_in_one_transaction() {
        let script = replace_rows_script("`p.d.t`", &shippers());

        let begin = script.find("begin transaction;").unwrap();
        let delete = script.find("delete from `p.d.t` where true;").unwrap();
        let insert = script.find("insert into `p.d.t` (`shipper_id`, ").unwrap();
        let commit = script.find("commit transaction;").unwrap();
        assert!(begin < delete && delete < insert && insert < commit);

        assert!(
            script.contains("cast(json_value(r, '$.\"shipper_id\"') as int64) as `shipper_id`")
        );
        assert!(script.contains("from unnest(json_query_array(@rows)) as r"));
        assert!(script.contains("rollback transaction;"));
    }

    #[test]
    fn swap_script_copies_from_staging() {
        let script = swap_from_staging_script("`p.d.t`", "`p.d.t_staging`", &shippers());

        assert!(script.contains("delete from `p.d.t` where true;"));
        assert!(script.contains(
            "insert into `p.d.t` (`shipper_id`, `company_name`, `phone`, `extracted_at`, \
             `loaded_at`) select `shipper_id`, `company_name`, `phone`, `extracted_at`, \
             `loaded_at` from `p.d.t_staging`;"
        ));
    }

    #[test]
    fn staging_table_copies_the_schema_and_expires() {
        let statement = create_staging_table_statement("`p.d.t_staging`", "`p.d.t`");

        assert!(statement.starts_with("create or replace table `p.d.t_staging` like `p.d.t`"));
        assert!(statement.contains("expiration_timestamp"));
        assert_eq!(
            drop_table_statement("`p.d.t_staging`"),
            "drop table if exists `p.d.t_staging`"
        );
    }

    #[test]
    fn rows_fit_in_a_single_payload() {
        let rows = vec![shipper(1, "Speedy Express"), shipper(2, "United Package")];

        let payloads = encode_payloads(&rows, 1024).unwrap();

        assert_eq!(
            payloads,
            vec![
                r#"[{"shipper_id":1,"company_name":"Speedy Express","phone":null},{"shipper_id":2,"company_name":"United Package","phone":null}]"#
            ]
        );
    }

    #[test]
    fn payloads_are_split_at_the_byte_limit() {
        let rows = (0..10).map(|id| shipper(id, "Federal Shipping")).collect::<Vec<_>>();
        let row_len = serde_json::to_string(&rows[0]).unwrap().len();
        let max_payload_bytes = 3 * row_len + 4;

        let payloads = encode_payloads(&rows, max_payload_bytes).unwrap();

        assert_eq!(payloads.len(), 4);
        assert!(payloads.iter().all(|payload| payload.len() <= max_payload_bytes));

        let decoded = payloads
            .iter()
            .map(|payload| serde_json::from_str::<Vec<serde_json::Value>>(payload).unwrap().len())
            .sum::<usize>();
        assert_eq!(decoded, 10);
    }

    #[test]
    fn oversized_row_gets_its_own_payload() {
        let rows = vec![shipper(1, "a"), shipper(2, &"b".repeat(200)), shipper(3, "c")];

        let payloads = encode_payloads(&rows, 100).unwrap();

        assert_eq!(payloads.len(), 3);
        assert!(payloads[1].len() > 100);
    }

    #[test]
    fn no_rows_means_no_payload() {
        assert!(encode_payloads(&[], 1024).unwrap().is_empty());
    }
}
