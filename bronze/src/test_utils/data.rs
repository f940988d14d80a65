use chrono::NaiveDate;

use crate::conversions::Cell;
use crate::conversions::numeric::PgNumeric;
use crate::types::{TableData, TableRow};

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn text(value: &str) -> Cell {
    Cell::String(value.to_string())
}

/// Returns a `numeric(10, 2)` holding `cents / 100`.
pub fn numeric_cents(cents: u32) -> Cell {
    let units = cents / 100;
    let fraction = (cents % 100) * 100;

    let digits = if units >= 10_000 {
        vec![(units / 10_000) as i16, (units % 10_000) as i16, fraction as i16]
    } else {
        vec![units as i16, fraction as i16]
    };
    let weight = digits.len() as i16 - 2;

    Cell::Numeric(PgNumeric::Value {
        negative: false,
        weight,
        scale: 2,
        digits,
    })
}

/// Returns `count` rows shaped like the Northwind `customers` table.
pub fn customers(count: usize) -> TableData {
    let rows = (0..count)
        .map(|index| {
            TableRow::new(vec![
                text(&format!("C{index:04}")),
                text(&format!("Company {index}")),
                text("Maria Anders"),
                text("Sales Representative"),
                text("Obere Str. 57"),
                text("Berlin"),
                Cell::Null,
                text("12209"),
                text("Germany"),
                text("030-0074321"),
                Cell::Null,
            ])
        })
        .collect();

    TableData::new(
        columns(&[
            "customer_id",
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
        ]),
        rows,
    )
}

/// Returns `count` rows shaped like the Northwind `orders` table.
pub fn orders(count: usize) -> TableData {
    let order_date = NaiveDate::from_ymd_opt(1996, 7, 4).unwrap_or_default();
    let rows = (0..count)
        .map(|index| {
            TableRow::new(vec![
                Cell::I16(10248 + index as i16),
                text("C0000"),
                Cell::I16(5),
                Cell::Date(order_date),
                Cell::Date(order_date),
                Cell::Null,
                Cell::I16(3),
                numeric_cents(3238),
                text("Vins et alcools Chevalier"),
                text("59 rue de l'Abbaye"),
                text("Reims"),
                Cell::Null,
                text("51100"),
                text("France"),
            ])
        })
        .collect();

    TableData::new(
        columns(&[
            "order_id",
            "customer_id",
            "employee_id",
            "order_date",
            "required_date",
            "shipped_date",
            "ship_via",
            "freight",
            "ship_name",
            "ship_address",
            "ship_city",
            "ship_region",
            "ship_postal_code",
            "ship_country",
        ]),
        rows,
    )
}

/// Returns `count` rows shaped like the Northwind `shippers` table.
pub fn shippers(count: usize) -> TableData {
    let rows = (0..count)
        .map(|index| {
            TableRow::new(vec![
                Cell::I16(index as i16 + 1),
                text(&format!("Shipper {index}")),
                text("(503) 555-9831"),
            ])
        })
        .collect();

    TableData::new(columns(&["shipper_id", "company_name", "phone"]), rows)
}
