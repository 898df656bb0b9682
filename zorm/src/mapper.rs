//! Turning raw row sets into maps, records and scalars

use crate::coerce::coerce;
use crate::executor::{Row, RowSet};
use crate::record::{FieldDescriptor, Record};
use crate::{Error, Result};

/// One map per row, keyed by column name. NULL cells become empty strings.
pub fn rows_to_maps(rows: RowSet) -> Vec<Row> {
    let RowSet { columns, rows } = rows;
    rows.into_iter()
        .map(|cells| {
            columns
                .iter()
                .cloned()
                .zip(cells.into_iter().map(Option::unwrap_or_default))
                .collect()
        })
        .collect()
}

/// Build one record per row, in row order.
///
/// Columns with no matching field are dropped. When two fields claim the same
/// column, the first declared one receives it.
pub fn scan_records<R: Record>(rows: &RowSet) -> Result<Vec<R>> {
    let descriptor = R::descriptor();
    let targets: Vec<Option<&FieldDescriptor>> = rows
        .columns
        .iter()
        .map(|column| descriptor.by_column(column))
        .collect();

    rows.rows
        .iter()
        .map(|cells| {
            let mut record = R::default();
            for ((column, cell), target) in rows.columns.iter().zip(cells).zip(&targets) {
                let Some(field) = target else { continue };
                let value = coerce(cell.as_deref(), field.kind)
                    .map_err(|e| Error::type_coercion(column, field.name, e.message()))?;
                record
                    .set_field(field.index, value)
                    .map_err(|e| Error::type_coercion(column, field.name, e.message()))?;
            }
            Ok(record)
        })
        .collect()
}

/// First cell of the first row, if there is one and it is not NULL
pub fn scalar(rows: &RowSet) -> Option<&str> {
    rows.rows.first()?.first()?.as_deref()
}

#[cfg(all(test, feature = "derive"))]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, crate::Record)]
    struct Item {
        #[sql = "id,auto_increment"]
        pub id: i64,
        #[sql = "title"]
        pub name: String,
        #[sql = "title"]
        pub shadow: String,
        pub price: f64,
        pub stock: Option<u32>,
        pub active: bool,
    }

    fn row_set(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> RowSet {
        RowSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_rows_to_maps() {
        let rows = row_set(
            &["uid", "username"],
            vec![vec![Some("1"), Some("ann")], vec![Some("2"), None]],
        );
        let maps = rows_to_maps(rows);
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0]["username"], "ann");
        assert_eq!(maps[1]["username"], "");
        assert_eq!(maps[1]["uid"], "2");
    }

    #[test]
    fn test_scan_records() {
        let rows = row_set(
            &["id", "title", "price", "stock", "active", "unknown"],
            vec![
                vec![Some("7"), Some("pen"), Some("1.25"), Some("40"), Some("1"), Some("x")],
                vec![Some("8"), Some("ink"), Some("3"), None, Some("false"), None],
            ],
        );
        let items: Vec<Item> = scan_records(&rows).unwrap();
        assert_eq!(
            items,
            vec![
                Item {
                    id: 7,
                    name: "pen".into(),
                    shadow: String::new(),
                    price: 1.25,
                    stock: Some(40),
                    active: true,
                },
                Item {
                    id: 8,
                    name: "ink".into(),
                    shadow: String::new(),
                    price: 3.0,
                    stock: None,
                    active: false,
                },
            ]
        );
    }

    #[test]
    fn test_null_sets_zero_value() {
        let rows = row_set(&["id", "price"], vec![vec![None, None]]);
        let items: Vec<Item> = scan_records(&rows).unwrap();
        assert_eq!(items[0], Item::default());
    }

    #[test]
    fn test_coercion_failure_names_column_and_field() {
        let rows = row_set(&["title", "price"], vec![vec![Some("pen"), Some("cheap")]]);
        let err = scan_records::<Item>(&rows).unwrap_err();
        match err {
            Error::TypeCoercion { column, field, .. } => {
                assert_eq!(column, "price");
                assert_eq!(field, "price");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_is_a_coercion_error() {
        let rows = row_set(&["stock"], vec![vec![Some("5000000000")]]);
        let err = scan_records::<Item>(&rows).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { .. }));
    }

    #[test]
    fn test_scalar() {
        let rows = row_set(&["COUNT(*)"], vec![vec![Some("3")]]);
        assert_eq!(scalar(&rows), Some("3"));
        assert_eq!(scalar(&RowSet::default()), None);
        let rows = row_set(&["SUM(x)"], vec![vec![None]]);
        assert_eq!(scalar(&rows), None);
    }
}
