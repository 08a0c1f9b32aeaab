//! Flat report rows.
//!
//! Every row type is declared through [`report_row!`], which derives the
//! struct, its column headers (also used as serialized field names), the cell
//! rendering and the presentation sort order in one place.

use serde::Serialize;
use std::cmp::Ordering;

pub trait ReportRow: Serialize + Send + 'static {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
    /// Multi-key order applied to the complete row set before rendering.
    fn compare(&self, other: &Self) -> Ordering;
}

/// Rendering of a single field into a table cell.
pub trait Cell {
    fn cell(&self) -> String;
}

impl Cell for String {
    fn cell(&self) -> String {
        self.clone()
    }
}

impl Cell for bool {
    fn cell(&self) -> String {
        self.to_string()
    }
}

impl Cell for i32 {
    fn cell(&self) -> String {
        self.to_string()
    }
}

impl<T: Cell> Cell for Option<T> {
    fn cell(&self) -> String {
        self.as_ref().map(Cell::cell).unwrap_or_default()
    }
}

/// Sort rows in place by their declared order.
pub fn sort_rows<R: ReportRow>(rows: &mut [R]) {
    rows.sort_by(R::compare);
}

/// Declare a report row.
///
/// ```ignore
/// report_row! {
///     pub struct BucketRow {
///         bucket_name: String => "BucketName",
///         location: String => "Location",
///     }
///     order_by [bucket_name, location desc]
/// }
/// ```
#[macro_export]
macro_rules! report_row {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $field:ident : $ty:ty => $header:literal ),* $(,)?
        }
        order_by [ $( $key:ident $($direction:ident)? ),* $(,)? ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
        pub struct $name {
            $( #[serde(rename = $header)] pub $field: $ty, )*
        }

        impl $crate::app::describer::report::ReportRow for $name {
            fn headers() -> &'static [&'static str] {
                &[$($header),*]
            }

            fn cells(&self) -> Vec<String> {
                vec![$($crate::app::describer::report::Cell::cell(&self.$field)),*]
            }

            fn compare(&self, other: &Self) -> std::cmp::Ordering {
                let (left, right) = (self, other);
                std::cmp::Ordering::Equal
                    $( .then_with(|| $crate::report_row!(@cmp left, right, $key $($direction)?)) )*
            }
        }
    };
    (@cmp $left:ident, $right:ident, $key:ident) => {
        $left.$key.cmp(&$right.$key)
    };
    (@cmp $left:ident, $right:ident, $key:ident desc) => {
        $right.$key.cmp(&$left.$key)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    crate::report_row! {
        pub struct SampleRow {
            group: String => "Group",
            direction: String => "Direction",
            port: i32 => "Port",
            enabled: bool => "Enabled",
            size: Option<i32> => "Size",
        }
        order_by [group, direction desc, port]
    }

    fn row(group: &str, direction: &str, port: i32) -> SampleRow {
        SampleRow {
            group: group.to_string(),
            direction: direction.to_string(),
            port,
            ..Default::default()
        }
    }

    #[test]
    fn test_headers_and_cells_follow_declaration_order() {
        assert_eq!(
            SampleRow::headers(),
            &["Group", "Direction", "Port", "Enabled", "Size"]
        );
        let mut sample = row("web", "Ingress", 443);
        sample.enabled = true;
        assert_eq!(sample.cells(), vec!["web", "Ingress", "443", "true", ""]);
    }

    #[test]
    fn test_descending_key_flips_only_that_key() {
        let mut rows = vec![
            row("web", "Egress", 0),
            row("db", "Ingress", 5432),
            row("web", "Ingress", 80),
            row("web", "Ingress", 22),
        ];
        sort_rows(&mut rows);
        let order: Vec<_> = rows
            .iter()
            .map(|r| format!("{}/{}/{}", r.group, r.direction, r.port))
            .collect();
        assert_eq!(
            order,
            vec!["db/Ingress/5432", "web/Ingress/22", "web/Ingress/80", "web/Egress/0"]
        );
    }

    #[test]
    fn test_serialized_names_are_headers() {
        let value = serde_json::to_value(row("web", "Ingress", 80)).unwrap();
        assert_eq!(value["Group"], "web");
        assert_eq!(value["Port"], 80);
    }
}
