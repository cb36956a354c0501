//! Core traits for lift
//!
//! The causal backend never sees concrete row types: it reads named numeric
//! columns through [`ColumnSource`], so the same identification and
//! estimation code works for any tabular input that can expose them.

use crate::Result;

/// Columnar, read-only view over a table of numeric observations.
///
/// Missing values are `None`; booleans are exposed as `0.0` / `1.0`.
pub trait ColumnSource {
    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Column names this source can serve.
    fn column_names(&self) -> Vec<String>;

    /// Whether `name` is a column of this source.
    fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|c| c == name)
    }

    /// Materialise one column. Unknown names are an [`crate::Error::InvalidArgument`].
    fn column(&self, name: &str) -> Result<Vec<Option<f64>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct TwoColumns;

    impl ColumnSource for TwoColumns {
        fn n_rows(&self) -> usize {
            2
        }

        fn column_names(&self) -> Vec<String> {
            vec!["a".into(), "b".into()]
        }

        fn column(&self, name: &str) -> Result<Vec<Option<f64>>> {
            match name {
                "a" => Ok(vec![Some(1.0), None]),
                "b" => Ok(vec![Some(2.0), Some(3.0)]),
                other => Err(Error::InvalidArgument(format!("unknown column '{other}'"))),
            }
        }
    }

    #[test]
    fn default_has_column_uses_names() {
        let src = TwoColumns;
        assert!(src.has_column("a"));
        assert!(!src.has_column("c"));
        assert_eq!(src.column("a").unwrap(), vec![Some(1.0), None]);
        assert!(src.column("c").is_err());
    }
}
