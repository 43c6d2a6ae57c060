use crate::{
    AsValue, Error, Fragment, GenericSqlWriter, Query, Result, SqlWriter, Value, writer::Context,
};

/// One `column=value` comparison of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    pub column: String,
    pub value: Value,
    /// Token joining this term to the next one, kept verbatim (e.g. `AND`, `OR`).
    pub conjunction: Option<String>,
}

/// Equality predicate parsed from a flat token list.
///
/// The accepted shapes are `[column, value]` and
/// `[column, value, conjunction, column, value, ...]`. Values are kept as
/// untyped text, the driver converts them to the type the backend infers
/// for each placeholder.
///
/// ```rust
/// use keel_core::parse_filter;
/// let query = parse_filter(&["Title", "Dune", "AND", "Author", "Herbert"]).unwrap();
/// assert_eq!(query.sql, "Title=$1 AND Author=$2");
/// assert_eq!(query.params.len(), 2);
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Filter {
    pub terms: Vec<FilterTerm>,
}

impl Filter {
    /// Parse the tokens of a filter expression.
    ///
    /// Fewer than two tokens is an error. A token count that is neither 2
    /// nor `3k - 1` produces the empty filter, which matches every row.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Filter> {
        if tokens.len() < 2 {
            return Err(Error::msg("Not enough parameters provided for the filter"));
        }
        if tokens.len() != 2 && (tokens.len() + 1) % 3 != 0 {
            log::warn!(
                "Filter with {} tokens is neither a pair nor a sequence of `column, value, conjunction` triples, no condition will be applied",
                tokens.len()
            );
            return Ok(Filter::default());
        }
        let terms = tokens
            .chunks(3)
            .map(|chunk| FilterTerm {
                column: chunk[0].as_ref().to_owned(),
                value: Value::Unknown(Some(chunk[1].as_ref().to_owned())),
                conjunction: chunk.get(2).map(|v| v.as_ref().to_owned()),
            })
            .collect();
        Ok(Filter { terms })
    }

    /// Filter on a single column equal to a typed value.
    pub fn column_equals(column: impl Into<String>, value: impl AsValue) -> Filter {
        Filter {
            terms: vec![FilterTerm {
                column: column.into(),
                value: value.as_value(),
                conjunction: None,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.terms.iter().map(|v| &v.value)
    }
}

/// Parse the filter tokens and render the predicate with its bound values.
///
/// The predicate has no `WHERE` keyword and is empty for the empty filter.
pub fn parse_filter<S: AsRef<str>>(tokens: &[S]) -> Result<Query> {
    let filter = Filter::parse(tokens)?;
    let mut query = Query::default();
    GenericSqlWriter::new().write_filter(
        &mut Context::new(Fragment::SqlSelectWhere),
        &mut query,
        &filter,
    );
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(v: &str) -> Value {
        Value::Unknown(Some(v.into()))
    }

    #[test]
    fn pair() {
        let query = parse_filter(&["key", "value"]).unwrap();
        assert_eq!(query.sql, "key=$1");
        assert_eq!(query.params, [text("value")]);
    }

    #[test]
    fn triples() {
        let query = parse_filter(&["k1", "v1", "AND", "k2", "v2"]).unwrap();
        assert_eq!(query.sql, "k1=$1 AND k2=$2");
        assert_eq!(query.params, [text("v1"), text("v2")]);

        let query = parse_filter(&["a", "1", "OR", "b", "2", "and", "c", "3"]).unwrap();
        assert_eq!(query.sql, "a=$1 OR b=$2 and c=$3");
        assert_eq!(query.params, [text("1"), text("2"), text("3")]);
    }

    #[test]
    fn not_enough_tokens() {
        let empty: [&str; 0] = [];
        for tokens in [&empty[..], &["only"][..]] {
            let error = parse_filter(tokens).unwrap_err();
            assert_eq!(
                error.to_string(),
                "Not enough parameters provided for the filter"
            );
        }
    }

    #[test]
    fn malformed_arity_is_empty() {
        for tokens in [
            &["a", "1", "AND"][..],
            &["a", "1", "AND", "b"][..],
            &["a", "1", "AND", "b", "2", "OR"][..],
        ] {
            let filter = Filter::parse(tokens).unwrap();
            assert!(filter.is_empty());
            let query = parse_filter(tokens).unwrap();
            assert!(query.sql.is_empty());
            assert!(query.params.is_empty());
        }
    }

    #[test]
    fn placeholders_track_values() {
        for triples in 0..6 {
            let mut tokens = vec!["c0".to_string(), "v0".to_string()];
            for i in 1..=triples {
                tokens.push("AND".into());
                tokens.push(format!("c{i}"));
                tokens.push(format!("v{i}"));
            }
            let query = parse_filter(&tokens[..]).unwrap();
            assert_eq!(query.params.len(), triples + 1);
            for (i, value) in query.params.iter().enumerate() {
                assert!(query.sql.contains(&format!("c{i}=${}", i + 1)));
                assert_eq!(*value, text(&format!("v{i}")));
            }
        }
    }

    #[test]
    fn long_non_ascii_value_fails_to_convert() {
        let value = "é".repeat(300);
        let query = parse_filter(&["BookID", value.as_str()]).unwrap();
        let error = query.params[0]
            .clone()
            .try_as(&Value::Int32(None))
            .unwrap_err();
        assert!(format!("{error:#}").contains("..."));
    }

    #[test]
    fn typed_term() {
        let filter = Filter::column_equals("ID", 7i64);
        assert_eq!(filter.values().collect::<Vec<_>>(), [&Value::Int64(Some(7))]);
    }
}
