//! Database dialects: identifier quoting, placeholders and skip/limit
//! rendering.
//!
//! A [`Dialect`] carries everything that differs between databases when the
//! engine renders SQL text: how identifiers are enclosed, how statement
//! parameters are written, how an OFFSET/LIMIT pair is spelled, and the
//! query used to validate a fresh connection.

use crate::value::SqlValue;

/// Per-database SQL rendering rules.
pub trait Dialect: Send + Sync {
    /// A short name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Enclose an identifier per the dialect's naming convention.
    fn quote(&self, ident: &str) -> String;

    /// Render a schema-qualified table name.
    fn full_name(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote(s), self.quote(table)),
            None => self.quote(table),
        }
    }

    /// Render the parameter placeholder for a 1-based position.
    fn placeholder(&self, index: usize) -> String;

    /// Append skip/limit rendering to a SELECT statement.
    ///
    /// `params` is available for dialects that bind the offset or limit as
    /// statement parameters; the built-in dialects render literals.
    fn apply_skip_limit(
        &self,
        sql: &str,
        params: &mut Vec<SqlValue>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> String;

    /// The query used to validate a freshly acquired connection.
    fn validation_query(&self) -> &'static str {
        "SELECT 1"
    }
}

/// Standard-SQL dialect: double-quoted identifiers, `$n` placeholders and
/// `LIMIT n OFFSET m` rendering (PostgreSQL conventions).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl Dialect for StandardDialect {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn apply_skip_limit(
        &self,
        sql: &str,
        _params: &mut Vec<SqlValue>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> String {
        let mut out = sql.to_string();
        if let Some(limit) = limit {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(skip) = skip {
            out.push_str(&format!(" OFFSET {}", skip));
        }
        out
    }
}

/// MySQL dialect: backtick identifiers, `?` placeholders and the
/// `LIMIT offset, count` spelling.
///
/// MySQL has no standalone OFFSET clause, so a skip without a limit is
/// rendered with the canonical all-remaining-rows limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

/// MySQL's idiom for "no limit" when an offset is present.
const MYSQL_NO_LIMIT: u64 = u64::MAX;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn apply_skip_limit(
        &self,
        sql: &str,
        _params: &mut Vec<SqlValue>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> String {
        match (skip, limit) {
            (None, None) => sql.to_string(),
            (None, Some(limit)) => format!("{} LIMIT {}", sql, limit),
            (Some(skip), Some(limit)) => format!("{} LIMIT {}, {}", sql, skip, limit),
            (Some(skip), None) => format!("{} LIMIT {}, {}", sql, skip, MYSQL_NO_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_quote() {
        let d = StandardDialect;
        assert_eq!(d.quote("users"), "\"users\"");
        assert_eq!(d.quote("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_standard_full_name() {
        let d = StandardDialect;
        assert_eq!(d.full_name(None, "users"), "\"users\"");
        assert_eq!(d.full_name(Some("app"), "users"), "\"app\".\"users\"");
    }

    #[test]
    fn test_standard_placeholder() {
        let d = StandardDialect;
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(5), "$5");
    }

    #[test]
    fn test_standard_skip_limit() {
        let d = StandardDialect;
        let mut params = Vec::new();
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, Some(10), Some(20)),
            "SELECT * FROM t LIMIT 20 OFFSET 10"
        );
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, Some(1), None),
            "SELECT * FROM t OFFSET 1"
        );
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, None, None),
            "SELECT * FROM t"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_mysql_quote_and_placeholder() {
        let d = MySqlDialect;
        assert_eq!(d.quote("users"), "`users`");
        assert_eq!(d.placeholder(3), "?");
    }

    #[test]
    fn test_mysql_skip_limit() {
        let d = MySqlDialect;
        let mut params = Vec::new();
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, Some(5), Some(10)),
            "SELECT * FROM t LIMIT 5, 10"
        );
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, Some(5), None),
            format!("SELECT * FROM t LIMIT 5, {}", u64::MAX)
        );
        assert_eq!(
            d.apply_skip_limit("SELECT * FROM t", &mut params, None, Some(7)),
            "SELECT * FROM t LIMIT 7"
        );
    }

    #[test]
    fn test_validation_query() {
        assert_eq!(StandardDialect.validation_query(), "SELECT 1");
        assert_eq!(MySqlDialect.validation_query(), "SELECT 1");
    }
}
