//! The query contract the relation engine runs on.
//!
//! Relation resolution needs exactly one thing from a database driver: run a
//! SELECT with bound parameters and hand back the rows. Everything else
//! (pooling, transactions, prepared statements) is the driver's business.
//!
//! All operations integrate with asupersync's structured concurrency via `Cx`
//! context for proper cancellation and timeout handling.

use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// SQL dialect for generating dialect-specific SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
    /// MySQL dialect (uses ? placeholders)
    Mysql,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Quote an identifier for this dialect.
    ///
    /// Embedded quote characters are escaped by doubling them.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => {
                let escaped = name.replace('"', "\"\"");
                format!("\"{}\"", escaped)
            }
            Dialect::Mysql => {
                let escaped = name.replace('`', "``");
                format!("`{}`", escaped)
            }
        }
    }
}

/// A database connection capable of executing relation queries.
///
/// Implementations must be `Send + Sync` for use across async boundaries.
///
/// # Example
///
/// ```rust,ignore
/// let rows = conn.query(&cx, "SELECT * FROM \"posts\" WHERE \"user_id\" = $1", &[Value::BigInt(1)]).await;
/// ```
pub trait Connection: Send + Sync {
    /// The SQL dialect this connection speaks.
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_per_dialect() {
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
        assert_eq!(Dialect::Sqlite.placeholder(2), "?2");
        assert_eq!(Dialect::Mysql.placeholder(2), "?");
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(Dialect::Postgres.quote_identifier("user\"s"), "\"user\"\"s\"");
        assert_eq!(Dialect::Mysql.quote_identifier("role_user"), "`role_user`");
    }
}
