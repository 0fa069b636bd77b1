//! Relation query builder.
//!
//! Relation variants only ever need a narrow slice of SQL: select from the
//! foreign table (optionally joined to a pivot table), constrain by equality
//! or `IN`, order, and limit. [`RelationQuery`] renders exactly that, with
//! dialect-correct identifier quoting and bound parameters.

use asupersync::{Cx, Outcome};
use relmodel_core::{Connection, Dialect, Error, Row, Value};

/// A table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        format!(
            "{}.{}",
            dialect.quote_identifier(&self.table),
            dialect.quote_identifier(&self.column)
        )
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    const fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(ColumnRef, Value),
    In(ColumnRef, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InnerJoin {
    table: String,
    left: ColumnRef,
    right: ColumnRef,
}

/// SELECT over one table with optional pivot join.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationQuery {
    table: String,
    extra_columns: Vec<(ColumnRef, String)>,
    joins: Vec<InnerJoin>,
    conditions: Vec<Condition>,
    order_by: Vec<(ColumnRef, OrderDirection)>,
    limit: Option<u64>,
}

impl RelationQuery {
    /// Start a query selecting every column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            extra_columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Select `column AS alias` in addition to `table.*`.
    pub fn add_select(&mut self, column: ColumnRef, alias: impl Into<String>) -> &mut Self {
        self.extra_columns.push((column, alias.into()));
        self
    }

    /// `INNER JOIN table ON left = right`.
    pub fn inner_join(
        &mut self,
        table: impl Into<String>,
        left: ColumnRef,
        right: ColumnRef,
    ) -> &mut Self {
        self.joins.push(InnerJoin {
            table: table.into(),
            left,
            right,
        });
        self
    }

    /// `column = value`.
    pub fn where_eq(&mut self, column: ColumnRef, value: Value) -> &mut Self {
        self.conditions.push(Condition::Eq(column, value));
        self
    }

    /// `column IN (values...)`. An empty list matches nothing.
    pub fn where_in(&mut self, column: ColumnRef, values: Vec<Value>) -> &mut Self {
        self.conditions.push(Condition::In(column, values));
        self
    }

    pub fn order_by(&mut self, column: ColumnRef, direction: OrderDirection) -> &mut Self {
        self.order_by.push((column, direction));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Whether any WHERE condition has been added.
    pub fn is_constrained(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Render SQL and the bound parameters in placeholder order.
    pub fn build(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let table = dialect.quote_identifier(&self.table);
        let mut params = Vec::new();

        let mut columns = vec![format!("{table}.*")];
        for (column, alias) in &self.extra_columns {
            columns.push(format!(
                "{} AS {}",
                column.to_sql(dialect),
                dialect.quote_identifier(alias)
            ));
        }

        let mut sql = format!("SELECT {} FROM {table}", columns.join(", "));

        for join in &self.joins {
            sql.push_str(&format!(
                " INNER JOIN {} ON {} = {}",
                dialect.quote_identifier(&join.table),
                join.left.to_sql(dialect),
                join.right.to_sql(dialect)
            ));
        }

        if !self.conditions.is_empty() {
            let mut clauses = Vec::with_capacity(self.conditions.len());
            for condition in &self.conditions {
                match condition {
                    Condition::Eq(column, value) => {
                        params.push(value.clone());
                        clauses.push(format!(
                            "{} = {}",
                            column.to_sql(dialect),
                            dialect.placeholder(params.len())
                        ));
                    }
                    Condition::In(_, values) if values.is_empty() => {
                        clauses.push("1 = 0".to_string());
                    }
                    Condition::In(column, values) => {
                        let placeholders: Vec<String> = values
                            .iter()
                            .map(|value| {
                                params.push(value.clone());
                                dialect.placeholder(params.len())
                            })
                            .collect();
                        clauses.push(format!(
                            "{} IN ({})",
                            column.to_sql(dialect),
                            placeholders.join(", ")
                        ));
                    }
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| {
                    format!("{} {}", column.to_sql(dialect), direction.as_sql())
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        (sql, params)
    }

    /// Execute against `conn` and return the raw rows.
    pub async fn get<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<Vec<Row>, Error> {
        let (sql, params) = self.build(conn.dialect());
        tracing::trace!(sql = %sql, params = params.len(), "Relation query SQL");
        conn.query(cx, &sql, &params).await
    }
}
