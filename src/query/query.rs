//! Query under construction
//!
//! Tracks the owning table, the joins introduced by relation traversal and
//! the accumulated WHERE conjuncts. Join aliases are derived from the
//! source alias and the traversed field (`res_users__partner_id`), so a
//! relation path always maps to the same alias and is joined only once.

use serde::Serialize;

use super::sql::{qualified, quote, SqlFragment, SqlParam};

/// PostgreSQL truncates identifiers at 63 bytes
const MAX_ALIAS_LEN: usize = 63;

/// One edge of the join graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    /// Alias of the joined table
    pub alias: String,
    pub source_alias: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Join {
    fn render(&self) -> String {
        format!(
            "LEFT JOIN {} ON ({} = {})",
            table_with_alias(&self.target_table, &self.alias),
            qualified(&self.source_alias, &self.source_column),
            qualified(&self.alias, &self.target_column),
        )
    }
}

/// A SELECT query being assembled
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    alias: String,
    joins: Vec<Join>,
    where_clauses: Vec<String>,
    where_params: Vec<SqlParam>,
    order: Option<String>,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    /// Query over `table`, aliased by its own name
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::with_alias(table.clone(), table)
    }

    pub fn with_alias(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            where_params: Vec::new(),
            order: None,
            limit: None,
            offset: 0,
        }
    }

    /// Alias of the owning table
    pub fn table_alias(&self) -> &str {
        &self.alias
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Alias for the table reached from `alias` through `link`.
    ///
    /// Aliases longer than 63 bytes keep a prefix and get a CRC32 suffix.
    pub fn make_alias(alias: &str, link: &str) -> String {
        let full = format!("{}__{}", alias, link);
        if full.len() <= MAX_ALIAS_LEN {
            return full;
        }
        let hash = format!("{:08x}", crc32fast::hash(full.as_bytes()));
        let mut cut = MAX_ALIAS_LEN - hash.len() - 2;
        while !full.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}__{}", &full[..cut], hash)
    }

    /// `LEFT JOIN` from `lhs_alias.lhs_column` to `rhs_table.rhs_column`.
    ///
    /// Memoized on `(lhs_alias, link)`: joining the same path twice returns
    /// the existing alias.
    pub fn left_join(
        &mut self,
        lhs_alias: &str,
        lhs_column: &str,
        rhs_table: &str,
        rhs_column: &str,
        link: &str,
    ) -> String {
        let alias = Self::make_alias(lhs_alias, link);
        if !self.joins.iter().any(|j| j.alias == alias) {
            self.joins.push(Join {
                alias: alias.clone(),
                source_alias: lhs_alias.to_string(),
                source_column: lhs_column.to_string(),
                target_table: rhs_table.to_string(),
                target_column: rhs_column.to_string(),
            });
        }
        alias
    }

    /// Add a conjunct to the WHERE clause
    pub fn add_where(&mut self, clause: impl Into<String>, params: Vec<SqlParam>) {
        self.where_clauses.push(clause.into());
        self.where_params.extend(params);
    }

    /// Add a fragment as a WHERE conjunct
    pub fn add_where_fragment(&mut self, fragment: SqlFragment) {
        self.add_where(fragment.sql, fragment.params);
    }

    pub fn set_order(&mut self, order: impl Into<String>) {
        self.order = Some(order.into());
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// FROM clause including joins
    pub fn from_clause(&self) -> String {
        let mut parts = vec![table_with_alias(&self.table, &self.alias)];
        parts.extend(self.joins.iter().map(Join::render));
        parts.join(" ")
    }

    /// WHERE clause (`TRUE` when empty) and its params
    pub fn where_clause(&self) -> SqlFragment {
        if self.where_clauses.is_empty() {
            return SqlFragment::literal(true);
        }
        SqlFragment::new(self.where_clauses.join(" AND "), self.where_params.clone())
    }

    /// Full SELECT over `columns` (defaults to the owning table's id)
    pub fn select(&self, columns: &[String]) -> SqlFragment {
        let columns = if columns.is_empty() {
            qualified(&self.alias, "id")
        } else {
            columns.join(", ")
        };
        let where_clause = self.where_clause();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            columns,
            self.from_clause(),
            where_clause.sql
        );
        if let Some(order) = &self.order {
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        SqlFragment::new(sql, where_clause.params)
    }

    /// SELECT usable as an `IN (...)` operand.
    ///
    /// ORDER BY only matters with a LIMIT or OFFSET and is dropped
    /// otherwise.
    pub fn subselect(&self, column: Option<&str>) -> SqlFragment {
        let column = column
            .map(str::to_string)
            .unwrap_or_else(|| qualified(&self.alias, "id"));
        if self.limit.is_some() || self.offset > 0 {
            return self.select(&[column]);
        }
        let where_clause = self.where_clause();
        SqlFragment::new(
            format!(
                "SELECT {} FROM {} WHERE {}",
                column,
                self.from_clause(),
                where_clause.sql
            ),
            where_clause.params,
        )
    }
}

fn table_with_alias(table: &str, alias: &str) -> String {
    if table == alias {
        quote(table)
    } else {
        format!("{} AS {}", quote(table), quote(alias))
    }
}
