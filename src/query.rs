use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// A SELECT that has not run yet. Filtering, ordering and slicing compose into SQL
/// so nothing is materialized before the page is cut.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    select: String,
    from: String,
    clauses: Vec<String>,
    params: Vec<Value>,
    order: Vec<String>,
}

impl SqlQuery {
    pub fn new(select: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            from: from.into(),
            clauses: Vec::new(),
            params: Vec::new(),
            order: Vec::new(),
        }
    }

    /// ANDs `clause` onto the query. `?` placeholders bind `params` in order.
    pub fn filter<I>(mut self, clause: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.clauses.push(format!("({})", clause.into()));
        self.params.extend(params);
        self
    }

    /// Replaces any ordering with `expr`.
    pub fn order_by(mut self, expr: &str, ascending: bool) -> Self {
        self.order.clear();
        self.then_order_by(expr, ascending)
    }

    pub fn then_order_by(mut self, expr: &str, ascending: bool) -> Self {
        let dir = if ascending { "ASC" } else { "DESC" };
        self.order.push(format!("{expr} {dir}"));
        self
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.from, self.where_sql())
    }

    pub fn select_sql(&self, page: Option<(usize, usize)>) -> String {
        let mut sql = format!("SELECT {} FROM {}{}", self.select, self.from, self.where_sql());
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some((limit, offset)) = page {
            // SQLite takes 64-bit signed LIMIT/OFFSET.
            let limit = limit.min(i64::MAX as usize);
            let offset = offset.min(i64::MAX as usize);
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        sql
    }

    pub fn count(&self, conn: &Connection) -> rusqlite::Result<usize> {
        let n: i64 = conn.query_row(
            &self.count_sql(),
            params_from_iter(self.params.iter()),
            |r| r.get(0),
        )?;
        Ok(n.max(0) as usize)
    }

    pub fn fetch<T, F>(
        &self,
        conn: &Connection,
        page: Option<(usize, usize)>,
        map: F,
    ) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare(&self.select_sql(page))?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), map)?;
        let out = rows.collect::<rusqlite::Result<Vec<T>>>();
        out
    }

    /// Row count after filtering, plus one page starting at `page * per_page`.
    pub fn paginate<T, F>(
        &self,
        conn: &Connection,
        page: usize,
        per_page: usize,
        map: F,
    ) -> rusqlite::Result<(usize, Vec<T>)>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let total = self.count(conn)?;
        let offset = page.saturating_mul(per_page);
        if offset >= total {
            return Ok((total, Vec::new()));
        }
        let rows = self.fetch(conn, Some((per_page, offset)), map)?;
        Ok((total, rows))
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
