//! In-memory relational engine understanding the statements both dialects emit.
//!
//! Supports `SELECT <cols|*> FROM <table> [WHERE col=literal [AND ...]]` and
//! `INSERT INTO <table> (<cols>) VALUES (<literals>)`. Table and column
//! identifiers may be bare, double-quoted or backtick-quoted. An `id` column, when declared and
//! not supplied, is filled from a per-table sequence starting at 1.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::EngineKind;
use crate::{CoreError, Credentials, Row, SqlConnection, SqlDriver, SqlValue};

/// Counts connections handed out and released.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ConnectionStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_id: i64,
}

type Tables = Arc<Mutex<BTreeMap<String, Table>>>;

/// Shared in-memory database; clones see the same tables.
#[derive(Clone, Debug, Default)]
pub struct MemorySqlDriver {
    tables: Tables,
    stats: Arc<ConnectionStats>,
}

impl MemorySqlDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table. Re-declaring an existing table is a no-op.
    pub fn create_table(&self, name: &str, columns: &[&str]) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(name.to_string()).or_insert_with(|| Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
                next_id: 0,
            });
        }
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}

impl SqlDriver for MemorySqlDriver {
    type Conn = MemorySqlConnection;

    async fn connect(
        &self,
        _engine: EngineKind,
        _credentials: &Credentials,
    ) -> Result<MemorySqlConnection, CoreError> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySqlConnection {
            tables: Arc::clone(&self.tables),
            stats: Arc::clone(&self.stats),
        })
    }
}

pub struct MemorySqlConnection {
    tables: Tables,
    stats: Arc<ConnectionStats>,
}

impl MemorySqlConnection {
    fn query(&self, sql: &str) -> Result<Vec<Row>, CoreError> {
        let select = parse_select(sql)?;
        let tables = self
            .tables
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let table = tables
            .get(select.table)
            .ok_or_else(|| CoreError::Repository(format!("no such table: {}", select.table)))?;

        let projection: Vec<usize> = if select.columns.trim() == "*" {
            (0..table.columns.len()).collect()
        } else {
            select
                .columns
                .split(',')
                .map(|c| column_index(table, unquote_ident(c)))
                .collect::<Result<_, _>>()?
        };
        let conditions: Vec<(usize, SqlValue)> = select
            .conditions
            .iter()
            .map(|(c, v)| Ok((column_index(table, c)?, v.clone())))
            .collect::<Result<_, CoreError>>()?;

        Ok(table
            .rows
            .iter()
            .filter(|row| conditions.iter().all(|(i, v)| &row[*i] == v))
            .map(|row| projection.iter().map(|i| row[*i].clone()).collect())
            .collect())
    }

    fn insert(&self, sql: &str) -> Result<u64, CoreError> {
        let (table_name, columns, values) = parse_insert(sql)?;
        if columns.len() != values.len() {
            return Err(CoreError::Repository(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| CoreError::Repository(format!("no such table: {}", table_name)))?;

        let mut row = vec![SqlValue::Null; table.columns.len()];
        for (col, val) in columns.iter().zip(values) {
            let idx = column_index(table, col)?;
            row[idx] = val;
        }
        if let Some(idx) = table.columns.iter().position(|c| c == "id") {
            if row[idx] == SqlValue::Null {
                table.next_id += 1;
                row[idx] = SqlValue::Int(table.next_id);
            }
        }
        table.rows.push(row);
        Ok(1)
    }
}

impl SqlConnection for MemorySqlConnection {
    async fn fetch_optional(&mut self, sql: &str) -> Result<Option<Row>, CoreError> {
        Ok(self.query(sql)?.into_iter().next())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>, CoreError> {
        self.query(sql)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, CoreError> {
        self.insert(sql)
    }

    async fn close(self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize, CoreError> {
    table
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| CoreError::Repository(format!("no such column: {}", name)))
}

struct Select<'a> {
    columns: &'a str,
    table: &'a str,
    conditions: Vec<(&'a str, SqlValue)>,
}

fn unquote_ident(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|x| x.strip_suffix('"'))
        .or_else(|| s.strip_prefix('`').and_then(|x| x.strip_suffix('`')))
        .unwrap_or(s)
}

fn unsupported(sql: &str) -> CoreError {
    CoreError::Repository(format!("unsupported statement: {}", sql))
}

fn parse_select(sql: &str) -> Result<Select<'_>, CoreError> {
    let rest = sql.strip_prefix("SELECT ").ok_or_else(|| unsupported(sql))?;
    let (columns, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(sql))?;
    let (table, predicate) = match rest.split_once(" WHERE ") {
        Some((t, p)) => (t, Some(p)),
        None => (rest, None),
    };
    let mut conditions = Vec::new();
    if let Some(pred) = predicate {
        for clause in pred.split(" AND ") {
            let (col, val) = clause.split_once('=').ok_or_else(|| unsupported(sql))?;
            conditions.push((unquote_ident(col), parse_literal(val)));
        }
    }
    Ok(Select {
        columns,
        table: unquote_ident(table),
        conditions,
    })
}

fn parse_insert(sql: &str) -> Result<(&str, Vec<&str>, Vec<SqlValue>), CoreError> {
    let rest = sql
        .strip_prefix("INSERT INTO ")
        .ok_or_else(|| unsupported(sql))?;
    let (table, rest) = rest.split_once(" (").ok_or_else(|| unsupported(sql))?;
    let (columns, values) = rest
        .split_once(") VALUES (")
        .ok_or_else(|| unsupported(sql))?;
    let values = values.strip_suffix(')').ok_or_else(|| unsupported(sql))?;
    Ok((
        unquote_ident(table),
        columns.split(',').map(unquote_ident).collect(),
        split_values(values).into_iter().map(parse_literal).collect(),
    ))
}

// Split on commas that are not inside a single-quoted literal.
fn split_values(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

// Bare words are taken as text so loosely written fixtures still load.
fn parse_literal(tok: &str) -> SqlValue {
    let tok = tok.trim();
    if tok.len() >= 2 && tok.starts_with('\'') && tok.ends_with('\'') {
        return SqlValue::Text(tok[1..tok.len() - 1].replace("''", "'"));
    }
    if tok.eq_ignore_ascii_case("null") {
        return SqlValue::Null;
    }
    if tok.eq_ignore_ascii_case("true") {
        return SqlValue::Bool(true);
    }
    if tok.eq_ignore_ascii_case("false") {
        return SqlValue::Bool(false);
    }
    if let Ok(i) = tok.parse::<i64>() {
        return SqlValue::Int(i);
    }
    if let Ok(f) = tok.parse::<f64>() {
        return SqlValue::Float(f);
    }
    SqlValue::Text(tok.to_string())
}
