use std::fmt;

use super::{Assignment, Comma, Comments, Expr, TableName};

/// A parsed statement. The router plans the five DML variants; everything
/// else is refused as unroutable.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Replace(Replace),
    Update(Update),
    Delete(Delete),
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(stmt) => write!(f, "{}", stmt),
            Statement::Insert(stmt) => write!(f, "{}", stmt),
            Statement::Replace(stmt) => write!(f, "{}", stmt),
            Statement::Update(stmt) => write!(f, "{}", stmt),
            Statement::Delete(stmt) => write!(f, "{}", stmt),
            Statement::Begin => write!(f, "begin"),
            Statement::Commit => write!(f, "commit"),
            Statement::Rollback => write!(f, "rollback"),
        }
    }
}

/// Renders a statement to SQL text with a caller-supplied table reference
/// in place of the logical one. `Display` goes through the same path with
/// the statement's own table, so the two can never drift apart.
pub trait RenderSql {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result;

    fn sql_with_table(&self, table: &dyn fmt::Display) -> String
    where
        Self: Sized,
    {
        struct Adapter<'a, T: RenderSql>(&'a T, &'a dyn fmt::Display);

        impl<T: RenderSql> fmt::Display for Adapter<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.write_sql(f, self.1)
            }
        }

        Adapter(self, table).to_string()
    }
}

/// `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub comments: Comments,
    pub distinct: bool,
    pub exprs: Vec<SelectExpr>,
    pub from: TableName,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Limit>,
    pub lock: Lock,
}

impl RenderSql for Select {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result {
        write!(f, "select {}", self.comments)?;
        if self.distinct {
            write!(f, "distinct ")?;
        }
        write!(f, "{} from {}", Comma(&self.exprs), table)?;
        if let Some(where_clause) = &self.where_clause {
            write!(f, " where {}", where_clause)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " group by {}", Comma(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {}", having)?;
        }
        write_order_limit(f, &self.order_by, &self.limit)?;
        write!(f, "{}", self.lock)
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, &self.from)
    }
}

/// `INSERT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub comments: Comments,
    pub table: TableName,
    pub columns: Vec<String>,
    pub rows: InsertRows,
    pub on_dup: Vec<Assignment>,
}

impl RenderSql for Insert {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result {
        write!(f, "insert {}into {}", self.comments, table)?;
        if !self.columns.is_empty() {
            write!(f, "({})", Comma(&self.columns))?;
        }
        write!(f, "{}", self.rows)?;
        if !self.on_dup.is_empty() {
            write!(f, " on duplicate key update {}", Comma(&self.on_dup))?;
        }
        Ok(())
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, &self.table)
    }
}

/// `REPLACE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Replace {
    pub comments: Comments,
    pub table: TableName,
    pub columns: Vec<String>,
    pub rows: InsertRows,
}

impl RenderSql for Replace {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result {
        write!(f, "replace {}into {}", self.comments, table)?;
        if !self.columns.is_empty() {
            write!(f, "({})", Comma(&self.columns))?;
        }
        write!(f, "{}", self.rows)
    }
}

impl fmt::Display for Replace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, &self.table)
    }
}

/// `UPDATE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub comments: Comments,
    pub table: TableName,
    pub exprs: Vec<Assignment>,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Limit>,
}

impl RenderSql for Update {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result {
        write!(f, "update {}{} set {}", self.comments, table, Comma(&self.exprs))?;
        if let Some(where_clause) = &self.where_clause {
            write!(f, " where {}", where_clause)?;
        }
        write_order_limit(f, &self.order_by, &self.limit)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, &self.table)
    }
}

/// `DELETE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub comments: Comments,
    pub table: TableName,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Limit>,
}

impl RenderSql for Delete {
    fn write_sql(&self, f: &mut fmt::Formatter<'_>, table: &dyn fmt::Display) -> fmt::Result {
        write!(f, "delete {}from {}", self.comments, table)?;
        if let Some(where_clause) = &self.where_clause {
            write!(f, " where {}", where_clause)?;
        }
        write_order_limit(f, &self.order_by, &self.limit)
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sql(f, &self.table)
    }
}

/// Row source of an `INSERT`/`REPLACE`: a literal tuple list or a nested
/// select. The router refuses the latter; it still has to render.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertRows {
    Values(Vec<Vec<Expr>>),
    Select(Box<Select>),
}

impl fmt::Display for InsertRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertRows::Values(rows) => {
                write!(f, " values ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({})", Comma(row))?;
                }
                Ok(())
            }
            InsertRows::Select(select) => write!(f, " {}", select),
        }
    }
}

/// One projected expression of a `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Star,
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectExpr {
    pub fn column(name: impl Into<String>) -> Self {
        SelectExpr::Expr {
            expr: Expr::Column(name.into()),
            alias: None,
        }
    }
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectExpr::Star => write!(f, "*"),
            SelectExpr::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectExpr::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{} as {}", expr, alias),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Direction,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

/// `LIMIT [offset,] rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: Option<u64>,
    pub rows: u64,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{}, {}", offset, self.rows),
            None => write!(f, "{}", self.rows),
        }
    }
}

/// Trailing lock clause of a `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lock {
    #[default]
    None,
    ForUpdate,
    ShareMode,
}

impl fmt::Display for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lock::None => Ok(()),
            Lock::ForUpdate => write!(f, " for update"),
            Lock::ShareMode => write!(f, " lock in share mode"),
        }
    }
}

fn write_order_limit(
    f: &mut fmt::Formatter<'_>,
    order_by: &[OrderBy],
    limit: &Option<Limit>,
) -> fmt::Result {
    if !order_by.is_empty() {
        write!(f, " order by {}", Comma(order_by))?;
    }
    if let Some(limit) = limit {
        write!(f, " limit {}", limit)?;
    }
    Ok(())
}
