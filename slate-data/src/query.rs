/// SQL dialect, as far as statement rendering is concerned.
///
/// Decides placeholder style, identifier quoting and how a generated key is
/// read back after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    #[default]
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    /// Pick a dialect from a driver or backend name (case-insensitive substring match).
    pub fn detect(driver_name: &str) -> Self {
        let name = driver_name.to_ascii_lowercase();
        if name.contains("postgres") {
            Dialect::Postgres
        } else if name.contains("mysql") || name.contains("mariadb") {
            Dialect::MySql
        } else if name.contains("sqlite") {
            Dialect::Sqlite
        } else {
            Dialect::Generic
        }
    }

    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Whether `insert ... returning <col>` is accepted.
    pub fn supports_returning(self) -> bool {
        !matches!(self, Dialect::MySql)
    }

    /// Session-scoped query reading the key generated by the last insert,
    /// for dialects without `returning`.
    pub fn last_insert_id_query(self) -> Option<&'static str> {
        match self {
            Dialect::MySql => Some("select cast(last_insert_id() as signed)"),
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    #[default]
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// Renders the statement text for one fixed query shape.
///
/// Every value position becomes a placeholder; values are bound at execution
/// time, which is what lets a rendered statement be reused across calls.
/// Keywords are emitted in lower case.
///
/// # Example
///
/// ```
/// use slate_data::query::{Dialect, StatementBuilder};
///
/// let sql = StatementBuilder::new("users")
///     .dialect(Dialect::Postgres)
///     .where_eq("id")
///     .build_select(&["id", "name"])
///     .unwrap();
/// assert_eq!(sql, "select id, name from users where id = $1");
/// ```
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
    conditions: Vec<String>,
    order: Vec<(String, bool)>,
    paged: bool,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

struct Placeholders {
    dialect: Dialect,
    next: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    fn next(&mut self) -> String {
        let placeholder = self.dialect.placeholder(self.next);
        self.next += 1;
        placeholder
    }
}

impl StatementBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            paged: false,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::default(),
        }
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    /// Add a `column = ?` condition; conditions are joined with `and`.
    pub fn where_eq(mut self, column: &str) -> Self {
        self.conditions.push(column.to_string());
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    /// Append `limit ? offset ?` to selects.
    pub fn paged(mut self) -> Self {
        self.paged = true;
        self
    }

    pub fn build_select(&self, columns: &[&str]) -> Result<String, QueryError> {
        let table = self.identifier(&self.table, false, "table")?;
        let columns = self.column_list(columns, true)?;
        let mut placeholders = Placeholders::new(self.dialect);

        let mut sql = format!("select {columns} from {table}");
        self.append_where(&mut sql, &mut placeholders)?;
        self.append_order(&mut sql)?;
        if self.paged {
            let limit = placeholders.next();
            let offset = placeholders.next();
            sql.push_str(&format!(" limit {limit} offset {offset}"));
        }
        Ok(sql)
    }

    pub fn build_count(&self, column: &str) -> Result<String, QueryError> {
        let table = self.identifier(&self.table, false, "table")?;
        let column = self.identifier(column, true, "column")?;
        let mut placeholders = Placeholders::new(self.dialect);

        let mut sql = format!("select count({column}) from {table}");
        self.append_where(&mut sql, &mut placeholders)?;
        Ok(sql)
    }

    /// Multi-row insert of `rows` value tuples, optionally returning one column.
    pub fn build_insert(
        &self,
        columns: &[&str],
        rows: usize,
        returning: Option<&str>,
    ) -> Result<String, QueryError> {
        if rows == 0 || columns.is_empty() {
            return Err(QueryError::EmptyInsert {
                table: self.table.clone(),
            });
        }
        let table = self.identifier(&self.table, false, "table")?;
        let column_list = self.column_list(columns, false)?;
        let mut placeholders = Placeholders::new(self.dialect);

        let tuples: Vec<String> = (0..rows)
            .map(|_| {
                let row: Vec<String> = columns.iter().map(|_| placeholders.next()).collect();
                format!("({})", row.join(", "))
            })
            .collect();

        let mut sql = format!(
            "insert into {table} ({column_list}) values {}",
            tuples.join(", ")
        );
        if let Some(col) = returning {
            let col = self.identifier(col, false, "column")?;
            sql.push_str(&format!(" returning {col}"));
        }
        Ok(sql)
    }

    /// `update ... set` with one placeholder per column, followed by the conditions.
    pub fn build_update(&self, columns: &[&str]) -> Result<String, QueryError> {
        if columns.is_empty() {
            return Err(QueryError::EmptyInsert {
                table: self.table.clone(),
            });
        }
        let table = self.identifier(&self.table, false, "table")?;
        let mut placeholders = Placeholders::new(self.dialect);

        let mut assignments = Vec::with_capacity(columns.len());
        for col in columns {
            let col = self.identifier(col, false, "column")?;
            assignments.push(format!("{col} = {}", placeholders.next()));
        }

        let mut sql = format!("update {table} set {}", assignments.join(", "));
        self.append_where(&mut sql, &mut placeholders)?;
        Ok(sql)
    }

    pub fn build_delete(&self) -> Result<String, QueryError> {
        let table = self.identifier(&self.table, false, "table")?;
        let mut placeholders = Placeholders::new(self.dialect);

        let mut sql = format!("delete from {table}");
        self.append_where(&mut sql, &mut placeholders)?;
        Ok(sql)
    }

    fn append_where(
        &self,
        sql: &mut String,
        placeholders: &mut Placeholders,
    ) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for col in &self.conditions {
            let col = self.identifier(col, false, "column")?;
            clauses.push(format!("{col} = {}", placeholders.next()));
        }
        sql.push_str(" where ");
        sql.push_str(&clauses.join(" and "));
        Ok(())
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.identifier(col, false, "column")?;
            if *asc {
                clauses.push(format!("{col} asc"));
            } else {
                clauses.push(format!("{col} desc"));
            }
        }
        sql.push_str(" order by ");
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn column_list(&self, columns: &[&str], allow_star: bool) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.identifier(col, allow_star, "column")?);
        }
        Ok(out.join(", "))
    }

    fn identifier(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if self.identifier_policy == IdentifierPolicy::Raw {
            return Ok(ident.to_string());
        }
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// A column name that the table mapping does not declare.
    UnknownColumn { table: String, column: String },
    EmptyInsert { table: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::UnknownColumn { table, column } => {
                write!(f, "Unknown column '{column}' for table '{table}'")
            }
            QueryError::EmptyInsert { table } => {
                write!(f, "Statement for '{table}' needs at least one column and one row")
            }
        }
    }
}

impl std::error::Error for QueryError {}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
