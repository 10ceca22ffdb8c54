use std::path::Path;

use futures::future::BoxFuture;
use tracing::debug;

use keel_core::error::{KeelError, Result};
use keel_core::migration::Migration;
use keel_core::store::Executor;

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

/// A migration written as plain SQL.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    version: String,
    description: String,
    up: String,
    down: Option<String>,
}

impl SqlMigration {
    /// Create a migration whose description is derived from its version.
    pub fn new(version: impl Into<String>, up: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            description: describe_version(&version),
            version,
            up: up.into(),
            down: None,
        }
    }

    pub fn with_down(mut self, down: impl Into<String>) -> Self {
        self.down = Some(down.into());
        self
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }
}

impl Migration for SqlMigration {
    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn up<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(execute_script(db, &self.up))
    }

    fn down<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match &self.down {
                Some(sql) => execute_script(db, sql).await,
                None => Err(KeelError::IrreversibleMigration(self.version.clone())),
            }
        })
    }
}

/// Execute every statement of `sql` in order.
pub async fn execute_script(db: &mut dyn Executor, sql: &str) -> Result<()> {
    for statement in split_sql_statements(sql) {
        db.execute(&statement).await?;
    }
    Ok(())
}

/// Turn `2024_01_15_120000_create_users_table` into `Create users table`.
pub fn describe_version(version: &str) -> String {
    let words: Vec<&str> = version
        .split('_')
        .skip_while(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .collect();

    let sentence = words.join(" ");
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => version.to_string(),
    }
}

/// Split SQL into individual statements.
///
/// Semicolons inside single-quoted literals, dollar-quoted bodies
/// (`$$ ... $$`, `$tag$ ... $tag$`), `--` line comments and `/* */` block
/// comments do not end a statement. Comments are kept in the statement text,
/// but a statement made only of comments is dropped.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut in_single_quote = false;
    let mut dollar_tag: Option<String> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if !in_single_quote && dollar_tag.is_none() {
            if c == '-' && chars.peek() == Some(&'-') {
                for next in chars.by_ref() {
                    current.push(next);
                    if next == '\n' {
                        break;
                    }
                }
                continue;
            }
            if c == '/' && chars.peek() == Some(&'*') {
                if let Some(star) = chars.next() {
                    current.push(star);
                }
                let mut prev = '\0';
                for next in chars.by_ref() {
                    current.push(next);
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                continue;
            }
        }

        if !c.is_whitespace() && c != ';' {
            has_code = true;
        }

        match c {
            '\'' if dollar_tag.is_none() => in_single_quote = !in_single_quote,
            '$' if !in_single_quote => {
                let mut tag = String::from("$");
                while let Some(&next) = chars.peek() {
                    if next == '$' {
                        chars.next();
                        tag.push('$');
                        current.push('$');
                        break;
                    } else if next.is_alphanumeric() || next == '_' {
                        chars.next();
                        tag.push(next);
                        current.push(next);
                    } else {
                        break;
                    }
                }

                // A delimiter is `$$` or `$tag$`; anything else is a positional parameter.
                if tag.len() >= 2 && tag.ends_with('$') {
                    match &dollar_tag {
                        Some(open) if *open == tag => dollar_tag = None,
                        Some(_) => {}
                        None => dollar_tag = Some(tag),
                    }
                }
            }
            ';' if !in_single_quote && dollar_tag.is_none() => {
                if has_code {
                    push_statement(&mut statements, &current);
                }
                current.clear();
                has_code = false;
            }
            _ => {}
        }
    }

    // The last statement may lack a trailing semicolon
    if has_code {
        push_statement(&mut statements, &current);
    }

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    statements.push(raw.trim().trim_end_matches(';').trim().to_string());
}

/// Load SQL migrations from a directory.
///
/// Each migration is a `<version>.up.sql` file with an optional
/// `<version>.down.sql` next to it, for example:
/// - `2024_02_01_090000_add_orders.up.sql`
/// - `2024_02_01_090000_add_orders.down.sql`
///
/// A missing directory yields no migrations. The result is sorted by version.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<SqlMigration>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(version) = file_name.strip_suffix(UP_SUFFIX) else {
            continue;
        };
        if version.is_empty() {
            return Err(KeelError::Config(format!(
                "Invalid migration filename: {}",
                path.display()
            )));
        }

        let up = std::fs::read_to_string(&path)?;
        let mut migration = SqlMigration::new(version, up);

        let down_path = dir.join(format!("{}{}", version, DOWN_SUFFIX));
        if down_path.exists() {
            migration = migration.with_down(std::fs::read_to_string(&down_path)?);
        }

        migrations.push(migration);
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version));

    debug!("Loaded {} SQL migrations from {:?}", migrations.len(), dir);
    Ok(migrations)
}
