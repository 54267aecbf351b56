//! Shared transaction flow for SQL backends.
//!
//! A changeset and its history bookkeeping are one atomic unit: every
//! statement of the body runs inside a single transaction, followed by
//! the dialect's insert or delete on the history table. Dropping the
//! transaction on any failure rolls the whole unit back.

use sqlx::{Database, Encode, Executor, IntoArguments, Pool, Type};
use tracing::debug;

use drift_core::{Error, Result};

/// Execute every statement of `content`, then `bookkeeping_sql` bound to
/// `name`, inside one transaction.
///
/// `bookkeeping_sql` is the dialect's history INSERT (apply) or DELETE
/// (rollback) with a single placeholder for the migration name.
pub(crate) async fn run_changeset<DB>(
    pool: &Pool<DB>,
    name: &str,
    content: &str,
    bookkeeping_sql: &str,
) -> Result<()>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    for<'q> &'q str: Encode<'q, DB> + Type<DB>,
{
    let mut tx = pool.begin().await.map_err(Error::Connection)?;

    for statement in split_statements(content) {
        debug!("Executing statement:\n{}", statement);

        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Migration {
                name: name.to_string(),
                source: e,
            })?;
    }

    sqlx::query(bookkeeping_sql)
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Migration {
            name: name.to_string(),
            source: e,
        })?;

    tx.commit().await.map_err(|e| Error::Migration {
        name: name.to_string(),
        source: e,
    })?;

    Ok(())
}

/// Split a changeset body into individual statements.
///
/// Semicolons inside single-quoted strings (with `''` escapes),
/// double-quoted identifiers, `--` line comments and dollar-quoted
/// blocks do not split. Empty and comment-only fragments are dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut dollar_tag: Option<String> = None;

    while let Some(c) = chars.next() {
        match c {
            '\'' if dollar_tag.is_none() => {
                current.push(c);
                while let Some(q) = chars.next() {
                    current.push(q);
                    if q == '\'' {
                        // '' is an escaped quote, not the end of the string
                        if chars.peek() == Some(&'\'') {
                            current.push(chars.next().unwrap());
                        } else {
                            break;
                        }
                    }
                }
            }
            '"' if dollar_tag.is_none() => {
                current.push(c);
                for q in chars.by_ref() {
                    current.push(q);
                    if q == '"' {
                        break;
                    }
                }
            }
            '-' if dollar_tag.is_none() && chars.peek() == Some(&'-') => {
                current.push(c);
                for q in chars.by_ref() {
                    current.push(q);
                    if q == '\n' {
                        break;
                    }
                }
            }
            '$' => {
                current.push(c);

                // Collect a potential dollar-quote tag like $$ or $tag$
                let mut tag = String::from("$");
                while let Some(&next) = chars.peek() {
                    if next == '$' {
                        tag.push(chars.next().unwrap());
                        current.push('$');
                        break;
                    } else if next.is_alphanumeric() || next == '_' {
                        tag.push(next);
                        current.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }

                if tag.len() >= 2 && tag.ends_with('$') {
                    match &dollar_tag {
                        Some(open) if *open == tag => dollar_tag = None,
                        None => dollar_tag = Some(tag),
                        _ => {}
                    }
                }
            }
            ';' if dollar_tag.is_none() => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if statement.is_empty() {
        return;
    }

    let comment_only = statement.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with("--")
    });
    if comment_only {
        return;
    }

    statements.push(statement.to_string());
}
