use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::error::AppError;
use crate::models::{TodoFields, TodoItem, User};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY,
        user_id TEXT NOT NULL,
        item_type TEXT NOT NULL,
        content TEXT NOT NULL,
        end_date TEXT,
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE COLLATE NOCASE,
        email TEXT NOT NULL COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        created_at INTEGER DEFAULT (strftime('%s', 'now'))
    );

    CREATE INDEX IF NOT EXISTS users_email ON users (email);
";

const TODO_COLUMNS: &str = "id, user_id, item_type, content, end_date, version";

/// Result of a version-guarded update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    /// The row still exists but its version moved on since it was read.
    Conflict,
}

pub fn init_db(path: impl AsRef<Path>) -> rusqlite::Result<DbPool> {
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn open_in_memory() -> rusqlite::Result<DbPool> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

fn lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, AppError> {
    pool.lock()
        .map_err(|_| AppError::Database("connection mutex poisoned".to_string()))
}

/// Locks the connection and checks that the to-do table is there.
fn todo_store(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, AppError> {
    let conn = lock(pool)?;
    let available: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'todos')",
        [],
        |row| row.get(0),
    )?;
    if !available {
        return Err(AppError::StoreUnavailable);
    }
    Ok(conn)
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    Ok(TodoItem {
        id: row.get(0)?,
        fields: TodoFields {
            user_id: row.get(1)?,
            r#type: row.get(2)?,
            content: row.get(3)?,
            end_date: row.get(4)?,
        },
        version: row.get(5)?,
    })
}

// Todo operations
pub fn list_todos(pool: &DbPool) -> Result<Vec<TodoItem>, AppError> {
    let conn = todo_store(pool)?;
    let mut stmt = conn.prepare(&format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY id"))?;
    let todos = stmt
        .query_map([], todo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(todos)
}

pub fn get_todo(pool: &DbPool, id: i64) -> Result<Option<TodoItem>, AppError> {
    let conn = todo_store(pool)?;
    get_todo_internal(&conn, id)
}

fn get_todo_internal(conn: &Connection, id: i64) -> Result<Option<TodoItem>, AppError> {
    let todo = conn
        .query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
            [id],
            todo_from_row,
        )
        .optional()?;
    Ok(todo)
}

pub fn create_todo(pool: &DbPool, fields: &TodoFields) -> Result<TodoItem, AppError> {
    let conn = todo_store(pool)?;
    conn.execute(
        "INSERT INTO todos (user_id, item_type, content, end_date) VALUES (?1, ?2, ?3, ?4)",
        params![fields.user_id, fields.r#type, fields.content, fields.end_date],
    )?;
    let id = conn.last_insert_rowid();

    get_todo_internal(&conn, id)?
        .ok_or_else(|| AppError::Internal(format!("to-do item {id} vanished after insert")))
}

/// Overwrites every mutable field of `id`, provided its version is still
/// `expected_version`. On a mismatch the row is looked up again to tell a
/// deleted row from a concurrent writer.
pub fn update_todo(
    pool: &DbPool,
    id: i64,
    expected_version: i64,
    fields: &TodoFields,
) -> Result<UpdateOutcome, AppError> {
    let conn = todo_store(pool)?;
    let rows = conn.execute(
        "UPDATE todos
         SET user_id = ?1, item_type = ?2, content = ?3, end_date = ?4, version = version + 1
         WHERE id = ?5 AND version = ?6",
        params![
            fields.user_id,
            fields.r#type,
            fields.content,
            fields.end_date,
            id,
            expected_version
        ],
    )?;

    if rows > 0 {
        Ok(UpdateOutcome::Updated)
    } else if todo_exists(&conn, id)? {
        Ok(UpdateOutcome::Conflict)
    } else {
        Ok(UpdateOutcome::NotFound)
    }
}

fn todo_exists(conn: &Connection, id: i64) -> Result<bool, AppError> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM todos WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn delete_todo(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let conn = todo_store(pool)?;
    let rows = conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
    Ok(rows > 0)
}

// User operations
fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

pub fn find_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            "SELECT id, username, email, password_hash FROM users WHERE username = ?1",
            [username],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            "SELECT id, username, email, password_hash FROM users WHERE email = ?1 LIMIT 1",
            [email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Inserts a user. Returns `false` when the username is already taken.
pub fn insert_user(pool: &DbPool, user: &User) -> Result<bool, AppError> {
    let conn = lock(pool)?;
    match conn.execute(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.username, user.email, user.password_hash],
    ) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}
