use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use tracing::info;

use crate::db::{create_todo, delete_todo, get_todo, list_todos, update_todo, UpdateOutcome};
use crate::error::{AppError, NO_TODOS_FOUND};
use crate::extract::{Json, Path};
use crate::models::{TodoFields, TodoView};
use crate::AppState;

/// Reads report a missing store as "nothing found" rather than a server error.
fn unavailable_as_not_found(err: AppError) -> AppError {
    match err {
        AppError::StoreUnavailable => AppError::NotFound(NO_TODOS_FOUND.to_string()),
        other => other,
    }
}

pub async fn list_all_todos(State(state): State<AppState>) -> Result<Json<Vec<TodoView>>, AppError> {
    let todos = list_todos(&state.db).map_err(unavailable_as_not_found)?;
    info!(count = todos.len(), "Listed todos");
    Ok(Json(todos.into_iter().map(TodoView::from).collect()))
}

pub async fn get_single_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TodoView>, AppError> {
    match get_todo(&state.db, id).map_err(unavailable_as_not_found)? {
        Some(todo) => Ok(Json(todo.into())),
        None => Err(AppError::todo_not_found(id)),
    }
}

pub async fn update_existing_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TodoView>,
) -> Result<StatusCode, AppError> {
    if id != req.id {
        return Err(AppError::BadRequest(
            "Submitted to do item id doesn't match request id".to_string(),
        ));
    }

    let current = get_todo(&state.db, id)?.ok_or_else(|| AppError::todo_not_found(id))?;

    match update_todo(&state.db, id, current.version, &req.fields)? {
        UpdateOutcome::Updated => {
            info!(id, version = current.version + 1, "Updated todo");
            Ok(StatusCode::NO_CONTENT)
        }
        UpdateOutcome::NotFound => Err(AppError::todo_not_found(id)),
        UpdateOutcome::Conflict => Err(AppError::Conflict { id }),
    }
}

pub async fn create_new_todo(
    State(state): State<AppState>,
    Json(req): Json<TodoFields>,
) -> Result<impl IntoResponse, AppError> {
    let todo = create_todo(&state.db, &req)?;
    info!(id = todo.id, user_id = %todo.fields.user_id, "Created todo");

    let location = format!("{}/api/todo/{}", state.base_path, todo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TodoView::from(todo)),
    ))
}

pub async fn delete_existing_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if delete_todo(&state.db, id)? {
        info!(id, "Deleted todo");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::todo_not_found(id))
    }
}
