use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use noticeboard_shared::{Comment, CreateComment, Paginated};
use rusqlite::Connection;

use crate::{
    auth,
    data::{comment::CommentRepository, notice::NoticeRepository},
    db,
    error::AppError,
    extract::{Json, Path, Query},
    notices::{clean_required, PageParams, PER_PAGE},
    AppState,
};

fn ensure_notice(conn: &Connection, notice_id: i64) -> Result<(), AppError> {
    NoticeRepository::new(conn)
        .owner_of(notice_id)?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Notice"))
}

/// The comment must sit under the notice in the path and belong to the caller.
fn owned_comment(
    conn: &Connection,
    notice_id: i64,
    comment_id: i64,
    user_id: i64,
) -> Result<Comment, AppError> {
    let comment = CommentRepository::new(conn)
        .find(comment_id)?
        .filter(|c| c.notice_id == notice_id)
        .ok_or_else(|| AppError::not_found("Comment"))?;

    if comment.owner.id != user_id {
        return Err(AppError::not_owner());
    }
    Ok(comment)
}

/// GET /notices/{id}/comments?page=1
pub async fn list_comments(
    State(state): State<AppState>,
    Path(notice_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<Comment>>, AppError> {
    let page = params.page();

    let result = db::run(&state.db, move |conn| {
        ensure_notice(conn, notice_id)?;
        let comments = CommentRepository::new(conn);

        Ok(Paginated {
            items: comments.list_for_notice(notice_id, page, PER_PAGE)?,
            total: comments.count_for_notice(notice_id)?,
            page,
            per_page: PER_PAGE,
        })
    })
    .await?;

    Ok(Json(result))
}

/// POST /notices/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notice_id): Path<i64>,
    Json(payload): Json<CreateComment>,
) -> Result<Json<Comment>, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    let text = clean_required(&payload.text, "text")?;

    let comment = db::run(&state.db, move |conn| {
        ensure_notice(conn, notice_id)?;
        let comments = CommentRepository::new(conn);
        let id = comments.create(notice_id, user.id, &text)?;

        comments
            .find(id)?
            .ok_or_else(|| AppError::Internal(format!("comment {id} missing after insert")))
    })
    .await?;

    Ok(Json(comment))
}

/// PUT /notices/{id}/comments/{comment_id}
pub async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((notice_id, comment_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateComment>,
) -> Result<Json<Comment>, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    let text = clean_required(&payload.text, "text")?;

    let comment = db::run(&state.db, move |conn| {
        owned_comment(conn, notice_id, comment_id, user.id)?;
        let comments = CommentRepository::new(conn);
        comments.update(comment_id, &text)?;

        comments
            .find(comment_id)?
            .ok_or_else(|| AppError::not_found("Comment"))
    })
    .await?;

    Ok(Json(comment))
}

/// DELETE /notices/{id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((notice_id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let user = auth::require_user(&state, &headers).await?;

    db::run(&state.db, move |conn| {
        owned_comment(conn, notice_id, comment_id, user.id)?;
        CommentRepository::new(conn).delete(comment_id)?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}
