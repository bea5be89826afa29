use axum::{extract::State, http::HeaderMap};
use noticeboard_shared::LikeState;
use tracing::debug;

use crate::{
    auth,
    data::{
        like::{LikeRepository, Vote},
        notice::NoticeRepository,
    },
    db,
    error::AppError,
    extract::{Json, Path},
    AppState,
};

/// GET /notices/{id}/like — totals, plus the caller's own vote when signed in
pub async fn get_likes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notice_id): Path<i64>,
) -> Result<Json<LikeState>, AppError> {
    let user_id = auth::extract_user_id(&headers, &state.config.jwt_secret).ok();

    let resp = db::run(&state.db, move |conn| {
        if NoticeRepository::new(conn).owner_of(notice_id)?.is_none() {
            return Err(AppError::not_found("Notice"));
        }
        Ok(LikeRepository::new(conn).state(notice_id, user_id)?)
    })
    .await?;

    Ok(Json(resp))
}

/// POST /notices/{id}/like
pub async fn like_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notice_id): Path<i64>,
) -> Result<Json<LikeState>, AppError> {
    cast_vote(state, headers, notice_id, Vote::Like).await
}

/// POST /notices/{id}/hate
pub async fn hate_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notice_id): Path<i64>,
) -> Result<Json<LikeState>, AppError> {
    cast_vote(state, headers, notice_id, Vote::Hate).await
}

async fn cast_vote(
    state: AppState,
    headers: HeaderMap,
    notice_id: i64,
    vote: Vote,
) -> Result<Json<LikeState>, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    let user_id = user.id;

    let resp = db::run(&state.db, move |conn| {
        if NoticeRepository::new(conn).owner_of(notice_id)?.is_none() {
            return Err(AppError::not_found("Notice"));
        }
        let likes = LikeRepository::new(conn);
        likes.toggle(notice_id, user_id, vote)?;
        Ok(likes.state(notice_id, Some(user_id))?)
    })
    .await?;

    debug!(notice_id, user_id, ?vote, like = resp.like, hate = resp.hate, "vote cast");
    Ok(Json(resp))
}
