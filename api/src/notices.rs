use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use noticeboard_shared::*;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::{
    auth,
    data::{file::FileRepository, notice::NoticeRepository},
    db,
    error::AppError,
    extract::{Json, Multipart, Path, Query},
    files::{self, Upload},
    AppState,
};

pub const PER_PAGE: i64 = 20;

// ── Query params ──

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Sanitizes user-supplied text and rejects it if nothing is left.
pub fn clean_required(value: &str, field: &str) -> Result<String, AppError> {
    let cleaned = ammonia::clean(value);
    if cleaned.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(cleaned)
}

pub fn load_detail(conn: &Connection, id: i64) -> Result<NoticeDetail, AppError> {
    let notice = NoticeRepository::new(conn)
        .find(id)?
        .ok_or_else(|| AppError::not_found("Notice"))?;
    let files = FileRepository::new(conn)
        .list_for_notice(id)?
        .into_iter()
        .map(|stored| stored.file)
        .collect();

    Ok(NoticeDetail { notice, files })
}

/// Looks up the notice and checks the caller owns it.
fn ensure_owner(conn: &Connection, id: i64, user_id: i64) -> Result<(), AppError> {
    match NoticeRepository::new(conn).owner_of(id)? {
        None => Err(AppError::not_found("Notice")),
        Some(owner) if owner != user_id => Err(AppError::not_owner()),
        Some(_) => Ok(()),
    }
}

// ── Handlers ──

/// GET /notices?page=1
pub async fn list_notices(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<Notice>>, AppError> {
    let page = params.page();

    let (items, total) = db::run(&state.db, move |conn| {
        Ok(NoticeRepository::new(conn).list(page, PER_PAGE)?)
    })
    .await?;

    Ok(Json(Paginated {
        items,
        total,
        page,
        per_page: PER_PAGE,
    }))
}

/// POST /notices — multipart: `title`, `content`, and any number of file parts
pub async fn create_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Multipart(mut multipart): Multipart,
) -> Result<Json<NoticeDetail>, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    if state.config.staff_only_notices && !user.is_staff {
        return Err(AppError::Unauthorized(
            "Only staff members can post notices".to_string(),
        ));
    }

    let mut title = None;
    let mut content = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                uploads.push(Upload {
                    name: file_name,
                    content_type,
                    bytes,
                });
            }
            // Empty file input
            Some(_) => {}
            None => match name.as_str() {
                "title" => title = Some(field.text().await?),
                "content" => content = Some(field.text().await?),
                _ => {}
            },
        }
    }

    let title = clean_required(title.as_deref().unwrap_or_default(), "title")?;
    let content = clean_required(content.as_deref().unwrap_or_default(), "content")?;
    let upload_dir = state.config.upload_dir.clone();
    let user_id = user.id;

    let detail = db::run(&state.db, move |conn| {
        let id = NoticeRepository::new(conn).create(user_id, &title, &content)?;
        files::store_uploads(conn, &upload_dir, id, &uploads)?;
        load_detail(conn, id)
    })
    .await?;

    info!(
        notice_id = detail.notice.id,
        user_id,
        files = detail.files.len(),
        "created notice"
    );
    Ok(Json(detail))
}

/// GET /notices/{id}
pub async fn get_notice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<NoticeDetail>, AppError> {
    let detail = db::run(&state.db, move |conn| {
        if NoticeRepository::new(conn).increment_views(id)? == 0 {
            return Err(AppError::not_found("Notice"));
        }
        load_detail(conn, id)
    })
    .await?;

    Ok(Json(detail))
}

/// PUT /notices/{id}
pub async fn update_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateNotice>,
) -> Result<Json<NoticeDetail>, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    let title = clean_required(&payload.title, "title")?;
    let content = clean_required(&payload.content, "content")?;

    let detail = db::run(&state.db, move |conn| {
        ensure_owner(conn, id, user.id)?;
        NoticeRepository::new(conn).update(id, &title, &content)?;
        load_detail(conn, id)
    })
    .await?;

    Ok(Json(detail))
}

/// DELETE /notices/{id}
pub async fn delete_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = auth::require_user(&state, &headers).await?;
    let user_id = user.id;

    let paths = db::run(&state.db, move |conn| {
        ensure_owner(conn, id, user_id)?;
        let paths: Vec<String> = FileRepository::new(conn)
            .list_for_notice(id)?
            .into_iter()
            .map(|stored| stored.path)
            .collect();
        NoticeRepository::new(conn).delete(id)?;
        Ok(paths)
    })
    .await?;

    tokio::task::spawn_blocking(move || files::remove_stored(&paths)).await?;

    info!(notice_id = id, user_id, "deleted notice");
    Ok(StatusCode::NO_CONTENT)
}
