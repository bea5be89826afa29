use std::{
    fs,
    path::{Path, PathBuf},
};

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use noticeboard_shared::NoticeFile;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::{
    data::file::{FileRepository, NewFile},
    db,
    error::AppError,
    extract::Path as UrlPath,
    AppState,
};

/// A file part received with a notice.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Keeps the last path component and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "file".to_string(),
        _ => cleaned,
    }
}

pub fn stored_file_name(name: &str, uploaded_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        uploaded_at.format("%Y%m%d%H%M%S%3f"),
        sanitize_file_name(name)
    )
}

fn free_path(upload_dir: &Path, name: &str, uploaded_at: DateTime<Utc>) -> PathBuf {
    let stored = stored_file_name(name, uploaded_at);
    let mut path = upload_dir.join(&stored);
    let mut n = 1;
    while path.exists() {
        path = upload_dir.join(format!("{n}-{stored}"));
        n += 1;
    }
    path
}

/// Writes uploads to disk and records them against the notice.
///
/// Runs on the blocking pool. A failure part-way leaves earlier files and the
/// notice row in place.
pub fn store_uploads(
    conn: &Connection,
    upload_dir: &Path,
    notice_id: i64,
    uploads: &[Upload],
) -> Result<Vec<NoticeFile>, AppError> {
    if uploads.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(upload_dir)?;

    let files = FileRepository::new(conn);
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let path = free_path(upload_dir, &upload.name, Utc::now());
        fs::write(&path, &upload.bytes)?;
        let path = path.to_string_lossy().into_owned();

        let id = files.create(&NewFile {
            notice_id,
            path: &path,
            name: &upload.name,
            size: upload.bytes.len() as i64,
            content_type: &upload.content_type,
        })?;
        debug!(notice_id, file_id = id, %path, "stored upload");

        if let Some(file) = files.find(notice_id, id)? {
            stored.push(file.file);
        }
    }

    Ok(stored)
}

/// Best-effort cleanup after the owning rows are gone.
pub fn remove_stored(paths: &[String]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!(%path, "failed to remove stored file: {e}");
        }
    }
}

/// GET /notices/{id}/files/{file_id}
pub async fn download(
    State(state): State<AppState>,
    UrlPath((notice_id, file_id)): UrlPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let stored = db::run(&state.db, move |conn| {
        FileRepository::new(conn)
            .find(notice_id, file_id)?
            .ok_or_else(|| AppError::not_found("File"))
    })
    .await?;

    let bytes = match tokio::fs::read(&stored.path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %stored.path, "file row without stored bytes");
            return Err(AppError::not_found("File"));
        }
        Err(e) => return Err(e.into()),
    };

    db::run(&state.db, move |conn| {
        Ok(FileRepository::new(conn).increment_downloads(file_id)?)
    })
    .await?;

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&stored.file.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, stored.file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
