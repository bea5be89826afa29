use noticeboard_shared::NoticeFile;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// File metadata plus where the bytes live on disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file: NoticeFile,
    pub path: String,
}

pub struct NewFile<'a> {
    pub notice_id: i64,
    pub path: &'a str,
    pub name: &'a str,
    pub size: i64,
    pub content_type: &'a str,
}

const FILE_COLUMNS: &str = "id, notice_id, name, size, content_type, download_cnt, created_at, path";

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        file: NoticeFile {
            id: row.get(0)?,
            notice_id: row.get(1)?,
            name: row.get(2)?,
            size: row.get(3)?,
            content_type: row.get(4)?,
            download_cnt: row.get(5)?,
            created_at: row.get(6)?,
        },
        path: row.get(7)?,
    })
}

pub struct FileRepository<'a> {
    conn: &'a Connection,
}

impl<'a> FileRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, file: &NewFile<'_>) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO notice_files (notice_id, path, name, size, content_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file.notice_id,
                file.path,
                file.name,
                file.size,
                file.content_type
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_for_notice(&self, notice_id: i64) -> rusqlite::Result<Vec<StoredFile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM notice_files WHERE notice_id = ?1 ORDER BY id"
        ))?;
        let files = stmt
            .query_map([notice_id], stored_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn find(&self, notice_id: i64, id: i64) -> rusqlite::Result<Option<StoredFile>> {
        self.conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM notice_files WHERE id = ?1 AND notice_id = ?2"),
                params![id, notice_id],
                stored_from_row,
            )
            .optional()
    }

    pub fn increment_downloads(&self, id: i64) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE notice_files SET download_cnt = download_cnt + 1 WHERE id = ?1",
            [id],
        )
    }
}
