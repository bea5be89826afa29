use noticeboard_shared::{Notice, User};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::page_offset;

/// Flat notice projection: owner joined in, like/hate summed over the outer
/// join on `notice_like` so a notice without votes reports 0/0.
const NOTICE_SELECT: &str = "
    SELECT n.id, n.title, n.content, n.views, n.created_at, n.updated_at,
           u.id, u.username,
           COALESCE(SUM(CASE WHEN l.is_like THEN 1 ELSE 0 END), 0),
           COALESCE(SUM(CASE WHEN l.is_hate THEN 1 ELSE 0 END), 0),
           (SELECT COUNT(*) FROM comments c WHERE c.notice_id = n.id)
    FROM notices n
    JOIN users u ON n.owner_id = u.id
    LEFT JOIN notice_like l ON l.notice_id = n.id";

fn notice_from_row(row: &Row<'_>) -> rusqlite::Result<Notice> {
    Ok(Notice {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        views: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        owner: User {
            id: row.get(6)?,
            username: row.get(7)?,
        },
        like_cnt: row.get(8)?,
        hate_cnt: row.get(9)?,
        comment_cnt: row.get(10)?,
    })
}

pub struct NoticeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> NoticeRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, owner_id: i64, title: &str, content: &str) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO notices (owner_id, title, content) VALUES (?1, ?2, ?3)",
            params![owner_id, title, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find(&self, id: i64) -> rusqlite::Result<Option<Notice>> {
        self.conn
            .query_row(
                &format!("{NOTICE_SELECT} WHERE n.id = ?1 GROUP BY n.id"),
                [id],
                notice_from_row,
            )
            .optional()
    }

    /// Newest first. Returns the page together with the total notice count.
    pub fn list(&self, page: i64, per_page: i64) -> rusqlite::Result<(Vec<Notice>, i64)> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notices", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(&format!(
            "{NOTICE_SELECT} GROUP BY n.id ORDER BY n.created_at DESC, n.id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let notices = stmt
            .query_map(
                params![per_page, page_offset(page, per_page)],
                notice_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((notices, total))
    }

    pub fn owner_of(&self, id: i64) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row("SELECT owner_id FROM notices WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
    }

    pub fn increment_views(&self, id: i64) -> rusqlite::Result<usize> {
        self.conn
            .execute("UPDATE notices SET views = views + 1 WHERE id = ?1", [id])
    }

    pub fn update(&self, id: i64, title: &str, content: &str) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE notices SET title = ?2, content = ?3, updated_at = datetime('now')
             WHERE id = ?1",
            params![id, title, content],
        )
    }

    /// Comments, likes and file rows go with it through `ON DELETE CASCADE`.
    pub fn delete(&self, id: i64) -> rusqlite::Result<usize> {
        self.conn.execute("DELETE FROM notices WHERE id = ?1", [id])
    }
}
