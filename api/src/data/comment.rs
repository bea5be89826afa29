use noticeboard_shared::{Comment, User};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::page_offset;

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        notice_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        owner: User {
            id: row.get(5)?,
            username: row.get(6)?,
        },
    })
}

pub struct CommentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CommentRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, notice_id: i64, owner_id: i64, text: &str) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO comments (notice_id, owner_id, text) VALUES (?1, ?2, ?3)",
            params![notice_id, owner_id, text],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find(&self, id: i64) -> rusqlite::Result<Option<Comment>> {
        self.conn
            .query_row(
                "SELECT c.id, c.notice_id, c.text, c.created_at, c.updated_at,
                        u.id, u.username
                 FROM comments c JOIN users u ON c.owner_id = u.id
                 WHERE c.id = ?1",
                [id],
                comment_from_row,
            )
            .optional()
    }

    /// One page of a notice's comments, newest first.
    pub fn list_for_notice(
        &self,
        notice_id: i64,
        page: i64,
        per_page: i64,
    ) -> rusqlite::Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.notice_id, c.text, c.created_at, c.updated_at,
                    u.id, u.username
             FROM notices n
             JOIN comments c ON c.notice_id = n.id
             JOIN users u ON c.owner_id = u.id
             WHERE n.id = ?1
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt
            .query_map(
                params![notice_id, per_page, page_offset(page, per_page)],
                comment_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    pub fn count_for_notice(&self, notice_id: i64) -> rusqlite::Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE notice_id = ?1",
            [notice_id],
            |row| row.get(0),
        )
    }

    pub fn update(&self, id: i64, text: &str) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE comments SET text = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, text],
        )
    }

    pub fn delete(&self, id: i64) -> rusqlite::Result<usize> {
        self.conn.execute("DELETE FROM comments WHERE id = ?1", [id])
    }
}
