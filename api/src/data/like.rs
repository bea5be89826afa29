use noticeboard_shared::LikeState;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Like,
    Hate,
}

/// One user's like/hate flags on one notice. At most one is ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ballot {
    pub like: bool,
    pub hate: bool,
}

impl Ballot {
    /// Flips the voted flag and clears the other one.
    pub fn toggle(self, vote: Vote) -> Self {
        match vote {
            Vote::Like => Self {
                like: !self.like,
                hate: false,
            },
            Vote::Hate => Self {
                like: false,
                hate: !self.hate,
            },
        }
    }
}

pub struct LikeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LikeRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn find(&self, notice_id: i64, owner_id: i64) -> rusqlite::Result<Option<Ballot>> {
        find_ballot(self.conn, notice_id, owner_id)
    }

    /// Applies a vote: the first one inserts the caller's row, later ones flip it.
    pub fn toggle(&self, notice_id: i64, owner_id: i64, vote: Vote) -> rusqlite::Result<Ballot> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let ballot = match find_ballot(&tx, notice_id, owner_id)? {
            Some(current) => {
                let next = current.toggle(vote);
                tx.execute(
                    "UPDATE notice_like SET is_like = ?3, is_hate = ?4
                     WHERE notice_id = ?1 AND owner_id = ?2",
                    params![notice_id, owner_id, next.like, next.hate],
                )?;
                next
            }
            None => {
                let next = Ballot::default().toggle(vote);
                tx.execute(
                    "INSERT INTO notice_like (notice_id, owner_id, is_like, is_hate)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![notice_id, owner_id, next.like, next.hate],
                )?;
                next
            }
        };

        tx.commit()?;
        Ok(ballot)
    }

    /// (like_cnt, hate_cnt) for a notice.
    pub fn counts(&self, notice_id: i64) -> rusqlite::Result<(i64, i64)> {
        self.conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN is_like THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_hate THEN 1 ELSE 0 END), 0)
             FROM notice_like WHERE notice_id = ?1",
            [notice_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    pub fn state(&self, notice_id: i64, owner_id: Option<i64>) -> rusqlite::Result<LikeState> {
        let ballot = match owner_id {
            Some(owner_id) => self.find(notice_id, owner_id)?.unwrap_or_default(),
            None => Ballot::default(),
        };
        let (like_cnt, hate_cnt) = self.counts(notice_id)?;

        Ok(LikeState {
            like: ballot.like,
            hate: ballot.hate,
            like_cnt,
            hate_cnt,
        })
    }
}

fn find_ballot(
    conn: &Connection,
    notice_id: i64,
    owner_id: i64,
) -> rusqlite::Result<Option<Ballot>> {
    conn.query_row(
        "SELECT is_like, is_hate FROM notice_like WHERE notice_id = ?1 AND owner_id = ?2",
        params![notice_id, owner_id],
        |row| {
            Ok(Ballot {
                like: row.get(0)?,
                hate: row.get(1)?,
            })
        },
    )
    .optional()
}
