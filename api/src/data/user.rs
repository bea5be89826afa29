use noticeboard_shared::UserProfile;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_staff: bool,
}

impl UserRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            hashed_password: row.get(5)?,
            is_active: row.get(6)?,
            is_staff: row.get(7)?,
        })
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_active: self.is_active,
            is_staff: self.is_staff,
        }
    }
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub hashed_password: &'a str,
}

/// A unique column that already holds the submitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taken {
    Username,
    Email,
}

impl Taken {
    pub fn message(self) -> &'static str {
        match self {
            Self::Username => "Username already exists",
            Self::Email => "Email already exists",
        }
    }

    /// Recognizes a `UNIQUE` failure on `users`, as seen when a concurrent
    /// registration wins the race between the existence check and the insert.
    pub fn from_error(err: &rusqlite::Error) -> Option<Self> {
        let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
            return None;
        };
        if failure.code != ErrorCode::ConstraintViolation {
            return None;
        }
        if message.contains("users.username") {
            Some(Self::Username)
        } else if message.contains("users.email") {
            Some(Self::Email)
        } else {
            None
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, hashed_password, is_active, is_staff";

pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Inserts an active, non-staff user and returns its id.
    pub fn create(&self, user: &NewUser<'_>) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO users (email, username, first_name, last_name, hashed_password, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                user.email,
                user.username,
                user.first_name,
                user.last_name,
                user.hashed_password
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, id: i64) -> rusqlite::Result<Option<UserRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                UserRecord::from_row,
            )
            .optional()
    }

    pub fn find_by_username(&self, username: &str) -> rusqlite::Result<Option<UserRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                UserRecord::from_row,
            )
            .optional()
    }

    pub fn username_exists(&self, username: &str) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            [username],
            |row| row.get(0),
        )
    }

    pub fn email_exists(&self, email: &str) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            [email],
            |row| row.get(0),
        )
    }
}

#[cfg(test)]
pub(crate) fn insert_test_user(conn: &Connection, username: &str) -> i64 {
    UserRepository::new(conn)
        .create(&NewUser {
            email: &format!("{username}@example.com"),
            username,
            first_name: "",
            last_name: "",
            hashed_password: "not-a-real-hash",
        })
        .unwrap()
}

#[cfg(test)]
pub(crate) fn promote_test_user(conn: &Connection, id: i64) {
    conn.execute("UPDATE users SET is_staff = 1 WHERE id = ?1", [id])
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn created_users_are_active_and_not_staff() {
        let conn = test_connection();
        let id = insert_test_user(&conn, "alice");

        let user = UserRepository::new(&conn).find_by_id(id).unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(!user.is_staff);
    }

    #[test]
    fn reports_existing_usernames_and_emails() {
        let conn = test_connection();
        insert_test_user(&conn, "bob");
        let repo = UserRepository::new(&conn);

        assert!(repo.username_exists("bob").unwrap());
        assert!(!repo.username_exists("carol").unwrap());
        assert!(repo.email_exists("bob@example.com").unwrap());
        assert!(!repo.email_exists("carol@example.com").unwrap());
    }

    #[test]
    fn unique_constraints_reject_duplicates() {
        let conn = test_connection();
        insert_test_user(&conn, "dave");
        let result = UserRepository::new(&conn).create(&NewUser {
            email: "other@example.com",
            username: "dave",
            first_name: "",
            last_name: "",
            hashed_password: "x",
        });
        let err = result.unwrap_err();
        assert_eq!(Taken::from_error(&err), Some(Taken::Username));
    }

    #[test]
    fn duplicate_email_is_recognized() {
        let conn = test_connection();
        insert_test_user(&conn, "frank");
        let err = UserRepository::new(&conn)
            .create(&NewUser {
                email: "frank@example.com",
                username: "frankie",
                first_name: "",
                last_name: "",
                hashed_password: "x",
            })
            .unwrap_err();
        assert_eq!(Taken::from_error(&err), Some(Taken::Email));
    }

    #[test]
    fn other_errors_are_not_duplicates() {
        assert_eq!(Taken::from_error(&rusqlite::Error::InvalidQuery), None);

        let conn = test_connection();
        let err = conn
            .execute("INSERT INTO notices (title, content, owner_id) VALUES ('t', 'c', 99)", [])
            .unwrap_err();
        assert_eq!(Taken::from_error(&err), None);
    }

    #[test]
    fn profile_reflects_staff_flag() {
        let conn = test_connection();
        let id = insert_test_user(&conn, "erin");
        promote_test_user(&conn, id);

        let user = UserRepository::new(&conn).find_by_username("erin").unwrap().unwrap();
        assert!(user.profile().is_staff);
        assert_eq!(user.profile().id, id);
    }
}
