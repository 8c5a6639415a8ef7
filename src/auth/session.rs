use rand::Rng;
use rusqlite::params;

use crate::db::models::UserId;
use crate::extractors::CurrentUser;
use crate::state::DbPool;
use crate::store::StoreError;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: UserId, hours: u64) -> Result<String, StoreError> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id.0, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve a token to its user. Unknown and expired tokens resolve to `None`.
pub fn lookup_session(pool: &DbPool, token: &str) -> Result<Option<CurrentUser>, StoreError> {
    let conn = pool.get()?;

    let found = conn.query_row(
        "SELECT u.id, u.username FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(CurrentUser {
                id: UserId(row.get(0)?),
                username: row.get(1)?,
            })
        },
    );

    match found {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> Result<(), StoreError> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_round_trip() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");

        let token = create_session(&pool, alice, 1).unwrap();
        let user = lookup_session(&pool, &token).unwrap().unwrap();
        assert_eq!(user.id, alice);
        assert_eq!(user.username, "alice");

        delete_session(&pool, &token).unwrap();
        assert!(lookup_session(&pool, &token).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored() {
        let (pool, _temp) = testing::pool();
        let alice = testing::insert_user(&pool, "alice");

        let token = create_session(&pool, alice, 1).unwrap();
        pool.get()
            .unwrap()
            .execute(
                "UPDATE sessions SET expires_at = datetime('now', '-1 minute') WHERE token = ?1",
                params![token],
            )
            .unwrap();
        assert!(lookup_session(&pool, &token).unwrap().is_none());
    }

    #[test]
    fn unknown_token_is_none() {
        let (pool, _temp) = testing::pool();
        assert!(lookup_session(&pool, "nope").unwrap().is_none());
    }
}
