//! Cache key builders for all WebStor cache entries.
//!
//! Centralising key construction prevents typos and makes it easy to
//! find every key the application uses. Every key carries the owning
//! user, so one user's cached listings can never answer another user's
//! request.

use uuid::Uuid;

/// Prefix applied to all WebStor cache keys.
const PREFIX: &str = "webstor";

/// Cache key for a file entity by ID.
pub fn file_by_id(user_id: Uuid, file_id: Uuid) -> String {
    format!("{PREFIX}:user:{user_id}:file:{file_id}")
}

/// Cache key for a user's full file listing.
pub fn user_files(user_id: Uuid) -> String {
    format!("{PREFIX}:user:{user_id}:files")
}

/// Cache key for the file listing of a folder.
pub fn folder_files(user_id: Uuid, folder_id: Uuid) -> String {
    format!("{PREFIX}:user:{user_id}:folder:{folder_id}:files")
}

/// Cache key for a file's event history.
pub fn file_events(user_id: Uuid, file_id: Uuid) -> String {
    format!("{PREFIX}:user:{user_id}:file:{file_id}:events")
}

/// Pattern matching every cache entry scoped to one user.
pub fn user_pattern(user_id: Uuid) -> String {
    format!("{PREFIX}:user:{user_id}:*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key() {
        let user = Uuid::nil();
        let file = Uuid::nil();
        assert_eq!(
            file_by_id(user, file),
            "webstor:user:00000000-0000-0000-0000-000000000000:file:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_keys_are_distinct() {
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        assert_ne!(user_files(user), folder_files(user, id));
        assert_ne!(file_by_id(user, id), file_events(user, id));
    }

    #[test]
    fn test_user_pattern_prefixes_user_keys() {
        let user = Uuid::new_v4();
        let prefix = user_pattern(user);
        let prefix = prefix.trim_end_matches('*');
        assert!(user_files(user).starts_with(prefix));
        assert!(folder_files(user, Uuid::new_v4()).starts_with(prefix));
    }
}
