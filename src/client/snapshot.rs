//! Non-sensitive user snapshot that survives restarts.
//!
//! Holds only the public profile so the UI can render optimistically before
//! the session is revalidated. Never holds a token.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::users::User;

#[derive(Debug)]
pub struct SnapshotCache {
    path: Option<PathBuf>,
    cached: Mutex<Option<User>>,
}

impl SnapshotCache {
    /// Snapshot kept only for the life of the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cached: Mutex::new(None),
        }
    }

    /// Snapshot persisted as JSON at `path`. An existing file is read now.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = read_snapshot(&path);
        Self {
            path: Some(path),
            cached: Mutex::new(cached),
        }
    }

    pub fn load(&self) -> Option<User> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save(&self, user: &User) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());

        let Some(path) = &self.path else { return };
        match serde_json::to_vec(user) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(path, bytes) {
                    warn!("Failed to write user snapshot {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to encode user snapshot: {}", e),
        }
    }

    pub fn clear(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;

        let Some(path) = &self.path else { return };
        if let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove user snapshot {}: {}", path.display(), e);
        }
    }
}

fn read_snapshot(path: &PathBuf) -> Option<User> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read user snapshot {}: {}", path.display(), e);
            return None;
        }
    };

    // A corrupt snapshot is treated as absent
    match serde_json::from_slice(&bytes) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Ignoring unreadable user snapshot {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Chen".to_string(),
            email: "chen@university.edu".to_string(),
            avatar: "https://picsum.photos/200".to_string(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("starstudy-snapshot-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_in_memory_save_and_clear() {
        let cache = SnapshotCache::in_memory();
        assert_eq!(cache.load(), None);

        cache.save(&user());
        assert_eq!(cache.load(), Some(user()));

        cache.clear();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_persisted_snapshot_survives_reopen() {
        let path = temp_path();

        SnapshotCache::at_path(&path).save(&user());
        let reopened = SnapshotCache::at_path(&path);
        assert_eq!(reopened.load(), Some(user()));

        reopened.clear();
        assert!(!path.exists());
        assert_eq!(SnapshotCache::at_path(&path).load(), None);
    }

    #[test]
    fn test_corrupt_snapshot_is_ignored() {
        let path = temp_path();
        std::fs::write(&path, b"{not json").unwrap();

        assert_eq!(SnapshotCache::at_path(&path).load(), None);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_snapshot_holds_no_token() {
        let path = temp_path();
        SnapshotCache::at_path(&path).save(&user());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("token"));

        std::fs::remove_file(&path).unwrap();
    }
}
