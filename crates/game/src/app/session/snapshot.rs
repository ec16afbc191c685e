//! Suspend/resume protocol over the preference store.
//!
//! A snapshot is exactly the five keys below. It is consumed by the first load of the
//! level it names and never applied piecemeal: any missing or mistyped required key makes
//! the whole snapshot absent.

use engine::{PrefValue, PrefsStore, Vec3};
use tracing::{debug, info, warn};

pub(crate) const LAST_ACTIVE_LEVEL_KEY: &str = "lastActiveLevel";
pub(crate) const PLAYER_POS_X_KEY: &str = "playerPosX";
pub(crate) const PLAYER_POS_Y_KEY: &str = "playerPosY";
pub(crate) const PLAYER_POS_Z_KEY: &str = "playerPosZ";
pub(crate) const PLAYER_HEALTH_KEY: &str = "playerHealth";

pub(crate) const SNAPSHOT_KEYS: [&str; 5] = [
    LAST_ACTIVE_LEVEL_KEY,
    PLAYER_POS_X_KEY,
    PLAYER_POS_Y_KEY,
    PLAYER_POS_Z_KEY,
    PLAYER_HEALTH_KEY,
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionSnapshot {
    pub(crate) level_name: String,
    pub(crate) position: Vec3,
    pub(crate) health: Option<i32>,
}

/// Writes every snapshot key and flushes. A flush failure is logged; the in-process
/// store still holds the values.
pub(crate) fn write_snapshot(store: &mut dyn PrefsStore, snapshot: &SessionSnapshot) {
    store.set(
        LAST_ACTIVE_LEVEL_KEY,
        PrefValue::Str(snapshot.level_name.clone()),
    );
    store.set(PLAYER_POS_X_KEY, PrefValue::Float(snapshot.position.x));
    store.set(PLAYER_POS_Y_KEY, PrefValue::Float(snapshot.position.y));
    store.set(PLAYER_POS_Z_KEY, PrefValue::Float(snapshot.position.z));
    match snapshot.health {
        Some(health) => store.set(PLAYER_HEALTH_KEY, PrefValue::Int(health)),
        None => store.delete(PLAYER_HEALTH_KEY),
    }
    flush_or_warn(store, "snapshot_write");
    info!(
        level = %snapshot.level_name,
        position = %snapshot.position,
        health = ?snapshot.health,
        "snapshot_written"
    );
}

/// Returns the stored snapshot for `current_level` and deletes it. Any other level, or an
/// incomplete key set, leaves the store untouched.
pub(crate) fn try_resume(
    store: &mut dyn PrefsStore,
    current_level: &str,
) -> Option<SessionSnapshot> {
    let stored_level = store.get_str(LAST_ACTIVE_LEVEL_KEY)?;
    if stored_level != current_level {
        debug!(
            stored_level = %stored_level,
            current_level,
            "snapshot_for_other_level"
        );
        return None;
    }

    let (Some(x), Some(y), Some(z)) = (
        store.get_f64(PLAYER_POS_X_KEY),
        store.get_f64(PLAYER_POS_Y_KEY),
        store.get_f64(PLAYER_POS_Z_KEY),
    ) else {
        debug!(current_level, "snapshot_incomplete; treating as absent");
        return None;
    };
    let health = if store.has_key(PLAYER_HEALTH_KEY) {
        let Some(health) = store.get_i32(PLAYER_HEALTH_KEY) else {
            debug!(current_level, "snapshot_health_mistyped; treating as absent");
            return None;
        };
        Some(health)
    } else {
        None
    };

    let snapshot = SessionSnapshot {
        level_name: stored_level,
        position: Vec3::new(x, y, z),
        health,
    };
    delete_keys(store);
    flush_or_warn(store, "snapshot_consume");
    info!(
        level = %snapshot.level_name,
        position = %snapshot.position,
        health = ?snapshot.health,
        "snapshot_consumed"
    );
    Some(snapshot)
}

pub(crate) fn clear(store: &mut dyn PrefsStore) {
    delete_keys(store);
    flush_or_warn(store, "snapshot_clear");
    info!("snapshot_cleared");
}

pub(crate) fn stored_level(store: &dyn PrefsStore) -> Option<String> {
    store.get_str(LAST_ACTIVE_LEVEL_KEY)
}

fn delete_keys(store: &mut dyn PrefsStore) {
    for key in SNAPSHOT_KEYS {
        store.delete(key);
    }
}

fn flush_or_warn(store: &mut dyn PrefsStore, context: &'static str) {
    if let Err(error) = store.flush() {
        warn!(context, error = %error, "prefs_flush_failed");
    }
}

#[cfg(test)]
mod tests {
    use engine::MemoryPrefs;

    use super::*;

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            level_name: "Scene2".to_string(),
            position: Vec3::new(3.0, 4.0, 0.0),
            health: Some(2),
        }
    }

    #[test]
    fn resume_returns_written_snapshot_exactly_once() {
        let mut store = MemoryPrefs::new();
        write_snapshot(&mut store, &sample());

        assert_eq!(try_resume(&mut store, "Scene2"), Some(sample()));
        assert_eq!(try_resume(&mut store, "Scene2"), None);
        for key in SNAPSHOT_KEYS {
            assert!(!store.has_key(key), "{key} left behind");
        }
    }

    #[test]
    fn write_is_durable_only_after_flush() {
        let mut store = MemoryPrefs::new();
        write_snapshot(&mut store, &sample());

        let reopened = store.reopen();
        assert_eq!(
            reopened.get_str(LAST_ACTIVE_LEVEL_KEY).as_deref(),
            Some("Scene2")
        );
        assert_eq!(reopened.get_i32(PLAYER_HEALTH_KEY), Some(2));
    }

    #[test]
    fn resume_for_other_level_leaves_store_untouched() {
        let mut store = MemoryPrefs::new();
        write_snapshot(&mut store, &sample());
        let flushes = store.flush_count();

        assert_eq!(try_resume(&mut store, "Scene1"), None);
        assert_eq!(store.keys().count(), 5);
        assert_eq!(store.flush_count(), flushes);
    }

    #[test]
    fn partial_key_set_is_absent() {
        let mut store = MemoryPrefs::new();
        store.set(LAST_ACTIVE_LEVEL_KEY, PrefValue::Str("Scene1".to_string()));
        store.set(PLAYER_POS_X_KEY, PrefValue::Float(5.0));

        assert_eq!(try_resume(&mut store, "Scene1"), None);
        assert!(store.has_key(LAST_ACTIVE_LEVEL_KEY));
    }

    #[test]
    fn mistyped_health_makes_snapshot_absent() {
        let mut store = MemoryPrefs::new();
        write_snapshot(&mut store, &sample());
        store.set(PLAYER_HEALTH_KEY, PrefValue::Str("two".to_string()));

        assert_eq!(try_resume(&mut store, "Scene2"), None);
    }

    #[test]
    fn missing_health_is_allowed() {
        let mut store = MemoryPrefs::new();
        let snapshot = SessionSnapshot {
            health: None,
            ..sample()
        };
        write_snapshot(&mut store, &snapshot);

        assert_eq!(try_resume(&mut store, "Scene2"), Some(snapshot));
    }

    #[test]
    fn clear_removes_every_key_durably() {
        let mut store = MemoryPrefs::new();
        write_snapshot(&mut store, &sample());
        clear(&mut store);

        assert!(store.is_empty());
        assert!(store.reopen().is_empty());
        assert_eq!(stored_level(&store), None);
    }
}
