//! Conversion of the legacy two-document layout.
//!
//! Older stores kept nutrition in a separate document keyed
//! `nutrition_<food>`. Migration folds each of those into the unified
//! document for `<food>`, or re-keys it in place when there is none.
//!
//! [`migrate`] only builds the converted store. Persisting it and swapping it
//! in is left to the caller, so a failure at any point leaves the live store
//! as it was.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{LEGACY_NUTRITION_PREFIX, is_legacy_key, normalize_key};
use crate::error::{CacheError, Result};
use crate::store::CacheStore;

/// What a migration run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Legacy documents folded into an existing unified document.
    pub merged: usize,

    /// Legacy documents re-keyed in place.
    pub promoted: usize,

    /// Legacy documents with nothing worth keeping.
    pub dropped: usize,
}

impl MigrationReport {
    /// Number of legacy documents handled.
    pub fn total(&self) -> usize {
        self.merged + self.promoted + self.dropped
    }
}

/// Check if any key still uses the legacy layout.
pub fn needs_migration(store: &CacheStore) -> bool {
    store.keys().any(is_legacy_key)
}

/// Convert a copy of `store` to the unified layout.
///
/// Legacy keys are processed in sorted order, so a food promoted earlier in
/// the run is a merge target for later ones.
pub fn migrate(store: &CacheStore) -> Result<(CacheStore, MigrationReport)> {
    let mut migrated = store.clone();
    let mut report = MigrationReport::default();

    let mut legacy: Vec<String> = store
        .keys()
        .filter(|key| is_legacy_key(key))
        .map(str::to_string)
        .collect();
    legacy.sort();

    for legacy_key in legacy {
        let Some(document) = migrated.get(&legacy_key).cloned() else {
            continue;
        };
        let food_key = normalize_key(
            legacy_key
                .strip_prefix(LEGACY_NUTRITION_PREFIX)
                .unwrap_or(&legacy_key),
        );

        if food_key.is_empty() {
            warn!("Dropping legacy document '{legacy_key}' with no food name");
            migrated.remove(&legacy_key);
            report.dropped += 1;
            continue;
        }

        if let Some(target) = migrated.get(&food_key) {
            let mut target = target.clone();
            if let Some(nutrition) = document.nutrition {
                target.nutrition = Some(nutrition);
            }
            migrated
                .put(&food_key, target)
                .map_err(|e| CacheError::Migration(format!("{legacy_key}: {e}")))?;
            migrated.remove(&legacy_key);

            debug!("Merged '{legacy_key}' into '{food_key}'");
            report.merged += 1;
        } else if document.nutrition.is_some() {
            let slot = document.index_id;
            let mut promoted = document;
            promoted.recipe = None;
            migrated
                .put(&legacy_key, promoted)
                .and_then(|()| migrated.rename_slot(slot, food_key.clone()))
                .map_err(|e| CacheError::Migration(format!("{legacy_key}: {e}")))?;

            debug!("Promoted '{legacy_key}' to '{food_key}' at slot {slot}");
            report.promoted += 1;
        } else {
            warn!("Dropping legacy document '{legacy_key}' with no nutrition");
            migrated.remove(&legacy_key);
            report.dropped += 1;
        }
    }

    if needs_migration(&migrated) {
        return Err(CacheError::Migration(
            "legacy keys remain after conversion".to_string(),
        ));
    }

    info!(
        "Migration converted {} legacy documents ({} merged, {} promoted, {} dropped)",
        report.total(),
        report.merged,
        report.promoted,
        report.dropped
    );
    Ok((migrated, report))
}
