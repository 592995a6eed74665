//! Clock-driven slide arithmetic
//!
//! Everything here is a pure function of wall-clock milliseconds and manifest
//! parameters. Two frames that agree on the time and the manifest compute the
//! same slide without talking to each other.

use std::collections::HashSet;

use core_manifest::{Manifest, PlaybackMode};

/// `floor(now / slide) mod n`
pub fn inventory_index(now_ms: i64, slide_ms: i64, n: usize) -> Option<usize> {
    if n == 0 || slide_ms <= 0 {
        return None;
    }
    let slot = now_ms.div_euclid(slide_ms);
    Some(slot.rem_euclid(n as i64) as usize)
}

/// `floor((now - start) / slide) mod n`, falling back to the inventory
/// formula before `start`
pub fn sync_index(now_ms: i64, start_ms: i64, slide_ms: i64, n: usize) -> Option<usize> {
    if now_ms < start_ms {
        return inventory_index(now_ms, slide_ms, n);
    }
    inventory_index(now_ms - start_ms, slide_ms, n)
}

/// Start of the shared sequence when sync mode applies to `manifest`
fn sync_origin(manifest: &Manifest, now_ms: i64) -> Option<i64> {
    if manifest.mode != PlaybackMode::Sync {
        return None;
    }
    manifest
        .start_ms()
        .filter(|start| *start > 0 && now_ms >= *start)
}

/// Index of the slide due at `now_ms` for a play order of length `n`
pub fn scheduled_index(manifest: &Manifest, now_ms: i64, n: usize) -> Option<usize> {
    let slide_ms = manifest.slide_ms();
    match sync_origin(manifest, now_ms) {
        Some(start_ms) => sync_index(now_ms, start_ms, slide_ms, n),
        None => inventory_index(now_ms, slide_ms, n),
    }
}

/// `ceil(now / slide) * slide - now`, never zero: on an exact boundary the
/// next one is a full slide away.
pub fn ms_until_next_boundary(now_ms: i64, slide_ms: i64) -> i64 {
    if slide_ms <= 0 {
        return 0;
    }
    match now_ms.rem_euclid(slide_ms) {
        0 => slide_ms,
        into_slide => slide_ms - into_slide,
    }
}

/// Delay until the slide for `manifest` next changes. In sync mode the
/// boundaries are counted from the start epoch, and a start epoch still
/// ahead is itself a change.
pub fn next_change_in_ms(manifest: &Manifest, now_ms: i64) -> i64 {
    let slide_ms = manifest.slide_ms();
    if let Some(origin) = sync_origin(manifest, now_ms) {
        return ms_until_next_boundary(now_ms - origin, slide_ms);
    }

    let until_boundary = ms_until_next_boundary(now_ms, slide_ms);
    match upcoming_sync_start(manifest, now_ms) {
        Some(start_ms) => until_boundary.min(start_ms - now_ms),
        None => until_boundary,
    }
}

fn upcoming_sync_start(manifest: &Manifest, now_ms: i64) -> Option<i64> {
    if manifest.mode != PlaybackMode::Sync {
        return None;
    }
    manifest.start_ms().filter(|start| *start > now_ms)
}

/// Manifest order restricted to cached ids. When nothing overlaps (or there
/// is no manifest yet) every cached id plays, sorted.
pub fn play_order(manifest: Option<&Manifest>, cached_ids: &[String]) -> Vec<String> {
    let cached: HashSet<&str> = cached_ids.iter().map(String::as_str).collect();

    let ordered: Vec<String> = manifest
        .map(|m| {
            m.ids()
                .filter(|id| cached.contains(id))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if !ordered.is_empty() {
        return ordered;
    }

    let mut fallback = cached_ids.to_vec();
    fallback.sort();
    fallback.dedup();
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_manifest::PhotoRef;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn manifest_of(raw: &[&str]) -> Manifest {
        Manifest::new(
            "v1",
            raw.iter()
                .map(|id| PhotoRef::new(*id, format!("https://cdn/{}", id)))
                .collect(),
        )
    }

    #[test]
    fn test_inventory_hourly_slide() {
        // 7,200,000 ms is the start of the third hour
        assert_eq!(inventory_index(7_200_000, 3_600_000, 3), Some(2));
        assert_eq!(inventory_index(7_199_999, 3_600_000, 3), Some(1));
        assert_eq!(inventory_index(10_800_000, 3_600_000, 3), Some(0));
    }

    #[test]
    fn test_index_always_in_bounds() {
        for n in 1..7 {
            for now in (-50_000..50_000).step_by(997) {
                let idx = inventory_index(now, 1_000, n).unwrap();
                assert!(idx < n);
                let idx = sync_index(now, 3_333, 1_000, n).unwrap();
                assert!(idx < n);
            }
        }
    }

    #[test]
    fn test_empty_or_degenerate_has_no_index() {
        assert_eq!(inventory_index(5, 1_000, 0), None);
        assert_eq!(inventory_index(5, 0, 3), None);
    }

    #[test]
    fn test_sync_counts_from_start() {
        let start = 1_000_000;
        assert_eq!(sync_index(start, start, 10_000, 4), Some(0));
        assert_eq!(sync_index(start + 25_000, start, 10_000, 4), Some(2));
        assert_eq!(sync_index(start + 45_000, start, 10_000, 4), Some(0));
    }

    #[test]
    fn test_sync_before_start_uses_inventory() {
        assert_eq!(
            sync_index(25_000, 1_000_000, 10_000, 4),
            inventory_index(25_000, 10_000, 4)
        );
    }

    #[test]
    fn test_frames_agree_on_the_slide() {
        let manifest = manifest_of(&["a", "b", "c", "d", "e"])
            .with_mode(PlaybackMode::Sync)
            .with_start_epoch(1_714_564_800)
            .with_slide_seconds(90);
        let now = 1_714_600_000_123;

        let frame_one = scheduled_index(&manifest.clone(), now, 5);
        let frame_two = scheduled_index(&manifest, now, 5);
        assert_eq!(frame_one, frame_two);
        assert_eq!(frame_one, sync_index(now, 1_714_564_800_000, 90_000, 5));
    }

    #[test]
    fn test_scheduled_index_respects_mode() {
        let inventory = manifest_of(&["a", "b", "c"]).with_start_epoch(5);
        assert_eq!(
            scheduled_index(&inventory, 7_200_000, 3),
            inventory_index(7_200_000, 3_600_000, 3)
        );

        let sync = inventory.clone().with_mode(PlaybackMode::Sync);
        assert_eq!(
            scheduled_index(&sync, 7_200_000, 3),
            sync_index(7_200_000, 5_000, 3_600_000, 3)
        );
    }

    #[test]
    fn test_boundary_never_zero() {
        assert_eq!(ms_until_next_boundary(7_200_000, 3_600_000), 3_600_000);
        assert_eq!(ms_until_next_boundary(7_200_001, 3_600_000), 3_599_999);
        assert_eq!(ms_until_next_boundary(1, 1_000), 999);
    }

    #[test]
    fn test_next_change_in_sync_mode_uses_start_offset() {
        let manifest = manifest_of(&["a"])
            .with_mode(PlaybackMode::Sync)
            .with_start_epoch(100)
            .with_slide_seconds(60);

        // start = 100,000 ms; boundaries at 160,000, 220,000, ...
        assert_eq!(next_change_in_ms(&manifest, 150_000), 10_000);
        assert_eq!(next_change_in_ms(&manifest, 160_000), 60_000);
    }

    #[test]
    fn test_next_change_before_sync_start_wakes_at_start() {
        let manifest = manifest_of(&["a", "b", "c"])
            .with_mode(PlaybackMode::Sync)
            .with_start_epoch(5_400)
            .with_slide_seconds(3_600);

        // The start lands before the next hourly boundary
        assert_eq!(next_change_in_ms(&manifest, 3_700_000), 1_700_000);
        assert_eq!(scheduled_index(&manifest, 3_700_000, 3), Some(1));
        assert_eq!(scheduled_index(&manifest, 5_400_000, 3), Some(0));

        // A far start does not delay the inventory boundary
        assert_eq!(next_change_in_ms(&manifest, 100_000), 3_500_000);

        let inventory = manifest.clone().with_mode(PlaybackMode::Inventory);
        assert_eq!(next_change_in_ms(&inventory, 3_700_000), 3_500_000);
    }

    #[test]
    fn test_play_order_follows_manifest() {
        let manifest = manifest_of(&["c", "a", "x", "b"]);
        let cached = ids(&["a", "b", "c", "stray"]);

        assert_eq!(play_order(Some(&manifest), &cached), ids(&["c", "a", "b"]));
    }

    #[test]
    fn test_play_order_falls_back_to_cache() {
        let manifest = manifest_of(&["x", "y"]);
        let cached = ids(&["b", "a"]);

        assert_eq!(play_order(Some(&manifest), &cached), ids(&["a", "b"]));
        assert_eq!(play_order(None, &cached), ids(&["a", "b"]));
        assert!(play_order(None, &[]).is_empty());
    }
}
