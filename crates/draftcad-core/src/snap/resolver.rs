//! Snap resolution: merge every collector's candidates and pick one winner.

use super::{
    SnapCandidate, SnapResult, SnapSettings, SnapType, collect, collect_angle, collect_grid,
    collect_intersections, collect_parallel,
};
use crate::geometry::{ObjectId, PlacedObject};
use glam::DVec3;
use std::cmp::Ordering;
use std::collections::HashMap;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Per-event context for a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnapQuery {
    /// Previously accepted point (angle, perpendicular and parallel snaps).
    pub reference: Option<DVec3>,
    /// Object being edited; never snapped to.
    pub active: Option<ObjectId>,
    /// Whether the angle collector runs. Ortho/polar locks turn it off.
    pub angle_snap: bool,
    /// Restrict resolution to the grid.
    pub grid_only: bool,
}

impl SnapQuery {
    /// Query with angle snapping on.
    pub fn new(reference: Option<DVec3>, active: Option<ObjectId>) -> Self {
        Self {
            reference,
            active,
            angle_snap: true,
            grid_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    cursor: [u64; 3],
    reference: Option<[u64; 3]>,
    active: Option<ObjectId>,
    object_count: usize,
    revision: u64,
    angle_snap: bool,
    grid_only: bool,
}

fn bits(p: DVec3) -> [u64; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Resolve results keyed by query; the whole map expires together.
#[derive(Debug, Default)]
struct SnapCache {
    timestamp: Option<Instant>,
    entries: HashMap<CacheKey, SnapResult>,
}

impl SnapCache {
    fn expire(&mut self, now: Instant, ttl: Duration) {
        if let Some(ts) = self.timestamp {
            if now.duration_since(ts) >= ttl {
                self.clear();
            }
        }
    }

    fn get(&self, key: &CacheKey) -> Option<SnapResult> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, result: SnapResult, now: Instant) {
        self.timestamp.get_or_insert(now);
        self.entries.insert(key, result);
    }

    fn clear(&mut self) {
        self.timestamp = None;
        self.entries.clear();
    }
}

/// Rank: higher priority first, then nearer.
fn rank(a: &SnapCandidate, b: &SnapCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.distance.total_cmp(&b.distance))
}

/// Picks the winning snap point for a cursor position.
#[derive(Debug, Default)]
pub struct SnapResolver {
    settings: SnapSettings,
    revision: u64,
    cache: SnapCache,
}

impl SnapResolver {
    /// Create a resolver with an empty cache.
    pub fn new(settings: SnapSettings) -> Self {
        Self {
            settings,
            revision: 0,
            cache: SnapCache::default(),
        }
    }

    /// Get the current settings.
    pub fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    /// Replace the settings. Cached results are dropped.
    pub fn set_settings(&mut self, settings: SnapSettings) {
        self.settings = settings;
        self.revision = self.revision.wrapping_add(1);
        self.invalidate();
    }

    /// Drop cached results (e.g. after a geometry edit).
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Number of cached results currently held.
    pub fn cached_entries(&self) -> usize {
        self.cache.entries.len()
    }

    /// Resolve with default query options.
    pub fn resolve(
        &mut self,
        cursor: DVec3,
        objects: &[&dyn PlacedObject],
        reference: Option<DVec3>,
        active: Option<ObjectId>,
    ) -> SnapResult {
        self.resolve_query(cursor, objects, &SnapQuery::new(reference, active))
    }

    /// Resolve the cursor against `objects`.
    ///
    /// Returns the best candidate within the activation distance, else the
    /// grid candidate when grid snapping is on, else the cursor unchanged.
    pub fn resolve_query(
        &mut self,
        cursor: DVec3,
        objects: &[&dyn PlacedObject],
        query: &SnapQuery,
    ) -> SnapResult {
        if !self.settings.enabled || !cursor.is_finite() {
            return SnapResult::none(cursor);
        }

        let ttl = Duration::from_millis(self.settings.cache_ttl_ms);
        let caching = !ttl.is_zero();
        let key = CacheKey {
            cursor: bits(cursor),
            reference: query.reference.map(bits),
            active: query.active,
            object_count: objects.len(),
            revision: self.revision,
            angle_snap: query.angle_snap,
            grid_only: query.grid_only,
        };
        let now = Instant::now();
        if caching {
            self.cache.expire(now, ttl);
            if let Some(hit) = self.cache.get(&key) {
                return hit;
            }
        }

        let result = self.compute(cursor, objects, query);
        if caching {
            self.cache.insert(key, result.clone(), now);
        }
        result
    }

    fn compute(&self, cursor: DVec3, objects: &[&dyn PlacedObject], query: &SnapQuery) -> SnapResult {
        let candidates = self.candidates(cursor, objects, query);
        let activation = self.settings.activation_distance;
        if let Some(best) = candidates
            .iter()
            .filter(|c| c.distance <= activation)
            .min_by(|a, b| rank(a, b))
        {
            log::debug!(
                "Snapped to {} ({}) at distance {:.4}",
                best.snap_type.label(),
                best.feature,
                best.distance
            );
            return SnapResult::from_candidate(best);
        }
        match candidates.iter().find(|c| c.snap_type == SnapType::Grid) {
            Some(grid) => SnapResult::from_candidate(grid),
            None => SnapResult::none(cursor),
        }
    }

    /// Every candidate for the cursor, best first. Distance is not filtered.
    pub fn candidates(
        &self,
        cursor: DVec3,
        objects: &[&dyn PlacedObject],
        query: &SnapQuery,
    ) -> Vec<SnapCandidate> {
        let settings = &self.settings;
        let mut out = Vec::new();
        if settings.is_enabled(SnapType::Grid) {
            out.push(collect_grid(cursor, settings));
        }
        if query.grid_only {
            return out;
        }

        if let Some(reference) = query.reference {
            if query.angle_snap && settings.is_enabled(SnapType::Angle) {
                out.extend(collect_angle(cursor, reference, settings));
            }
        }

        let mut visible: Vec<&dyn PlacedObject> = Vec::with_capacity(objects.len());
        for object in objects.iter().copied() {
            if Some(object.id()) == query.active {
                continue;
            }
            match collect(cursor, object, settings, query.reference) {
                Ok(found) => {
                    out.extend(found);
                    visible.push(object);
                }
                Err(e) => log::warn!("Skipping object {} while snapping: {}", object.id(), e),
            }
        }

        if settings.is_enabled(SnapType::Intersection) {
            out.extend(collect_intersections(cursor, &visible, settings));
        }
        if let Some(reference) = query.reference {
            if settings.is_enabled(SnapType::Parallel) {
                out.extend(collect_parallel(cursor, reference, &visible, settings));
            }
        }

        out.sort_by(rank);
        out
    }
}
