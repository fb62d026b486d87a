use log::debug;

use crate::value::{PreciseValue, Tag};

// One slot per representable signed 12-bit screen coordinate pair.
const COORD_MIN: i16 = -0x800;
const COORD_MAX: i16 = 0x7FF;
const TABLE_DIM: usize = 0x800 * 2;
const TABLE_LEN: usize = TABLE_DIM * TABLE_DIM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheMode {
    Uninitialized,
    Write,
    Read,
    Failed,
}

/// Positional fallback store for screen vertices.
///
/// When a vertex's direct shadow has been lost (the value travelled
/// through an untracked path on its way to the GPU), the renderer can
/// still recover precision by looking up the native screen position the
/// GTE produced. The table is dense, keyed by clipped screen coordinates,
/// and runs in alternating write (GTE) and read (renderer) sessions.
///
/// A session is bounded by the sequence numbers of its first and last
/// vertex; the counters tolerate the 32-bit sequence wrapping. A push
/// with no vertex attached signals that tracking broke down, after which
/// every lookup misses until the cache is explicitly reset.
pub struct VertexCache {
    table: Vec<PreciseValue>,
    session_base: u32,
    session_last: u32,
    mode: CacheMode,
}

impl VertexCache {
    pub fn new() -> Self {
        VertexCache {
            // Deferred: the table is sized for the full coordinate space
            // and only materializes once a session actually starts.
            table: Vec::new(),
            session_base: 0,
            session_last: 0,
            mode: CacheMode::Uninitialized,
        }
    }

    /// Back to the pristine state; the table is wiped again on the next
    /// session start.
    pub fn reset(&mut self) {
        self.session_base = 0;
        self.session_last = 0;
        self.mode = CacheMode::Uninitialized;
    }

    /// Record `vertex` at its native screen position. `None` reports a
    /// tracking failure and poisons the cache until [`reset`](Self::reset).
    pub fn cache_vertex(&mut self, sx: i16, sy: i16, vertex: Option<&PreciseValue>) {
        let Some(vertex) = vertex else {
            if self.mode != CacheMode::Failed {
                debug!("vertex cache entering failed mode");
            }
            self.mode = CacheMode::Failed;
            return;
        };

        if self.mode == CacheMode::Failed {
            return;
        }

        if self.mode != CacheMode::Write {
            if self.mode == CacheMode::Uninitialized {
                self.clear_table();
            }
            // First vertex of a write session, nominally one frame.
            self.mode = CacheMode::Write;
            self.session_base = vertex.seq;
        }
        self.session_last = vertex.seq;

        if let Some(slot) = Self::slot(sx, sy) {
            let entry = &mut self.table[slot];
            *entry = *vertex;
            entry.tag = Tag::FRESH;
        }
    }

    /// Copy out the entry at a native screen position, or `None` when the
    /// position is off the table or the cache has failed. A returned
    /// entry is only authoritative if it is tagged [`Tag::FRESH`];
    /// anything else is leftover table state.
    pub fn cached_vertex(&mut self, sx: i16, sy: i16) -> Option<PreciseValue> {
        if self.mode != CacheMode::Read {
            if self.mode == CacheMode::Failed {
                return None;
            }
            if self.mode == CacheMode::Uninitialized {
                self.clear_table();
            }
            self.mode = CacheMode::Read;
        }

        Self::slot(sx, sy).map(|i| self.table[i])
    }

    /// Whether a sequence stamp falls inside the current session range,
    /// with the base/last pair interpreted modularly so a wrapped 32-bit
    /// counter still compares correctly.
    ///
    /// The read path deliberately does not consult this; any FRESH entry
    /// is trusted regardless of recency. Kept as a separate, testable
    /// predicate for the day that trade-off gets revisited.
    pub fn is_in_session(&self, seq: u32) -> bool {
        if self.session_last >= self.session_base {
            // No wrap in this session.
            return seq >= self.session_base;
        }

        // Counter wrapped: stamps at or above the base are pre-wrap,
        // stamps at or below the last are post-wrap.
        seq >= self.session_base || seq <= self.session_last
    }

    fn slot(sx: i16, sy: i16) -> Option<usize> {
        if (COORD_MIN..=COORD_MAX).contains(&sx) && (COORD_MIN..=COORD_MAX).contains(&sy) {
            let row = (i32::from(sy) + 0x800) as usize;
            let col = (i32::from(sx) + 0x800) as usize;
            Some(row * TABLE_DIM + col)
        } else {
            None
        }
    }

    fn clear_table(&mut self) {
        if self.table.is_empty() {
            self.table = vec![PreciseValue::default(); TABLE_LEN];
        } else {
            self.table.fill(PreciseValue::default());
        }
    }
}
