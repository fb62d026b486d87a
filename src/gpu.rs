use log::debug;

use crate::debug_flags;
use crate::memory::ShadowMemory;
use crate::value::{high_half, low_half, Tag, Validity};
use crate::vertex_cache::VertexCache;

/// One recovered screen vertex, ready for triangle setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveredVertex {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    /// Whether `w` is trustworthy enough for perspective correction.
    pub w_valid: bool,
}

/// Wrap a coordinate's integer part through the hardware's signed 16-bit
/// screen range while keeping the sub-pixel fraction intact.
pub fn truncate16(p: f32) -> f32 {
    let int_part = p as i32;
    let fraction = p - int_part as f32;
    f32::from(int_part as i16) + fraction
}

/// Recover precise screen coordinates for one vertex.
///
/// Tried in order: the direct shadow of the address the vertex was read
/// from, the positional cache keyed by the native screen position packed
/// in `word`, and finally the native integer coordinates themselves.
///
/// A cache hit never reports a usable `w`; the cached depth is too easy
/// to mispair with the wrong vertex, and a bad perspective divide is far
/// worse than falling back to affine interpolation.
#[allow(clippy::too_many_arguments)]
pub fn recover_vertex(
    mem: &ShadowMemory,
    cache: &mut VertexCache,
    addr: u32,
    word: u32,
    native_x: i32,
    native_y: i32,
    offs_x: i32,
    offs_y: i32,
) -> RecoveredVertex {
    let direct = mem
        .get(addr)
        .filter(|v| v.validity.contains(Validity::XY) && v.raw == word)
        .map(|v| RecoveredVertex {
            x: truncate16(v.x) + offs_x as f32,
            y: truncate16(v.y) + offs_y as f32,
            w: v.z / 32768.0,
            w_valid: v.validity.contains(Validity::Z),
        });

    let recovered = direct.or_else(|| {
        cache
            .cached_vertex(low_half(word), high_half(word))
            .filter(|v| v.tag == Tag::FRESH)
            .map(|v| RecoveredVertex {
                x: truncate16(v.x) + offs_x as f32,
                y: truncate16(v.y) + offs_y as f32,
                w: v.z / 32768.0,
                w_valid: false,
            })
    });

    match recovered {
        Some(vertex) => {
            if debug_flags::trace_recovery()
                && ((vertex.x - native_x as f32).abs() > 2.0
                    || (vertex.y - native_y as f32).abs() > 2.0)
            {
                debug!(
                    "recovered vertex diverges from native: ({native_x}, {native_y}) -> ({:.2}, {:.2})",
                    vertex.x, vertex.y
                );
            }
            vertex
        }
        None => RecoveredVertex {
            x: native_x as f32,
            y: native_y as f32,
            w: 1.0,
            w_valid: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PreciseValue;

    #[test]
    fn truncate16_wraps_only_the_integer_part() {
        assert_eq!(truncate16(10.5), 10.5);
        assert_eq!(truncate16(-3.25), -3.25);
        assert_eq!(truncate16(0.0), 0.0);

        // 40000 wraps to 40000 - 65536 = -25536; the fraction rides on top.
        assert_eq!(truncate16(40000.25), -25535.75);
        assert_eq!(truncate16(-40000.5), 25535.5);
    }

    #[test]
    fn direct_shadow_wins_and_carries_perspective() {
        let mut mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let mut v = PreciseValue::default();
        v.set(0x00FF_0010);
        v.x = 10.5;
        v.y = -3.25;
        v.z = 200.0;
        v.validity = Validity::ALL;
        mem.write_shadow(&v, 0x8001_0000);

        let out = recover_vertex(&mem, &mut cache, 0x8001_0000, 0x00FF_0010, 16, 255, 0, 0);
        assert_eq!(out.x, 10.5);
        assert_eq!(out.y, -3.25);
        assert_eq!(out.w, 200.0 / 32768.0);
        assert!(out.w_valid);
    }

    #[test]
    fn direct_shadow_without_depth_reports_w_unusable() {
        let mut mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let mut v = PreciseValue::default();
        v.set(0x00FF_0010);
        mem.write_shadow(&v, 0x8001_0000);

        let out = recover_vertex(&mem, &mut cache, 0x8001_0000, 0x00FF_0010, 16, 255, 0, 0);
        assert_eq!(out.x, 16.0);
        assert!(!out.w_valid);
    }

    #[test]
    fn stale_raw_word_falls_through_to_the_cache() {
        let mut mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let mut shadow = PreciseValue::default();
        shadow.set(0xAAAA_BBBB);
        mem.write_shadow(&shadow, 0x8001_0000);

        let mut cached = PreciseValue::default();
        cached.x = 10.5;
        cached.y = -3.25;
        cached.z = 200.0;
        cached.validity = Validity::ALL;
        cache.cache_vertex(16, 255, Some(&cached));

        let out = recover_vertex(&mem, &mut cache, 0x8001_0000, 0x00FF_0010, 16, 255, 0, 0);
        assert_eq!(out.x, 10.5);
        assert_eq!(out.y, -3.25);
        assert_eq!(out.w, 200.0 / 32768.0);
        assert!(!out.w_valid);
    }

    #[test]
    fn untracked_address_with_cache_hit_uses_the_cache() {
        let mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let mut cached = PreciseValue::default();
        cached.x = 10.5;
        cached.y = -3.25;
        cached.z = 200.0;
        cache.cache_vertex(16, 255, Some(&cached));

        let out = recover_vertex(&mem, &mut cache, 0xBFC0_0000, 0x00FF_0010, 16, 255, 0, 0);
        assert_eq!(out.x, 10.5);
        assert!(!out.w_valid);
    }

    #[test]
    fn nothing_found_falls_back_to_native() {
        let mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let out = recover_vertex(&mem, &mut cache, 0xBFC0_0000, 0x00FF_0010, 16, 255, 0, 0);
        assert_eq!(out.x, 16.0);
        assert_eq!(out.y, 255.0);
        assert_eq!(out.w, 1.0);
        assert!(!out.w_valid);
    }

    #[test]
    fn draw_offsets_are_applied_after_truncation() {
        let mut mem = ShadowMemory::new();
        let mut cache = VertexCache::new();

        let mut v = PreciseValue::default();
        v.set(0x00FF_0010);
        v.x = 10.5;
        v.y = -3.25;
        mem.write_shadow(&v, 0x8001_0000);

        let out = recover_vertex(
            &mem,
            &mut cache,
            0x8001_0000,
            0x00FF_0010,
            16,
            255,
            100,
            -50,
        );
        assert_eq!(out.x, 110.5);
        assert_eq!(out.y, -53.25);
    }
}
