use crate::value::{with_high_half, with_low_half, PreciseValue, Validity};

// One precise value per 32-bit word, three equally sized regions laid out
// back to back. The region size is generous for the scratch pad and the
// register window but keeps every translated offset in bounds without a
// second range check.
const REGION_WORDS: usize = 0x20_0000 / 4;
const USER_BASE: usize = 0;
const SCRATCH_BASE: usize = REGION_WORDS;
const REGISTER_BASE: usize = 2 * REGION_WORDS;
const TOTAL_WORDS: usize = 3 * REGION_WORDS;

/* Physical memory map being replicated:

   0x0000_0000-0x007f_ffff   RAM, 2 MiB mirrored over the 8 MiB window
   0x1f80_0000-0x1f80_03ff   Scratch pad (1 KiB)
   0x1f80_1000-0x1f80_2fff   Hardware registers
   0x8000_0000-0x807f_ffff   RAM mirror (cached)
   0xa000_0000-0xa07f_ffff   RAM mirror (uncached)

   Everything else (BIOS, parallel port, cache control) is untracked. */

/// Map a CPU address onto a word index into the shadow store.
///
/// Total over all 32-bit inputs; addresses outside the tracked windows
/// return `None`.
pub fn translate_address(addr: u32) -> Option<usize> {
    match addr >> 24 {
        0x00 | 0x80 | 0xa0 => {
            let word = ((addr & 0x7F_FFFF) % 0x20_0000) >> 2;
            Some(USER_BASE + word as usize)
        }
        _ if addr >> 20 == 0x1f8 => {
            if (addr & 0xFFFF) >= 0x1000 {
                let word = ((addr & 0xFFFF) - 0x1000) >> 2;
                Some(REGISTER_BASE + word as usize)
            } else {
                let word = (addr & 0x3FF) >> 2;
                Some(SCRATCH_BASE + word as usize)
            }
        }
        _ => None,
    }
}

/// Shadow store mirroring every tracked 32-bit cell of the console's
/// address space. Allocated once, zeroed on reset, never resized.
pub struct ShadowMemory {
    cells: Vec<PreciseValue>,
    last_dma: Option<usize>,
}

impl ShadowMemory {
    pub fn new() -> Self {
        ShadowMemory {
            cells: vec![PreciseValue::default(); TOTAL_WORDS],
            last_dma: None,
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(PreciseValue::default());
        self.last_dma = None;
    }

    pub fn get(&self, addr: u32) -> Option<&PreciseValue> {
        translate_address(addr).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, addr: u32) -> Option<&mut PreciseValue> {
        translate_address(addr).map(move |i| &mut self.cells[i])
    }

    /// Copy-out read; a translation miss yields the invalid-address
    /// singleton instead of failing.
    pub fn read_shadow(&self, addr: u32) -> PreciseValue {
        self.get(addr)
            .copied()
            .unwrap_or(PreciseValue::INVALID_ADDRESS)
    }

    /// Full-word store; silently dropped on a translation miss.
    pub fn write_shadow(&mut self, value: &PreciseValue, addr: u32) {
        if let Some(cell) = self.get_mut(addr) {
            *cell = *value;
        }
    }

    /// Full-word load path: revalidate the cell against the word the CPU
    /// actually read, then hand back a copy.
    pub fn copy_validated(&mut self, addr: u32, word: u32) -> PreciseValue {
        match self.get_mut(addr) {
            Some(cell) => {
                cell.validate(word);
                *cell
            }
            None => PreciseValue::INVALID_ADDRESS,
        }
    }

    /// Half-word load path. `value` is the loaded half-word already
    /// extended to 32 bits the way the instruction extends it; only the
    /// addressed lane is compared, and only that lane's trust is revoked
    /// on mismatch.
    ///
    /// The returned value always carries the just-read half in `x`. The
    /// upper half of a 16-bit load is fully determined by the extension
    /// rule, so `y` is forced to `0` or `-1` and marked valid.
    pub fn copy_validated_half(&mut self, addr: u32, value: u32, sign: bool) -> PreciseValue {
        let Some(cell) = self.get_mut(addr) else {
            return PreciseValue::INVALID_ADDRESS;
        };

        let high = addr % 4 == 2;
        let half = value as u16;
        let (probe, mask) = if high {
            (u32::from(half) << 16, 0xFFFF_0000)
        } else {
            (u32::from(half), 0x0000_FFFF)
        };
        cell.mask_validate(probe, mask, Validity::half_lane(high));

        let mut out = *cell;
        if high {
            out.x = out.y;
            out.low_flags = out.high_flags;
            out.validity.set(Validity::X, out.validity.contains(Validity::Y));
        }

        out.y = if out.x < 0.0 && sign { -1.0 } else { 0.0 };
        out.high_flags = 0;
        out.raw = value;
        out.validity.insert(Validity::Y);
        out
    }

    /// Half-word store path: patch only the addressed lane of the
    /// destination, leaving the other lane's coordinate, trust and raw
    /// half untouched. Z is carried over only when the source vouches for
    /// it, and provenance tags accumulate across partial writes.
    pub fn write_shadow_half(&mut self, src: &PreciseValue, addr: u32) {
        let Some(dest) = self.get_mut(addr) else {
            return;
        };

        if addr % 4 == 2 {
            dest.y = src.x;
            dest.high_flags = src.low_flags;
            dest.validity
                .set(Validity::Y, src.validity.contains(Validity::X));
            dest.raw = with_high_half(dest.raw, src.raw as u16);
        } else {
            dest.x = src.x;
            dest.low_flags = src.low_flags;
            dest.validity
                .set(Validity::X, src.validity.contains(Validity::X));
            dest.raw = with_low_half(dest.raw, src.raw as u16);
        }

        if src.validity.contains(Validity::Z) {
            dest.z = src.z;
            dest.validity.insert(Validity::Z);
        }

        dest.tag.insert(src.tag);
    }

    /// Record the target of the most recent DMA transfer. The DMA unit
    /// reports every transfer here so later heuristics can tell DMA-sourced
    /// cells apart from CPU stores.
    pub fn set_last_dma(&mut self, addr: u32) {
        self.last_dma = translate_address(addr);
    }

    pub fn last_dma(&self) -> Option<usize> {
        self.last_dma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Tag;

    #[test]
    fn translation_covers_the_documented_map() {
        // 2 MiB fold inside the 8 MiB window, word indexed.
        assert_eq!(translate_address(0x8001_0000), Some(0x4000));
        assert_eq!(translate_address(0x0020_0000), Some(0));

        // All three RAM windows alias the same cells.
        assert_eq!(
            translate_address(0x0001_0000),
            translate_address(0x8001_0000)
        );
        assert_eq!(
            translate_address(0xA001_0000),
            translate_address(0x8001_0000)
        );

        // Scratch pad and hardware registers.
        assert_eq!(translate_address(0x1F80_0000), Some(SCRATCH_BASE));
        assert_eq!(translate_address(0x1F80_03FC), Some(SCRATCH_BASE + 0xFF));
        assert_eq!(
            translate_address(0x1F80_1810),
            Some(REGISTER_BASE + (0x810 >> 2))
        );

        // BIOS, parallel port and cache control are untracked.
        assert_eq!(translate_address(0x1FC0_0000), None);
        assert_eq!(translate_address(0xBFC0_0000), None);
        assert_eq!(translate_address(0x1F00_0000), None);
        assert_eq!(translate_address(0xFFFE_0130), None);
    }

    #[test]
    fn full_word_round_trip_preserves_trust() {
        let mut mem = ShadowMemory::new();
        let mut v = PreciseValue::default();
        v.set(0x00FF_0010);
        v.z = 200.0;
        v.validity = Validity::ALL;

        mem.write_shadow(&v, 0x8001_0000);
        let back = mem.copy_validated(0x8001_0000, 0x00FF_0010);

        assert_eq!(back.x, 16.0);
        assert_eq!(back.y, 255.0);
        assert_eq!(back.z, 200.0);
        assert_eq!(back.validity, Validity::ALL);
    }

    #[test]
    fn untracked_addresses_yield_the_sentinel() {
        let mut mem = ShadowMemory::new();
        let read = mem.read_shadow(0xBFC0_0000);
        assert_eq!(read.tag, Tag::INVALID_ADDRESS);
        assert_eq!(read.validity, Validity::empty());

        // Writes outside the map vanish without complaint.
        let mut v = PreciseValue::default();
        v.set(0x1234_5678);
        mem.write_shadow(&v, 0xBFC0_0000);
        assert_eq!(
            mem.copy_validated(0x1FC0_0000, 0).tag,
            Tag::INVALID_ADDRESS
        );
    }

    #[test]
    fn mismatched_ground_truth_degrades_the_cell() {
        let mut mem = ShadowMemory::new();
        let mut v = PreciseValue::default();
        v.set(0x0005_0003);
        mem.write_shadow(&v, 0x0000_1000);

        let back = mem.copy_validated(0x0000_1000, 0x0005_0004);
        assert_eq!(back.validity, Validity::empty());

        // The degradation sticks in storage as well.
        let again = mem.copy_validated(0x0000_1000, 0x0005_0003);
        assert_eq!(again.validity, Validity::empty());
    }

    #[test]
    fn low_half_store_leaves_the_high_lane_alone() {
        let mut mem = ShadowMemory::new();
        let mut whole = PreciseValue::default();
        whole.set(0x0005_AAAA);
        whole.y = 5.0;
        mem.write_shadow(&whole, 0x8002_0000);

        let mut half = PreciseValue::default();
        half.set(0x0000_1234);
        mem.write_shadow_half(&half, 0x8002_0000);

        let cell = mem.read_shadow(0x8002_0000);
        assert_eq!(cell.y, 5.0);
        assert!(cell.validity.contains(Validity::Y));
        assert_eq!(cell.x, half.x);
        assert_eq!(cell.raw, 0x0005_1234);
    }

    #[test]
    fn high_half_store_leaves_the_low_lane_alone() {
        let mut mem = ShadowMemory::new();
        let mut whole = PreciseValue::default();
        whole.set(0x0005_0003);
        mem.write_shadow(&whole, 0x8002_0000);

        let mut half = PreciseValue::default();
        half.set(0x0000_0009);
        mem.write_shadow_half(&half, 0x8002_0002);

        let cell = mem.read_shadow(0x8002_0000);
        assert_eq!(cell.x, 3.0);
        assert!(cell.validity.contains(Validity::X));
        assert_eq!(cell.y, 9.0);
        assert_eq!(cell.raw, 0x0009_0003);
    }

    #[test]
    fn half_word_load_shifts_the_high_lane_down() {
        let mut mem = ShadowMemory::new();
        let mut whole = PreciseValue::default();
        whole.set(0x8005_0003);
        mem.write_shadow(&whole, 0x8002_0000);

        // Sign-extended load of the (negative) high half.
        let value = 0xFFFF_8005;
        let out = mem.copy_validated_half(0x8002_0002, value, true);

        assert_eq!(out.x, f32::from(0x8005u16 as i16));
        assert_eq!(out.y, -1.0);
        assert!(out.validity.contains(Validity::X));
        assert!(out.validity.contains(Validity::Y));
        assert_eq!(out.raw, value);

        // Zero-extended load of the low half keeps y pinned to zero.
        let out = mem.copy_validated_half(0x8002_0000, 0x0000_0003, false);
        assert_eq!(out.x, 3.0);
        assert_eq!(out.y, 0.0);
        assert!(out.validity.contains(Validity::Y));
    }

    #[test]
    fn half_word_load_revokes_only_its_lane() {
        let mut mem = ShadowMemory::new();
        let mut whole = PreciseValue::default();
        whole.set(0x0005_0003);
        mem.write_shadow(&whole, 0x8002_0000);

        // Low lane diverged: X revoked, Y untouched.
        mem.copy_validated_half(0x8002_0000, 0x0000_0004, false);
        let cell = mem.read_shadow(0x8002_0000);
        assert!(!cell.validity.contains(Validity::X));
        assert!(cell.validity.contains(Validity::Y));
    }

    #[test]
    fn provenance_tags_accumulate_across_half_stores() {
        let mut mem = ShadowMemory::new();
        let mut src = PreciseValue::INVALID_ADDRESS;
        src.raw = 0x1234;
        mem.write_shadow_half(&src, 0x8002_0000);

        let mut fresh = PreciseValue::default();
        fresh.tag = Tag::FRESH;
        mem.write_shadow_half(&fresh, 0x8002_0002);

        let cell = mem.read_shadow(0x8002_0000);
        assert_eq!(cell.tag, Tag::FRESH | Tag::INVALID_ADDRESS);
    }

    #[test]
    fn last_dma_records_the_translated_target() {
        let mut mem = ShadowMemory::new();
        assert_eq!(mem.last_dma(), None);

        mem.set_last_dma(0x8001_0000);
        assert_eq!(mem.last_dma(), Some(0x4000));

        mem.set_last_dma(0xBFC0_0000);
        assert_eq!(mem.last_dma(), None);
    }
}
