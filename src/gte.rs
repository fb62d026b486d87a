use log::trace;

use crate::cpu::CpuRegisters;
use crate::engine::Mode;
use crate::instruction::{rd, rt};
use crate::memory::ShadowMemory;
use crate::value::{high_half, low_half, PreciseValue, Validity};
use crate::vertex_cache::VertexCache;

// Screen coordinate FIFO inside the data bank: three live slots plus the
// "last pushed" alias the hardware exposes as a separate register.
pub const SXY0: usize = 12;
pub const SXY1: usize = 13;
pub const SXY2: usize = 14;
pub const SXYP: usize = 15;

/// Shadow banks for the geometry coprocessor.
///
/// The data and control banks mirror the 32 registers each of the real
/// GTE. Screen coordinates computed by the projection pipeline enter
/// through [`push_screen_vertex`](Gte::push_screen_vertex), which rotates
/// the SXY FIFO exactly like the hardware RTPS/RTPT sequence and mirrors
/// the new vertex into the positional cache.
pub struct Gte {
    pub data: [PreciseValue; 32],
    pub ctrl: [PreciseValue; 32],
    seq: u32,
}

impl Gte {
    pub fn new() -> Self {
        Gte {
            data: [PreciseValue::default(); 32],
            ctrl: [PreciseValue::default(); 32],
            seq: 0,
        }
    }

    pub fn reset(&mut self) {
        self.data = [PreciseValue::default(); 32];
        self.ctrl = [PreciseValue::default(); 32];
        self.seq = 0;
    }

    /// Rotate a freshly projected vertex into the SXY FIFO.
    ///
    /// The new entry is fully trusted and stamped with the next sequence
    /// number. Unless texture correction is enabled, the depth component
    /// is flattened so downstream consumers get affine behaviour. With
    /// the vertex cache enabled the entry is mirrored into the cache at
    /// its native screen position; with it disabled the cache is told to
    /// fail so it can never serve entries from a mismatched session.
    pub fn push_screen_vertex(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        word: u32,
        modes: Mode,
        cache: &mut VertexCache,
    ) {
        self.data[SXY0] = self.data[SXY1];
        self.data[SXY1] = self.data[SXY2];

        let entry = &mut self.data[SXY2];
        entry.x = x;
        entry.y = y;
        entry.z = if modes.contains(Mode::TEXTURE_CORRECTION) {
            z
        } else {
            1.0
        };
        entry.raw = word;
        entry.validity = Validity::ALL;
        entry.seq = self.seq;
        self.seq = self.seq.wrapping_add(1);

        trace!("push ({x}, {y}) seq {}", entry.seq);

        if modes.contains(Mode::VERTEX_CACHE) {
            let pushed = self.data[SXY2];
            cache.cache_vertex(low_half(word), high_half(word), Some(&pushed));
        } else {
            cache.cache_vertex(0, 0, None);
        }
    }

    /// Fixed-point entry: x and y arrive as 16.16, z as a plain integer,
    /// the way the projection unit hands them over.
    pub fn push_screen_vertex_fixed(
        &mut self,
        x: i64,
        y: i64,
        z: i64,
        word: u32,
        modes: Mode,
        cache: &mut VertexCache,
    ) {
        let fx = x as f32 / 65536.0;
        let fy = y as f32 / 65536.0;
        let fz = z as f32;
        self.push_screen_vertex(fx, fy, fz, word, modes, cache);
    }

    /// Winding test precondition: all three FIFO vertices revalidated
    /// against what the integer pipeline holds, and every one of them
    /// must carry a trusted XY pair.
    pub fn nclip_valid(&mut self, sxy0: u32, sxy1: u32, sxy2: u32) -> bool {
        self.data[SXY0].validate(sxy0);
        self.data[SXY1].validate(sxy1);
        self.data[SXY2].validate(sxy2);

        (self.data[SXY0].validity & self.data[SXY1].validity & self.data[SXY2].validity)
            .contains(Validity::XY)
    }

    /// Cross product over the FIFO, sign-compatible with the hardware
    /// NCLIP. Magnitudes in (0.1, 1.0) are pushed past 1 so the integer
    /// truncation downstream cannot round a genuine winding to zero.
    pub fn nclip(&self) -> f32 {
        let (sx0, sy0) = (self.data[SXY0].x, self.data[SXY0].y);
        let (sx1, sy1) = (self.data[SXY1].x, self.data[SXY1].y);
        let (sx2, sy2) = (self.data[SXY2].x, self.data[SXY2].y);

        let mut nclip = sx0 * sy1 + sx1 * sy2 + sx2 * sy0 - sx0 * sy2 - sx1 * sy0 - sx2 * sy1;

        let magnitude = nclip.abs();
        if magnitude > 0.1 && magnitude < 1.0 {
            nclip += if nclip < 0.0 { -1.0 } else { 1.0 };
        }

        nclip
    }

    /// MFC2: rt = data[rd]
    pub fn mfc2(&mut self, cpu: &mut CpuRegisters, instr: u32, rt_val: u32, rd_val: u32) {
        self.data[rd(instr)].validate(rd_val);
        cpu.gpr[rt(instr)] = self.data[rd(instr)];
        cpu.gpr[rt(instr)].raw = rt_val;
    }

    /// MTC2: data[rd] = rt
    pub fn mtc2(&mut self, cpu: &mut CpuRegisters, instr: u32, rd_val: u32, rt_val: u32) {
        cpu.gpr[rt(instr)].validate(rt_val);
        self.write_data(cpu.gpr[rt(instr)], rd(instr));
        self.data[rd(instr)].raw = rd_val;
    }

    /// CFC2: rt = ctrl[rd]
    pub fn cfc2(&mut self, cpu: &mut CpuRegisters, instr: u32, rt_val: u32, rd_val: u32) {
        self.ctrl[rd(instr)].validate(rd_val);
        cpu.gpr[rt(instr)] = self.ctrl[rd(instr)];
        cpu.gpr[rt(instr)].raw = rt_val;
    }

    /// CTC2: ctrl[rd] = rt
    pub fn ctc2(&mut self, cpu: &mut CpuRegisters, instr: u32, rd_val: u32, rt_val: u32) {
        cpu.gpr[rt(instr)].validate(rt_val);
        self.ctrl[rd(instr)] = cpu.gpr[rt(instr)];
        self.ctrl[rd(instr)].raw = rd_val;
    }

    /// LWC2: data[rt] = mem[addr]
    pub fn lwc2(&mut self, mem: &mut ShadowMemory, instr: u32, rt_val: u32, addr: u32) {
        let value = mem.copy_validated(addr, rt_val);
        self.write_data(value, rt(instr));
    }

    /// SWC2: mem[addr] = data[rt]
    pub fn swc2(&mut self, mem: &mut ShadowMemory, instr: u32, rt_val: u32, addr: u32) {
        self.data[rt(instr)].validate(rt_val);
        mem.write_shadow(&self.data[rt(instr)], addr);
    }

    /// Register-indexed store into the data bank, with the two special
    /// cases the hardware has: writing SXYP pushes the FIFO, and the
    /// flag register is read-only.
    fn write_data(&mut self, value: PreciseValue, reg: usize) {
        match reg {
            SXYP => {
                self.data[SXY0] = self.data[SXY1];
                self.data[SXY1] = self.data[SXY2];
                self.data[SXY2] = value;
            }
            31 => return,
            _ => {}
        }
        self.data[reg] = value;
    }
}
