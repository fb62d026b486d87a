use bitflags::bitflags;

use crate::cpu::CpuRegisters;
use crate::gpu::{recover_vertex, RecoveredVertex};
use crate::gte::Gte;
use crate::memory::ShadowMemory;
use crate::vertex_cache::VertexCache;

bitflags! {
    /// Global precision-tracking switches. Owned by the host shell's
    /// settings layer; the engine only ever reads them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u32 {
        /// Track values through loads and stores.
        const MEMORY = 1 << 0;
        /// Track values through the geometry coprocessor.
        const GTE = 1 << 1;
        /// Mirror pushed vertices into the positional cache.
        const VERTEX_CACHE = 1 << 2;
        /// Keep real depth on pushed vertices for perspective-correct
        /// interpolation.
        const TEXTURE_CORRECTION = 1 << 3;
    }
}

/// The whole tracking engine: shadow memory, the four register banks and
/// the vertex cache, behind one owned context.
///
/// Constructed once per emulated machine and handed by reference to the
/// CPU interpreter, the GTE unit and the renderer. Everything runs on the
/// single emulation thread; there is no interior locking.
pub struct Engine {
    pub mem: ShadowMemory,
    pub cpu: CpuRegisters,
    pub gte: Gte,
    pub cache: VertexCache,
    modes: Mode,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            mem: ShadowMemory::new(),
            cpu: CpuRegisters::new(),
            gte: Gte::new(),
            cache: VertexCache::new(),
            modes: Mode::empty(),
        }
    }

    /// Wipe all tracked state, as on a console reset. Mode flags belong
    /// to the host and survive.
    pub fn reset(&mut self) {
        self.mem.reset();
        self.cpu.reset();
        self.gte.reset();
        self.cache.reset();
    }

    pub fn modes(&self) -> Mode {
        self.modes
    }

    pub fn set_modes(&mut self, modes: Mode) {
        self.modes = modes;
    }

    pub fn enable_modes(&mut self, modes: Mode) {
        self.modes.insert(modes);
    }

    pub fn disable_modes(&mut self, modes: Mode) {
        self.modes.remove(modes);
    }

    // CPU load/store hooks, one per tracked instruction.

    pub fn cpu_lw(&mut self, instr: u32, rt_val: u32, addr: u32) {
        self.cpu.lw(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_lh(&mut self, instr: u32, rt_val: u16, addr: u32) {
        self.cpu.lh(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_lhu(&mut self, instr: u32, rt_val: u16, addr: u32) {
        self.cpu.lhu(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_lb(&mut self, instr: u32, rt_val: u8, addr: u32) {
        self.cpu.lb(&self.mem, instr, rt_val, addr);
    }

    pub fn cpu_lbu(&mut self, instr: u32, rt_val: u8, addr: u32) {
        self.cpu.lbu(&self.mem, instr, rt_val, addr);
    }

    pub fn cpu_sw(&mut self, instr: u32, rt_val: u32, addr: u32) {
        self.cpu.sw(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_sh(&mut self, instr: u32, rt_val: u16, addr: u32) {
        self.cpu.sh(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_sb(&mut self, instr: u32, rt_val: u8, addr: u32) {
        self.cpu.sb(&mut self.mem, instr, rt_val, addr);
    }

    pub fn cpu_mfc0(&mut self, instr: u32, rt_val: u32, rd_val: u32) {
        self.cpu.mfc0(instr, rt_val, rd_val);
    }

    pub fn cpu_mtc0(&mut self, instr: u32, rd_val: u32, rt_val: u32) {
        self.cpu.mtc0(instr, rd_val, rt_val);
    }

    // GTE transfer hooks.

    pub fn gte_mfc2(&mut self, instr: u32, rt_val: u32, rd_val: u32) {
        self.gte.mfc2(&mut self.cpu, instr, rt_val, rd_val);
    }

    pub fn gte_mtc2(&mut self, instr: u32, rd_val: u32, rt_val: u32) {
        self.gte.mtc2(&mut self.cpu, instr, rd_val, rt_val);
    }

    pub fn gte_cfc2(&mut self, instr: u32, rt_val: u32, rd_val: u32) {
        self.gte.cfc2(&mut self.cpu, instr, rt_val, rd_val);
    }

    pub fn gte_ctc2(&mut self, instr: u32, rd_val: u32, rt_val: u32) {
        self.gte.ctc2(&mut self.cpu, instr, rd_val, rt_val);
    }

    pub fn gte_lwc2(&mut self, instr: u32, rt_val: u32, addr: u32) {
        self.gte.lwc2(&mut self.mem, instr, rt_val, addr);
    }

    pub fn gte_swc2(&mut self, instr: u32, rt_val: u32, addr: u32) {
        self.gte.swc2(&mut self.mem, instr, rt_val, addr);
    }

    // GTE pipeline hooks.

    pub fn push_screen_vertex(&mut self, x: f32, y: f32, z: f32, word: u32) {
        self.gte
            .push_screen_vertex(x, y, z, word, self.modes, &mut self.cache);
    }

    pub fn push_screen_vertex_fixed(&mut self, x: i64, y: i64, z: i64, word: u32) {
        self.gte
            .push_screen_vertex_fixed(x, y, z, word, self.modes, &mut self.cache);
    }

    pub fn nclip_valid(&mut self, sxy0: u32, sxy1: u32, sxy2: u32) -> bool {
        self.gte.nclip_valid(sxy0, sxy1, sxy2)
    }

    pub fn nclip(&self) -> f32 {
        self.gte.nclip()
    }

    // Renderer hook.

    #[allow(clippy::too_many_arguments)]
    pub fn recover_vertex(
        &mut self,
        addr: u32,
        word: u32,
        native_x: i32,
        native_y: i32,
        offs_x: i32,
        offs_y: i32,
    ) -> RecoveredVertex {
        recover_vertex(
            &self.mem,
            &mut self.cache,
            addr,
            word,
            native_x,
            native_y,
            offs_x,
            offs_y,
        )
    }
}
