//! Sub-pixel precision tracking for PlayStation geometry.
//!
//! The console's GTE computes vertex transforms in low-precision fixed
//! point, which is where the characteristic polygon jitter comes from.
//! This crate shadows every 32-bit value moving through the CPU, the GTE
//! and main memory with a float counterpart plus a validity record, so
//! the renderer can substitute the precise coordinates whenever they are
//! provably still in sync with what the hardware actually computed.
//!
//! The interpreter calls the per-instruction hooks on [`Engine`] for
//! every tracked load, store and coprocessor transfer; the GTE unit
//! pushes projected vertices; the rasterizer asks
//! [`Engine::recover_vertex`] for corrected coordinates per vertex.

mod cpu;
mod debug_flags;
mod engine;
mod gpu;
mod gte;
pub mod instruction;
mod memory;
mod value;
mod vertex_cache;

pub use cpu::{CpuRegisters, GPR_COUNT, HI, LO};
pub use engine::{Engine, Mode};
pub use gpu::{truncate16, RecoveredVertex};
pub use gte::{Gte, SXY0, SXY1, SXY2, SXYP};
pub use memory::{translate_address, ShadowMemory};
pub use value::{PreciseValue, Tag, Validity};
pub use vertex_cache::VertexCache;
