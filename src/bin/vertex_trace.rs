use psx_precision::{Engine, Mode, Tag, Validity};

// Headless exercise tool for the precision engine.
// Usage:
//   cargo run --bin vertex_trace -- [--count N] [--no-cache] [--no-store]
// Pushes a deterministic fan of vertices through the GTE path, stores a
// subset to shadow RAM the way games hand polygons to the GPU, then runs
// recovery over all of them and reports which path satisfied each vertex.
// RUST_LOG=debug and TRACE_RECOVERY=1 make the engine itself chatty.

fn parse_args() -> (u32, bool, bool) {
    let mut count = 256u32;
    let mut use_cache = true;
    let mut store = true;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" => {
                count = args
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--count expects a number");
                        std::process::exit(2);
                    });
            }
            "--no-cache" => use_cache = false,
            "--no-store" => store = false,
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    (count, use_cache, store)
}

fn main() {
    env_logger::init();
    let (count, use_cache, store) = parse_args();

    let mut engine = Engine::new();
    let mut modes = Mode::GTE | Mode::MEMORY | Mode::TEXTURE_CORRECTION;
    if use_cache {
        modes |= Mode::VERTEX_CACHE;
    }
    engine.set_modes(modes);

    // Deterministic spread of screen positions with sub-pixel offsets.
    let mut vertices = Vec::new();
    for i in 0..count {
        let sx = ((i * 37) % 640) as i16 - 320;
        let sy = ((i * 23) % 480) as i16 - 240;
        let word = ((sy as u16 as u32) << 16) | sx as u16 as u32;
        let x = f32::from(sx) + 0.25;
        let y = f32::from(sy) - 0.125;
        let z = 100.0 + i as f32;

        engine.push_screen_vertex(x, y, z, word);

        // Every third vertex goes through memory like a real display list.
        let addr = 0x8010_0000 + i * 4;
        if store && i % 3 == 0 {
            engine.gte_swc2(14 << 16, word, addr);
        }
        vertices.push((addr, word, sx, sy));
    }

    let mut direct = 0u32;
    let mut cached = 0u32;
    let mut native = 0u32;
    for &(addr, word, sx, sy) in &vertices {
        let out = engine.recover_vertex(addr, word, i32::from(sx), i32::from(sy), 0, 0);
        let shadow = engine.mem.read_shadow(addr);
        if shadow.tag != Tag::INVALID_ADDRESS
            && shadow.validity.contains(Validity::XY)
            && shadow.raw == word
        {
            direct += 1;
        } else if out.x != f32::from(sx) || out.w != 1.0 {
            cached += 1;
        } else {
            native += 1;
        }
    }

    println!("pushed   {count} vertices (cache {})", if use_cache { "on" } else { "off" });
    println!("direct   {direct}");
    println!("cached   {cached}");
    println!("native   {native}");
}
