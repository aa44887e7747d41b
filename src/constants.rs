// World constants
pub const CHUNK_SIZE: i32 = 16;
pub const WORLD_HEIGHT: i32 = 128;
pub const SEA_LEVEL: i32 = 48;
pub const LOAD_RADIUS: i32 = 4;
pub const UNLOAD_RADIUS: i32 = 5;
pub const DEV_SEED: u32 = 133742;

// Authored core is a square of side 2 * CORE_HALF_SIZE centered at the origin
pub const CORE_HALF_SIZE: f64 = 2000.0;
pub const BLEND_RING_SIZE: f64 = 800.0;

// Global terrain height range
pub const MIN_TERRAIN_HEIGHT: f64 = 2.0;
pub const MAX_TERRAIN_HEIGHT: f64 = 110.0;
pub const MAX_AUTHORED_HEIGHT: f64 = 108.0;

// Landmarks
pub const CASTLE_CENTER: [f64; 2] = [0.0, 0.0];
pub const TOWN_CENTER: [f64; 2] = [240.0, 44.0];
pub const CASTLE_PLATEAU_RADIUS: f64 = 190.0;
pub const CASTLE_TAG_RADIUS: f64 = 58.0;
pub const TOWN_FLATTEN_RADIUS: f64 = 185.0;
pub const TOWN_TAG_RADIUS: f64 = 78.0;
pub const ROAD_FLATTEN_WIDTH: f64 = 24.0;
pub const ROAD_TAG_WIDTH: f64 = 10.0;

// Column layering
pub const SUBSOIL_DEPTH: i32 = 3;
pub const CASTLE_FOUNDATION_DEPTH: i32 = 6;

// Optimization constants
pub const MAX_CHUNK_BUILDS_PER_FRAME: usize = 2;
pub const MAX_MESH_BUILDS_PER_FRAME: usize = 1;
pub const ASYNC_WORKER_COUNT: usize = 4;
