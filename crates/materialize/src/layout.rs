//! Deterministic cluster-and-spiral scatter for unpositioned gallery assets.
//!
//! Assets are dealt round-robin into clusters whose centres sit on a ring;
//! within a cluster each item is pushed out along a golden-angle spiral, then
//! nudged by seeded jitter. Geometry is computed in `f64` and narrowed once.

use std::f64::consts::TAU;

use glam::Vec3;
use worldhub_common::{Placement, SeededRng};

/// Golden angle in radians: `π (3 - √5)`.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
/// Salt separating scatter draws from any other use of the seeded hash.
const SCATTER_SALT: u64 = 0x5ca7;
const MIN_CLUSTERS: usize = 4;
const ITEMS_PER_CLUSTER: usize = 6;

/// Tuning of the scatter layout. Distances are in world units, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterParams {
    pub base_radius: f64,
    /// Extra ring radius per cluster, so more clusters spread further out.
    pub radius_growth: f64,
    pub spiral_base: f64,
    pub spiral_growth: f64,
    /// Maximum horizontal jitter on each axis.
    pub jitter: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub yaw_jitter: f64,
    pub scale_jitter: f64,
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self {
            base_radius: 14.0,
            radius_growth: 1.5,
            spiral_base: 1.2,
            spiral_growth: 0.8,
            jitter: 0.4,
            min_height: 1.2,
            max_height: 3.2,
            yaw_jitter: 0.2,
            scale_jitter: 0.15,
        }
    }
}

/// Where one asset landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSlot {
    pub cluster: usize,
    /// Position of the item within its cluster's spiral.
    pub slot: usize,
    pub placement: Placement,
}

/// Number of clusters used for `n` assets: `max(4, ceil(n / 6))`.
pub fn cluster_count(n: usize) -> usize {
    MIN_CLUSTERS.max(n.div_ceil(ITEMS_PER_CLUSTER))
}

/// Place `n` assets. Item `i` of the result belongs to the asset at index `i`.
pub fn scatter(n: usize, params: &ScatterParams) -> Vec<ScatterSlot> {
    if n == 0 {
        return Vec::new();
    }
    let clusters = cluster_count(n);
    let ring = params.base_radius + clusters as f64 * params.radius_growth;

    (0..n)
        .map(|index| {
            let cluster = index % clusters;
            let slot = index / clusters;

            let theta = TAU * cluster as f64 / clusters as f64;
            let (center_x, center_z) = (ring * theta.cos(), ring * theta.sin());

            let spiral_radius = params.spiral_base + slot as f64 * params.spiral_growth;
            let phi = slot as f64 * GOLDEN_ANGLE;

            let mut rng = SeededRng::for_index(index, SCATTER_SALT);
            let x = center_x + spiral_radius * phi.cos() + rng.next_signed(params.jitter);
            let z = center_z + spiral_radius * phi.sin() + rng.next_signed(params.jitter);
            let y = rng.next_range(params.min_height, params.max_height);
            // Face the origin, give or take a little.
            let yaw = (-x).atan2(-z) + rng.next_signed(params.yaw_jitter);
            let scale = 1.0 + rng.next_signed(params.scale_jitter);

            ScatterSlot {
                cluster,
                slot,
                placement: Placement {
                    position: Vec3::new(x as f32, y as f32, z as f32),
                    rotation: Vec3::new(0.0, yaw as f32, 0.0),
                    scale: Vec3::splat(scale as f32),
                },
            }
        })
        .collect()
}
