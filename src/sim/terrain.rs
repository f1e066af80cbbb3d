//! Destructible terrain
//!
//! A full solid/empty bitmap plus a per-column heightmap derived from it.
//! Every mutation recomputes the heightmap for the columns it touched before
//! returning, so the two views never disagree.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

pub const SKY: u8 = 0;
pub const SOLID: u8 = 1;

/// Shape controls for generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Rougher profile with taller harmonics
    pub hilly: bool,
}

/// Spawn height preference for [`Terrain::find_surface_spot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPreference {
    Any,
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    width: usize,
    height: usize,
    /// Row-major cells, `y * width + x`
    mask: Vec<u8>,
    /// Topmost solid row per column, `height` if the column is empty
    heightmap: Vec<u32>,
    /// Bumped on every mutation
    revision: u64,
}

impl Terrain {
    /// All-empty terrain
    pub fn empty(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            mask: vec![SKY; width * height],
            heightmap: vec![height as u32; width],
            revision: 0,
        }
    }

    /// Level ground: every row at or below `surface_y` is solid
    pub fn flat(width: usize, height: usize, surface_y: usize) -> Self {
        let heights = vec![surface_y as u32; width.max(1)];
        Self::from_heights(width, height, &heights)
    }

    /// Rasterize a column profile into a terrain
    pub fn from_heights(width: usize, height: usize, heights: &[u32]) -> Self {
        let mut terrain = Self::empty(width, height);
        for x in 0..terrain.width {
            let top = heights
                .get(x)
                .copied()
                .unwrap_or(terrain.height as u32)
                .min(terrain.height as u32) as usize;
            for y in top..terrain.height {
                terrain.mask[y * terrain.width + x] = SOLID;
            }
        }
        terrain.recompute_all();
        terrain
    }

    /// Generate a smoothed noise landscape, deterministic for `seed`
    pub fn generate(width: usize, height: usize, seed: u64, params: TerrainParams) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let w = width.max(1);
        let h = height.max(1) as f32;

        let (rough_amp, rough_damp, window) = if params.hilly {
            (2.8, 0.9, 9)
        } else {
            (2.3, 0.93, 12)
        };

        // Damped random walk
        let mut base = vec![0.0f32; w];
        let mut y = h * 0.55 + (rng.random::<f32>() * 80.0 - 40.0);
        let mut dy = 0.0f32;
        for sample in base.iter_mut() {
            dy += (rng.random::<f32>() - 0.5) * rough_amp;
            dy *= rough_damp;
            y += dy;
            *sample = y;
        }

        // Forward box filter
        let mut smooth = vec![0.0f32; w];
        for (x, out) in smooth.iter_mut().enumerate() {
            let end = (x + window).min(w);
            let span = &base[x..end];
            *out = span.iter().sum::<f32>() / span.len() as f32;
        }

        let heights: Vec<u32> = smooth
            .iter()
            .enumerate()
            .map(|(x, &s)| {
                let xf = x as f32;
                let mut yy = s
                    + (xf * 0.01).sin() * if params.hilly { 28.0 } else { 18.0 }
                    + (xf * 0.053).sin() * if params.hilly { 14.0 } else { 10.0 }
                    + (xf * 0.018).sin() * if params.hilly { 10.0 } else { 6.0 };
                if params.hilly {
                    yy += (xf * 0.025).sin() * 22.0;
                    yy += (xf * 0.18).sin() * 8.0;
                } else {
                    yy += (xf * 0.11).sin() * 4.0;
                }
                yy.clamp(h * 0.35, h * 0.85).floor() as u32
            })
            .collect();

        let terrain = Self::from_heights(width, height, &heights);
        log::debug!(
            "Generated {}x{} terrain (seed {:#x}, hilly: {})",
            terrain.width,
            terrain.height,
            seed,
            params.hilly
        );
        terrain
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn heightmap(&self) -> &[u32] {
        &self.heightmap
    }

    #[inline]
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Cell query that treats everything outside the world as empty
    #[inline]
    pub fn cell_solid(&self, ix: i64, iy: i64) -> bool {
        if ix < 0 || iy < 0 || ix >= self.width as i64 || iy >= self.height as i64 {
            return false;
        }
        self.mask[iy as usize * self.width + ix as usize] == SOLID
    }

    /// Point query, clamped to world bounds
    #[inline]
    pub fn is_solid(&self, x: f32, y: f32) -> bool {
        let (ix, iy) = self.clamp_cell(x, y);
        self.mask[iy * self.width + ix] == SOLID
    }

    /// Heightmap lookup, clamped to world bounds
    #[inline]
    pub fn ground_height(&self, x: i64) -> u32 {
        let ix = x.clamp(0, self.width as i64 - 1) as usize;
        self.heightmap[ix]
    }

    /// Heightmap lookup for a continuous x
    #[inline]
    pub fn ground_y(&self, x: f32) -> f32 {
        self.ground_height(x.floor() as i64) as f32
    }

    /// Nearest solid/empty boundary in column `x` around `hint_y`.
    ///
    /// From inside solid ground this climbs to the top of the solid run; from
    /// open air it falls to the first solid cell, or returns the world height
    /// if there is none below.
    pub fn surface_y_near(&self, x: f32, hint_y: f32) -> f32 {
        let (ix, mut y) = self.clamp_cell(x, hint_y);
        if self.mask[y * self.width + ix] == SOLID {
            while y > 0 && self.mask[(y - 1) * self.width + ix] == SOLID {
                y -= 1;
            }
            y as f32
        } else {
            while y < self.height && self.mask[y * self.width + ix] != SOLID {
                y += 1;
            }
            y as f32
        }
    }

    /// Heightmap slope (dy/dx) around column `x`
    pub fn slope_at(&self, x: i64) -> f32 {
        let left = self.ground_height(x - 1) as f32;
        let right = self.ground_height(x + 1) as f32;
        (right - left) * 0.5
    }

    /// Remove solid matter within `radius` of the center (explosion crater)
    pub fn carve(&mut self, cx: f32, cy: f32, radius: f32) {
        self.paint_disc(cx, cy, radius, SKY);
    }

    /// Add solid matter within `radius` of the center (debris)
    pub fn fill(&mut self, cx: f32, cy: f32, radius: f32) {
        self.paint_disc(cx, cy, radius, SOLID);
    }

    fn paint_disc(&mut self, cx: f32, cy: f32, radius: f32, value: u8) {
        if radius.is_nan() || radius <= 0.0 || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let min_x = ((cx - radius).floor() as i64).max(0);
        let max_x = ((cx + radius).ceil() as i64).min(self.width as i64 - 1);
        let min_y = ((cy - radius).floor() as i64).max(0);
        let max_y = ((cy + radius).ceil() as i64).min(self.height as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let rr = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= rr {
                    self.mask[y as usize * self.width + x as usize] = value;
                }
            }
        }

        self.recompute_columns(min_x as usize, max_x as usize);
        self.revision += 1;
    }

    fn recompute_columns(&mut self, x0: usize, x1: usize) {
        for x in x0..=x1.min(self.width - 1) {
            let top = (0..self.height)
                .find(|&y| self.mask[y * self.width + x] == SOLID)
                .unwrap_or(self.height);
            self.heightmap[x] = top as u32;
        }
    }

    fn recompute_all(&mut self) {
        self.recompute_columns(0, self.width - 1);
    }

    /// Gouge a few surface craters and drop floating dirt blobs
    pub fn scatter_debris<R: Rng>(&mut self, rng: &mut R) {
        let w = self.width as f32;
        let h = self.height as f32;
        if w < 200.0 {
            return;
        }

        let craters = 1 + (rng.random::<f32>() * 3.0) as usize;
        for _ in 0..craters {
            let radius = 18.0 + rng.random::<f32>() * 26.0;
            let x = (60.0 + rng.random::<f32>() * (w - 120.0)).floor();
            let surface = self.ground_y(x);
            let cy = (surface - radius * 0.45 + rng.random::<f32>() * 10.0)
                .clamp(radius * 0.4, h - 4.0);
            self.carve(x, cy, radius);
        }

        let blobs = 2 + (rng.random::<f32>() * 3.0) as usize;
        for _ in 0..blobs {
            let radius = 14.0 + rng.random::<f32>() * 18.0;
            let x = (80.0 + rng.random::<f32>() * (w - 160.0)).floor();
            let base = self.ground_y(x);
            let cy = (base - 36.0 - rng.random::<f32>() * 110.0).max(radius + 6.0);
            self.fill(x, cy, radius);
        }
    }

    /// Coarse check whether the ground rises above the straight line between
    /// two points by more than a small margin
    pub fn blocks_line(&self, from: Vec2, to: Vec2) -> bool {
        let left = from.x.min(to.x).floor() as i64;
        let right = from.x.max(to.x).ceil() as i64;
        if right - left < 12 {
            return false;
        }
        let dx = to.x - from.x;
        if dx.abs() < 1.0 {
            return false;
        }
        let slope = (to.y - from.y) / dx;
        let step = ((right - left) / 48).max(1);
        let mut ix = left + 6;
        while ix <= right - 6 {
            let line_y = from.y + slope * (ix as f32 - from.x);
            if (self.ground_height(ix) as f32) < line_y - 10.0 {
                return true;
            }
            ix += step;
        }
        false
    }

    /// Whether ground exists all the way between two columns without a step
    /// taller than `max_rise`
    pub fn is_walkable(&self, start_x: f32, end_x: f32, max_rise: f32) -> bool {
        let start = start_x.floor() as i64;
        let end = end_x.floor() as i64;
        let sentinel = self.height as u32;
        if start == end {
            return true;
        }
        let dir = if start < end { 1 } else { -1 };
        let mut prev = self.ground_height(start);
        if prev >= sentinel {
            return false;
        }
        let mut x = start + 12 * dir;
        while (dir > 0 && x <= end) || (dir < 0 && x >= end) {
            let gy = self.ground_height(x);
            if gy >= sentinel || (gy as f32 - prev as f32).abs() > max_rise {
                return false;
            }
            prev = gy;
            x += 12 * dir;
        }
        self.ground_height(end) < sentinel
    }

    /// Resolve a teleport request: clamp inside the world and rise out of
    /// solid ground. `None` when the spot stays buried.
    pub fn find_teleport_destination(&self, x: f32, y: f32, radius: f32) -> Option<Vec2> {
        let margin = radius + 2.0;
        let x = x.clamp(margin, (self.width as f32 - margin).max(margin)).floor();
        let mut y = y.clamp(margin, (self.height as f32 - margin).max(margin)).floor();
        let mut tries = 0;
        while tries < 80 && self.is_solid(x, y) {
            y -= 1.0;
            tries += 1;
        }
        if self.is_solid(x, y) {
            return None;
        }
        Some(Vec2::new(x, y))
    }

    /// Pick a reasonably flat surface spot for a body of `radius` in [x0, x1)
    pub fn find_surface_spot<R: Rng>(
        &self,
        x0: f32,
        x1: f32,
        preference: SpawnPreference,
        radius: f32,
        rng: &mut R,
    ) -> Vec2 {
        let min = x0.min(x1).floor().max(0.0);
        let max = x0.max(x1).floor().min(self.width as f32 - 1.0);
        let span = (max - min).max(1.0);
        let mut best: Option<Vec2> = None;

        for _ in 0..500 {
            let x = min + (rng.random::<f32>() * span).floor();
            let y = self.ground_y(x) - radius;
            if y <= 0.0 || y >= self.height as f32 - radius {
                continue;
            }
            let left = self.ground_y(x - 6.0);
            let right = self.ground_y(x + 6.0);
            if (left - right).abs() >= 20.0 {
                continue;
            }
            let candidate = Vec2::new(x, y);
            match preference {
                SpawnPreference::Any => return candidate,
                SpawnPreference::High if best.is_none_or(|b| y < b.y) => best = Some(candidate),
                SpawnPreference::Low if best.is_none_or(|b| y > b.y) => best = Some(candidate),
                _ => {}
            }
        }

        best.unwrap_or_else(|| {
            let mid = ((min + max) / 2.0).floor();
            Vec2::new(mid, self.ground_y(mid) - radius)
        })
    }
}

impl Terrain {
    #[inline]
    fn clamp_cell(&self, x: f32, y: f32) -> (usize, usize) {
        let ix = (x.floor() as i64).clamp(0, self.width as i64 - 1) as usize;
        let iy = (y.floor() as i64).clamp(0, self.height as i64 - 1) as usize;
        (ix, iy)
    }
}
