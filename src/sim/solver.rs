//! Firing solution search
//!
//! A candidate (angle, power) is scored by simulating the shot with the same
//! integration step the live projectile uses and measuring the closest
//! approach to the target. A coarse grid search is followed by local
//! refinement; solutions can be remembered across turns.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{SWEEP_SPACING, sweep_points};
use super::projectile::{Body, BodyKind};
use super::state::Weapon;
use super::terrain::Terrain;
use crate::tuning::PhysicsConfig;
use crate::{angle_toward, aim_direction};

/// Steps simulated per candidate
pub const MAX_SIM_STEPS: u32 = 420;
/// Remembered solutions are discarded when the target moved this far
pub const MEMORY_TARGET_SHIFT: f32 = 120.0;

const SEARCH_ANGLE_MIN: f32 = 8.0;
const SEARCH_ANGLE_MAX: f32 = 172.0;
const REFINE_ANGLE_MIN: f32 = 6.0;
const REFINE_ANGLE_MAX: f32 = 174.0;
const REFINE_POWER_MIN: f32 = 20.0;
const POWER_MAX: f32 = 100.0;

/// Inputs shared by every simulated candidate
#[derive(Clone, Copy)]
pub struct SolveContext<'a> {
    pub terrain: &'a Terrain,
    pub wind: f32,
    /// Flights end at this depth, as live shots splash down there
    pub waterline: Option<f32>,
    pub cfg: &'a PhysicsConfig,
}

/// Outcome of one simulated candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEstimate {
    /// Closest approach to the target center (0 on a hit)
    pub miss: f32,
    /// Steps until the shot terminated
    pub flight_steps: u32,
}

/// A chosen firing solution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotPlan {
    pub weapon: Weapon,
    pub angle: f32,
    pub power: f32,
    pub miss: f32,
    pub flight_steps: u32,
    pub score: f32,
}

impl ShotPlan {
    /// Grenade fuse that detonates near the end of the predicted flight
    pub fn fuse_secs(&self, cfg: &PhysicsConfig) -> u8 {
        let per_sec = cfg.fuse_steps_per_second.max(1) as f32;
        (self.flight_steps as f32 / per_sec).round().clamp(1.0, 5.0) as u8
    }
}

/// Grid resolution for [`search`] and [`refine`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSteps {
    pub angle: f32,
    pub power: f32,
}

impl SearchSteps {
    pub fn halved(self) -> Self {
        Self {
            angle: (self.angle * 0.5).max(0.5),
            power: (self.power * 0.5).max(0.5),
        }
    }
}

/// Simulate a shot and report how close it passes to `target`.
///
/// Each move is swept like a live shot, so no candidate passes through
/// terrain. Pellet spread is ignored; fused shots are treated as contact
/// shots, which is what the fuse chosen by [`ShotPlan::fuse_secs`]
/// approximates.
pub fn simulate_hit(
    ctx: &SolveContext,
    shooter: Vec2,
    target: Vec2,
    angle: f32,
    power: f32,
    weapon: Weapon,
) -> HitEstimate {
    let cfg = ctx.cfg;
    let kind = match weapon {
        Weapon::Grenade => BodyKind::Fused { fuse_steps: u32::MAX },
        Weapon::Shotgun => BodyKind::Pellet,
        _ => BodyKind::Ballistic,
    };
    let dir = aim_direction(angle);
    let mut body = Body::new(
        shooter + dir * cfg.muzzle_distance(),
        dir * cfg.launch_speed(power),
        kind,
    );
    let hit_sq = cfg.direct_hit_radius_sq();
    let w = ctx.terrain.width() as f32;
    let h = ctx.terrain.height() as f32;
    let mut best = f32::INFINITY;

    for step in 1..=MAX_SIM_STEPS {
        let from = body.pos;
        body.integrate(ctx.wind, cfg.gravity);
        for p in sweep_points(from, body.pos, SWEEP_SPACING) {
            let d_sq = p.distance_squared(target);
            best = best.min(d_sq);
            if ctx.waterline.is_some_and(|level| p.y >= level) {
                return HitEstimate {
                    miss: best.sqrt(),
                    flight_steps: step,
                };
            }
            if d_sq <= hit_sq {
                return HitEstimate {
                    miss: 0.0,
                    flight_steps: step,
                };
            }
            let stopped = p.x < 0.0
                || p.x >= w
                || p.y >= h
                || ctx.terrain.cell_solid(p.x.floor() as i64, p.y.floor() as i64);
            if stopped {
                return HitEstimate {
                    miss: best.sqrt(),
                    flight_steps: step,
                };
            }
        }
    }
    HitEstimate {
        miss: best.sqrt(),
        flight_steps: MAX_SIM_STEPS,
    }
}

/// Lower is better: miss distance plus a small preference for low power
pub fn score_candidate(miss: f32, power: f32, weapon: Weapon) -> f32 {
    let weight = if weapon == Weapon::Shotgun { 0.4 } else { 1.0 };
    miss + power * 0.1 * weight * 0.01
}

fn evaluate(
    ctx: &SolveContext,
    shooter: Vec2,
    target: Vec2,
    angle: f32,
    power: f32,
    weapon: Weapon,
) -> ShotPlan {
    let est = simulate_hit(ctx, shooter, target, angle, power, weapon);
    ShotPlan {
        weapon,
        angle,
        power,
        miss: est.miss,
        flight_steps: est.flight_steps,
        score: score_candidate(est.miss, power, weapon),
    }
}

fn grid(min: f32, max: f32, step: f32) -> impl Iterator<Item = f32> {
    let step = step.max(0.1);
    let n = ((max - min) / step).floor().max(0.0) as u32;
    (0..=n).map(move |i| min + i as f32 * step)
}

/// Coarse grid search over angle and power
pub fn search(
    ctx: &SolveContext,
    shooter: Vec2,
    target: Vec2,
    weapon: Weapon,
    steps: SearchSteps,
) -> ShotPlan {
    let min_power = if weapon == Weapon::Shotgun { 35.0 } else { 24.0 };
    let mut best: Option<ShotPlan> = None;
    for angle in grid(SEARCH_ANGLE_MIN, SEARCH_ANGLE_MAX, steps.angle) {
        for power in grid(min_power, POWER_MAX, steps.power) {
            let plan = evaluate(ctx, shooter, target, angle, power, weapon);
            if best.is_none_or(|b| plan.score < b.score) {
                best = Some(plan);
            }
        }
    }
    best.unwrap_or_else(|| evaluate(ctx, shooter, target, 45.0, 60.0, weapon))
}

/// Local search in a window of ±4 angle steps and ±5 power steps
pub fn refine(
    ctx: &SolveContext,
    shooter: Vec2,
    target: Vec2,
    seed: &ShotPlan,
    steps: SearchSteps,
) -> ShotPlan {
    let mut best = *seed;
    for i in -4..=4 {
        let angle = seed.angle + i as f32 * steps.angle;
        if !(REFINE_ANGLE_MIN..=REFINE_ANGLE_MAX).contains(&angle) {
            continue;
        }
        for j in -5..=5 {
            let power = seed.power + j as f32 * steps.power;
            if !(REFINE_POWER_MIN..=POWER_MAX).contains(&power) {
                continue;
            }
            let plan = evaluate(ctx, shooter, target, angle, power, seed.weapon);
            if plan.score < best.score {
                best = plan;
            }
        }
    }
    best
}

/// Refine repeatedly. The first pass uses half the coarse steps and each
/// further pass halves them again, down to 0.5.
pub fn refine_passes(
    ctx: &SolveContext,
    shooter: Vec2,
    target: Vec2,
    seed: &ShotPlan,
    steps: SearchSteps,
    passes: u32,
) -> ShotPlan {
    let mut plan = *seed;
    let mut steps = steps.halved();
    for _ in 0..passes {
        plan = refine(ctx, shooter, target, &plan, steps);
        steps = steps.halved();
    }
    plan
}

/// Best-effort aim straight at the target, with a wide random error
pub fn fallback_aim<R: Rng>(shooter: Vec2, target: Vec2, rng: &mut R) -> (f32, f32) {
    let angle = angle_toward(shooter, target) + (rng.random::<f32>() * 2.0 - 1.0) * 10.0;
    let dist = shooter.distance(target);
    let power = (dist * 0.24 + 30.0 + (rng.random::<f32>() * 2.0 - 1.0) * 14.0).clamp(20.0, 100.0);
    (crate::normalize_degrees(angle), power)
}

/// A solution kept between turns, tagged with the terrain it was solved on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolutionMemory {
    pub plan: ShotPlan,
    pub shooter: Vec2,
    pub target: Vec2,
    pub terrain_revision: u64,
}

impl SolutionMemory {
    /// Still applicable: same terrain, same weapon, shooter unmoved and
    /// target within the shift limit
    pub fn is_valid_for(&self, shooter: Vec2, target: Vec2, weapon: Weapon, revision: u64) -> bool {
        self.terrain_revision == revision
            && self.plan.weapon == weapon
            && self.shooter.distance(shooter) < 1.0
            && self.target.distance(target) < MEMORY_TARGET_SHIFT
    }
}

/// Solver with optional cross-turn memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotSolver {
    memory: Option<SolutionMemory>,
}

impl ShotSolver {
    /// Solve for `weapon`: coarse search, then refinement. A still-valid
    /// remembered solution is refined at half steps as a second seed and the
    /// better of the two is kept.
    pub fn solve(
        &self,
        ctx: &SolveContext,
        shooter: Vec2,
        target: Vec2,
        weapon: Weapon,
        steps: SearchSteps,
        passes: u32,
    ) -> ShotPlan {
        let mut seed = search(ctx, shooter, target, weapon, steps);
        if let Some(m) = self
            .memory
            .filter(|m| m.is_valid_for(shooter, target, weapon, ctx.terrain.revision()))
        {
            let start = evaluate(ctx, shooter, target, m.plan.angle, m.plan.power, weapon);
            let remembered = refine(ctx, shooter, target, &start, steps.halved());
            if remembered.score < seed.score {
                log::debug!(
                    "Remembered solution beat the search ({:.1} < {:.1})",
                    remembered.miss,
                    seed.miss
                );
                seed = remembered;
            }
        }
        refine_passes(ctx, shooter, target, &seed, steps, passes)
    }

    pub fn remember(&mut self, plan: ShotPlan, shooter: Vec2, target: Vec2, revision: u64) {
        self.memory = Some(SolutionMemory {
            plan,
            shooter,
            target,
            terrain_revision: revision,
        });
    }

    pub fn forget(&mut self) {
        self.memory = None;
    }

    pub fn memory(&self) -> Option<&SolutionMemory> {
        self.memory.as_ref()
    }
}
