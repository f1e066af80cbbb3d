//! Combatant body physics: walking, jumping, falling, sliding
//!
//! Bodies are circles resting on the terrain surface. Grounded bodies follow
//! the surface and bleed speed through slope-dependent friction; airborne
//! bodies integrate gravity and land on the first solid cell under their feet.

use serde::Serialize;

use super::state::Combatant;
use super::terrain::Terrain;
use crate::tuning::PhysicsConfig;

/// Per-tick locomotion request for one combatant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drive {
    /// -1, 0 or +1
    pub dir: i8,
    /// Jump with this horizontal hop direction
    pub jump: Option<i8>,
}

/// A landing from the air
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Landing {
    pub index: usize,
    /// Effective drop height for fall damage
    pub drop: f32,
    /// Vertical speed at impact
    pub impact_vy: f32,
}

/// Whether the body has solid ground directly under its feet
#[inline]
pub fn is_grounded(c: &Combatant, terrain: &Terrain, radius: f32) -> bool {
    terrain.is_solid(c.pos.x, c.pos.y + radius + 1.0)
}

/// Start a jump if the body is (or was very recently) on the ground and the
/// cooldown has elapsed. Returns true if the jump started.
pub fn try_jump(
    c: &mut Combatant,
    terrain: &Terrain,
    hop: i8,
    now: u64,
    cfg: &PhysicsConfig,
) -> bool {
    if c.is_ragdolled(now) || c.drowning.is_some() {
        return false;
    }
    let grounded = is_grounded(c, terrain, cfg.player_radius);
    let coyote = now.saturating_sub(c.last_grounded_tick) <= cfg.coyote_ticks as u64;
    if !grounded && !coyote {
        return false;
    }
    if c
        .last_jump_tick
        .is_some_and(|t| now.saturating_sub(t) < cfg.jump_cooldown_ticks as u64)
    {
        return false;
    }
    c.vel.y = cfg.jump_velocity;
    c.vel.x += hop.signum() as f32 * cfg.hop_boost;
    if hop != 0 {
        c.facing = hop.signum() as f32;
    }
    c.pos.y -= 1.0;
    c.last_jump_tick = Some(now);
    true
}

/// Advance one combatant by one tick. `water_level` is the waterline y when
/// the hazard is active. Returns a landing if the body touched down.
pub fn step_body(
    c: &mut Combatant,
    terrain: &Terrain,
    drive: Drive,
    water_level: Option<f32>,
    now: u64,
    cfg: &PhysicsConfig,
) -> Option<Landing> {
    let r = cfg.player_radius;
    let w = terrain.width() as f32;
    let h = terrain.height() as f32;

    if c.ragdoll.is_some_and(|rd| now >= rd.until) {
        c.ragdoll = None;
    }
    c.slide_boost *= cfg.slide_decay;
    if c.slide_boost < 0.08 {
        c.slide_boost = 0.0;
    }

    if c.drowning.is_some() {
        c.vel.x *= 0.92;
        c.vel.y = 0.0;
        if let Some(level) = water_level {
            c.pos.y = c.pos.y.min(level - r - 1.5);
        }
        c.pos.x += c.vel.x;
        c.pos.x = c.pos.x.clamp(r, w - r);
        return None;
    }

    let ragdolled = c.is_ragdolled(now);
    if !ragdolled {
        if let Some(hop) = drive.jump {
            try_jump(c, terrain, hop, now, cfg);
        }
        if drive.dir != 0 {
            let dir = drive.dir.signum() as f32;
            c.facing = dir;
            c.vel.x = (c.vel.x + dir * cfg.move_accel)
                .clamp(-cfg.move_max_speed, cfg.move_max_speed);
        }
    }

    let mut landing = None;
    let on_solid = is_grounded(c, terrain, r) && c.vel.y >= 0.0;

    if !on_solid {
        c.vel.y += cfg.gravity;
        c.pos.y += c.vel.y;
        c.pos.x += c.vel.x;
        if ragdolled {
            c.vel.x *= c.ragdoll.map_or(1.0, |rd| rd.air_drag);
        }

        if c.vel.y < 0.0 {
            bump_head(c, terrain, r);
        }

        let ground = terrain.surface_y_near(c.pos.x, c.pos.y + r);
        if ground < h && c.pos.y + r > ground {
            let over = c.pos.y + r - ground;
            let impact_vy = c.vel.y;
            c.pos.y = ground - r;
            c.vel.y = 0.0;
            c.vel.x *= if ragdolled { 0.82 } else { 0.45 };
            let drop = (impact_vy * 8.0 + over).abs();
            if drop > 49.0 {
                c.slide_boost = c.slide_boost.max(drop * 0.015).min(cfg.slide_boost_max);
            }
            c.last_grounded_tick = now;
            landing = Some(Landing {
                index: c.index,
                drop,
                impact_vy,
            });
        }
    } else {
        if c.vel.y > cfg.gravity * 2.0 {
            let impact_vy = c.vel.y;
            c.vel.x *= if ragdolled { 0.82 } else { 0.45 };
            landing = Some(Landing {
                index: c.index,
                drop: (impact_vy * 8.0).abs(),
                impact_vy,
            });
        }
        let ground = terrain.surface_y_near(c.pos.x, c.pos.y + r + 1.0);
        if ground < h {
            c.pos.y = ground - r;
        }
        let ix = c.pos.x.floor() as i64;
        let slope =
            (terrain.ground_height(ix + 2) as f32 - terrain.ground_height(ix - 2) as f32) / 4.0;
        if slope.abs() > 0.5 {
            c.pos.x += slope * 0.25;
        }

        c.pos.x += c.vel.x;
        let ground = terrain.surface_y_near(c.pos.x, c.pos.y + r + 1.0);
        if ground < h {
            c.pos.y = ground - r;
        }

        let mut friction: f32 = if slope.abs() < 0.15 {
            0.985
        } else if slope.abs() < 0.45 {
            0.9
        } else {
            0.82
        };
        if drive.dir == 0 && !ragdolled {
            friction = friction.min(cfg.ground_friction);
        }
        if c.slide_boost > 0.0 {
            friction = (friction - 0.28 * (c.slide_boost / cfg.slide_boost_max).min(1.0)).max(0.58);
        }
        if ragdolled {
            friction = friction.min(0.8);
        }
        c.vel.x *= friction;
        c.vel.y = 0.0;
        if ragdolled && c.vel.x.abs() < 0.24 {
            c.ragdoll = None;
        }
        c.last_grounded_tick = now;
    }

    c.pos.x = c.pos.x.clamp(r, w - r);
    if c.pos.y + r > h {
        c.pos.y = h - r;
    }
    landing
}

/// Push a rising body back down out of overhanging terrain
fn bump_head(c: &mut Combatant, terrain: &Terrain, r: f32) {
    let offsets = [0.0, -r * 0.55, r * 0.55];
    let hit = |c: &Combatant| {
        let head_y = c.pos.y - r - 1.0;
        offsets
            .iter()
            .any(|dx| terrain.cell_solid((c.pos.x + dx).floor() as i64, head_y.floor() as i64))
    };
    if !hit(c) {
        return;
    }
    let mut guard = (r * 2.0) as u32;
    while guard > 0 && hit(c) {
        c.pos.y += 0.5;
        guard -= 1;
    }
    c.vel.y = 0.0;
}
