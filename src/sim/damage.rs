//! Damage, knockback and status effects
//!
//! All HP changes go through [`apply_damage`], which clamps at zero. Knockback
//! goes through [`apply_impact`]: ragdoll and stun durations only ever extend
//! (the later end tick wins), and a drowning combatant ignores impacts.

use glam::Vec2;

use super::collision::push_direction;
use super::projectile::{Impact, Shot};
use super::state::{Combatant, DamageCause, GameEvent, MatchState, Ragdoll, StunReason};
use crate::tuning::PhysicsConfig;

/// Knockback applied alongside damage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    pub impulse: Vec2,
    pub ragdoll_ticks: u32,
    pub slide_boost: f32,
    pub stun: Option<(u32, StunReason)>,
}

/// Splash damage for a combatant `distance` from a blast of `radius`
pub fn splash_falloff(distance: f32, radius: f32, max_damage: i32) -> i32 {
    if radius <= 0.0 || distance >= radius {
        return 0;
    }
    let scale = (1.0 - distance / radius).max(0.0);
    (scale * max_damage as f32).round() as i32
}

/// Apply an impulse and status effects to one combatant
pub fn apply_impact(c: &mut Combatant, kb: &Knockback, now: u64, cfg: &PhysicsConfig) {
    if c.drowning.is_some() {
        return;
    }
    c.vel += kb.impulse;

    let until = now + kb.ragdoll_ticks as u64;
    let until = match c.ragdoll {
        Some(r) if r.until > until => r.until,
        _ => until,
    };
    c.ragdoll = Some(Ragdoll {
        until,
        air_drag: cfg.ragdoll_air_drag,
    });

    let boost = if kb.slide_boost > 0.0 {
        kb.slide_boost
    } else {
        kb.impulse.x.abs() * 0.7
    };
    c.slide_boost = c.slide_boost.max(boost).min(cfg.slide_boost_max);

    if let Some((ticks, reason)) = kb.stun {
        let lock = now + ticks as u64;
        if lock > c.turn_locked_until {
            c.turn_locked_until = lock;
            c.stun_reason = Some(reason);
        }
    }
}

/// Subtract HP (clamped at zero), record stats, and optionally knock back.
/// Returns the damage actually dealt.
pub fn apply_damage(
    state: &mut MatchState,
    target: usize,
    amount: i32,
    cause: DamageCause,
    attacker: Option<usize>,
    knockback: Option<Knockback>,
) -> i32 {
    let now = state.time_ticks;
    let Some(c) = state.combatants.get_mut(target) else {
        return 0;
    };
    if c.drowning.is_some() {
        return 0;
    }

    let dealt = amount.clamp(0, c.hp.max(0));
    c.hp -= dealt;
    if let Some(kb) = knockback {
        apply_impact(c, &kb, now, &state.physics);
        if let Some((_, reason)) = kb.stun {
            state.events.push(GameEvent::Stunned {
                index: target,
                reason,
            });
        }
    }

    if dealt > 0 {
        log::debug!(
            "{} took {} damage ({:?}), hp {}",
            state.combatants[target].name,
            dealt,
            cause,
            state.combatants[target].hp
        );
        state.events.push(GameEvent::Damaged {
            target,
            amount: dealt,
            cause,
        });
        if let Some(attacker) = attacker.filter(|&a| a != target) {
            state.stats.record_hit(attacker, dealt);
        }
    }
    dealt
}

/// Damage and knock back every live combatant within `radius` of `center`.
/// Returns the total damage dealt.
pub fn apply_splash_damage(
    state: &mut MatchState,
    center: Vec2,
    radius: f32,
    max_damage: i32,
    exclude: Option<usize>,
    attacker: Option<usize>,
) -> i32 {
    let now = state.time_ticks;
    let cfg = state.physics.clone();
    let mut total = 0;

    for index in 0..state.combatants.len() {
        if exclude == Some(index) || !state.combatants[index].is_targetable() {
            continue;
        }
        let pos = state.combatants[index].pos;
        let distance = center.distance(pos);
        if distance >= radius {
            continue;
        }
        let scale = (1.0 - distance / radius).max(0.0);
        let dir = push_direction(center, pos);
        let impulse = Vec2::new(
            dir.x * cfg.knockback_x * scale,
            dir.y * cfg.knockback_y * scale - cfg.knockback_lift,
        );
        let damage = splash_falloff(distance, radius, max_damage);

        if damage > 0 {
            let kb = Knockback {
                impulse,
                ragdoll_ticks: cfg.ragdoll_min_ticks
                    + (cfg.ragdoll_splash_bonus_ticks as f32 * scale).round() as u32,
                slide_boost: 6.0 * scale,
                stun: None,
            };
            total += apply_damage(state, index, damage, DamageCause::Splash, attacker, Some(kb));
        } else {
            let kb = Knockback {
                impulse,
                ragdoll_ticks: (cfg.ragdoll_min_ticks as f32 * 0.8).round() as u32,
                slide_boost: 3.0 * scale,
                stun: None,
            };
            apply_impact(&mut state.combatants[index], &kb, now, &cfg);
        }
    }
    total
}

/// Carve a crater and apply splash damage
pub fn explode(
    state: &mut MatchState,
    center: Vec2,
    radius: f32,
    exclude: Option<usize>,
    attacker: Option<usize>,
) -> i32 {
    state.terrain.carve(center.x, center.y, radius);
    state.events.push(GameEvent::Explosion {
        pos: center,
        radius,
    });
    let max = state.physics.splash_max_damage;
    apply_splash_damage(state, center, radius, max, exclude, attacker)
}

/// Apply the consequences of a projectile impact
pub fn resolve_impact(state: &mut MatchState, shot: &mut Shot, impact: Impact) {
    let cfg = state.physics.clone();
    let owner = Some(shot.owner);

    match impact {
        Impact::DirectHit { target, pos, vel } => {
            let kb = Knockback {
                impulse: Vec2::new(
                    vel.x * cfg.direct_impulse_x,
                    vel.y * cfg.direct_impulse_y - 0.4,
                ),
                ragdoll_ticks: cfg.ragdoll_min_ticks + cfg.ragdoll_direct_bonus_ticks,
                slide_boost: 5.2,
                stun: Some((cfg.blast_stun_ticks, StunReason::Dazed)),
            };
            apply_damage(
                state,
                target,
                cfg.direct_hit_damage,
                DamageCause::Direct,
                owner,
                Some(kb),
            );
            explode(state, pos, cfg.explosion_radius, Some(target), owner);
        }
        Impact::TerrainHit { pos } => {
            explode(state, pos, cfg.explosion_radius, None, owner);
        }
        Impact::Detonation { pos } => {
            explode(state, pos, cfg.explosion_radius * cfg.fused_radius_scale, None, owner);
        }
        Impact::Bounce { pos } => {
            state.events.push(GameEvent::Bounce { pos });
        }
        Impact::PelletHit { target, pos, vel } => {
            let budget = (cfg.cluster_damage_cap - shot.damage_dealt).max(0);
            let hit = cfg.pellet_damage.min(budget);
            if hit > 0 {
                let dir = push_direction(pos, state.combatants[target].pos);
                let speed = vel.length();
                let kb = Knockback {
                    impulse: Vec2::new(dir.x * speed * 0.55, dir.y * speed * 0.35 - 0.15),
                    ragdoll_ticks: cfg.ragdoll_pellet_ticks,
                    slide_boost: 3.0,
                    stun: None,
                };
                shot.damage_dealt +=
                    apply_damage(state, target, hit, DamageCause::Pellet, owner, Some(kb));
            }
        }
        Impact::PelletTerrain { pos } => {
            state
                .terrain
                .carve(pos.x, pos.y, cfg.pellet_crater_radius);
            let exclude = shot
                .target
                .filter(|_| shot.damage_dealt >= cfg.cluster_damage_cap);
            apply_splash_damage(
                state,
                pos,
                cfg.pellet_splash_radius,
                cfg.splash_max_damage,
                exclude,
                owner,
            );
        }
        Impact::Splashdown { pos } => {
            state.events.push(GameEvent::Splashdown { pos });
        }
        Impact::Fizzle { pos } => {
            state.events.push(GameEvent::Fizzle { pos });
        }
    }
}

/// Fall damage for a landing after dropping `drop` pixels.
/// Returns true if the combatant was stunned.
pub fn apply_fall_damage(state: &mut MatchState, index: usize, drop: f32, impact_vy: f32) -> bool {
    if !state.settings.fall_damage {
        return false;
    }
    let cfg = state.physics.clone();
    if drop <= cfg.fall_safe_drop {
        return false;
    }
    let damage = (((drop - cfg.fall_safe_drop) / cfg.fall_damage_divisor).round() as i32)
        .min(cfg.fall_max_damage);
    if damage <= 0 {
        return false;
    }
    let vx = state.combatants[index].vel.x;
    let kb = Knockback {
        impulse: Vec2::new(vx * 0.4, -impact_vy.abs() * 0.3),
        ragdoll_ticks: (cfg.ragdoll_min_ticks as f32 * 0.9).round() as u32,
        slide_boost: (drop * 0.02).min(7.0),
        stun: Some((cfg.fall_stun_ticks, StunReason::Winded)),
    };
    apply_damage(state, index, damage, DamageCause::Fall, None, Some(kb)) > 0
}
