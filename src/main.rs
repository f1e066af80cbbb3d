//! Crater Duel headless demo
//!
//! Plays a computer-versus-computer match and logs the result.
//! Usage: `crater-duel [seed] [easy|medium|hard] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use crater_duel::consts::SIM_DT;
    use crater_duel::settings::{Controller, Difficulty, MatchSettings};
    use crater_duel::sim::GameEvent;
    use crater_duel::{PhysicsConfig, Session};

    env_logger::init();
    log::info!("Crater Duel (headless) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut settings = match args.get(2) {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(json) => MatchSettings::load_or_default(&json),
            Err(e) => {
                log::warn!("Could not read {}: {}, using defaults", path, e);
                MatchSettings::default()
            }
        },
        None => MatchSettings::default(),
    };
    if let Some(seed) = args.first() {
        settings.seed = seed.clone();
    }
    if let Some(name) = args.get(1) {
        match Difficulty::from_str(name) {
            Some(d) => settings.difficulty = d,
            None => log::warn!(
                "Unknown difficulty {:?}, keeping {}",
                name,
                settings.difficulty.as_str()
            ),
        }
    }
    settings.controllers = [Controller::Computer, Controller::Computer];

    // Ten simulated minutes
    const TICK_LIMIT: u64 = 60 * 60 * 10;

    let mut session = Session::new(settings, PhysicsConfig::default());
    while !session.is_over() && session.state().time_ticks < TICK_LIMIT {
        session.advance(SIM_DT);
        for event in session.drain_events() {
            match event {
                GameEvent::Damaged { target, amount, cause } => {
                    log::info!("  P{} took {} ({:?})", target + 1, amount, cause)
                }
                GameEvent::TurnSkipped { index } => log::info!("  P{} skips a turn", index + 1),
                _ => {}
            }
        }
    }

    let state = session.state();
    match session.winner() {
        Some(i) => log::info!(
            "{} wins after {} turns",
            state.combatants[i].name,
            state.turn_number
        ),
        None if session.is_over() => log::info!("Draw after {} turns", state.turn_number),
        None => log::warn!("No result after {} ticks", TICK_LIMIT),
    }
    for c in &state.combatants {
        log::info!("{} ({} hp): {}", c.name, c.hp, state.stats.summary(c.index));
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is embedded by a host page; nothing to run here
}
