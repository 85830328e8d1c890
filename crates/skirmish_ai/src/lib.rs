//! Skirmish AI
//!
//! Автономные боты для arena-шутера на Bevy 0.16 ECS.
//!
//! Слои:
//! - ai: контроллер бота (FSM, perception, targeting, navigation, combat, stuck recovery)
//! - arena: headless collaborator (геометрия, pickups, резолв действий, aids)
//! - physics: интеграция MovementIntent (headless integrator или Rapier bridge)
//!
//! Контроллер не двигает тела сам: пишет MovementIntent и события,
//! остальное делают collaborators. Всё в FixedUpdate 60Hz, RNG seeded.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod arena;
pub mod components;
pub mod config;
pub mod logger;
pub mod physics;

// Re-export базовых типов для удобства
pub use ai::{
    AIPlugin, BotBrain, BotState, BotStateKind, BotSystems, PersonalityProfile, StateTransition,
};
pub use arena::{ArenaGeometry, ArenaPlugin, DamageDealt};
pub use components::*;
pub use config::{BotTuning, ConfigError};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, LogLevel};
pub use physics::{HeadlessPhysicsPlugin, RapierBridgePlugin};

use ai::stuck::{StuckMonitor, StuckPhase};

/// Частота симуляции (Hz)
pub const TICK_RATE: f64 = 60.0;

/// Главный plugin симуляции: AI + headless арена + headless физика
#[derive(Default)]
pub struct SimulationPlugin {
    pub geometry: ArenaGeometry,
}

impl SimulationPlugin {
    pub fn new(geometry: ArenaGeometry) -> Self {
        Self { geometry }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Seed из create_headless_app не перетираем
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(TICK_RATE))
            .add_plugins((
                AIPlugin,
                ArenaPlugin::new(self.geometry.clone()),
                HeadlessPhysicsPlugin,
            ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигается вручную: каждый `app.update()` = ровно один fixed tick
/// (первый update только инициализирует часы).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICK_RATE)) // 60Hz FixedUpdate
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICK_RATE,
        )));

    app
}

/// Срез одного бота на текущий tick (determinism-сравнения, статус матча)
#[derive(Debug, Clone, PartialEq)]
pub struct BotSnapshot {
    pub entity: Entity,
    pub position: Vec3,
    pub health: u32,
    /// None — brain снят (мёртв, ждёт respawn)
    pub state: Option<BotStateKind>,
    pub target: Option<Entity>,
    pub stuck: StuckPhase,
    pub held: Option<ActionKind>,
}

impl std::fmt::Display for BotSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.map(|kind| kind.name()).unwrap_or("Dead");
        let held = self.held.map(|kind| kind.as_str()).unwrap_or("-");
        write!(f, "{}:{}({}hp, {}", self.entity, state, self.health, held)?;
        if self.stuck != StuckPhase::Normal {
            write!(f, ", {:?}", self.stuck)?;
        }
        write!(f, ")")
    }
}

/// Все боты мира, отсортированы по Entity (порядок query не детерминирован)
pub fn bot_snapshots(world: &mut World) -> Vec<BotSnapshot> {
    let mut query = world.query_filtered::<
        (
            Entity,
            &Transform,
            &Health,
            &HeldAction,
            Option<&BotState>,
            Option<&StuckMonitor>,
        ),
        With<BotAgent>,
    >();

    let mut bots: Vec<BotSnapshot> = query
        .iter(world)
        .map(|(entity, transform, health, held, state, monitor)| BotSnapshot {
            entity,
            position: transform.translation,
            health: health.current,
            state: state.map(BotState::kind),
            target: state.and_then(BotState::target_entity),
            stuck: monitor.map(StuckMonitor::phase).unwrap_or_default(),
            held: held.spec().map(|spec| spec.kind),
        })
        .collect();
    bots.sort_by_key(|bot| bot.entity);
    bots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::spawn_bot;

    #[test]
    fn test_bot_snapshots_sorted_with_brain_and_stuck_phase() {
        let mut app = create_headless_app(1);
        app.add_plugins(SimulationPlugin::new(ArenaGeometry::flat(20.0)));
        let hammer = Some(ActionSpec::hammer());
        let armed = spawn_bot(&mut app.world_mut().commands(), Vec3::X * 3.0, 1, hammer);
        let unarmed = spawn_bot(&mut app.world_mut().commands(), Vec3::X * -3.0, 2, None);
        app.update();
        app.update();

        let bots = bot_snapshots(app.world_mut());
        assert_eq!(bots.len(), 2);
        assert!(bots[0].entity < bots[1].entity);

        let armed = bots.iter().find(|bot| bot.entity == armed).expect("armed bot");
        assert_eq!(armed.held, Some(ActionKind::Hammer));
        assert!(armed.state.is_some());
        assert_eq!(armed.stuck, StuckPhase::Normal);

        let unarmed = bots.iter().find(|bot| bot.entity == unarmed).expect("unarmed bot");
        assert_eq!(unarmed.held, None);
        assert!(unarmed.to_string().contains("hp, -"));
    }
}
