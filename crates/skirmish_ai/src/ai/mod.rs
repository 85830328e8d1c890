//! Bot AI — agent controller
//!
//! StateMachine (priority rules + hysteresis) поверх PerceptionCache,
//! TargetSelector, NavigationController, CombatController и
//! StuckRecoveryMonitor. Чистая логика — в модулях верхнего уровня,
//! ECS обвязка — в `systems`.

use bevy::prelude::*;

pub mod combat;
pub mod components;
pub mod events;
pub mod navigation;
pub mod perception;
pub mod stuck;
pub mod systems;
pub mod targeting;
pub mod transitions;
pub mod traversal;

// Re-export основных типов
pub use combat::{CombatCommand, CombatState};
pub use components::*;
pub use events::{
    ActionTriggered, ChargeStarted, ForcedRelocation, RelocationReason, StateTransition,
};
pub use navigation::{NavigationFeedback, OpenGround, ProbeHit, WorldProbe, WorldProbes};
pub use perception::{PerceptionCache, PerceptionCategory, SpatialRegistry, WorldRegistry};
pub use stuck::{RecoveryAction, StuckMonitor, StuckPhase};
pub use systems::{AwaitingRespawn, RESPAWN_DELAY};
pub use traversal::{AidAwareTraversal, ArenaTraversal, NoTraversal, TraversalStrategy};

use crate::config::BotTuning;

/// Системы контроллера (физика и арена упорядочиваются относительно этого set)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BotSystems;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate для детерминизма.
/// Порядок выполнения:
/// 0. attach_bot_brains — brain для только что заспавненных ботов
/// 1. tick_bot_timers — cooldown'ы и таймеры
/// 2. refresh_perception — throttled refresh кэша
/// 3. evaluate_bot_states — priority rules → BotState
/// 4. steer_bots — BotState → MovementIntent
/// 5. drive_bot_combat — held action (charge/trigger)
/// 6. monitor_stuck_bots — stuck detection, override intent
/// 7. handle_bot_deaths / respawn_bots — lifecycle
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BotTuning>()
            .init_resource::<WorldProbes>()
            .init_resource::<TraversalStrategy>()
            .add_event::<StateTransition>()
            .add_event::<ActionTriggered>()
            .add_event::<ChargeStarted>()
            .add_event::<ForcedRelocation>()
            .register_type::<BotState>()
            .register_type::<PersonalityProfile>()
            .register_type::<BotTimers>()
            .add_systems(
                FixedUpdate,
                (
                    systems::attach_bot_brains,
                    systems::tick_bot_timers,
                    systems::refresh_perception,
                    systems::evaluate_bot_states,
                    systems::steer_bots,
                    systems::drive_bot_combat,
                    systems::monitor_stuck_bots,
                    systems::handle_bot_deaths,
                    systems::respawn_bots,
                )
                    .chain() // Последовательное выполнение для детерминизма
                    .in_set(BotSystems),
            );
    }
}
