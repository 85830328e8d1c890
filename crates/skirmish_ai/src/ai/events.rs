//! AI Events — исходящие события контроллера
//!
//! StateTransition — human-readable trace для логов/диагностики.
//! ActionTriggered / ChargeStarted — вызовы action collaborator'а.
//! ForcedRelocation — телепорт выполняет физика (она владеет позицией).

use bevy::prelude::*;

use super::components::{BotStateKind, TargetRef};
use crate::components::{ActionKind, TriggeredAction};

/// Смена состояния FSM
#[derive(Event, Debug, Clone)]
pub struct StateTransition {
    pub agent: Entity,
    pub from: BotStateKind,
    pub to: BotStateKind,
    pub reason: &'static str,
    /// Текущая цель нового состояния (если есть)
    pub target: Option<TargetRef>,
}

impl std::fmt::Display for StateTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} → {} ({})", self.agent, self.from, self.to, self.reason)?;
        if let Some(target) = &self.target {
            write!(f, " target={}", target)?;
        }
        Ok(())
    }
}

/// Action использован (trigger)
#[derive(Event, Debug, Clone)]
pub struct ActionTriggered {
    pub agent: Entity,
    pub target: Option<Entity>,
    pub origin: Vec3,
    pub aim_point: Vec3,
    pub action: TriggeredAction,
}

/// Начат заряд chargeable action
#[derive(Event, Debug, Clone)]
pub struct ChargeStarted {
    pub agent: Entity,
    pub kind: ActionKind,
    pub max_duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum RelocationReason {
    /// Последний шаг stuck recovery
    Stuck,
    Respawn,
    /// Teleporter арены
    Teleport,
}

/// Телепорт агента (вне обычного steering)
#[derive(Event, Debug, Clone)]
pub struct ForcedRelocation {
    pub agent: Entity,
    pub from: Vec3,
    pub to: Vec3,
    pub reason: RelocationReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_trace_is_readable() {
        let event = StateTransition {
            agent: Entity::from_raw(4),
            from: BotStateKind::Explore,
            to: BotStateKind::Attack,
            reason: "target in engagement range",
            target: Some(TargetRef::new(Entity::from_raw(9), Vec3::new(1.0, 0.0, -2.0))),
        };
        let text = event.to_string();
        assert!(text.contains("Explore → Attack"), "{text}");
        assert!(text.contains("target in engagement range"), "{text}");
        assert!(text.contains("(1.0, 0.0, -2.0)"), "{text}");
    }
}
