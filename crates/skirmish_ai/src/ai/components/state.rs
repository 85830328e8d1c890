//! Bot FSM state + per-behavior timers.

use bevy::prelude::*;

/// Weak reference на объект мира: entity + последняя известная позиция.
///
/// Перед использованием позиции entity надо перепроверить через registry —
/// объект мог исчезнуть после последнего refresh.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TargetRef {
    pub entity: Entity,
    pub last_known: Vec3,
}

impl TargetRef {
    pub fn new(entity: Entity, last_known: Vec3) -> Self {
        Self { entity, last_known }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ ({:.1}, {:.1}, {:.1})",
            self.entity, self.last_known.x, self.last_known.y, self.last_known.z
        )
    }
}

/// Bot FSM состояния (priority-ordered, см. `BotStateKind::priority`)
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub enum BotState {
    /// Explore — дефолт: блуждание по арене
    Explore {
        /// Время до смены wander точки
        wander_timer: f32,
        destination: Option<Vec3>,
    },

    /// Retreat — отступление при низком health
    Retreat {
        /// Сколько ещё отступаем (секунды)
        remaining: f32,
        /// От кого отступаем (опционально)
        from: Option<TargetRef>,
        /// Точка отступления (выбрана при входе)
        destination: Vec3,
        /// Traversal aid по пути (hook)
        via: Option<Entity>,
    },

    /// CollectGoalItem — подобрать action, когда руки пусты
    CollectGoalItem { item: TargetRef },

    /// Attack — цель в engagement range
    Attack { target: TargetRef },

    /// Chase — цель в awareness range
    Chase { target: TargetRef, via: Option<Entity> },

    /// CollectResource — opportunistic pickup
    CollectResource { item: TargetRef },

    /// UseTraversal — arena-specific (вставляется hook'ом между 5 и 6)
    UseTraversal { aid: TargetRef },
}

impl Default for BotState {
    fn default() -> Self {
        Self::Explore {
            wander_timer: 0.0,
            destination: None,
        }
    }
}

impl BotState {
    pub fn kind(&self) -> BotStateKind {
        match self {
            BotState::Explore { .. } => BotStateKind::Explore,
            BotState::Retreat { .. } => BotStateKind::Retreat,
            BotState::CollectGoalItem { .. } => BotStateKind::CollectGoalItem,
            BotState::Attack { .. } => BotStateKind::Attack,
            BotState::Chase { .. } => BotStateKind::Chase,
            BotState::CollectResource { .. } => BotStateKind::CollectResource,
            BotState::UseTraversal { .. } => BotStateKind::UseTraversal,
        }
    }

    /// Объект, к которому привязано состояние (цель, item, aid)
    pub fn target(&self) -> Option<TargetRef> {
        match self {
            BotState::Retreat { from, .. } => *from,
            BotState::CollectGoalItem { item } | BotState::CollectResource { item } => Some(*item),
            BotState::Attack { target } | BotState::Chase { target, .. } => Some(*target),
            BotState::UseTraversal { aid } => Some(*aid),
            BotState::Explore { .. } => None,
        }
    }

    pub fn target_entity(&self) -> Option<Entity> {
        self.target().map(|target| target.entity)
    }

    /// Hostile цель (Attack/Chase)
    pub fn hostile_target(&self) -> Option<TargetRef> {
        match self {
            BotState::Attack { target } | BotState::Chase { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Дискриминант состояния (для событий, логов, сравнений)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum BotStateKind {
    Retreat,
    CollectGoalItem,
    Attack,
    Chase,
    CollectResource,
    UseTraversal,
    Explore,
}

impl BotStateKind {
    pub fn name(&self) -> &'static str {
        match self {
            BotStateKind::Retreat => "Retreat",
            BotStateKind::CollectGoalItem => "CollectGoalItem",
            BotStateKind::Attack => "Attack",
            BotStateKind::Chase => "Chase",
            BotStateKind::CollectResource => "CollectResource",
            BotStateKind::UseTraversal => "UseTraversal",
            BotStateKind::Explore => "Explore",
        }
    }

    /// 1 = высший приоритет. UseTraversal — hook tier между 5 и 6
    pub fn priority(&self) -> u8 {
        match self {
            BotStateKind::Retreat => 1,
            BotStateKind::CollectGoalItem => 2,
            BotStateKind::Attack => 3,
            BotStateKind::Chase => 4,
            BotStateKind::CollectResource => 5,
            BotStateKind::UseTraversal => 6,
            BotStateKind::Explore => 7,
        }
    }
}

impl std::fmt::Display for BotStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Таймеры поведения
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct BotTimers {
    /// Cooldown до следующего Retreat (секунды)
    pub retreat_cooldown: f32,
    /// Сколько бот в текущем состоянии (секунды)
    pub state_elapsed: f32,
}

impl BotTimers {
    pub fn tick(&mut self, delta: f32) {
        self.retreat_cooldown = (self.retreat_cooldown - delta).max(0.0);
        self.state_elapsed += delta;
    }

    pub fn retreat_on_cooldown(&self) -> bool {
        self.retreat_cooldown > 0.0
    }
}
