//! Базовые компоненты акторов: Actor, Health, BotAgent

use bevy::prelude::*;

use super::equipment::HeldAction;
use super::movement::{BodyTraits, BodyVelocity, MovementIntent};

/// Актор (bot или человек) — базовый компонент для участников арены
///
/// Автоматически добавляет Health и Transform через Required Components.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(Health, Transform)]
pub struct Actor {
    /// Команда: актёры с разными team_id — противники
    pub team_id: u64,
}

impl Actor {
    pub fn new(team_id: u64) -> Self {
        Self { team_id }
    }

    pub fn is_hostile_to(&self, other: &Actor) -> bool {
        self.team_id != other.team_id
    }
}

/// Marker: актор управляется AI контроллером (у людей его нет)
///
/// Brain (BotBrain) навешивается системой `attach_bot_brains` на первом тике.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Actor, MovementIntent, BodyVelocity, BodyTraits, HeldAction)]
pub struct BotAgent;

/// Здоровье актора
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(3) // Arena default: three hits
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn with_current(max: u32, current: u32) -> Self {
        Self {
            current: current.min(max),
            max,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }
}
