//! PersonalityProfile — черты характера бота.
//!
//! Генерируется один раз при спавне (`PersonalityProfile::generate`), дальше
//! только читается: полей с `&mut` доступом нет. На респавне создаётся новый.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::ActionKind;
use crate::config::CombatTuning;

/// Стратегический архетип
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum Archetype {
    Aggressive,
    Defensive,
    Support,
    Balanced,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Aggressive,
        Archetype::Defensive,
        Archetype::Support,
        Archetype::Balanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Aggressive => "aggressive",
            Archetype::Defensive => "defensive",
            Archetype::Support => "support",
            Archetype::Balanced => "balanced",
        }
    }

    /// Предпочитает ли архетип этот action kind
    pub fn prefers(&self, kind: ActionKind) -> bool {
        match self {
            Archetype::Aggressive => matches!(kind, ActionKind::Hammer | ActionKind::Rocket),
            Archetype::Defensive => matches!(kind, ActionKind::Railgun | ActionKind::Blaster),
            Archetype::Support => matches!(kind, ActionKind::Shockwave | ActionKind::Blaster),
            Archetype::Balanced => false,
        }
    }

    /// Множитель вероятности pre-charge
    fn charge_bias(&self) -> f32 {
        match self {
            Archetype::Aggressive => 1.4,
            Archetype::Defensive => 1.2,
            Archetype::Support => 0.8,
            Archetype::Balanced => 1.0,
        }
    }
}

/// Per-agent trait bundle (immutable после создания)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct PersonalityProfile {
    skill: f32,
    aim_accuracy: f32,
    turn_rate: f32,
    caution: f32,
    archetype: Archetype,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self::new(0.5, 0.5, 1.0, 0.5, Archetype::Balanced)
    }
}

impl PersonalityProfile {
    pub const TURN_RATE_MIN: f32 = 0.6;
    pub const TURN_RATE_MAX: f32 = 1.5;

    /// Значения клампятся в допустимые диапазоны
    pub fn new(
        skill: f32,
        aim_accuracy: f32,
        turn_rate: f32,
        caution: f32,
        archetype: Archetype,
    ) -> Self {
        Self {
            skill: skill.clamp(0.0, 1.0),
            aim_accuracy: aim_accuracy.clamp(0.0, 1.0),
            turn_rate: turn_rate.clamp(Self::TURN_RATE_MIN, Self::TURN_RATE_MAX),
            caution: caution.clamp(0.0, 1.0),
            archetype,
        }
    }

    /// Случайный профиль (spawn time)
    pub fn generate(rng: &mut impl Rng) -> Self {
        let archetype = Archetype::ALL[rng.gen_range(0..Archetype::ALL.len())];
        Self::new(
            rng.gen_range(0.0..=1.0),
            rng.gen_range(0.0..=1.0),
            rng.gen_range(Self::TURN_RATE_MIN..=Self::TURN_RATE_MAX),
            rng.gen_range(0.0..=1.0),
            archetype,
        )
    }

    pub fn skill(&self) -> f32 {
        self.skill
    }

    pub fn aim_accuracy(&self) -> f32 {
        self.aim_accuracy
    }

    pub fn turn_rate(&self) -> f32 {
        self.turn_rate
    }

    pub fn caution(&self) -> f32 {
        self.caution
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Lead prediction разрешён только компетентным ботам
    pub fn can_lead(&self, tuning: &CombatTuning) -> bool {
        self.skill > tuning.lead_skill_threshold
    }

    /// accuracy_factor = lerp(min, max, aim_accuracy)
    pub fn lead_accuracy_factor(&self, tuning: &CombatTuning) -> f32 {
        tuning.accuracy_min + (tuning.accuracy_max - tuning.accuracy_min) * self.aim_accuracy
    }

    /// base + (1 − skill) × spread ± jitter
    pub fn strafe_interval(&self, tuning: &CombatTuning, rng: &mut impl Rng) -> f32 {
        let jitter = if tuning.strafe_jitter > 0.0 {
            rng.gen_range(-tuning.strafe_jitter..=tuning.strafe_jitter)
        } else {
            0.0
        };
        (tuning.strafe_base + (1.0 - self.skill) * tuning.strafe_spread + jitter).max(0.1)
    }

    /// Вероятность начать pre-charge (archetype + skill)
    pub fn charge_probability(&self, tuning: &CombatTuning) -> f32 {
        let chance = tuning.base_charge_chance * self.archetype.charge_bias() * (0.5 + self.skill);
        chance.clamp(0.0, 1.0)
    }

    /// Дистанция отступления: осторожные уходят дальше
    pub fn retreat_distance(&self, base: f32) -> f32 {
        base * (0.5 + self.caution)
    }

    /// Максимальный разброс направления отступления (радианы).
    /// caution = 1 → строго от угрозы, caution = 0 → до ±60°
    pub fn retreat_spread(&self) -> f32 {
        (1.0 - self.caution) * std::f32::consts::FRAC_PI_3
    }
}
