//! Equipment: held action + capability descriptor
//!
//! Architecture Decision:
//! - Одно действие в руках (или ничего) — `HeldAction`
//! - Charge-up поддержка описывается тегом `ChargeCapability`, а не флагами
//! - `begin_charge` принимает `ChargeWindow`, который можно получить только
//!   из `ChargeCapability::Chargeable` — зарядить instant action нельзя
//!   даже по ошибке
//!
//! Presets (`blaster`, `rocket`, ...) — те же значения, что спавнит арена.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Вид действия (оружие/способность, подбираемое на арене)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum ActionKind {
    /// Быстрый projectile, точный
    Blaster,
    /// Медленный projectile, урон по площади
    Rocket,
    /// Chargeable hitscan, очень точный
    Railgun,
    /// Melee удар с замахом (chargeable)
    Hammer,
    /// Instant area effect вокруг себя
    Shockwave,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Blaster,
        ActionKind::Rocket,
        ActionKind::Railgun,
        ActionKind::Hammer,
        ActionKind::Shockwave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Blaster => "blaster",
            ActionKind::Rocket => "rocket",
            ActionKind::Railgun => "railgun",
            ActionKind::Hammer => "hammer",
            ActionKind::Shockwave => "shockwave",
        }
    }

    /// Area effects tolerate loose facing
    pub fn is_area(&self) -> bool {
        matches!(self, ActionKind::Rocket | ActionKind::Shockwave)
    }
}

/// Capability descriptor: поддерживает ли действие charge-up фазу
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub enum ChargeCapability {
    /// Срабатывает сразу, charge запрещён
    Instant,
    /// Можно заряжать до `max_duration` секунд
    Chargeable { max_duration: f32 },
}

/// Proof that the held action accepts a charge-up.
///
/// Private field: only `ChargeCapability::window` constructs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeWindow {
    max_duration: f32,
}

impl ChargeWindow {
    pub fn max_duration(&self) -> f32 {
        self.max_duration
    }
}

impl ChargeCapability {
    /// Максимальный charge ниже этого порога считается instant-fire
    pub const NEGLIGIBLE_CHARGE: f32 = 0.05;

    pub fn from_max_duration(max_duration: f32) -> Self {
        if max_duration < Self::NEGLIGIBLE_CHARGE {
            ChargeCapability::Instant
        } else {
            ChargeCapability::Chargeable { max_duration }
        }
    }

    pub fn window(&self) -> Option<ChargeWindow> {
        match *self {
            ChargeCapability::Chargeable { max_duration }
                if max_duration >= Self::NEGLIGIBLE_CHARGE =>
            {
                Some(ChargeWindow { max_duration })
            }
            _ => None,
        }
    }

    pub fn max_duration(&self) -> f32 {
        match *self {
            ChargeCapability::Instant => 0.0,
            ChargeCapability::Chargeable { max_duration } => max_duration,
        }
    }
}

/// Статы действия (immutable описание, копируется в HeldAction при подборе)
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub capability: ChargeCapability,
    /// Базовый урон (полный charge удваивает)
    pub damage: u32,
    /// Минимальный интервал между срабатываниями (секунды)
    pub cooldown: f32,
    /// Скорость projectile (m/s), None = hitscan/melee/area
    pub projectile_speed: Option<f32>,
    /// Оптимальная дистанция применения (m)
    pub optimal_range: f32,
    /// Максимальная дистанция (m)
    pub max_range: f32,
    /// Допустимая разница высот до цели (m)
    pub height_tolerance: f32,
    /// Допустимое отклонение facing от направления на цель (радианы)
    pub alignment_tolerance: f32,
    /// Pre-charge только если цель дальше этой дистанции (m)
    pub charge_distance: f32,
    /// Радиус попадания вокруг точки прицеливания (m)
    pub hit_radius: f32,
    /// Количество использований (None = бесконечно)
    pub uses: Option<u32>,
}

impl ActionSpec {
    pub fn blaster() -> Self {
        Self {
            kind: ActionKind::Blaster,
            capability: ChargeCapability::Instant,
            damage: 1,
            cooldown: 0.6,
            projectile_speed: Some(40.0),
            optimal_range: 10.0,
            max_range: 25.0,
            height_tolerance: 3.0,
            alignment_tolerance: 0.15,
            charge_distance: f32::MAX,
            hit_radius: 0.8,
            uses: Some(12),
        }
    }

    pub fn rocket() -> Self {
        Self {
            kind: ActionKind::Rocket,
            capability: ChargeCapability::Instant,
            damage: 2,
            cooldown: 1.5,
            projectile_speed: Some(18.0),
            optimal_range: 12.0,
            max_range: 30.0,
            height_tolerance: 5.0,
            alignment_tolerance: 0.35,
            charge_distance: f32::MAX,
            hit_radius: 2.5,
            uses: Some(4),
        }
    }

    pub fn railgun() -> Self {
        Self {
            kind: ActionKind::Railgun,
            capability: ChargeCapability::from_max_duration(1.2),
            damage: 1,
            cooldown: 2.0,
            projectile_speed: None,
            optimal_range: 20.0,
            max_range: 45.0,
            height_tolerance: 8.0,
            alignment_tolerance: 0.06,
            charge_distance: 8.0,
            hit_radius: 0.6,
            uses: Some(5),
        }
    }

    pub fn hammer() -> Self {
        Self {
            kind: ActionKind::Hammer,
            capability: ChargeCapability::from_max_duration(0.8),
            damage: 1,
            cooldown: 0.9,
            projectile_speed: None,
            optimal_range: 1.5,
            max_range: 2.5,
            height_tolerance: 1.0,
            alignment_tolerance: 0.5,
            charge_distance: 3.0,
            hit_radius: 1.2,
            uses: Some(8),
        }
    }

    pub fn shockwave() -> Self {
        Self {
            kind: ActionKind::Shockwave,
            capability: ChargeCapability::Instant,
            damage: 1,
            cooldown: 2.5,
            projectile_speed: None,
            optimal_range: 4.0,
            max_range: 7.0,
            height_tolerance: 2.0,
            alignment_tolerance: 1.2,
            charge_distance: f32::MAX,
            hit_radius: 3.5,
            uses: Some(3),
        }
    }

    pub fn preset(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Blaster => Self::blaster(),
            ActionKind::Rocket => Self::rocket(),
            ActionKind::Railgun => Self::railgun(),
            ActionKind::Hammer => Self::hammer(),
            ActionKind::Shockwave => Self::shockwave(),
        }
    }

    /// Время полёта projectile на дистанцию (0 для hitscan)
    pub fn travel_time(&self, distance: f32) -> f32 {
        match self.projectile_speed {
            Some(speed) if speed > 0.0 => distance / speed,
            _ => 0.0,
        }
    }
}

/// Результат `HeldAction::trigger`
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAction {
    pub spec: ActionSpec,
    /// Доля заряда 0..=1 (0 для instant)
    pub charge: f32,
    /// Действие исчерпано и выброшено
    pub depleted: bool,
}

/// Equipment collaborator: текущее действие в руках (nullable)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct HeldAction {
    action: Option<ActionSpec>,
    cooldown_remaining: f32,
    charge_elapsed: Option<f32>,
    uses_left: Option<u32>,
}

impl HeldAction {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn equipped(spec: ActionSpec) -> Self {
        let mut held = Self::default();
        held.equip(spec);
        held
    }

    pub fn equip(&mut self, spec: ActionSpec) {
        self.uses_left = spec.uses;
        self.action = Some(spec);
        self.cooldown_remaining = 0.0;
        self.charge_elapsed = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn spec(&self) -> Option<&ActionSpec> {
        self.action.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    pub fn is_ready(&self) -> bool {
        self.action.is_some() && self.cooldown_remaining <= 0.0
    }

    pub fn charge_elapsed(&self) -> Option<f32> {
        self.charge_elapsed
    }

    pub fn uses_left(&self) -> Option<u32> {
        self.uses_left
    }

    /// Продвинуть cooldown и charge на delta секунд
    pub fn tick(&mut self, delta: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - delta).max(0.0);
        }
        if let (Some(elapsed), Some(spec)) = (self.charge_elapsed.as_mut(), self.action.as_ref()) {
            *elapsed = (*elapsed + delta).min(spec.capability.max_duration());
        }
    }

    /// Начать charge-up. Требует `ChargeWindow` от capability этого действия.
    pub fn begin_charge(&mut self, window: ChargeWindow) {
        debug_assert!(window.max_duration() >= ChargeCapability::NEGLIGIBLE_CHARGE);
        // Токен от чужого action не даёт зарядить instant
        let chargeable = self
            .action
            .as_ref()
            .is_some_and(|spec| spec.capability.window().is_some());
        if chargeable && self.charge_elapsed.is_none() {
            self.charge_elapsed = Some(0.0);
        }
    }

    pub fn cancel_charge(&mut self) {
        self.charge_elapsed = None;
    }

    /// Сработать: запускает cooldown, сбрасывает charge, тратит использование.
    ///
    /// None если действия нет или cooldown не истёк.
    pub fn trigger(&mut self) -> Option<TriggeredAction> {
        if !self.is_ready() {
            return None;
        }
        let spec = self.action.clone()?;

        let charge = match (spec.capability.window(), self.charge_elapsed.take()) {
            (Some(window), Some(elapsed)) => (elapsed / window.max_duration()).clamp(0.0, 1.0),
            _ => 0.0,
        };
        self.cooldown_remaining = spec.cooldown;

        let mut depleted = false;
        if let Some(uses) = self.uses_left.as_mut() {
            *uses = uses.saturating_sub(1);
            if *uses == 0 {
                depleted = true;
                self.action = None;
                self.uses_left = None;
            }
        }

        Some(TriggeredAction {
            spec,
            charge,
            depleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negligible_charge_is_instant() {
        assert_eq!(ChargeCapability::from_max_duration(0.01), ChargeCapability::Instant);
        assert_eq!(ChargeCapability::from_max_duration(0.0), ChargeCapability::Instant);
        assert!(ChargeCapability::from_max_duration(0.3).window().is_some());
    }

    #[test]
    fn test_hand_built_tiny_window_is_refused() {
        let capability = ChargeCapability::Chargeable { max_duration: 0.001 };
        assert!(capability.window().is_none());
    }

    #[test]
    fn test_presets_capabilities() {
        assert!(ActionSpec::blaster().capability.window().is_none());
        assert!(ActionSpec::shockwave().capability.window().is_none());
        assert!(ActionSpec::railgun().capability.window().is_some());
        assert!(ActionSpec::hammer().capability.window().is_some());
        for kind in ActionKind::ALL {
            assert_eq!(ActionSpec::preset(kind).kind, kind);
        }
    }

    #[test]
    fn test_trigger_starts_cooldown() {
        let mut held = HeldAction::equipped(ActionSpec::blaster());
        assert!(held.is_ready());

        let fired = held.trigger().expect("ready blaster must fire");
        assert_eq!(fired.charge, 0.0);
        assert!(!held.is_ready());
        assert_eq!(held.cooldown_remaining(), 0.6);
        assert!(held.trigger().is_none());

        held.tick(0.3);
        assert!(!held.is_ready());
        held.tick(0.3);
        assert!(held.is_ready());
    }

    #[test]
    fn test_charge_accumulates_and_clamps() {
        let mut held = HeldAction::equipped(ActionSpec::railgun());
        let window = ActionSpec::railgun().capability.window().expect("railgun charges");
        held.begin_charge(window);
        held.tick(0.6);
        assert_eq!(held.charge_elapsed(), Some(0.6));
        held.tick(5.0);
        assert_eq!(held.charge_elapsed(), Some(1.2));

        let fired = held.trigger().expect("charged railgun fires");
        assert_eq!(fired.charge, 1.0);
        assert_eq!(held.charge_elapsed(), None);
    }

    #[test]
    fn test_uses_deplete_and_drop_action() {
        let mut spec = ActionSpec::shockwave();
        spec.uses = Some(1);
        let mut held = HeldAction::equipped(spec);

        let fired = held.trigger().expect("fires once");
        assert!(fired.depleted);
        assert!(held.is_empty());
    }

    #[test]
    fn test_travel_time() {
        assert_eq!(ActionSpec::blaster().travel_time(20.0), 0.5);
        assert_eq!(ActionSpec::railgun().travel_time(20.0), 0.0);
    }
}
