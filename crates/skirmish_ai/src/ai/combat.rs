//! CombatController — когда и как использовать held action.
//!
//! Gates: range, height, alignment, cooldown, usage score. Charge — только
//! через `ChargeWindow` (instant action зарядить невозможно). Lead prediction
//! для снарядов со значимым временем полёта.

use bevy::prelude::*;
use rand::Rng;

use super::components::PersonalityProfile;
use super::navigation::signed_yaw;
use super::targeting::is_action_worth_using;
use crate::components::{flatten, ActionSpec, ChargeWindow, HeldAction};
use crate::config::{BotTuning, CombatTuning};

/// Команда для held action на этот tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatCommand {
    /// Ничего не делать (довернуться/сблизиться)
    Hold,
    BeginCharge(ChargeWindow),
    /// Продолжаем заряд
    ContinueCharge,
    CancelCharge,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatDecision {
    pub command: CombatCommand,
    pub aim_point: Vec3,
    pub aligned: bool,
}

/// Combat-ситуация на один tick
#[derive(Debug, Clone, Copy)]
pub struct CombatInput<'a> {
    pub position: Vec3,
    pub forward: Vec3,
    pub held: &'a HeldAction,
    pub target_position: Vec3,
    pub target_velocity: Vec3,
    pub line_of_sight: bool,
    pub personality: &'a PersonalityProfile,
}

/// Per-agent combat state (strafe + частота бросков на charge)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct CombatState {
    /// +1/-1 — сторона strafing
    pub strafe_sign: f32,
    pub strafe_timer: f32,
    /// Время до следующего броска "заряжать ли"
    pub charge_roll_timer: f32,
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            strafe_sign: 1.0,
            strafe_timer: 0.0,
            charge_roll_timer: 0.0,
        }
    }
}

impl CombatState {
    /// Период броска на pre-charge
    pub const CHARGE_ROLL_INTERVAL: f32 = 0.5;

    /// Смена стороны strafing по интервалу personality
    pub fn update_strafe(
        &mut self,
        delta: f32,
        personality: &PersonalityProfile,
        tuning: &CombatTuning,
        rng: &mut impl Rng,
    ) -> f32 {
        self.strafe_timer -= delta;
        if self.strafe_timer <= 0.0 {
            self.strafe_sign = -self.strafe_sign;
            self.strafe_timer = personality.strafe_interval(tuning, rng);
        }
        self.strafe_sign
    }
}

/// Куда целиться: текущая позиция или упреждение
pub fn predict_aim_point(
    shooter: Vec3,
    target_position: Vec3,
    target_velocity: Vec3,
    spec: &ActionSpec,
    personality: &PersonalityProfile,
    tuning: &CombatTuning,
) -> Vec3 {
    if !personality.can_lead(tuning) {
        return target_position;
    }
    if target_velocity.length() <= tuning.lead_min_target_speed {
        return target_position;
    }
    let travel_time = spec.travel_time(shooter.distance(target_position));
    if travel_time <= tuning.lead_min_travel_time {
        return target_position;
    }
    target_position + target_velocity * travel_time * personality.lead_accuracy_factor(tuning)
}

/// Точка позиционирования в Attack: держим optimal range, смещаясь вбок
pub fn attack_destination(
    position: Vec3,
    target: Vec3,
    optimal_range: f32,
    strafe_sign: f32,
    strafe_offset: f32,
) -> Vec3 {
    let from_target = flatten(position - target);
    let away = from_target.try_normalize().unwrap_or(Vec3::Z);
    let lateral = Vec3::Y.cross(away) * strafe_sign * strafe_offset;
    let desired_radius = optimal_range.max(0.5);
    target + away * desired_radius + lateral
}

fn is_aligned(forward: Vec3, position: Vec3, aim_point: Vec3, tolerance: f32) -> bool {
    let to_aim = flatten(aim_point - position);
    if to_aim.length_squared() < 1e-4 {
        return true;
    }
    signed_yaw(forward, to_aim).abs() <= tolerance
}

/// Решение на tick. Probabilistic часть — только бросок на pre-charge.
pub fn decide_combat(
    input: &CombatInput,
    state: &mut CombatState,
    delta: f32,
    tuning: &BotTuning,
    rng: &mut impl Rng,
) -> CombatDecision {
    let combat = &tuning.combat;
    let Some(spec) = input.held.spec() else {
        return CombatDecision {
            command: CombatCommand::Hold,
            aim_point: input.target_position,
            aligned: false,
        };
    };

    let aim_point = predict_aim_point(
        input.position,
        input.target_position,
        input.target_velocity,
        spec,
        input.personality,
        combat,
    );
    let distance = input.position.distance(input.target_position);
    let aligned = is_aligned(input.forward, input.position, aim_point, spec.alignment_tolerance);
    let height_ok = (aim_point.y - input.position.y).abs() <= spec.height_tolerance;
    let in_range = distance <= spec.max_range;
    let visible = input.line_of_sight || spec.kind.is_area();
    let worth_it = is_action_worth_using(spec, distance, input.personality, tuning);
    let can_fire = input.held.is_ready() && aligned && height_ok && in_range && visible && worth_it;

    let decision = |command| CombatDecision {
        command,
        aim_point,
        aligned,
    };

    // Уже заряжаем
    if let Some(elapsed) = input.held.charge_elapsed() {
        let max_duration = spec.capability.max_duration();
        if distance > spec.max_range * 1.5 {
            return decision(CombatCommand::CancelCharge);
        }
        let charged = elapsed >= max_duration * combat.charge_release_fraction;
        // Цель подошла вплотную — стреляем тем, что накопили
        let closed_in = distance <= spec.charge_distance;
        if (charged || closed_in) && can_fire {
            return decision(CombatCommand::Trigger);
        }
        return decision(CombatCommand::ContinueCharge);
    }

    if !input.held.is_ready() {
        return decision(CombatCommand::Hold);
    }

    // Pre-charge: только chargeable, только дальше порога и если action вообще
    // стоит тратить; бросок раз в интервал
    if let Some(window) = spec.capability.window() {
        state.charge_roll_timer -= delta;
        let worth_charging = worth_it && distance <= spec.max_range * 1.5;
        if worth_charging && distance > spec.charge_distance && state.charge_roll_timer <= 0.0 {
            state.charge_roll_timer = CombatState::CHARGE_ROLL_INTERVAL;
            let chance = input.personality.charge_probability(combat) as f64;
            if rng.gen_bool(chance.clamp(0.0, 1.0)) {
                return decision(CombatCommand::BeginCharge(window));
            }
        }
    }

    if can_fire {
        decision(CombatCommand::Trigger)
    } else {
        decision(CombatCommand::Hold)
    }
}
