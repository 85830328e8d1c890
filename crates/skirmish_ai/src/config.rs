//! Bot tuning: все пороги контроллера в одном ресурсе
//!
//! Значения по умолчанию — nominal defaults. Любое поле можно переопределить
//! частичным JSON (`BotTuning::from_json_str`), отсутствующие поля берутся из
//! `Default`. Ошибки конфигурации — единственные ошибки, которые видит host,
//! и только при загрузке.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ошибка загрузки/валидации tuning
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tuning json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Retreat rule (priority 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetreatTuning {
    /// health.current ≤ этого значения → кандидат на отступление
    pub low_health: u32,
    /// Длительность отступления: случайная в [min, max] (секунды)
    pub duration_min: f32,
    pub duration_max: f32,
    /// Cooldown после окончания отступления (секунды)
    pub cooldown: f32,
    /// Угроза "much weaker", если её health ≤ own × ratio
    pub much_weaker_ratio: f32,
    /// ...и она ближе этого радиуса (m)
    pub weak_threat_radius: f32,
    /// Базовая дистанция точки отступления (m), масштабируется caution
    pub distance: f32,
}

impl Default for RetreatTuning {
    fn default() -> Self {
        Self {
            low_health: 2,
            duration_min: 4.0,
            duration_max: 7.0,
            cooldown: 6.0,
            much_weaker_ratio: 0.5,
            weak_threat_radius: 6.0,
            distance: 10.0,
        }
    }
}

/// Engagement/awareness ranges с hysteresis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeTuning {
    /// Вход в Attack (m)
    pub engage: f32,
    /// Вход в Chase (m), строго больше engage
    pub awareness: f32,
    /// Ширина hysteresis band (доля): exit = enter × (1 + band)
    pub hysteresis: f32,
    /// Goal item ближе этого радиуса стоит detour даже без LOS (m)
    pub goal_detour_radius: f32,
    /// CollectResource только если враг дальше engage × multiple
    pub resource_safety_multiple: f32,
}

impl Default for RangeTuning {
    fn default() -> Self {
        Self {
            engage: 12.0,
            awareness: 30.0,
            hysteresis: 0.2,
            goal_detour_radius: 15.0,
            resource_safety_multiple: 1.5,
        }
    }
}

impl RangeTuning {
    pub fn engage_exit(&self) -> f32 {
        self.engage * (1.0 + self.hysteresis)
    }

    pub fn awareness_exit(&self) -> f32 {
        self.awareness * (1.0 + self.hysteresis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionTuning {
    /// Период refresh кэша (секунды)
    pub refresh_interval: f32,
    /// Радиус сканирования мира (m)
    pub scan_radius: f32,
    /// Высота глаз для LOS (m)
    pub eye_height: f32,
}

impl Default for PerceptionTuning {
    fn default() -> Self {
        Self {
            refresh_interval: 0.5,
            scan_radius: 60.0,
            eye_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreTuning {
    /// Смена wander точки (секунды)
    pub wander_interval: f32,
    pub wander_min: f32,
    pub wander_max: f32,
    /// Дистанция "прибыли" (m)
    pub arrive_radius: f32,
}

impl Default for ExploreTuning {
    fn default() -> Self {
        Self {
            wander_interval: 6.0,
            wander_min: 6.0,
            wander_max: 18.0,
            arrive_radius: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationTuning {
    /// Forward probe на нулевой скорости (m)
    pub probe_distance: f32,
    /// Рост probe multiplier на единицу скорости
    pub probe_speed_gain: f32,
    /// Cap probe multiplier
    pub probe_max_multiplier: f32,
    /// Максимальный допустимый спуск без "края" (m)
    pub max_step_drop: f32,
    /// Fan альтернативных направлений (градусы), по порядку проверки
    pub fan_angles_deg: Vec<f32>,
    /// Высота ray для obstacle avoidance (m)
    pub obstacle_probe_height: f32,
    /// Вес deflection от препятствия
    pub avoidance_weight: f32,
    /// Высоты clearance samples (m)
    pub clearance_heights: Vec<f32>,
    /// Lateral offsets clearance samples (m)
    pub clearance_offsets: Vec<f32>,
    /// Рост агента: ниже этого — overhead obstacle (m)
    pub body_height: f32,
    /// Радиус separation (m)
    pub separation_radius: f32,
    /// Minority weight separation против основного направления
    pub separation_weight: f32,
    /// Коэффициент торможения у края
    pub brake_gain: f32,
    /// Базовая угловая скорость (рад/с), × personality.turn_rate
    pub turn_rate: f32,
    /// P-gain поворота
    pub turn_gain: f32,
}

impl Default for NavigationTuning {
    fn default() -> Self {
        Self {
            probe_distance: 1.5,
            probe_speed_gain: 0.2,
            probe_max_multiplier: 3.0,
            max_step_drop: 1.5,
            fan_angles_deg: vec![30.0, -30.0, 60.0, -60.0, 90.0, -90.0],
            obstacle_probe_height: 0.5,
            avoidance_weight: 0.6,
            clearance_heights: vec![0.3, 1.0, 1.6],
            clearance_offsets: vec![-0.35, 0.0, 0.35],
            body_height: 1.8,
            separation_radius: 2.0,
            separation_weight: 0.25,
            brake_gain: 8.0,
            turn_rate: 6.0,
            turn_gain: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckTuning {
    /// Период sampling (секунды)
    pub sample_interval: f32,
    /// Минимальный прогресс между samples (m)
    pub min_progress: f32,
    /// Минимальная скорость (m/s)
    pub min_speed: f32,
    /// Подряд неудачных samples до "stuck"
    pub consecutive_samples: u32,
    /// Интервал смены maneuver: случайный в [min, max] (секунды)
    pub maneuver_interval_min: f32,
    pub maneuver_interval_max: f32,
    /// Абсолютный cap stuck (секунды)
    pub max_stuck_seconds: f32,
    /// Абсолютный cap попыток
    pub max_attempts: u32,
    /// Вероятность прыжка на jump-шаге
    pub jump_chance: f32,
    /// ...если над головой препятствие
    pub overhead_jump_chance: f32,
    /// Множитель reversed force
    pub reverse_boost: f32,
    /// Fallback relocation: подъём над текущей позицией (m)
    pub fallback_lift: f32,
    /// Spawn point занят, если актор ближе (m)
    pub spawn_clearance: f32,
}

impl Default for StuckTuning {
    fn default() -> Self {
        Self {
            sample_interval: 0.3,
            min_progress: 0.25,
            min_speed: 0.4,
            consecutive_samples: 3,
            maneuver_interval_min: 0.2,
            maneuver_interval_max: 0.4,
            max_stuck_seconds: 3.0,
            max_attempts: 10,
            jump_chance: 0.35,
            overhead_jump_chance: 0.8,
            reverse_boost: 1.5,
            fallback_lift: 3.0,
            spawn_clearance: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Lead prediction только при skill выше порога
    pub lead_skill_threshold: f32,
    /// ...и скорости цели выше порога (m/s)
    pub lead_min_target_speed: f32,
    /// ...и значимом времени полёта (секунды)
    pub lead_min_travel_time: f32,
    /// accuracy_factor = lerp(min, max, aim_accuracy)
    pub accuracy_min: f32,
    pub accuracy_max: f32,
    /// Порог action-usage score
    pub usability_threshold: f32,
    /// Штраф за метр |actual − optimal|
    pub distance_penalty: f32,
    /// Strafe flip interval = base + (1 − skill) × spread ± jitter
    pub strafe_base: f32,
    pub strafe_spread: f32,
    pub strafe_jitter: f32,
    /// Lateral offset strafing (m)
    pub strafe_offset: f32,
    /// Release charge на этой доле max_duration
    pub charge_release_fraction: f32,
    /// Базовая вероятность pre-charge
    pub base_charge_chance: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            lead_skill_threshold: 0.65,
            lead_min_target_speed: 2.0,
            lead_min_travel_time: 0.05,
            accuracy_min: 0.7,
            accuracy_max: 0.95,
            usability_threshold: 0.35,
            distance_penalty: 0.03,
            strafe_base: 0.8,
            strafe_spread: 1.2,
            strafe_jitter: 0.25,
            strafe_offset: 3.0,
            charge_release_fraction: 0.8,
            base_charge_chance: 0.3,
        }
    }
}

/// Веса enemy scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    pub distance_weight: f32,
    pub health_weight: f32,
    pub line_of_sight_bonus: f32,
    pub range_band_bonus: f32,
    /// Effective range = optimal_range × factor
    pub range_band_factor: f32,
    pub archetype_bonus: f32,
    /// Бонус текущей цели (stickiness)
    pub retention_bonus: f32,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            distance_weight: 4.0,
            health_weight: 1.0,
            line_of_sight_bonus: 0.5,
            range_band_bonus: 0.4,
            range_band_factor: 1.25,
            archetype_bonus: 0.2,
            retention_bonus: 0.15,
        }
    }
}

/// Все пороги контроллера (Resource)
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    pub retreat: RetreatTuning,
    pub ranges: RangeTuning,
    pub perception: PerceptionTuning,
    pub explore: ExploreTuning,
    pub navigation: NavigationTuning,
    pub stuck: StuckTuning,
    pub combat: CombatTuning,
    pub scoring: ScoringTuning,
}

impl BotTuning {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tuning: BotTuning = serde_json::from_str(json)?;
        if let Err(err) = tuning.validate() {
            crate::log_warning(&format!("⚠️ Rejected bot tuning: {}", err));
            return Err(err);
        }
        Ok(tuning)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        band("retreat.duration", self.retreat.duration_min, self.retreat.duration_max)?;
        band("explore.wander", self.explore.wander_min, self.explore.wander_max)?;
        band(
            "stuck.maneuver_interval",
            self.stuck.maneuver_interval_min,
            self.stuck.maneuver_interval_max,
        )?;
        band("combat.accuracy", self.combat.accuracy_min, self.combat.accuracy_max)?;

        positive("perception.refresh_interval", self.perception.refresh_interval)?;
        positive("stuck.sample_interval", self.stuck.sample_interval)?;
        positive("ranges.engage", self.ranges.engage)?;
        positive("ranges.hysteresis", self.ranges.hysteresis)?;
        positive("explore.wander_interval", self.explore.wander_interval)?;

        if self.ranges.awareness <= self.ranges.engage {
            return Err(ConfigError::Invalid {
                field: "ranges.awareness",
                reason: format!(
                    "must be larger than engage ({} <= {})",
                    self.ranges.awareness, self.ranges.engage
                ),
            });
        }
        if self.stuck.consecutive_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "stuck.consecutive_samples",
                reason: "must be at least 1".to_string(),
            });
        }

        probability("stuck.jump_chance", self.stuck.jump_chance)?;
        probability("stuck.overhead_jump_chance", self.stuck.overhead_jump_chance)?;
        probability("combat.base_charge_chance", self.combat.base_charge_chance)?;
        probability("navigation.separation_weight", self.navigation.separation_weight)?;

        Ok(())
    }
}

fn band(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min < 0.0 || min > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("expected 0 <= min <= max, got [{min}, {max}]"),
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive value, got {value}"),
        });
    }
    Ok(())
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("expected a probability in [0, 1], got {value}"),
        });
    }
    Ok(())
}
