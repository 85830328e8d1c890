//! StuckRecoveryMonitor — детект застревания и лестница recovery.
//!
//! Normal → Stuck → Escalating { attempt } → ForcedRelocation.
//! Sampling раз в `sample_interval`; N подряд samples без прогресса → Stuck.
//! Дальше по таймеру маневры: reverse boost → jump/mobility → torque (цикл).
//! Cap по времени или попыткам → ForcedRelocation. Любой прогресс сбрасывает
//! всё сразу.

use bevy::prelude::*;
use rand::Rng;

use crate::config::StuckTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum StuckPhase {
    #[default]
    Normal,
    Stuck,
    Escalating {
        attempt: u32,
    },
    ForcedRelocation,
}

/// Recovery маневр (переопределяет navigation output)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum RecoveryAction {
    /// Развернуть force и усилить
    ReverseBoost,
    Jump,
    /// Special mobility (dash и т.п.)
    Mobility,
    /// Случайный torque + боковая сила
    Torque { sign: f32 },
    /// Последний шаг: телепорт на spawn point
    Relocate,
}

/// Что наблюдаем за tick
#[derive(Debug, Clone, Copy)]
pub struct MotionSample {
    pub position: Vec3,
    pub speed: f32,
    /// Бот пытался двигаться (иначе стояние на месте — не застревание)
    pub intends_to_move: bool,
    /// Navigation видит препятствие над головой
    pub beneath_overhead: bool,
}

#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct StuckMonitor {
    phase: StuckPhase,
    sample_timer: f32,
    last_sample: Option<Vec3>,
    failed_samples: u32,
    stuck_elapsed: f32,
    maneuver_timer: f32,
    beneath_overhead: bool,
    active: Option<RecoveryAction>,
}

impl StuckMonitor {
    pub fn phase(&self) -> StuckPhase {
        self.phase
    }

    pub fn failed_samples(&self) -> u32 {
        self.failed_samples
    }

    pub fn stuck_elapsed(&self) -> f32 {
        self.stuck_elapsed
    }

    pub fn beneath_overhead(&self) -> bool {
        self.beneath_overhead
    }

    pub fn is_stuck(&self) -> bool {
        self.phase != StuckPhase::Normal
    }

    /// Текущий маневр (держится до следующего)
    pub fn active_maneuver(&self) -> Option<RecoveryAction> {
        self.active
    }

    /// Полный сброс: прогресс вернулся / relocation / respawn
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Relocation применён — начинаем с чистого листа
    pub fn complete_relocation(&mut self) {
        self.reset();
    }

    /// Один tick наблюдения. Возвращает новый маневр, если пора.
    pub fn observe(
        &mut self,
        sample: MotionSample,
        delta: f32,
        tuning: &StuckTuning,
        rng: &mut impl Rng,
    ) -> Option<RecoveryAction> {
        if sample.beneath_overhead {
            self.beneath_overhead = true;
        }

        self.sample_timer += delta;
        if self.sample_timer >= tuning.sample_interval {
            self.sample_timer -= tuning.sample_interval;
            self.take_sample(sample, tuning);
        }

        if self.phase == StuckPhase::Normal {
            return None;
        }

        self.stuck_elapsed += delta;
        let attempts = match self.phase {
            StuckPhase::Escalating { attempt } => attempt,
            _ => 0,
        };

        if self.stuck_elapsed >= tuning.max_stuck_seconds || attempts >= tuning.max_attempts {
            self.phase = StuckPhase::ForcedRelocation;
            self.active = Some(RecoveryAction::Relocate);
            return self.active;
        }

        self.maneuver_timer -= delta;
        if self.maneuver_timer > 0.0 {
            return None;
        }

        let attempt = attempts + 1;
        self.phase = StuckPhase::Escalating { attempt };
        self.maneuver_timer = sample_band(
            rng,
            tuning.maneuver_interval_min,
            tuning.maneuver_interval_max,
        );
        let action = self.pick_maneuver(attempt, tuning, rng);
        self.active = Some(action);
        Some(action)
    }

    fn take_sample(&mut self, sample: MotionSample, tuning: &StuckTuning) {
        let Some(previous) = self.last_sample.replace(sample.position) else {
            return;
        };
        if self.phase == StuckPhase::ForcedRelocation {
            return;
        }

        // Прогресс — только реальное смещение. Скорость от физики может быть
        // касательной к стене при нулевом смещении: она лишь добавляет провал.
        let displacement = previous.distance(sample.position);
        let stalled = displacement < tuning.min_progress || sample.speed < tuning.min_speed;

        if !sample.intends_to_move || !stalled {
            // last_sample сохраняем, остальное в ноль
            let position = sample.position;
            self.reset();
            self.last_sample = Some(position);
            return;
        }

        self.failed_samples += 1;
        if self.phase == StuckPhase::Normal && self.failed_samples >= tuning.consecutive_samples {
            self.phase = StuckPhase::Stuck;
            self.stuck_elapsed = 0.0;
            self.maneuver_timer = 0.0;
        }
    }

    /// 1 — reverse boost, 2 — jump/mobility (чаще под препятствием), 3+ — torque
    fn pick_maneuver(
        &self,
        attempt: u32,
        tuning: &StuckTuning,
        rng: &mut impl Rng,
    ) -> RecoveryAction {
        match (attempt - 1) % 3 {
            0 => RecoveryAction::ReverseBoost,
            1 => {
                let chance = if self.beneath_overhead {
                    tuning.overhead_jump_chance
                } else {
                    tuning.jump_chance
                };
                if rng.gen_bool(chance.clamp(0.0, 1.0) as f64) {
                    if rng.gen_bool(0.5) {
                        RecoveryAction::Jump
                    } else {
                        RecoveryAction::Mobility
                    }
                } else {
                    RecoveryAction::ReverseBoost
                }
            }
            _ => RecoveryAction::Torque {
                sign: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            },
        }
    }
}

/// Равномерно в [min, max], min == max допустимо
pub fn sample_band(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

/// Точка forced relocation: свободный spawn → любой spawn → подъём над текущей
pub fn choose_relocation(
    spawn_points: &[Vec3],
    occupied: &[Vec3],
    current: Vec3,
    tuning: &StuckTuning,
    rng: &mut impl Rng,
) -> Vec3 {
    let clearance_sq = tuning.spawn_clearance * tuning.spawn_clearance;
    let free: Vec<Vec3> = spawn_points
        .iter()
        .copied()
        .filter(|spawn| occupied.iter().all(|actor| actor.distance_squared(*spawn) > clearance_sq))
        .collect();

    if !free.is_empty() {
        return free[rng.gen_range(0..free.len())];
    }
    if !spawn_points.is_empty() {
        return spawn_points[rng.gen_range(0..spawn_points.len())];
    }
    current + Vec3::Y * tuning.fallback_lift
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    fn frozen(position: Vec3) -> MotionSample {
        MotionSample {
            position,
            speed: 0.0,
            intends_to_move: true,
            beneath_overhead: false,
        }
    }

    /// Прогоняем monitor до первого Relocate, возвращаем (tick перехода в stuck, tick relocate)
    fn run_frozen(
        tuning: &StuckTuning,
        seed: u64,
        max_ticks: usize,
    ) -> (Option<usize>, Option<usize>) {
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut stuck_at = None;
        for tick in 0..max_ticks {
            let action = monitor.observe(frozen(Vec3::ZERO), DT, tuning, &mut rng);
            if stuck_at.is_none() && monitor.is_stuck() {
                stuck_at = Some(tick);
            }
            if action == Some(RecoveryAction::Relocate) {
                return (stuck_at, Some(tick));
            }
        }
        (stuck_at, None)
    }

    #[test]
    fn test_stuck_after_consecutive_samples() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut previous_failed = 0;
        for _ in 0..200 {
            monitor.observe(frozen(Vec3::ZERO), DT, &tuning, &mut rng);
            if monitor.is_stuck() {
                break;
            }
            previous_failed = monitor.failed_samples();
        }

        // Переход ровно на N-м неудачном sample, не раньше
        assert!(monitor.is_stuck());
        assert_eq!(previous_failed, tuning.consecutive_samples - 1);
        assert_eq!(monitor.failed_samples(), tuning.consecutive_samples);
    }

    #[test]
    fn test_wall_sliding_speed_does_not_hide_frozen_position() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // Физика отдаёт скорость вдоль стены, позиция не меняется
        let sliding = MotionSample {
            speed: 4.0,
            ..frozen(Vec3::new(2.0, 0.0, 2.0))
        };

        let mut relocated = false;
        for _ in 0..600 {
            if monitor.observe(sliding, DT, &tuning, &mut rng) == Some(RecoveryAction::Relocate) {
                relocated = true;
                break;
            }
        }
        assert!(relocated, "phase = {:?}", monitor.phase());
    }

    #[test]
    fn test_reported_standstill_counts_as_stalled() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // Смещение есть, но physics сообщает нулевую скорость
        for tick in 0..120 {
            let sample = MotionSample {
                speed: 0.0,
                ..frozen(Vec3::X * tick as f32)
            };
            monitor.observe(sample, DT, &tuning, &mut rng);
        }
        assert!(monitor.is_stuck());
    }

    #[test]
    fn test_progress_resets_everything() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..90 {
            monitor.observe(frozen(Vec3::ZERO), DT, &tuning, &mut rng);
        }
        assert!(monitor.is_stuck());

        // Снова идём: 3 m/s
        for tick in 0..40 {
            let walking = MotionSample {
                speed: 3.0,
                ..frozen(Vec3::X * tick as f32 * 3.0 * DT)
            };
            monitor.observe(walking, DT, &tuning, &mut rng);
        }
        assert_eq!(monitor.phase(), StuckPhase::Normal);
        assert_eq!(monitor.failed_samples(), 0);
        assert_eq!(monitor.stuck_elapsed(), 0.0);
        assert!(monitor.active_maneuver().is_none());
    }

    #[test]
    fn test_idle_bot_is_not_stuck() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let idle = MotionSample {
            intends_to_move: false,
            ..frozen(Vec3::ZERO)
        };
        for _ in 0..600 {
            assert!(monitor.observe(idle, DT, &tuning, &mut rng).is_none());
        }
        assert_eq!(monitor.phase(), StuckPhase::Normal);
    }

    #[test]
    fn test_first_maneuver_is_reverse_boost() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut first = None;
        for _ in 0..120 {
            if let Some(action) = monitor.observe(frozen(Vec3::ZERO), DT, &tuning, &mut rng) {
                first = Some(action);
                break;
            }
        }
        assert_eq!(first, Some(RecoveryAction::ReverseBoost));
        assert_eq!(monitor.phase(), StuckPhase::Escalating { attempt: 1 });
    }

    #[test]
    fn test_overhead_always_jumps_when_chance_is_one() {
        let tuning = StuckTuning {
            overhead_jump_chance: 1.0,
            ..StuckTuning::default()
        };
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let sample = MotionSample {
            beneath_overhead: true,
            ..frozen(Vec3::ZERO)
        };
        let mut actions = Vec::new();
        for _ in 0..240 {
            if let Some(action) = monitor.observe(sample, DT, &tuning, &mut rng) {
                actions.push(action);
            }
        }
        assert!(matches!(actions.get(1), Some(RecoveryAction::Jump | RecoveryAction::Mobility)));
    }

    #[test]
    fn test_relocation_then_reset() {
        let tuning = StuckTuning::default();
        let mut monitor = StuckMonitor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut relocated = false;
        for _ in 0..600 {
            let action = monitor.observe(frozen(Vec3::ZERO), DT, &tuning, &mut rng);
            if action == Some(RecoveryAction::Relocate) {
                assert_eq!(monitor.phase(), StuckPhase::ForcedRelocation);
                monitor.complete_relocation();
                relocated = true;
                break;
            }
        }
        assert!(relocated);
        assert_eq!(monitor.phase(), StuckPhase::Normal);
        assert_eq!(monitor.failed_samples(), 0);
    }

    #[test]
    fn test_choose_relocation_fallbacks() {
        let tuning = StuckTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let spawns = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)];

        // Первый занят — берём второй
        let near_first = [Vec3::new(0.2, 0.0, 0.0)];
        let picked = choose_relocation(&spawns, &near_first, Vec3::ZERO, &tuning, &mut rng);
        assert_eq!(picked, spawns[1]);

        // Все заняты — любой spawn
        let occupied = [spawns[0], spawns[1]];
        let picked = choose_relocation(&spawns, &occupied, Vec3::ZERO, &tuning, &mut rng);
        assert!(spawns.contains(&picked));

        // Spawn points нет — подъём
        let current = Vec3::new(4.0, 1.0, 4.0);
        let picked = choose_relocation(&[], &[], current, &tuning, &mut rng);
        assert_eq!(picked, current + Vec3::Y * tuning.fallback_lift);
    }

    proptest! {
        #[test]
        fn prop_stuck_detection_and_relocation_cap(
            consecutive in 1u32..6,
            sample_interval in 0.1f32..0.5,
            max_stuck_seconds in 0.5f32..4.0,
            max_attempts in 1u32..15,
            seed in any::<u64>(),
        ) {
            let tuning = StuckTuning {
                consecutive_samples: consecutive,
                sample_interval,
                max_stuck_seconds,
                max_attempts,
                ..StuckTuning::default()
            };
            let (stuck_at, relocate_at) = run_frozen(&tuning, seed, 2000);
            let stuck_at = stuck_at.expect("frozen bot must be marked stuck");
            let relocate_at = relocate_at.expect("frozen bot must be relocated");

            // Stuck ровно после baseline + N неудачных samples
            let detection = (consecutive + 1) as f32 * sample_interval;
            let stuck_time = (stuck_at + 1) as f32 * DT;
            prop_assert!((stuck_time - detection).abs() <= DT * 1.5,
                "stuck at {} expected {}", stuck_time, detection);

            // Relocation не позже cap
            let relocate_time = (relocate_at - stuck_at) as f32 * DT;
            prop_assert!(relocate_time <= max_stuck_seconds + DT * 1.5,
                "relocated after {} cap {}", relocate_time, max_stuck_seconds);
        }
    }
}
