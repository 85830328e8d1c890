//! AI components

pub mod personality;
pub mod state;


// Re-export all components
pub use personality::*;
pub use state::*;

use bevy::prelude::*;

use super::combat::CombatState;
use super::navigation::NavigationFeedback;
use super::perception::PerceptionCache;
use super::stuck::StuckMonitor;

/// Всё, что делает актора ботом. Вставляется на спавне, снимается на смерти.
#[derive(Bundle, Default)]
pub struct BotBrain {
    pub state: BotState,
    pub personality: PersonalityProfile,
    pub perception: PerceptionCache,
    pub timers: BotTimers,
    pub combat: CombatState,
    pub stuck: StuckMonitor,
    pub navigation: NavigationFeedback,
}

impl BotBrain {
    /// Свежий мозг: новый personality, случайный phase offset perception
    pub fn spawn(rng: &mut impl rand::Rng, refresh_interval: f32) -> Self {
        let personality = PersonalityProfile::generate(rng);
        let phase_offset = if refresh_interval > 0.0 {
            rng.gen_range(0.0..refresh_interval)
        } else {
            0.0
        };
        Self {
            personality,
            perception: PerceptionCache::with_phase_offset(phase_offset),
            ..Default::default()
        }
    }
}
