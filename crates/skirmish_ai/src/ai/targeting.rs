//! TargetSelector: enemy scoring и action-usage scoring.
//!
//! Все функции чистые — personality + ситуация → число.

use bevy::prelude::*;

use super::components::{Archetype, PersonalityProfile};
use crate::components::{ActionKind, ActionSpec, Health};
use crate::config::{BotTuning, CombatTuning, ScoringTuning};

/// Кандидат-враг (уже прошедший liveness check в этот tick)
#[derive(Debug, Clone, Copy)]
pub struct EnemyCandidate {
    pub entity: Entity,
    pub position: Vec3,
    pub velocity: Vec3,
    pub distance: f32,
    pub health: Health,
    pub line_of_sight: bool,
}

/// Выбранная цель + score, которым она выиграла
#[derive(Debug, Clone, Copy)]
pub struct ScoredTarget {
    pub candidate: EnemyCandidate,
    pub score: f32,
}

/// Ситуация бота для scoring
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub own_health: Health,
    pub personality: &'a PersonalityProfile,
    pub action: Option<&'a ActionSpec>,
    pub current_target: Option<Entity>,
}

/// Health term: знак и вес зависят от архетипа
fn health_term(archetype: Archetype, own: Health, enemy: Health) -> f32 {
    let own_fraction = own.fraction();
    let enemy_fraction = enemy.fraction();
    match archetype {
        // Добивает слабых
        Archetype::Aggressive => 1.0 - enemy_fraction,
        // Избегает боёв, где враг здоровее
        Archetype::Defensive => 2.0 * (own_fraction - enemy_fraction).min(0.0),
        Archetype::Support | Archetype::Balanced => 0.5 * (own_fraction - enemy_fraction),
    }
}

/// Archetype bonus/penalty (distance-зависимые части — только ступеньки вниз)
fn archetype_term(ctx: &ScoringContext, candidate: &EnemyCandidate, engage_range: f32) -> f32 {
    match ctx.personality.archetype() {
        Archetype::Aggressive if candidate.distance <= engage_range => 1.0,
        Archetype::Defensive if candidate.health.current > ctx.own_health.current => -1.0,
        Archetype::Support if candidate.health.current < candidate.health.max => 1.0,
        _ => 0.0,
    }
}

/// Score одного врага. Не возрастает с distance при прочих равных.
pub fn score_enemy(
    ctx: &ScoringContext,
    candidate: &EnemyCandidate,
    scoring: &ScoringTuning,
    engage_range: f32,
) -> f32 {
    let distance = candidate.distance.max(0.0);

    // (a) inverse distance
    let mut score = scoring.distance_weight / (1.0 + distance);

    // (b) health differential
    let archetype = ctx.personality.archetype();
    score += scoring.health_weight * health_term(archetype, ctx.own_health, candidate.health);

    // (c) line of sight
    if candidate.line_of_sight {
        score += scoring.line_of_sight_bonus;
    }

    // (d) optimal range band текущего action
    if let Some(action) = ctx.action {
        if distance <= action.optimal_range * scoring.range_band_factor {
            score += scoring.range_band_bonus;
        }
    }

    // (e) archetype
    score += scoring.archetype_bonus * archetype_term(ctx, candidate, engage_range);

    // Stickiness текущей цели (не зависит от distance)
    if ctx.current_target == Some(candidate.entity) {
        score += scoring.retention_bonus;
    }

    score
}

/// Лучший враг; ничья — ближайший
pub fn select_enemy(
    ctx: &ScoringContext,
    candidates: &[EnemyCandidate],
    tuning: &BotTuning,
) -> Option<ScoredTarget> {
    candidates
        .iter()
        .map(|candidate| ScoredTarget {
            candidate: *candidate,
            score: score_enemy(ctx, candidate, &tuning.scoring, tuning.ranges.engage),
        })
        .reduce(|best, next| {
            let better = next.score > best.score
                || (next.score == best.score && next.candidate.distance < best.candidate.distance);
            if better {
                next
            } else {
                best
            }
        })
}

/// Базовая proficiency на action kind
pub fn base_proficiency(kind: ActionKind) -> f32 {
    match kind {
        ActionKind::Blaster => 0.6,
        ActionKind::Rocket => 0.55,
        ActionKind::Railgun => 0.5,
        ActionKind::Hammer => 0.65,
        ActionKind::Shockwave => 0.5,
    }
}

/// Action-usage score: стоит ли вообще тратить action на этой дистанции
pub fn score_action_usage(
    spec: &ActionSpec,
    distance: f32,
    personality: &PersonalityProfile,
    combat: &CombatTuning,
    archetype_bonus: f32,
) -> f32 {
    let base = base_proficiency(spec.kind);
    let range_penalty = (distance - spec.optimal_range).abs() * combat.distance_penalty;
    // skill 1.0 → +50% от base
    let skill_bonus = personality.skill() * 0.5 * base;
    let preference = if personality.archetype().prefers(spec.kind) {
        archetype_bonus
    } else {
        0.0
    };
    base - range_penalty + skill_bonus + preference
}

pub fn is_action_worth_using(
    spec: &ActionSpec,
    distance: f32,
    personality: &PersonalityProfile,
    tuning: &BotTuning,
) -> bool {
    score_action_usage(spec, distance, personality, &tuning.combat, tuning.scoring.archetype_bonus)
        > tuning.combat.usability_threshold
}
