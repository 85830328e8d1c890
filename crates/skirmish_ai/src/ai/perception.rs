//! PerceptionCache — периодический snapshot окружения бота.
//!
//! Мир сканируется не каждый tick, а раз в `refresh_interval` (0.5s) со
//! случайным phase offset на бота, чтобы N ботов не сканировали в один tick.
//! На refresh отбрасываются мёртвые/claimed объекты. Между refresh'ами
//! потребители обязаны перепроверять liveness перед использованием позиции
//! (`WorldRegistry::is_live`).

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::components::{
    Actor, AidKind, BodyVelocity, Claimed, GoalItem, Health, ResourcePickup, TraversalAid,
};

/// Категории объектов мира
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PerceptionCategory {
    Opponents,
    GoalItems,
    Resources,
    TraversalAids,
}

impl PerceptionCategory {
    pub const ALL: [PerceptionCategory; 4] = [
        PerceptionCategory::Opponents,
        PerceptionCategory::GoalItems,
        PerceptionCategory::Resources,
        PerceptionCategory::TraversalAids,
    ];
}

/// Read-only доступ к реестру объектов мира.
///
/// Мутация (claim pickup, damage) идёт только через арену, не через registry.
pub trait WorldRegistry {
    /// Живые объекты категории в радиусе от origin (observer исключён,
    /// для Opponents — только враждебные observer'у)
    fn scan(
        &self,
        category: PerceptionCategory,
        observer: Entity,
        origin: Vec3,
        radius: f32,
    ) -> Vec<(Entity, Vec3)>;

    /// Liveness check: объект существует, жив и не claimed
    fn is_live(&self, category: PerceptionCategory, entity: Entity) -> bool;

    /// Текущая позиция (None — объекта больше нет)
    fn position(&self, entity: Entity) -> Option<Vec3>;
}

/// Per-agent snapshot (refresh по таймеру)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct PerceptionCache {
    opponents: Vec<Entity>,
    goal_items: Vec<Entity>,
    resources: Vec<Entity>,
    traversal_aids: Vec<Entity>,
    /// Время до следующего refresh
    refresh_timer: f32,
    refresh_count: u32,
}

impl PerceptionCache {
    /// Первый refresh — через `phase_offset` секунд
    pub fn with_phase_offset(phase_offset: f32) -> Self {
        Self {
            refresh_timer: phase_offset.max(0.0),
            ..Default::default()
        }
    }

    /// Продвигает таймер; true — пора делать refresh
    pub fn advance(&mut self, delta: f32) -> bool {
        self.refresh_timer -= delta;
        self.refresh_timer <= 0.0
    }

    /// Пересканировать все категории, список отсортирован по дистанции
    pub fn refresh(
        &mut self,
        registry: &impl WorldRegistry,
        observer: Entity,
        origin: Vec3,
        scan_radius: f32,
        refresh_interval: f32,
    ) {
        for category in PerceptionCategory::ALL {
            let mut found: Vec<(Entity, Vec3)> = registry
                .scan(category, observer, origin, scan_radius)
                .into_iter()
                .filter(|(entity, _)| registry.is_live(category, *entity))
                .collect();

            // Tie-break по entity — детерминизм порядка
            found.sort_by(|(a, pa), (b, pb)| {
                pa.distance_squared(origin)
                    .total_cmp(&pb.distance_squared(origin))
                    .then_with(|| a.cmp(b))
            });

            let slot = self.slot_mut(category);
            slot.clear();
            slot.extend(found.into_iter().map(|(entity, _)| entity));
        }

        self.refresh_count += 1;
        // Сохраняем фазу: остаток переносится в следующий период
        self.refresh_timer = (self.refresh_timer + refresh_interval).max(0.0);
    }

    pub fn entries(&self, category: PerceptionCategory) -> &[Entity] {
        match category {
            PerceptionCategory::Opponents => &self.opponents,
            PerceptionCategory::GoalItems => &self.goal_items,
            PerceptionCategory::Resources => &self.resources,
            PerceptionCategory::TraversalAids => &self.traversal_aids,
        }
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_count
    }

    /// Записи, прошедшие liveness check прямо сейчас
    pub fn live_entries<'a, R: WorldRegistry>(
        &'a self,
        category: PerceptionCategory,
        registry: &'a R,
    ) -> impl Iterator<Item = (Entity, Vec3)> + 'a {
        self.entries(category).iter().filter_map(move |&entity| {
            if !registry.is_live(category, entity) {
                return None;
            }
            registry.position(entity).map(|position| (entity, position))
        })
    }

    fn slot_mut(&mut self, category: PerceptionCategory) -> &mut Vec<Entity> {
        match category {
            PerceptionCategory::Opponents => &mut self.opponents,
            PerceptionCategory::GoalItems => &mut self.goal_items,
            PerceptionCategory::Resources => &mut self.resources,
            PerceptionCategory::TraversalAids => &mut self.traversal_aids,
        }
    }
}

/// Снимок актора для scoring
#[derive(Debug, Clone, Copy)]
pub struct ActorSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub health: Health,
    pub team_id: u64,
}

/// Снимок traversal aid
#[derive(Debug, Clone, Copy)]
pub struct AidSnapshot {
    pub position: Vec3,
    pub kind: AidKind,
    pub exit: Vec3,
    pub radius: f32,
}

/// ECS реализация `WorldRegistry` поверх queries
#[derive(SystemParam)]
pub struct SpatialRegistry<'w, 's> {
    actors: Query<
        'w,
        's,
        (
            Entity,
            &'static Actor,
            &'static Health,
            &'static Transform,
            Option<&'static BodyVelocity>,
        ),
    >,
    goal_items: Query<'w, 's, (Entity, &'static Transform, Has<Claimed>), With<GoalItem>>,
    resources: Query<'w, 's, (Entity, &'static Transform, Has<Claimed>), With<ResourcePickup>>,
    aids: Query<'w, 's, (Entity, &'static Transform, &'static TraversalAid)>,
}

impl SpatialRegistry<'_, '_> {
    pub fn actor(&self, entity: Entity) -> Option<ActorSnapshot> {
        let (_, actor, health, transform, velocity) = self.actors.get(entity).ok()?;
        Some(ActorSnapshot {
            position: transform.translation,
            velocity: velocity.map(|v| v.linear).unwrap_or(Vec3::ZERO),
            health: *health,
            team_id: actor.team_id,
        })
    }

    pub fn aid(&self, entity: Entity) -> Option<AidSnapshot> {
        let (_, transform, aid) = self.aids.get(entity).ok()?;
        Some(AidSnapshot {
            position: transform.translation,
            kind: aid.kind,
            exit: aid.exit,
            radius: aid.radius,
        })
    }

    /// Позиции всех живых акторов кроме `except` (separation, spawn clearance)
    pub fn living_actor_positions(&self, except: Entity) -> Vec<(Entity, Vec3)> {
        self.actors
            .iter()
            .filter(|(entity, _, health, _, _)| *entity != except && health.is_alive())
            .map(|(entity, _, _, transform, _)| (entity, transform.translation))
            .collect()
    }
}

impl WorldRegistry for SpatialRegistry<'_, '_> {
    fn scan(
        &self,
        category: PerceptionCategory,
        observer: Entity,
        origin: Vec3,
        radius: f32,
    ) -> Vec<(Entity, Vec3)> {
        let radius_sq = radius * radius;
        let in_range = |position: Vec3| position.distance_squared(origin) <= radius_sq;

        match category {
            PerceptionCategory::Opponents => {
                let Ok((_, observer_actor, ..)) = self.actors.get(observer) else {
                    return Vec::new();
                };
                self.actors
                    .iter()
                    .filter(|(entity, actor, health, transform, _)| {
                        *entity != observer
                            && observer_actor.is_hostile_to(actor)
                            && health.is_alive()
                            && in_range(transform.translation)
                    })
                    .map(|(entity, _, _, transform, _)| (entity, transform.translation))
                    .collect()
            }
            PerceptionCategory::GoalItems => self
                .goal_items
                .iter()
                .filter(|(_, transform, claimed)| !claimed && in_range(transform.translation))
                .map(|(entity, transform, _)| (entity, transform.translation))
                .collect(),
            PerceptionCategory::Resources => self
                .resources
                .iter()
                .filter(|(_, transform, claimed)| !claimed && in_range(transform.translation))
                .map(|(entity, transform, _)| (entity, transform.translation))
                .collect(),
            PerceptionCategory::TraversalAids => self
                .aids
                .iter()
                .filter(|(_, transform, _)| in_range(transform.translation))
                .map(|(entity, transform, _)| (entity, transform.translation))
                .collect(),
        }
    }

    fn is_live(&self, category: PerceptionCategory, entity: Entity) -> bool {
        match category {
            PerceptionCategory::Opponents => self
                .actors
                .get(entity)
                .is_ok_and(|(_, _, health, _, _)| health.is_alive()),
            PerceptionCategory::GoalItems => self
                .goal_items
                .get(entity)
                .is_ok_and(|(_, _, claimed)| !claimed),
            PerceptionCategory::Resources => self
                .resources
                .get(entity)
                .is_ok_and(|(_, _, claimed)| !claimed),
            PerceptionCategory::TraversalAids => self.aids.contains(entity),
        }
    }

    fn position(&self, entity: Entity) -> Option<Vec3> {
        if let Ok((_, _, _, transform, _)) = self.actors.get(entity) {
            return Some(transform.translation);
        }
        if let Ok((_, transform, _)) = self.goal_items.get(entity) {
            return Some(transform.translation);
        }
        if let Ok((_, transform, _)) = self.resources.get(entity) {
            return Some(transform.translation);
        }
        self.aids.get(entity).ok().map(|(_, transform, _)| transform.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory registry для тестов
    #[derive(Default)]
    struct FakeRegistry {
        objects: HashMap<Entity, (PerceptionCategory, Vec3, bool)>,
    }

    impl FakeRegistry {
        fn insert(&mut self, id: u32, category: PerceptionCategory, position: Vec3) -> Entity {
            let entity = Entity::from_raw(id);
            self.objects.insert(entity, (category, position, true));
            entity
        }

        fn kill(&mut self, entity: Entity) {
            if let Some(entry) = self.objects.get_mut(&entity) {
                entry.2 = false;
            }
        }
    }

    impl WorldRegistry for FakeRegistry {
        fn scan(
            &self,
            category: PerceptionCategory,
            observer: Entity,
            origin: Vec3,
            radius: f32,
        ) -> Vec<(Entity, Vec3)> {
            // Возвращаем и мёртвые — cache обязан их отфильтровать
            self.objects
                .iter()
                .filter(|(entity, (cat, position, _))| {
                    **entity != observer && *cat == category && position.distance(origin) <= radius
                })
                .map(|(entity, (_, position, _))| (*entity, *position))
                .collect()
        }

        fn is_live(&self, category: PerceptionCategory, entity: Entity) -> bool {
            self.objects
                .get(&entity)
                .is_some_and(|(cat, _, alive)| *cat == category && *alive)
        }

        fn position(&self, entity: Entity) -> Option<Vec3> {
            self.objects.get(&entity).map(|(_, position, _)| *position)
        }
    }

    const OBSERVER: u32 = 1000;

    #[test]
    fn test_phase_offset_delays_first_refresh() {
        let mut cache = PerceptionCache::with_phase_offset(0.25);
        assert!(!cache.advance(0.1));
        assert!(!cache.advance(0.1));
        assert!(cache.advance(0.1));
    }

    #[test]
    fn test_refresh_sorted_by_distance_and_filters_dead() {
        let mut registry = FakeRegistry::default();
        let far = registry.insert(1, PerceptionCategory::Opponents, Vec3::new(20.0, 0.0, 0.0));
        let near = registry.insert(2, PerceptionCategory::Opponents, Vec3::new(3.0, 0.0, 0.0));
        let dead = registry.insert(3, PerceptionCategory::Opponents, Vec3::new(1.0, 0.0, 0.0));
        let item = registry.insert(4, PerceptionCategory::GoalItems, Vec3::new(0.0, 0.0, 5.0));
        // Вне радиуса
        registry.insert(5, PerceptionCategory::Resources, Vec3::new(500.0, 0.0, 0.0));
        registry.kill(dead);

        let mut cache = PerceptionCache::default();
        cache.refresh(&registry, Entity::from_raw(OBSERVER), Vec3::ZERO, 60.0, 0.5);

        assert_eq!(cache.entries(PerceptionCategory::Opponents), &[near, far]);
        assert_eq!(cache.entries(PerceptionCategory::GoalItems), &[item]);
        assert!(cache.entries(PerceptionCategory::Resources).is_empty());
        assert_eq!(cache.refresh_count(), 1);
    }

    #[test]
    fn test_refresh_then_check_all_live() {
        let mut registry = FakeRegistry::default();
        for id in 0..20 {
            let category = PerceptionCategory::ALL[(id % 4) as usize];
            let entity = registry.insert(id, category, Vec3::new(id as f32, 0.0, 0.0));
            if id % 3 == 0 {
                registry.kill(entity);
            }
        }

        let mut cache = PerceptionCache::default();
        cache.refresh(&registry, Entity::from_raw(OBSERVER), Vec3::ZERO, 60.0, 0.5);

        for category in PerceptionCategory::ALL {
            for entity in cache.entries(category) {
                assert!(registry.is_live(category, *entity), "{entity} survived refresh dead");
            }
        }
    }

    #[test]
    fn test_stale_entry_filtered_by_live_entries() {
        let mut registry = FakeRegistry::default();
        let item = registry.insert(1, PerceptionCategory::GoalItems, Vec3::new(4.0, 0.0, 0.0));

        let mut cache = PerceptionCache::default();
        cache.refresh(&registry, Entity::from_raw(OBSERVER), Vec3::ZERO, 60.0, 0.5);
        assert_eq!(cache.live_entries(PerceptionCategory::GoalItems, &registry).count(), 1);

        // Объект исчез между refresh'ами — snapshot ещё помнит его
        registry.kill(item);
        assert_eq!(cache.entries(PerceptionCategory::GoalItems), &[item]);
        assert_eq!(cache.live_entries(PerceptionCategory::GoalItems, &registry).count(), 0);
    }

    #[test]
    fn test_refresh_keeps_period() {
        let registry = FakeRegistry::default();
        let mut cache = PerceptionCache::with_phase_offset(0.1);
        let mut refreshes = 0;

        // 3 секунды по 1/60
        for _ in 0..180 {
            if cache.advance(1.0 / 60.0) {
                cache.refresh(&registry, Entity::from_raw(OBSERVER), Vec3::ZERO, 60.0, 0.5);
                refreshes += 1;
            }
        }
        assert!((6..=7).contains(&refreshes), "refreshes = {refreshes}");
    }
}
