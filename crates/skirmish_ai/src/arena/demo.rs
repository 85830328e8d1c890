//! Демо-арена: две базы, центральная платформа, яма, балка, pickups и aids

use bevy::prelude::*;

use super::geometry::ArenaGeometry;
use super::spawn::{spawn_aid, spawn_bot, spawn_goal_item, spawn_resource, spawn_spawn_point};
use crate::components::{ActionKind, ActionSpec, AidKind};

const HALF: f32 = 30.0;

/// Пол с ямой посередине, платформа, укрытия и низкая балка
pub fn demo_geometry() -> ArenaGeometry {
    let pit = 3.0;
    ArenaGeometry::default()
        // Пол: четыре плиты вокруг ямы
        .with_block(Vec3::new(-HALF, -1.0, -HALF), Vec3::new(HALF, 0.0, -pit))
        .with_block(Vec3::new(-HALF, -1.0, pit), Vec3::new(HALF, 0.0, HALF))
        .with_block(Vec3::new(-HALF, -1.0, -pit), Vec3::new(-pit, 0.0, pit))
        .with_block(Vec3::new(pit, -1.0, -pit), Vec3::new(HALF, 0.0, pit))
        // Периметр
        .with_block(Vec3::new(-HALF - 1.0, 0.0, -HALF - 1.0), Vec3::new(HALF + 1.0, 4.0, -HALF))
        .with_block(Vec3::new(-HALF - 1.0, 0.0, HALF), Vec3::new(HALF + 1.0, 4.0, HALF + 1.0))
        .with_block(Vec3::new(-HALF - 1.0, 0.0, -HALF), Vec3::new(-HALF, 4.0, HALF))
        .with_block(Vec3::new(HALF, 0.0, -HALF), Vec3::new(HALF + 1.0, 4.0, HALF))
        // Верхний ярус
        .with_platform(Vec2::new(-6.0, 12.0), Vec2::new(6.0, 18.0), 3.0)
        // Укрытия
        .with_block(Vec3::new(-12.0, 0.0, -8.0), Vec3::new(-10.0, 2.0, -6.0))
        .with_block(Vec3::new(10.0, 0.0, 6.0), Vec3::new(12.0, 2.0, 8.0))
        // Низкая балка над проходом (overhead obstacle)
        .with_block(Vec3::new(-4.0, 1.1, -14.0), Vec3::new(4.0, 1.5, -13.0))
}

/// Наполнить арену: spawn points, pickups, aids и `per_team` ботов на команду
pub fn populate_demo(commands: &mut Commands, per_team: usize) -> Vec<Entity> {
    for position in [
        Vec3::new(-24.0, 0.0, -24.0),
        Vec3::new(24.0, 0.0, -24.0),
        Vec3::new(-24.0, 0.0, 24.0),
        Vec3::new(24.0, 0.0, 24.0),
    ] {
        spawn_spawn_point(commands, position);
    }

    spawn_goal_item(commands, Vec3::new(0.0, 3.0, 15.0), ActionSpec::railgun());
    spawn_goal_item(commands, Vec3::new(-15.0, 0.0, 0.0), ActionSpec::rocket());
    spawn_goal_item(commands, Vec3::new(15.0, 0.0, 0.0), ActionSpec::hammer());
    spawn_goal_item(commands, Vec3::new(0.0, 0.0, -20.0), ActionSpec::shockwave());
    spawn_resource(commands, Vec3::new(-20.0, 0.0, 10.0), 1);
    spawn_resource(commands, Vec3::new(20.0, 0.0, -10.0), 1);

    spawn_aid(
        commands,
        Vec3::new(0.0, 0.0, 9.0),
        AidKind::JumpRail,
        Vec3::new(0.0, 3.0, 14.0),
        Vec3::new(0.0, 8.0, 4.0),
    );
    spawn_aid(
        commands,
        Vec3::new(-20.0, 0.0, -5.0),
        AidKind::BoostPad,
        Vec3::new(-20.0, 0.0, 8.0),
        Vec3::new(0.0, 3.0, 12.0),
    );
    spawn_aid(
        commands,
        Vec3::new(25.0, 0.0, 0.0),
        AidKind::Teleporter,
        Vec3::new(-25.0, 0.0, 0.0),
        Vec3::ZERO,
    );

    let mut bots = Vec::new();
    for i in 0..per_team {
        let offset = i as f32 * 3.0;
        bots.push(spawn_bot(
            commands,
            Vec3::new(-20.0 + offset, 0.0, -20.0),
            1,
            Some(ActionSpec::preset(ActionKind::Blaster)),
        ));
        bots.push(spawn_bot(commands, Vec3::new(20.0 - offset, 0.0, 20.0), 2, None));
    }
    bots
}
