//! Movement компоненты: outbound intent, velocity от физики, параметры тела

use bevy::prelude::*;

/// Команда движения для physics collaborator (пишется AI каждый тик)
///
/// AI никогда не присваивает позицию напрямую: только сила, угловая скорость
/// поворота и триггеры прыжка. Интеграцию выполняет физика (headless или Rapier).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Горизонтальная сила (ньютоны)
    pub force: Vec3,
    /// Угловая скорость вокруг +Y (рад/с), положительная — против часовой сверху
    pub yaw_rate: f32,
    /// Запрос прыжка на этом тике
    pub jump: bool,
    /// Запрос special mobility (dash) на этом тике
    pub mobility: bool,
}

impl MovementIntent {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_moving(&self) -> bool {
        self.force.length_squared() > 1e-4
    }
}

/// Скорость тела (владелец — physics collaborator, AI только читает)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct BodyVelocity {
    pub linear: Vec3,
}

impl BodyVelocity {
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.linear.x, 0.0, self.linear.z).length()
    }
}

/// Физические параметры тела актора
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct BodyTraits {
    /// Масса (кг)
    pub mass: f32,
    /// Максимальная горизонтальная скорость (m/s)
    pub max_speed: f32,
    /// Максимальная сила steering (N)
    pub max_force: f32,
    /// Вертикальная скорость прыжка (m/s)
    pub jump_speed: f32,
    /// Радиус капсулы (m)
    pub radius: f32,
}

impl Default for BodyTraits {
    fn default() -> Self {
        Self {
            mass: 70.0,
            max_speed: 6.0,
            max_force: 2800.0,
            jump_speed: 6.0,
            radius: 0.4,
        }
    }
}

/// Горизонтальная проекция вектора (y = 0)
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}
