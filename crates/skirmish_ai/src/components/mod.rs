//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: базовые характеристики (team, health, bot marker)
//! - movement: outbound movement intent, physics-reported velocity, body traits
//! - equipment: held action, charge capability, action presets
//! - world: pickups, traversal aids, spawn points

pub mod actor;
pub mod equipment;
pub mod movement;
pub mod world;

// Re-exports для удобного импорта
pub use actor::*;
pub use equipment::*;
pub use movement::*;
pub use world::*;
