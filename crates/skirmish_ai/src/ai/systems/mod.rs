//! AI systems (FixedUpdate, chained)

pub mod combat;
pub mod fsm;
pub mod lifecycle;
pub mod movement;
pub mod recovery;

// Re-export all systems
pub use combat::*;
pub use fsm::*;
pub use lifecycle::*;
pub use movement::*;
pub use recovery::*;
