//! Combat AI for STARFRAY.
//!
//! Pure decision logic over plain component data: aggression tracking,
//! target analysis, combat decision synthesis, the NPC state machine,
//! and faction relation rules.

pub mod aggression;
pub mod decision;
pub mod error;
pub mod factions;
pub mod fsm;
pub mod targeting;

pub use starfray_core as core;

#[cfg(test)]
mod tests;
