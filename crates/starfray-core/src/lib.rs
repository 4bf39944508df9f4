//! Core types and definitions for the STARFRAY combat engine.
//!
//! This crate defines the vocabulary shared across all other crates:
//! entity handles, per-entity components, the configuration catalog,
//! collaborator traits, commands, events, and constants.
//! It has no dependency on any runtime framework.

pub mod catalog;
pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod presets;
pub mod state;
pub mod types;
