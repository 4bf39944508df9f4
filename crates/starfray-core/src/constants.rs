//! Simulation constants and tuning defaults.
//!
//! Every value here seeds a field of [`crate::catalog::Tuning`]; hosts override
//! them through the catalog rather than relying on the exact numbers.

use crate::types::Millis;

/// Default tick length (~30 Hz).
pub const DEFAULT_TICK_MS: Millis = 33;

// --- NPC state machine ---

/// Time a freshly spawned NPC waits before taking up its base behavior.
pub const SPAWN_SETTLE_MS: Millis = 1_000;

/// Time an undocking NPC needs to clear the station.
pub const UNDOCK_DURATION_MS: Millis = 2_000;

/// Aggression level under which a fleeing NPC starts to calm down.
pub const FLEE_CALM_THRESHOLD: f32 = 0.2;

/// How long aggression must stay under the calm threshold before fleeing stops.
pub const FLEE_CALM_DWELL_MS: Millis = 3_000;

// --- Aggression ---

/// Aggression gained per point of damage received.
pub const AGGRESSION_PER_DAMAGE: f32 = 0.01;

/// Quiet time after the last hit before aggression decays.
pub const AGGRESSION_DAMAGE_QUIET_MS: Millis = 5_000;

/// Quiet time after the last combat action before aggression decays.
pub const AGGRESSION_COMBAT_QUIET_MS: Millis = 3_000;

/// Aggression lost per second once decay is allowed.
pub const AGGRESSION_COOLDOWN_RATE: f32 = 0.3;

/// Damage sources older than this are forgotten.
pub const AGGRESSION_SOURCE_WINDOW_MS: Millis = 30_000;

// --- Target analysis ---

/// Minimum time between two target switches.
pub const TARGET_STABILITY_PERIOD_MS: Millis = 1_500;

/// Score margin a challenger needs over the current target (0.4 = 40%).
pub const TARGET_REQUIRED_ADVANTAGE: f32 = 0.4;

pub const SCORE_DAMAGE_WEIGHT: f32 = 2.0;
pub const SCORE_RECENCY_MAX: f32 = 5.0;
pub const SCORE_RECENCY_WINDOW_MS: Millis = 5_000;
pub const SCORE_DISTANCE_WEIGHT: f32 = 0.002;
pub const SCORE_CURRENT_TARGET_BONUS: f32 = 2.0;

/// Recency window of the threat assessment.
pub const THREAT_RECENCY_WINDOW_MS: Millis = 30_000;

/// Distance scale of the threat assessment divisor.
pub const THREAT_DISTANCE_SCALE: f32 = 0.001;

// --- Combat decision ---

pub const RETREAT_LOW_HULL_PRIORITY: f32 = 90.0;
pub const RETREAT_OVERWHELMED_PRIORITY: f32 = 85.0;
pub const FLEE_NON_COMBAT_PRIORITY: f32 = 95.0;
pub const FLEE_TRADER_PRIORITY: f32 = 80.0;
pub const ATTACK_BASE_PRIORITY: f32 = 70.0;
pub const RETALIATE_BASE_PRIORITY: f32 = 60.0;
pub const RETALIATE_DAMAGE_FACTOR: f32 = 0.1;
pub const PATROL_PRIORITY: f32 = 10.0;

/// Number of simultaneous threats that can trigger an overwhelmed retreat.
pub const OVERWHELMED_THREAT_COUNT: usize = 3;

/// Aggression above which an overwhelmed NPC retreats.
pub const OVERWHELMED_AGGRESSION: f32 = 0.7;

/// Attackers that hit within this window may be retaliated against.
pub const RETALIATION_WINDOW_MS: Millis = 10_000;

// --- Movement ---

/// Movement commands older than this are dropped.
pub const MOVEMENT_COMMAND_TTL_MS: Millis = 30_000;

/// How often an attacking NPC renews its pursuit command.
pub const PURSUIT_REFRESH_MS: Millis = 5_000;

/// Orbit radius around home while patrolling.
pub const PATROL_RADIUS: f32 = 400.0;

/// Fraction of the shortest weapon range at which attackers hold.
pub const ENGAGEMENT_RANGE_FACTOR: f32 = 0.8;

/// Distance a fleeing NPC tries to put between itself and the threat.
pub const FLEE_DISTANCE: f32 = 2_000.0;

// --- Ballistics ---

/// Targets slower than this are aimed at directly.
pub const STATIONARY_SPEED: f32 = 0.5;

/// Iteration cap of the intercept solver.
pub const INTERCEPT_MAX_ITERATIONS: u32 = 10;

/// Convergence tolerance of the intercept solver (seconds).
pub const INTERCEPT_TOLERANCE_SECS: f32 = 1e-3;

/// Default cap of the random aim error (degrees).
pub const DEFAULT_MAX_AIM_ERROR_DEG: f32 = 10.0;

/// Homing guidance never re-aims more often than this.
pub const HOMING_MIN_RETARGET_MS: Millis = 50;
