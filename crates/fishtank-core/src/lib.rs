//! Core simulation types for the fishtank workspace.
//!
//! Two cooperating components advanced by a shared frame loop: [`FoodSupply`]
//! manages the transient population of food pellets (rate-limited spawning,
//! age-based expiry, idempotent consumption), and [`MovementEngine`] drives
//! one behavior/physics state per fish (state machine, continuous-time
//! integration, food arbitration). [`Aquarium`] binds the two together and
//! emits a per-frame presentation snapshot.
//!
//! The engine is single-threaded and callback-driven: the owner calls
//! [`Aquarium::step`] once per frame with the current roster and elapsed
//! seconds, and runs [`Aquarium::sweep_expired`] on its own slower cadence.

use fishtank_index::{LinearScanIndex, ProximityIndex};
use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::f32::consts::TAU;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// External coordinates span 0–100 on each axis.
pub const NORMALIZED_SPAN: f32 = 100.0;

/// Elapsed time per frame is clamped to this many seconds so a stalled frame
/// loop cannot teleport fish across the tank.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Food never spawns closer to a wall than this normalized margin.
pub const SPAWN_MARGIN: f32 = 5.0;

const WALL_DAMPING: f32 = 0.9;
const TARGET_ATTEMPTS: usize = 12;

/// Stable identifier for a fish, owned by the external roster source.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct FishId(pub u64);

/// Identifier for a food pellet, allocated from a per-supply sequence.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct FoodId(pub u64);

/// Axis-aligned 2D position in pixel space.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Velocity in pixels per second.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    /// Construct a new velocity vector.
    #[must_use]
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    /// Scalar speed.
    #[must_use]
    pub fn speed(self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Tank extent in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TankBounds {
    pub width: f32,
    pub height: f32,
}

fn to_pixels(normalized: f32, extent: f32) -> f32 {
    (normalized / NORMALIZED_SPAN).clamp(0.0, 1.0) * extent
}

fn to_normalized(pixels: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    (pixels / extent * NORMALIZED_SPAN).clamp(0.0, NORMALIZED_SPAN)
}

/// Rarity tier of a fish; only used to derive movement parameters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RarityTier {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    /// (speed, dart burst, detection radius, curiosity/variation) multipliers.
    const fn multipliers(self) -> (f32, f32, f32, f32) {
        match self {
            Self::Common => (1.0, 1.0, 1.0, 1.0),
            Self::Uncommon => (1.08, 1.05, 1.05, 1.1),
            Self::Rare => (1.18, 1.1, 1.12, 1.2),
            Self::Epic => (1.3, 1.18, 1.2, 1.35),
            Self::Legendary => (1.45, 1.25, 1.3, 1.5),
        }
    }
}

/// High-level activity mode governing speed and target selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Behavior {
    Idle,
    #[default]
    Exploring,
    Darting,
    Hovering,
    Turning,
    Feeding,
    Playful,
}

impl Behavior {
    /// Stable lowercase label for presentation layers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Exploring => "exploring",
            Self::Darting => "darting",
            Self::Hovering => "hovering",
            Self::Turning => "turning",
            Self::Feeding => "feeding",
            Self::Playful => "playful",
        }
    }
}

/// Periodic perturbation shape layered onto a fish's seek velocity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SwimPattern {
    #[default]
    Straight,
    Zigzag,
    Circular,
    Spiral,
}

/// Errors that can occur when constructing simulation state.
#[derive(Debug, Error)]
pub enum AquariumError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Tunable movement baseline shared by all fish; per-fish values are these
/// scaled by the rarity tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementTuning {
    /// Baseline cruise speed in px/s.
    pub base_speed: f32,
    /// Exponential blend rate pulling actual velocity toward desired velocity.
    pub turn_rate: f32,
    /// Speed multiplier while darting.
    pub dart_multiplier: f32,
    /// Fraction of base speed while hovering.
    pub hover_factor: f32,
    /// Peak approach speed while feeding, decelerating near the target.
    pub feeding_speed: f32,
    /// Minimum distance kept from every wall, in px.
    pub boundary_padding: f32,
    /// Maximum distance at which a fish notices food, in px.
    pub food_detection_radius: f32,
    /// Safe targets are regenerated at least this far from the fish.
    pub min_retarget_distance: f32,
    /// Seconds between permitted facing flips.
    pub direction_cooldown: f32,
    /// Starting energy level, in [0, 1].
    pub base_energy: f32,
    /// Passive energy recovery per second.
    pub energy_recovery: f32,
    /// Energy cost per pixel travelled.
    pub movement_drain: f32,
    /// Energy gained on a successful feeding.
    pub feed_energy_boost: f32,
    /// Magnitude of the swim-pattern perturbation, in px/s.
    pub swim_variation: f32,
    /// Weights the exploring arm of the behavior draw, in [0, 1].
    pub curiosity: f32,
    /// Retargets allowed before a fish gives up chasing food for a while.
    pub max_feeding_attempts: u32,
    /// Seconds after a feeding event before food may be targeted again.
    pub feeding_cooldown: f32,
    /// Base contact radius for eating, in px.
    pub collision_radius: f32,
    /// Contact radius jitter, resampled per approach so two fish never settle
    /// into identical orbits around the same pellet.
    pub collision_jitter: f32,
    /// Minimum speed outside hovering, in px/s.
    pub velocity_floor: f32,
    /// Horizontal speed below which facing is left untouched.
    pub facing_flip_speed: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            base_speed: 46.0,
            turn_rate: 3.2,
            dart_multiplier: 2.6,
            hover_factor: 0.22,
            feeding_speed: 95.0,
            boundary_padding: 30.0,
            food_detection_radius: 140.0,
            min_retarget_distance: 90.0,
            direction_cooldown: 0.45,
            base_energy: 0.7,
            energy_recovery: 0.04,
            movement_drain: 0.0006,
            feed_energy_boost: 0.25,
            swim_variation: 14.0,
            curiosity: 0.5,
            max_feeding_attempts: 3,
            feeding_cooldown: 1.5,
            collision_radius: 20.0,
            collision_jitter: 2.0,
            velocity_floor: 9.0,
            facing_flip_speed: 6.0,
        }
    }
}

/// Static configuration for an aquarium simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AquariumConfig {
    /// Tank width in pixels.
    pub tank_width: f32,
    /// Tank height in pixels.
    pub tank_height: f32,
    /// Maximum food spawns per second.
    pub max_spawn_rate: f32,
    /// Seconds before an uneaten pellet expires.
    pub food_lifetime: f32,
    /// Attraction radius recorded on each spawned pellet, in px.
    pub food_attraction_radius: f32,
    /// Grow-in rate for the cosmetic pellet scale, per second.
    pub food_growth_rate: f32,
    /// Optional RNG seed for reproducible simulations.
    pub rng_seed: Option<u64>,
    /// Frames between summary samples; 0 disables summaries.
    pub summary_interval: u32,
    /// Maximum number of recent frame summaries retained in-memory.
    pub history_capacity: usize,
    /// Movement baseline.
    pub movement: MovementTuning,
}

impl Default for AquariumConfig {
    fn default() -> Self {
        Self {
            tank_width: 800.0,
            tank_height: 600.0,
            max_spawn_rate: 3.0,
            food_lifetime: 15.0,
            food_attraction_radius: 50.0,
            food_growth_rate: 2.5,
            rng_seed: None,
            summary_interval: 60,
            history_capacity: 256,
            movement: MovementTuning::default(),
        }
    }
}

impl AquariumConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), AquariumError> {
        let movement = &self.movement;
        if !(self.tank_width.is_finite() && self.tank_height.is_finite())
            || self.tank_width <= 0.0
            || self.tank_height <= 0.0
        {
            return Err(AquariumError::InvalidConfig(
                "tank dimensions must be positive and finite",
            ));
        }
        if movement.boundary_padding < 0.0
            || movement.boundary_padding * 2.0 >= self.tank_width.min(self.tank_height)
        {
            return Err(AquariumError::InvalidConfig(
                "boundary_padding must be non-negative and leave interior space",
            ));
        }
        if self.max_spawn_rate <= 0.0 {
            return Err(AquariumError::InvalidConfig(
                "max_spawn_rate must be positive",
            ));
        }
        if self.food_lifetime <= 0.0 {
            return Err(AquariumError::InvalidConfig(
                "food_lifetime must be positive",
            ));
        }
        if self.food_attraction_radius <= 0.0 || movement.food_detection_radius <= 0.0 {
            return Err(AquariumError::InvalidConfig(
                "attraction and detection radii must be positive",
            ));
        }
        if self.food_growth_rate < 0.0 {
            return Err(AquariumError::InvalidConfig(
                "food_growth_rate must be non-negative",
            ));
        }
        if movement.base_speed <= 0.0
            || movement.feeding_speed <= 0.0
            || movement.turn_rate <= 0.0
            || movement.dart_multiplier < 1.0
        {
            return Err(AquariumError::InvalidConfig(
                "speeds and turn_rate must be positive, dart_multiplier at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&movement.hover_factor) || movement.hover_factor == 0.0 {
            return Err(AquariumError::InvalidConfig(
                "hover_factor must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&movement.base_energy)
            || !(0.0..=1.0).contains(&movement.curiosity)
        {
            return Err(AquariumError::InvalidConfig(
                "base_energy and curiosity must be in [0, 1]",
            ));
        }
        if movement.energy_recovery < 0.0
            || movement.movement_drain < 0.0
            || movement.feed_energy_boost < 0.0
        {
            return Err(AquariumError::InvalidConfig(
                "energy rates must be non-negative",
            ));
        }
        if movement.max_feeding_attempts == 0 {
            return Err(AquariumError::InvalidConfig(
                "max_feeding_attempts must be at least 1",
            ));
        }
        if movement.collision_radius <= 0.0
            || movement.collision_jitter < 0.0
            || movement.collision_jitter >= movement.collision_radius
        {
            return Err(AquariumError::InvalidConfig(
                "collision_radius must be positive and exceed its jitter",
            ));
        }
        if movement.min_retarget_distance <= 0.0
            || movement.direction_cooldown < 0.0
            || movement.feeding_cooldown < 0.0
            || movement.swim_variation < 0.0
            || movement.velocity_floor < 0.0
            || movement.facing_flip_speed < 0.0
        {
            return Err(AquariumError::InvalidConfig(
                "movement distances and cooldowns must be non-negative",
            ));
        }
        if self.history_capacity == 0 {
            return Err(AquariumError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed was set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }

    /// Tank extent in pixels.
    #[must_use]
    pub const fn bounds(&self) -> TankBounds {
        TankBounds {
            width: self.tank_width,
            height: self.tank_height,
        }
    }
}

/// Movement parameters derived once per fish from its rarity tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementParams {
    pub speed: f32,
    pub turn_rate: f32,
    pub dart_multiplier: f32,
    pub hover_factor: f32,
    pub feeding_speed: f32,
    pub boundary_padding: f32,
    pub food_detection_radius: f32,
    pub min_retarget_distance: f32,
    pub direction_cooldown: f32,
    pub base_energy: f32,
    pub energy_recovery: f32,
    pub movement_drain: f32,
    pub feed_energy_boost: f32,
    pub swim_variation: f32,
    pub curiosity: f32,
    pub max_feeding_attempts: u32,
    pub feeding_cooldown: f32,
    pub collision_radius: f32,
    pub collision_jitter: f32,
    pub velocity_floor: f32,
    pub facing_flip_speed: f32,
}

impl MovementParams {
    /// Derive the parameter set for a tier from the shared baseline.
    #[must_use]
    pub fn for_tier(tier: RarityTier, tuning: &MovementTuning) -> Self {
        let (speed_mul, dart_mul, detect_mul, flavor_mul) = tier.multipliers();
        Self {
            speed: tuning.base_speed * speed_mul,
            turn_rate: tuning.turn_rate,
            dart_multiplier: tuning.dart_multiplier * dart_mul,
            hover_factor: tuning.hover_factor,
            feeding_speed: tuning.feeding_speed * speed_mul,
            boundary_padding: tuning.boundary_padding,
            food_detection_radius: tuning.food_detection_radius * detect_mul,
            min_retarget_distance: tuning.min_retarget_distance,
            direction_cooldown: tuning.direction_cooldown,
            base_energy: tuning.base_energy,
            energy_recovery: tuning.energy_recovery,
            movement_drain: tuning.movement_drain,
            feed_energy_boost: tuning.feed_energy_boost,
            swim_variation: tuning.swim_variation * flavor_mul,
            curiosity: (tuning.curiosity * flavor_mul).min(1.0),
            max_feeding_attempts: tuning.max_feeding_attempts,
            feeding_cooldown: tuning.feeding_cooldown,
            collision_radius: tuning.collision_radius,
            collision_jitter: tuning.collision_jitter,
            velocity_floor: tuning.velocity_floor,
            facing_flip_speed: tuning.facing_flip_speed,
        }
    }
}

/// One roster entry handed to the engine each frame. Positions are normalized
/// (0–100) and only read when a fish is first seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FishDescriptor {
    pub id: FishId,
    pub x: f32,
    pub y: f32,
    pub tier: RarityTier,
}

/// Full behavior/physics state for one fish, owned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementState {
    pub position: Position,
    pub velocity: Velocity,
    pub target: Position,
    pub behavior: Behavior,
    pub behavior_timer: f32,
    pub exploration_timer: f32,
    pub playfulness_timer: f32,
    pub pattern_timer: f32,
    pub pattern: SwimPattern,
    pub pattern_phase: f32,
    pub facing_left: bool,
    pub facing_cooldown: f32,
    pub energy: f32,
    pub target_food: Option<FoodId>,
    pub feeding_attempts: u32,
    pub feeding_cooldown: f32,
    pub contact_radius: f32,
    pub last_food_consumed: Option<FoodId>,
}

/// Read-only per-fish projection emitted each frame, safe to hand straight to
/// a presentation layer. Positions are normalized (0–100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FishFrame {
    pub id: FishId,
    pub x: f32,
    pub y: f32,
    pub facing_left: bool,
    pub behavior: Behavior,
}

/// One food pellet. Positions are normalized (0–100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub id: FoodId,
    pub x: f32,
    pub y: f32,
    pub spawned_at: f64,
    pub consumed: bool,
    pub attraction_radius: f32,
    pub scale: f32,
}

/// Pixel-space view of one pellet handed to the movement engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FoodSnapshot {
    pub id: FoodId,
    pub position: Position,
    pub consumed: bool,
    pub attraction_radius: f32,
}

/// Manages the transient food population: rate-limited spawning, age-based
/// expiry, and idempotent consumption.
///
/// Time is an internal seconds clock advanced by the owner, so rate limiting
/// and expiry are deterministic and testable without wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodSupply {
    clock: f64,
    next_id: u64,
    last_spawn: Option<f64>,
    spawn_cooldown: f64,
    lifetime: f64,
    attraction_radius: f32,
    growth_rate: f32,
    bounds: TankBounds,
    items: Vec<FoodItem>,
}

impl FoodSupply {
    /// Create an empty supply from the aquarium configuration.
    #[must_use]
    pub fn new(config: &AquariumConfig) -> Self {
        Self {
            clock: 0.0,
            next_id: 0,
            last_spawn: None,
            spawn_cooldown: 1.0 / f64::from(config.max_spawn_rate),
            lifetime: f64::from(config.food_lifetime),
            attraction_radius: config.food_attraction_radius,
            growth_rate: config.food_growth_rate,
            bounds: config.bounds(),
            items: Vec::new(),
        }
    }

    /// Advance the internal clock by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.clock += dt;
        }
    }

    /// Current clock value in seconds.
    #[must_use]
    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Active (unconsumed, unexpired) pellets in id order.
    #[must_use]
    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    /// Number of active pellets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when no pellets are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn index_of(&self, id: FoodId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |item| item.id).ok()
    }

    /// Attempt to spawn a pellet at the given pixel coordinate.
    ///
    /// Returns `false` without any state change while the spawn cooldown is
    /// still running. On success the coordinate is converted to a normalized
    /// position clamped to a 5–95% margin so food never lands flush against
    /// a wall.
    pub fn spawn(&mut self, x: f32, y: f32) -> bool {
        if let Some(last) = self.last_spawn
            && self.clock < last + self.spawn_cooldown
        {
            debug!(clock = self.clock, "food spawn rejected by rate limit");
            return false;
        }
        let id = FoodId(self.next_id);
        self.next_id += 1;
        let margin_max = NORMALIZED_SPAN - SPAWN_MARGIN;
        self.items.push(FoodItem {
            id,
            x: to_normalized(x, self.bounds.width).clamp(SPAWN_MARGIN, margin_max),
            y: to_normalized(y, self.bounds.height).clamp(SPAWN_MARGIN, margin_max),
            spawned_at: self.clock,
            consumed: false,
            attraction_radius: self.attraction_radius,
            scale: 0.0,
        });
        self.last_spawn = Some(self.clock);
        true
    }

    /// Consume a pellet by id.
    ///
    /// Compare-and-remove: returns `true` only when the pellet was present
    /// and unconsumed (the removal actually happened this call). Absent or
    /// already-removed ids are a no-op returning `false` — several fish may
    /// race for the same pellet and every loser lands here.
    pub fn consume(&mut self, id: FoodId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.items[index].consumed {
            return false;
        }
        self.items.remove(index);
        true
    }

    /// Whether a pellet is still present and edible.
    #[must_use]
    pub fn is_available(&self, id: FoodId) -> bool {
        self.index_of(id)
            .is_some_and(|index| !self.items[index].consumed)
    }

    /// Look up a pellet by id.
    #[must_use]
    pub fn get(&self, id: FoodId) -> Option<&FoodItem> {
        self.index_of(id).map(|index| &self.items[index])
    }

    /// Remove every pellet older than the configured lifetime, returning the
    /// number removed. This is the only place expiry happens; it is intended
    /// to run on a slower independent timer than the frame loop.
    pub fn sweep_expired(&mut self) -> usize {
        let clock = self.clock;
        let lifetime = self.lifetime;
        let before = self.items.len();
        self.items
            .retain(|item| clock - item.spawned_at <= lifetime);
        let expired = before - self.items.len();
        if expired > 0 {
            debug!(expired, remaining = self.items.len(), "expired food swept");
        }
        expired
    }

    /// Step each pellet's cosmetic grow-in scale toward 1.0. Has no effect on
    /// consumption logic.
    pub fn animate(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let step = self.growth_rate * dt;
        for item in &mut self.items {
            item.scale = (item.scale + step).min(1.0);
        }
    }

    /// Pixel-space snapshot of the active pellets for the movement engine.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FoodSnapshot> {
        self.items
            .iter()
            .map(|item| FoodSnapshot {
                id: item.id,
                position: Position::new(
                    to_pixels(item.x, self.bounds.width),
                    to_pixels(item.y, self.bounds.height),
                ),
                consumed: item.consumed,
                attraction_radius: item.attraction_radius,
            })
            .collect()
    }
}

/// Maintains one movement state per live fish and advances them each frame.
pub struct MovementEngine {
    bounds: TankBounds,
    tuning: MovementTuning,
    rng: SmallRng,
    params: HashMap<FishId, MovementParams>,
    states: HashMap<FishId, MovementState>,
    index: LinearScanIndex,
}

impl fmt::Debug for MovementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovementEngine")
            .field("bounds", &self.bounds)
            .field("fish_count", &self.states.len())
            .finish()
    }
}

impl MovementEngine {
    /// Build an engine from the aquarium configuration.
    #[must_use]
    pub fn new(config: &AquariumConfig) -> Self {
        Self {
            bounds: config.bounds(),
            tuning: config.movement.clone(),
            rng: config.seeded_rng(),
            params: HashMap::new(),
            states: HashMap::new(),
            index: LinearScanIndex::new(),
        }
    }

    /// Number of fish currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true when no fish are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Borrow the movement state of a fish.
    #[must_use]
    pub fn state(&self, id: FishId) -> Option<&MovementState> {
        self.states.get(&id)
    }

    /// Mutably borrow the movement state of a fish (control surfaces, tests).
    #[must_use]
    pub fn state_mut(&mut self, id: FishId) -> Option<&mut MovementState> {
        self.states.get_mut(&id)
    }

    /// Borrow the cached derived parameters of a fish.
    #[must_use]
    pub fn params_for(&self, id: FishId) -> Option<&MovementParams> {
        self.params.get(&id)
    }

    /// Advance every fish by `dt` seconds against the given food snapshot.
    ///
    /// Produces the new state collection wholesale — a reader holding the
    /// previous frame's states never observes a half-updated fish. The
    /// consumption callback must report whether the consume actually removed
    /// the pellet; the engine treats `false` as "someone else got there
    /// first" and the fish falls back to exploring.
    pub fn advance(
        &mut self,
        roster: &[FishDescriptor],
        food: &[FoodSnapshot],
        dt: f32,
        on_consume: &mut dyn FnMut(FishId, FoodId) -> bool,
    ) -> Vec<FishFrame> {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);

        let live: HashSet<FishId> = roster.iter().map(|descriptor| descriptor.id).collect();
        self.params.retain(|id, _| live.contains(id));

        let points: Vec<(f32, f32)> = food
            .iter()
            .map(|item| (item.position.x, item.position.y))
            .collect();
        let food_indexed = self.index.rebuild(&points).is_ok();
        let max_attraction = food
            .iter()
            .map(|item| item.attraction_radius)
            .fold(0.0, f32::max);

        let bounds = self.bounds;
        let tuning = &self.tuning;
        let rng = &mut self.rng;
        let params_cache = &mut self.params;
        let previous = &self.states;
        let index = &self.index;

        let mut next = HashMap::with_capacity(roster.len());
        let mut frames = Vec::with_capacity(roster.len());
        for descriptor in roster {
            let params = params_cache
                .entry(descriptor.id)
                .or_insert_with(|| MovementParams::for_tier(descriptor.tier, tuning));
            let mut state = previous
                .get(&descriptor.id)
                .cloned()
                .unwrap_or_else(|| spawn_state(descriptor, params, bounds, rng));

            update_fish(
                descriptor.id,
                &mut state,
                params,
                bounds,
                food,
                index,
                food_indexed,
                max_attraction,
                rng,
                dt,
                on_consume,
            );

            frames.push(FishFrame {
                id: descriptor.id,
                x: to_normalized(state.position.x, bounds.width),
                y: to_normalized(state.position.y, bounds.height),
                facing_left: state.facing_left,
                behavior: state.behavior,
            });
            next.insert(descriptor.id, state);
        }
        self.states = next;
        frames
    }
}

fn spawn_state(
    descriptor: &FishDescriptor,
    params: &MovementParams,
    bounds: TankBounds,
    rng: &mut SmallRng,
) -> MovementState {
    let padding = params.boundary_padding;
    let position = Position::new(
        to_pixels(descriptor.x, bounds.width).clamp(padding, (bounds.width - padding).max(padding)),
        to_pixels(descriptor.y, bounds.height)
            .clamp(padding, (bounds.height - padding).max(padding)),
    );
    let velocity = Velocity::new(rng.random_range(-12.0..12.0), rng.random_range(-8.0..8.0));
    MovementState {
        position,
        velocity,
        target: pick_safe_target(position, params, bounds, rng),
        behavior: Behavior::Exploring,
        behavior_timer: rng.random_range(3.0..7.0),
        exploration_timer: rng.random_range(6.0..12.0),
        playfulness_timer: rng.random_range(8.0..16.0),
        pattern_timer: rng.random_range(4.0..9.0),
        pattern: random_pattern(rng),
        pattern_phase: rng.random_range(0.0..TAU),
        facing_left: velocity.vx < 0.0,
        facing_cooldown: 0.0,
        energy: params.base_energy.clamp(0.0, 1.0),
        target_food: None,
        feeding_attempts: 0,
        feeding_cooldown: 0.0,
        contact_radius: params.collision_radius,
        last_food_consumed: None,
    }
}

fn random_pattern(rng: &mut SmallRng) -> SwimPattern {
    match rng.random_range(0..4u8) {
        0 => SwimPattern::Straight,
        1 => SwimPattern::Zigzag,
        2 => SwimPattern::Circular,
        _ => SwimPattern::Spiral,
    }
}

/// Random destination at least `min_retarget_distance` away from `from`,
/// inside the padded interior. Falls back to the farthest candidate when the
/// tank is too small to satisfy the minimum.
fn pick_safe_target(
    from: Position,
    params: &MovementParams,
    bounds: TankBounds,
    rng: &mut SmallRng,
) -> Position {
    let padding = params.boundary_padding;
    let max_x = (bounds.width - padding).max(padding);
    let max_y = (bounds.height - padding).max(padding);
    let mut best = from;
    let mut best_distance = 0.0f32;
    for _ in 0..TARGET_ATTEMPTS {
        let candidate = Position::new(
            if max_x > padding {
                rng.random_range(padding..max_x)
            } else {
                padding
            },
            if max_y > padding {
                rng.random_range(padding..max_y)
            } else {
                padding
            },
        );
        let distance = from.distance_to(candidate);
        if distance >= params.min_retarget_distance {
            return candidate;
        }
        if distance > best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}

fn behavior_duration(behavior: Behavior, rng: &mut SmallRng) -> f32 {
    match behavior {
        Behavior::Idle => rng.random_range(1.5..3.5),
        Behavior::Exploring => rng.random_range(3.0..7.0),
        Behavior::Darting => rng.random_range(0.6..1.4),
        Behavior::Hovering => rng.random_range(2.0..5.0),
        Behavior::Turning => rng.random_range(0.5..1.1),
        Behavior::Playful => rng.random_range(2.0..4.0),
        // Feeding never exits on a timer; arbitration owns it.
        Behavior::Feeding => f32::MAX,
    }
}

/// Weighted draw for the next behavior: high energy favors darting, expired
/// playfulness/exploration cycles favor their states, low energy leans idle,
/// otherwise the draw falls back to hovering or exploring.
fn draw_next_behavior(
    state: &MovementState,
    params: &MovementParams,
    rng: &mut SmallRng,
) -> Behavior {
    let weights = [
        (
            Behavior::Darting,
            0.12 + (state.energy - 0.5).max(0.0) * 1.4,
        ),
        (
            Behavior::Playful,
            if state.playfulness_timer <= 0.0 {
                1.3
            } else {
                0.08
            },
        ),
        (
            Behavior::Exploring,
            if state.exploration_timer <= 0.0 {
                1.1
            } else {
                0.35 + params.curiosity * 0.5
            },
        ),
        (Behavior::Hovering, 0.55),
        (Behavior::Idle, (0.45 - state.energy).max(0.0) * 1.2 + 0.05),
        (Behavior::Turning, 0.07),
    ];
    let total: f32 = weights.iter().map(|(_, weight)| *weight).sum();
    let mut roll = rng.random_range(0.0..total);
    for (behavior, weight) in weights {
        if roll < weight {
            return behavior;
        }
        roll -= weight;
    }
    Behavior::Hovering
}

fn enter_behavior(
    state: &mut MovementState,
    behavior: Behavior,
    params: &MovementParams,
    bounds: TankBounds,
    rng: &mut SmallRng,
) {
    state.behavior = behavior;
    state.behavior_timer = behavior_duration(behavior, rng);
    match behavior {
        Behavior::Playful if state.playfulness_timer <= 0.0 => {
            state.playfulness_timer = rng.random_range(8.0..16.0);
        }
        Behavior::Exploring if state.exploration_timer <= 0.0 => {
            state.exploration_timer = rng.random_range(6.0..12.0);
        }
        _ => {}
    }
    state.target = match behavior {
        // Arbitration pins the target to the pellet.
        Behavior::Feeding => state.target,
        Behavior::Turning => reverse_target(state, params, bounds, rng),
        _ => pick_safe_target(state.position, params, bounds, rng),
    };
}

/// Destination roughly behind the fish, for brief reorientations.
fn reverse_target(
    state: &MovementState,
    params: &MovementParams,
    bounds: TankBounds,
    rng: &mut SmallRng,
) -> Position {
    let speed = state.velocity.speed();
    if speed <= 1e-3 {
        return pick_safe_target(state.position, params, bounds, rng);
    }
    let padding = params.boundary_padding;
    let back = params.min_retarget_distance;
    Position::new(
        (state.position.x - state.velocity.vx / speed * back)
            .clamp(padding, (bounds.width - padding).max(padding)),
        (state.position.y - state.velocity.vy / speed * back)
            .clamp(padding, (bounds.height - padding).max(padding)),
    )
}

/// Search the snapshot for the nearest pellet this fish may chase: within
/// reach, not consumed, and not the pellet it just ate.
fn find_food_target(
    state: &MovementState,
    params: &MovementParams,
    food: &[FoodSnapshot],
    index: &LinearScanIndex,
    max_attraction: f32,
) -> Option<(FoodId, Position)> {
    if food.is_empty() {
        return None;
    }
    let outer = params.food_detection_radius.max(max_attraction);
    let origin = (state.position.x, state.position.y);
    let exclude = state.last_food_consumed;
    let (found, _) = index.nearest_within(
        origin,
        outer * outer,
        &mut |idx: usize, dist_sq: OrderedFloat<f32>| {
            let item = &food[idx];
            if item.consumed || exclude == Some(item.id) {
                return false;
            }
            let reach = params.food_detection_radius.max(item.attraction_radius);
            dist_sq.into_inner() <= reach * reach
        },
    )?;
    let item = &food[found];
    Some((item.id, item.position))
}

/// Give up on the current pellet: count the retarget, start the feeding
/// cooldown once the attempt budget is spent, and fall back to exploring.
fn abandon_feeding(
    state: &mut MovementState,
    params: &MovementParams,
    bounds: TankBounds,
    rng: &mut SmallRng,
) {
    state.target_food = None;
    state.feeding_attempts += 1;
    if state.feeding_attempts >= params.max_feeding_attempts {
        state.feeding_cooldown = params.feeding_cooldown;
    }
    enter_behavior(state, Behavior::Exploring, params, bounds, rng);
}

fn state_speed(params: &MovementParams, behavior: Behavior, target_distance: f32) -> f32 {
    match behavior {
        Behavior::Idle => params.speed * 0.25,
        Behavior::Exploring => params.speed * 1.15,
        Behavior::Darting => params.speed * params.dart_multiplier,
        Behavior::Hovering => params.speed * params.hover_factor,
        Behavior::Turning => params.speed * 0.7,
        Behavior::Playful => params.speed * 1.35,
        Behavior::Feeding => {
            let approach =
                (target_distance / (params.collision_radius * 4.0).max(1.0)).clamp(0.0, 1.0);
            params.feeding_speed * (0.35 + 0.65 * approach)
        }
    }
}

/// Perturbation layered onto the seek velocity for the active swim pattern.
fn pattern_force(
    state: &MovementState,
    params: &MovementParams,
    seek_dir: (f32, f32),
    rng: &mut SmallRng,
) -> (f32, f32) {
    let magnitude = params.swim_variation;
    match state.pattern {
        SwimPattern::Straight => (
            rng.random_range(-1.0..1.0) * magnitude * 0.25,
            rng.random_range(-1.0..1.0) * magnitude * 0.25,
        ),
        SwimPattern::Zigzag => {
            let swing = (state.pattern_phase * 3.0).sin();
            (
                -seek_dir.1 * swing * magnitude,
                seek_dir.0 * swing * magnitude,
            )
        }
        SwimPattern::Circular => {
            let speed = state.velocity.speed();
            if speed <= 1e-3 {
                (0.0, 0.0)
            } else {
                (
                    -state.velocity.vy / speed * magnitude * 1.1,
                    state.velocity.vx / speed * magnitude * 1.1,
                )
            }
        }
        SwimPattern::Spiral => {
            let angle = state.pattern_phase * 2.0;
            (angle.cos() * magnitude, angle.sin() * magnitude)
        }
    }
}

/// Clamp the position into the padded interior, reflecting (and damping) the
/// inbound velocity component on contact. Returns whether a wall was hit.
fn resolve_walls(
    position: &mut Position,
    velocity: &mut Velocity,
    bounds: TankBounds,
    padding: f32,
) -> bool {
    let mut hit = false;
    let max_x = (bounds.width - padding).max(padding);
    let max_y = (bounds.height - padding).max(padding);
    if position.x < padding {
        position.x = padding;
        if velocity.vx < 0.0 {
            velocity.vx = -velocity.vx * WALL_DAMPING;
        }
        hit = true;
    } else if position.x > max_x {
        position.x = max_x;
        if velocity.vx > 0.0 {
            velocity.vx = -velocity.vx * WALL_DAMPING;
        }
        hit = true;
    }
    if position.y < padding {
        position.y = padding;
        if velocity.vy < 0.0 {
            velocity.vy = -velocity.vy * WALL_DAMPING;
        }
        hit = true;
    } else if position.y > max_y {
        position.y = max_y;
        if velocity.vy > 0.0 {
            velocity.vy = -velocity.vy * WALL_DAMPING;
        }
        hit = true;
    }
    hit
}

#[allow(clippy::too_many_arguments)]
fn update_fish(
    id: FishId,
    state: &mut MovementState,
    params: &MovementParams,
    bounds: TankBounds,
    food: &[FoodSnapshot],
    index: &LinearScanIndex,
    food_indexed: bool,
    max_attraction: f32,
    rng: &mut SmallRng,
    dt: f32,
    on_consume: &mut dyn FnMut(FishId, FoodId) -> bool,
) {
    state.behavior_timer -= dt;
    state.exploration_timer -= dt;
    state.playfulness_timer -= dt;
    state.pattern_timer -= dt;
    state.facing_cooldown -= dt;
    state.pattern_phase += dt;

    let cooldown_was_active = state.feeding_cooldown > 0.0;
    state.feeding_cooldown -= dt;
    if cooldown_was_active && state.feeding_cooldown <= 0.0 {
        // Cooldown elapsed; grant a fresh attempt budget.
        state.feeding_attempts = 0;
    }

    if state.pattern_timer <= 0.0 {
        state.pattern = random_pattern(rng);
        state.pattern_timer = rng.random_range(4.0..9.0);
    }

    if state.behavior == Behavior::Feeding {
        let tracked = state
            .target_food
            .and_then(|target| food.iter().find(|item| item.id == target && !item.consumed));
        match tracked {
            None => abandon_feeding(state, params, bounds, rng),
            Some(item) => {
                state.target = item.position;
                if state.position.distance_to(item.position) <= state.contact_radius {
                    if on_consume(id, item.id) {
                        debug!(fish = id.0, food = item.id.0, "food consumed");
                        state.last_food_consumed = Some(item.id);
                        state.target_food = None;
                        state.feeding_attempts = 0;
                        state.feeding_cooldown = params.feeding_cooldown;
                        state.energy = (state.energy + params.feed_energy_boost).min(1.0);
                        enter_behavior(state, Behavior::Playful, params, bounds, rng);
                    } else {
                        // Another fish got there first.
                        abandon_feeding(state, params, bounds, rng);
                    }
                }
            }
        }
    } else if food_indexed
        && state.feeding_cooldown <= 0.0
        && state.feeding_attempts < params.max_feeding_attempts
        && let Some((target, position)) =
            find_food_target(state, params, food, index, max_attraction)
    {
        state.behavior = Behavior::Feeding;
        state.behavior_timer = f32::MAX;
        state.target_food = Some(target);
        state.target = position;
        state.contact_radius = params.collision_radius
            + if params.collision_jitter > 0.0 {
                rng.random_range(-params.collision_jitter..params.collision_jitter)
            } else {
                0.0
            };
        trace!(fish = id.0, food = target.0, "food targeted");
    }

    if state.behavior != Behavior::Feeding && state.behavior_timer <= 0.0 {
        let next = draw_next_behavior(state, params, rng);
        enter_behavior(state, next, params, bounds, rng);
        trace!(fish = id.0, behavior = next.label(), "behavior transition");
    }

    // Seek the target with state-modulated speed, perturbed by the pattern.
    let dx = state.target.x - state.position.x;
    let dy = state.target.y - state.position.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let seek_dir = if distance > 1e-3 {
        (dx / distance, dy / distance)
    } else {
        (0.0, 0.0)
    };
    let speed = state_speed(params, state.behavior, distance);
    let force = pattern_force(state, params, seek_dir, rng);
    let desired = Velocity::new(seek_dir.0 * speed + force.0, seek_dir.1 * speed + force.1);

    // Blend rather than snap so headings change smoothly.
    let blend = (params.turn_rate * dt).min(1.0);
    state.velocity.vx += (desired.vx - state.velocity.vx) * blend;
    state.velocity.vy += (desired.vy - state.velocity.vy) * blend;

    if state.behavior != Behavior::Hovering {
        let current = state.velocity.speed();
        if current < params.velocity_floor {
            if current > 1e-3 {
                let scale = params.velocity_floor / current;
                state.velocity.vx *= scale;
                state.velocity.vy *= scale;
            } else if distance > 1e-3 {
                state.velocity =
                    Velocity::new(seek_dir.0 * params.velocity_floor, seek_dir.1 * params.velocity_floor);
            }
        }
    }

    let travel_speed = state.velocity.speed();
    state.energy = (state.energy + params.energy_recovery * dt
        - params.movement_drain * travel_speed * dt)
        .clamp(0.0, 1.0);

    state.position.x += state.velocity.vx * dt;
    state.position.y += state.velocity.vy * dt;

    if resolve_walls(
        &mut state.position,
        &mut state.velocity,
        bounds,
        params.boundary_padding,
    ) && state.behavior != Behavior::Feeding
    {
        // Re-aim so the fish doesn't keep driving into the same wall.
        state.target = pick_safe_target(state.position, params, bounds, rng);
    }

    if state.facing_cooldown <= 0.0 && state.velocity.vx.abs() > params.facing_flip_speed {
        let moving_left = state.velocity.vx < 0.0;
        if moving_left != state.facing_left {
            state.facing_left = moving_left;
            state.facing_cooldown = params.direction_cooldown;
        }
    }
}

/// Sink invoked once per successful feeding event.
pub trait ConsumptionSink: Send {
    fn on_food_consumed(&mut self, fish: FishId, food: FoodId);
}

/// No-op consumption sink.
#[derive(Debug, Default)]
pub struct NullSink;

impl ConsumptionSink for NullSink {
    fn on_food_consumed(&mut self, _fish: FishId, _food: FoodId) {}
}

/// Per-frame consumption events; small because most frames consume nothing.
pub type ConsumedEvents = SmallVec<[(FishId, FoodId); 4]>;

/// Events emitted after processing a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub frame: u64,
    pub consumed: ConsumedEvents,
    pub summary_recorded: bool,
}

/// Scalar sample of one frame retained in the history ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameSummary {
    pub frame: u64,
    pub fish_count: usize,
    pub food_count: usize,
    pub consumed: usize,
    pub average_energy: f32,
}

/// Output of one [`Aquarium::step`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub frames: Vec<FishFrame>,
    pub events: FrameEvents,
}

/// Binds the food supply and the movement engine under one frame clock.
pub struct Aquarium {
    config: AquariumConfig,
    frame: u64,
    food: FoodSupply,
    engine: MovementEngine,
    sink: Box<dyn ConsumptionSink>,
    history: VecDeque<FrameSummary>,
}

impl fmt::Debug for Aquarium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aquarium")
            .field("frame", &self.frame)
            .field("fish_count", &self.engine.len())
            .field("food_count", &self.food.len())
            .finish()
    }
}

impl Aquarium {
    /// Instantiate a new aquarium using the supplied configuration.
    pub fn new(config: AquariumConfig) -> Result<Self, AquariumError> {
        Self::with_sink(config, Box::new(NullSink))
    }

    /// Instantiate with a consumption sink (reward/hunger collaborators).
    pub fn with_sink(
        config: AquariumConfig,
        sink: Box<dyn ConsumptionSink>,
    ) -> Result<Self, AquariumError> {
        config.validate()?;
        let history_capacity = config.history_capacity;
        Ok(Self {
            food: FoodSupply::new(&config),
            engine: MovementEngine::new(&config),
            config,
            frame: 0,
            sink,
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Advance the simulation by one frame.
    ///
    /// `dt` is the elapsed seconds since the previous frame, clamped to
    /// [`MAX_FRAME_DT`]. Fish present in `roster` but unknown to the engine
    /// are created; tracked fish missing from `roster` are discarded.
    pub fn step(&mut self, roster: &[FishDescriptor], dt: f32) -> FrameOutput {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.food.advance(f64::from(dt));
        let snapshot = self.food.snapshot();

        let mut consumed = ConsumedEvents::new();
        let food = &mut self.food;
        let frames = self
            .engine
            .advance(roster, &snapshot, dt, &mut |fish, pellet| {
                let removed = food.consume(pellet);
                if removed {
                    consumed.push((fish, pellet));
                }
                removed
            });

        for &(fish, pellet) in &consumed {
            self.sink.on_food_consumed(fish, pellet);
        }

        self.frame += 1;
        let summary_recorded = self.record_summary(&frames, consumed.len());
        FrameOutput {
            frames,
            events: FrameEvents {
                frame: self.frame,
                consumed,
                summary_recorded,
            },
        }
    }

    fn record_summary(&mut self, frames: &[FishFrame], consumed: usize) -> bool {
        let interval = self.config.summary_interval;
        if interval == 0 || !self.frame.is_multiple_of(u64::from(interval)) {
            return false;
        }
        let average_energy = if frames.is_empty() {
            0.0
        } else {
            let total: f32 = frames
                .iter()
                .filter_map(|frame| self.engine.state(frame.id))
                .map(|state| state.energy)
                .sum();
            total / frames.len() as f32
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(FrameSummary {
            frame: self.frame,
            fish_count: frames.len(),
            food_count: self.food.len(),
            consumed,
            average_energy,
        });
        true
    }

    /// Attempt to drop food at a pixel coordinate; subject to rate limiting.
    pub fn spawn_food(&mut self, x: f32, y: f32) -> bool {
        self.food.spawn(x, y)
    }

    /// Run the age-based expiry sweep. Intended for a slower independent
    /// timer than the frame loop (a 2 s cadence works well).
    pub fn sweep_expired(&mut self) -> usize {
        self.food.sweep_expired()
    }

    /// Step the cosmetic pellet grow-in animation.
    pub fn animate_food(&mut self, dt: f32) {
        self.food.animate(dt);
    }

    /// Replace the consumption sink.
    pub fn set_sink(&mut self, sink: Box<dyn ConsumptionSink>) {
        self.sink = sink;
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &AquariumConfig {
        &self.config
    }

    /// Frames processed since construction.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Read-only access to the food supply.
    #[must_use]
    pub fn food(&self) -> &FoodSupply {
        &self.food
    }

    /// Mutable access to the food supply.
    #[must_use]
    pub fn food_mut(&mut self) -> &mut FoodSupply {
        &mut self.food
    }

    /// Read-only access to the movement engine.
    #[must_use]
    pub fn engine(&self) -> &MovementEngine {
        &self.engine
    }

    /// Mutable access to the movement engine.
    #[must_use]
    pub fn engine_mut(&mut self) -> &mut MovementEngine {
        &mut self.engine
    }

    /// Iterate over retained frame summaries.
    pub fn history(&self) -> impl Iterator<Item = &FrameSummary> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AquariumConfig {
        AquariumConfig {
            rng_seed: Some(7),
            ..AquariumConfig::default()
        }
    }

    fn descriptor(id: u64) -> FishDescriptor {
        FishDescriptor {
            id: FishId(id),
            x: 50.0,
            y: 50.0,
            tier: RarityTier::Common,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(AquariumConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_invalid_values() {
        let bad_bounds = AquariumConfig {
            tank_width: -800.0,
            ..AquariumConfig::default()
        };
        assert!(bad_bounds.validate().is_err());

        let bad_rate = AquariumConfig {
            max_spawn_rate: 0.0,
            ..AquariumConfig::default()
        };
        assert!(bad_rate.validate().is_err());

        let mut bad_attempts = AquariumConfig::default();
        bad_attempts.movement.max_feeding_attempts = 0;
        assert!(bad_attempts.validate().is_err());

        let mut bad_padding = AquariumConfig::default();
        bad_padding.movement.boundary_padding = 400.0;
        assert!(bad_padding.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = test_config();
        let json = serde_json::to_string(&config).expect("serialize");
        let restored: AquariumConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config, restored);
    }

    #[test]
    fn tier_params_scale_with_rarity() {
        let tuning = MovementTuning::default();
        let common = MovementParams::for_tier(RarityTier::Common, &tuning);
        let legendary = MovementParams::for_tier(RarityTier::Legendary, &tuning);
        assert!(legendary.speed > common.speed);
        assert!(legendary.food_detection_radius > common.food_detection_radius);
        assert!(legendary.dart_multiplier > common.dart_multiplier);
        assert!(legendary.curiosity <= 1.0);
    }

    #[test]
    fn spawn_rate_limit_enforced() {
        let config = AquariumConfig {
            max_spawn_rate: 2.0,
            ..test_config()
        };
        let mut supply = FoodSupply::new(&config);
        assert!(supply.spawn(100.0, 100.0), "first spawn passes");
        supply.advance(0.1);
        assert!(!supply.spawn(100.0, 100.0), "spawn inside cooldown rejected");
        assert_eq!(supply.len(), 1);
        supply.advance(0.5);
        assert!(supply.spawn(100.0, 100.0), "spawn after cooldown passes");
        assert_eq!(supply.len(), 2);
    }

    #[test]
    fn spawn_clamps_to_wall_margin() {
        let mut supply = FoodSupply::new(&test_config());
        assert!(supply.spawn(0.0, 0.0));
        let corner = supply.items()[0];
        assert_eq!(corner.x, SPAWN_MARGIN);
        assert_eq!(corner.y, SPAWN_MARGIN);

        supply.advance(10.0);
        assert!(supply.spawn(800.0, 600.0));
        let far = supply.items()[1];
        assert_eq!(far.x, NORMALIZED_SPAN - SPAWN_MARGIN);
        assert_eq!(far.y, NORMALIZED_SPAN - SPAWN_MARGIN);
    }

    #[test]
    fn food_ids_stay_monotonic_across_removal() {
        let mut supply = FoodSupply::new(&test_config());
        let mut previous = None;
        for _ in 0..5 {
            assert!(supply.spawn(400.0, 300.0));
            let id = supply.items().last().expect("spawned").id;
            if let Some(previous) = previous {
                assert!(id > previous, "ids must increase");
            }
            assert!(supply.consume(id));
            previous = Some(id);
            supply.advance(1.0);
        }
    }

    #[test]
    fn consume_is_idempotent() {
        let mut supply = FoodSupply::new(&test_config());
        assert!(supply.spawn(400.0, 300.0));
        let id = supply.items()[0].id;
        assert!(supply.consume(id));
        let after_first: Vec<FoodItem> = supply.items().to_vec();
        assert!(!supply.consume(id), "second consume is a no-op");
        assert_eq!(supply.items(), &after_first[..]);
        assert!(!supply.consume(FoodId(9_999)), "unknown id is a no-op");
        assert!(!supply.is_available(id));
        assert!(supply.get(id).is_none());
    }

    #[test]
    fn sweep_removes_expired_items() {
        let config = AquariumConfig {
            food_lifetime: 2.0,
            ..test_config()
        };
        let mut supply = FoodSupply::new(&config);
        assert!(supply.spawn(400.0, 300.0));
        let id = supply.items()[0].id;
        supply.advance(1.0);
        assert_eq!(supply.sweep_expired(), 0, "young food survives the sweep");
        supply.advance(4.0);
        assert_eq!(supply.sweep_expired(), 1);
        assert!(supply.is_empty());
        assert!(!supply.is_available(id));
    }

    #[test]
    fn animation_scale_saturates_at_one() {
        let mut supply = FoodSupply::new(&test_config());
        assert!(supply.spawn(400.0, 300.0));
        let mut last = 0.0;
        for _ in 0..100 {
            supply.animate(0.05);
            let scale = supply.items()[0].scale;
            assert!(scale >= last, "scale never regresses");
            assert!(scale <= 1.0);
            last = scale;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn empty_roster_produces_empty_frames() {
        let mut engine = MovementEngine::new(&test_config());
        let frames = engine.advance(&[], &[], 0.016, &mut |_, _| false);
        assert!(frames.is_empty());
        assert!(engine.is_empty());
    }

    #[test]
    fn engine_creates_and_prunes_states() {
        let mut engine = MovementEngine::new(&test_config());
        let roster = [descriptor(1), descriptor(2)];
        engine.advance(&roster, &[], 0.016, &mut |_, _| false);
        assert_eq!(engine.len(), 2);
        assert!(engine.state(FishId(1)).is_some());
        assert!(engine.params_for(FishId(1)).is_some());

        let roster = [descriptor(2)];
        engine.advance(&roster, &[], 0.016, &mut |_, _| false);
        assert_eq!(engine.len(), 1);
        assert!(engine.state(FishId(1)).is_none(), "state pruned with roster");
        assert!(
            engine.params_for(FishId(1)).is_none(),
            "cached params evicted with roster"
        );
        assert!(engine.state(FishId(2)).is_some());
    }

    #[test]
    fn safe_targets_respect_minimum_distance() {
        let config = test_config();
        let params = MovementParams::for_tier(RarityTier::Common, &config.movement);
        let bounds = config.bounds();
        let mut rng = config.seeded_rng();
        let from = Position::new(400.0, 300.0);
        for _ in 0..32 {
            let target = pick_safe_target(from, &params, bounds, &mut rng);
            assert!(from.distance_to(target) >= params.min_retarget_distance);
            assert!(target.x >= params.boundary_padding);
            assert!(target.x <= bounds.width - params.boundary_padding);
            assert!(target.y >= params.boundary_padding);
            assert!(target.y <= bounds.height - params.boundary_padding);
        }
    }

    #[test]
    fn wall_reflection_damps_velocity() {
        let bounds = TankBounds {
            width: 800.0,
            height: 600.0,
        };
        let mut position = Position::new(-5.0, 300.0);
        let mut velocity = Velocity::new(-100.0, 0.0);
        assert!(resolve_walls(&mut position, &mut velocity, bounds, 30.0));
        assert_eq!(position.x, 30.0);
        assert_eq!(velocity.vx, 90.0, "inbound component reflected and damped");

        let mut position = Position::new(400.0, 620.0);
        let mut velocity = Velocity::new(0.0, 40.0);
        assert!(resolve_walls(&mut position, &mut velocity, bounds, 30.0));
        assert_eq!(position.y, 570.0);
        assert_eq!(velocity.vy, -36.0);
    }

    #[test]
    fn normalized_conversions_clamp() {
        assert_eq!(to_normalized(-10.0, 800.0), 0.0);
        assert_eq!(to_normalized(900.0, 800.0), NORMALIZED_SPAN);
        assert_eq!(to_normalized(400.0, 800.0), 50.0);
        assert_eq!(to_pixels(50.0, 800.0), 400.0);
        assert_eq!(to_pixels(150.0, 800.0), 800.0);
    }

    #[test]
    fn summary_history_stays_bounded() {
        let config = AquariumConfig {
            summary_interval: 1,
            history_capacity: 2,
            ..test_config()
        };
        let mut aquarium = Aquarium::new(config).expect("aquarium");
        let roster = [descriptor(1)];
        for _ in 0..5 {
            let output = aquarium.step(&roster, 0.016);
            assert!(output.events.summary_recorded);
        }
        let summaries: Vec<FrameSummary> = aquarium.history().cloned().collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries.last().expect("latest").frame, 5);
        assert_eq!(summaries.last().expect("latest").fish_count, 1);
    }
}
