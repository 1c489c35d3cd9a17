//! TOML scenario files describing the starting layout, the player's scripted
//! walk and the fox population.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tilemotion_core::{CellCoord, Vector};
use tilemotion_system_pursuit::{
    PursuitConfig, DEFAULT_ATTACK_COOLDOWN, DEFAULT_ATTACK_DAMAGE, DEFAULT_FOX_SPEED,
    DEFAULT_SEARCH_RANGE,
};
use tilemotion_world::{BlockRegistry, Grid};

const SUPPORTED_SCENARIO_VERSION: u32 = 1;

/// Scenario bundled with the binary and used when no file is supplied.
const BUILTIN_SCENARIO: &str = include_str!("../scenarios/meadow.toml");

/// Validated scenario ready to seed a simulation.
#[derive(Clone, Debug)]
pub(crate) struct Scenario {
    /// Blocks placed before the first tick.
    pub(crate) grid: Grid,
    /// Where the player spawns.
    pub(crate) player_position: Vector,
    /// Velocity changes applied to the player as ticks elapse.
    pub(crate) script: Vec<ScriptStep>,
    /// Number of foxes scattered across the layout.
    pub(crate) fox_count: usize,
    /// Smallest Manhattan cell distance between the player and a spawned fox.
    pub(crate) min_spawn_distance: u32,
    /// Fox steering tunables.
    pub(crate) pursuit: PursuitConfig,
}

/// A velocity the player holds for a number of ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScriptStep {
    /// Ticks the velocity is held for.
    pub(crate) ticks: u64,
    /// Desired per-tick displacement.
    pub(crate) velocity: Vector,
}

impl Scenario {
    /// Loads the scenario bundled with the binary.
    pub(crate) fn builtin(registry: &BlockRegistry) -> Result<Self> {
        Self::from_toml(BUILTIN_SCENARIO, registry).context("built-in scenario is invalid")
    }

    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path, registry: &BlockRegistry) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&contents, registry)
            .with_context(|| format!("failed to load scenario {}", path.display()))
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn from_toml(contents: &str, registry: &BlockRegistry) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if file.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                file.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }

        let registry = extend_glyphs(registry, &file.layout.glyphs)?;
        let origin = CellCoord::new(file.layout.origin[0], file.layout.origin[1]);
        let grid: Grid = registry
            .parse_rows(origin, &file.layout.rows)
            .context("scenario layout is malformed")?
            .into_iter()
            .collect();

        let player_position = vector(file.player.position, "player position")?;
        let script = file
            .player
            .script
            .iter()
            .enumerate()
            .map(|(index, step)| {
                Ok(ScriptStep {
                    ticks: step.ticks,
                    velocity: vector(step.velocity, &format!("script step {index}"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let foxes = file.foxes;
        if !(foxes.search_range.is_finite() && foxes.search_range >= 0.0) {
            bail!("fox search range must be a non-negative number");
        }
        if !(foxes.speed.is_finite() && foxes.speed >= 0.0) {
            bail!("fox speed must be a non-negative number");
        }

        Ok(Self {
            grid,
            player_position,
            script,
            fox_count: foxes.count,
            min_spawn_distance: foxes.min_spawn_distance,
            pursuit: PursuitConfig::new(foxes.search_range, foxes.speed)
                .with_attack(foxes.damage, foxes.attack_cooldown),
        })
    }

    /// Velocity the script assigns on `tick`, counted from zero, if the
    /// player's request changes on that tick.
    #[must_use]
    pub(crate) fn velocity_change_at(&self, tick: u64) -> Option<Vector> {
        let mut start = 0_u64;
        for step in &self.script {
            if start == tick {
                return Some(step.velocity);
            }
            start = start.saturating_add(step.ticks);
        }
        None
    }
}

/// Copy of `registry` that also knows the scenario's own glyphs.
fn extend_glyphs(
    registry: &BlockRegistry,
    glyphs: &BTreeMap<String, String>,
) -> Result<BlockRegistry> {
    let mut extended = registry.clone();
    for (key, description) in glyphs {
        let mut chars = key.chars();
        let glyph = match (chars.next(), chars.next()) {
            (Some(glyph), None) => glyph,
            _ => bail!("layout glyph `{key}` must be a single character"),
        };
        let block = registry
            .parse_block(description)
            .with_context(|| format!("layout glyph `{glyph}`"))?;
        extended
            .register_glyph(glyph, block)
            .with_context(|| format!("layout glyph `{glyph}`"))?;
    }
    Ok(extended)
}

fn vector(components: [f64; 2], what: &str) -> Result<Vector> {
    let value = Vector::new(components[0], components[1]);
    if !value.is_finite() {
        bail!("{what} must be finite, got {value}");
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    version: u32,
    layout: LayoutSection,
    player: PlayerSection,
    #[serde(default)]
    foxes: FoxSection,
}

#[derive(Debug, Deserialize)]
struct LayoutSection {
    origin: [i32; 2],
    rows: Vec<String>,
    #[serde(default)]
    glyphs: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PlayerSection {
    position: [f64; 2],
    #[serde(default)]
    script: Vec<ScriptEntry>,
}

#[derive(Debug, Deserialize)]
struct ScriptEntry {
    ticks: u64,
    velocity: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FoxSection {
    count: usize,
    search_range: f64,
    speed: f64,
    min_spawn_distance: u32,
    damage: u32,
    attack_cooldown: u32,
}

impl Default for FoxSection {
    fn default() -> Self {
        Self {
            count: 0,
            search_range: DEFAULT_SEARCH_RANGE,
            speed: DEFAULT_FOX_SPEED,
            min_spawn_distance: 2,
            damage: DEFAULT_ATTACK_DAMAGE,
            attack_cooldown: DEFAULT_ATTACK_COOLDOWN,
        }
    }
}
