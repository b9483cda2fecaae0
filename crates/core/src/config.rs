use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{ColorProfile, ColorRange};

/// Pollable keys usable as bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Shift,
    Ctrl,
    Alt,
    End,
    Home,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Mouse4,
    Mouse5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    Center,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Local,
    Device,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

/// Color ranges the segmentation engine matches against. `profile`
/// names the active one: "red" (the dual-range default) or an entry
/// from `alternates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub profile: String,
    pub red: ColorProfile,
    pub alternates: BTreeMap<String, ColorRange>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        let mut alternates = BTreeMap::new();
        alternates.insert(
            "purple".to_string(),
            ColorRange { lower: [125, 100, 100], upper: [140, 255, 255] },
        );
        alternates.insert(
            "yellow".to_string(),
            ColorRange { lower: [20, 100, 100], upper: [30, 255, 255] },
        );
        Self {
            profile: "red".to_string(),
            red: ColorProfile {
                primary: ColorRange { lower: [0, 100, 150], upper: [10, 255, 255] },
                wrap: Some(ColorRange { lower: [170, 100, 150], upper: [180, 255, 255] }),
            },
            alternates,
        }
    }
}

impl ColorConfig {
    /// Resolve the active profile by name. None if the name is unknown.
    pub fn active_profile(&self) -> Option<ColorProfile> {
        if self.profile == "red" {
            return Some(self.red.clone());
        }
        self.alternates
            .get(&self.profile)
            .map(|r| ColorProfile { primary: *r, wrap: None })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Side length of the square capture region around the anchor.
    pub region_size: u32,
    /// Target cycles per second.
    pub rate: u32,
    /// Blobs at or below this pixel area are ignored.
    pub min_area: u32,
    pub anchor: AnchorMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region_size: 400,
            rate: 60,
            min_area: 50,
            anchor: AnchorMode::Center,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub speed: f64,
    pub smoothing: f64,
    /// Per-axis cap on a single correction, device units.
    pub max_adjustment: i32,
    /// Added to the target y (negative aims higher).
    pub vertical_offset: i32,
    /// No correction at or under this distance from the anchor.
    pub deadzone: f64,
    /// Distance at which the pull reaches full strength.
    pub reference_distance: f64,
    /// Weight of the previous offset in the blend, 0 disables.
    pub inertia: f64,
    /// Per-axis random jitter bound, device units, 0 disables.
    pub jitter: f64,
    /// Three-phase gain rows; the phase comes from progress thirds.
    pub patterns: Vec<[f64; 3]>,
    /// Per-cycle chance of switching the pattern row.
    pub pattern_switch_chance: f64,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            smoothing: 0.5,
            max_adjustment: 100,
            vertical_offset: -10,
            deadzone: 4.0,
            reference_distance: 300.0,
            inertia: 0.3,
            jitter: 1.0,
            patterns: vec![[0.8, 1.0, 0.8], [0.5, 1.0, 0.7], [0.7, 0.9, 1.0]],
            pattern_switch_chance: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Consecutive detection cycles required before firing.
    pub confirmations: u32,
    /// Minimum gap between two fires, milliseconds.
    pub min_gap_ms: u64,
    /// Fires before a forced pause.
    pub max_consecutive: u32,
    /// Forced pause bounds [lo, hi] ms.
    pub pause_ms: [u64; 2],
    /// Reaction delay bounds [lo, hi] ms before the click goes out.
    pub reaction_ms: [u64; 2],
    /// Click hold bounds [lo, hi] ms.
    pub hold_ms: [u64; 2],
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            confirmations: 2,
            min_gap_ms: 50,
            max_consecutive: 8,
            pause_ms: [80, 200],
            reaction_ms: [100, 200],
            hold_ms: [20, 60],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeConfig {
    /// Split each correction into sub-steps.
    pub stagger: bool,
    pub stagger_steps: [u32; 2],
    pub stagger_delay_ms: [u64; 2],
    /// Randomly skip a fraction of corrections.
    pub intermittent: bool,
    /// Percentage of cycles that do correct when intermittent is on.
    pub assist_percentage: u32,
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self {
            stagger: true,
            stagger_steps: [2, 4],
            stagger_delay_ms: [1, 4],
            intermittent: true,
            assist_percentage: 85,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Held to apply motion correction.
    pub assist: Key,
    /// Toggles the enabled flag.
    pub toggle: Key,
    /// Toggles the debug flag.
    pub debug: Key,
    /// Stops the run.
    pub exit: Key,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            assist: Key::Shift,
            toggle: Key::F2,
            debug: Key::F3,
            exit: Key::End,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    pub port: String,
    pub baud: u32,
    /// Gap between consecutive device sends.
    pub send_delay_ms: u64,
    /// Acknowledgment read timeout.
    pub ack_timeout_ms: u64,
    /// Wait after opening the port before the handshake (device reset).
    pub settle_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::Local,
            port: "COM3".to_string(),
            baud: 115_200,
            send_delay_ms: 10,
            ack_timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    pub color: ColorConfig,
    pub scan: ScanConfig,
    pub aim: AimConfig,
    pub trigger: TriggerConfig,
    pub humanize: HumanizeConfig,
    pub keys: KeyConfig,
    pub channel: ChannelConfig,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            color: ColorConfig::default(),
            scan: ScanConfig::default(),
            aim: AimConfig::default(),
            trigger: TriggerConfig::default(),
            humanize: HumanizeConfig::default(),
            keys: KeyConfig::default(),
            channel: ChannelConfig::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }
}
