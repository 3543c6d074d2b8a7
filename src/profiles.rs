/// Tracker profile library: embedded at compile time from `data/profiles/*.toml`.
///
/// A profile bundles the tracker definitions for one class/spec so a config
/// can enable them with a single "CLASS/Spec" key. The files are parsed once,
/// on first use.
use crate::config::TrackerDef;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Embedded TOML data
// ---------------------------------------------------------------------------

const HUNTER_SURVIVAL:      &str = include_str!("../data/profiles/hunter_survival.toml");
const HUNTER_BEAST_MASTERY: &str = include_str!("../data/profiles/hunter_beast_mastery.toml");
const MONK_MISTWEAVER:      &str = include_str!("../data/profiles/monk_mistweaver.toml");

static ALL_PROFILE_DATA: &[&str] = &[
    HUNTER_SURVIVAL,
    HUNTER_BEAST_MASTERY,
    MONK_MISTWEAVER,
];

static PROFILES: Lazy<Vec<Profile>> = Lazy::new(parse_all);

// ---------------------------------------------------------------------------
// TOML deserialization structs (private)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TomlFile {
    profile: TomlProfile,
}

#[derive(Deserialize)]
struct TomlProfile {
    class:       String,
    spec:        String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    trackers:    Vec<TrackerDef>,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Profile {
    pub class:       String,
    pub spec_name:   String,
    pub description: String,
    pub trackers:    Vec<TrackerDef>,
}

impl Profile {
    /// Canonical "CLASS/Spec" key used in configs.
    pub fn key(&self) -> String {
        format!("{}/{}", self.class, self.spec_name)
    }
}

/// Lightweight descriptor for host-side pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub key:          String,
    pub description:  String,
    pub tracker_keys: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_all() -> Vec<Profile> {
    ALL_PROFILE_DATA
        .iter()
        .filter_map(|toml_str| {
            let file: TomlFile = toml::from_str(toml_str)
                .map_err(|e| tracing::warn!("Failed to parse profile TOML: {}", e))
                .ok()?;
            Some(Profile {
                class:       file.profile.class,
                spec_name:   file.profile.spec,
                description: file.profile.description,
                trackers:    file.profile.trackers,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn list_all() -> Vec<ProfileInfo> {
    PROFILES
        .iter()
        .map(|p| ProfileInfo {
            key:          p.key(),
            description:  p.description.clone(),
            tracker_keys: p.trackers.iter().map(|t| t.key.clone()).collect(),
        })
        .collect()
}

/// Look up a profile by class and spec name (case-insensitive).
pub fn load_profile(class: &str, spec_name: &str) -> Option<Profile> {
    PROFILES
        .iter()
        .find(|p| p.class.eq_ignore_ascii_case(class) && p.spec_name.eq_ignore_ascii_case(spec_name))
        .cloned()
}

/// Look up a profile by its canonical "CLASS/Spec" key.
pub fn load_by_key(key: &str) -> Option<Profile> {
    let (class, spec) = key.split_once('/')?;
    load_profile(class, spec)
}
