/// Analyzer configuration: persisted as TOML (`config.toml`) in a host-chosen
/// config directory.
///
/// A config names the analyzed player and which mechanics to track. Trackers
/// come from two places: embedded profiles referenced by "CLASS/Spec" key
/// (see `profiles`) and ad-hoc `[[trackers]]` tables. Ability ids are plain
/// numbers from the host's spell registry; nothing here looks them up.
///
/// Example:
///
///   player_guid = "Player-1234-ABCDEF"
///   talents     = [257944]
///   profiles    = ["HUNTER/Beast Mastery"]
///
///   [[trackers]]
///   kind              = "stack_window"
///   key               = "six_stack_bites"
///   buff_id           = 190931
///   paired_ability_id = 190928
///   max_stacks        = 6
use crate::{
    error::ConfigError,
    events::{Combatant, FightInfo},
    profiles,
    trackers::{Analyzer, ResourceTracker, StackUptimeTracker, StackWindowTracker},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Tracker definitions
// ---------------------------------------------------------------------------

/// Upper bound on `max_stacks`. The uptime histogram allocates one bucket per level.
pub const MAX_STACKS_LIMIT: u32 = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerKind {
    /// Paired-ability hits while a stacking buff is at max.
    StackWindow {
        buff_id:           u32,
        paired_ability_id: u32,
        max_stacks:        u32,
    },
    /// Time spent at each stack level.
    StackUptime {
        buff_id:          u32,
        max_stacks:       u32,
        #[serde(default)]
        effect_per_stack: f64,
    },
    /// Gain / spend totals for one resource kind.
    Resource {
        resource_type: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerDef {
    pub key: String,
    /// Tracker only runs when the combatant has this talent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_talent: Option<u32>,
    #[serde(flatten)]
    pub kind: TrackerKind,
}

impl TrackerDef {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        match self.kind {
            TrackerKind::StackWindow { max_stacks: 0, .. }
            | TrackerKind::StackUptime { max_stacks: 0, .. } => {
                Err(ConfigError::ZeroMaxStacks(self.key.clone()))
            }
            TrackerKind::StackWindow { max_stacks, .. }
            | TrackerKind::StackUptime { max_stacks, .. }
                if max_stacks > MAX_STACKS_LIMIT =>
            {
                Err(ConfigError::MaxStacksTooLarge(self.key.clone(), MAX_STACKS_LIMIT))
            }
            _ => Ok(()),
        }
    }

    /// Instantiate fresh per-fight state for this definition.
    pub fn build(&self, fight: &FightInfo) -> Box<dyn Analyzer> {
        match self.kind {
            TrackerKind::StackWindow { buff_id, paired_ability_id, max_stacks } => Box::new(
                StackWindowTracker::new(self.key.clone(), buff_id, paired_ability_id, max_stacks),
            ),
            TrackerKind::StackUptime { buff_id, max_stacks, effect_per_stack } => Box::new(
                StackUptimeTracker::new(self.key.clone(), buff_id, max_stacks, effect_per_stack, fight.start_ms),
            ),
            TrackerKind::Resource { resource_type } => {
                Box::new(ResourceTracker::new(self.key.clone(), resource_type))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AnalyzerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// GUID of the analyzed player. Events from other sources are dropped.
    #[serde(default)]
    pub player_guid: String,

    /// Talent ids selected by the analyzed player.
    #[serde(default)]
    pub talents: Vec<u32>,

    /// Embedded profile keys ("CLASS/Spec") whose trackers are enabled.
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Ad-hoc tracker definitions.
    #[serde(default)]
    pub trackers: Vec<TrackerDef>,
}

impl AnalyzerConfig {
    pub fn combatant(&self) -> Combatant {
        Combatant::new(self.player_guid.clone()).with_talents(self.talents.iter().copied())
    }

    /// Profile trackers followed by ad-hoc trackers, validated.
    pub fn resolve_trackers(&self) -> Result<Vec<TrackerDef>, ConfigError> {
        let mut defs = Vec::new();
        for key in &self.profiles {
            let profile = profiles::load_by_key(key)
                .ok_or_else(|| ConfigError::UnknownProfile(key.clone()))?;
            defs.extend(profile.trackers);
        }
        defs.extend(self.trackers.iter().cloned());

        {
            let mut seen = HashSet::new();
            for def in &defs {
                def.validate()?;
                if !seen.insert(def.key.as_str()) {
                    return Err(ConfigError::DuplicateKey(def.key.clone()));
                }
            }
        }
        Ok(defs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve_trackers().map(|_| ())
    }

    /// Fresh analyzers for one fight. Talent-gated trackers the combatant
    /// cannot use are left out.
    pub fn build_analyzers(&self, fight: &FightInfo, combatant: &Combatant) -> Result<Vec<Box<dyn Analyzer>>, ConfigError> {
        let defs = self.resolve_trackers()?;
        Ok(defs
            .iter()
            .filter(|def| match def.requires_talent {
                Some(talent) if !combatant.has_talent(talent) => {
                    tracing::debug!("Tracker '{}' inactive: talent {} not selected", def.key, talent);
                    false
                }
                _ => true,
            })
            .map(|def| def.build(fight))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AnalyzerConfig> {
    let path = config_dir.join("config.toml");
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AnalyzerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error: {}", e))?;
        cfg.validate()?;
        tracing::info!("Loaded analyzer config from {:?}", path);
        Ok(cfg)
    } else {
        Ok(AnalyzerConfig::default())
    }
}

pub fn save(config: &AnalyzerConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join("config.toml"), raw)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bites_def() -> TrackerDef {
        TrackerDef {
            key:             "six_stack_bites".to_owned(),
            requires_talent: None,
            kind:            TrackerKind::StackWindow { buff_id: 190931, paired_ability_id: 190928, max_stacks: 6 },
        }
    }

    #[test]
    fn round_trips_config() {
        let dir = tempdir().unwrap();
        let cfg = AnalyzerConfig {
            player_guid: "Player-1234-ABCDEF".to_owned(),
            talents:     vec![257944],
            profiles:    vec!["MONK/Mistweaver".to_owned()],
            trackers:    vec![bites_def()],
        };

        save(&cfg, dir.path()).unwrap();

        let loaded = load_or_default(dir.path()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn returns_default_when_missing() {
        let dir = tempdir().unwrap();
        let cfg = load_or_default(dir.path()).unwrap();
        assert!(cfg.player_guid.is_empty());
        assert!(cfg.trackers.is_empty());
    }

    #[test]
    fn parses_tracker_tables() {
        let raw = r#"
            player_guid = "Player-1"

            [[trackers]]
            kind              = "stack_window"
            key               = "six_stack_bites"
            buff_id           = 190931
            paired_ability_id = 190928
            max_stacks        = 6

            [[trackers]]
            kind          = "resource"
            key           = "focus"
            resource_type = 2
        "#;
        let cfg: AnalyzerConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.trackers.len(), 2);
        assert_eq!(cfg.trackers[0], bites_def());
        assert_eq!(cfg.trackers[1].kind, TrackerKind::Resource { resource_type: 2 });
    }

    #[test]
    fn rejects_invalid_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[[trackers]]\nkind = \"stack_uptime\"\nkey = \"x\"\nbuff_id = 1\nmax_stacks = 0\n",
        )
        .unwrap();
        assert!(load_or_default(dir.path()).is_err());
    }

    #[test]
    fn rejects_oversized_max_stacks() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[[trackers]]\nkind = \"stack_uptime\"\nkey = \"x\"\nbuff_id = 1\nmax_stacks = 4294967295\n",
        )
        .unwrap();
        assert!(load_or_default(dir.path()).is_err());

        let def = TrackerDef {
            key:             "x".to_owned(),
            requires_talent: None,
            kind:            TrackerKind::StackUptime { buff_id: 1, max_stacks: u32::MAX, effect_per_stack: 0.0 },
        };
        assert_eq!(def.validate(), Err(ConfigError::MaxStacksTooLarge("x".to_owned(), MAX_STACKS_LIMIT)));

        let mut at_limit = bites_def();
        at_limit.kind = TrackerKind::StackWindow { buff_id: 1, paired_ability_id: 2, max_stacks: MAX_STACKS_LIMIT };
        assert_eq!(at_limit.validate(), Ok(()));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let cfg = AnalyzerConfig { trackers: vec![bites_def(), bites_def()], ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicateKey("six_stack_bites".to_owned())));
    }

    #[test]
    fn rejects_unknown_profile() {
        let cfg = AnalyzerConfig { profiles: vec!["MAGE/Fire".to_owned()], ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::UnknownProfile("MAGE/Fire".to_owned())));
    }

    #[test]
    fn rejects_empty_key() {
        let mut def = bites_def();
        def.key = "  ".to_owned();
        assert_eq!(def.validate(), Err(ConfigError::EmptyKey));
    }

    #[test]
    fn talent_gated_trackers_are_skipped() {
        let cfg = AnalyzerConfig {
            profiles: vec!["HUNTER/Beast Mastery".to_owned()],
            ..Default::default()
        };
        let fight = FightInfo::new(0, 1_000);

        let without = cfg.build_analyzers(&fight, &Combatant::new("Player-1")).unwrap();
        assert!(without.is_empty());

        let with = cfg
            .build_analyzers(&fight, &Combatant::new("Player-1").with_talents([257944]))
            .unwrap();
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].key(), "thrill_of_the_hunt");
    }
}
