/// Typed combat events consumed by the analyzers.
///
/// The host replay engine delivers these one at a time in non-decreasing
/// timestamp order. Timestamps are milliseconds on the same clock as
/// `FightInfo::start_ms`; only differences between them are meaningful.
///
/// Stack counts arrive as `Option<i64>` because the log omits them in some
/// situations (e.g. the player died before the fight-end flush). They are
/// coerced to a level via `stack_level()` and never stored raw.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource_type: u32,
    pub amount:        i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CombatEvent {
    FightStart {
        timestamp_ms: u64,
    },
    ApplyBuff {
        timestamp_ms: u64,
        source_guid:  String,
        target_guid:  String,
        ability_id:   u32,
    },
    ApplyBuffStack {
        timestamp_ms: u64,
        source_guid:  String,
        target_guid:  String,
        ability_id:   u32,
        #[serde(default)]
        stack:        Option<i64>,
    },
    RemoveBuffStack {
        timestamp_ms: u64,
        source_guid:  String,
        target_guid:  String,
        ability_id:   u32,
        #[serde(default)]
        stack:        Option<i64>,
    },
    RemoveBuff {
        timestamp_ms: u64,
        source_guid:  String,
        target_guid:  String,
        ability_id:   u32,
    },
    Damage {
        timestamp_ms: u64,
        source_guid:  String,
        target_guid:  String,
        ability_id:   u32,
        amount:       u64,
    },
    Energize {
        timestamp_ms:  u64,
        source_guid:   String,
        ability_id:    u32,
        resource_type: u32,
        amount:        i64,
        #[serde(default)]
        waste:         i64,
    },
    Cast {
        timestamp_ms:   u64,
        source_guid:    String,
        ability_id:     u32,
        #[serde(default)]
        resource_costs: Vec<ResourceCost>,
    },
    FightEnd {
        timestamp_ms: u64,
    },
}

impl CombatEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::FightStart      { timestamp_ms, .. } => *timestamp_ms,
            Self::ApplyBuff       { timestamp_ms, .. } => *timestamp_ms,
            Self::ApplyBuffStack  { timestamp_ms, .. } => *timestamp_ms,
            Self::RemoveBuffStack { timestamp_ms, .. } => *timestamp_ms,
            Self::RemoveBuff      { timestamp_ms, .. } => *timestamp_ms,
            Self::Damage          { timestamp_ms, .. } => *timestamp_ms,
            Self::Energize        { timestamp_ms, .. } => *timestamp_ms,
            Self::Cast            { timestamp_ms, .. } => *timestamp_ms,
            Self::FightEnd        { timestamp_ms }     => *timestamp_ms,
        }
    }

    /// Ability the event refers to. Fight boundaries carry none.
    pub fn ability_id(&self) -> Option<u32> {
        match self {
            Self::ApplyBuff       { ability_id, .. } => Some(*ability_id),
            Self::ApplyBuffStack  { ability_id, .. } => Some(*ability_id),
            Self::RemoveBuffStack { ability_id, .. } => Some(*ability_id),
            Self::RemoveBuff      { ability_id, .. } => Some(*ability_id),
            Self::Damage          { ability_id, .. } => Some(*ability_id),
            Self::Energize        { ability_id, .. } => Some(*ability_id),
            Self::Cast            { ability_id, .. } => Some(*ability_id),
            Self::FightStart { .. } | Self::FightEnd { .. } => None,
        }
    }

    /// GUID of the actor that caused this event, if any.
    pub fn source_guid(&self) -> Option<&str> {
        match self {
            Self::ApplyBuff       { source_guid, .. } => Some(source_guid),
            Self::ApplyBuffStack  { source_guid, .. } => Some(source_guid),
            Self::RemoveBuffStack { source_guid, .. } => Some(source_guid),
            Self::RemoveBuff      { source_guid, .. } => Some(source_guid),
            Self::Damage          { source_guid, .. } => Some(source_guid),
            Self::Energize        { source_guid, .. } => Some(source_guid),
            Self::Cast            { source_guid, .. } => Some(source_guid),
            Self::FightStart { .. } | Self::FightEnd { .. } => None,
        }
    }

    /// Stack level carried by a stack-change event, coerced to a safe value.
    ///
    /// Missing or negative counts become 0. Events that carry no stack field
    /// at all also report 0.
    pub fn stack_level(&self) -> u32 {
        match self {
            Self::ApplyBuffStack { stack, .. } | Self::RemoveBuffStack { stack, .. } => {
                coerce_stack(*stack)
            }
            _ => 0,
        }
    }

    pub fn is_fight_boundary(&self) -> bool {
        matches!(self, Self::FightStart { .. } | Self::FightEnd { .. })
    }
}

#[inline]
pub fn coerce_stack(raw: Option<i64>) -> u32 {
    match raw {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Fight / combatant context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightInfo {
    pub start_ms: u64,
    pub end_ms:   u64,
}

impl FightInfo {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms: end_ms.max(start_ms) }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// The analyzed player: events from any other source are out of scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub guid:    String,
    #[serde(default)]
    pub talents: Vec<u32>,
}

impl Combatant {
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into(), talents: Vec::new() }
    }

    pub fn with_talents(mut self, talents: impl IntoIterator<Item = u32>) -> Self {
        self.talents.extend(talents);
        self
    }

    pub fn has_talent(&self, talent_id: u32) -> bool {
        self.talents.contains(&talent_id)
    }
}
