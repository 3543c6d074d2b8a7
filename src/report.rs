/// End-of-fight report handed to the presentation layer.
///
/// Plain data only. The two formatting helpers exist because "undefined"
/// ratios have one agreed rendering (a dash) and every widget needs it.
use crate::{events::FightInfo, trackers::Summary};
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const UNDEFINED: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerReport {
    pub key:     String,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightReport {
    pub player_guid: String,
    pub fight:       FightInfo,
    /// True when the fight was closed by a `FightEnd` from the stream rather
    /// than a synthetic one.
    pub ended_in_log: bool,
    pub trackers:    Vec<TrackerReport>,
}

impl FightReport {
    pub fn get(&self, key: &str) -> Option<&Summary> {
        self.trackers.iter().find(|t| t.key == key).map(|t| &t.summary)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One decimal place, or a dash when undefined.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => UNDEFINED.to_owned(),
    }
}

/// A 0..1 fraction as a percentage with two decimals, or a dash.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => UNDEFINED.to_owned(),
    }
}
