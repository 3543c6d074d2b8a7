/// Counts hits of a paired ability landed while a stacking buff sits at its
/// maximum (e.g. Mongoose Bite during 6-stack Mongoose Fury).
///
/// A "window" runs from buff apply to buff removal. Reaching max stacks is
/// counted at most once per window so `windows_at_max <= windows_started`
/// holds even when stacks drop and climb back. A stack change seen while
/// inactive (log started mid-buff) opens an implicit window.
use super::{ratio, Analyzer, Summary};
use crate::{events::CombatEvent, state::StackLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackWindowSummary {
    pub windows_started:         u64,
    pub windows_at_max:          u64,
    pub total_events:            u64,
    pub events_at_max_level:     u64,
    pub current_level:           u32,
    /// events_at_max_level / windows_at_max
    pub avg_hits_per_max_window: Option<f64>,
    /// total_events / windows_started
    pub avg_hits_per_window:     Option<f64>,
}

#[derive(Debug)]
pub struct StackWindowTracker {
    key:               String,
    buff_id:           u32,
    paired_ability_id: u32,
    max_stacks:        u32,

    level:               StackLevel,
    reached_max:         bool,
    windows_started:     u64,
    windows_at_max:      u64,
    total_events:        u64,
    events_at_max_level: u64,
}

impl StackWindowTracker {
    pub fn new(key: impl Into<String>, buff_id: u32, paired_ability_id: u32, max_stacks: u32) -> Self {
        Self {
            key: key.into(),
            buff_id,
            paired_ability_id,
            max_stacks,
            level:               StackLevel::default(),
            reached_max:         false,
            windows_started:     0,
            windows_at_max:      0,
            total_events:        0,
            events_at_max_level: 0,
        }
    }

    fn at_max(&self) -> bool {
        self.level.current() == self.max_stacks
    }

    fn open_window(&mut self) {
        self.windows_started += 1;
        self.reached_max = false;
    }

    fn note_max(&mut self) {
        if self.at_max() && !self.reached_max {
            self.reached_max = true;
            self.windows_at_max += 1;
        }
    }
}

impl Analyzer for StackWindowTracker {
    fn key(&self) -> &str {
        &self.key
    }

    fn handle(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::ApplyBuff { ability_id, .. } if *ability_id == self.buff_id => {
                self.open_window();
                self.level.apply();
                self.note_max();
            }

            CombatEvent::ApplyBuffStack { ability_id, .. }
            | CombatEvent::RemoveBuffStack { ability_id, .. }
                if *ability_id == self.buff_id =>
            {
                let level = event.stack_level();
                if !self.level.is_active() && level > 0 {
                    tracing::debug!("{}: stack change before apply, opening window", self.key);
                    self.open_window();
                }
                self.level.set(level);
                self.note_max();
            }

            CombatEvent::RemoveBuff { ability_id, .. } if *ability_id == self.buff_id => {
                self.level.remove();
            }

            CombatEvent::Damage { ability_id, .. } if *ability_id == self.paired_ability_id => {
                self.total_events += 1;
                if self.at_max() {
                    self.events_at_max_level += 1;
                }
            }

            _ => {}
        }
    }

    fn summary(&self) -> Summary {
        Summary::StackWindow(StackWindowSummary {
            windows_started:         self.windows_started,
            windows_at_max:          self.windows_at_max,
            total_events:            self.total_events,
            events_at_max_level:     self.events_at_max_level,
            current_level:           self.level.current(),
            avg_hits_per_max_window: ratio(self.events_at_max_level, self.windows_at_max),
            avg_hits_per_window:     ratio(self.total_events, self.windows_started),
        })
    }
}
