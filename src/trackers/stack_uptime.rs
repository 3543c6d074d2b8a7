/// Time spent at each stack level of a buff, plus the duration-weighted
/// average of a per-stack effect (e.g. Thrill of the Hunt: +3% crit per stack).
///
/// The histogram only sums to the fight duration once `FightEnd` has been
/// handled: that event is a synthetic same-level transition closing the last
/// interval. Events after it are ignored.
use super::{ratio, Analyzer, Summary};
use crate::{events::CombatEvent, state::LevelDurations};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUptime {
    pub level:       u32,
    pub duration_ms: u64,
    /// Share of the fight spent at this level; undefined for an empty fight.
    pub fraction:    Option<f64>,
    /// Effect granted at this level (level × effect_per_stack).
    pub effect:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackUptimeSummary {
    pub levels:            Vec<LevelUptime>,
    pub fight_duration_ms: u64,
    pub current_level:     u32,
    pub closed:            bool,
    /// Σ duration[i] × i × effect_per_stack / fight duration
    pub weighted_effect:   Option<f64>,
    /// Share of the fight with at least one stack.
    pub uptime_fraction:   Option<f64>,
}

#[derive(Debug)]
pub struct StackUptimeTracker {
    key:              String,
    buff_id:          u32,
    effect_per_stack: f64,
    histogram:        LevelDurations,
    closed:           bool,
}

impl StackUptimeTracker {
    pub fn new(
        key:              impl Into<String>,
        buff_id:          u32,
        max_stacks:       u32,
        effect_per_stack: f64,
        fight_start_ms:   u64,
    ) -> Self {
        Self {
            key: key.into(),
            buff_id,
            effect_per_stack,
            histogram: LevelDurations::new(max_stacks, fight_start_ms),
            closed:    false,
        }
    }

    pub fn durations(&self) -> &[u64] {
        self.histogram.durations()
    }
}

impl Analyzer for StackUptimeTracker {
    fn key(&self) -> &str {
        &self.key
    }

    fn handle(&mut self, event: &CombatEvent) {
        if self.closed {
            return;
        }
        let ts = event.timestamp_ms();
        match event {
            CombatEvent::ApplyBuff { ability_id, .. } if *ability_id == self.buff_id => {
                self.histogram.transition(ts, 1);
            }
            CombatEvent::ApplyBuffStack { ability_id, .. }
            | CombatEvent::RemoveBuffStack { ability_id, .. }
                if *ability_id == self.buff_id =>
            {
                self.histogram.transition(ts, event.stack_level());
            }
            CombatEvent::RemoveBuff { ability_id, .. } if *ability_id == self.buff_id => {
                self.histogram.transition(ts, 0);
            }
            CombatEvent::FightEnd { .. } => {
                self.histogram.close(ts);
                self.closed = true;
            }
            _ => {}
        }
    }

    fn summary(&self) -> Summary {
        let fight_ms = self.histogram.elapsed_ms();
        let durations = self.histogram.durations();

        let levels = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| LevelUptime {
                level:       i as u32,
                duration_ms: d,
                fraction:    ratio(d, fight_ms),
                effect:      i as f64 * self.effect_per_stack,
            })
            .collect();

        let weighted_effect = (fight_ms > 0).then(|| {
            durations
                .iter()
                .enumerate()
                .map(|(i, &d)| d as f64 * i as f64 * self.effect_per_stack)
                .sum::<f64>()
                / fight_ms as f64
        });

        let active_ms: u64 = durations.iter().skip(1).sum();

        Summary::StackUptime(StackUptimeSummary {
            levels,
            fight_duration_ms: fight_ms,
            current_level:     self.histogram.last_level(),
            closed:            self.closed,
            weighted_effect,
            uptime_fraction:   ratio(active_ms, fight_ms),
        })
    }
}
