/// Generated / wasted / spent totals for one resource kind (mana, focus, …).
///
/// Specialisation is configuration only: a Mistweaver mana tracker is this
/// tracker with `resource_type = 0`.
use super::{ratio, Analyzer, Summary};
use crate::events::CombatEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityResources {
    pub generated: u64,
    pub wasted:    u64,
    pub spent:     u64,
    pub casts:     u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub resource_type:          u32,
    pub total_generated:        u64,
    pub total_wasted:           u64,
    pub total_spent:            u64,
    pub total_casts:            u64,
    pub by_ability:             BTreeMap<u32, AbilityResources>,
    pub average_spend_per_cast: Option<f64>,
    /// wasted / (generated + wasted)
    pub waste_fraction:         Option<f64>,
}

#[derive(Debug)]
pub struct ResourceTracker {
    key:           String,
    resource_type: u32,
    by_ability:    BTreeMap<u32, AbilityResources>,
}

impl ResourceTracker {
    pub fn new(key: impl Into<String>, resource_type: u32) -> Self {
        Self { key: key.into(), resource_type, by_ability: BTreeMap::new() }
    }

    fn entry(&mut self, ability_id: u32) -> &mut AbilityResources {
        self.by_ability.entry(ability_id).or_default()
    }
}

/// Negative amounts in the log are data errors; they count as nothing.
#[inline]
fn non_negative(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

impl Analyzer for ResourceTracker {
    fn key(&self) -> &str {
        &self.key
    }

    fn handle(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::Energize { ability_id, resource_type, amount, waste, .. }
                if *resource_type == self.resource_type =>
            {
                let waste  = non_negative(*waste);
                let gained = non_negative(*amount).saturating_sub(waste);
                if gained == 0 && waste == 0 {
                    return;
                }
                let e = self.entry(*ability_id);
                e.generated += gained;
                e.wasted    += waste;
            }

            CombatEvent::Cast { ability_id, resource_costs, .. } => {
                let cost: u64 = resource_costs
                    .iter()
                    .filter(|c| c.resource_type == self.resource_type)
                    .map(|c| non_negative(c.amount))
                    .sum();
                if cost > 0 {
                    let e = self.entry(*ability_id);
                    e.spent += cost;
                    e.casts += 1;
                }
            }

            _ => {}
        }
    }

    fn summary(&self) -> Summary {
        let (generated, wasted, spent, casts) = self.by_ability.values().fold(
            (0u64, 0u64, 0u64, 0u64),
            |(g, w, s, c), a| (g + a.generated, w + a.wasted, s + a.spent, c + a.casts),
        );

        Summary::Resource(ResourceSummary {
            resource_type:          self.resource_type,
            total_generated:        generated,
            total_wasted:           wasted,
            total_spent:            spent,
            total_casts:            casts,
            by_ability:             self.by_ability.clone(),
            average_spend_per_cast: ratio(spent, casts),
            waste_fraction:         ratio(wasted, generated + wasted),
        })
    }
}
