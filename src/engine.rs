/// Event dispatch, the glue between the host's event stream and the trackers.
///
/// An `Analysis` owns the analyzers for exactly one fight. Every event from
/// the analyzed player (plus fight boundaries) is handed to each analyzer in
/// turn, synchronously and in arrival order, so the final state depends only
/// on the event sequence.
///
/// `run` is the streaming form: a task that opens an `Analysis` on each
/// `FightStart`, feeds it until `FightEnd`, and forwards the `FightReport`.
use crate::{
    config::AnalyzerConfig,
    error::ConfigError,
    events::{CombatEvent, Combatant, FightInfo},
    report::{FightReport, TrackerReport},
    trackers::Analyzer,
};
use anyhow::Result;
use tokio::sync::mpsc::{Receiver, Sender};

// ---------------------------------------------------------------------------
// Single-fight analysis
// ---------------------------------------------------------------------------

pub struct Analysis {
    fight:        FightInfo,
    combatant:    Combatant,
    analyzers:    Vec<Box<dyn Analyzer>>,
    closed:       bool,
    ended_in_log: bool,
    last_ts:      u64,
}

impl Analysis {
    pub fn new(fight: FightInfo, combatant: Combatant, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        Self {
            last_ts: fight.start_ms,
            fight,
            combatant,
            analyzers,
            closed:       false,
            ended_in_log: false,
        }
    }

    pub fn from_config(config: &AnalyzerConfig, fight: FightInfo) -> Result<Self, ConfigError> {
        let combatant = config.combatant();
        let analyzers = config.build_analyzers(&fight, &combatant)?;
        tracing::debug!(
            "Analysis for {} with {} tracker(s)",
            combatant.guid,
            analyzers.len()
        );
        Ok(Self::new(fight, combatant, analyzers))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_in_scope(&self, event: &CombatEvent) -> bool {
        match event.source_guid() {
            Some(source) => source == self.combatant.guid,
            None => event.is_fight_boundary(),
        }
    }

    pub fn handle(&mut self, event: &CombatEvent) {
        if self.closed || !self.is_in_scope(event) {
            return;
        }
        if matches!(event, CombatEvent::FightStart { .. }) {
            return;
        }

        let ts = event.timestamp_ms();
        if ts < self.last_ts {
            tracing::warn!("Out-of-order event at {}ms (last {}ms)", ts, self.last_ts);
        }
        self.last_ts = self.last_ts.max(ts);

        for analyzer in self.analyzers.iter_mut() {
            analyzer.handle(event);
        }

        if let CombatEvent::FightEnd { timestamp_ms } = event {
            self.closed       = true;
            self.ended_in_log = true;
            self.fight.end_ms = (*timestamp_ms).max(self.fight.start_ms);
        }
    }

    /// Close the fight with a synthetic `FightEnd` if the stream did not.
    pub fn finish(&mut self) {
        if self.closed {
            return;
        }
        let end_ms = self.fight.end_ms.max(self.last_ts);
        tracing::debug!("Synthesising fight end at {}ms", end_ms);
        self.handle(&CombatEvent::FightEnd { timestamp_ms: end_ms });
        self.ended_in_log = false;
    }

    /// Handle a whole fight's events, then close it.
    pub fn replay<'a>(&mut self, events: impl IntoIterator<Item = &'a CombatEvent>) {
        for event in events {
            self.handle(event);
        }
        self.finish();
    }

    pub fn report(&self) -> FightReport {
        FightReport {
            player_guid:  self.combatant.guid.clone(),
            fight:        self.fight,
            ended_in_log: self.ended_in_log,
            trackers:     self
                .analyzers
                .iter()
                .map(|a| TrackerReport { key: a.key().to_owned(), summary: a.summary() })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming task
// ---------------------------------------------------------------------------

pub async fn run(
    mut event_rx: Receiver<CombatEvent>,
    report_tx:    Sender<FightReport>,
    config:       AnalyzerConfig,
) -> Result<()> {
    config.validate()?;
    let mut current: Option<Analysis> = None;
    let mut fights = 0u32;

    while let Some(event) = event_rx.recv().await {
        match &event {
            CombatEvent::FightStart { timestamp_ms } => {
                if let Some(mut open) = current.take() {
                    tracing::warn!("Fight started before the previous one ended: closing it");
                    open.finish();
                    if report_tx.send(open.report()).await.is_err() {
                        return Ok(());
                    }
                }
                fights += 1;
                tracing::info!("Fight {} started at {}ms", fights, timestamp_ms);
                // The end is not known yet; it is set by the FightEnd event.
                let fight = FightInfo::new(*timestamp_ms, *timestamp_ms);
                current = Some(Analysis::from_config(&config, fight)?);
            }

            CombatEvent::FightEnd { .. } => {
                let Some(mut analysis) = current.take() else {
                    tracing::debug!("FightEnd outside a fight: ignored");
                    continue;
                };
                analysis.handle(&event);
                tracing::info!("Fight {} ended ({}ms)", fights, analysis.fight.duration_ms());
                if report_tx.send(analysis.report()).await.is_err() {
                    return Ok(());
                }
            }

            _ => match current.as_mut() {
                Some(analysis) => analysis.handle(&event),
                None => tracing::debug!("Event outside a fight at {}ms: ignored", event.timestamp_ms()),
            },
        }
    }

    // Stream closed mid-fight: flush what we have.
    if let Some(mut open) = current.take() {
        open.finish();
        if report_tx.send(open.report()).await.is_err() {
            tracing::debug!("Report receiver gone: final fight report dropped");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{TrackerDef, TrackerKind},
        trackers::{StackUptimeTracker, StackWindowTracker, Summary},
    };
    use tokio::sync::mpsc;

    const ME:    &str = "Player-1";
    const OTHER: &str = "Player-2";
    const FURY:  u32 = 190931;
    const BITE:  u32 = 190928;

    fn apply(ts: u64, who: &str) -> CombatEvent {
        CombatEvent::ApplyBuff { timestamp_ms: ts, source_guid: who.into(), target_guid: who.into(), ability_id: FURY }
    }
    fn stack(ts: u64, n: i64) -> CombatEvent {
        CombatEvent::ApplyBuffStack { timestamp_ms: ts, source_guid: ME.into(), target_guid: ME.into(), ability_id: FURY, stack: Some(n) }
    }
    fn remove(ts: u64) -> CombatEvent {
        CombatEvent::RemoveBuff { timestamp_ms: ts, source_guid: ME.into(), target_guid: ME.into(), ability_id: FURY }
    }
    fn bite(ts: u64, who: &str) -> CombatEvent {
        CombatEvent::Damage { timestamp_ms: ts, source_guid: who.into(), target_guid: "Creature-1".into(), ability_id: BITE, amount: 1 }
    }

    fn analyzers(start: u64) -> Vec<Box<dyn Analyzer>> {
        vec![
            Box::new(StackWindowTracker::new("bites", FURY, BITE, 6)),
            Box::new(StackUptimeTracker::new("fury_uptime", FURY, 6, 0.0, start)),
        ]
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            player_guid: ME.to_owned(),
            trackers: vec![TrackerDef {
                key:             "bites".to_owned(),
                requires_talent: None,
                kind:            TrackerKind::StackWindow { buff_id: FURY, paired_ability_id: BITE, max_stacks: 6 },
            }],
            ..Default::default()
        }
    }

    fn window(report: &FightReport) -> crate::trackers::StackWindowSummary {
        match report.get("bites") {
            Some(Summary::StackWindow(s)) => s.clone(),
            other => panic!("Wrong summary: {:?}", other),
        }
    }

    #[test]
    fn full_fight_replay() {
        let mut analysis = Analysis::new(FightInfo::new(0, 5_000), Combatant::new(ME), analyzers(0));
        let events = [
            apply(0, ME),
            stack(1_000, 6),
            bite(1_500, ME),
            remove(2_000),
            CombatEvent::FightEnd { timestamp_ms: 5_000 },
        ];
        analysis.replay(&events);

        let report = analysis.report();
        assert!(report.ended_in_log);
        let s = window(&report);
        assert_eq!((s.total_events, s.events_at_max_level, s.windows_started, s.windows_at_max), (1, 1, 1, 1));

        match report.get("fury_uptime") {
            Some(Summary::StackUptime(u)) => {
                let total: u64 = u.levels.iter().map(|l| l.duration_ms).sum();
                assert_eq!(total, 5_000);
                assert_eq!(u.levels[1].duration_ms, 1_000);
                assert_eq!(u.levels[6].duration_ms, 1_000);
            }
            other => panic!("Wrong summary: {:?}", other),
        }
    }

    #[test]
    fn other_players_are_filtered() {
        let mut analysis = Analysis::new(FightInfo::new(0, 1_000), Combatant::new(ME), analyzers(0));
        analysis.replay(&[apply(0, OTHER), bite(10, OTHER)]);
        let s = window(&analysis.report());
        assert_eq!(s.total_events, 0);
        assert_eq!(s.windows_started, 0);
    }

    #[test]
    fn finish_synthesises_fight_end() {
        let mut analysis = Analysis::new(FightInfo::new(0, 10_000), Combatant::new(ME), analyzers(0));
        analysis.replay(&[apply(0, ME), stack(2_000, 2)]);
        assert!(analysis.is_closed());

        let report = analysis.report();
        assert!(!report.ended_in_log);
        match report.get("fury_uptime") {
            Some(Summary::StackUptime(u)) => {
                assert_eq!(u.fight_duration_ms, 10_000);
                assert_eq!(u.levels[1].duration_ms, 2_000);
                assert_eq!(u.levels[2].duration_ms, 8_000);
            }
            other => panic!("Wrong summary: {:?}", other),
        }
    }

    #[test]
    fn events_after_close_are_dropped() {
        let mut analysis = Analysis::new(FightInfo::new(0, 1_000), Combatant::new(ME), analyzers(0));
        analysis.handle(&CombatEvent::FightEnd { timestamp_ms: 1_000 });
        analysis.handle(&bite(1_200, ME));
        assert_eq!(window(&analysis.report()).total_events, 0);
    }

    #[test]
    fn replay_is_deterministic() {
        let events = vec![apply(0, ME), stack(100, 6), bite(150, ME), bite(150, ME), remove(300)];
        let run_once = || {
            let mut a = Analysis::new(FightInfo::new(0, 1_000), Combatant::new(ME), analyzers(0));
            a.replay(&events);
            a.report()
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn simultaneous_stack_changes_keep_counters() {
        let forward  = [apply(0, ME), stack(100, 5), stack(100, 6), bite(200, ME)];
        let swapped  = [apply(0, ME), stack(100, 6), stack(100, 5), bite(200, ME)];
        let summarize = |events: &[CombatEvent]| {
            let mut a = Analysis::new(FightInfo::new(0, 1_000), Combatant::new(ME), analyzers(0));
            a.replay(events);
            window(&a.report())
        };
        let (a, b) = (summarize(&forward), summarize(&swapped));
        assert_eq!((a.windows_started, a.windows_at_max, a.total_events), (1, 1, 1));
        assert_eq!((b.windows_started, b.windows_at_max, b.total_events), (1, 1, 1));
        // Only the level the tie settled on differs.
        assert_eq!(a.events_at_max_level, 1);
        assert_eq!(b.events_at_max_level, 0);
    }

    #[test]
    fn builds_from_config() {
        let analysis = Analysis::from_config(&config(), FightInfo::new(0, 1_000)).unwrap();
        assert_eq!(analysis.report().trackers.len(), 1);
    }

    #[tokio::test]
    async fn streams_one_report_per_fight() {
        let (event_tx, event_rx)   = mpsc::channel(64);
        let (report_tx, mut report_rx) = mpsc::channel(4);
        let task = tokio::spawn(run(event_rx, report_tx, config()));

        let events = vec![
            bite(0, ME), // before any fight: ignored
            CombatEvent::FightStart { timestamp_ms: 1_000 },
            apply(1_000, ME),
            stack(2_000, 6),
            bite(2_500, ME),
            CombatEvent::FightEnd { timestamp_ms: 6_000 },
            CombatEvent::FightStart { timestamp_ms: 10_000 },
            bite(10_500, ME),
        ];
        for e in events {
            event_tx.send(e).await.unwrap();
        }
        drop(event_tx);

        let first = report_rx.recv().await.expect("first report");
        assert!(first.ended_in_log);
        assert_eq!(first.fight, FightInfo::new(1_000, 6_000));
        let s = window(&first);
        assert_eq!((s.total_events, s.events_at_max_level), (1, 1));

        // Second fight is flushed when the stream closes.
        let second = report_rx.recv().await.expect("second report");
        assert!(!second.ended_in_log);
        assert_eq!(second.fight.end_ms, 10_500);
        let s = window(&second);
        assert_eq!((s.total_events, s.windows_started), (1, 0));

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn flush_without_receiver_still_finishes() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (report_tx, report_rx) = mpsc::channel(1);
        drop(report_rx);
        let task = tokio::spawn(run(event_rx, report_tx, config()));

        event_tx.send(CombatEvent::FightStart { timestamp_ms: 0 }).await.unwrap();
        event_tx.send(bite(500, ME)).await.unwrap();
        drop(event_tx);

        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let (_event_tx, event_rx) = mpsc::channel(1);
        let (report_tx, _report_rx) = mpsc::channel(1);
        let mut cfg = config();
        cfg.profiles.push("MAGE/Fire".to_owned());
        assert!(run(event_rx, report_tx, cfg).await.is_err());
    }
}
