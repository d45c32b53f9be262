//! Mesh traffic simulator
//!
//! Generates a seeded message stream as seen by one node: honest farms
//! posting reports, relays re-broadcasting what they heard, and spammers
//! sending scam bursts. The stream is replayed through a guard on a
//! [`ManualClock`] so every window is exercised in simulated time.

use std::time::Duration;

use meshguard_core::{Direction, Language, ManualClock, SenderId, Timestamp};
use meshguard_runtime::{DenyReason, HardenedGuard, ProcessedMessage, RiskOracle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CROPS: &[&str] = &["maiz", "papa", "quinua", "trigo", "cebada", "haba"];

/// Who produced a simulated message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SenderKind {
    Honest,
    Relay,
    Spammer,
}

/// Traffic mix configuration
#[derive(Clone, Debug)]
pub struct TrafficConfig {
    pub honest_senders: usize,
    pub relays: usize,
    pub spammers: usize,
    /// Simulated span
    pub duration: Duration,
    /// Mean gap between reports of one honest sender
    pub honest_interval: Duration,
    /// Chance that a report is re-broadcast by a relay
    pub relay_probability: f64,
    /// Gap between spam bursts of one spammer
    pub spam_interval: Duration,
    pub spam_burst: usize,
    pub seed: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        TrafficConfig {
            honest_senders: 10,
            relays: 3,
            spammers: 0,
            duration: Duration::from_secs(600),
            honest_interval: Duration::from_secs(30),
            relay_probability: 0.3,
            spam_interval: Duration::from_secs(60),
            spam_burst: 8,
            seed: 42,
        }
    }
}

impl TrafficConfig {
    /// Honest traffic only
    pub fn calm() -> Self {
        TrafficConfig {
            relays: 0,
            ..Self::default()
        }
    }

    /// Honest traffic with heavy relaying
    pub fn busy() -> Self {
        TrafficConfig {
            honest_senders: 25,
            relays: 6,
            relay_probability: 0.6,
            ..Self::default()
        }
    }

    /// Busy mesh under a spam campaign
    pub fn hostile() -> Self {
        TrafficConfig {
            spammers: 4,
            spam_interval: Duration::from_secs(20),
            ..Self::busy()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One generated message
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficEvent {
    pub at: Timestamp,
    pub sender: SenderId,
    pub kind: SenderKind,
    pub text: String,
}

/// Outcome counts for one sender kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindTally {
    pub sent: usize,
    pub admitted: usize,
    pub blocked: usize,
    pub rate_limited: usize,
    pub duplicate: usize,
}

impl KindTally {
    pub fn denied(&self) -> usize {
        self.sent - self.admitted
    }

    fn record(&mut self, result: &ProcessedMessage) {
        self.sent += 1;
        match &result.block_reason {
            None => self.admitted += 1,
            Some(reason) if reason.is_block() => self.blocked += 1,
            Some(DenyReason::RateLimited(_)) => self.rate_limited += 1,
            Some(_) => self.duplicate += 1,
        }
    }
}

/// Result of one simulation run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub honest: KindTally,
    pub relay: KindTally,
    pub spammer: KindTally,
    pub oracle_calls: usize,
}

impl SimulationReport {
    pub fn tally(&self, kind: SenderKind) -> &KindTally {
        match kind {
            SenderKind::Honest => &self.honest,
            SenderKind::Relay => &self.relay,
            SenderKind::Spammer => &self.spammer,
        }
    }

    pub fn total_sent(&self) -> usize {
        self.honest.sent + self.relay.sent + self.spammer.sent
    }
}

/// Seeded traffic generator and replayer
pub struct MeshTrafficSimulator {
    config: TrafficConfig,
    rng: StdRng,
    clock: ManualClock,
}

impl MeshTrafficSimulator {
    pub fn new(config: TrafficConfig) -> Self {
        MeshTrafficSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clock: ManualClock::new(),
        }
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Handle on the simulated clock; build the guard under test with it
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Generate the full message stream, ordered by arrival
    pub fn generate(&mut self) -> Vec<TrafficEvent> {
        let mut events = Vec::new();
        let end = self.config.duration.as_secs_f64();

        for i in 0..self.config.honest_senders {
            self.honest_traffic(i, end, &mut events);
        }
        for j in 0..self.config.spammers {
            self.spam_traffic(j, end, &mut events);
        }

        events.sort_by_key(|e| e.at);
        events
    }

    fn honest_traffic(&mut self, index: usize, end: f64, events: &mut Vec<TrafficEvent>) {
        let sender = SenderId::new(format!("farm_{index:03}"));
        let interval = self.config.honest_interval.as_secs_f64();
        let mut t = self.rng.gen_range(0.0..interval);
        let mut seq = 0u32;

        while t < end {
            let crop = CROPS[self.rng.gen_range(0..CROPS.len())];
            let text = format!(
                "{sender} reporta {crop} {} kg lote {seq}",
                self.rng.gen_range(1..500)
            );

            if self.config.relays > 0 && self.rng.gen_bool(self.config.relay_probability) {
                let relay = self.rng.gen_range(0..self.config.relays);
                let delay = self.rng.gen_range(1.0..10.0);
                events.push(TrafficEvent {
                    at: Timestamp::from_secs_f64(t + delay),
                    sender: SenderId::new(format!("relay_{relay:02}")),
                    kind: SenderKind::Relay,
                    text: text.clone(),
                });
            }
            events.push(TrafficEvent {
                at: Timestamp::from_secs_f64(t),
                sender: sender.clone(),
                kind: SenderKind::Honest,
                text,
            });

            t += interval * self.rng.gen_range(0.7..1.3);
            seq += 1;
        }
    }

    fn spam_traffic(&mut self, index: usize, end: f64, events: &mut Vec<TrafficEvent>) {
        let sender = SenderId::new(format!("spam_{index:02}"));
        let interval = self.config.spam_interval.as_secs_f64();
        let mut t = self.rng.gen_range(0.0..interval);

        while t < end {
            for k in 0..self.config.spam_burst {
                let text = format!(
                    "URGENTE transferencia para reclamar su premio codigo {}",
                    self.rng.gen_range(0..10_000)
                );
                events.push(TrafficEvent {
                    at: Timestamp::from_secs_f64(t + k as f64 * 0.2),
                    sender: sender.clone(),
                    kind: SenderKind::Spammer,
                    text,
                });
            }
            t += interval;
        }
    }

    /// Generate and replay the stream through `guard`
    ///
    /// The guard must have been built on [`Self::clock`].
    pub fn run<O: RiskOracle>(&mut self, guard: &HardenedGuard<O>) -> SimulationReport {
        let events = self.generate();
        let mut report = SimulationReport::default();

        for event in &events {
            self.clock.set(event.at);
            let result = guard.process(
                &event.text,
                Direction::Inbound,
                &event.sender,
                Some(Language::Spanish),
                None,
            );
            if !result.blocked {
                report.oracle_calls += 1;
            }
            match event.kind {
                SenderKind::Honest => report.honest.record(&result),
                SenderKind::Relay => report.relay.record(&result),
                SenderKind::Spammer => report.spammer.record(&result),
            }
        }

        tracing::debug!(
            sent = report.total_sent(),
            honest_admitted = report.honest.admitted,
            spam_admitted = report.spammer.admitted,
            "simulation finished"
        );
        report
    }
}
