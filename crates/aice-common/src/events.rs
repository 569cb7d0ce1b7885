//! Append-only event log for every state transition in the engine.
//!
//! Records are sequence-numbered and timestamped so the full history of the
//! three subsystems can be rebuilt from the log alone. Live consumers
//! subscribe through a broadcast channel; slow subscribers lose the oldest
//! records from their channel but never from the log itself.

use aice_types::{Address, Amount, JobId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Maximum number of records buffered per subscriber
const SUBSCRIBER_BUFFER: usize = 1024;

/// Module that emitted an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Temperature,
    Audit,
    Disputes,
}

/// State transitions emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IntegrityEvent {
    AuthorityTransferred {
        module: Module,
        previous: Address,
        new: Address,
    },

    // Temperature controller
    PidGainsUpdated {
        kp: i128,
        ki: i128,
        kd: i128,
    },
    BoundsUpdated {
        min: i128,
        max: i128,
    },
    TemperatureUpdated {
        previous: i128,
        temperature: i128,
    },
    TemperatureTicked {
        error: i128,
        integral: i128,
        derivative: i128,
        delta: i128,
        temperature: i128,
    },
    RoleOverrideSet {
        role: Role,
        temperature: i128,
    },
    RoleOverrideCleared {
        role: Role,
    },

    // Audit scheduler
    NotifierUpdated {
        notifier: Address,
    },
    PenaltySinkUpdated {
        configured: bool,
    },
    AuditProbabilityUpdated {
        probability_bps: u16,
    },
    PenaltyAmountUpdated {
        amount: Amount,
    },
    AuditorUpdated {
        auditor: Address,
        allowed: bool,
    },
    ReschedulePolicyUpdated {
        policy: String,
    },
    AuditPaused,
    AuditUnpaused,
    AuditScheduled {
        job_id: JobId,
        agent: Address,
        seed: String,
        replaced_existing: bool,
    },
    AuditRecorded {
        job_id: JobId,
        auditor: Address,
        passed: bool,
        details: String,
    },
    AgentPenalized {
        job_id: JobId,
        agent: Address,
        amount: Amount,
    },

    // Dispute resolver
    AppealBondUpdated {
        amount: Amount,
    },
    MinJurySizeUpdated {
        size: usize,
    },
    ResolutionAuthorityUpdated {
        authority: Address,
    },
    ValidatorSelectorUpdated,
    EmployerLookupUpdated,
    DisputeRaised {
        job_id: JobId,
        appellant: Address,
        bond: Amount,
        jury_size: usize,
    },
    DisputeResolved {
        job_id: JobId,
        employer_wins: bool,
        recipient: Address,
        bond: Amount,
    },
}

impl IntegrityEvent {
    pub fn module(&self) -> Module {
        use IntegrityEvent::*;
        match self {
            AuthorityTransferred { module, .. } => *module,
            PidGainsUpdated { .. }
            | BoundsUpdated { .. }
            | TemperatureUpdated { .. }
            | TemperatureTicked { .. }
            | RoleOverrideSet { .. }
            | RoleOverrideCleared { .. } => Module::Temperature,
            NotifierUpdated { .. }
            | PenaltySinkUpdated { .. }
            | AuditProbabilityUpdated { .. }
            | PenaltyAmountUpdated { .. }
            | AuditorUpdated { .. }
            | ReschedulePolicyUpdated { .. }
            | AuditPaused
            | AuditUnpaused
            | AuditScheduled { .. }
            | AuditRecorded { .. }
            | AgentPenalized { .. } => Module::Audit,
            AppealBondUpdated { .. }
            | MinJurySizeUpdated { .. }
            | ResolutionAuthorityUpdated { .. }
            | ValidatorSelectorUpdated
            | EmployerLookupUpdated
            | DisputeRaised { .. }
            | DisputeResolved { .. } => Module::Disputes,
        }
    }
}

/// One entry of the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: IntegrityEvent,
}

/// Append-only event log shared by all modules of an engine instance
pub struct EventLog {
    records: RwLock<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            records: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Append an event and fan it out to live subscribers
    pub async fn emit(&self, event: IntegrityEvent) -> u64 {
        let mut records = self.records.write().await;
        let record = EventRecord {
            sequence: records.len() as u64,
            timestamp: Utc::now(),
            event,
        };
        let sequence = record.sequence;

        // No subscribers is fine; the log is the source of truth
        let _ = self.sender.send(record.clone());
        records.push(record);

        debug!(sequence, "Event appended");
        sequence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn history(&self) -> Vec<EventRecord> {
        self.records.read().await.clone()
    }

    /// Records emitted by one module, in order
    pub async fn history_for(&self, module: Module) -> Vec<EventRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.event.module() == module)
            .cloned()
            .collect()
    }

    /// Export the log as JSON lines, one record per line
    pub async fn to_json_lines(&self) -> serde_json::Result<String> {
        let records = self.records.read().await;
        let mut out = String::new();
        for record in records.iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_numbers_are_contiguous() {
        let log = EventLog::new();
        assert!(log.is_empty().await);

        let first = log.emit(IntegrityEvent::AuditPaused).await;
        let second = log.emit(IntegrityEvent::AuditUnpaused).await;

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn test_subscribers_receive_new_records() {
        let log = EventLog::new();
        let mut rx = log.subscribe();

        log.emit(IntegrityEvent::MinJurySizeUpdated { size: 3 }).await;

        let record = rx.recv().await.unwrap();
        assert_eq!(record.sequence, 0);
        assert_eq!(record.event, IntegrityEvent::MinJurySizeUpdated { size: 3 });
    }

    #[tokio::test]
    async fn test_history_filters_by_module() {
        let log = EventLog::new();
        log.emit(IntegrityEvent::BoundsUpdated { min: 1, max: 2 }).await;
        log.emit(IntegrityEvent::AuditPaused).await;
        log.emit(IntegrityEvent::ValidatorSelectorUpdated).await;

        assert_eq!(log.history_for(Module::Temperature).await.len(), 1);
        assert_eq!(log.history_for(Module::Audit).await.len(), 1);
        assert_eq!(log.history_for(Module::Disputes).await.len(), 1);
    }

    #[tokio::test]
    async fn test_json_lines_roundtrip() {
        let log = EventLog::new();
        log.emit(IntegrityEvent::DisputeRaised {
            job_id: JobId::new(9),
            appellant: Address::from_bytes([3; 32]),
            bond: Amount::from_base_units(5),
            jury_size: 3,
        })
        .await;

        let lines = log.to_json_lines().await.unwrap();
        let parsed: EventRecord = serde_json::from_str(lines.trim_end()).unwrap();
        assert_eq!(parsed.event.module(), Module::Disputes);
        assert_eq!(parsed.sequence, 0);
    }
}
