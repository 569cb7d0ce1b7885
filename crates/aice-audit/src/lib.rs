/*!
# AICE Audit Scheduler

Decides which finalized jobs get audited, tracks each audit from scheduling
to outcome, and reports failed audits to the reputation engine.

## Flow

```text
job ledger ──on_job_finalized──▶ seed = H(job, agent, result, block entropy, time)
                                   │
                      seed mod 10000 < probability_bps ?
                                   │ yes
                                   ▼
                             AuditRecord (scheduled)
                                   │
allow-listed auditor ──record_audit──▶ completed (passed | failed)
                                                      │ failed
                                                      ▼
                                     penalty sink: subtract(agent, penalty)
```

## Randomness

The default [`BlockEntropySeedSource`] derives the seed from values that are
public before the finalization is processed: the job id, agent, result hash,
recent block entropy and the current timestamp. Anyone who can see or order
transactions within a block can predict the outcome, and an agent choosing its
result hash can grind it until the job is not selected. The seed source is a
trait so a verifiable random function can replace it without touching the
scheduling logic.
*/

pub mod error;
pub mod randomness;
pub mod scheduler;
pub mod types;

pub use error::{AuditError, Result};
pub use randomness::{
    is_selected, seed_mod, BlockEntropySeedSource, ChainContext, ChainSnapshot,
    FixedChainContext, Seed, SeedInput, SeedSource, WallClockChain, BPS_DENOMINATOR,
};
pub use scheduler::{AuditDeps, AuditScheduler};
pub use types::{AuditConfig, AuditRecord, AuditSettings, AuditStats, ReschedulePolicy};
