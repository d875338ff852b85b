//! ankivault-engine - Backup/rollback orchestration
//!
//! The state machine that decides whether a snapshot is needed, writes it
//! durably, records it consistently with the filesystem, serializes
//! against concurrent runs, and prunes old snapshots. Collaborator traits
//! keep the sync mechanism and stats extraction at arm's length.

pub mod collaborators;
pub mod orchestrator;
pub mod scheduler;

pub use collaborators::{
    CollectionStatsExtractor, CommandRefresher, NoopRefresher, RefreshOutcome, SourceRefresher,
    StatsExtractor,
};
pub use orchestrator::{
    EngineConfig, HealthReport, Orchestrator, RecoveryReport, RetentionPolicy, TickOutcome,
};
pub use scheduler::Scheduler;
