//! Application layer containing the disbursement orchestration.
//!
//! `PaymentOrchestrator` is the entry point for initiating and querying
//! payments. Provider outcomes flow back through a bounded channel to a
//! fixed pool of `tokio` workers, which reconcile them in `completion`.

pub mod completion;
pub mod orchestrator;
