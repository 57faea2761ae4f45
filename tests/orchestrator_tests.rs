mod common;

use common::{
    CountingStore, RecordingNotifier, Script, ScriptedGateway, request, test_config,
    wait_for_terminal,
};
use disburse::application::completion::{CompletionEvent, Reconciliation};
use disburse::application::orchestrator::PaymentOrchestrator;
use disburse::domain::payment::{Payment, PaymentId, PaymentStatus};
use disburse::config::OrchestratorConfig;
use disburse::domain::ports::{GatewayOutcome, NotificationSink, PaymentStore};
use disburse::domain::request::PaymentRequest;
use disburse::error::{GatewayError, PaymentError, PaymentLookup};
use disburse::infrastructure::in_memory::InMemoryPaymentStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn succeeded(reference: &str) -> GatewayOutcome {
    GatewayOutcome::Succeeded {
        provider_reference: reference.to_string(),
    }
}

#[tokio::test]
async fn test_successful_disbursement_lifecycle() {
    let store = CountingStore::new();
    let gateway = ScriptedGateway::new(Script::Manual);
    let notifier = RecordingNotifier::new();
    let orchestrator =
        PaymentOrchestrator::new(store.clone(), gateway.clone(), notifier.clone(), test_config());

    let accepted = orchestrator
        .initiate(PaymentRequest::new("TXN-1", "+254700000000", dec!(100.00), "KES").unwrap())
        .await
        .unwrap();
    assert_eq!(accepted.status(), PaymentStatus::Processing);
    assert_eq!(accepted.transaction_key(), "TXN-1");
    assert_eq!(accepted.amount().value(), dec!(100.00));
    assert_eq!(accepted.currency().as_str(), "KES");

    // Still in flight: the stored record is PROCESSING, never PENDING.
    let in_flight = orchestrator.get_by_id(accepted.id()).await.unwrap();
    assert_eq!(in_flight.status(), PaymentStatus::Processing);

    assert!(gateway.release(accepted.id(), Ok(succeeded("REF-1"))));
    let done = wait_for_terminal(&orchestrator, accepted.id()).await;
    assert_eq!(done.status(), PaymentStatus::Successful);
    assert_eq!(done.provider_reference(), Some("REF-1"));
    assert_eq!(done.failure_reason(), None);
    assert!(done.updated_at() >= done.created_at());

    orchestrator.shutdown().await;
    assert_eq!(notifier.successes().len(), 1);
    assert_eq!(notifier.failures().len(), 0);
    assert_eq!(
        store.history(),
        vec![
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Successful
        ]
    );
}

#[tokio::test]
async fn test_failed_outcome_records_reason() {
    let gateway = ScriptedGateway::new(Script::Resolve(GatewayOutcome::Failed {
        reason: "Insufficient funds".to_string(),
    }));
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway,
        notifier.clone(),
        test_config(),
    );

    let accepted = orchestrator.initiate(request("TXN-2", dec!(5.00))).await.unwrap();
    let done = wait_for_terminal(&orchestrator, accepted.id()).await;
    assert_eq!(done.status(), PaymentStatus::Failed);
    assert_eq!(done.failure_reason(), Some("Insufficient funds"));
    assert_eq!(done.provider_reference(), None);

    orchestrator.shutdown().await;
    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].status(), PaymentStatus::Failed);
    assert!(notifier.successes().is_empty());
}

#[tokio::test]
async fn test_in_flight_duplicate_is_rejected_without_writes() {
    let store = CountingStore::new();
    let gateway = ScriptedGateway::new(Script::Manual);
    let orchestrator = PaymentOrchestrator::new(
        store.clone(),
        gateway.clone(),
        RecordingNotifier::new(),
        test_config(),
    );

    let first = orchestrator.initiate(request("TXN-3", dec!(1.00))).await.unwrap();
    let writes = store.writes();

    let second = orchestrator.initiate(request("TXN-3", dec!(1.00))).await;
    match second {
        Err(PaymentError::DuplicateTransaction(key)) => assert_eq!(key, "TXN-3"),
        other => panic!("expected duplicate, got {:?}", other.map(|p| p.status())),
    }
    assert_eq!(store.writes(), writes);
    assert_eq!(gateway.submissions(), 1);

    gateway.release(first.id(), Ok(succeeded("REF-3")));
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_terminal_replay_returns_stored_outcome() {
    let gateway = ScriptedGateway::new(Script::Resolve(succeeded("REF-4")));
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway.clone(),
        notifier.clone(),
        test_config(),
    );

    let accepted = orchestrator.initiate(request("TXN-4", dec!(20.00))).await.unwrap();
    let done = wait_for_terminal(&orchestrator, accepted.id()).await;

    // A different amount on replay is ignored; the stored outcome wins.
    let replay = orchestrator.initiate(request("TXN-4", dec!(99.00))).await.unwrap();
    assert_eq!(replay, done);
    assert_eq!(gateway.submissions(), 1);

    orchestrator.shutdown().await;
    assert_eq!(notifier.total(), 1);
}

#[tokio::test]
async fn test_refused_submission_fails_payment_without_notification() {
    let gateway = ScriptedGateway::new(Script::Refuse("connection refused".to_string()));
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway,
        notifier.clone(),
        test_config(),
    );

    match orchestrator.initiate(request("TXN-5", dec!(1.00))).await {
        Err(PaymentError::ServiceUnavailable(message)) => {
            assert!(message.contains("connection refused"))
        }
        other => panic!("expected service unavailable, got {:?}", other.map(|p| p.status())),
    }

    let stored = orchestrator.get_by_transaction_key("TXN-5").await.unwrap();
    assert_eq!(stored.status(), PaymentStatus::Failed);
    let reason = stored.failure_reason().unwrap();
    assert!(reason.starts_with("Failed to submit disbursement to provider"));
    assert!(reason.contains("connection refused"));

    // The failed record is terminal, so a retry replays it.
    let replay = orchestrator.initiate(request("TXN-5", dec!(1.00))).await.unwrap();
    assert_eq!(replay, stored);

    orchestrator.shutdown().await;
    assert_eq!(notifier.total(), 0);
}

#[tokio::test]
async fn test_rejected_handle_becomes_communication_failure() {
    let gateway = ScriptedGateway::new(Script::Reject("socket timeout".to_string()));
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway,
        notifier.clone(),
        test_config(),
    );

    let accepted = orchestrator.initiate(request("TXN-6", dec!(1.00))).await.unwrap();
    let done = wait_for_terminal(&orchestrator, accepted.id()).await;
    assert_eq!(done.status(), PaymentStatus::Failed);
    let reason = done.failure_reason().unwrap();
    assert!(reason.contains("communication error"));
    assert!(reason.contains("socket timeout"));

    orchestrator.shutdown().await;
    assert_eq!(notifier.failures().len(), 1);
    assert!(notifier.successes().is_empty());
}

#[tokio::test]
async fn test_concurrent_completions_apply_once() {
    let store = CountingStore::new();
    let gateway = ScriptedGateway::new(Script::Manual);
    let notifier = RecordingNotifier::new();
    let orchestrator =
        PaymentOrchestrator::new(store.clone(), gateway.clone(), notifier.clone(), test_config());

    let accepted = orchestrator.initiate(request("TXN-7", dec!(1.00))).await.unwrap();

    let (a, b) = tokio::join!(
        orchestrator.handle_completion(CompletionEvent {
            payment_id: accepted.id(),
            result: Ok(succeeded("REF-7")),
        }),
        orchestrator.handle_completion(CompletionEvent {
            payment_id: accepted.id(),
            result: Ok(GatewayOutcome::Failed {
                reason: "late".to_string(),
            }),
        }),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let applied = outcomes
        .iter()
        .filter(|r| matches!(r, Reconciliation::Applied(_)))
        .count();
    assert_eq!(applied, 1);
    assert!(outcomes.iter().all(|r| matches!(
        r,
        Reconciliation::Applied(_) | Reconciliation::Skipped(_) | Reconciliation::Superseded
    )));

    // The pool's own handle arrives last and is ignored.
    gateway.release(accepted.id(), Err(GatewayError::Completion("late".to_string())));
    orchestrator.shutdown().await;

    assert_eq!(notifier.total(), 1);
    let terminal_writes = store
        .history()
        .into_iter()
        .filter(|s| s.is_terminal())
        .count();
    assert_eq!(terminal_writes, 1);
}

#[tokio::test]
async fn test_completion_for_unknown_payment_is_absorbed() {
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        ScriptedGateway::new(Script::Manual),
        notifier.clone(),
        test_config(),
    );

    let result = orchestrator
        .handle_completion(CompletionEvent {
            payment_id: PaymentId::new(),
            result: Ok(succeeded("REF-X")),
        })
        .await
        .unwrap();
    assert_eq!(result, Reconciliation::Missing);

    orchestrator.shutdown().await;
    assert_eq!(notifier.total(), 0);
}

#[tokio::test]
async fn test_racing_initiations_create_one_payment() {
    let gateway = ScriptedGateway::new(Script::Manual);
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway.clone(),
        RecordingNotifier::new(),
        test_config(),
    );

    let attempts = (0..10).map(|_| orchestrator.initiate(request("TXN-8", dec!(1.00))));
    let results = futures::future::join_all(attempts).await;

    let accepted: Vec<&Payment> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(accepted.len(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PaymentError::DuplicateTransaction(_)))
    );
    assert_eq!(gateway.submissions(), 1);

    gateway.release(accepted[0].id(), Ok(succeeded("REF-8")));
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unknown_lookups_fail_not_found() {
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        ScriptedGateway::new(Script::Manual),
        RecordingNotifier::new(),
        test_config(),
    );

    let id = PaymentId::new();
    match orchestrator.get_by_id(id).await {
        Err(PaymentError::NotFound(PaymentLookup::Id(missing))) => assert_eq!(missing, id),
        other => panic!("expected not found, got {:?}", other.map(|p| p.status())),
    }
    let err = orchestrator.get_by_transaction_key("TXN-404").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Payment not found with Transaction Key: TXN-404"
    );
}

struct PanickingNotifier;

#[async_trait::async_trait]
impl NotificationSink for PanickingNotifier {
    async fn send_success(&self, _payment: &Payment) {
        panic!("sms provider exploded");
    }

    async fn send_failure(&self, _payment: &Payment) {
        panic!("sms provider exploded");
    }
}

#[tokio::test]
async fn test_notifier_panic_does_not_disturb_state() {
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryPaymentStore::new()),
        ScriptedGateway::new(Script::Resolve(succeeded("REF-9"))),
        Arc::new(PanickingNotifier),
        test_config(),
    );

    let first = orchestrator.initiate(request("TXN-9", dec!(1.00))).await.unwrap();
    let second = orchestrator.initiate(request("TXN-10", dec!(1.00))).await.unwrap();

    assert_eq!(
        wait_for_terminal(&orchestrator, first.id()).await.status(),
        PaymentStatus::Successful
    );
    assert_eq!(
        wait_for_terminal(&orchestrator, second.id()).await.status(),
        PaymentStatus::Successful
    );
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_drain_timeout_abandons_stuck_completions() {
    let store = CountingStore::new();
    let gateway = ScriptedGateway::new(Script::Manual);
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(
        store.clone(),
        gateway.clone(),
        notifier.clone(),
        OrchestratorConfig {
            drain_timeout: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        },
    );

    let payment = orchestrator
        .initiate(request("TXN-STUCK", dec!(10.00)))
        .await
        .unwrap();

    // The handle is never released, so only the timeout can end the drain.
    let started = Instant::now();
    orchestrator.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(5));

    let stored = store.get(payment.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), PaymentStatus::Processing);
    assert_eq!(notifier.total(), 0);
    assert!(!gateway.release(payment.id(), Ok(succeeded("REF-LATE"))));
}
