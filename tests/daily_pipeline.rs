mod common;

use common::*;
use ipo_trader::domain::{DecisionStatus, OrderKind, RunKind, RunStatus, Verdict};
use ipo_trader::persistence::{DecisionLedger, MemoryStore, RunLogStore};
use ipo_trader::strategy::NO_SUBSCRIPTION_DATA;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn alpha_co_is_bought_then_simulated_without_session() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Alpha Co", None, date(4), date(9), Some(dec!(100))).await;
    seed_snapshot(
        &store,
        "Alpha Co",
        date(4),
        multiples(dec!(2.5), dec!(1.2), dec!(1.8), dec!(1.5), dec!(3.2)),
    )
    .await;
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), None);

    let evaluation = orchestrator.run_evaluation(date(4)).await;
    assert_eq!(evaluation.status, RunStatus::Success);
    assert_eq!(evaluation.details, "Evaluated 1 IPOs");

    let decisions = store.decisions_for_date(date(4)).await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].verdict, Verdict::Buy);
    assert_eq!(decisions[0].status, DecisionStatus::Pending);
    assert_eq!(
        decisions[0].justification,
        "All categories oversubscribed: QIB: 2.5x ✓, SNII: 1.2x ✓, BNII: 1.8x ✓, NII: 1.5x ✓, Retail: 3.2x ✓"
    );

    let trading = orchestrator.run_trading(date(9)).await;
    assert_eq!(trading.status, RunStatus::Success);
    assert!(trading.details.starts_with("Processed 1 trades"));

    let decision = store.get_decision(decisions[0].id).await.unwrap().unwrap();
    assert_eq!(decision.status, DecisionStatus::Simulated);
    assert!(decision.order_id.is_none());

    let logs = store.logs_for_date(date(4)).await.unwrap();
    assert!(logs.iter().any(|l| l.kind == RunKind::Evaluate));
    let logs = store.logs_for_date(date(9)).await.unwrap();
    assert!(logs.iter().any(|l| l.kind == RunKind::Trade));
}

#[tokio::test]
async fn undersubscribed_qib_is_skipped_and_never_traded() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Beta Ltd", None, date(4), date(9), Some(dec!(100))).await;
    seed_snapshot(
        &store,
        "Beta Ltd",
        date(4),
        multiples(dec!(0.8), dec!(5), dec!(5), dec!(5), dec!(5)),
    )
    .await;
    let broker = Arc::new(FakeBroker::filling_at(dec!(100)));
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), Some(broker.clone()));

    orchestrator.run_evaluation(date(4)).await;
    let decisions = store.decisions_for_date(date(4)).await.unwrap();
    assert_eq!(decisions[0].verdict, Verdict::Skip);
    assert_eq!(decisions[0].status, DecisionStatus::Skipped);
    assert!(decisions[0].justification.starts_with("Not all categories oversubscribed"));
    assert!(decisions[0].justification.contains("QIB: 0.8x ✗"));

    orchestrator.run_trading(date(9)).await;
    assert!(broker.placed().is_empty());
}

#[tokio::test]
async fn missing_snapshot_is_skipped_with_fixed_justification() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Gamma Ltd", None, date(4), date(9), Some(dec!(100))).await;
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), None);

    orchestrator.run_evaluation(date(4)).await;

    let decisions = store.decisions_for_date(date(4)).await.unwrap();
    assert_eq!(decisions[0].verdict, Verdict::Skip);
    assert_eq!(decisions[0].justification, NO_SUBSCRIPTION_DATA);
    assert_eq!(decisions[0].justification, "no subscription data available");
}

#[tokio::test]
async fn evaluation_rerun_keeps_one_decision_per_company() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Alpha Co", None, date(4), date(9), Some(dec!(100))).await;
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), None);

    orchestrator.run_evaluation(date(4)).await;
    let rerun = orchestrator.run_evaluation(date(4)).await;

    assert_eq!(rerun.status, RunStatus::Success);
    assert_eq!(rerun.details, "Evaluated 0 IPOs, 1 already decided");
    assert_eq!(store.decisions_for_date(date(4)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn trading_rerun_places_no_second_entry() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Alpha Co", Some("ALPHACO"), date(4), date(9), Some(dec!(100))).await;
    seed_snapshot(
        &store,
        "Alpha Co",
        date(4),
        multiples(dec!(2), dec!(2), dec!(2), dec!(2), dec!(2)),
    )
    .await;
    let broker = Arc::new(FakeBroker::filling_at(dec!(102.37)));
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), Some(broker.clone()));

    orchestrator.run_evaluation(date(4)).await;
    let first = orchestrator.run_trading(date(9)).await;
    assert_eq!(first.details, "Processed 1 trades: 1 executed, 0 simulated, 0 failed");
    assert_eq!(broker.placed().len(), 3);

    let second = orchestrator.run_trading(date(9)).await;
    assert_eq!(second.details, "Processed 0 trades: 0 executed, 0 simulated, 0 failed");
    assert_eq!(broker.entries(), 1);
    assert_eq!(broker.placed().len(), 3);

    let decision = &store.decisions_for_date(date(4)).await.unwrap()[0];
    assert_eq!(decision.status, DecisionStatus::Executed);
    assert_eq!(decision.quantity, Some(50));
    assert_eq!(decision.entry_price, Some(dec!(102.37)));
    assert_eq!(decision.stop_loss_price, Some(dec!(100.83)));
    assert_eq!(decision.target_price, Some(dec!(106.46)));

    let placed = broker.placed();
    assert!(placed.iter().all(|o| o.symbol == "ALPHACO"));
    let stop = placed.iter().find(|o| o.kind == OrderKind::StopLoss).unwrap();
    assert_eq!(stop.trigger_price, Some(dec!(100.83)));
    let target = placed.iter().find(|o| o.kind == OrderKind::Target).unwrap();
    assert_eq!(target.price, Some(dec!(106.46)));
}

#[tokio::test]
async fn unconfirmed_fill_executes_at_issue_price() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Alpha Co", None, date(4), date(9), Some(dec!(100))).await;
    seed_snapshot(
        &store,
        "Alpha Co",
        date(4),
        multiples(dec!(2), dec!(2), dec!(2), dec!(2), dec!(2)),
    )
    .await;
    let broker = Arc::new(FakeBroker::default());
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), Some(broker.clone()));

    orchestrator.run_evaluation(date(4)).await;
    orchestrator.run_trading(date(9)).await;

    let decision = &store.decisions_for_date(date(4)).await.unwrap()[0];
    assert_eq!(decision.status, DecisionStatus::Executed);
    assert_eq!(decision.entry_price, Some(dec!(100)));
    assert_eq!(decision.stop_loss_price, Some(dec!(98.5)));
    assert_eq!(decision.target_price, Some(dec!(104)));
    assert!(decision.note.as_deref().unwrap().contains("approximate fill"));
    assert_eq!(broker.entries(), 1);
}

#[tokio::test]
async fn rejected_target_leg_keeps_trade_executed() {
    let store = Arc::new(MemoryStore::new());
    seed_ipo(&store, "Alpha Co", None, date(4), date(9), Some(dec!(150))).await;
    seed_snapshot(
        &store,
        "Alpha Co",
        date(4),
        multiples(dec!(2), dec!(2), dec!(2), dec!(2), dec!(2)),
    )
    .await;
    let broker = Arc::new(FakeBroker {
        fill_price: Some(dec!(150)),
        reject_kind: Some(OrderKind::Target),
        ..Default::default()
    });
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), Some(broker.clone()));

    orchestrator.run_evaluation(date(4)).await;
    orchestrator.run_trading(date(9)).await;

    let decision = &store.decisions_for_date(date(4)).await.unwrap()[0];
    assert_eq!(decision.status, DecisionStatus::Executed);
    assert_eq!(decision.quantity, Some(34));
    assert!(decision.order_id.is_some());
    assert!(decision.stop_loss_order_id.is_some());
    assert!(decision.target_order_id.is_none());
    assert!(decision.note.as_deref().unwrap().contains("target order failed"));
}

#[tokio::test]
async fn one_rejected_entry_does_not_stop_the_others() {
    let store = Arc::new(MemoryStore::new());
    for (company, symbol) in [("Alpha Co", "ALPHA"), ("Beta Ltd", "BETA"), ("Gamma Ltd", "GAMMA")] {
        seed_ipo(&store, company, Some(symbol), date(4), date(9), Some(dec!(100))).await;
        seed_snapshot(
            &store,
            company,
            date(4),
            multiples(dec!(2), dec!(2), dec!(2), dec!(2), dec!(2)),
        )
        .await;
    }
    seed_ipo(&store, "Delta Ltd", Some("DELTA"), date(4), date(9), None).await;
    seed_snapshot(
        &store,
        "Delta Ltd",
        date(4),
        multiples(dec!(2), dec!(2), dec!(2), dec!(2), dec!(2)),
    )
    .await;

    let broker = Arc::new(FakeBroker {
        fill_price: Some(dec!(100)),
        reject_symbol: Some("BETA".to_string()),
        ..Default::default()
    });
    let orchestrator = orchestrator(store.clone(), FakeMarketData::default(), Some(broker.clone()));

    let evaluation = orchestrator.run_evaluation(date(4)).await;
    assert_eq!(evaluation.details, "Evaluated 4 IPOs");

    let trading = orchestrator.run_trading(date(9)).await;
    assert_eq!(trading.details, "Processed 4 trades: 2 executed, 0 simulated, 2 failed");

    let decisions = store.decisions_for_date(date(4)).await.unwrap();
    let status_of = |company: &str| {
        decisions
            .iter()
            .find(|d| d.company == company)
            .map(|d| d.status)
            .unwrap()
    };
    assert_eq!(status_of("Alpha Co"), DecisionStatus::Executed);
    assert_eq!(status_of("Beta Ltd"), DecisionStatus::Failed);
    assert_eq!(status_of("Gamma Ltd"), DecisionStatus::Executed);
    assert_eq!(status_of("Delta Ltd"), DecisionStatus::Failed);
    assert_eq!(broker.entries(), 2);
}
