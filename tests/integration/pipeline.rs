//! End-to-end round pipeline tests.

use std::time::Duration;

use roundwatch::config::AppConfig;
use roundwatch::engine::{RoundEngine, RoundEvent, Runner};
use roundwatch::llm::{PredictionService, PredictorSettings};
use roundwatch::report::MemorySink;
use roundwatch::sampler::{latest_slot, ReplaySampler, SampleProducer};
use roundwatch::signal::Digitizer;
use roundwatch::strategy::{Bankroll, BankrollConfig};
use roundwatch::types::{PickSource, Prediction, RoundResult, Symbol};

use crate::harness::{frame, quick_settings, Pipeline, ScriptedPredictor, HIGH, LOW};

// ---------------------------------------------------------------------------
// Round detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_flip_of_last_symbol_wins_pick_b() {
    let predictor = ScriptedPredictor::new(&[r#"{"pick":"XIU"}"#]);
    let mut p = Pipeline::new(predictor, quick_settings(false, false), BankrollConfig::default(), 2, 10);

    let events = p.hold("TTTTTTTTTTTTT", 3).await;
    assert!(matches!(events.as_slice(), [RoundEvent::Opened(_)]));

    let events = p.hold("TTTTTTTTTTTTX", 3).await;
    let [RoundEvent::Closed(record)] = events.as_slice() else {
        panic!("expected exactly one close, got {events:?}");
    };
    assert_eq!(record.predicted, Prediction::PickB);
    assert_eq!(record.actual, Symbol::B);
    assert_eq!(record.result, RoundResult::Win);
    assert_eq!(record.profit, 3.0);
    assert_eq!(record.next_stake, 3.0);
    assert_eq!(record.history.to_string(), "TTTTTTTTTTTTX");
}

#[tokio::test]
async fn test_single_flicker_is_not_a_round() {
    let predictor = ScriptedPredictor::new(&["T"]);
    let calls = predictor.calls();
    let mut p = Pipeline::new(predictor, quick_settings(false, false), BankrollConfig::default(), 2, 10);

    p.hold("XXTTXTXTTTXXT", 2).await;
    // One corrupted read, then back to the real history.
    assert!(p.hold("XXTTXTXTTTXXX", 1).await.is_empty());
    assert!(p.hold("XXTTXTXTTTXXT", 4).await.is_empty());

    assert!(p.sink.rounds().is_empty());
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(p.window.confirmed().unwrap().to_string(), "XXTTXTXTTTXXT");
}

#[tokio::test]
async fn test_short_and_noisy_frames() {
    let predictor = ScriptedPredictor::new(&["T", "T"]);
    let mut p = Pipeline::new(predictor, quick_settings(false, false), BankrollConfig::default(), 2, 10);

    // Noisy levels still digitize to the same history.
    let noisy: Vec<f64> = frame("TXXTTXXTXTTXT")
        .iter()
        .enumerate()
        .map(|(i, v)| v + (i % 4) as f64 * 3.0 - 4.0)
        .collect();
    assert!(p.poll(&noisy).await.is_none());
    assert!(matches!(p.poll(&frame("TXXTTXXTXTTXT")).await, Some(RoundEvent::Opened(_))));

    // A short frame is a gap: no event, window untouched.
    assert!(p.poll(&[HIGH, LOW, HIGH]).await.is_none());
    assert_eq!(p.window.stable_count(), 2);
}

// ---------------------------------------------------------------------------
// Staking through the pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_losing_streak_hits_cap_and_resets() {
    let predictor = ScriptedPredictor::new(&["T", "T", "T", "T", "T"]);
    let bankroll = BankrollConfig {
        base_bet: 3.0,
        multiplier: 2.0,
        stake_cap: Some(20.0),
    };
    let mut p = Pipeline::new(predictor, quick_settings(false, false), bankroll, 2, 10);

    p.hold("TTTTTTTTTTTTT", 2).await;
    for history in ["TTTTTTTTTTTTX", "TTTTTTTTTTTXX", "TTTTTTTTTTXXX", "TTTTTTTTTXXXX"] {
        p.hold(history, 2).await;
    }

    let stakes: Vec<f64> = p.sink.rounds().iter().map(|r| r.next_stake).collect();
    assert_eq!(stakes, vec![6.0, 12.0, 3.0, 6.0]);

    let summary = p.engine.finish();
    assert_eq!(summary.bankroll.resets, 1);
    assert_eq!(summary.bankroll.profit, -(3.0 + 6.0 + 12.0 + 3.0));
    assert_eq!(summary.bankroll.longest_losing_streak, 4);
    assert_eq!(summary.bankroll.max_stake, 12.0);
    assert_eq!(summary.bankroll.max_drawdown, 24.0);
    assert_eq!(summary.confusion.pick_a_actual_b, 4);
    assert_eq!(summary.accuracy_on_bets, 0.0);
}

#[tokio::test]
async fn test_limit_stops_after_settled_bets_only() {
    let predictor = ScriptedPredictor::new(&["SKIP", "T", "X"]);
    let calls = predictor.calls();
    let mut p = Pipeline::new(predictor, quick_settings(false, false), BankrollConfig::default(), 2, 2);

    p.hold("TTTTTTTTTTTTT", 2).await;
    p.hold("TTTTTTTTTTTTX", 2).await; // NoBet round
    p.hold("TTTTTTTTTTTXT", 2).await; // T vs T
    let events = p.hold("TTTTTTTTTTXTX", 2).await; // X vs X
    assert!(matches!(events.as_slice(), [RoundEvent::Finished(_)]));
    assert!(p.engine.is_finished());
    assert!(p.hold("TTTTTTTTTXTXX", 2).await.is_empty());

    let results: Vec<_> = p.sink.rounds().iter().map(|r| r.result).collect();
    assert_eq!(results, vec![RoundResult::NoBet, RoundResult::Win, RoundResult::Win]);
    assert_eq!(calls.lock().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Predictor failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_slow_predictor_falls_back_to_heuristic() {
    let predictor = ScriptedPredictor::slow(Duration::from_secs(30));
    let calls = predictor.calls();
    let settings = PredictorSettings {
        timeout: Duration::from_millis(50),
        retry_on_skip: true,
        heuristic_fallback: true,
    };
    let mut p = Pipeline::new(predictor, settings, BankrollConfig::default(), 2, 10);

    // Last two equal: the fallback plays against the run.
    let events = p.hold("XTXTXTXTXTXTT", 2).await;
    let [RoundEvent::Opened(pick)] = events.as_slice() else {
        panic!("expected the session to open, got {events:?}");
    };
    assert_eq!(pick.source, PickSource::Heuristic);
    assert_eq!(pick.prediction, Prediction::PickB);

    let log = calls.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            ("XTXTXTXTXTXTT".to_string(), false),
            ("XTXTXTXTXTXTT".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn test_garbage_payloads_abstain() {
    let predictor = ScriptedPredictor::new(&["<html>502</html>", "I would rather not say"]);
    let mut p = Pipeline::new(predictor, quick_settings(true, false), BankrollConfig::default(), 2, 10);

    p.hold("TTTTTTTTTTTTT", 2).await;
    p.hold("TTTTTTTTTTTTX", 2).await;

    let rounds = p.sink.rounds();
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].result, RoundResult::NoBet);
    assert_eq!(p.engine.bankroll().rounds_bet(), 0);
    assert_eq!(p.engine.bankroll().stake(), 3.0);
}

// ---------------------------------------------------------------------------
// Live loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_replay_through_producer_and_runner() {
    let cfg = AppConfig::parse(
        r#"
        [engine]
        poll_interval_ms = 5
        required_stable = 2
        max_rounds = 2

        [sampler]
        period_ms = 5
        "#,
    )
    .unwrap();
    cfg.validate().unwrap();

    let mut frames = Vec::new();
    for history in ["TTTTTTTTTTTTT", "TTTTTTTTTTTTX"] {
        frames.extend(std::iter::repeat(frame(history)).take(20));
    }
    frames.push(frame("TTTTTTTTTTTXT"));
    let replay = ReplaySampler::from_frames(frames);

    let predictor = ScriptedPredictor::new(&["X", "T"]);
    let sink = MemorySink::new();
    let engine = RoundEngine::new(
        PredictionService::new(Box::new(predictor), cfg.predictor.settings()),
        Bankroll::new(cfg.bankroll.clone()).unwrap(),
        Box::new(sink.clone()),
        cfg.engine.max_rounds,
    );

    let (tx, slot) = latest_slot();
    let producer = SampleProducer::new(
        replay,
        Digitizer::new(cfg.engine.round_length),
        cfg.sampler.period(),
    )
    .spawn(tx);

    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        Runner::new(engine, &cfg.engine).run(slot, std::future::pending()),
    )
    .await
    .expect("session ends at the bet limit");

    tokio::time::timeout(Duration::from_secs(1), producer)
        .await
        .expect("producer stops once the loop is done")
        .unwrap();

    assert_eq!(summary.bets_placed, 2);
    assert_eq!(summary.accuracy_on_bets, 1.0);
    assert_eq!(summary.bankroll.profit, 6.0);

    let rounds = sink.rounds();
    let actual: Vec<_> = rounds.iter().map(|r| r.actual).collect();
    assert_eq!(actual, vec![Symbol::B, Symbol::A]);
    assert_eq!(sink.summaries().len(), 1);
}
