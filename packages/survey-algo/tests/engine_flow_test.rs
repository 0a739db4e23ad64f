//! End-to-end engine flow: session start, rounds, persistence between rounds

use std::sync::Arc;

use chrono::{Duration, Utc};
use danci_survey::simulation::{drive_session, synthetic_engine, SimulatedLearner, SyntheticContent};
use danci_survey::warm_start::extract_prior_knowledge;
use danci_survey::{
    AnswerSubmission, PriorKnowledgeSource, SessionStart, SurveyConfig, SurveyEngine, SurveyError,
    SurveyMode, SurveyState, SurveyStatus, VerifiedWord,
};

struct Ledger(Vec<VerifiedWord>);

impl PriorKnowledgeSource for Ledger {
    fn verified_words(&self, _learner_id: &str) -> Result<Vec<VerifiedWord>, SurveyError> {
        Ok(self.0.clone())
    }
}

struct BrokenLedger;

impl PriorKnowledgeSource for BrokenLedger {
    fn verified_words(&self, learner_id: &str) -> Result<Vec<VerifiedWord>, SurveyError> {
        Err(SurveyError::PriorKnowledgeUnavailable(format!("no ledger for {learner_id}")))
    }
}

fn ledger(count: usize, tiers: u32, days_ago: i64) -> Vec<VerifiedWord> {
    let now = Utc::now();
    (0..count)
        .map(|i| VerifiedWord {
            word_id: format!("w{i}"),
            tier: (i as u32 % tiers) + 1,
            verified_at: now - Duration::days(days_ago),
            passed: true,
        })
        .collect()
}

fn engine() -> SurveyEngine {
    synthetic_engine(SurveyConfig::default()).unwrap()
}

fn target_answer(result: &danci_survey::SurveyResult, known: bool) -> AnswerSubmission {
    let payload = result.payload.as_ref().unwrap();
    let option = if known { "a" } else { "d" };
    AnswerSubmission {
        question_id: payload.question_id.clone(),
        selected_option_ids: vec![option.to_string()],
        time_taken_ms: 1800,
    }
}

#[test]
fn quick_validation_for_large_recent_ledger() {
    let engine = engine();
    let source = Ledger(ledger(150, 8, 2));
    let state = engine.start_for_learner(SessionStart::new("s-quick", 3).with_learner("l1"), &source);
    assert_eq!(state.mode, SurveyMode::QuickValidation);
    assert!((state.initial_confidence - 0.60).abs() < 1e-9);
    assert_eq!(state.prior_verified_words, 150);
    assert_eq!(state.stopping, engine.config().stopping.quick_validation);
}

#[test]
fn broken_ledger_falls_back_to_cold_start() {
    let engine = engine();
    let state = engine.start_for_learner(SessionStart::new("s-broken", 3).with_learner("l2"), &BrokenLedger);
    assert_eq!(state.mode, SurveyMode::ColdStart);
    assert_eq!(state.initial_confidence, 0.0);
    assert_eq!(state.current_rank, engine.config().cold_start_rank);
}

#[test]
fn forced_deep_dive_overrides_prior() {
    let engine = engine();
    let prior = extract_prior_knowledge(&ledger(300, 8, 1));
    let state = engine.start_session(
        SessionStart::new("s-deep", 3)
            .with_prior(prior)
            .with_mode(SurveyMode::DeepDive),
    );
    assert_eq!(state.mode, SurveyMode::DeepDive);
    assert_eq!(state.stopping.max_questions, 60);
}

#[test]
fn warm_session_stops_earlier_than_cold() {
    let engine = engine();
    let learner = SimulatedLearner::new(4600, 1.0);

    let mut cold = engine.start_session(SessionStart::new("s-cold", 21));
    drive_session(&engine, &mut cold, &learner, 5).unwrap();

    let prior = extract_prior_knowledge(&ledger(160, 4, 3));
    let mut warm = engine.start_session(SessionStart::new("s-warm", 21).with_prior(prior));
    let result = drive_session(&engine, &mut warm, &learner, 5).unwrap();

    assert!(result.is_complete());
    assert!(warm.questions_asked() <= engine.config().stopping.quick_validation.max_questions);
    assert!(warm.questions_asked() <= cold.questions_asked());
    assert_eq!(result.debug_info.survey_mode, SurveyMode::QuickValidation);
    assert_eq!(result.debug_info.prior_verified_words, 160);
}

#[test]
fn state_survives_persistence_between_rounds() {
    let engine = engine();
    let boundary = 3900;

    // uninterrupted session
    let mut direct = engine.start_session(SessionStart::new("s-persist", 77).at(Utc::now()));
    let mut persisted: SurveyState = serde_json::from_str(&serde_json::to_string(&direct).unwrap()).unwrap();

    let mut a = engine.process_step(&mut direct, None).unwrap();
    let mut b = engine.process_step(&mut persisted, None).unwrap();
    while a.status == SurveyStatus::Continue {
        assert_eq!(a.payload, b.payload);
        let rank = a.payload.as_ref().unwrap().rank;
        let answer_a = target_answer(&a, rank <= boundary);
        let answer_b = target_answer(&b, rank <= boundary);

        a = engine.process_step(&mut direct, Some(&answer_a)).unwrap();

        // every other round goes through JSON, like the HTTP session store
        let json = serde_json::to_value(&persisted).unwrap();
        persisted = serde_json::from_value(json).unwrap();
        b = engine.process_step(&mut persisted, Some(&answer_b)).unwrap();
    }
    assert_eq!(b.status, SurveyStatus::Complete);
    assert_eq!(a.metrics.map(|m| (m.volume, m.reach)), b.metrics.map(|m| (m.volume, m.reach)));
    assert_eq!(direct.history, persisted.history);
}

#[test]
fn short_band_table_is_restored_and_reported() {
    let engine = engine();
    let state = engine.start_session(SessionStart::new("s-legacy", 4));
    let mut json = serde_json::to_value(&state).unwrap();
    json["bandPerformance"] = serde_json::json!([{ "tested": 1, "correct": 1 }]);
    let mut restored: SurveyState = serde_json::from_value(json).unwrap();

    let result = engine.process_step(&mut restored, None).unwrap();
    assert!(result
        .debug_info
        .anomalies
        .iter()
        .any(|a| matches!(a, danci_survey::StateAnomaly::BandsRestored { found: 1 })));
}

#[test]
fn trap_next_to_target_scores_incorrect() {
    let engine = SurveyEngine::new(SurveyConfig::default(), Arc::new(SyntheticContent)).unwrap();
    let mut state = engine.start_session(SessionStart::new("s-trap", 1));
    let first = engine.process_step(&mut state, None).unwrap();
    let payload = first.payload.unwrap();
    let answer = AnswerSubmission {
        question_id: payload.question_id.clone(),
        selected_option_ids: vec!["a".into(), "b".into()],
        time_taken_ms: 900,
    };
    engine.process_step(&mut state, Some(&answer)).unwrap();
    assert_eq!(state.history.len(), 1);
    assert!(!state.history[0].correct);
    assert_eq!(state.history[0].rank, payload.rank);
}

#[test]
fn methodology_describes_configured_strategy() {
    let engine = engine();
    let mut state = engine.start_session(SessionStart::new("s-method", 1));
    let result = engine.process_step(&mut state, None).unwrap();
    assert_eq!(result.methodology.strategy, engine.strategy_kind());
    assert_eq!(result.methodology.bands.len(), 8);
    assert_eq!(result.debug_info.stopping_config, state.stopping);
}
