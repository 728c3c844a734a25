//! Tests for the session lifecycle
//!
//! These tests verify:
//! - Idle/Predicted transitions for submit and reset
//! - Failed submissions leave the session untouched
//! - Sessions in one store never share state

use super::*;
use crate::collector::domain::default_record;
use crate::models::FieldValue;
use crate::predictor::{ArtifactLoader, ModelFormat};
use std::time::Duration;

const SCALER: &str = r#"{"kind":"standard","mean":[0.0,0.0,0.0],"scale":[1.0,1.0,1.0],"feature_names":["squareMeters","AgeOfHouse","CityPart_5"]}"#;
const MODEL: &str = r#"{"kind":"linear","coefficients":[3000.0,-1000.0,20000.0],"intercept":50000.0}"#;

fn artifact(scaler: &str, model: &str) -> Arc<Artifact> {
    Arc::new(
        ArtifactLoader::default()
            .load_bytes(scaler.as_bytes(), model.as_bytes(), ModelFormat::Json)
            .unwrap(),
    )
}

fn manager() -> LifecycleManager {
    LifecycleManager::new(
        &PipelineConfig::default(),
        PricingMetrics::new(),
        StructuredLogger::new("test"),
    )
}

fn reference_input() -> RawInput {
    let mut input = default_record().to_raw_input();
    input.insert("squareMeters".into(), FieldValue::Number(100.0));
    input.insert("hasYard".into(), FieldValue::Bool(true));
    input
}

fn loaded_session() -> Session {
    let mut session = Session::new();
    session.attach_artifact(artifact(SCALER, MODEL));
    session
}

// 100 m², age 25, city part 5
const EXPECTED: f64 = 3000.0 * 100.0 - 1000.0 * 25.0 + 20000.0 + 50000.0;

mod transitions {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), &LifecycleState::Idle);
        assert!(session.prediction().is_none());
        assert!(session.artifact().is_none());
    }

    #[test]
    fn test_submit_moves_idle_to_predicted() {
        let manager = manager();
        let mut session = loaded_session();

        let result = manager.submit(&mut session, &reference_input()).unwrap();
        assert_eq!(result.value, EXPECTED);
        assert!(session.is_predicted());
        assert_eq!(session.prediction(), Some(&result));
    }

    #[test]
    fn test_resubmit_replaces_prediction() {
        let manager = manager();
        let mut session = loaded_session();
        manager.submit(&mut session, &reference_input()).unwrap();

        let mut bigger = reference_input();
        bigger.insert("squareMeters".into(), FieldValue::Number(200.0));
        let second = manager.submit(&mut session, &bigger).unwrap();

        assert_eq!(second.value, EXPECTED + 3000.0 * 100.0);
        assert_eq!(session.prediction().map(|p| p.value), Some(second.value));
    }

    #[test]
    fn test_reset_clears_prediction_but_keeps_artifact() {
        let manager = manager();
        let mut session = loaded_session();
        manager.submit(&mut session, &reference_input()).unwrap();
        let schema_before = session.artifact().unwrap().schema().clone();

        assert!(manager.reset(&mut session));
        assert_eq!(session.state(), &LifecycleState::Idle);
        assert_eq!(session.artifact().unwrap().schema(), &schema_before);

        // A later submit still works against the same artifact
        let again = manager.submit(&mut session, &reference_input()).unwrap();
        assert_eq!(again.value, EXPECTED);
    }

    #[test]
    fn test_reset_while_idle_is_noop() {
        let manager = manager();
        let mut session = loaded_session();
        assert!(!manager.reset(&mut session));
        assert_eq!(session.state(), &LifecycleState::Idle);
    }

    #[test]
    fn test_same_input_twice_gives_same_result() {
        let manager = manager();
        let mut first = loaded_session();
        let mut second = loaded_session();
        let a = manager.submit(&mut first, &reference_input()).unwrap();
        let b = manager.submit(&mut second, &reference_input()).unwrap();
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }

    #[test]
    fn test_resubmit_after_reset_in_same_session_is_bit_identical() {
        let manager = manager();
        let mut session = loaded_session();
        let first = manager.submit(&mut session, &reference_input()).unwrap();

        assert!(manager.reset(&mut session));
        let second = manager.submit(&mut session, &reference_input()).unwrap();

        assert_eq!(first.value.to_bits(), second.value.to_bits());
        assert_eq!(first.artifact_version, second.artifact_version);
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_out_of_range_year_does_not_crash_session() {
        let manager = manager();
        let mut session = loaded_session();
        let mut input = reference_input();
        input.insert("made".into(), FieldValue::Number(-1e19));

        let result = manager.submit(&mut session, &input).unwrap();
        assert!(result.value.is_finite());
        assert!(result.value < 0.0);
        assert!(session.is_predicted());
    }

    #[test]
    fn test_submit_without_artifact_refused() {
        let manager = manager();
        let mut session = Session::new();
        let err = manager.submit(&mut session, &reference_input()).unwrap_err();
        assert_eq!(err, PipelineError::NoArtifact);
        assert_eq!(session.state(), &LifecycleState::Idle);
    }

    #[test]
    fn test_incomplete_input_keeps_idle() {
        let manager = manager();
        let mut session = loaded_session();
        let mut input = reference_input();
        input.remove("made");

        let err = manager.submit(&mut session, &input).unwrap_err();
        assert!(matches!(err, PipelineError::IncompleteInput { .. }));
        assert!(!session.is_predicted());
    }

    #[test]
    fn test_failed_submit_keeps_previous_prediction() {
        let manager = manager();
        let mut session = loaded_session();
        let first = manager.submit(&mut session, &reference_input()).unwrap();

        // Swap in an artifact whose model disagrees with its scaler's width
        session.attach_artifact(artifact(
            SCALER,
            r#"{"kind":"linear","coefficients":[1.0],"intercept":0.0}"#,
        ));
        let err = manager.submit(&mut session, &reference_input()).unwrap_err();

        assert_eq!(err.kind(), "prediction_failed");
        assert_eq!(session.prediction(), Some(&first));
    }

    #[test]
    fn test_failure_is_counted() {
        let metrics = PricingMetrics::new();
        let manager = manager();
        let before = metrics.prediction_failures("no_artifact");
        let _ = manager.submit(&mut Session::new(), &reference_input());
        assert!(metrics.prediction_failures("no_artifact") > before);
    }
}

mod store {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(DEFAULT_SESSION_TTL, PricingMetrics::new())
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store();
        let manager = manager();
        let a = store.create(Some(artifact(SCALER, MODEL)));
        let b = store.create(Some(artifact(SCALER, MODEL)));

        store
            .with_session(a.id, |s| manager.submit(s, &reference_input()))
            .unwrap()
            .unwrap();

        assert_eq!(store.view(a.id).unwrap().state, StateKind::Predicted);
        assert_eq!(store.view(b.id).unwrap().state, StateKind::Idle);
    }

    #[test]
    fn test_view_reports_prediction_and_artifact() {
        let store = store();
        let manager = manager();
        let view = store.create(Some(artifact(SCALER, MODEL)));
        store
            .with_session(view.id, |s| manager.submit(s, &reference_input()))
            .unwrap()
            .unwrap();

        let view = store.view(view.id).unwrap();
        let prediction = view.prediction.unwrap();
        assert_eq!(prediction.formatted, "€345,000.00");
        assert_eq!(prediction.mode, ReconcileMode::Schema);
        assert_eq!(view.artifact.unwrap().scaler_kind, "standard");
    }

    #[test]
    fn test_unknown_session() {
        let store = store();
        assert!(store.with_session(Uuid::new_v4(), |_| ()).is_none());
        assert!(!store.remove(Uuid::new_v4()));
    }

    #[test]
    fn test_remove_session() {
        let store = store();
        let view = store.create(None);
        assert_eq!(store.len(), 1);
        assert!(store.remove(view.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_idle_sessions() {
        let store = SessionStore::new(Duration::from_secs(60), PricingMetrics::new());
        let stale = store.create(None);
        let fresh = store.create(None);
        store.with_session(stale.id, |s| {
            s.last_active = chrono::Utc::now() - chrono::Duration::minutes(5);
        });

        assert_eq!(store.evict_idle(), 1);
        assert!(store.view(stale.id).is_none());
        assert!(store.view(fresh.id).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let store = Arc::new(store());
        let (tx, rx) = tokio::sync::broadcast::channel(1);
        let handle = tokio::spawn(store.clone().run_sweeper(Duration::from_millis(10), rx));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
