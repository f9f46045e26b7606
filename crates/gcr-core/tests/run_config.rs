//! Run configuration loaded from TOML, validated before any unit runs.

use std::sync::Arc;

use gcr_core::fakes::{ScriptedCritic, ScriptedGenerator};
use gcr_core::{GcrEngine, RunConfig};

#[test]
fn test_defaults_apply_to_empty_document() {
    let config: RunConfig = toml::from_str("").unwrap();
    assert_eq!(config, RunConfig::default());
    assert_eq!(config.max_attempts, 3);
    assert!(!config.best_effort_allowed);
    assert_eq!(config.threshold.required_threshold(1), 0.80);
}

#[test]
fn test_progressive_policy_with_scoring_profile() {
    let config: RunConfig = toml::from_str(
        r#"
        max_attempts = 7
        best_effort_allowed = true

        [threshold]
        shape = "progressive"
        dimension_floor = 0.3
        steps = [
            { attempts = 2, threshold = 0.85 },
            { attempts = 2, threshold = 0.82 },
            { attempts = 2, threshold = 0.80 },
            { attempts = 1, threshold = 0.78 },
        ]

        [[scoring]]
        name = "coverage"
        weight = 0.6

        [[scoring]]
        name = "accuracy"
        weight = 0.4
        "#,
    )
    .unwrap();

    assert_eq!(config.max_attempts, 7);
    assert!(config.best_effort_allowed);
    let policy = &config.threshold;
    assert_eq!(policy.dimension_floor(), Some(0.3));
    let schedule: Vec<f64> = (1..=9).map(|a| policy.required_threshold(a)).collect();
    assert_eq!(
        schedule,
        vec![0.85, 0.85, 0.82, 0.82, 0.80, 0.80, 0.78, 0.78, 0.78]
    );

    let profile = config.scoring.as_ref().unwrap();
    assert_eq!(profile.weight("coverage"), Some(0.6));
    assert_eq!(
        profile.dimension_names().collect::<Vec<_>>(),
        vec!["coverage", "accuracy"]
    );
}

#[test]
fn test_increasing_schedule_is_rejected_at_load() {
    let err = toml::from_str::<RunConfig>(
        r#"
        [threshold]
        shape = "progressive"
        steps = [
            { attempts = 1, threshold = 0.70 },
            { attempts = 1, threshold = 0.90 },
        ]
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("increases"), "{err}");
}

#[test]
fn test_weights_not_summing_to_one_are_rejected() {
    let err = toml::from_str::<RunConfig>(
        r#"
        [[scoring]]
        name = "coverage"
        weight = 0.5

        [[scoring]]
        name = "accuracy"
        weight = 0.3
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("sum"), "{err}");
}

#[test]
fn test_zero_attempts_rejected_by_engine() {
    let config: RunConfig = toml::from_str("max_attempts = 0").unwrap();
    let result = GcrEngine::new(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(ScriptedCritic::new()),
        config,
    );
    assert!(result.is_err());
}

#[test]
fn test_config_round_trips_through_toml() {
    let config: RunConfig = toml::from_str(
        r#"
        max_attempts = 4

        [threshold]
        shape = "flat"
        threshold = 0.75
        "#,
    )
    .unwrap();

    let rendered = toml::to_string(&config).unwrap();
    let reparsed: RunConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(reparsed, config);
    assert!(reparsed.threshold.is_flat());
}

#[test]
fn test_maximal_step_spans_load_without_expansion() {
    let config: RunConfig = toml::from_str(
        r#"
        [threshold]
        shape = "progressive"
        steps = [
            { attempts = 4294967295, threshold = 0.8 },
            { attempts = 4294967295, threshold = 0.6 },
        ]
        "#,
    )
    .unwrap();

    assert_eq!(config.threshold.required_threshold(1), 0.8);
    assert_eq!(config.threshold.required_threshold(u32::MAX), 0.8);
}
