//! Voting properties over random prediction sets.

use maiware::config::VotingConfig;
use maiware::models::{ModelPrediction, PredictionRow, PredictionTable};
use maiware::voting::{run_majority_voting, vote, EnsembleClass};
use proptest::prelude::*;

fn predictions() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((0u8..=1, 0.0f64..=1.0), 1..=13)
}

fn to_row(preds: &[(u8, f64)]) -> (PredictionRow, Vec<String>) {
    let models: Vec<String> = (0..preds.len()).map(|i| format!("model_{i}")).collect();
    let row = PredictionRow {
        predictions: preds
            .iter()
            .zip(&models)
            .map(|(&(label, score), model)| ModelPrediction {
                model: model.clone(),
                label,
                score,
            })
            .collect(),
    };
    (row, models)
}

proptest! {
    #[test]
    fn identical_inputs_give_identical_verdicts(preds in predictions()) {
        let (row, models) = to_row(&preds);
        let config = VotingConfig::default();
        let a = vote(&row, &models, &config).unwrap();
        let b = vote(&row.clone(), &models.clone(), &config).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn verdict_fields_are_consistent(preds in predictions()) {
        let (row, models) = to_row(&preds);
        let config = VotingConfig::default();
        let v = vote(&row, &models, &config).unwrap();

        prop_assert_eq!((v.votes_benign + v.votes_malware) as usize, preds.len());
        prop_assert!((0.0..=1.0).contains(&v.ensemble_score));
        prop_assert!(v.ensemble_label <= 1);
        prop_assert_eq!(v.ensemble_class_id, v.ensemble_class.id());
        prop_assert_eq!(v.ensemble_class, EnsembleClass::from_score(v.ensemble_score, &config));
        if v.votes_malware > v.votes_benign {
            prop_assert_eq!(v.ensemble_label, 1);
        } else if v.votes_benign > v.votes_malware {
            prop_assert_eq!(v.ensemble_label, 0);
        }
    }

    #[test]
    fn table_voting_matches_row_voting(rows in prop::collection::vec(predictions(), 1..5)) {
        let width = rows.iter().map(Vec::len).min().unwrap_or(1);
        let config = VotingConfig::default();
        let mut table = PredictionTable::default();
        let mut models = Vec::new();
        for preds in &rows {
            let (row, names) = to_row(&preds[..width]);
            table.rows.push(row);
            models = names;
        }

        let (verdicts, summary) = run_majority_voting(&table, &models, &config).unwrap();
        prop_assert_eq!(verdicts.len(), rows.len());
        prop_assert_eq!(summary.total_models, width);
        for (row, verdict) in table.rows.iter().zip(&verdicts) {
            prop_assert_eq!(&vote(row, &models, &config).unwrap(), verdict);
        }
        for share in summary.agreement {
            prop_assert!((0.5..=1.0).contains(&share));
        }
    }
}
