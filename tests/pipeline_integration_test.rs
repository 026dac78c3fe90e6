// Integration tests: exports -> partitions -> training -> prediction -> evaluation

use anyhow::Result;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use sdg_analytics::config::Config;
use sdg_analytics::evaluation::{EvaluationEngine, Outcome};
use sdg_analytics::models::ModelRegistry;
use sdg_analytics::orchestrator::Orchestrator;
use sdg_analytics::storage::{
    AddressResolver, Coordinate, DatasetStore, Datatype, DocumentRecord, PredictionRecord,
};
use sdg_analytics::taxonomy::Sdg;

const PROJECT: &str = "uoft_undergrad";
const DOCUMENTS: usize = 40;

fn write_exports(data_dir: &Path) -> Result<()> {
    let dir = data_dir.join("doccano_export").join(PROJECT);
    fs::create_dir_all(&dir)?;

    let topics = [
        "Financial accounting and auditing practice",
        "Medieval European history and literature",
        "Organic chemistry laboratory techniques",
        "Corporate law and contract negotiation",
    ];

    let mut lines = Vec::new();
    for i in 0..DOCUMENTS {
        let (text, cats) = if i % 3 == 0 {
            (
                format!("Renewable energy systems and solar power design, section {}", i),
                vec![Sdg::CleanEnergy.description()],
            )
        } else {
            (format!("{}, section {}", topics[i % topics.len()], i), vec![])
        };
        let entities = if i == 1 {
            json!([[0, 9, "6 - Clean Water and Sanitation"]])
        } else {
            json!([])
        };
        lines.push(
            json!({
                "text": text,
                "DEPARTMENT": format!("dept-{}", i % 4),
                "cats": cats,
                "entities": entities,
            })
            .to_string(),
        );
    }

    // two export files are concatenated in name order
    let (first, second) = lines.split_at(DOCUMENTS / 2);
    fs::write(dir.join("part-1.jsonl"), first.join("\n"))?;
    fs::write(dir.join("part-2.jsonl"), second.join("\n"))?;
    Ok(())
}

fn setup() -> Result<(TempDir, Config, DatasetStore)> {
    let dir = TempDir::new()?;
    write_exports(dir.path())?;

    let keywords = dir.path().join("keywords.json");
    fs::write(
        &keywords,
        r#"[{"SDG": "SDG 7", "Keywords": "solar, renewable energ*"}]"#,
    )?;

    let mut config = Config::with_data_dir(dir.path());
    config.data.required_columns = ["text", "DEPARTMENT", "cats", "entities"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    config.training.grid_search = false;
    config.models.keywords_path = Some(keywords);

    let store = DatasetStore::new(AddressResolver::new(config.storage.clone()));
    store.prepare_project(PROJECT, &config.data)?;
    Ok((dir, config, store))
}

#[test]
fn test_prepared_partitions_cover_raw_set() -> Result<()> {
    let (_dir, _config, store) = setup()?;

    let raw = store.load_documents(Datatype::Raw, PROJECT)?;
    assert_eq!(raw.len(), DOCUMENTS);
    assert!(raw.iter().enumerate().all(|(i, d)| d.index == i));
    assert!(raw[1].labels.contains(&Sdg::CleanWater));

    let mut indices: Vec<usize> = [Datatype::Train, Datatype::Dev, Datatype::Test]
        .into_iter()
        .map(|d| store.load_documents(d, PROJECT))
        .collect::<sdg_analytics::Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .map(|d| d.index)
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..DOCUMENTS).collect::<Vec<_>>());

    let projects = store.discover_projects(None)?;
    assert_eq!(projects.into_iter().collect::<Vec<_>>(), vec![PROJECT]);
    Ok(())
}

#[test]
fn test_train_predict_evaluate() -> Result<()> {
    let (_dir, config, store) = setup()?;
    let registry = ModelRegistry::with_builtin();
    let orchestrator = Orchestrator::new(&config, &store, &registry);

    // Rules models train for every category; the ML model only where both classes exist
    let report = orchestrator.train_all(PROJECT)?;
    let completed = |name: &str| report.completed.iter().filter(|u| u.model_name == name).count();
    assert_eq!(completed("keyword_dictionary"), 16);
    assert_eq!(completed("stars_sustain"), 16);
    assert!(report
        .completed
        .iter()
        .any(|u| u.model_name == "logistic_regression_subsampled" && u.category == Sdg::CleanEnergy));
    assert!(report
        .failed
        .iter()
        .any(|f| f.unit.model_name == "logistic_regression_subsampled" && f.unit.category == Sdg::PeaceJustice));

    let artifacts = store
        .resolver()
        .discover(&Coordinate::any(Datatype::Models))?
        .len();
    assert_eq!(artifacts, report.completed.len());

    // One prediction record per test document, with a probability as confidence
    let report = orchestrator.predict_all(Datatype::Test, &HashSet::new(), true)?;
    assert!(report.is_success());
    assert_eq!(report.completed.len(), artifacts);

    let test_set = store.load_documents(Datatype::Test, PROJECT)?;
    let ml_predictions: Vec<PredictionRecord> = store.load(&Coordinate::predictions(
        Sdg::CleanEnergy,
        "logistic_regression_subsampled",
        PROJECT,
        Datatype::Test,
    ))?;
    assert_eq!(ml_predictions.len(), test_set.len());
    for (record, document) in ml_predictions.iter().zip(&test_set) {
        assert_eq!(record.index, document.index);
        let confidence = record.prediction.metadata["confidence"]
            .as_f64()
            .expect("confidence");
        assert!((0.0..=1.0).contains(&confidence));
    }

    // Existing outputs are kept without overwrite; ignored models are skipped
    let report = orchestrator.predict_all(Datatype::Test, &HashSet::new(), false)?;
    assert_eq!(report.skipped.len(), artifacts);
    assert!(report.completed.is_empty());

    let ignore: HashSet<String> = ["stars_sustain".to_string()].into_iter().collect();
    let report = orchestrator.predict_all(Datatype::Test, &ignore, true)?;
    assert_eq!(report.skipped.len(), 16);
    assert_eq!(report.completed.len(), artifacts - 16);

    // Every prediction file yields one results row
    let engine = EvaluationEngine::new(&store);
    let results = engine.evaluate_all()?;
    assert_eq!(results.len(), artifacts);
    assert_eq!(engine.load_results()?.len(), artifacts);

    let dictionary = results
        .iter()
        .find(|r| r.sdg == Sdg::CleanEnergy && r.model_name == "keyword_dictionary")
        .expect("keyword dictionary row");
    assert_eq!(dictionary.project_name, PROJECT);
    assert_eq!(dictionary.datatype, Datatype::Test);
    assert_eq!(
        dictionary.tp + dictionary.fp + dictionary.tn + dictionary.r#fn,
        test_set.len()
    );
    // the keywords describe exactly the labelled documents
    assert_eq!(dictionary.fp + dictionary.r#fn, 0);

    let stars = results
        .iter()
        .find(|r| r.sdg == Sdg::ZeroHunger && r.model_name == "stars_sustain")
        .expect("stars row");
    assert!(stars.precision.is_nan());

    let enriched: Vec<PredictionRecord> = store.load(&Coordinate::predictions(
        Sdg::CleanEnergy,
        "keyword_dictionary",
        PROJECT,
        Datatype::Test,
    ))?;
    assert!(enriched.iter().all(|r| r.original_label.is_some()));
    assert!(enriched
        .iter()
        .all(|r| r.comparison == Some(Outcome::TruePositive) || r.comparison == Some(Outcome::TrueNegative)));
    Ok(())
}

#[test]
fn test_cross_validate_replaces_artifact() -> Result<()> {
    let (_dir, config, store) = setup()?;
    let registry = ModelRegistry::with_builtin();
    let orchestrator = Orchestrator::new(&config, &store, &registry);

    let score = orchestrator.cross_validate(
        PROJECT,
        "logistic_regression_subsampled",
        Sdg::CleanEnergy,
        Some(3),
    )?;
    assert!((0.0..=1.0).contains(&score));

    let path = store.resolver().resolve(&Coordinate::model(
        Sdg::CleanEnergy,
        "logistic_regression_subsampled",
    ))?;
    let model = registry.restore(&path)?;
    let prediction = model.predict("solar power and renewable energy")?;
    assert_eq!(prediction.category, Sdg::CleanEnergy);

    let err = orchestrator
        .cross_validate(PROJECT, "stars_sustain", Sdg::NoPoverty, None)
        .unwrap_err();
    assert!(matches!(err, sdg_analytics::AnalyticsError::Unsupported { .. }));
    Ok(())
}

#[test]
fn test_train_unknown_project_fails_fast() -> Result<()> {
    let (_dir, config, store) = setup()?;
    let registry = ModelRegistry::with_builtin();
    let orchestrator = Orchestrator::new(&config, &store, &registry);

    assert!(orchestrator.train_all("missing_project").is_err());
    assert!(orchestrator.train_all("bad__name").is_err());
    assert!(matches!(
        store.select_project(Datatype::Train, 3),
        Err(sdg_analytics::AnalyticsError::SelectionOutOfRange { .. })
    ));
    Ok(())
}

#[test]
fn test_corrupt_artifact_fails_every_project() -> Result<()> {
    let dir = TempDir::new()?;
    let config = Config::with_data_dir(dir.path());
    let store = DatasetStore::new(AddressResolver::new(config.storage.clone()));
    let registry = ModelRegistry::with_builtin();

    let projects = ["grad", "undergrad", "summer"];
    for project in projects {
        let documents = vec![DocumentRecord::new(
            0,
            "sustainable cities",
            vec![],
            vec![],
            Default::default(),
        )];
        store.save(&documents, &Coordinate::dataset(Datatype::Test, project))?;
    }

    let artifact = store
        .resolver()
        .resolve(&Coordinate::model(Sdg::NoPoverty, "stars_sustain"))?;
    fs::create_dir_all(artifact.parent().expect("models dir"))?;
    fs::write(&artifact, "not an artifact")?;

    let orchestrator = Orchestrator::new(&config, &store, &registry);
    let report = orchestrator.predict_all(Datatype::Test, &HashSet::new(), true)?;
    assert!(report.completed.is_empty());
    assert!(report.skipped.is_empty());
    assert_eq!(report.failed.len(), projects.len());

    let mut failed: Vec<&str> = report
        .failed
        .iter()
        .filter_map(|f| f.unit.project.as_deref())
        .collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["grad", "summer", "undergrad"]);
    Ok(())
}
