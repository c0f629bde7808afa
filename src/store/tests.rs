use super::*;
use crate::features::FeatureVector;
use crate::ml::{ClassifierKind, TrainOptions, train};
use tempfile::tempdir;

fn classes() -> Vec<String> {
    vec!["neutral".into(), "full".into(), "empty".into()]
}

fn sample_corpus() -> TrainingCorpus {
    let mut corpus = TrainingCorpus::new(classes().as_slice(), 3).unwrap();
    corpus
        .append("full", FeatureVector::from(vec![1.0, 0.5, 0.25]))
        .unwrap();
    corpus
        .append("neutral", FeatureVector::from(vec![0.0, 0.0, 0.1]))
        .unwrap();
    corpus
        .append("full", FeatureVector::from(vec![0.9, 0.4, 0.2]))
        .unwrap();
    corpus
}

fn store_in(dir: &Path) -> PersistenceStore {
    PersistenceStore::new(dir, classes().as_slice(), 3)
}

#[test]
fn corpus_round_trip_preserves_buckets_and_order() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let corpus = sample_corpus();
    let path = store.save_corpus(&corpus, "data1").unwrap();
    assert_eq!(path, dir.path().join("data1.corpus.json"));

    let loaded = store.load_corpus("data1").unwrap();
    assert_eq!(loaded, corpus);
    assert_eq!(loaded.count_for("empty"), 0);
}

#[test]
fn model_round_trip_classifies_identically() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    for kind in [ClassifierKind::NearestNeighbor, ClassifierKind::NearestCentroid] {
        let model = train(&sample_corpus(), &TrainOptions::with_kind(kind)).unwrap();
        store.save_model(&model, "model1").unwrap();
        let loaded = store.load_model("model1").unwrap();
        assert_eq!(loaded.kind(), kind);
        for query in [[0.95, 0.45, 0.2], [0.1, 0.0, 0.1], [0.5, 0.25, 0.15]] {
            assert_eq!(
                loaded.classify(&query).unwrap(),
                model.classify(&query).unwrap()
            );
        }
    }
}

#[test]
fn missing_artifacts_report_not_found() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    assert!(matches!(
        store.load_model("absent"),
        Err(StoreError::ModelNotFound { .. })
    ));
    assert!(matches!(
        store.load_corpus("absent"),
        Err(StoreError::CorpusNotFound { .. })
    ));
}

#[test]
fn garbage_file_is_corrupt() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(dir.path().join("bad.model.json"), b"{ not json").unwrap();
    std::fs::write(dir.path().join("bad.corpus.json"), b"[]").unwrap();
    assert!(matches!(
        store.load_model("bad"),
        Err(StoreError::CorruptArtifact { .. })
    ));
    assert!(matches!(
        store.load_corpus("bad"),
        Err(StoreError::CorruptArtifact { .. })
    ));
}

#[test]
fn other_class_set_is_a_schema_mismatch() {
    let dir = tempdir().unwrap();
    let writer = PersistenceStore::new(dir.path(), &["idle".to_string(), "tap".to_string()], 3);
    let mut corpus = TrainingCorpus::new(&["idle", "tap"], 3).unwrap();
    corpus
        .append("tap", FeatureVector::from(vec![1.0, 1.0, 1.0]))
        .unwrap();
    writer.save_corpus(&corpus, "other").unwrap();
    let model = train(&corpus, &TrainOptions::default()).unwrap();
    writer.save_model(&model, "other").unwrap();

    let reader = store_in(dir.path());
    assert!(matches!(
        reader.load_corpus("other"),
        Err(StoreError::SchemaMismatch { .. })
    ));
    assert!(matches!(
        reader.load_model("other"),
        Err(StoreError::SchemaMismatch { .. })
    ));
}

#[test]
fn other_vector_length_is_a_schema_mismatch() {
    let dir = tempdir().unwrap();
    store_in(dir.path())
        .save_corpus(&sample_corpus(), "short")
        .unwrap();
    let reader = PersistenceStore::new(dir.path(), classes().as_slice(), 4);
    assert!(matches!(
        reader.load_corpus("short"),
        Err(StoreError::SchemaMismatch { .. })
    ));
}

#[test]
fn names_outside_the_safe_alphabet_are_rejected() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    for name in ["", "../escape", "with space", "a/b"] {
        assert!(matches!(
            store.save_corpus(&sample_corpus(), name),
            Err(StoreError::InvalidName { .. })
        ));
    }
    assert!(store.corpus_path("take_2-b").is_ok());
}

#[test]
fn listing_skips_temp_files() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    assert_eq!(store.list().unwrap(), ArtifactListing::default());

    let corpus = sample_corpus();
    store.save_corpus(&corpus, "data1").unwrap();
    store.save_corpus(&corpus, "data0").unwrap();
    let model = train(&corpus, &TrainOptions::default()).unwrap();
    store.save_model(&model, "model1").unwrap();
    std::fs::write(dir.path().join(".data2.corpus.json.tmp-abc123"), b"partial").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

    let listing = store.list().unwrap();
    assert_eq!(listing.models, vec!["model1"]);
    assert_eq!(listing.corpora, vec!["data0", "data1"]);
}

#[test]
fn save_clears_temp_files_from_interrupted_writes() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    let leftover = dir.path().join("data1.corpus.json.tmp-0badc0ffee00");
    std::fs::write(&leftover, b"half").unwrap();
    store.save_corpus(&sample_corpus(), "data1").unwrap();
    assert!(!leftover.exists());
    assert_eq!(store.load_corpus("data1").unwrap().total(), 3);
}

fn write_artifact(dir: &Path, file_name: &str, json: serde_json::Value) {
    std::fs::write(dir.join(file_name), serde_json::to_vec(&json).unwrap()).unwrap();
}

#[test]
fn oversized_feature_len_is_rejected_before_decoding() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    for feature_len in [usize::MAX as u64 / 2, 1 << 33] {
        write_artifact(
            dir.path(),
            "huge.model.json",
            serde_json::json!({
                "format": schema::MODEL_FORMAT,
                "schema_version": schema::SCHEMA_VERSION,
                "classifier": "nearest_neighbor",
                "feature_len": feature_len,
                "classes": classes(),
                "rows": [{"class_index": 0, "values": "AAAAAA=="}],
            }),
        );
        write_artifact(
            dir.path(),
            "huge.corpus.json",
            serde_json::json!({
                "format": schema::CORPUS_FORMAT,
                "schema_version": schema::SCHEMA_VERSION,
                "feature_len": feature_len,
                "classes": classes(),
                "examples": [{"label": "full", "features": "AAAAAA=="}],
            }),
        );
        assert!(matches!(
            store.load_model("huge"),
            Err(StoreError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            store.load_corpus("huge"),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }
}

#[test]
fn short_payload_is_corrupt() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    write_artifact(
        dir.path(),
        "short.model.json",
        serde_json::json!({
            "format": schema::MODEL_FORMAT,
            "schema_version": schema::SCHEMA_VERSION,
            "classifier": "nearest_centroid",
            "feature_len": 3,
            "classes": classes(),
            "rows": [{"class_index": 1, "values": "AAAAAA=="}],
        }),
    );
    assert!(matches!(
        store.load_model("short"),
        Err(StoreError::CorruptArtifact { .. })
    ));
}
