//! Versioned on-disk schema for model and corpus artifacts.
//!
//! Both artifacts are JSON documents tagged with a format name and schema
//! version. Feature values are stored as base64 of little-endian `f32` bytes so
//! they round-trip bit-exactly.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;
use crate::features::FeatureVector;
use crate::ml::{ClassifierKind, NearestCentroidModel, NearestNeighborModel, TrainedModel};

pub const MODEL_FORMAT: &str = "vibesense.model";
pub const CORPUS_FORMAT: &str = "vibesense.corpus";
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized classifier parameters.
///
/// Nearest-neighbor rows are the training examples; nearest-centroid rows are
/// the class means. Rows keep the order the model scans them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub schema_version: u32,
    pub classifier: ClassifierKind,
    pub feature_len: usize,
    pub classes: Vec<String>,
    pub rows: Vec<RowRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRecord {
    pub class_index: usize,
    pub values: String,
}

/// Serialized label→examples mapping.
///
/// `classes` lists every bucket, including empty ones, in configured order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusArtifact {
    pub format: String,
    pub schema_version: u32,
    pub feature_len: usize,
    pub classes: Vec<String>,
    pub examples: Vec<ExampleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub label: String,
    pub features: String,
}

pub fn encode_f32s(values: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

pub fn decode_f32s(encoded: &str, expected_len: usize) -> Result<Vec<f32>, String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| format!("invalid base64 payload: {err}"))?;
    let expected_bytes = expected_len
        .checked_mul(4)
        .ok_or_else(|| format!("feature length {expected_len} is out of range"))?;
    if bytes.len() != expected_bytes {
        return Err(format!(
            "payload holds {} bytes (expected {expected_bytes})",
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn check_header(format: &str, version: u32, expected_format: &str) -> Result<(), String> {
    if format != expected_format {
        return Err(format!(
            "unexpected format {format:?} (expected {expected_format:?})"
        ));
    }
    if version != SCHEMA_VERSION {
        return Err(format!(
            "unsupported schema version {version} (expected {SCHEMA_VERSION})"
        ));
    }
    Ok(())
}

impl ModelArtifact {
    pub fn from_model(model: &TrainedModel) -> Self {
        let (rows, labels): (&[f32], &[usize]) = match model {
            TrainedModel::NearestNeighbor(m) => (m.rows.as_slice(), m.row_labels.as_slice()),
            TrainedModel::NearestCentroid(m) => {
                (m.centroids.as_slice(), m.centroid_labels.as_slice())
            }
        };
        let dim = model.feature_len();
        let rows = rows
            .chunks_exact(dim)
            .zip(labels)
            .map(|(row, &class_index)| RowRecord {
                class_index,
                values: encode_f32s(row),
            })
            .collect();
        Self {
            format: MODEL_FORMAT.to_string(),
            schema_version: SCHEMA_VERSION,
            classifier: model.kind(),
            feature_len: dim,
            classes: model.classes().to_vec(),
            rows,
        }
    }

    /// Rebuild and validate the in-memory model.
    pub fn into_model(self) -> Result<TrainedModel, String> {
        check_header(&self.format, self.schema_version, MODEL_FORMAT)?;
        let mut flat = Vec::new();
        let mut labels = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            let values = decode_f32s(&row.values, self.feature_len)
                .map_err(|err| format!("row {idx}: {err}"))?;
            flat.extend(values);
            labels.push(row.class_index);
        }
        let model = match self.classifier {
            ClassifierKind::NearestNeighbor => TrainedModel::NearestNeighbor(NearestNeighborModel {
                classes: self.classes,
                feature_len: self.feature_len,
                rows: flat,
                row_labels: labels,
            }),
            ClassifierKind::NearestCentroid => {
                TrainedModel::NearestCentroid(NearestCentroidModel {
                    classes: self.classes,
                    feature_len: self.feature_len,
                    centroids: flat,
                    centroid_labels: labels,
                })
            }
        };
        model.validate()?;
        Ok(model)
    }
}

impl CorpusArtifact {
    pub fn from_corpus(corpus: &TrainingCorpus) -> Self {
        Self {
            format: CORPUS_FORMAT.to_string(),
            schema_version: SCHEMA_VERSION,
            feature_len: corpus.feature_len(),
            classes: corpus.class_names().map(str::to_string).collect(),
            examples: corpus
                .examples()
                .map(|example| ExampleRecord {
                    label: example.label().to_string(),
                    features: encode_f32s(example.features().as_slice()),
                })
                .collect(),
        }
    }

    /// Rebuild the corpus, preserving bucket and example order.
    pub fn into_corpus(self) -> Result<TrainingCorpus, String> {
        check_header(&self.format, self.schema_version, CORPUS_FORMAT)?;
        let mut corpus = TrainingCorpus::new(self.classes.as_slice(), self.feature_len)
            .map_err(|err| err.to_string())?;
        for (idx, record) in self.examples.into_iter().enumerate() {
            let values = decode_f32s(&record.features, self.feature_len)
                .map_err(|err| format!("example {idx}: {err}"))?;
            corpus
                .append(&record.label, FeatureVector::from(values))
                .map_err(|err| format!("example {idx}: {err}"))?;
        }
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_payload_is_bit_exact() {
        let values = [0.1f32, -0.0, f32::MIN_POSITIVE, 1.0e-40, 3.402_823_5e38, 1.0 / 3.0];
        let decoded = decode_f32s(&encode_f32s(&values), values.len()).unwrap();
        let original_bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
        let decoded_bits: Vec<u32> = decoded.iter().map(|v| v.to_bits()).collect();
        assert_eq!(original_bits, decoded_bits);
    }

    #[test]
    fn payload_length_is_checked() {
        let encoded = encode_f32s(&[1.0, 2.0]);
        assert!(decode_f32s(&encoded, 3).is_err());
        assert!(decode_f32s("not base64!", 1).is_err());
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let corpus = TrainingCorpus::new(&["a", "b"], 2).unwrap();
        let mut artifact = CorpusArtifact::from_corpus(&corpus);
        artifact.schema_version = 99;
        let err = artifact.into_corpus().unwrap_err();
        assert!(err.contains("schema version"));
    }

    #[test]
    fn oversized_feature_len_is_an_error() {
        assert!(decode_f32s("AAAAAA==", usize::MAX / 2).is_err());
        for feature_len in [usize::MAX / 2, 1 << 33] {
            let artifact = ModelArtifact {
                format: MODEL_FORMAT.to_string(),
                schema_version: SCHEMA_VERSION,
                classifier: ClassifierKind::NearestNeighbor,
                feature_len,
                classes: vec!["a".into()],
                rows: vec![RowRecord {
                    class_index: 0,
                    values: "AAAAAA==".to_string(),
                }],
            };
            assert!(artifact.into_model().is_err());
        }
    }

    #[test]
    fn model_rows_with_out_of_range_class_fail_validation() {
        let artifact = ModelArtifact {
            format: MODEL_FORMAT.to_string(),
            schema_version: SCHEMA_VERSION,
            classifier: ClassifierKind::NearestNeighbor,
            feature_len: 1,
            classes: vec!["a".into()],
            rows: vec![RowRecord {
                class_index: 3,
                values: encode_f32s(&[0.5]),
            }],
        };
        assert!(artifact.into_model().is_err());
    }
}
