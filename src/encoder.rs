use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::inference::read_artifact;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncoderArtifact {
    classes: Vec<String>,
}

/// Label encoder for the opponent column: codes are positions in the sorted
/// label set seen at training time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalEncoder {
    classes: Vec<String>,
}

impl CategoricalEncoder {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes = classes.into_iter().map(Into::into).collect::<Vec<String>>();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = read_artifact("encoder", path)?;
        let artifact = serde_json::from_str::<EncoderArtifact>(&raw).map_err(|err| {
            InferenceError::ArtifactInvalid {
                kind: "encoder",
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        if artifact.classes.is_empty() {
            return Err(InferenceError::ArtifactInvalid {
                kind: "encoder",
                path: path.to_path_buf(),
                reason: "no classes".to_string(),
            });
        }
        Ok(Self::new(artifact.classes))
    }

    pub fn encode(&self, label: &str) -> Result<usize, InferenceError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| InferenceError::UnknownCategory(label.to_string()))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&EncoderArtifact {
            classes: self.classes.clone(),
        })
    }
}
