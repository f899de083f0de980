//! Gradient-boosted regression trees loaded from an XGBoost JSON model
//! (`Booster.save_model("model.json")`).
//!
//! Only the `gbtree` booster with an identity link is supported, which is
//! what `reg:squarederror` produces:
//!
//! ```text
//! prediction = base_score + Σ leaf(tree_k, x)
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::InferenceError;
use crate::inference::{PointsRegressor, read_artifact};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, features: &[f64]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(f64::NAN);
                    // Splits compare in single precision, as the trainer does.
                    idx = if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if (x as f32) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    base_score: f32,
    num_features: usize,
    trees: Vec<Tree>,
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    gradient_booster: GradientBooster,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: Value,
    #[serde(default)]
    num_feature: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    #[serde(default)]
    name: Option<String>,
    model: GbTreeModel,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<TreeArrays>,
}

#[derive(Debug, Deserialize)]
struct TreeArrays {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Value>,
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = read_artifact("model", path)?;
        Self::from_json(&raw).map_err(|reason| InferenceError::ArtifactInvalid {
            kind: "model",
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        let file = serde_json::from_str::<ModelFile>(raw).map_err(|e| e.to_string())?;
        let learner = file.learner;
        if let Some(name) = learner.gradient_booster.name.as_deref()
            && name != "gbtree"
        {
            return Err(format!("unsupported booster {name:?}"));
        }
        let base_score = number_value(&learner.learner_model_param.base_score)
            .ok_or_else(|| "base_score is not a number".to_string())?;
        let declared = learner
            .learner_model_param
            .num_feature
            .as_ref()
            .and_then(number_value)
            .map(|n| n as usize);

        let mut trees = Vec::with_capacity(learner.gradient_booster.model.trees.len());
        let mut max_feature = 0usize;
        for (tree_idx, arrays) in learner.gradient_booster.model.trees.iter().enumerate() {
            let tree = build_tree(arrays).map_err(|e| format!("tree {tree_idx}: {e}"))?;
            for node in &tree.nodes {
                if let Node::Split { feature, .. } = node {
                    max_feature = max_feature.max(feature + 1);
                }
            }
            trees.push(tree);
        }

        let num_features = declared.unwrap_or(max_feature);
        if max_feature > num_features {
            return Err(format!(
                "split on feature {} but model declares {num_features} features",
                max_feature - 1
            ));
        }
        Ok(Self {
            base_score: base_score as f32,
            num_features,
            trees,
        })
    }

    pub fn base_score(&self) -> f64 {
        f64::from(self.base_score)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl PointsRegressor for TreeEnsemble {
    fn num_features(&self) -> usize {
        self.num_features
    }

    /// Accumulates in `f32` like the trainer, widening only the result.
    fn predict(&self, features: &[f64]) -> f64 {
        let sum = self
            .trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.leaf_value(features));
        f64::from(sum)
    }
}

fn build_tree(arrays: &TreeArrays) -> Result<Tree, String> {
    let n = arrays.left_children.len();
    if n == 0 {
        return Err("empty tree".to_string());
    }
    if arrays.right_children.len() != n
        || arrays.split_indices.len() != n
        || arrays.split_conditions.len() != n
        || arrays.default_left.len() != n
    {
        return Err("node arrays differ in length".to_string());
    }

    let mut nodes = Vec::with_capacity(n);
    for idx in 0..n {
        let left = arrays.left_children[idx];
        let right = arrays.right_children[idx];
        if left < 0 {
            nodes.push(Node::Leaf(arrays.split_conditions[idx] as f32));
            continue;
        }
        // Children always come after their parent, so traversal terminates.
        let child = |c: i64| -> Result<usize, String> {
            let c = usize::try_from(c).map_err(|_| format!("node {idx}: bad child {c}"))?;
            if c <= idx || c >= n {
                return Err(format!("node {idx}: child {c} out of range"));
            }
            Ok(c)
        };
        let feature = usize::try_from(arrays.split_indices[idx])
            .map_err(|_| format!("node {idx}: negative split index"))?;
        nodes.push(Node::Split {
            feature,
            threshold: arrays.split_conditions[idx] as f32,
            left: child(left)?,
            right: child(right)?,
            default_left: flag_value(&arrays.default_left[idx]),
        });
    }
    Ok(Tree { nodes })
}

/// XGBoost writes scalars as strings (`"2.1E1"`) and, since 3.0,
/// `base_score` as a one-element list (`"[2.1E1]"`).
fn number_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim()
            .parse::<f64>()
            .ok(),
        Value::Array(items) if items.len() == 1 => number_value(&items[0]),
        _ => None,
    }
}

fn flag_value(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}
