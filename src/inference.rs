use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::booster::TreeEnsemble;
use crate::encoder::CategoricalEncoder;
use crate::error::InferenceError;
use crate::features::EnrichedGameRow;

pub const FEATURE_COUNT: usize = 11;

/// Column order the model was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "BACK_TO_BACK",
    "IS_HOME",
    "OPPONENT_ENCODED",
    "MIN_MOVING_AVG",
    "POINTS_MOVING_AVG",
    "REBOUNDS_MOVING_AVG",
    "ASSISTS_MOVING_AVG",
    "FG_PCT_MOVING_AVG",
    "PLUS_MINUS_MOVING_AVG",
    "OFF_EFF",
    "DEF_REB_PCT",
];

/// A trained regressor over a fixed-width numeric vector.
pub trait PointsRegressor: Send + Sync {
    fn num_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> f64;
}

/// What the prediction form asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    pub back_to_back: bool,
    pub is_home: bool,
    pub opponent: String,
    pub min_moving_avg: f64,
    pub points_moving_avg: f64,
    pub rebounds_moving_avg: f64,
    pub assists_moving_avg: f64,
    pub fg_pct_moving_avg: f64,
    pub plus_minus_moving_avg: f64,
    pub off_eff: f64,
    pub def_reb_pct: f64,
}

impl Default for FeatureInput {
    /// The form's starting values.
    fn default() -> Self {
        Self {
            back_to_back: false,
            is_home: false,
            opponent: String::new(),
            min_moving_avg: 30.0,
            points_moving_avg: 20.0,
            rebounds_moving_avg: 5.0,
            assists_moving_avg: 5.0,
            fg_pct_moving_avg: 0.45,
            plus_minus_moving_avg: 0.0,
            off_eff: 1.0,
            def_reb_pct: 0.5,
        }
    }
}

impl FeatureInput {
    /// Form input taken from a collected game. Rolling averages that were
    /// never defined become NaN, which the trees treat as missing.
    pub fn from_enriched(row: &EnrichedGameRow) -> Self {
        let f = &row.features;
        let or_missing = |v: Option<f64>| v.unwrap_or(f64::NAN);
        Self {
            back_to_back: f.back_to_back,
            is_home: f.is_home,
            opponent: f.opponent.clone(),
            min_moving_avg: or_missing(f.min_moving_avg),
            points_moving_avg: or_missing(f.points_moving_avg),
            rebounds_moving_avg: or_missing(f.rebounds_moving_avg),
            assists_moving_avg: or_missing(f.assists_moving_avg),
            fg_pct_moving_avg: or_missing(f.fg_pct_moving_avg),
            plus_minus_moving_avg: or_missing(f.plus_minus_moving_avg),
            off_eff: f.off_eff,
            def_reb_pct: f.def_reb_pct,
        }
    }
}

/// Model plus opponent encoder, loaded once and shared read-only.
pub struct Predictor {
    model: Box<dyn PointsRegressor>,
    encoder: CategoricalEncoder,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("num_features", &self.model.num_features())
            .field("opponents", &self.encoder.classes().len())
            .finish()
    }
}

impl Predictor {
    pub fn new(
        model: Box<dyn PointsRegressor>,
        encoder: CategoricalEncoder,
    ) -> Result<Self, InferenceError> {
        if model.num_features() != FEATURE_COUNT {
            return Err(InferenceError::FeatureCount {
                expected: FEATURE_COUNT,
                got: model.num_features(),
            });
        }
        Ok(Self { model, encoder })
    }

    /// Loads both artifacts; a missing file is `ArtifactNotFound`.
    pub fn load(model_path: &Path, encoder_path: &Path) -> Result<Self, InferenceError> {
        let model = TreeEnsemble::load(model_path)?;
        let encoder = CategoricalEncoder::load(encoder_path)?;
        Self::new(Box::new(model), encoder).map_err(|err| InferenceError::ArtifactInvalid {
            kind: "model",
            path: model_path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn known_opponents(&self) -> &[String] {
        self.encoder.classes()
    }

    /// The model input in `FEATURE_NAMES` order.
    pub fn feature_vector(&self, input: &FeatureInput) -> Result<[f64; FEATURE_COUNT], InferenceError> {
        let opponent = self.encoder.encode(&input.opponent)?;
        Ok([
            bool_value(input.back_to_back),
            bool_value(input.is_home),
            opponent as f64,
            input.min_moving_avg,
            input.points_moving_avg,
            input.rebounds_moving_avg,
            input.assists_moving_avg,
            input.fg_pct_moving_avg,
            input.plus_minus_moving_avg,
            input.off_eff,
            input.def_reb_pct,
        ])
    }

    /// Raw model output: no clamping, no rounding.
    pub fn predict(&self, input: &FeatureInput) -> Result<f64, InferenceError> {
        let vector = self.feature_vector(input)?;
        Ok(self.model.predict(&vector))
    }
}

pub(crate) fn read_artifact(kind: &'static str, path: &Path) -> Result<String, InferenceError> {
    fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => InferenceError::ArtifactNotFound {
            kind,
            path: path.to_path_buf(),
        },
        _ => InferenceError::ArtifactInvalid {
            kind,
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    })
}

fn bool_value(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}
