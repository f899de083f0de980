use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable for {player} {season}: {reason}")]
    Unavailable {
        player: String,
        season: String,
        reason: String,
    },
    #[error("no games returned for {player} {season}")]
    EmptyResult { player: String, season: String },
    #[error("player {0} not found in the player directory")]
    PlayerNotFound(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("empty game sequence")]
    EmptySequence,
    #[error("malformed matchup descriptor {matchup:?} (game {game_id})")]
    MalformedMatchup { game_id: String, matchup: String },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("unknown opponent {0:?}: not seen when the encoder was fitted")]
    UnknownCategory(String),
    #[error("{kind} artifact not found at {}", path.display())]
    ArtifactNotFound { kind: &'static str, path: PathBuf },
    #[error("{kind} artifact at {} is invalid: {reason}", path.display())]
    ArtifactInvalid {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("feature vector has {got} values, model expects {expected}")]
    FeatureCount { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("read roster {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse roster: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("roster has no players")]
    NoPlayers,
    #[error("roster has no seasons")]
    NoSeasons,
}
