use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::dataset::{self, AggregatedDataset};
use crate::error::SourceError;
use crate::features::{EnrichedGameRow, FeatureConfig, derive_features_with};
use crate::game_log::{GameLogSource, PlayerRef, RawGameRow};
use crate::roster::CollectionUnit;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub features: FeatureConfig,
    /// Where per-unit snapshots go (`<dir>/temp/...`); `None` skips them.
    pub snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectSummary {
    pub units_total: usize,
    pub units_succeeded: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionRun {
    pub dataset: AggregatedDataset,
    pub summary: CollectSummary,
}

/// Crawls every unit, enriches what came back and concatenates the result.
///
/// A unit whose fetch or derivation fails is logged and left out; nothing
/// short of a panic aborts the batch.
pub fn collect<S: GameLogSource>(
    source: &S,
    units: &[CollectionUnit],
    opts: &CollectOptions,
) -> CollectionRun {
    let mut summary = CollectSummary {
        units_total: units.len(),
        ..Default::default()
    };

    let fetched = fetch_units(source, units, &mut summary.errors);

    let derived: Vec<(&CollectionUnit, Result<Vec<EnrichedGameRow>, String>)> = fetched
        .into_par_iter()
        .map(|(unit, rows)| {
            let out = derive_features_with(rows, opts.features).map_err(|err| err.to_string());
            (unit, out)
        })
        .collect();

    let mut kept = Vec::with_capacity(derived.len());
    for (unit, result) in derived {
        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                warn!(player = %unit.player, season = %unit.season, "skipping unit: {err}");
                summary.errors.push(unit_error(unit, &err));
                continue;
            }
        };
        if let Some(dir) = opts.snapshot_dir.as_deref()
            && let Err(err) = write_snapshot(dir, unit, &rows)
        {
            warn!(player = %unit.player, season = %unit.season, "snapshot failed: {err:#}");
            summary.errors.push(unit_error(unit, &format!("{err:#}")));
            continue;
        }
        info!(
            player = %unit.player,
            team = %unit.team,
            season = %unit.season,
            games = rows.len(),
            "collected"
        );
        summary.units_succeeded += 1;
        kept.push(rows);
    }

    let dataset = AggregatedDataset::from_units(kept);
    summary.rows = dataset.len();
    CollectionRun { dataset, summary }
}

/// Runs on the calling thread; the source paces its own requests.
///
/// A name the directory does not know is cached so its other units skip
/// without another lookup. Transport failures are retried on the next unit.
fn fetch_units<'u, S: GameLogSource>(
    source: &S,
    units: &'u [CollectionUnit],
    errors: &mut Vec<String>,
) -> Vec<(&'u CollectionUnit, Vec<RawGameRow>)> {
    let mut players: HashMap<&str, Result<PlayerRef, String>> = HashMap::new();
    let mut out = Vec::with_capacity(units.len());

    for unit in units {
        let resolved = match players.get(unit.player.as_str()) {
            Some(cached) => cached.clone(),
            None => match source.find_player(&unit.player) {
                Ok(player) => {
                    players.insert(unit.player.as_str(), Ok(player.clone()));
                    Ok(player)
                }
                Err(err @ SourceError::PlayerNotFound(_)) => {
                    players.insert(unit.player.as_str(), Err(err.to_string()));
                    Err(err.to_string())
                }
                Err(err) => Err(err.to_string()),
            },
        };
        let player = match resolved {
            Ok(player) => player,
            Err(reason) => {
                let reason = format!("player not resolved: {reason}");
                warn!(player = %unit.player, season = %unit.season, "skipping unit: {reason}");
                errors.push(unit_error(unit, &reason));
                continue;
            }
        };

        info!(player = %unit.player, team = %unit.team, season = %unit.season, "fetching game log");
        match source.fetch_game_log(&player, &unit.season) {
            Ok(mut rows) => {
                for row in &mut rows {
                    row.player_name = unit.player.clone();
                    row.team = unit.team.clone();
                    row.season = unit.season.clone();
                }
                out.push((unit, rows));
            }
            Err(err @ SourceError::EmptyResult { .. }) => {
                warn!(player = %unit.player, season = %unit.season, "no data, skipping");
                errors.push(unit_error(unit, &err.to_string()));
            }
            Err(err) => {
                warn!(player = %unit.player, season = %unit.season, "fetch failed: {err}");
                errors.push(unit_error(unit, &err.to_string()));
            }
        }
    }
    out
}

fn write_snapshot(dir: &Path, unit: &CollectionUnit, rows: &[EnrichedGameRow]) -> Result<()> {
    let path = dataset::unit_snapshot_path(dir, &unit.player, &unit.season);
    dataset::write_rows_csv(&path, rows)?;
    Ok(())
}

fn unit_error(unit: &CollectionUnit, err: &str) -> String {
    format!(
        "{} ({}) - Season {}: {err}",
        unit.player, unit.team, unit.season
    )
}
