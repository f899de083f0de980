use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::features::{DerivedFeatures, EnrichedGameRow};
use crate::game_log::RawGameRow;

pub const COMBINED_FILE: &str = "combined_player_stats.csv";

/// One line of the persisted table. Column names follow the stats source
/// plus the derived columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    #[serde(rename = "SEASON_ID")]
    pub season_id: String,
    #[serde(rename = "Player_ID")]
    pub player_id: u64,
    #[serde(rename = "Game_ID")]
    pub game_id: String,
    #[serde(rename = "GAME_DATE")]
    pub game_date: NaiveDate,
    #[serde(rename = "MATCHUP")]
    pub matchup: String,
    #[serde(rename = "WL")]
    pub wl: Option<String>,
    #[serde(rename = "MIN")]
    pub min: f64,
    #[serde(rename = "FGM")]
    pub fgm: f64,
    #[serde(rename = "FGA")]
    pub fga: f64,
    #[serde(rename = "FG_PCT")]
    pub fg_pct: Option<f64>,
    #[serde(rename = "FG3M")]
    pub fg3m: f64,
    #[serde(rename = "FG3A")]
    pub fg3a: f64,
    #[serde(rename = "FG3_PCT")]
    pub fg3_pct: Option<f64>,
    #[serde(rename = "FTM")]
    pub ftm: f64,
    #[serde(rename = "FTA")]
    pub fta: f64,
    #[serde(rename = "FT_PCT")]
    pub ft_pct: Option<f64>,
    #[serde(rename = "OREB")]
    pub oreb: f64,
    #[serde(rename = "DREB")]
    pub dreb: f64,
    #[serde(rename = "REB")]
    pub reb: f64,
    #[serde(rename = "AST")]
    pub ast: f64,
    #[serde(rename = "STL")]
    pub stl: f64,
    #[serde(rename = "BLK")]
    pub blk: f64,
    #[serde(rename = "TOV")]
    pub tov: f64,
    #[serde(rename = "PF")]
    pub pf: f64,
    #[serde(rename = "PTS")]
    pub pts: f64,
    #[serde(rename = "PLUS_MINUS")]
    pub plus_minus: Option<f64>,
    #[serde(rename = "PLAYER_NAME")]
    pub player_name: String,
    #[serde(rename = "TEAM")]
    pub team: String,
    #[serde(rename = "SEASON")]
    pub season: String,
    #[serde(rename = "POINTS_MOVING_AVG")]
    pub points_moving_avg: Option<f64>,
    #[serde(rename = "REBOUNDS_MOVING_AVG")]
    pub rebounds_moving_avg: Option<f64>,
    #[serde(rename = "ASSISTS_MOVING_AVG")]
    pub assists_moving_avg: Option<f64>,
    #[serde(rename = "FG_PCT_MOVING_AVG")]
    pub fg_pct_moving_avg: Option<f64>,
    #[serde(rename = "PLUS_MINUS_MOVING_AVG")]
    pub plus_minus_moving_avg: Option<f64>,
    #[serde(rename = "MIN_MOVING_AVG")]
    pub min_moving_avg: Option<f64>,
    #[serde(rename = "BACK_TO_BACK", deserialize_with = "de_flag")]
    pub back_to_back: bool,
    #[serde(rename = "IS_HOME", deserialize_with = "de_flag")]
    pub is_home: bool,
    #[serde(rename = "OPPONENT")]
    pub opponent: String,
    #[serde(rename = "SIMPLIFIED_PER")]
    pub simplified_per: f64,
    #[serde(rename = "OFF_EFF")]
    pub off_eff: f64,
    #[serde(rename = "DEF_REB_PCT")]
    pub def_reb_pct: f64,
}

impl From<&EnrichedGameRow> for DatasetRecord {
    fn from(row: &EnrichedGameRow) -> Self {
        let r = &row.raw;
        let f = &row.features;
        Self {
            season_id: r.season_id.clone(),
            player_id: r.player_id,
            game_id: r.game_id.clone(),
            game_date: r.game_date,
            matchup: r.matchup.clone(),
            wl: r.wl.clone(),
            min: r.min,
            fgm: r.fgm,
            fga: r.fga,
            fg_pct: r.fg_pct,
            fg3m: r.fg3m,
            fg3a: r.fg3a,
            fg3_pct: r.fg3_pct,
            ftm: r.ftm,
            fta: r.fta,
            ft_pct: r.ft_pct,
            oreb: r.oreb,
            dreb: r.dreb,
            reb: r.reb,
            ast: r.ast,
            stl: r.stl,
            blk: r.blk,
            tov: r.tov,
            pf: r.pf,
            pts: r.pts,
            plus_minus: r.plus_minus,
            player_name: r.player_name.clone(),
            team: r.team.clone(),
            season: r.season.clone(),
            points_moving_avg: f.points_moving_avg,
            rebounds_moving_avg: f.rebounds_moving_avg,
            assists_moving_avg: f.assists_moving_avg,
            fg_pct_moving_avg: f.fg_pct_moving_avg,
            plus_minus_moving_avg: f.plus_minus_moving_avg,
            min_moving_avg: f.min_moving_avg,
            back_to_back: f.back_to_back,
            is_home: f.is_home,
            opponent: f.opponent.clone(),
            simplified_per: f.simplified_per,
            off_eff: f.off_eff,
            def_reb_pct: f.def_reb_pct,
        }
    }
}

impl From<DatasetRecord> for EnrichedGameRow {
    fn from(rec: DatasetRecord) -> Self {
        let raw = RawGameRow {
            season_id: rec.season_id,
            player_id: rec.player_id,
            player_name: rec.player_name,
            team: rec.team,
            season: rec.season,
            game_id: rec.game_id,
            game_date: rec.game_date,
            matchup: rec.matchup,
            wl: rec.wl,
            min: rec.min,
            fgm: rec.fgm,
            fga: rec.fga,
            fg_pct: rec.fg_pct,
            fg3m: rec.fg3m,
            fg3a: rec.fg3a,
            fg3_pct: rec.fg3_pct,
            ftm: rec.ftm,
            fta: rec.fta,
            ft_pct: rec.ft_pct,
            oreb: rec.oreb,
            dreb: rec.dreb,
            reb: rec.reb,
            ast: rec.ast,
            stl: rec.stl,
            blk: rec.blk,
            tov: rec.tov,
            pf: rec.pf,
            pts: rec.pts,
            plus_minus: rec.plus_minus,
        };
        let features = DerivedFeatures {
            points_moving_avg: rec.points_moving_avg,
            rebounds_moving_avg: rec.rebounds_moving_avg,
            assists_moving_avg: rec.assists_moving_avg,
            fg_pct_moving_avg: rec.fg_pct_moving_avg,
            plus_minus_moving_avg: rec.plus_minus_moving_avg,
            min_moving_avg: rec.min_moving_avg,
            back_to_back: rec.back_to_back,
            is_home: rec.is_home,
            opponent: rec.opponent,
            simplified_per: rec.simplified_per,
            off_eff: rec.off_eff,
            def_reb_pct: rec.def_reb_pct,
        };
        EnrichedGameRow { raw, features }
    }
}

/// Row-wise union of every collected player-season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedDataset {
    rows: Vec<EnrichedGameRow>,
}

impl AggregatedDataset {
    /// Concatenates units in the order given; rows are neither reordered
    /// nor deduplicated.
    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = Vec<EnrichedGameRow>>,
    {
        let mut rows = Vec::new();
        for unit in units {
            rows.extend(unit);
        }
        Self { rows }
    }

    pub fn from_rows(rows: Vec<EnrichedGameRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedGameRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EnrichedGameRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv(&self, path: &Path) -> Result<usize> {
        write_rows_csv(path, &self.rows)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("open dataset {}", path.display()))?;
        let mut rows = Vec::new();
        for (idx, rec) in reader.deserialize::<DatasetRecord>().enumerate() {
            let rec = rec.with_context(|| format!("decode dataset row {}", idx + 1))?;
            rows.push(EnrichedGameRow::from(rec));
        }
        Ok(Self { rows })
    }
}

/// Full rewrite of `path` through a sibling temp file.
pub fn write_rows_csv(path: &Path, rows: &[EnrichedGameRow]) -> Result<usize> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        for row in rows {
            writer
                .serialize(DatasetRecord::from(row))
                .context("write dataset row")?;
        }
        writer.flush().context("flush dataset")?;
    }
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(rows.len())
}

pub fn combined_path(data_dir: &Path) -> PathBuf {
    data_dir.join("cleaned").join(COMBINED_FILE)
}

/// `data/temp/LeBron_James_2019-20.csv`
pub fn unit_snapshot_path(data_dir: &Path, player: &str, season: &str) -> PathBuf {
    let safe_player = player.trim().replace(' ', "_").replace('.', "");
    data_dir
        .join("temp")
        .join(format!("{safe_player}_{}.csv", season.trim()))
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag {other:?}"))),
    }
}
