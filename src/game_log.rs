use anyhow::anyhow;
use chrono::NaiveDate;
use serde_json::Value;

use crate::error::SourceError;

/// A player as known to the game-log source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    pub id: u64,
    pub name: String,
}

/// One box-score line for one player in one game, as returned by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGameRow {
    pub season_id: String,
    pub player_id: u64,
    pub player_name: String,
    pub team: String,
    pub season: String,
    pub game_id: String,
    pub game_date: NaiveDate,
    pub matchup: String,
    pub wl: Option<String>,
    pub min: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg_pct: Option<f64>,
    pub fg3m: f64,
    pub fg3a: f64,
    pub fg3_pct: Option<f64>,
    pub ftm: f64,
    pub fta: f64,
    pub ft_pct: Option<f64>,
    pub oreb: f64,
    pub dreb: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub pf: f64,
    pub pts: f64,
    pub plus_minus: Option<f64>,
}

/// Anything that can hand back a player's game log for one season.
pub trait GameLogSource {
    fn find_player(&self, full_name: &str) -> Result<PlayerRef, SourceError>;

    /// Rows come back in whatever order the source uses; an empty log is a
    /// `SourceError::EmptyResult`.
    fn fetch_game_log(&self, player: &PlayerRef, season: &str)
    -> Result<Vec<RawGameRow>, SourceError>;
}

/// Decodes a `playergamelog` payload (`resultSets[0].headers` + `rowSet`).
///
/// A row without a parseable date, a game id or a matchup fails the whole
/// payload: dropping it would shift the neighbours' rolling windows. Null
/// numeric cells decode as 0 except the percentage and plus/minus columns,
/// which stay `None`.
pub fn parse_game_log_json(raw: &str, player: &PlayerRef) -> anyhow::Result<Vec<RawGameRow>> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let Some(set) = result_set(&value, "PlayerGameLog") else {
        return Ok(Vec::new());
    };
    let table = ResultTable::from_set(set)?;

    let mut out = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().copied().enumerate() {
        let game_id = table
            .str(row, "Game_ID")
            .or_else(|| table.str(row, "GAME_ID"))
            .ok_or_else(|| anyhow!("row {idx}: missing Game_ID"))?;
        let raw_date = table
            .str(row, "GAME_DATE")
            .ok_or_else(|| anyhow!("game {game_id}: missing GAME_DATE"))?;
        let game_date = parse_game_date(&raw_date)
            .ok_or_else(|| anyhow!("game {game_id}: unparseable GAME_DATE {raw_date:?}"))?;
        let matchup = table
            .str(row, "MATCHUP")
            .ok_or_else(|| anyhow!("game {game_id}: missing MATCHUP"))?;
        out.push(RawGameRow {
            season_id: table.str(row, "SEASON_ID").unwrap_or_default(),
            player_id: table
                .num(row, "Player_ID")
                .map(|v| v as u64)
                .unwrap_or(player.id),
            player_name: player.name.clone(),
            team: String::new(),
            season: String::new(),
            game_id,
            game_date,
            matchup,
            wl: table.str(row, "WL"),
            min: table.num(row, "MIN").unwrap_or(0.0),
            fgm: table.num(row, "FGM").unwrap_or(0.0),
            fga: table.num(row, "FGA").unwrap_or(0.0),
            fg_pct: table.num(row, "FG_PCT"),
            fg3m: table.num(row, "FG3M").unwrap_or(0.0),
            fg3a: table.num(row, "FG3A").unwrap_or(0.0),
            fg3_pct: table.num(row, "FG3_PCT"),
            ftm: table.num(row, "FTM").unwrap_or(0.0),
            fta: table.num(row, "FTA").unwrap_or(0.0),
            ft_pct: table.num(row, "FT_PCT"),
            oreb: table.num(row, "OREB").unwrap_or(0.0),
            dreb: table.num(row, "DREB").unwrap_or(0.0),
            reb: table.num(row, "REB").unwrap_or(0.0),
            ast: table.num(row, "AST").unwrap_or(0.0),
            stl: table.num(row, "STL").unwrap_or(0.0),
            blk: table.num(row, "BLK").unwrap_or(0.0),
            tov: table.num(row, "TOV").unwrap_or(0.0),
            pf: table.num(row, "PF").unwrap_or(0.0),
            pts: table.num(row, "PTS").unwrap_or(0.0),
            plus_minus: table.num(row, "PLUS_MINUS"),
        });
    }
    Ok(out)
}

/// Decodes a `commonallplayers` payload into the player directory.
pub fn parse_player_directory_json(raw: &str) -> anyhow::Result<Vec<PlayerRef>> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let Some(set) = result_set(&value, "CommonAllPlayers") else {
        return Ok(Vec::new());
    };
    let table = ResultTable::from_set(set)?;
    let mut out = Vec::with_capacity(table.rows.len());
    for row in table.rows.iter().copied() {
        let Some(id) = table.num(row, "PERSON_ID") else {
            continue;
        };
        let Some(name) = table.str(row, "DISPLAY_FIRST_LAST") else {
            continue;
        };
        out.push(PlayerRef {
            id: id as u64,
            name,
        });
    }
    Ok(out)
}

/// Accepts the source's `"OCT 22, 2019"` form and ISO dates (with or without
/// a time part).
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%b %d, %Y") {
        return Some(date);
    }
    let iso = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

fn result_set<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    let sets = value.get("resultSets")?.as_array()?;
    sets.iter()
        .find(|set| set.get("name").and_then(|n| n.as_str()) == Some(name))
        .or_else(|| sets.first())
}

struct ResultTable<'a> {
    headers: Vec<&'a str>,
    rows: Vec<&'a [Value]>,
}

impl<'a> ResultTable<'a> {
    fn from_set(set: &'a Value) -> anyhow::Result<Self> {
        let headers = set
            .get("headers")
            .and_then(|h| h.as_array())
            .ok_or_else(|| anyhow!("result set without headers"))?
            .iter()
            .filter_map(|h| h.as_str())
            .collect::<Vec<_>>();
        let rows = set
            .get("rowSet")
            .and_then(|r| r.as_array())
            .map(|rows| {
                rows.iter()
                    .filter_map(|r| r.as_array().map(|cells| cells.as_slice()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { headers, rows })
    }

    fn cell(&self, row: &'a [Value], column: &str) -> Option<&'a Value> {
        let idx = self.headers.iter().position(|h| *h == column)?;
        row.get(idx).filter(|v| !v.is_null())
    }

    fn str(&self, row: &'a [Value], column: &str) -> Option<String> {
        match self.cell(row, column)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn num(&self, row: &'a [Value], column: &str) -> Option<f64> {
        let v = self.cell(row, column)?;
        if let Some(n) = v.as_f64() {
            return Some(n);
        }
        let raw = v.as_str()?.trim();
        // Some endpoints report minutes as "MM:SS".
        if let Some((mins, secs)) = raw.split_once(':') {
            let mins = mins.trim().parse::<f64>().ok()?;
            let secs = secs.trim().parse::<f64>().ok()?;
            return Some(mins + secs / 60.0);
        }
        raw.parse::<f64>().ok()
    }
}
