use anyhow::Context;
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::game_log::{
    GameLogSource, PlayerRef, RawGameRow, parse_game_log_json, parse_player_directory_json,
};
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::rate_limit::RequestPacer;

const STATS_BASE_URL: &str = "https://stats.nba.com/stats";

/// Game-log source backed by the public stats.nba.com endpoints.
pub struct NbaStatsClient {
    client: &'static Client,
    pacer: RequestPacer,
    use_cache: bool,
    directory_season: String,
    directory: OnceCell<Vec<PlayerRef>>,
}

impl NbaStatsClient {
    /// `directory_season` selects the `commonallplayers` snapshot used to
    /// resolve names; it lists every player in league history.
    pub fn new(
        pacer: RequestPacer,
        use_cache: bool,
        directory_season: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            pacer,
            use_cache,
            directory_season: directory_season.to_string(),
            directory: OnceCell::new(),
        })
    }

    fn get(&self, url: &str) -> anyhow::Result<String> {
        self.pacer.wait();
        debug!(url, "stats request");
        fetch_json_cached(self.client, url, self.use_cache)
    }

    fn directory(&self) -> Result<&[PlayerRef], SourceError> {
        self.directory
            .get_or_try_init(|| {
                let url = player_directory_url(&self.directory_season);
                let players = self
                    .get(&url)
                    .and_then(|body| {
                        parse_player_directory_json(&body).context("invalid commonallplayers json")
                    })
                    .map_err(|err| SourceError::Unavailable {
                        player: "player directory".to_string(),
                        season: self.directory_season.clone(),
                        reason: format!("{err:#}"),
                    })?;
                info!(players = players.len(), "loaded player directory");
                Ok(players)
            })
            .map(Vec::as_slice)
    }
}

impl GameLogSource for NbaStatsClient {
    fn find_player(&self, full_name: &str) -> Result<PlayerRef, SourceError> {
        find_in_directory(self.directory()?, full_name)
            .cloned()
            .ok_or_else(|| SourceError::PlayerNotFound(full_name.to_string()))
    }

    fn fetch_game_log(
        &self,
        player: &PlayerRef,
        season: &str,
    ) -> Result<Vec<RawGameRow>, SourceError> {
        let url = game_log_url(player.id, season);
        let rows = self
            .get(&url)
            .and_then(|body| {
                parse_game_log_json(&body, player).context("invalid playergamelog json")
            })
            .map_err(|err| SourceError::Unavailable {
                player: player.name.clone(),
                season: season.to_string(),
                reason: format!("{err:#}"),
            })?;
        if rows.is_empty() {
            return Err(SourceError::EmptyResult {
                player: player.name.clone(),
                season: season.to_string(),
            });
        }
        Ok(rows)
    }
}

pub fn game_log_url(player_id: u64, season: &str) -> String {
    format!(
        "{STATS_BASE_URL}/playergamelog?PlayerID={player_id}&Season={}&SeasonType=Regular%20Season&LeagueID=00",
        season.trim()
    )
}

fn player_directory_url(season: &str) -> String {
    format!(
        "{STATS_BASE_URL}/commonallplayers?LeagueID=00&Season={}&IsOnlyCurrentSeason=0",
        season.trim()
    )
}

/// Exact match on the normalized name; the first entry wins when the
/// directory holds namesakes.
pub fn find_in_directory<'a>(
    directory: &'a [PlayerRef],
    full_name: &str,
) -> Option<&'a PlayerRef> {
    let wanted = normalize_name(full_name);
    if wanted.is_empty() {
        return None;
    }
    directory.iter().find(|p| normalize_name(&p.name) == wanted)
}

/// Lowercases, folds the accents that show up in NBA names and collapses
/// punctuation runs into `_`.
pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        let ch = fold_accent(ch);
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_us = false;
        } else if ch == '.' || ch == '\'' {
            continue;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' => 'a',
        'ć' | 'č' | 'ç' => 'c',
        'đ' | 'ď' => 'd',
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ē' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ı' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ú' | 'ù' | 'û' | 'ü' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ž' | 'ż' => 'z',
        other => other,
    }
}
