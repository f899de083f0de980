use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RosterError;

const DEFAULT_ROSTER: &str = include_str!("../assets/default_roster.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub team: String,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub seasons: Vec<String>,
    pub teams: Vec<TeamRoster>,
}

/// One (team, player, season) crawl unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionUnit {
    pub team: String,
    pub player: String,
    pub season: String,
}

impl Roster {
    pub fn builtin() -> Result<Self, RosterError> {
        Self::from_json(DEFAULT_ROSTER)
    }

    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let raw = fs::read_to_string(path).map_err(|source| RosterError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, RosterError> {
        let mut roster = serde_json::from_str::<Roster>(raw)?;
        roster.normalize();
        roster.validate()?;
        Ok(roster)
    }

    /// Replaces the season list; blank labels are dropped.
    pub fn with_seasons(mut self, seasons: Vec<String>) -> Result<Self, RosterError> {
        self.seasons = seasons;
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// Units in crawl order: team, then player, then season. A player listed
    /// under two teams yields units for both.
    pub fn units(&self) -> Vec<CollectionUnit> {
        let mut out = Vec::new();
        for team in &self.teams {
            for player in &team.players {
                for season in &self.seasons {
                    out.push(CollectionUnit {
                        team: team.team.clone(),
                        player: player.clone(),
                        season: season.clone(),
                    });
                }
            }
        }
        out
    }

    fn normalize(&mut self) {
        self.seasons = self
            .seasons
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for team in &mut self.teams {
            team.team = team.team.trim().to_string();
            team.players = team
                .players
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        self.teams.retain(|t| !t.team.is_empty() && !t.players.is_empty());
    }

    fn validate(&self) -> Result<(), RosterError> {
        if self.teams.is_empty() {
            return Err(RosterError::NoPlayers);
        }
        if self.seasons.is_empty() {
            return Err(RosterError::NoSeasons);
        }
        Ok(())
    }
}

/// Splits a `"2019-20,2020-21"` style list.
pub fn parse_season_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
