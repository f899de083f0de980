use std::collections::{BTreeMap, BTreeSet};

use crate::features::EnrichedGameRow;

pub const DEFAULT_TOP_SCORERS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    pub games: usize,
    pub players: usize,
    pub teams: usize,
    pub seasons: Vec<String>,
}

impl DatasetSummary {
    pub fn of(rows: &[EnrichedGameRow]) -> Self {
        let mut players = BTreeSet::new();
        let mut teams = BTreeSet::new();
        let mut seasons = BTreeSet::new();
        for row in rows {
            players.insert(row.raw.player_name.as_str());
            teams.insert(row.raw.team.as_str());
            seasons.insert(row.raw.season.as_str());
        }
        Self {
            games: rows.len(),
            players: players.len(),
            teams: teams.len(),
            seasons: seasons.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Exact-match filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub team: Option<String>,
    pub player: Option<String>,
    pub season: Option<String>,
}

impl RowFilter {
    pub fn matches(&self, row: &EnrichedGameRow) -> bool {
        let same = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);
        same(&self.team, &row.raw.team)
            && same(&self.player, &row.raw.player_name)
            && same(&self.season, &row.raw.season)
    }

    pub fn apply<'a>(&self, rows: &'a [EnrichedGameRow]) -> Vec<&'a EnrichedGameRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerLine {
    pub player: String,
    pub games: usize,
    pub mean_points: f64,
}

/// Players ranked by mean points, best first; ties break on name.
pub fn top_scorers<'a, I>(rows: I, n: usize) -> Vec<ScorerLine>
where
    I: IntoIterator<Item = &'a EnrichedGameRow>,
{
    let mut totals: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.raw.player_name.as_str()).or_default();
        entry.0 += 1;
        entry.1 += row.raw.pts;
    }
    let mut lines = totals
        .into_iter()
        .map(|(player, (games, pts))| ScorerLine {
            player: player.to_string(),
            games,
            mean_points: pts / games as f64,
        })
        .collect::<Vec<_>>();
    lines.sort_by(|a, b| {
        b.mean_points
            .total_cmp(&a.mean_points)
            .then_with(|| a.player.cmp(&b.player))
    });
    lines.truncate(n);
    lines
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BackToBackSplit {
    pub back_to_back_games: usize,
    pub back_to_back_mean: Option<f64>,
    pub rested_games: usize,
    pub rested_mean: Option<f64>,
}

pub fn back_to_back_split<'a, I>(rows: I) -> BackToBackSplit
where
    I: IntoIterator<Item = &'a EnrichedGameRow>,
{
    let (mut b2b_n, mut b2b_pts, mut rest_n, mut rest_pts) = (0usize, 0.0, 0usize, 0.0);
    for row in rows {
        if row.features.back_to_back {
            b2b_n += 1;
            b2b_pts += row.raw.pts;
        } else {
            rest_n += 1;
            rest_pts += row.raw.pts;
        }
    }
    let mean = |n: usize, total: f64| (n > 0).then(|| total / n as f64);
    BackToBackSplit {
        back_to_back_games: b2b_n,
        back_to_back_mean: mean(b2b_n, b2b_pts),
        rested_games: rest_n,
        rested_mean: mean(rest_n, rest_pts),
    }
}

pub fn opponents<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a EnrichedGameRow>,
{
    rows.into_iter()
        .map(|row| row.features.opponent.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Most recent game for `player`, optionally within one season.
pub fn latest_game<'a>(
    rows: &'a [EnrichedGameRow],
    player: &str,
    season: Option<&str>,
) -> Option<&'a EnrichedGameRow> {
    rows.iter()
        .filter(|row| row.raw.player_name == player)
        .filter(|row| season.is_none_or(|s| row.raw.season == s))
        .max_by_key(|row| row.raw.game_date)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::features::DerivedFeatures;
    use crate::game_log::RawGameRow;

    fn row(
        player: &str,
        team: &str,
        season: &str,
        day: u32,
        pts: f64,
        b2b: bool,
        opp: &str,
    ) -> EnrichedGameRow {
        EnrichedGameRow {
            raw: RawGameRow {
                season_id: "22023".into(),
                player_id: 1,
                player_name: player.into(),
                team: team.into(),
                season: season.into(),
                game_id: format!("g{day}"),
                game_date: NaiveDate::from_ymd_opt(2023, 11, day).unwrap(),
                matchup: format!("XXX @ {opp}"),
                wl: None,
                min: 30.0,
                fgm: 0.0,
                fga: 0.0,
                fg_pct: None,
                fg3m: 0.0,
                fg3a: 0.0,
                fg3_pct: None,
                ftm: 0.0,
                fta: 0.0,
                ft_pct: None,
                oreb: 0.0,
                dreb: 0.0,
                reb: 0.0,
                ast: 0.0,
                stl: 0.0,
                blk: 0.0,
                tov: 0.0,
                pf: 0.0,
                pts,
                plus_minus: None,
            },
            features: DerivedFeatures {
                points_moving_avg: None,
                rebounds_moving_avg: None,
                assists_moving_avg: None,
                fg_pct_moving_avg: None,
                plus_minus_moving_avg: None,
                min_moving_avg: None,
                back_to_back: b2b,
                is_home: false,
                opponent: opp.into(),
                simplified_per: 0.0,
                off_eff: 0.0,
                def_reb_pct: 0.0,
            },
        }
    }

    fn sample() -> Vec<EnrichedGameRow> {
        vec![
            row("A", "Lakers", "2023-24", 1, 30.0, false, "BOS"),
            row("A", "Lakers", "2023-24", 2, 20.0, true, "MIA"),
            row("B", "Celtics", "2023-24", 1, 10.0, false, "LAL"),
            row("C", "Celtics", "2022-23", 3, 25.0, false, "BOS"),
        ]
    }

    #[test]
    fn summary_counts_distinct_values() {
        let s = DatasetSummary::of(&sample());
        assert_eq!(s.games, 4);
        assert_eq!(s.players, 3);
        assert_eq!(s.teams, 2);
        assert_eq!(s.seasons, ["2022-23", "2023-24"]);
    }

    #[test]
    fn filter_and_rank() {
        let rows = sample();
        let filter = RowFilter {
            team: Some("Celtics".into()),
            ..RowFilter::default()
        };
        let picked = filter.apply(&rows);
        assert_eq!(picked.len(), 2);
        let top = top_scorers(picked, DEFAULT_TOP_SCORERS);
        assert_eq!(top[0].player, "C");
        assert_eq!(top[1].mean_points, 10.0);

        let all = top_scorers(&rows, 1);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].player, "A");
        assert_eq!(all[0].mean_points, 25.0);
    }

    #[test]
    fn split_and_opponents() {
        let rows = sample();
        let split = back_to_back_split(&rows);
        assert_eq!(split.back_to_back_games, 1);
        assert_eq!(split.back_to_back_mean, Some(20.0));
        assert_eq!(split.rested_mean, Some(65.0 / 3.0));
        assert_eq!(opponents(&rows), ["BOS", "LAL", "MIA"]);
        assert_eq!(back_to_back_split(&Vec::new()).rested_mean, None);
    }

    #[test]
    fn latest_game_picks_max_date() {
        let rows = sample();
        assert_eq!(latest_game(&rows, "A", None).unwrap().raw.game_id, "g2");
        assert!(latest_game(&rows, "A", Some("2022-23")).is_none());
    }
}
