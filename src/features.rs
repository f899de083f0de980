use chrono::NaiveDate;

use crate::error::FeatureError;
use crate::game_log::RawGameRow;

pub const DEFAULT_WINDOW: usize = 5;

const HOME_SEPARATOR: &str = " vs. ";
const AWAY_SEPARATOR: &str = " @ ";

/// How a trailing window behaves before it has seen `window` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    /// Mean of whatever is available; index 0 is the raw value.
    #[default]
    Partial,
    /// Missing until the window is full.
    Strict,
}

impl WindowPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "partial" => Some(Self::Partial),
            "strict" | "fixed" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureConfig {
    pub window: usize,
    pub policy: WindowPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            policy: WindowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub points_moving_avg: Option<f64>,
    pub rebounds_moving_avg: Option<f64>,
    pub assists_moving_avg: Option<f64>,
    pub fg_pct_moving_avg: Option<f64>,
    pub plus_minus_moving_avg: Option<f64>,
    pub min_moving_avg: Option<f64>,
    pub back_to_back: bool,
    pub is_home: bool,
    pub opponent: String,
    pub simplified_per: f64,
    pub off_eff: f64,
    pub def_reb_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedGameRow {
    pub raw: RawGameRow,
    pub features: DerivedFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub is_home: bool,
    pub opponent: String,
}

/// Splits `"LAL vs. BOS"` / `"LAL @ BOS"`. `None` when neither separator is
/// present or nothing follows it.
pub fn parse_matchup(raw: &str) -> Option<Matchup> {
    let (is_home, opponent) = if let Some((_, rest)) = raw.split_once(HOME_SEPARATOR) {
        (true, rest)
    } else if let Some((_, rest)) = raw.split_once(AWAY_SEPARATOR) {
        (false, rest)
    } else {
        return None;
    };
    let opponent = opponent.trim();
    if opponent.is_empty() {
        return None;
    }
    Some(Matchup {
        is_home,
        opponent: opponent.to_string(),
    })
}

pub fn safe_divide(numer: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        return 0.0;
    }
    let out = numer / denom;
    if out.is_finite() { out } else { 0.0 }
}

pub fn simplified_per(row: &RawGameRow) -> f64 {
    safe_divide(
        row.pts + row.reb + row.ast + row.stl + row.blk - row.tov,
        row.min,
    )
}

pub fn off_eff(row: &RawGameRow) -> f64 {
    safe_divide(row.pts, row.fga + 0.44 * row.fta + row.tov)
}

pub fn def_reb_pct(row: &RawGameRow) -> f64 {
    safe_divide(row.dreb, row.reb)
}

/// Stable ascending sort on game date; same-day rows keep fetch order.
pub fn sort_by_date(rows: &mut [RawGameRow]) {
    rows.sort_by_key(|row| row.game_date);
}

/// Trailing mean over `series[i + 1 - window ..= i]`.
///
/// Missing observations never count toward the window: `Partial` averages
/// the present ones, `Strict` reports the whole window as missing.
pub fn rolling_mean(
    series: &[Option<f64>],
    window: usize,
    policy: WindowPolicy,
) -> Vec<Option<f64>> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(series.len());
    for idx in 0..series.len() {
        let start = (idx + 1).saturating_sub(window);
        let slice = &series[start..=idx];
        let present = slice.iter().flatten().copied().collect::<Vec<_>>();
        let value = match policy {
            WindowPolicy::Strict if present.len() < window => None,
            _ if present.is_empty() => None,
            _ => Some(present.iter().sum::<f64>() / present.len() as f64),
        };
        out.push(value);
    }
    out
}

pub fn back_to_back(dates: &[NaiveDate]) -> Vec<bool> {
    let mut out = Vec::with_capacity(dates.len());
    for (idx, date) in dates.iter().enumerate() {
        let flag = idx > 0 && (*date - dates[idx - 1]).num_days() <= 1;
        out.push(flag);
    }
    out
}

pub fn derive_features(rows: Vec<RawGameRow>) -> Result<Vec<EnrichedGameRow>, FeatureError> {
    derive_features_with(rows, FeatureConfig::default())
}

/// Enriches one player's game sequence. The output has one row per input
/// row, in ascending date order.
pub fn derive_features_with(
    mut rows: Vec<RawGameRow>,
    cfg: FeatureConfig,
) -> Result<Vec<EnrichedGameRow>, FeatureError> {
    if rows.is_empty() {
        return Err(FeatureError::EmptySequence);
    }
    sort_by_date(&mut rows);

    let mut matchups = Vec::with_capacity(rows.len());
    for row in &rows {
        let matchup =
            parse_matchup(&row.matchup).ok_or_else(|| FeatureError::MalformedMatchup {
                game_id: row.game_id.clone(),
                matchup: row.matchup.clone(),
            })?;
        matchups.push(matchup);
    }

    let roll = |pick: fn(&RawGameRow) -> Option<f64>| {
        let series = rows.iter().map(pick).collect::<Vec<_>>();
        rolling_mean(&series, cfg.window, cfg.policy)
    };
    let points = roll(|r| Some(r.pts));
    let rebounds = roll(|r| Some(r.reb));
    let assists = roll(|r| Some(r.ast));
    let fg_pct = roll(|r| r.fg_pct);
    let plus_minus = roll(|r| r.plus_minus);
    let minutes = roll(|r| Some(r.min));

    let dates = rows.iter().map(|r| r.game_date).collect::<Vec<_>>();
    let b2b = back_to_back(&dates);

    let out = rows
        .into_iter()
        .zip(matchups)
        .enumerate()
        .map(|(idx, (raw, matchup))| {
            let features = DerivedFeatures {
                points_moving_avg: points[idx],
                rebounds_moving_avg: rebounds[idx],
                assists_moving_avg: assists[idx],
                fg_pct_moving_avg: fg_pct[idx],
                plus_minus_moving_avg: plus_minus[idx],
                min_moving_avg: minutes[idx],
                back_to_back: b2b[idx],
                is_home: matchup.is_home,
                opponent: matchup.opponent,
                simplified_per: simplified_per(&raw),
                off_eff: off_eff(&raw),
                def_reb_pct: def_reb_pct(&raw),
            };
            EnrichedGameRow { raw, features }
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vals(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    #[test]
    fn matchup_home_and_away() {
        assert_eq!(
            parse_matchup("LAL vs. BOS"),
            Some(Matchup {
                is_home: true,
                opponent: "BOS".into()
            })
        );
        assert_eq!(
            parse_matchup("LAL @ BOS"),
            Some(Matchup {
                is_home: false,
                opponent: "BOS".into()
            })
        );
        assert_eq!(parse_matchup("LAL BOS"), None);
        assert_eq!(parse_matchup("LAL @ "), None);
    }

    #[test]
    fn safe_divide_never_leaks_non_finite() {
        assert_eq!(safe_divide(3.0, 0.0), 0.0);
        assert_eq!(safe_divide(0.0, 0.0), 0.0);
        assert_eq!(safe_divide(f64::NAN, 2.0), 0.0);
        assert_eq!(safe_divide(f64::MAX, 1e-300), 0.0);
        assert_eq!(safe_divide(6.0, 3.0), 2.0);
    }

    #[test]
    fn partial_window_starts_at_raw_value() {
        let points = vals(&[10.0, 20.0, 15.0, 25.0, 30.0, 18.0]);
        let out = rolling_mean(&points, 5, WindowPolicy::Partial);
        assert_eq!(out[0], Some(10.0));
        assert_eq!(out[1], Some(15.0));
        assert_eq!(out[4], Some(20.0));
        assert!((out[5].unwrap() - 21.6).abs() < 1e-9);
    }

    #[test]
    fn strict_window_is_missing_until_full() {
        let points = vals(&[10.0, 20.0, 15.0, 25.0, 30.0, 18.0]);
        let out = rolling_mean(&points, 5, WindowPolicy::Strict);
        assert!(out[..4].iter().all(Option::is_none));
        assert_eq!(out[4], Some(20.0));
        assert!((out[5].unwrap() - 21.6).abs() < 1e-9);
    }

    #[test]
    fn missing_observations_are_skipped_or_poison_window() {
        let series = vec![Some(1.0), None, Some(3.0)];
        let partial = rolling_mean(&series, 2, WindowPolicy::Partial);
        assert_eq!(partial, vec![Some(1.0), Some(1.0), Some(3.0)]);
        let strict = rolling_mean(&series, 2, WindowPolicy::Strict);
        assert_eq!(strict, vec![None, None, None]);
    }

    #[test]
    fn back_to_back_uses_day_gap() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
        let flags = back_to_back(&[d(1, 1), d(1, 2), d(1, 4), d(1, 4), d(2, 1)]);
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn policy_parse() {
        assert_eq!(WindowPolicy::parse(" Strict "), Some(WindowPolicy::Strict));
        assert_eq!(WindowPolicy::parse("partial"), Some(WindowPolicy::Partial));
        assert_eq!(WindowPolicy::parse("ewm"), None);
    }
}
