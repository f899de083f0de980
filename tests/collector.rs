use std::cell::Cell;
use std::collections::HashMap;

use chrono::NaiveDate;

use basketstat_iq::collector::{CollectOptions, collect};
use basketstat_iq::dataset::{self, AggregatedDataset};
use basketstat_iq::error::SourceError;
use basketstat_iq::features::FeatureConfig;
use basketstat_iq::game_log::{GameLogSource, PlayerRef, RawGameRow};
use basketstat_iq::roster::CollectionUnit;

#[derive(Default)]
struct FakeSource {
    players: HashMap<String, u64>,
    logs: HashMap<(u64, String), Vec<RawGameRow>>,
    down: Vec<(u64, String)>,
    directory_down: Cell<usize>,
    lookups: Cell<usize>,
}

impl FakeSource {
    fn player(mut self, name: &str, id: u64) -> Self {
        self.players.insert(name.to_string(), id);
        self
    }

    fn log(mut self, id: u64, season: &str, rows: Vec<RawGameRow>) -> Self {
        self.logs.insert((id, season.to_string()), rows);
        self
    }

    fn unavailable(mut self, id: u64, season: &str) -> Self {
        self.down.push((id, season.to_string()));
        self
    }

    /// The next `n` directory lookups fail with a transport error.
    fn directory_outage(self, n: usize) -> Self {
        self.directory_down.set(n);
        self
    }
}

impl GameLogSource for FakeSource {
    fn find_player(&self, full_name: &str) -> Result<PlayerRef, SourceError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.directory_down.get() > 0 {
            self.directory_down.set(self.directory_down.get() - 1);
            return Err(SourceError::Unavailable {
                player: full_name.to_string(),
                season: String::new(),
                reason: "connection reset".to_string(),
            });
        }
        self.players
            .get(full_name)
            .map(|id| PlayerRef {
                id: *id,
                name: full_name.to_string(),
            })
            .ok_or_else(|| SourceError::PlayerNotFound(full_name.to_string()))
    }

    fn fetch_game_log(
        &self,
        player: &PlayerRef,
        season: &str,
    ) -> Result<Vec<RawGameRow>, SourceError> {
        let key = (player.id, season.to_string());
        if self.down.contains(&key) {
            return Err(SourceError::Unavailable {
                player: player.name.clone(),
                season: season.to_string(),
                reason: "HTTP 503".to_string(),
            });
        }
        match self.logs.get(&key) {
            Some(rows) if !rows.is_empty() => Ok(rows.clone()),
            _ => Err(SourceError::EmptyResult {
                player: player.name.clone(),
                season: season.to_string(),
            }),
        }
    }
}

fn row(player_id: u64, day: u32, matchup: &str, pts: f64) -> RawGameRow {
    RawGameRow {
        season_id: "22019".to_string(),
        player_id,
        player_name: String::new(),
        team: String::new(),
        season: String::new(),
        game_id: format!("{player_id}-{day}"),
        game_date: NaiveDate::from_ymd_opt(2019, 12, day).unwrap(),
        matchup: matchup.to_string(),
        wl: None,
        min: 30.0,
        fgm: 8.0,
        fga: 16.0,
        fg_pct: Some(0.5),
        fg3m: 1.0,
        fg3a: 3.0,
        fg3_pct: Some(0.333),
        ftm: 3.0,
        fta: 4.0,
        ft_pct: Some(0.75),
        oreb: 1.0,
        dreb: 5.0,
        reb: 6.0,
        ast: 4.0,
        stl: 1.0,
        blk: 1.0,
        tov: 2.0,
        pf: 2.0,
        pts,
        plus_minus: Some(2.0),
    }
}

fn unit(team: &str, player: &str, season: &str) -> CollectionUnit {
    CollectionUnit {
        team: team.to_string(),
        player: player.to_string(),
        season: season.to_string(),
    }
}

fn source() -> FakeSource {
    FakeSource::default()
        .player("LeBron James", 2544)
        .player("Anthony Davis", 203076)
        .player("Jimmy Butler", 202710)
        .log(
            2544,
            "2019-20",
            vec![
                row(2544, 3, "LAL @ DEN", 20.0),
                row(2544, 1, "LAL vs. BOS", 25.0),
                row(2544, 2, "LAL @ LAC", 30.0),
            ],
        )
        .log(
            203076,
            "2019-20",
            vec![row(203076, 1, "LAL vs. BOS", 30.0), row(203076, 2, "LAL LAC", 22.0)],
        )
        .unavailable(202710, "2019-20")
}

fn units() -> Vec<CollectionUnit> {
    vec![
        unit("Los Angeles Lakers", "LeBron James", "2019-20"),
        unit("Los Angeles Lakers", "LeBron James", "2020-21"),
        unit("Los Angeles Lakers", "Anthony Davis", "2019-20"),
        unit("Miami Heat", "Jimmy Butler", "2019-20"),
        unit("Miami Heat", "Ghost Player", "2019-20"),
        unit("Cleveland Cavaliers", "LeBron James", "2019-20"),
    ]
}

fn no_snapshots() -> CollectOptions {
    CollectOptions {
        features: FeatureConfig::default(),
        snapshot_dir: None,
    }
}

#[test]
fn failing_units_are_skipped_and_counted() {
    let source = source();
    let run = collect(&source, &units(), &no_snapshots());

    assert_eq!(run.summary.units_total, 6);
    assert_eq!(run.summary.units_succeeded, 2);
    assert_eq!(run.summary.errors.len(), 4);
    assert_eq!(
        run.summary.units_total - run.summary.units_succeeded,
        run.summary.errors.len()
    );
    assert!(
        run.summary
            .errors
            .iter()
            .any(|e| e.starts_with("Anthony Davis (Los Angeles Lakers) - Season 2019-20:")),
        "{:?}",
        run.summary.errors
    );
    assert!(
        run.summary
            .errors
            .iter()
            .any(|e| e.starts_with("Ghost Player (Miami Heat) - Season 2019-20: player not resolved"))
    );
}

#[test]
fn unknown_player_is_reported_once_per_unit() {
    let source = source();
    let seasons = ["2019-20", "2020-21", "2021-22"];
    let ghost = seasons
        .iter()
        .map(|s| unit("Miami Heat", "Ghost Player", s))
        .collect::<Vec<_>>();
    let run = collect(&source, &ghost, &no_snapshots());

    assert_eq!(run.summary.units_succeeded, 0);
    assert_eq!(run.summary.errors.len(), 3);
    for (err, season) in run.summary.errors.iter().zip(seasons) {
        assert!(err.contains(&format!("Season {season}")), "{err}");
    }
    assert_eq!(source.lookups.get(), 1);
}

#[test]
fn directory_outage_is_not_cached() {
    let source = source().directory_outage(1);
    let twice = [
        unit("Los Angeles Lakers", "LeBron James", "2019-20"),
        unit("Cleveland Cavaliers", "LeBron James", "2019-20"),
    ];
    let run = collect(&source, &twice, &no_snapshots());

    assert_eq!(source.lookups.get(), 2);
    assert_eq!(run.summary.units_succeeded, 1);
    assert_eq!(run.summary.errors.len(), 1);
    assert!(run.summary.errors[0].starts_with("LeBron James (Los Angeles Lakers)"));
    assert!(run.summary.errors[0].contains("connection reset"));
    assert!(
        run.dataset
            .rows()
            .iter()
            .all(|r| r.raw.team == "Cleveland Cavaliers")
    );
}

#[test]
fn row_count_is_the_sum_of_kept_units() {
    let source = source();
    let run = collect(&source, &units(), &no_snapshots());
    assert_eq!(run.summary.rows, 6);
    assert_eq!(run.dataset.len(), 6);

    let teams = run
        .dataset
        .rows()
        .iter()
        .map(|r| r.raw.team.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        teams,
        [
            "Los Angeles Lakers",
            "Los Angeles Lakers",
            "Los Angeles Lakers",
            "Cleveland Cavaliers",
            "Cleveland Cavaliers",
            "Cleveland Cavaliers",
        ]
    );
    for row in run.dataset.rows() {
        assert_eq!(row.raw.player_name, "LeBron James");
        assert_eq!(row.raw.season, "2019-20");
    }
    // Within a unit the rows are in date order.
    let first_unit = &run.dataset.rows()[..3];
    assert_eq!(first_unit[0].features.opponent, "BOS");
    assert_eq!(first_unit[2].features.points_moving_avg, Some(25.0));
}

#[test]
fn player_lookups_are_cached_across_units() {
    let source = source();
    collect(&source, &units(), &no_snapshots());
    // LeBron, Davis, Butler and the unknown name; repeats hit the cache.
    assert_eq!(source.lookups.get(), 4);
}

#[test]
fn snapshots_land_per_unit_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = source();
    let opts = CollectOptions {
        features: FeatureConfig::default(),
        snapshot_dir: Some(dir.path().to_path_buf()),
    };
    let run = collect(&source, &units()[..1], &opts);
    assert_eq!(run.summary.units_succeeded, 1);

    let snapshot = dataset::unit_snapshot_path(dir.path(), "LeBron James", "2019-20");
    assert!(snapshot.ends_with("temp/LeBron_James_2019-20.csv"));
    let back = AggregatedDataset::read_csv(&snapshot).unwrap();
    assert_eq!(back.rows(), run.dataset.rows());
}

#[test]
fn nothing_collected_gives_an_empty_dataset() {
    let source = FakeSource::default();
    let run = collect(&source, &units(), &no_snapshots());
    assert!(run.dataset.is_empty());
    assert_eq!(run.summary.units_succeeded, 0);
    // Every unit is accounted for, including the repeats of unresolved names.
    assert_eq!(run.summary.errors.len(), 6);
}
