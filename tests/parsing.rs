use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use basketstat_iq::features::derive_features;
use basketstat_iq::game_log::{PlayerRef, parse_game_log_json, parse_player_directory_json};
use basketstat_iq::nba_stats::find_in_directory;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn lebron() -> PlayerRef {
    PlayerRef {
        id: 2544,
        name: "LeBron James".to_string(),
    }
}

#[test]
fn parses_playergamelog_fixture() {
    let raw = read_fixture("playergamelog.json");
    let rows = parse_game_log_json(&raw, &lebron()).expect("fixture should parse");
    assert_eq!(rows.len(), 3);

    let newest = &rows[0];
    assert_eq!(newest.game_id, "0021900030");
    assert_eq!(newest.game_date, NaiveDate::from_ymd_opt(2019, 10, 25).unwrap());
    assert_eq!(newest.matchup, "LAL vs. UTA");
    assert_eq!(newest.wl.as_deref(), Some("W"));
    assert_eq!(newest.pts, 28.0);
    assert_eq!(newest.player_id, 2544);
    assert_eq!(newest.player_name, "LeBron James");
    assert_eq!(newest.season_id, "22019");

    let clock_minutes = &rows[1];
    assert_eq!(clock_minutes.min, 36.5);
    assert_eq!(clock_minutes.wl, None);
    assert_eq!(clock_minutes.plus_minus, None);

    assert_eq!(rows[2].fg_pct, None);
    assert_eq!(rows[2].fg3_pct, Some(0.0));
}

fn game_log_payload(rows: &[&str]) -> String {
    format!(
        r#"{{"resultSets": [{{
            "name": "PlayerGameLog",
            "headers": ["SEASON_ID", "Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "PTS"],
            "rowSet": [{}]
        }}]}}"#,
        rows.join(", ")
    )
}

#[test]
fn bad_row_fails_the_whole_payload() {
    let raw = game_log_payload(&[
        r#"["22019", 2544, "0021900002", "OCT 22, 2019", "LAL vs. BOS", 17]"#,
        r#"["22019", 2544, "0021900014", "22/10/2019", "LAL @ LAC", 18]"#,
        r#"["22019", 2544, "0021900030", "OCT 25, 2019", "LAL vs. UTA", 28]"#,
    ]);
    let err = parse_game_log_json(&raw, &lebron()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("0021900014"), "{msg}");
    assert!(msg.contains("22/10/2019"), "{msg}");

    let no_matchup = game_log_payload(&[r#"["22019", 2544, "0021900002", "OCT 22, 2019", null, 17]"#]);
    assert!(parse_game_log_json(&no_matchup, &lebron()).is_err());

    let no_date = game_log_payload(&[r#"["22019", 2544, "0021900002", null, "LAL vs. BOS", 17]"#]);
    assert!(parse_game_log_json(&no_date, &lebron()).is_err());
}

#[test]
fn parsed_log_feeds_the_pipeline() {
    let raw = read_fixture("playergamelog.json");
    let rows = parse_game_log_json(&raw, &lebron()).expect("fixture should parse");
    let out = derive_features(rows).expect("derivation should succeed");

    let ids = out.iter().map(|r| r.raw.game_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["0021900002", "0021900014", "0021900030"]);

    let f = out.iter().map(|r| &r.features).collect::<Vec<_>>();
    assert_eq!(
        f.iter().map(|x| x.back_to_back).collect::<Vec<_>>(),
        [false, true, false]
    );
    assert_eq!(
        f.iter().map(|x| x.is_home).collect::<Vec<_>>(),
        [true, false, true]
    );
    assert_eq!(f[1].opponent, "LAC");
    assert_eq!(f[0].points_moving_avg, Some(17.0));
    assert_eq!(f[1].points_moving_avg, Some(17.5));
    assert_eq!(f[2].points_moving_avg, Some(21.0));

    // Null cells are skipped by the partial window, not counted as zero.
    assert_eq!(f[0].fg_pct_moving_avg, None);
    assert_eq!(f[1].fg_pct_moving_avg, Some(0.368));
    assert_eq!(f[1].plus_minus_moving_avg, Some(-6.0));
    assert_eq!(f[2].plus_minus_moving_avg, Some(1.5));

    // No rebounds at all: the ratio falls back to zero.
    assert_eq!(f[0].def_reb_pct, 0.0);
    assert_eq!(f[1].def_reb_pct, 0.9);
}

#[test]
fn parses_commonallplayers_fixture() {
    let raw = read_fixture("commonallplayers.json");
    let directory = parse_player_directory_json(&raw).expect("fixture should parse");
    assert_eq!(directory.len(), 4, "entry without an id is dropped");

    let find = |name| find_in_directory(&directory, name).map(|p| p.id);
    assert_eq!(find("LeBron James"), Some(2544));
    assert_eq!(find("Nikola Jokic"), Some(203999));
    assert_eq!(find("PJ Tucker"), Some(200782));
    assert_eq!(find("Stephen Curry"), None);
}
