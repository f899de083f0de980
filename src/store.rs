use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::features::EnrichedGameRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRun {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub units_total: usize,
    pub units_succeeded: usize,
    pub rows_written: usize,
    pub errors: Vec<String>,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    drop_stale_game_rows(conn)?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS game_rows (
            row_idx INTEGER PRIMARY KEY,
            season_id TEXT NOT NULL,
            player_id INTEGER NOT NULL,
            player_name TEXT NOT NULL,
            team TEXT NOT NULL,
            season TEXT NOT NULL,
            game_id TEXT NOT NULL,
            game_date TEXT NOT NULL,
            matchup TEXT NOT NULL,
            wl TEXT NULL,
            min REAL NOT NULL,
            fgm REAL NOT NULL,
            fga REAL NOT NULL,
            fg_pct REAL NULL,
            fg3m REAL NOT NULL,
            fg3a REAL NOT NULL,
            fg3_pct REAL NULL,
            ftm REAL NOT NULL,
            fta REAL NOT NULL,
            ft_pct REAL NULL,
            oreb REAL NOT NULL,
            dreb REAL NOT NULL,
            reb REAL NOT NULL,
            ast REAL NOT NULL,
            stl REAL NOT NULL,
            blk REAL NOT NULL,
            tov REAL NOT NULL,
            pf REAL NOT NULL,
            pts REAL NOT NULL,
            plus_minus REAL NULL,
            points_moving_avg REAL NULL,
            rebounds_moving_avg REAL NULL,
            assists_moving_avg REAL NULL,
            fg_pct_moving_avg REAL NULL,
            plus_minus_moving_avg REAL NULL,
            min_moving_avg REAL NULL,
            back_to_back INTEGER NOT NULL,
            is_home INTEGER NOT NULL,
            opponent TEXT NOT NULL,
            simplified_per REAL NOT NULL,
            off_eff REAL NOT NULL,
            def_reb_pct REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_game_rows_player ON game_rows(player_name);
        CREATE INDEX IF NOT EXISTS idx_game_rows_season ON game_rows(season);
        CREATE INDEX IF NOT EXISTS idx_game_rows_opponent ON game_rows(opponent);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            units_total INTEGER NOT NULL,
            units_succeeded INTEGER NOT NULL,
            rows_written INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// `game_rows` is rewritten on every run, so a table from an older layout
/// is dropped rather than migrated.
fn drop_stale_game_rows(conn: &Connection) -> Result<()> {
    let has_table = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'game_rows'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .context("inspect sqlite schema")?
        > 0;
    if !has_table {
        return Ok(());
    }
    let has_pf = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('game_rows') WHERE name = 'pf'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .context("inspect game_rows columns")?
        > 0;
    if !has_pf {
        conn.execute_batch("DROP TABLE game_rows;")
            .context("drop stale game_rows")?;
    }
    Ok(())
}

pub fn start_run(conn: &Connection, units_total: usize) -> Result<i64> {
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, units_total, units_succeeded, rows_written, errors_json)
         VALUES (?1, NULL, ?2, 0, 0, '[]')",
        params![Utc::now().to_rfc3339(), units_total as i64],
    )
    .context("insert ingest run")?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(
    conn: &Connection,
    run_id: i64,
    units_succeeded: usize,
    rows_written: usize,
    errors: &[String],
) -> Result<()> {
    let errors_json = serde_json::to_string(errors).context("serialize ingest errors")?;
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, units_succeeded = ?2, rows_written = ?3, errors_json = ?4
         WHERE run_id = ?5",
        params![
            Utc::now().to_rfc3339(),
            units_succeeded as i64,
            rows_written as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;
    Ok(())
}

pub fn load_run(conn: &Connection, run_id: i64) -> Result<Option<IngestRun>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, started_at, finished_at, units_total, units_succeeded, rows_written, errors_json
             FROM ingest_runs WHERE run_id = ?1",
        )
        .context("prepare ingest run query")?;
    let mut rows = stmt
        .query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .context("query ingest run")?;
    let Some(row) = rows.next() else {
        return Ok(None);
    };
    let (run_id, started_at, finished_at, total, succeeded, written, errors_json) =
        row.context("decode ingest run")?;
    Ok(Some(IngestRun {
        run_id,
        started_at,
        finished_at,
        units_total: total.max(0) as usize,
        units_succeeded: succeeded.max(0) as usize,
        rows_written: written.max(0) as usize,
        errors: serde_json::from_str(&errors_json).unwrap_or_default(),
    }))
}

/// Replaces the whole table with `rows` in one transaction.
pub fn replace_rows(conn: &mut Connection, rows: &[EnrichedGameRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin dataset transaction")?;
    tx.execute("DELETE FROM game_rows", [])
        .context("clear game rows")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO game_rows (
                    row_idx, season_id, player_id, player_name, team, season,
                    game_id, game_date, matchup, wl,
                    min, fgm, fga, fg_pct, fg3m, fg3a, fg3_pct, ftm, fta, ft_pct,
                    oreb, dreb, reb, ast, stl, blk, tov, pf, pts, plus_minus,
                    points_moving_avg, rebounds_moving_avg, assists_moving_avg,
                    fg_pct_moving_avg, plus_minus_moving_avg, min_moving_avg,
                    back_to_back, is_home, opponent, simplified_per, off_eff, def_reb_pct
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9, ?10,
                    ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                    ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
                    ?31, ?32, ?33,
                    ?34, ?35, ?36,
                    ?37, ?38, ?39, ?40, ?41, ?42
                )
                "#,
            )
            .context("prepare game row insert")?;
        for (idx, row) in rows.iter().enumerate() {
            let r = &row.raw;
            let f = &row.features;
            stmt.execute(params![
                idx as i64,
                r.season_id,
                r.player_id as i64,
                r.player_name,
                r.team,
                r.season,
                r.game_id,
                r.game_date.to_string(),
                r.matchup,
                r.wl,
                r.min,
                r.fgm,
                r.fga,
                r.fg_pct,
                r.fg3m,
                r.fg3a,
                r.fg3_pct,
                r.ftm,
                r.fta,
                r.ft_pct,
                r.oreb,
                r.dreb,
                r.reb,
                r.ast,
                r.stl,
                r.blk,
                r.tov,
                r.pf,
                r.pts,
                r.plus_minus,
                f.points_moving_avg,
                f.rebounds_moving_avg,
                f.assists_moving_avg,
                f.fg_pct_moving_avg,
                f.plus_minus_moving_avg,
                f.min_moving_avg,
                f.back_to_back,
                f.is_home,
                f.opponent,
                f.simplified_per,
                f.off_eff,
                f.def_reb_pct,
            ])
            .context("insert game row")?;
        }
    }
    tx.commit().context("commit dataset transaction")?;
    Ok(rows.len())
}

pub fn count_rows(conn: &Connection) -> Result<usize> {
    let n = conn
        .query_row("SELECT COUNT(*) FROM game_rows", [], |row| row.get::<_, i64>(0))
        .context("count game rows")?;
    Ok(n.max(0) as usize)
}
