use anyhow::{Context, Result, anyhow};
use tracing::info;

use basketstat_iq::collector::{self, CollectOptions};
use basketstat_iq::config::AppConfig;
use basketstat_iq::dataset;
use basketstat_iq::logging;
use basketstat_iq::nba_stats::NbaStatsClient;
use basketstat_iq::rate_limit::RequestPacer;
use basketstat_iq::roster::Roster;
use basketstat_iq::store;

fn main() -> Result<()> {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::load();
    cfg.apply_args(&args);

    let mut roster = match cfg.roster_path.as_deref() {
        Some(path) => Roster::load(path)?,
        None => Roster::builtin()?,
    };
    if let Some(seasons) = cfg.seasons.clone() {
        roster = roster.with_seasons(seasons)?;
    }
    let units = roster.units();
    let directory_season = roster
        .seasons
        .last()
        .cloned()
        .ok_or_else(|| anyhow!("roster has no seasons"))?;

    let pacer = RequestPacer::new(cfg.request_interval);
    info!(
        units = units.len(),
        interval_ms = pacer.interval().as_millis() as u64,
        "starting collection"
    );
    let source = NbaStatsClient::new(pacer, cfg.http_cache, &directory_season)?;

    let mut db = match cfg.sqlite_path.as_deref() {
        Some(path) => {
            let conn = store::open_db(path)?;
            let run_id = store::start_run(&conn, units.len())?;
            Some((conn, run_id))
        }
        None => None,
    };

    let opts = CollectOptions {
        features: cfg.features,
        snapshot_dir: Some(cfg.data_dir.clone()),
    };
    let run = collector::collect(&source, &units, &opts);
    let summary = &run.summary;

    let combined = dataset::combined_path(&cfg.data_dir);
    if run.dataset.is_empty() {
        println!("No data collected");
    } else {
        run.dataset
            .write_csv(&combined)
            .with_context(|| format!("write {}", combined.display()))?;
    }

    if let Some((conn, run_id)) = db.as_mut() {
        let written = if run.dataset.is_empty() {
            0
        } else {
            store::replace_rows(conn, run.dataset.rows())?
        };
        store::finish_run(
            conn,
            *run_id,
            summary.units_succeeded,
            written,
            &summary.errors,
        )?;
    }

    println!("Collection complete");
    if !run.dataset.is_empty() {
        println!("Dataset: {}", combined.display());
    }
    if let Some(path) = cfg.sqlite_path.as_deref() {
        println!("DB: {}", path.display());
    }
    println!("Seasons: {:?}", roster.seasons);
    println!(
        "Units: {}/{}",
        summary.units_succeeded, summary.units_total
    );
    println!("Rows: {}", summary.rows);
    if !summary.errors.is_empty() {
        println!("errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(10) {
            println!("   - {err}");
        }
    }

    Ok(())
}
