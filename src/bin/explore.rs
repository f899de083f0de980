use std::path::PathBuf;

use anyhow::Result;

use basketstat_iq::config::{AppConfig, arg_value};
use basketstat_iq::dataset::{self, AggregatedDataset};
use basketstat_iq::explore::{
    DEFAULT_TOP_SCORERS, DatasetSummary, RowFilter, back_to_back_split, opponents, top_scorers,
};
use basketstat_iq::export::export_workbook;
use basketstat_iq::logging;

fn main() -> Result<()> {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::load();
    cfg.apply_args(&args);

    let path = arg_value(&args, "--dataset")
        .map(PathBuf::from)
        .unwrap_or_else(|| dataset::combined_path(&cfg.data_dir));
    let data = AggregatedDataset::read_csv(&path)?;

    let filter = RowFilter {
        team: arg_value(&args, "--team"),
        player: arg_value(&args, "--player"),
        season: arg_value(&args, "--season"),
    };
    let top_n = arg_value(&args, "--top")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP_SCORERS);

    let all = DatasetSummary::of(data.rows());
    let picked = filter.apply(data.rows());

    println!("Dataset: {}", path.display());
    println!(
        "Games: {}  Players: {}  Teams: {}",
        all.games, all.players, all.teams
    );
    println!("Seasons: {}", all.seasons.join(", "));
    if filter != RowFilter::default() {
        println!("Filtered games: {}", picked.len());
    }

    println!("Top scorers:");
    for (rank, line) in top_scorers(picked.iter().copied(), top_n).iter().enumerate() {
        println!(
            "{:>3}. {:<28} {:>6.2} pts ({} games)",
            rank + 1,
            line.player,
            line.mean_points,
            line.games
        );
    }

    let split = back_to_back_split(picked.iter().copied());
    println!(
        "Back-to-back: {} games, {} pts avg",
        split.back_to_back_games,
        fmt_mean(split.back_to_back_mean)
    );
    println!(
        "Rested:       {} games, {} pts avg",
        split.rested_games,
        fmt_mean(split.rested_mean)
    );
    println!("Opponents: {}", opponents(picked.iter().copied()).join(" "));

    if let Some(xlsx) = arg_value(&args, "--xlsx") {
        let rows = picked.into_iter().cloned().collect::<Vec<_>>();
        let report = export_workbook(&rows, PathBuf::from(&xlsx).as_path())?;
        println!("Workbook: {xlsx} ({} games)", report.games);
    }

    Ok(())
}

fn fmt_mean(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "n/a".to_string())
}
