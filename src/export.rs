use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::explore::{DEFAULT_TOP_SCORERS, DatasetSummary, back_to_back_split, top_scorers};
use crate::features::EnrichedGameRow;

pub struct ExportReport {
    pub games: usize,
    pub summary_rows: usize,
}

/// Writes a `Games` sheet with the dashboard columns and a `Summary` sheet
/// with the headline aggregates.
pub fn export_workbook(rows: &[EnrichedGameRow], path: &Path) -> Result<ExportReport> {
    let mut games_rows = vec![
        [
            "Date",
            "Player",
            "Team",
            "Season",
            "Matchup",
            "Opponent",
            "Home",
            "Back-to-back",
            "MIN",
            "PTS",
            "REB",
            "AST",
            "FG%",
            "+/-",
            "PTS (5g avg)",
            "PER (simplified)",
            "Off. eff.",
            "DREB%",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>(),
    ];
    for row in rows {
        games_rows.push(game_row(row));
    }

    let summary_rows = summary_rows(rows);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Games")?;
        write_rows(sheet, &games_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        games: games_rows.len().saturating_sub(1),
        summary_rows: summary_rows.len().saturating_sub(1),
    })
}

fn game_row(row: &EnrichedGameRow) -> Vec<String> {
    let r = &row.raw;
    let f = &row.features;
    vec![
        r.game_date.format("%Y-%m-%d").to_string(),
        r.player_name.clone(),
        r.team.clone(),
        r.season.clone(),
        r.matchup.clone(),
        f.opponent.clone(),
        yes_no(f.is_home),
        yes_no(f.back_to_back),
        fmt_num(r.min),
        fmt_num(r.pts),
        fmt_num(r.reb),
        fmt_num(r.ast),
        opt_to_string(r.fg_pct.map(fmt_num)),
        opt_to_string(r.plus_minus.map(fmt_num)),
        opt_to_string(f.points_moving_avg.map(fmt_num)),
        fmt_num(f.simplified_per),
        fmt_num(f.off_eff),
        fmt_num(f.def_reb_pct),
    ]
}

fn summary_rows(rows: &[EnrichedGameRow]) -> Vec<Vec<String>> {
    let summary = DatasetSummary::of(rows);
    let split = back_to_back_split(rows);
    let mut out = vec![
        vec!["Metric".to_string(), "Value".to_string()],
        vec!["Games".to_string(), summary.games.to_string()],
        vec!["Players".to_string(), summary.players.to_string()],
        vec!["Teams".to_string(), summary.teams.to_string()],
        vec!["Seasons".to_string(), summary.seasons.join(", ")],
        vec![
            "PTS on back-to-backs".to_string(),
            opt_to_string(split.back_to_back_mean.map(fmt_num)),
        ],
        vec![
            "PTS rested".to_string(),
            opt_to_string(split.rested_mean.map(fmt_num)),
        ],
    ];
    for (rank, line) in top_scorers(rows, DEFAULT_TOP_SCORERS).iter().enumerate() {
        out.push(vec![
            format!("Top scorer #{}: {}", rank + 1, line.player),
            fmt_num(line.mean_points),
        ]);
    }
    out
}

fn yes_no(v: bool) -> String {
    let label = if v { "yes" } else { "no" };
    label.to_string()
}

fn fmt_num(v: f64) -> String {
    let text = format!("{v:.3}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    // Values that round to zero keep no sign.
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
