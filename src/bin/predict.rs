use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};

use basketstat_iq::config::{AppConfig, arg_value, has_flag};
use basketstat_iq::dataset::{self, AggregatedDataset};
use basketstat_iq::error::InferenceError;
use basketstat_iq::explore::latest_game;
use basketstat_iq::inference::{FEATURE_NAMES, FeatureInput, Predictor};
use basketstat_iq::logging;

fn main() -> ExitCode {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::load();
    cfg.apply_args(&args);

    let predictor = match Predictor::load(&cfg.model_path, &cfg.encoder_path) {
        Ok(predictor) => predictor,
        Err(err @ InferenceError::ArtifactNotFound { .. }) => {
            eprintln!("{err}");
            eprintln!("Train the model first, or point --model / --encoder at the saved artifacts.");
            return ExitCode::from(2);
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cfg, &args, &predictor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: &AppConfig, args: &[String], predictor: &Predictor) -> Result<()> {
    if has_flag(args, "--list-opponents") {
        for opponent in predictor.known_opponents() {
            println!("{opponent}");
        }
        return Ok(());
    }

    let input = if has_flag(args, "--from-dataset") {
        input_from_dataset(cfg, args)?
    } else {
        input_from_flags(args)?
    };

    let vector = predictor.feature_vector(&input)?;
    let points = predictor.predict(&input)?;

    println!("Opponent: {} ({})", input.opponent, if input.is_home { "home" } else { "away" });
    for (name, value) in FEATURE_NAMES.iter().zip(vector.iter()) {
        println!("  {name:<22} {value}");
    }
    println!("Predicted points: {points:.2}");
    Ok(())
}

fn input_from_flags(args: &[String]) -> Result<FeatureInput> {
    let opponent = arg_value(args, "--opponent").ok_or_else(|| anyhow!("--opponent is required"))?;
    let mut input = FeatureInput {
        opponent: opponent.to_ascii_uppercase(),
        is_home: has_flag(args, "--home"),
        back_to_back: has_flag(args, "--b2b"),
        ..FeatureInput::default()
    };
    let fields: [(&str, &mut f64); 8] = [
        ("--min-avg", &mut input.min_moving_avg),
        ("--pts-avg", &mut input.points_moving_avg),
        ("--reb-avg", &mut input.rebounds_moving_avg),
        ("--ast-avg", &mut input.assists_moving_avg),
        ("--fg-pct-avg", &mut input.fg_pct_moving_avg),
        ("--pm-avg", &mut input.plus_minus_moving_avg),
        ("--off-eff", &mut input.off_eff),
        ("--dreb-pct", &mut input.def_reb_pct),
    ];
    for (flag, slot) in fields {
        if let Some(raw) = arg_value(args, flag) {
            *slot = raw
                .parse::<f64>()
                .with_context(|| format!("{flag} expects a number, got {raw:?}"))?;
        }
    }
    Ok(input)
}

/// Uses the player's latest collected game as the form input.
fn input_from_dataset(cfg: &AppConfig, args: &[String]) -> Result<FeatureInput> {
    let player = arg_value(args, "--player").ok_or_else(|| anyhow!("--player is required"))?;
    let season = arg_value(args, "--season");
    let path = dataset::combined_path(&cfg.data_dir);
    let data = AggregatedDataset::read_csv(&path)?;
    let row = latest_game(data.rows(), &player, season.as_deref())
        .ok_or_else(|| anyhow!("no games for {player} in {}", path.display()))?;
    let mut input = FeatureInput::from_enriched(row);
    if let Some(opponent) = arg_value(args, "--opponent") {
        input.opponent = opponent.to_ascii_uppercase();
    }
    if has_flag(args, "--home") {
        input.is_home = true;
    }
    if has_flag(args, "--b2b") {
        input.back_to_back = true;
    }
    Ok(input)
}
