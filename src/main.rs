use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use hive_engine::hive::matches::{load_match, JsonDecoder, JsonEncoder, Match};
use hive_engine::hive::{Board, DEFAULT_MAX_MOVES};

#[derive(Parser)]
#[command(name = "hive-engine")]
#[command(about = "Hive rules engine: random self-play and match replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a match between two random players
    Play {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = DEFAULT_MAX_MOVES)]
        max_moves: usize,
        /// Write the match here once it is over
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Replay a saved match and report how it ended
    Replay { file: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play {
            seed,
            max_moves,
            save,
        } => play(seed, max_moves, save.as_deref()),
        Commands::Replay { file } => replay(&file),
    }
}

fn play(seed: u64, max_moves: usize, save: Option<&Path>) -> Result<()> {
    ensure!(max_moves > 0, "max moves must be positive");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut board = Board::with_max_moves(max_moves);
    let mut boards = Vec::new();
    let mut actions = Vec::new();
    while !board.is_finished() {
        let action = *board
            .actions()
            .choose(&mut rng)
            .context("board has no actions")?;
        debug!(
            move_number = board.move_number(),
            "{} plays {}",
            board.next_player(),
            action
        );
        let next = board.act(action);
        boards.push(board);
        actions.push(action);
        board = next;
    }
    info!(seed, "match over after {} actions: {}", actions.len(), board.finish_reason());

    let Some(path) = save else {
        return Ok(());
    };

    // scores are from the point of view of the player to move
    let mut scores = vec![0.0; actions.len() + 1];
    scores[actions.len()] = match board.winner() {
        Some(winner) if winner == board.next_player() => 1.0,
        Some(_) => -1.0,
        None => 0.0,
    };
    boards.push(board);
    let mut m = Match {
        boards,
        actions,
        scores,
        actions_labels: Vec::new(),
    };
    m.fill_action_labels_with_taken();

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut enc = JsonEncoder::new(BufWriter::new(file));
    m.encode(&mut enc)
        .with_context(|| format!("failed to write match to {}", path.display()))?;
    enc.into_inner().flush()?;
    info!("saved match to {}", path.display());
    Ok(())
}

fn replay(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let loaded = load_match(&mut JsonDecoder::new(BufReader::new(file)))
        .with_context(|| format!("failed to load match from {}", path.display()))?;
    info!(
        max_moves = loaded.max_moves,
        "replaying {} actions",
        loaded.actions.len()
    );

    let m = Match::replay(loaded);
    let board = m.final_board();
    if board.is_finished() {
        info!("{}", board.finish_reason());
    } else {
        info!(
            move_number = board.move_number(),
            "match stops before the end, {} to move",
            board.next_player()
        );
    }
    Ok(())
}
