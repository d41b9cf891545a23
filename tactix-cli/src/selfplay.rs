//! Selfplay command - engine vs engine games
//!
//! Plays a series of tic-tac-toe games where both sides share one engine
//! configuration. Each move runs the search on a worker thread while this
//! thread enforces the wall-clock budget through the termination predicate;
//! a decided root wakes the waiting side early.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactix_core::{simulate_prefix, GameOutcome, GameState, Move, MoveSequence, Player};
use tactix_mcts::{Mcst, MctsConfig, Node, NodePool, SearchError, TerminalType, WinSelection};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct SelfplayArgs {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    pub games: u32,

    /// Wall-clock budget per move in milliseconds
    #[arg(long, default_value = "500")]
    pub think_ms: u64,

    /// Node pool capacity per evaluation
    #[arg(long, default_value = "8192")]
    pub capacity: usize,

    /// Pick the root move by visit count instead of UCT ordering
    #[arg(long)]
    pub most_simulated: bool,

    /// Base random seed; game k runs with seed + k
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Write per-move decision-tree dumps into this directory
    #[arg(long, value_name = "DIR")]
    pub dump_trees: Option<PathBuf>,
}

/// Result of a single game, scored for the first mover.
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: u32,
    outcome: GameOutcome,
    moves: u32,
    simulations: u64,
}

/// Aggregated selfplay results
#[derive(Clone, Debug)]
struct SelfplayResults {
    games: Vec<GameRecord>,
    wins: u32,
    losses: u32,
    draws: u32,
    total_moves: u64,
    total_simulations: u64,
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

/// Run selfplay:
/// 1. Build the engine configuration
/// 2. Play all games
/// 3. Report results
pub fn run(args: SelfplayArgs) -> Result<()> {
    let config = MctsConfig::with_capacity(args.capacity).with_win_selection(
        if args.most_simulated {
            WinSelection::MostSimulated
        } else {
            WinSelection::HighestUct
        },
    );

    if let Some(dir) = &args.dump_trees {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create dump directory {}", dir.display()))?;
    }

    tracing::info!(
        "Starting selfplay: {} games, {}ms per move, {} node slots",
        args.games,
        args.think_ms,
        args.capacity
    );

    let results = play_games(&args, &config)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// GAME LOOP
// ============================================================================

/// Play all games, one shared node pool across them.
fn play_games(args: &SelfplayArgs, config: &MctsConfig) -> Result<SelfplayResults> {
    let mut pool = NodePool::new(config.arena_capacity);
    let mut games = Vec::with_capacity(args.games as usize);

    let bar = ProgressBar::new(args.games as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} games")
            .context("invalid progress template")?,
    );

    for game_number in 1..=args.games {
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(game_number as u64));
        let record = play_single_game(game_number, args, config, &mut pool, &mut rng)?;

        tracing::info!(
            "Game {}: {:?} for the first mover ({} moves, {} simulations)",
            record.game_number,
            record.outcome,
            record.moves,
            record.simulations
        );

        games.push(record);
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok(compute_statistics(games))
}

/// Play one game to completion, both sides sharing the engine.
fn play_single_game(
    game_number: u32,
    args: &SelfplayArgs,
    config: &MctsConfig,
    pool: &mut NodePool,
    rng: &mut ChaCha8Rng,
) -> Result<GameRecord> {
    let first_mover = Player::Circle;
    let mut state = GameState::new(first_mover);
    let mut moves = 0u32;
    let mut simulations = 0u64;

    while !state.is_over() {
        let mut mcst = Mcst::new(config.clone());
        let budget = Duration::from_millis(args.think_ms);
        let (selected, sims) = evaluate_move(&mut mcst, &state, budget, pool, rng)?;
        simulations += sims as u64;

        if let Some(dir) = &args.dump_trees {
            if let Some(root) = mcst.root() {
                let path = dir.join(format!("game{}-move{}.tree", game_number, moves));
                let file = File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                pool.write_subtree(root, &mut BufWriter::new(file))?;
            }
        }

        if !selected.is_valid() {
            break;
        }
        state = state.apply_move(selected);
        moves += 1;

        tracing::debug!(game = game_number, %selected, simulations = sims, "played move");
    }

    Ok(GameRecord {
        game_number,
        outcome: state.outcome_for(first_mover),
        moves,
        simulations,
    })
}

/// Run one evaluation under a wall-clock budget.
///
/// The search runs on a worker thread; this thread flips the stop flag when
/// the budget expires, and the worker flips the wake flag when the root is
/// decided before that.
fn evaluate_move(
    mcst: &mut Mcst,
    state: &GameState,
    budget: Duration,
    pool: &mut NodePool,
    rng: &mut ChaCha8Rng,
) -> Result<(Move, u32)> {
    let stop = AtomicBool::new(false);
    let woke = AtomicBool::new(false);

    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let position = *state;
            // The first iteration always runs; the final pick needs at
            // least one expanded child even on a zero budget.
            let mut started = false;
            let terminate = |found_perfect_move: bool| {
                if found_perfect_move {
                    woke.store(true, Ordering::Relaxed);
                    return true;
                }
                if !started {
                    started = true;
                    return false;
                }
                stop.load(Ordering::Relaxed)
            };
            let simulate = |prefix: &MoveSequence, node: &mut Node, rng: &mut ChaCha8Rng| {
                apply_playouts(&position, prefix, node, rng);
            };

            let selected = mcst.evaluate(state.legal_moves(), terminate, simulate, pool, rng)?;
            Ok::<_, SearchError>((selected, mcst.simulations_ran(pool)))
        });

        let deadline = Instant::now() + budget;
        while Instant::now() < deadline
            && !woke.load(Ordering::Relaxed)
            && !worker.is_finished()
        {
            thread::sleep(Duration::from_millis(1));
        }
        stop.store(true, Ordering::Relaxed);

        worker.join()
    });

    let (selected, sims) = outcome
        .map_err(|_| anyhow::anyhow!("search worker panicked"))?
        .context("search failed")?;
    Ok((selected, sims))
}

/// Run the playout batch for a selected leaf and write the result into it.
fn apply_playouts(
    position: &GameState,
    prefix: &MoveSequence,
    node: &mut Node,
    rng: &mut ChaCha8Rng,
) {
    let stats = simulate_prefix(position, prefix, rng);
    node.value += stats.value;
    node.num_simulations += stats.playouts;
    if let Some(outcome) = stats.decided {
        node.terminal_type = match outcome {
            GameOutcome::Win => TerminalType::Winning,
            GameOutcome::Loss => TerminalType::Losing,
            GameOutcome::Draw => TerminalType::Neutral,
            GameOutcome::Ongoing => unreachable!("decided playouts report a finished game"),
        };
    }
}

// ============================================================================
// STATISTICS AND REPORTING
// ============================================================================

/// Aggregate per-game records, scored for the first mover.
fn compute_statistics(games: Vec<GameRecord>) -> SelfplayResults {
    let wins = games
        .iter()
        .filter(|g| g.outcome == GameOutcome::Win)
        .count() as u32;
    let losses = games
        .iter()
        .filter(|g| g.outcome == GameOutcome::Loss)
        .count() as u32;
    let draws = games
        .iter()
        .filter(|g| g.outcome == GameOutcome::Draw)
        .count() as u32;

    let total_moves: u64 = games.iter().map(|g| g.moves as u64).sum();
    let total_simulations: u64 = games.iter().map(|g| g.simulations).sum();

    SelfplayResults {
        games,
        wins,
        losses,
        draws,
        total_moves,
        total_simulations,
    }
}

fn report_results(results: &SelfplayResults, args: &SelfplayArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

/// Print results as JSON
fn print_json_results(results: &SelfplayResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: u32,
        outcome: String,
        moves: u32,
        simulations: u64,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        wins: u32,
        losses: u32,
        draws: u32,
        total_simulations: u64,
        avg_simulations_per_move: f64,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        wins: results.wins,
        losses: results.losses,
        draws: results.draws,
        total_simulations: results.total_simulations,
        avg_simulations_per_move: if results.total_moves > 0 {
            results.total_simulations as f64 / results.total_moves as f64
        } else {
            0.0
        },
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                outcome: format!("{:?}", g.outcome),
                moves: g.moves,
                simulations: g.simulations,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &SelfplayResults) {
    let total = results.games.len();

    println!("\n=== Selfplay Results ===");
    println!("Total games: {}", total);
    println!("Wins:   {}", results.wins);
    println!("Losses: {}", results.losses);
    println!("Draws:  {}", results.draws);
    println!(
        "Avg simulations per move: {:.1}",
        if results.total_moves > 0 {
            results.total_simulations as f64 / results.total_moves as f64
        } else {
            0.0
        }
    );
}

// ============================================================================
// TESTS
// ============================================================================
