use std::sync::Mutex;

use async_trait::async_trait;
use birdsparty_core::{
    find_connections, find_progression_symbols, grid::generate, Bet, Engine, EngineConfig,
    GameMode, GameState, Level, OutcomeQuery, OutcomeService, Phase, PreferredOutcome, RequestIds,
    ServiceError, StaticSettings, TriggerPolicy,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "birdsparty-cli", about = "Operator CLI for the Birds Party engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run complete resolution chains in-process and report the observed RTP
    Simulate {
        #[arg(long, default_value_t = 1000)]
        chains: u64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Chance the stand-in RNG service answers "win"
        #[arg(long, default_value_t = 0.5)]
        win_probability: f64,
        /// RTP reported by the stand-in settings service
        #[arg(long, default_value_t = 96.0)]
        rtp: f64,
        #[arg(long, default_value_t = 0.1)]
        bet: f64,
        #[arg(long, value_parser, env = "PROGRESSION_TRIGGER", default_value = "allow")]
        progression_trigger: TriggerPolicy,
        /// Write one row per chain to this CSV path
        #[arg(long)]
        csv: Option<String>,
    },
    /// Generate a grid and show its connections and progression symbols
    Grid {
        #[arg(long, default_value_t = 1)]
        level: u8,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long)]
        forbid_trigger: bool,
    },
}

/// Answers "win" with a fixed probability from its own seeded generator.
struct RandomOutcomes {
    rng: Mutex<StdRng>,
    win_probability: f64,
}

impl RandomOutcomes {
    fn new(seed: u64, win_probability: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            win_probability: win_probability.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl OutcomeService for RandomOutcomes {
    async fn preferred_outcome(&self, _: &OutcomeQuery) -> Result<PreferredOutcome, ServiceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ServiceError::new("rng", "generator lock poisoned"))?;
        Ok(if rng.gen_bool(self.win_probability) {
            PreferredOutcome::Win
        } else {
            PreferredOutcome::Loss
        })
    }
}

#[derive(Debug, Serialize)]
struct ChainRecord {
    chain: u64,
    level: u8,
    free_spin: bool,
    cost: f64,
    win: f64,
    cascades: u32,
    progression_calls: u32,
    bypassed_steps: u32,
    level_advanced: bool,
    free_spins_awarded: bool,
}

#[derive(Debug, Default)]
struct Summary {
    chains: u64,
    total_bet: f64,
    total_win: f64,
    level_advancements: u64,
    free_spin_triggers: u64,
    bypassed_steps: u64,
}

impl Summary {
    fn add(&mut self, record: &ChainRecord) {
        self.chains += 1;
        self.total_bet += record.cost;
        self.total_win += record.win;
        self.level_advancements += u64::from(record.level_advanced);
        self.free_spin_triggers += u64::from(record.free_spins_awarded);
        self.bypassed_steps += u64::from(record.bypassed_steps);
    }

    fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            self.total_win / self.total_bet * 100.0
        } else {
            0.0
        }
    }
}

async fn run_chain<O: OutcomeService>(
    engine: &Engine<StaticSettings, O>,
    ids: &RequestIds,
    state: GameState,
    chain: u64,
    rng: &mut StdRng,
) -> anyhow::Result<(GameState, ChainRecord)> {
    let started_in_base = state.game_mode == GameMode::Base;
    let spin = engine.spin(ids, state, rng).await?;
    let mut record = ChainRecord {
        chain,
        level: spin.state.current_level.map_or(0, Level::number),
        free_spin: spin.free_spin,
        cost: spin.total_cost,
        win: 0.0,
        cascades: 0,
        progression_calls: 0,
        bypassed_steps: 0,
        level_advanced: false,
        free_spins_awarded: false,
    };
    let mut state = spin.state;
    while state.phase() != Phase::Idle {
        state = match state.phase() {
            Phase::PendingProgression => {
                let out = engine.process_progression(ids, state, rng).await?;
                record.progression_calls += 1;
                record.bypassed_steps += u32::from(out.bypassed);
                record.level_advanced |= out.advancement.advanced;
                out.state
            }
            _ => {
                let out = engine.cascade(ids, state, rng).await?;
                record.cascades += 1;
                record.bypassed_steps += u32::from(out.bypassed);
                out.state
            }
        };
    }
    record.win = state.total_win;
    record.free_spins_awarded = started_in_base && state.game_mode == GameMode::FreeSpins;
    Ok((state, record))
}

#[allow(clippy::too_many_arguments)]
async fn simulate(
    chains: u64,
    seed: u64,
    win_probability: f64,
    rtp: f64,
    bet: f64,
    progression_trigger: TriggerPolicy,
    csv_path: Option<String>,
) -> anyhow::Result<Summary> {
    let engine = Engine::new(
        EngineConfig {
            progression_trigger,
        },
        StaticSettings(rtp),
        RandomOutcomes::new(seed.wrapping_add(1), win_probability),
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = match &csv_path {
        Some(path) => Some(csv::Writer::from_path(path)?),
        None => None,
    };

    let mut state = GameState {
        bet: Bet {
            amount: bet,
            multiplier: 0,
        },
        ..GameState::default()
    };
    let mut summary = Summary::default();
    for chain in 0..chains {
        let ids = RequestIds::new("simulator", "birdsparty", "sim-player", format!("bet-{chain}"));
        let (next, record) = run_chain(&engine, &ids, state, chain, &mut rng).await?;
        summary.add(&record);
        if let Some(w) = writer.as_mut() {
            w.serialize(&record)?;
        }
        state = next;
    }
    if let Some(mut w) = writer {
        w.flush()?;
    }
    Ok(summary)
}

fn print_grid(level: Level, seed: u64, forbid_trigger: bool) {
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = generate(level, forbid_trigger, &mut rng);
    println!("level {} ({}x{}), seed {}", level, level.grid_size(), level.grid_size(), seed);
    for row in grid.rows() {
        let cells: Vec<String> = row.iter().map(|s| format!("{:<12}", s.as_str())).collect();
        println!("  {}", cells.join(" "));
    }
    let connections = find_connections(&grid, level);
    if connections.is_empty() {
        println!("no connections");
    }
    for c in &connections {
        let cells: Vec<String> = c.positions.iter().map(|p| format!("({},{})", p.x, p.y)).collect();
        println!("{} x{} pays {:.2} at {}", c.symbol, c.count, c.payout, cells.join(" "));
    }
    for p in find_progression_symbols(&grid, level) {
        println!("{} at ({},{})", p.symbol, p.position.x, p.position.y);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            chains,
            seed,
            win_probability,
            rtp,
            bet,
            progression_trigger,
            csv,
        } => {
            let started = Utc::now();
            let summary = simulate(
                chains,
                seed,
                win_probability,
                rtp,
                bet,
                progression_trigger,
                csv.clone(),
            )
            .await?;
            println!("started:            {}", started.to_rfc3339());
            println!("chains:             {}", summary.chains);
            println!("total bet:          {:.2}", summary.total_bet);
            println!("total win:          {:.2}", summary.total_win);
            println!("observed rtp:       {:.2}%", summary.rtp());
            println!("level advancements: {}", summary.level_advancements);
            println!("free-spin triggers: {}", summary.free_spin_triggers);
            println!("bypassed losses:    {}", summary.bypassed_steps);
            if let Some(path) = csv {
                println!("Exported {} rows to {}", summary.chains, path);
            }
        }
        Commands::Grid {
            level,
            seed,
            forbid_trigger,
        } => {
            let level = Level::try_from(level).map_err(anyhow::Error::msg)?;
            print_grid(level, seed, forbid_trigger);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulation_is_reproducible() {
        let a = simulate(40, 3, 0.5, 96.0, 0.1, TriggerPolicy::Allow, None).await.unwrap();
        let b = simulate(40, 3, 0.5, 96.0, 0.1, TriggerPolicy::Allow, None).await.unwrap();
        assert_eq!(a.chains, 40);
        assert_eq!(a.total_win, b.total_win);
        assert_eq!(a.total_bet, b.total_bet);
        assert!(a.rtp() >= 0.0);
    }

    #[tokio::test]
    async fn rejects_unlisted_bet() {
        let err = simulate(1, 3, 0.5, 96.0, 0.25, TriggerPolicy::Allow, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid bet amount"));
    }

    #[tokio::test]
    async fn csv_has_one_row_per_chain() {
        let path = std::env::temp_dir().join(format!("birdsparty-sim-{}.csv", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        simulate(5, 9, 1.0, 96.0, 0.2, TriggerPolicy::FollowGameMode, Some(path_str))
            .await
            .unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 5);
        std::fs::remove_file(path).ok();
    }
}
