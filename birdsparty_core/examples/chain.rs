use birdsparty_core::{
    Bet, Engine, EngineConfig, FixedOutcome, GameState, Phase, PreferredOutcome, RequestIds,
    SeedDeriver, StaticSettings,
};

fn print_grid(state: &GameState) {
    for row in state.grid.rows() {
        let cells: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
        println!("  {}", cells.join(" "));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(
        EngineConfig::default(),
        StaticSettings(96.0),
        FixedOutcome(PreferredOutcome::Win),
    );
    let ids = RequestIds::new("demo-client", "birdsparty", "demo-player", "bet-1");
    let deriver = SeedDeriver::new("example-server-seed");
    let mut rng = deriver.rng(&birdsparty_core::request_key(&ids, 0), 1);
    println!("server_seed_hash={}", deriver.secret_hash_hex());

    let state = GameState {
        bet: Bet {
            amount: 0.1,
            multiplier: 0,
        },
        ..GameState::default()
    };
    let spin = engine.spin(&ids, state, &mut rng).await?;
    println!(
        "spin: cost={} win={} connections={}",
        spin.total_cost,
        spin.state.total_win,
        spin.state.last_connections.len()
    );
    print_grid(&spin.state);

    let mut state = spin.state;
    loop {
        state = match state.phase() {
            Phase::Idle => break,
            Phase::PendingProgression => {
                let out = engine.process_progression(&ids, state, &mut rng).await?;
                println!(
                    "progression: removed={} progress={} advanced={}",
                    out.processed.len(),
                    out.state.stage_progress,
                    out.advancement.advanced
                );
                out.state
            }
            Phase::PendingCascade => {
                let out = engine.cascade(&ids, state, &mut rng).await?;
                println!(
                    "cascade {}: step_win={} connections={}",
                    out.state.cascade_count,
                    out.step_win,
                    out.connections.len()
                );
                out.state
            }
        };
        print_grid(&state);
    }
    println!("chain complete: total_win={}", state.total_win);
    Ok(())
}
