//! Play one bullet game against the random opponent in real time.
//!
//!   cargo run --release -p bullet-chess --features demo --bin bullet_demo [think_ms] [seed] [--legal]
//!
//! `--legal` samples among legal actions only; otherwise the agent picks any of
//! the 4096 indices, which usually ends the game with an illegal move.
//! Set `RUST_LOG=bullet_chess=debug` to see termination details.

use std::thread;
use std::time::Duration;

use bullet_chess::{
    Action, BulletChessEnv, Color, Environment, EpisodeConfig, RealTimeClock, ResetOptions,
    StepLimit, ACTION_SPACE_SIZE,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let legal_only = args.iter().any(|a| a == "--legal");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
    let think_ms: u64 = positional.first().and_then(|s| s.parse().ok()).unwrap_or(50);
    let seed: Option<u64> = positional.get(1).and_then(|s| s.parse().ok());

    let env = match BulletChessEnv::new(EpisodeConfig::default()) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("failed to build environment: {e}");
            std::process::exit(1);
        }
    };
    let mut env = StepLimit::new(RealTimeClock::new(env), StepLimit::<BulletChessEnv>::DEFAULT_MAX_STEPS);
    let mut rng = match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_entropy(),
    };

    let obs = env.reset(ResetOptions { seed, self_play: None });
    info!(
        white = obs.state[6] as f64 * env.clock().initial_allotment(),
        think_ms, legal_only, "game started"
    );

    let mut step_count = 0u32;
    let mut total_reward = 0.0;
    loop {
        step_count += 1;
        thread::sleep(Duration::from_millis(think_ms));

        let action = if legal_only {
            let legal = env.legal_actions();
            if legal.is_empty() {
                Action::Move(0)
            } else {
                Action::from(legal[rng.gen_range(0..legal.len())])
            }
        } else {
            Action::from(rng.gen_range(0..ACTION_SPACE_SIZE))
        };

        let out = match env.step(action) {
            Ok(out) => out,
            Err(e) => {
                eprintln!("step failed: {e}");
                std::process::exit(1);
            }
        };
        total_reward += out.reward;

        info!(
            step = step_count,
            action = action.index(),
            white = env.clock().remaining(Color::White).max(0.0),
            black = env.clock().remaining(Color::Black).max(0.0),
            "move played"
        );
        if step_count % 5 == 0 {
            println!("{}\n", env.inner().inner().render());
        }

        if out.terminated || out.truncated {
            println!("{}\n", env.inner().inner().render());
            info!(
                steps = step_count,
                reward = total_reward,
                info = ?out.info.to_map(),
                truncated = out.truncated,
                "game over"
            );
            break;
        }
    }
}
