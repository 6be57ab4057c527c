#![deny(warnings)]

//! Headless CLI: plays American Insight against a save directory.

use anyhow::{bail, Context, Result};
use persistence::{FileStore, LoadOutcome, SaveSlot};
use sim_core::{GameState, ItemId, OptionId, SimConfig};
use sim_runtime::{Engine, Outcome, Status};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: cli [--save-dir DIR] [--content DIR] [--balance FILE] [--seed N] \
<status | advance [N] | choose A-D | buy ITEM | bill | shop | reset | autoplay [MONTHS] [OPTION]>";

#[derive(Debug, Default)]
struct Args {
    save_dir: Option<PathBuf>,
    content: Option<PathBuf>,
    balance: Option<PathBuf>,
    seed: Option<u64>,
    command: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--save-dir" => args.save_dir = it.next().map(PathBuf::from),
            "--content" => args.content = it.next().map(PathBuf::from),
            "--balance" => args.balance = it.next().map(PathBuf::from),
            "--seed" => {
                let raw = it.next().context("--seed needs a value")?;
                args.seed = Some(raw.parse().with_context(|| format!("bad seed {raw:?}"))?);
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => args.command.push(arg),
        }
    }
    Ok(args)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Derive this invocation's stream from the base seed and the save's progress.
///
/// Every applied transition appends to the history, so two runs against the
/// same save never replay the same draws, even within one month.
fn session_seed(base: u64, state: &GameState) -> u64 {
    let progress = (u64::from(state.month) << 32) ^ state.history.len() as u64;
    base ^ progress.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn print_state(engine: &Engine) {
    let s = engine.state();
    println!(
        "Month {} | {:?} | HP {}/{} | SAN {} | Gold {} | Debt months {}",
        s.month, s.class_tier, s.hp, s.max_hp, s.sanity, s.gold, s.flags.debt_months
    );
    if !s.inventory.is_empty() {
        let inv: Vec<&str> = s.inventory.iter().map(|i| i.as_str()).collect();
        println!("Inventory: {}", inv.join(", "));
    }
    if let Some(bill) = &s.active_bill {
        println!("BILL {} ({}): {}", bill.name, bill.amount, bill.flavor_text);
    }
    if let Some(event) = &s.current_event {
        println!("EVENT {}: {}", event.title, event.text_for(s.sanity));
        for id in OptionId::ALL {
            println!("  [{id}] {}", event.options.get(id).label);
        }
    }
    if let Some(id) = &s.ending {
        match engine.content().ending(id) {
            Some(ending) => println!("ENDING {id}: {}\n{}", ending.title, ending.description),
            None => println!("ENDING {id}"),
        }
    }
}

fn print_outcome(out: &Outcome) {
    match &out.status {
        Status::Applied => {}
        Status::Rejected(why) => println!("Rejected: {why:?}"),
        Status::Ignored(why) => println!("Nothing happens: {why:?}"),
    }
    if let Some(summary) = &out.summary {
        println!(
            "Month {} settled: +{} / -{}",
            summary.month, summary.income, summary.expenses
        );
        for note in &summary.notes {
            println!("  {note}");
        }
    }
    for n in &out.notifications {
        if n.delta != 0 {
            println!("  {:?} {:+} {}", n.kind, n.delta, n.message);
        } else {
            println!("  {:?} {}", n.kind, n.message);
        }
    }
}

fn autoplay(engine: &mut Engine, months: u32, option: OptionId) {
    for _ in 0..months {
        if engine.state().is_terminal() {
            break;
        }
        if engine.state().current_event.is_some() {
            engine.resolve_choice(option);
        }
        engine.dismiss_bill();
        engine.advance_month();
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    let content = match &args.content {
        Some(dir) => data_pipeline::load_dir(dir)?,
        None => data_pipeline::load_embedded()?,
    };
    let content = Arc::new(content);
    let config = data_pipeline::load_config(
        args.seed.unwrap_or_else(clock_seed),
        args.balance.as_deref(),
    )?;

    let mut words = args.command.iter().map(String::as_str);
    let command = words.next().unwrap_or("status");

    if command == "autoplay" {
        let months = match words.next() {
            Some(raw) => raw.parse().with_context(|| format!("bad month count {raw:?}"))?,
            None => 40,
        };
        let option = match words.next() {
            Some(raw) => raw.parse::<OptionId>().map_err(anyhow::Error::msg)?,
            None => OptionId::B,
        };
        info!(months, %option, seed = config.rng_seed, "autoplay");
        let mut engine = Engine::new(content, config);
        autoplay(&mut engine, months, option);
        print_state(&engine);
        return Ok(());
    }

    let save_dir = args.save_dir.unwrap_or_else(|| PathBuf::from("./saves"));
    let slot = SaveSlot::new(FileStore::new(&save_dir));
    let state = match slot.load(&config.balance.tiers)? {
        LoadOutcome::Restored(state) => state,
        LoadOutcome::Fresh { state, reason } => {
            info!(?reason, dir = %save_dir.display(), "starting a new game");
            state
        }
    };
    let config = SimConfig {
        rng_seed: session_seed(config.rng_seed, &state),
        ..config
    };
    let mut engine = Engine::restore(content, config, state).with_autosave(slot);

    match command {
        "status" => {}
        "advance" => {
            let n: u32 = match words.next() {
                Some(raw) => raw.parse().with_context(|| format!("bad month count {raw:?}"))?,
                None => 1,
            };
            for _ in 0..n {
                let out = engine.advance_month();
                print_outcome(&out);
                if !out.is_applied() || engine.state().is_terminal() {
                    break;
                }
            }
        }
        "choose" => {
            let raw = words.next().context("choose needs an option A-D")?;
            let option = raw.parse::<OptionId>().map_err(anyhow::Error::msg)?;
            print_outcome(&engine.resolve_choice(option));
        }
        "buy" => {
            let id = words.next().context("buy needs an item id")?;
            print_outcome(&engine.purchase_item(&ItemId::new(id)));
        }
        "bill" => print_outcome(&engine.dismiss_bill()),
        "shop" => {
            for item in engine.shop_catalog() {
                println!(
                    "{:<5} {:<28} {:>8}  {}",
                    item.id.as_str(),
                    item.name,
                    item.price,
                    item.flavor_text
                );
            }
            return Ok(());
        }
        "reset" => print_outcome(&engine.reset_game()),
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }
    print_state(&engine);
    Ok(())
}
