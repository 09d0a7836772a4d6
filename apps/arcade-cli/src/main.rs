use std::path::{Path, PathBuf};
use anyhow::{Context, bail, ensure};
use arcade_common::{Validate, load_config};
use arcade_flight::{ArenaLayout, CombatEvent, Dogfight, MatchConfig, MatchOutcome};
use arcade_kart::segment::TrackProfile;
use arcade_kart::sprint::SPRINT_MAX_DT;
use arcade_kart::{
    PLAYER, Race, RaceConfig, RaceEvent, SegmentTrack, SplineTrack, SprintEvent, SprintRace,
    SprintTuning, Track,
};
use arcade_kernel::{FrameClock, Session, Simulation, Stamped, StepTimer};
use arcade_tools::{Inspector, ReplayReport, hud};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Fixed frame delta for headless runs.
const DT: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "arcade", about = "Run the arcade simulations headless")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the available tracks and arenas
    Info,
    /// Race a kart with the autopilot driving
    Race {
        #[arg(short, long, value_enum, default_value = "circuit")]
        track: TrackKind,
        /// Rival bots; the track's preset when unset
        #[arg(short, long)]
        bots: Option<u32>,
        /// Laps to finish; the track's preset when unset
        #[arg(short, long)]
        laps: Option<u32>,
        /// RNG seed; overrides the config file
        #[arg(short, long)]
        seed: Option<u64>,
        /// Simulated seconds to run at most
        #[arg(long, default_value = "120")]
        seconds: f32,
        /// YAML or JSON race config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Drive the segment sprint with the autopilot
    Sprint {
        /// neon, sunset or alpine
        #[arg(short, long, default_value = "neon")]
        map: String,
        #[arg(short, long, default_value = "5")]
        bots: u32,
        #[arg(short, long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "180")]
        seconds: f32,
    },
    /// Fly a dogfight with the autopilot in the player's seat
    Dogfight {
        /// Red opponents
        #[arg(short, long)]
        bots: Option<u32>,
        /// Blue bots flying with the player
        #[arg(short, long)]
        wingmen: Option<u32>,
        /// open, towers or canyon
        #[arg(short, long)]
        arena: Option<String>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(long, default_value = "120")]
        seconds: f32,
        /// YAML or JSON match config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Record a run, replay its input tape and compare state hashes
    Replay {
        #[arg(short, long, value_enum, default_value = "race")]
        game: Game,
        #[arg(short, long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "20")]
        seconds: f32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TrackKind {
    Oval,
    Circuit,
    Battle,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Game {
    Race,
    Sprint,
    Dogfight,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => info(),
        Commands::Race {
            track,
            bots,
            laps,
            seed,
            seconds,
            config,
        } => {
            let mut race_config: RaceConfig = match &config {
                Some(path) => load(path)?,
                None => RaceConfig::default(),
            };
            race_config.bots = bots.or(race_config.bots);
            race_config.laps = laps.or(race_config.laps);
            race_config.seed = seed.unwrap_or(race_config.seed);
            race_config.validate()?;
            let frames = frames_for(seconds)?;
            match track {
                TrackKind::Oval => race(Race::oval(&race_config), frames),
                TrackKind::Circuit => race(Race::circuit(&race_config)?, frames),
                TrackKind::Battle => race(Race::battle(&race_config)?, frames),
            }
        }
        Commands::Sprint {
            map,
            bots,
            seed,
            seconds,
        } => {
            let profile: TrackProfile = map.parse()?;
            let track = SegmentTrack::from_profile(profile)?;
            let sprint = SprintRace::new(track, SprintTuning::default(), bots, seed);
            println!("Sprint: map={} bots={bots} seed={seed}", profile.name());
            let mut session = Session::with_clock(sprint, FrameClock::new(SPRINT_MAX_DT));
            let timer = run_timed(&mut session, frames_for(seconds)?, |s| s.autopilot());
            for stamped in session.events() {
                print_sprint_event(stamped);
            }
            println!("{}", Inspector::sprint(session.sim()));
            print_timing(&timer);
        }
        Commands::Dogfight {
            bots,
            wingmen,
            arena,
            seed,
            seconds,
            config,
        } => {
            let mut match_config: MatchConfig = match &config {
                Some(path) => load(path)?,
                None => MatchConfig::default(),
            };
            if let Some(bots) = bots {
                match_config.bots = bots;
            }
            if let Some(wingmen) = wingmen {
                match_config.wingmen = wingmen;
            }
            if let Some(arena) = arena {
                match_config.layout = arena.parse::<ArenaLayout>()?;
            }
            if let Some(seed) = seed {
                match_config.seed = seed;
            }
            let df = Dogfight::new(&match_config)?;
            println!(
                "Dogfight: arena={:?} bots={} wingmen={} seed={} obstacles={}",
                match_config.layout,
                match_config.bots,
                match_config.wingmen,
                match_config.seed,
                df.arena().obstacles().len()
            );
            let mut session = Session::new(df);
            let timer = run_timed(&mut session, frames_for(seconds)?, |df| df.autopilot());
            for stamped in session.events() {
                print_combat_event(stamped);
            }
            println!("{}", Inspector::dogfight(session.sim()));
            print_timing(&timer);
        }
        Commands::Replay {
            game,
            seed,
            seconds,
        } => {
            let frames = frames_for(seconds)?;
            let report = match game {
                Game::Race => {
                    let config = RaceConfig {
                        seed,
                        ..RaceConfig::default()
                    };
                    replay_check(
                        || Ok(Race::battle(&config)?),
                        FrameClock::default(),
                        frames,
                        |r: &Race<SplineTrack>| r.autopilot(),
                    )?
                }
                Game::Sprint => replay_check(
                    || {
                        let track = SegmentTrack::from_profile(TrackProfile::Neon)?;
                        Ok(SprintRace::new(track, SprintTuning::default(), 5, seed))
                    },
                    FrameClock::new(SPRINT_MAX_DT),
                    frames,
                    |s: &SprintRace| s.autopilot(),
                )?,
                Game::Dogfight => {
                    let config = MatchConfig {
                        seed,
                        ..MatchConfig::default()
                    };
                    replay_check(
                        || Ok(Dogfight::new(&config)?),
                        FrameClock::default(),
                        frames,
                        |df: &Dogfight| df.autopilot(),
                    )?
                }
            };
            println!("{report}");
            if !report.matches() {
                bail!("replay diverged after {} frames", report.frames);
            }
        }
    }

    Ok(())
}

fn info() {
    println!("arcade v{}", env!("CARGO_PKG_VERSION"));
    println!("race tracks: oval, circuit, battle");
    let maps: Vec<_> = TrackProfile::ALL.iter().map(|p| p.name()).collect();
    println!("sprint maps: {}", maps.join(", "));
    println!("arenas: open, towers, canyon");
    println!("frame: fixed {:.4}s, sprint cap {SPRINT_MAX_DT}s", DT);
}

fn load<T>(path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned + Validate,
{
    load_config(path).with_context(|| format!("loading config {}", path.display()))
}

fn frames_for(seconds: f32) -> anyhow::Result<u64> {
    ensure!(
        seconds.is_finite() && seconds > 0.0,
        "--seconds must be positive, got {seconds}"
    );
    Ok((seconds / DT).round() as u64)
}

/// Run up to `frames` fixed frames, timing each step against a 60 Hz
/// frame budget.
fn run_timed<S: Simulation>(
    session: &mut Session<S>,
    frames: u64,
    mut input: impl FnMut(&S) -> S::Input,
) -> StepTimer {
    let mut timer = StepTimer::at_rate(600, 1.0 / DT);
    let mut ran = 0;
    while ran < frames && !session.is_finished() {
        let controls = input(session.sim());
        session.advance_timed(controls, DT, &mut timer);
        ran += 1;
    }
    tracing::debug!(frames = ran, tick = session.tick(), "run complete");
    timer
}

fn print_timing(timer: &StepTimer) {
    print!("step: avg={:?} over last {} frames", timer.average(), timer.len());
    if let Some(worst) = timer.slowest() {
        print!(", slowest {:?} at tick {}", worst.cost, worst.tick);
    }
    println!(", {}/{} over budget", timer.over_budget(), timer.steps());
}

fn race<T: Track>(race: Race<T>, frames: u64) {
    println!(
        "Race: racers={} laps={} lap_length={:.0}",
        race.racer_count(),
        race.player_laps().laps_total(),
        race.lap_length()
    );
    let mut session = Session::new(race);
    let timer = run_timed(&mut session, frames, |r| r.autopilot());
    for stamped in session.events() {
        print_race_event(stamped);
    }
    println!("{}", Inspector::race(session.sim()));
    print_timing(&timer);
}

fn at(tick: u64) -> String {
    hud::race_time_secs(tick as f32 * DT)
}

fn print_race_event(stamped: &Stamped<RaceEvent>) {
    match &stamped.event {
        RaceEvent::LapCompleted { racer, lap } if *racer == PLAYER => {
            println!("{} lap {lap}", at(stamped.tick));
        }
        RaceEvent::Finished { racer, time, rank } => {
            println!(
                "{} {racer} finished {} in {time:.2}s",
                at(stamped.tick),
                hud::ordinal(*rank)
            );
        }
        _ => {}
    }
}

fn print_sprint_event(stamped: &Stamped<SprintEvent>) {
    match &stamped.event {
        SprintEvent::LapCompleted { lap } => println!("{} lap {lap}", at(stamped.tick)),
        SprintEvent::BurstStarted => println!("{} burst", at(stamped.tick)),
        SprintEvent::Finished { time, rank } => {
            println!("{} finished {} in {time:.2}s", at(stamped.tick), hud::ordinal(*rank));
        }
        _ => {}
    }
}

fn print_combat_event(stamped: &Stamped<CombatEvent>) {
    match &stamped.event {
        CombatEvent::Destroyed { target, by: Some(by) } => {
            println!("{} {target} shot down by {by}", at(stamped.tick));
        }
        CombatEvent::Destroyed { target, by: None } => {
            println!("{} {target} crashed", at(stamped.tick));
        }
        CombatEvent::MatchOver { outcome } => {
            let banner = match outcome {
                MatchOutcome::Victory => "VICTORY",
                MatchOutcome::Defeat => "DEFEAT",
            };
            println!("{} {banner}", at(stamped.tick));
        }
        _ => {}
    }
}

/// Record `frames` of autopilot input on one simulation, replay the tape
/// on a second one built the same way under the same clock, and report
/// both hashes.
fn replay_check<S, F, I>(
    build: F,
    clock: FrameClock,
    frames: u64,
    input: I,
) -> anyhow::Result<ReplayReport>
where
    S: Simulation,
    F: Fn() -> anyhow::Result<S>,
    I: FnMut(&S) -> S::Input,
{
    let mut session = Session::with_clock(build()?, clock.clone());
    session.run_fixed(frames, DT, input);
    let expected = session.state_hash();
    let replayed = Session::replay_with_clock(build()?, clock, session.tape())?;
    Ok(ReplayReport::new(session.tape(), expected, replayed.state_hash()))
}
