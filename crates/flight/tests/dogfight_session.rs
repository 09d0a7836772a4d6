use std::io::Write;

use arcade_common::load_config;
use arcade_flight::{
    ArenaLayout, CombatEvent, Dogfight, FlightTuning, MatchConfig, MatchError, MatchOutcome,
    PLAYER,
};
use arcade_input::FlightControls;
use arcade_kernel::{ReplayError, Session};

const DT: f32 = 1.0 / 60.0;

#[test]
fn dogfight_replay_reproduces_hash() -> Result<(), MatchError> {
    let config = MatchConfig {
        bots: 3,
        wingmen: 1,
        seed: 31,
        ..MatchConfig::default()
    };
    let mut session = Session::new(Dogfight::new(&config)?);
    session.run_fixed(60 * 12, DT, |df| df.autopilot());
    let hash = session.state_hash();

    let replayed = Session::verify_replay(Dogfight::new(&config)?, session.tape(), hash)
        .expect("replay should match");
    assert_eq!(replayed.tick(), session.tick());
    assert_eq!(replayed.events(), session.events());
    Ok(())
}

#[test]
fn replay_in_another_arena_mismatches() -> Result<(), MatchError> {
    let towers = MatchConfig {
        seed: 3,
        ..MatchConfig::default()
    };
    let mut session = Session::new(Dogfight::new(&towers)?);
    session.run_fixed(120, DT, |df| df.autopilot());

    let canyon = Dogfight::new(&MatchConfig {
        layout: ArenaLayout::Canyon,
        ..towers
    })?;
    let err = Session::verify_replay(canyon, session.tape(), session.state_hash()).unwrap_err();
    assert!(matches!(err, ReplayError::HashMismatch { .. }));
    Ok(())
}

#[test]
fn diving_into_the_floor_loses() -> Result<(), MatchError> {
    let config = MatchConfig {
        bots: 2,
        layout: ArenaLayout::Open,
        tuning: Some(FlightTuning {
            hp: 10.0,
            ..FlightTuning::default()
        }),
        ..MatchConfig::default()
    };
    let dive = FlightControls {
        pitch: -1.0,
        throttle: 1.0,
        ..FlightControls::default()
    };
    let mut session = Session::new(Dogfight::new(&config)?);
    session.run_fixed(60 * 10, DT, |_| dive);

    assert!(session.is_finished());
    assert_eq!(session.sim().outcome(), Some(MatchOutcome::Defeat));
    assert!(!session.sim().player().alive);
    assert!(session.events().iter().any(|s| matches!(
        s.event,
        CombatEvent::Destroyed { target, .. } if target == PLAYER
    )));
    Ok(())
}

#[test]
fn config_file_limits_player_ammo() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "bots: 1\nlayout: open\nseed: 4\ntuning:\n  player_ammo: 0").unwrap();
    let config: MatchConfig = load_config(file.path()).unwrap();
    assert_eq!(config.layout, ArenaLayout::Open);

    let mut session = Session::new(Dogfight::new(&config).unwrap());
    assert_eq!(session.sim().player().ammo, Some(0));
    let trigger = FlightControls {
        fire: true,
        ..FlightControls::default()
    };
    session.run_fixed(60 * 3, DT, |_| trigger);
    assert!(!session.events().iter().any(|s| matches!(
        s.event,
        CombatEvent::Fired { shooter } if shooter == PLAYER
    )));
}

#[test]
fn small_bullet_pool_stays_bounded() -> Result<(), MatchError> {
    let config = MatchConfig {
        bots: 4,
        wingmen: 2,
        layout: ArenaLayout::Open,
        seed: 8,
        tuning: Some(FlightTuning {
            bullet_capacity: 4,
            ..FlightTuning::default()
        }),
    };
    let mut session = Session::new(Dogfight::new(&config)?);
    for _ in 0..60 * 15 {
        let controls = session.sim().autopilot();
        session.advance(controls, DT);
        assert!(session.sim().bullets().len() <= 4);
        if session.is_finished() {
            break;
        }
    }
    Ok(())
}
