use std::fmt;

use arcade_flight::{Dogfight, MatchOutcome, Team};
use arcade_kart::{Race, SprintRace, Track};
use arcade_kernel::InputTape;

use crate::hud::{self, HpBand};

/// Read-only snapshots of running simulations for logs and the CLI.
pub struct Inspector;

impl Inspector {
    pub fn race<T: Track>(race: &Race<T>) -> RaceSummary {
        let laps = race.player_laps();
        RaceSummary {
            elapsed: race.elapsed(),
            lap: laps.current_lap(),
            laps: laps.laps_total(),
            rank: race.player_rank(),
            racers: race.racer_count(),
            speed: race.player().speed(),
            drifting: race.player().is_drifting(),
            finish_time: laps.finish_time(),
        }
    }

    pub fn sprint(sprint: &SprintRace) -> SprintSummary {
        let pickups = sprint.track().pickups().len();
        SprintSummary {
            elapsed: sprint.elapsed(),
            lap: sprint.display_lap(),
            laps: sprint.tuning().laps,
            rank: sprint.player_rank(),
            racers: sprint.racer_count(),
            speed: sprint.player().speed,
            max_speed: sprint.tuning().max_speed,
            burst: sprint.player().burst,
            pickups_taken: (0..pickups).filter(|&i| sprint.is_taken(i)).count(),
            pickups,
            finish_time: sprint.finish_time(),
        }
    }

    pub fn dogfight(df: &Dogfight) -> MatchSummary {
        let player = df.player();
        MatchSummary {
            elapsed: df.elapsed(),
            hp: player.hp_fraction(df.tuning()),
            ammo: player.ammo,
            kills: df.kills(),
            blue_alive: df.alive(Team::Blue),
            red_alive: df.alive(Team::Red),
            bullets: df.bullets().len(),
            outcome: df.outcome(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceSummary {
    pub elapsed: f32,
    pub lap: u32,
    pub laps: u32,
    pub rank: usize,
    pub racers: usize,
    pub speed: f32,
    pub drifting: bool,
    pub finish_time: Option<f32>,
}

impl fmt::Display for RaceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Race: {} {} {} speed={:.1}",
            hud::race_time_secs(self.finish_time.unwrap_or(self.elapsed)),
            hud::lap_label(self.lap, self.laps),
            hud::rank_label(self.rank, self.racers),
            self.speed,
        )?;
        if self.drifting {
            write!(f, " drifting")?;
        }
        if self.finish_time.is_some() {
            write!(f, " finished {}", hud::ordinal(self.rank))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SprintSummary {
    pub elapsed: f32,
    pub lap: u32,
    pub laps: u32,
    pub rank: usize,
    pub racers: usize,
    pub speed: f32,
    pub max_speed: f32,
    pub burst: f32,
    pub pickups_taken: usize,
    pub pickups: usize,
    pub finish_time: Option<f32>,
}

impl fmt::Display for SprintSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sprint: {} {} {} {} burst={:.2} pickups={}/{}",
            hud::race_time_secs(self.finish_time.unwrap_or(self.elapsed)),
            hud::lap_label(self.lap, self.laps),
            hud::rank_label(self.rank, self.racers),
            hud::speed_label(self.speed, self.max_speed),
            self.burst,
            self.pickups_taken,
            self.pickups,
        )?;
        if self.finish_time.is_some() {
            write!(f, " finished {}", hud::ordinal(self.rank))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub elapsed: f32,
    /// Player hp as a fraction of full.
    pub hp: f32,
    pub ammo: Option<u32>,
    pub kills: u32,
    pub blue_alive: usize,
    pub red_alive: usize,
    pub bullets: usize,
    pub outcome: Option<MatchOutcome>,
}

impl MatchSummary {
    pub fn hp_band(&self) -> HpBand {
        HpBand::from_fraction(self.hp)
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dogfight: {} {} ({}) kills={} blue={} red={} bullets={}",
            hud::race_time_secs(self.elapsed),
            hud::hp_label(self.hp),
            self.hp_band().name(),
            self.kills,
            self.blue_alive,
            self.red_alive,
            self.bullets,
        )?;
        match self.ammo {
            Some(ammo) => write!(f, " ammo={ammo}")?,
            None => write!(f, " ammo=inf")?,
        }
        match self.outcome {
            Some(MatchOutcome::Victory) => write!(f, " VICTORY"),
            Some(MatchOutcome::Defeat) => write!(f, " DEFEAT"),
            None => Ok(()),
        }
    }
}

/// Result of replaying a recorded tape against a fresh simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub frames: usize,
    pub duration: f64,
    pub expected: u64,
    pub actual: u64,
}

impl ReplayReport {
    pub fn new<I>(tape: &InputTape<I>, expected: u64, actual: u64) -> Self {
        Self {
            frames: tape.len(),
            duration: tape.duration(),
            expected,
            actual,
        }
    }

    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Replay: frames={} duration={:.2}s recorded={:#018x} replayed={:#018x} {}",
            self.frames,
            self.duration,
            self.expected,
            self.actual,
            if self.matches() { "MATCH" } else { "MISMATCH" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_flight::MatchConfig;
    use arcade_input::KartControls;
    use arcade_kart::RaceConfig;
    use arcade_kart::segment::TrackProfile;
    use arcade_kart::{SegmentTrack, SprintTuning};
    use arcade_kernel::Simulation;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn race_summary_reports_finish() {
        let mut race = Race::oval(&RaceConfig::default());
        let summary = Inspector::race(&race);
        assert_eq!(summary.lap, 1);
        assert_eq!(summary.racers, 1);
        assert!(summary.finish_time.is_none());
        assert!(summary.to_string().starts_with("Race: TIME 00.00 LAP 1/1 POS 1/1"));

        let mut events = Vec::new();
        while !race.is_finished() {
            race.step(&KartControls::default(), DT, &mut events);
        }
        let summary = Inspector::race(&race);
        assert!(summary.finish_time.is_some());
        assert!(summary.to_string().ends_with("finished 1st"));
    }

    #[test]
    fn sprint_summary_counts_pickups() {
        let track = SegmentTrack::from_profile(TrackProfile::Neon).unwrap();
        let sprint = SprintRace::new(track, SprintTuning::default(), 3, 1);
        let summary = Inspector::sprint(&sprint);
        assert_eq!(summary.pickups, 26);
        assert_eq!(summary.pickups_taken, 0);
        assert_eq!(summary.racers, 4);
        // Start speed is 40% of max.
        assert!(summary.to_string().contains("SPEED 128"));
        assert!(summary.to_string().contains("LAP 1/3"));
    }

    #[test]
    fn match_summary_shows_hp_and_ammo() {
        let df = Dogfight::new(&MatchConfig::default()).unwrap();
        let summary = Inspector::dogfight(&df);
        assert_eq!(summary.hp, 1.0);
        assert_eq!(summary.hp_band(), HpBand::Good);
        assert_eq!(summary.red_alive, 3);
        assert_eq!(summary.blue_alive, 1);
        let text = summary.to_string();
        assert!(text.contains("HP 100 (good)"));
        assert!(text.contains("ammo=400"));
        assert!(!text.contains("VICTORY"));
    }

    #[test]
    fn replay_report_flags_mismatch() {
        let mut tape = InputTape::new();
        tape.push(KartControls::default(), 0.5);
        tape.push(KartControls::default(), 0.5);
        let ok = ReplayReport::new(&tape, 7, 7);
        assert!(ok.matches());
        assert_eq!(ok.frames, 2);
        assert!(ok.to_string().ends_with("MATCH"));
        let bad = ReplayReport::new(&tape, 7, 8);
        assert!(bad.to_string().ends_with("MISMATCH"));
    }
}
