use std::collections::HashMap;

/// A high-level action that any input device can produce.
///
/// The simulations and the host loop consume actions, never raw key events,
/// so keyboard, touch buttons and gamepads all share the same game logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Steer (kart) toward the left edge.
    SteerLeft,
    /// Steer (kart) toward the right edge.
    SteerRight,
    /// Hold to drift; releasing fires the drift boost.
    Drift,
    /// Hold to fire guns.
    Fire,
    /// Hold to use afterburner.
    Boost,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    ThrottleUp,
    ThrottleDown,
    /// Reset the race or match.
    Restart,
    /// Toggle sound cues on the host side.
    ToggleSound,
}

/// Maps browser-style key names (`"ArrowLeft"`, `"a"`, `" "`, `"Shift"`) to
/// actions.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<String, Action>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings shared by the kart games.
    pub fn kart() -> Self {
        let mut map = Self::new();
        for key in ["ArrowLeft", "a", "A"] {
            map.bind(key, Action::SteerLeft);
        }
        for key in ["ArrowRight", "d", "D"] {
            map.bind(key, Action::SteerRight);
        }
        for key in ["Shift", " ", "z", "Z"] {
            map.bind(key, Action::Drift);
        }
        map.bind("r", Action::Restart);
        map.bind("R", Action::Restart);
        map.bind("m", Action::ToggleSound);
        map.bind("M", Action::ToggleSound);
        map
    }

    /// Bindings for the dogfight game. Up keys raise the nose, the same
    /// way pushing the virtual stick up does.
    pub fn flight() -> Self {
        let mut map = Self::new();
        for key in ["ArrowUp", "w", "W"] {
            map.bind(key, Action::PitchUp);
        }
        for key in ["ArrowDown", "s", "S"] {
            map.bind(key, Action::PitchDown);
        }
        for key in ["ArrowLeft", "a", "A"] {
            map.bind(key, Action::RollLeft);
        }
        for key in ["ArrowRight", "d", "D"] {
            map.bind(key, Action::RollRight);
        }
        map.bind("e", Action::ThrottleUp);
        map.bind("E", Action::ThrottleUp);
        map.bind("q", Action::ThrottleDown);
        map.bind("Q", Action::ThrottleDown);
        map.bind(" ", Action::Fire);
        map.bind("Shift", Action::Boost);
        map.bind("r", Action::Restart);
        map.bind("R", Action::Restart);
        map.bind("m", Action::ToggleSound);
        map.bind("M", Action::ToggleSound);
        map
    }

    /// Bind a key, replacing any previous binding for it.
    pub fn bind(&mut self, key: impl Into<String>, action: Action) -> Option<Action> {
        self.bindings.insert(key.into(), action)
    }

    pub fn unbind(&mut self, key: &str) -> Option<Action> {
        self.bindings.remove(key)
    }

    pub fn lookup(&self, key: &str) -> Option<Action> {
        self.bindings.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kart_map_covers_arrows_and_letters() {
        let map = KeyMap::kart();
        assert_eq!(map.lookup("ArrowLeft"), Some(Action::SteerLeft));
        assert_eq!(map.lookup("A"), Some(Action::SteerLeft));
        assert_eq!(map.lookup("d"), Some(Action::SteerRight));
        assert_eq!(map.lookup(" "), Some(Action::Drift));
        assert_eq!(map.lookup("Z"), Some(Action::Drift));
        assert_eq!(map.lookup("x"), None);
    }

    #[test]
    fn flight_map_fire_and_boost() {
        let map = KeyMap::flight();
        assert_eq!(map.lookup(" "), Some(Action::Fire));
        assert_eq!(map.lookup("Shift"), Some(Action::Boost));
        assert_eq!(map.lookup("w"), Some(Action::PitchUp));
        assert_eq!(map.lookup("ArrowDown"), Some(Action::PitchDown));
    }

    #[test]
    fn rebinding_replaces() {
        let mut map = KeyMap::kart();
        let old = map.bind("z", Action::Fire);
        assert_eq!(old, Some(Action::Drift));
        assert_eq!(map.lookup("z"), Some(Action::Fire));
        assert_eq!(map.unbind("z"), Some(Action::Fire));
        assert_eq!(map.lookup("z"), None);
    }

    #[test]
    fn empty_map() {
        let map = KeyMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }
}
