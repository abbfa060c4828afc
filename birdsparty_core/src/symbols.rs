use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cells a progression symbol must be cleared from before the level advances.
pub const STAGE_PROGRESS_TARGET: u32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    PurpleOwl,
    GreenOwl,
    YellowOwl,
    BlueOwl,
    RedOwl,
    FreeGame,
    OrangeSlice,
    HoneyPot,
    Strawberry,
}

impl Symbol {
    /// The five bird symbols, in paytable order.
    pub const BIRDS: [Symbol; 5] = [
        Symbol::PurpleOwl,
        Symbol::GreenOwl,
        Symbol::YellowOwl,
        Symbol::BlueOwl,
        Symbol::RedOwl,
    ];

    /// Birds form connections and pay.
    pub fn is_regular(self) -> bool {
        matches!(
            self,
            Symbol::PurpleOwl | Symbol::GreenOwl | Symbol::YellowOwl | Symbol::BlueOwl | Symbol::RedOwl
        )
    }

    pub fn is_trigger(self) -> bool {
        self == Symbol::FreeGame
    }

    pub fn is_progression(self) -> bool {
        matches!(self, Symbol::OrangeSlice | Symbol::HoneyPot | Symbol::Strawberry)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::PurpleOwl => "purple_owl",
            Symbol::GreenOwl => "green_owl",
            Symbol::YellowOwl => "yellow_owl",
            Symbol::BlueOwl => "blue_owl",
            Symbol::RedOwl => "red_owl",
            Symbol::FreeGame => "free_game",
            Symbol::OrangeSlice => "orange_slice",
            Symbol::HoneyPot => "honey_pot",
            Symbol::Strawberry => "strawberry",
        }
    }

    /// Index into the per-level paytable rows. `None` for non-paying symbols.
    pub(crate) fn bird_index(self) -> Option<usize> {
        Symbol::BIRDS.iter().position(|b| *b == self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    One,
    Two,
    Three,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::One, Level::Two, Level::Three];

    pub fn number(self) -> u8 {
        match self {
            Level::One => 1,
            Level::Two => 2,
            Level::Three => 3,
        }
    }

    /// Side length of the square grid.
    pub fn grid_size(self) -> usize {
        match self {
            Level::One => 4,
            Level::Two => 5,
            Level::Three => 6,
        }
    }

    pub fn min_connection(self) -> usize {
        match self {
            Level::One => 4,
            Level::Two => 5,
            Level::Three => 6,
        }
    }

    pub fn progression_symbol(self) -> Symbol {
        match self {
            Level::One => Symbol::OrangeSlice,
            Level::Two => Symbol::HoneyPot,
            Level::Three => Symbol::Strawberry,
        }
    }

    /// Cyclic successor: 1 -> 2 -> 3 -> 1.
    pub fn next(self) -> Level {
        match self {
            Level::One => Level::Two,
            Level::Two => Level::Three,
            Level::Three => Level::One,
        }
    }

    pub fn weights(self) -> WeightTable {
        WeightTable::for_level(self)
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("invalid level: {other}")),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.number()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

const BIRD_WEIGHT: f64 = 0.2475;
const TRIGGER_WEIGHT: f64 = 0.001;
const PROGRESSION_WEIGHT: f64 = 0.002;

/// Ordered (symbol, weight) pairs for one level. Draw order is the table
/// order, so a fixed random source always yields the same symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: Vec<(Symbol, f64)>,
}

impl WeightTable {
    pub fn for_level(level: Level) -> Self {
        let mut entries: Vec<(Symbol, f64)> =
            Symbol::BIRDS.iter().map(|b| (*b, BIRD_WEIGHT)).collect();
        entries.push((Symbol::FreeGame, TRIGGER_WEIGHT));
        // Only the level's own progression symbol can be drawn.
        entries.push((level.progression_symbol(), PROGRESSION_WEIGHT));
        Self { entries }
    }

    pub fn entries(&self) -> &[(Symbol, f64)] {
        &self.entries
    }

    /// Weighted draw; the trigger symbol is left out of the pool when
    /// `forbid_trigger` is set.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, forbid_trigger: bool) -> Symbol {
        self.draw_where(rng, |s| !(forbid_trigger && s.is_trigger()))
    }

    /// Weighted draw over the entries accepted by `allow`. The roll is
    /// `uniform(0, total)` and the first entry whose running sum reaches it
    /// wins.
    pub fn draw_where<R, F>(&self, rng: &mut R, allow: F) -> Symbol
    where
        R: Rng + ?Sized,
        F: Fn(Symbol) -> bool,
    {
        let total: f64 = self
            .entries
            .iter()
            .filter(|(s, _)| allow(*s))
            .map(|(_, w)| *w)
            .sum();
        if total <= 0.0 {
            return Symbol::PurpleOwl;
        }
        let roll = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (symbol, weight) in self.entries.iter().filter(|(s, _)| allow(*s)) {
            cumulative += weight;
            if roll <= cumulative {
                return *symbol;
            }
        }
        Symbol::PurpleOwl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn level_cycle_wraps() {
        assert_eq!(Level::One.next(), Level::Two);
        assert_eq!(Level::Two.next(), Level::Three);
        assert_eq!(Level::Three.next(), Level::One);
    }

    #[test]
    fn weight_table_only_carries_own_progression_symbol() {
        for level in Level::ALL {
            let table = level.weights();
            let progression: Vec<Symbol> = table
                .entries()
                .iter()
                .map(|(s, _)| *s)
                .filter(|s| s.is_progression())
                .collect();
            assert_eq!(progression, vec![level.progression_symbol()]);
        }
    }

    #[test]
    fn draw_is_reproducible() {
        let table = Level::Two.weights();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        let xs: Vec<Symbol> = (0..64).map(|_| table.draw(&mut a, false)).collect();
        let ys: Vec<Symbol> = (0..64).map(|_| table.draw(&mut b, false)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn forbidden_trigger_never_drawn() {
        let table = Level::One.weights();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20_000 {
            assert_ne!(table.draw(&mut rng, true), Symbol::FreeGame);
        }
    }

    #[test]
    fn level_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Level::Three).unwrap(), "3");
        assert!(serde_json::from_str::<Level>("4").is_err());
        assert_eq!(
            serde_json::to_string(&Symbol::HoneyPot).unwrap(),
            "\"honey_pot\""
        );
    }
}
