use crate::symbols::{Level, Symbol};

/// Coin denomination applied to every paytable value.
pub const DENOMINATION: f64 = 0.01;

// Rows follow `Symbol::BIRDS` order; column `i` pays a connection of
// `level.min_connection() + i` cells, up to the full grid.
static LEVEL_1: [&[f64]; 5] = [
    &[4., 5., 6., 7., 8., 9., 10., 11., 12., 13., 14., 15., 16.],
    &[2., 4., 5., 8., 10., 20., 30., 50., 100., 200., 400., 800., 1600.],
    &[4., 5., 10., 20., 30., 50., 100., 250., 500., 750., 800., 1200., 6000.],
    &[5., 10., 20., 40., 60., 80., 160., 500., 1000., 2000., 5000., 7000., 8000.],
    &[
        10., 30., 50., 60., 100., 750., 1000., 10000., 20000., 50000., 60000., 80000., 100000.,
    ],
];

static LEVEL_2: [&[f64]; 5] = [
    &[
        2., 4., 5., 8., 10., 20., 30., 50., 100., 200., 450., 1000., 1200., 1500., 2000., 2500.,
        3000., 4000., 5000., 7500., 10000.,
    ],
    &[
        4., 5., 10., 20., 30., 50., 100., 250., 500., 750., 1000., 7000., 8000., 10000., 12000.,
        15000., 18000., 22000., 27000., 32000., 40000.,
    ],
    &[
        5., 10., 20., 40., 60., 80., 160., 500., 1000., 2000., 5000., 8000., 10000., 12000.,
        15000., 20000., 25000., 30000., 40000., 50000., 60000.,
    ],
    &[
        10., 30., 50., 60., 100., 750., 1000., 10000., 20000., 50000., 70000., 100000., 120000.,
        150000., 180000., 220000., 270000., 320000., 400000., 500000., 600000.,
    ],
    &[
        20., 50., 100., 500., 1000., 2000., 5000., 20000., 50000., 80000., 100000., 150000.,
        200000., 300000., 400000., 500000., 600000., 800000., 1000000., 1200000., 1500000.,
    ],
];

static LEVEL_3: [&[f64]; 5] = [
    &[
        2., 4., 5., 8., 10., 20., 30., 50., 100., 200., 500., 600., 750., 900., 1100., 1300.,
        1600., 2000., 2500., 3000., 3600., 4300., 5100., 6000., 7500., 9000., 11000., 13000.,
        16000., 20000., 25000.,
    ],
    &[
        4., 5., 10., 20., 30., 50., 100., 250., 500., 1000., 8000., 9000., 10500., 12000., 14000.,
        16000., 19000., 22000., 26000., 30000., 35000., 40000., 46000., 53000., 60000., 68000.,
        77000., 87000., 98000., 110000., 125000.,
    ],
    &[
        5., 10., 20., 40., 60., 80., 160., 500., 1000., 5000., 10000., 12000., 14000., 17000.,
        20000., 24000., 28000., 33000., 39000., 45000., 52000., 60000., 69000., 79000., 90000.,
        102000., 115000., 130000., 146000., 165000., 185000.,
    ],
    &[
        10., 30., 50., 60., 100., 750., 1000., 10000., 20000., 50000., 100000., 115000., 130000.,
        150000., 170000., 195000., 220000., 250000., 280000., 315000., 355000., 400000., 450000.,
        505000., 565000., 630000., 700000., 775000., 860000., 950000., 1050000.,
    ],
    &[
        20., 50., 100., 500., 1000., 2000., 5000., 20000., 50000., 100000., 200000., 230000.,
        265000., 305000., 350000., 400000., 460000., 530000., 610000., 700000., 800000., 920000.,
        1060000., 1220000., 1400000., 1600000., 1840000., 2120000., 2440000., 2800000., 3200000.,
    ],
];

#[derive(Debug, Clone, Copy)]
pub struct Paytable {
    level: Level,
    rows: &'static [&'static [f64]; 5],
}

impl Paytable {
    pub fn for_level(level: Level) -> Self {
        let rows = match level {
            Level::One => &LEVEL_1,
            Level::Two => &LEVEL_2,
            Level::Three => &LEVEL_3,
        };
        Self { level, rows }
    }

    /// Largest connection size with its own table entry.
    pub fn max_count(&self) -> usize {
        self.level.min_connection() + self.rows[0].len() - 1
    }

    /// Raw table value (credits at bet multiplier 1). Counts beyond the
    /// largest key use the largest key's value; counts below the level
    /// minimum and non-bird symbols pay nothing.
    pub fn credits(&self, symbol: Symbol, count: usize) -> f64 {
        let Some(row) = symbol.bird_index().map(|i| self.rows[i]) else {
            return 0.0;
        };
        let min = self.level.min_connection();
        if count < min {
            return 0.0;
        }
        let idx = (count.min(self.max_count())) - min;
        row[idx]
    }

    /// Money paid for one connection at the given bet multiplier, rounded
    /// to cents.
    pub fn payout(&self, symbol: Symbol, count: usize, bet_multiplier: u32) -> f64 {
        round_cents(self.credits(symbol, count) * DENOMINATION * f64::from(bet_multiplier))
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
