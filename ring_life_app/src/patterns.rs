// patterns.rs - Named starting patterns, each with the grid it was drawn for

use ring_life::{ConfigError, GridDims, Pattern};

pub struct PatternEntry {
    pub name: &'static str,
    pub rows: usize,
    pub cols: usize,
    pub cells: &'static [(usize, usize)],
}

pub const PATTERNS: &[PatternEntry] = &[
    PatternEntry {
        name: "acorn",
        rows: 100,
        cols: 100,
        cells: &[(51, 52), (52, 54), (53, 51), (53, 52), (53, 55), (53, 56), (53, 57)],
    },
    PatternEntry {
        name: "beacon",
        rows: 6,
        cols: 6,
        cells: &[(1, 3), (1, 4), (2, 3), (2, 4), (3, 1), (3, 2), (4, 1), (4, 2)],
    },
    PatternEntry {
        name: "block_switch_engine",
        rows: 400,
        cols: 400,
        cells: &[
            (201, 202), (201, 203), (202, 202), (202, 203), (211, 203), (212, 204),
            (212, 202), (214, 204), (214, 201), (215, 201), (215, 202), (216, 201),
        ],
    },
    PatternEntry {
        name: "blinker",
        rows: 5,
        cols: 5,
        cells: &[(2, 1), (2, 2), (2, 3)],
    },
    PatternEntry {
        name: "boat",
        rows: 5,
        cols: 5,
        cells: &[(1, 1), (1, 2), (2, 1), (2, 3), (3, 2)],
    },
    PatternEntry {
        name: "die_hard",
        rows: 100,
        cols: 100,
        cells: &[(51, 57), (52, 51), (52, 52), (53, 52), (53, 56), (53, 57), (53, 58)],
    },
    PatternEntry {
        name: "flat",
        rows: 200,
        cols: 400,
        cells: &[
            (80, 200), (81, 200), (82, 200), (83, 200), (84, 200), (85, 200), (86, 200), (87, 200),
            (89, 200), (90, 200), (91, 200), (92, 200), (93, 200),
            (97, 200), (98, 200), (99, 200),
            (106, 200), (107, 200), (108, 200), (109, 200), (110, 200), (111, 200), (112, 200),
            (114, 200), (115, 200), (116, 200), (117, 200), (118, 200),
        ],
    },
    PatternEntry {
        name: "floraison",
        rows: 40,
        cols: 40,
        cells: &[(19, 18), (19, 19), (19, 20), (20, 17), (20, 19), (20, 21), (21, 18), (21, 19), (21, 20)],
    },
    PatternEntry {
        name: "glider",
        rows: 100,
        cols: 90,
        cells: &[(1, 1), (2, 2), (2, 3), (3, 1), (3, 2)],
    },
    PatternEntry {
        name: "glider_gun",
        rows: 200,
        cols: 100,
        cells: &[
            (51, 76), (52, 74), (52, 76), (53, 64), (53, 65), (53, 72), (53, 73), (53, 86), (53, 87),
            (54, 63), (54, 67), (54, 72), (54, 73), (54, 86), (54, 87),
            (55, 52), (55, 53), (55, 62), (55, 68), (55, 72), (55, 73),
            (56, 52), (56, 53), (56, 62), (56, 66), (56, 68), (56, 69), (56, 74), (56, 76),
            (57, 62), (57, 68), (57, 76), (58, 63), (58, 67), (59, 64), (59, 65),
        ],
    },
    PatternEntry {
        name: "pulsar",
        rows: 17,
        cols: 17,
        cells: &[
            (2, 4), (2, 5), (2, 6), (7, 4), (7, 5), (7, 6), (9, 4), (9, 5), (9, 6), (14, 4), (14, 5), (14, 6),
            (2, 10), (2, 11), (2, 12), (7, 10), (7, 11), (7, 12), (9, 10), (9, 11), (9, 12), (14, 10), (14, 11), (14, 12),
            (4, 2), (5, 2), (6, 2), (4, 7), (5, 7), (6, 7), (4, 9), (5, 9), (6, 9), (4, 14), (5, 14), (6, 14),
            (10, 2), (11, 2), (12, 2), (10, 7), (11, 7), (12, 7), (10, 9), (11, 9), (12, 9), (10, 14), (11, 14), (12, 14),
        ],
    },
    PatternEntry {
        name: "space_ship",
        rows: 25,
        cols: 25,
        cells: &[
            (11, 13), (11, 14), (12, 11), (12, 12), (12, 14), (12, 15),
            (13, 11), (13, 12), (13, 13), (13, 14), (14, 12), (14, 13),
        ],
    },
    PatternEntry {
        name: "toad",
        rows: 6,
        cols: 6,
        cells: &[(2, 2), (2, 3), (2, 4), (3, 3), (3, 4), (3, 5)],
    },
    PatternEntry {
        name: "u",
        rows: 200,
        cols: 200,
        cells: &[
            (101, 101), (102, 102), (103, 102), (103, 101), (104, 103), (105, 103), (105, 102),
            (105, 101), (105, 105), (103, 105), (102, 105), (101, 105), (101, 104),
        ],
    },
];

/// Name → pattern lookup handed to the simulation at startup.
pub struct PatternCatalog {
    entries: &'static [PatternEntry],
}

impl PatternCatalog {
    pub fn builtin() -> Self {
        Self { entries: PATTERNS }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn lookup(&self, name: &str) -> Result<Pattern, ConfigError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| ConfigError::UnknownPattern {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(" "),
            })?;
        let dims = GridDims::new(entry.rows, entry.cols)?;
        Ok(Pattern::new(dims, entry.cells.to_vec()))
    }
}
