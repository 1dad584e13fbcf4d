use clap::ValueEnum;

use crate::import::{JlptLevel, LevelSelector};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    N5,
    N4,
    N3,
    N2,
    N1,
    /// Every level, easiest first
    All,
}

impl From<LevelArg> for LevelSelector {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::N5 => LevelSelector::One(JlptLevel::N5),
            LevelArg::N4 => LevelSelector::One(JlptLevel::N4),
            LevelArg::N3 => LevelSelector::One(JlptLevel::N3),
            LevelArg::N2 => LevelSelector::One(JlptLevel::N2),
            LevelArg::N1 => LevelSelector::One(JlptLevel::N1),
            LevelArg::All => LevelSelector::All,
        }
    }
}
