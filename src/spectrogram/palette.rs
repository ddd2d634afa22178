//! Color maps

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::error::SonogramError;

pub type Color = Rgb<u8>;

/// Number of entries sampled from each gradient.
pub const PALETTE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    #[default]
    Inferno,
    Magma,
    Plasma,
    Viridis,
    Greys,
}

impl ColorMap {
    pub const ALL: [ColorMap; 5] = [
        ColorMap::Inferno,
        ColorMap::Magma,
        ColorMap::Plasma,
        ColorMap::Viridis,
        ColorMap::Greys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorMap::Inferno => "inferno",
            ColorMap::Magma => "magma",
            ColorMap::Plasma => "plasma",
            ColorMap::Viridis => "viridis",
            ColorMap::Greys => "greys",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn gradient(&self) -> colorous::Gradient {
        match self {
            ColorMap::Inferno => colorous::INFERNO,
            ColorMap::Magma => colorous::MAGMA,
            ColorMap::Plasma => colorous::PLASMA,
            ColorMap::Viridis => colorous::VIRIDIS,
            // dark for quiet, light for loud
            ColorMap::Greys => colorous::GREYS,
        }
    }

    /// Ordered color table, quietest first.
    pub fn palette(&self) -> Vec<Color> {
        let gradient = self.gradient();
        let mut colors: Vec<Color> = (0..PALETTE_SIZE)
            .map(|i| {
                let c = gradient.eval_rational(i, PALETTE_SIZE);
                Rgb([c.r, c.g, c.b])
            })
            .collect();
        if *self == ColorMap::Greys {
            colors.reverse();
        }
        colors
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMap {
    type Err = SonogramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s).ok_or_else(|| SonogramError::unsupported(format!("unknown color map: {}", s)))
    }
}
