//! Window functions applied to each analysis frame

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SonogramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowFunction {
    #[default]
    #[serde(rename = "hann")]
    Hann,
    #[serde(rename = "hamming")]
    Hamming,
    #[serde(rename = "bartlett")]
    Bartlett,
    #[serde(rename = "blackman")]
    Blackman,
    #[serde(rename = "flatTop")]
    FlatTop,
    #[serde(rename = "rectangular")]
    Rectangular,
}

impl WindowFunction {
    pub const ALL: [WindowFunction; 6] = [
        WindowFunction::Hann,
        WindowFunction::Hamming,
        WindowFunction::Bartlett,
        WindowFunction::Blackman,
        WindowFunction::FlatTop,
        WindowFunction::Rectangular,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::Hann => "hann",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Bartlett => "bartlett",
            WindowFunction::Blackman => "blackman",
            WindowFunction::FlatTop => "flatTop",
            WindowFunction::Rectangular => "rectangular",
        }
    }

    /// Look a window up by name; `None` if the name is not recognized.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }

    /// Symmetric coefficients of length `len`.
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        if len == 1 {
            return vec![1.0];
        }
        let span = (len - 1) as f64;

        (0..len)
            .map(|n| {
                let x = n as f64 / span;
                match self {
                    WindowFunction::Hann => 0.5 - 0.5 * (2.0 * PI * x).cos(),
                    WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                    WindowFunction::Bartlett => 1.0 - (2.0 * x - 1.0).abs(),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                    WindowFunction::FlatTop => {
                        0.215_578_95 - 0.416_631_58 * (2.0 * PI * x).cos()
                            + 0.277_263_158 * (4.0 * PI * x).cos()
                            - 0.083_578_947 * (6.0 * PI * x).cos()
                            + 0.006_947_368 * (8.0 * PI * x).cos()
                    }
                    WindowFunction::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowFunction {
    type Err = SonogramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s).ok_or_else(|| SonogramError::unsupported(format!("unknown window function: {}", s)))
    }
}
