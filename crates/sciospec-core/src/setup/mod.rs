//! Measurement Setup
//!
//! Semantic configuration of a sweep and of the measurement frontend, as
//! supplied by callers and configuration files. The byte-level encoding
//! lives in [`encoder`].
//!
//! Every option enum parses from (and displays as) the spelling used in
//! configuration files, e.g. `"10k"` for the 10 kΩ current range or
//! `"0.09"` for the 90 mV voltage range. Unknown spellings fail with
//! [`ProtocolError::UnsupportedOption`].

pub mod encoder;

pub use encoder::{encode_frontend, encode_setup, encode_sweep};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::protocol::{ProtocolError, MAX_FREQUENCY_COUNT};

/// Declares a configuration option enum together with its textual
/// spellings. The first spelling is canonical; matching ignores case.
macro_rules! option_enum {
    (@first $first:literal $(, $rest:literal)*) => { $first };
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => [$($spelling:literal),+] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Canonical spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => option_enum!(@first $($spelling),+) ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $(
                    if [$($spelling),+].iter().any(|sp| sp.eq_ignore_ascii_case(wanted)) {
                        return Ok($name::$variant);
                    }
                )+
                Err(ProtocolError::UnsupportedOption {
                    field: $field,
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ProtocolError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// Frequency spacing between sweep points
    Scale, "scale" {
        Linear => ["Linear", "lin"],
        Logarithmic => ["Logarithmic", "log"],
    }
}

option_enum! {
    /// Measurement precision (trades speed for averaging)
    Precision, "precision" {
        Low => ["Low"],
        Medium => ["Medium"],
        High => ["High"],
        VeryHigh => ["VeryHigh", "very_high"],
    }
}

option_enum! {
    /// Electrode configuration
    MeasurementMode, "mode" {
        TwoPoint => ["TwoPoint", "2pt"],
        ThreePoint => ["ThreePoint", "3pt"],
        FourPoint => ["FourPoint", "4pt"],
    }
}

option_enum! {
    /// Physical port the frontend measures on
    Channel, "channel" {
        Bnc => ["BNC"],
        Ext1 => ["Ext1"],
        Ext2 => ["Ext2"],
    }
}

option_enum! {
    /// Current measurement range (shunt resistor)
    CurrentRange, "current_range" {
        Auto => ["Auto"],
        /// 100 Ω
        R100 => ["100"],
        /// 10 kΩ
        R10k => ["10k"],
        /// 1 MΩ
        R1M => ["1M"],
        /// 100 MΩ
        R100M => ["100M"],
    }
}

option_enum! {
    /// Voltage measurement range
    VoltageRange, "voltage_range" {
        Auto => ["Auto"],
        /// 1 V
        R1V => ["1"],
        /// 90 mV
        #[allow(non_camel_case_types)]
        R0_09V => ["0.09"],
    }
}

/// Frequency sweep definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencySweep {
    /// First frequency in Hz
    pub start_freq: f32,
    /// Last frequency in Hz
    pub end_freq: f32,
    /// Number of sweep points, 1..=61
    pub count: u8,
    /// Point spacing
    pub scale: Scale,
}

impl FrequencySweep {
    /// Create a validated sweep
    pub fn new(start_freq: f32, end_freq: f32, count: u8, scale: Scale) -> Result<Self, ProtocolError> {
        let sweep = Self {
            start_freq,
            end_freq,
            count,
            scale,
        };
        sweep.validate()?;
        Ok(sweep)
    }

    /// Check that the point count fits one setup frame
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.count == 0 || self.count > MAX_FREQUENCY_COUNT {
            return Err(ProtocolError::InvalidSweep {
                count: self.count,
                max: MAX_FREQUENCY_COUNT,
            });
        }
        Ok(())
    }
}

/// Sweep plus excitation settings, sent as one set-setup frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetupConfiguration {
    /// Frequency sweep
    pub sweep: FrequencySweep,
    /// Measurement precision
    pub precision: Precision,
    /// Excitation amplitude in volts
    pub amplitude_volts: f32,
}

/// Frontend settings, sent under the set-frontend tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendConfiguration {
    /// Electrode configuration
    pub mode: MeasurementMode,
    /// Measurement port
    pub channel: Channel,
    /// Current range
    pub current_range: CurrentRange,
    /// Voltage range; without one the frontend frame is not sent
    #[serde(default)]
    pub voltage_range: Option<VoltageRange>,
}
