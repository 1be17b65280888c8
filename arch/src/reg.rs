use num_enum::{FromPrimitive, IntoPrimitive};
use strum::{Display, EnumString};

use crate::word::Word;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, IntoPrimitive, EnumString, Display,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    /// Global base
    #[strum(to_string = "R6", serialize = "GB")]
    R6,
    /// Stack pointer
    #[strum(to_string = "R7", serialize = "SP")]
    R7,
}

impl Reg {
    pub const GB: Reg = Reg::R6;
    pub const SP: Reg = Reg::R7;

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(r) => Ok(r),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }

    /// Register held in the low three bits of `field`.
    pub fn from_field(field: Word) -> Self {
        Reg::from((field & 0b111) as u8)
    }

    pub fn bits(self) -> Word {
        u8::from(self) as Word
    }
}
