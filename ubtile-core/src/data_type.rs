//! Defines the element types a tiling request can refer to.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Element type of the tensors being partitioned.
///
/// The discriminant is stable and doubles as the dtype offset inside tiling keys, so new
/// variants must only ever be appended.
#[derive(
    IntoPrimitive,
    TryFromPrimitive,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Debug,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DataType {
    F32 = 0,
    F16 = 1,
    BF16 = 2,
    I8 = 3,
    I32 = 4,
    I64 = 5,
    F8E5M2 = 6,
    F8E4M3FN = 7,
    HiF8 = 8,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::F32,
        DataType::F16,
        DataType::BF16,
        DataType::I8,
        DataType::I32,
        DataType::I64,
        DataType::F8E5M2,
        DataType::F8E4M3FN,
        DataType::HiF8,
    ];

    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> i64 {
        use DataType::*;

        match self {
            F32 | I32 => 4,
            F16 | BF16 => 2,
            I64 => 8,
            I8 | F8E5M2 | F8E4M3FN | HiF8 => 1,
        }
    }

    /// Stable numeric code of this type.
    pub fn code(&self) -> i64 {
        u8::from(*self) as i64
    }

    pub fn name(&self) -> &'static str {
        use DataType::*;

        match self {
            F32 => "f32",
            F16 => "f16",
            BF16 => "bf16",
            I8 => "i8",
            I32 => "i32",
            I64 => "i64",
            F8E5M2 => "f8e5m2",
            F8E4M3FN => "f8e4m3fn",
            HiF8 => "hif8",
        }
    }

    /// 8-bit float formats (`F8E5M2`, `F8E4M3FN` and `HiF8`).
    pub fn is_float8(&self) -> bool {
        matches!(
            self,
            DataType::F8E5M2 | DataType::F8E4M3FN | DataType::HiF8
        )
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
