//! Mapping of algorithm attributes onto variant keys and buffer-cost profiles.
use crate::error::ConfigurationError;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use ubtile_core::{DataType, HardwareGeneration};

/// Input element types any algorithm family accepts.
pub const INPUT_DTYPES: [DataType; 3] = [DataType::F32, DataType::F16, DataType::BF16];

/// Target types of the quantizing family, in key order.
pub const QUANT_DTYPES: [DataType; 4] = [
    DataType::I8,
    DataType::F8E5M2,
    DataType::F8E4M3FN,
    DataType::HiF8,
];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Row-wise element-wise activation (gelu-like).
    Activation,
    /// Row reduction producing a loss gradient (cross-entropy-like).
    Loss,
    /// Activation followed by quantization to a narrow type.
    Quantize,
}

impl Algorithm {
    fn key_base(&self) -> i64 {
        match self {
            Algorithm::Activation => 10_000,
            Algorithm::Loss => 20_000,
            Algorithm::Quantize => 30_000,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Approximation {
    None,
    Tanh,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMode {
    None,
    Mean,
    Sum,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    Rint,
    Round,
    Hybrid,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum QuantMode {
    Static,
    Dynamic,
}

bitflags::bitflags! {
    /// Optional input tensors that are present in the request.
    #[derive(Default)]
    pub struct OptionalInputs: u8 {
        const WEIGHT = 0b001;
        const SCALE = 0b010;
        const OFFSET = 0b100;
    }
}

/// Settings that only apply to [`Algorithm::Quantize`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct QuantSettings {
    pub mode: QuantMode,
    pub dtype: DataType,
    pub round: RoundMode,
}

/// Discrete attributes of a tiling request that select a compiled code path.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct VariantAttributes {
    pub algorithm: Algorithm,
    pub dtype: DataType,
    pub approximate: Approximation,
    pub reduction: ReductionMode,
    pub quant: Option<QuantSettings>,
    pub optional_inputs: OptionalInputs,
    pub label_smoothing: bool,
}

impl VariantAttributes {
    fn base(algorithm: Algorithm, dtype: DataType) -> Self {
        Self {
            algorithm,
            dtype,
            approximate: Approximation::None,
            reduction: ReductionMode::None,
            quant: None,
            optional_inputs: OptionalInputs::empty(),
            label_smoothing: false,
        }
    }

    pub fn activation(dtype: DataType, approximate: Approximation) -> Self {
        Self {
            approximate,
            ..Self::base(Algorithm::Activation, dtype)
        }
    }

    pub fn loss(dtype: DataType, reduction: ReductionMode) -> Self {
        Self {
            reduction,
            ..Self::base(Algorithm::Loss, dtype)
        }
    }

    pub fn quantize(dtype: DataType, mode: QuantMode, target: DataType, round: RoundMode) -> Self {
        let quant = QuantSettings {
            mode,
            dtype: target,
            round,
        };

        Self {
            quant: Some(quant),
            ..Self::base(Algorithm::Quantize, dtype)
        }
    }

    pub fn with_inputs(mut self, inputs: OptionalInputs) -> Self {
        self.optional_inputs |= inputs;
        self
    }

    pub fn with_label_smoothing(mut self) -> Self {
        self.label_smoothing = true;
        self
    }
}

/// Row of the buffer-cost table a variant charges against.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CostProfile {
    ActivationErf,
    ActivationTanh,
    Loss,
    LossWeighted,
    QuantStatic,
    QuantDynamic,
}

impl CostProfile {
    pub const ALL: [CostProfile; 6] = [
        CostProfile::ActivationErf,
        CostProfile::ActivationTanh,
        CostProfile::Loss,
        CostProfile::LossWeighted,
        CostProfile::QuantStatic,
        CostProfile::QuantDynamic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CostProfile::ActivationErf => "activation_erf",
            CostProfile::ActivationTanh => "activation_tanh",
            CostProfile::Loss => "loss",
            CostProfile::LossWeighted => "loss_weighted",
            CostProfile::QuantStatic => "quant_static",
            CostProfile::QuantDynamic => "quant_dynamic",
        }
    }
}

impl Display for CostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of variant selection. Every later planning stage is conditioned on it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Variant {
    pub algorithm: Algorithm,
    pub dtype: DataType,
    pub generation: HardwareGeneration,
    pub cost_profile: CostProfile,

    /// Key of the variant without the regime digit.
    pub key: i64,

    /// Long rows are folded in power-of-two steps and need a fold plan.
    pub fold: bool,

    /// Partial results are combined across workers through the workspace.
    pub cross_core_reduce: bool,
}

macro_rules! unsupported {
    ($($arg:tt)*) => {
        return Err(ConfigurationError::UnsupportedVariant(format!($($arg)*)))
    };
}

/// Validate `attrs` and map them onto exactly one [`Variant`].
pub fn select_variant(
    attrs: &VariantAttributes,
    generation: HardwareGeneration,
) -> Result<Variant, ConfigurationError> {
    if !INPUT_DTYPES.contains(&attrs.dtype) {
        unsupported!("input type {} is not supported", attrs.dtype);
    }

    let inputs = attrs.optional_inputs;
    let (cost_profile, sub_key, fold, cross_core_reduce) = match attrs.algorithm {
        Algorithm::Activation => {
            if attrs.reduction != ReductionMode::None {
                unsupported!("activation does not reduce");
            }
            if attrs.quant.is_some() || attrs.label_smoothing || !inputs.is_empty() {
                unsupported!("activation takes no optional inputs or quantization settings");
            }

            match attrs.approximate {
                Approximation::None => (CostProfile::ActivationErf, 0, false, false),
                Approximation::Tanh => (CostProfile::ActivationTanh, 1, false, false),
            }
        }
        Algorithm::Loss => {
            if attrs.approximate != Approximation::None || attrs.quant.is_some() {
                unsupported!("loss takes no approximation or quantization settings");
            }
            if inputs.intersects(OptionalInputs::SCALE | OptionalInputs::OFFSET) {
                unsupported!("loss only accepts an optional weight");
            }

            let weighted = inputs.contains(OptionalInputs::WEIGHT);
            let reduction = match attrs.reduction {
                ReductionMode::None => 0,
                ReductionMode::Mean => 1,
                ReductionMode::Sum => 2,
            };

            let sub_key = reduction * 4 + weighted as i64 * 2 + attrs.label_smoothing as i64;
            let profile = if weighted {
                CostProfile::LossWeighted
            } else {
                CostProfile::Loss
            };

            (
                profile,
                sub_key,
                weighted && attrs.label_smoothing,
                attrs.reduction != ReductionMode::None,
            )
        }
        Algorithm::Quantize => {
            let quant = match attrs.quant {
                Some(q) => q,
                None => unsupported!("quantization requires a target type"),
            };

            if attrs.reduction != ReductionMode::None || attrs.label_smoothing {
                unsupported!("quantization does not reduce");
            }
            if attrs.approximate != Approximation::None {
                unsupported!("quantization does not approximate");
            }
            if inputs.contains(OptionalInputs::WEIGHT) {
                unsupported!("quantization takes no weight");
            }

            let target = match QUANT_DTYPES.iter().position(|&d| d == quant.dtype) {
                Some(index) => index as i64,
                None => unsupported!("cannot quantize to {}", quant.dtype),
            };

            let round_ok = match quant.dtype {
                DataType::HiF8 => matches!(quant.round, RoundMode::Round | RoundMode::Hybrid),
                _ => quant.round == RoundMode::Rint,
            };
            if !round_ok {
                unsupported!("round mode {:?} is not valid for {}", quant.round, quant.dtype);
            }

            if quant.dtype.is_float8() && generation != HardwareGeneration::RegBase {
                unsupported!("{} targets require the regbase generation", quant.dtype);
            }

            let profile = match quant.mode {
                QuantMode::Static => {
                    if !inputs.contains(OptionalInputs::SCALE) {
                        unsupported!("static quantization requires a scale");
                    }
                    CostProfile::QuantStatic
                }
                QuantMode::Dynamic => CostProfile::QuantDynamic,
            };

            let mode = match quant.mode {
                QuantMode::Static => 0,
                QuantMode::Dynamic => 1,
            };
            let round = match quant.round {
                RoundMode::Rint => 0,
                RoundMode::Round => 1,
                RoundMode::Hybrid => 2,
            };
            let offset = inputs.contains(OptionalInputs::OFFSET) as i64;

            (profile, mode * 50 + target * 10 + round * 2 + offset, false, false)
        }
    };

    let key = attrs.algorithm.key_base() + attrs.dtype.code() * 100 + sub_key;
    debug!(
        "selected variant {} ({}) for {:?} on {}",
        key, cost_profile, attrs.algorithm, generation
    );

    Ok(Variant {
        algorithm: attrs.algorithm,
        dtype: attrs.dtype,
        generation,
        cost_profile,
        key,
        fold,
        cross_core_reduce,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use HardwareGeneration::*;

    fn every_valid_attribute_set() -> Vec<VariantAttributes> {
        let mut out = vec![];

        for &dtype in &INPUT_DTYPES {
            for &approx in &[Approximation::None, Approximation::Tanh] {
                out.push(VariantAttributes::activation(dtype, approx));
            }

            for &reduction in &[ReductionMode::None, ReductionMode::Mean, ReductionMode::Sum] {
                let base = VariantAttributes::loss(dtype, reduction);
                out.push(base);
                out.push(base.with_label_smoothing());
                out.push(base.with_inputs(OptionalInputs::WEIGHT));
                out.push(base.with_inputs(OptionalInputs::WEIGHT).with_label_smoothing());
            }

            for &mode in &[QuantMode::Static, QuantMode::Dynamic] {
                for &(target, round) in &[
                    (DataType::I8, RoundMode::Rint),
                    (DataType::F8E5M2, RoundMode::Rint),
                    (DataType::F8E4M3FN, RoundMode::Rint),
                    (DataType::HiF8, RoundMode::Round),
                    (DataType::HiF8, RoundMode::Hybrid),
                ] {
                    let base = VariantAttributes::quantize(dtype, mode, target, round)
                        .with_inputs(OptionalInputs::SCALE);
                    out.push(base);
                    out.push(base.with_inputs(OptionalInputs::OFFSET));

                    if mode == QuantMode::Dynamic {
                        let unscaled = VariantAttributes::quantize(dtype, mode, target, round);
                        out.push(unscaled);
                        out.push(unscaled.with_inputs(OptionalInputs::OFFSET));
                    }
                }
            }
        }

        out
    }

    #[test]
    fn test_keys_are_unique() {
        let attrs = every_valid_attribute_set();
        let mut seen = HashMap::default();

        for a in &attrs {
            let variant = select_variant(a, RegBase).unwrap();
            assert!(variant.key >= 10_000 && variant.key < 40_000);
            assert_eq!(variant.key % 1000 / 100, a.dtype.code());

            // A key is shared only by attribute sets that differ in ignored inputs.
            if let Some(prev) = seen.insert(variant.key, *a) {
                let (x, y) = (prev, *a);
                assert_eq!(
                    (x.algorithm, x.quant, x.reduction, x.dtype),
                    (y.algorithm, y.quant, y.reduction, y.dtype)
                );
                assert_eq!(x.optional_inputs ^ y.optional_inputs, OptionalInputs::SCALE);
            }
        }
    }

    #[test]
    fn test_key_layout() {
        let attrs = VariantAttributes::activation(DataType::F32, Approximation::Tanh);
        let v = select_variant(&attrs, Classic).unwrap();
        assert_eq!(v.key, 10_001);
        assert_eq!(v.cost_profile, CostProfile::ActivationTanh);

        let attrs = VariantAttributes::loss(DataType::BF16, ReductionMode::Sum)
            .with_inputs(OptionalInputs::WEIGHT)
            .with_label_smoothing();
        let v = select_variant(&attrs, Classic).unwrap();
        assert_eq!(v.key, 20_000 + 200 + 2 * 4 + 2 + 1);
        assert_eq!(v.cost_profile, CostProfile::LossWeighted);
        assert!(v.fold);
        assert!(v.cross_core_reduce);

        let attrs = VariantAttributes::quantize(
            DataType::F16,
            QuantMode::Dynamic,
            DataType::HiF8,
            RoundMode::Hybrid,
        )
        .with_inputs(OptionalInputs::OFFSET);
        let v = select_variant(&attrs, RegBase).unwrap();
        assert_eq!(v.key, 30_000 + 100 + 50 + 30 + 4 + 1);
        assert_eq!(v.cost_profile, CostProfile::QuantDynamic);
        assert!(!v.fold && !v.cross_core_reduce);
    }

    #[test]
    fn test_rejects_unmapped_combinations() {
        let reject = |attrs: VariantAttributes, generation| {
            match select_variant(&attrs, generation) {
                Err(ConfigurationError::UnsupportedVariant(_)) => {}
                other => panic!("expected rejection of {:?}, got {:?}", attrs, other),
            }
        };
        let quantize = |target, round| {
            VariantAttributes::quantize(DataType::F32, QuantMode::Dynamic, target, round)
        };

        reject(VariantAttributes::activation(DataType::I32, Approximation::None), RegBase);
        reject(
            VariantAttributes::activation(DataType::F32, Approximation::None)
                .with_inputs(OptionalInputs::WEIGHT),
            RegBase,
        );
        reject(
            VariantAttributes::loss(DataType::F16, ReductionMode::Mean)
                .with_inputs(OptionalInputs::SCALE),
            RegBase,
        );

        // Static quantization without a scale.
        reject(
            VariantAttributes::quantize(
                DataType::F32,
                QuantMode::Static,
                DataType::I8,
                RoundMode::Rint,
            ),
            RegBase,
        );
        reject(quantize(DataType::I8, RoundMode::Round), RegBase);
        reject(quantize(DataType::HiF8, RoundMode::Rint), RegBase);
        reject(quantize(DataType::F8E5M2, RoundMode::Rint), Classic);
        reject(quantize(DataType::I32, RoundMode::Rint), RegBase);

        let mut missing_target = VariantAttributes::quantize(
            DataType::F32,
            QuantMode::Dynamic,
            DataType::I8,
            RoundMode::Rint,
        );
        missing_target.quant = None;
        reject(missing_target, RegBase);
    }

    #[test]
    fn test_int8_target_on_classic() {
        let attrs = VariantAttributes::quantize(
            DataType::F32,
            QuantMode::Static,
            DataType::I8,
            RoundMode::Rint,
        )
        .with_inputs(OptionalInputs::SCALE);
        let v = select_variant(&attrs, Classic).unwrap();
        assert_eq!(v.cost_profile, CostProfile::QuantStatic);
        assert_eq!(v.key, 30_000);
    }
}
