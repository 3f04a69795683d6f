#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod error;
mod prelude;
pub mod planner;

pub use config::TilerConfig;
pub use error::ConfigurationError;
pub use planner::{
    Algorithm, Approximation, CostProfile, CostTable, OptionalInputs, PartitionResult, QuantMode,
    ReductionMode, Regime, RoundMode, Tiler, TilingRequest, VariantAttributes, WorkloadShape,
};
pub use ubtile_core::{DataType, HardwareGeneration, HardwareProfile};

/// Name of this host, resolved once and used as the log line prefix.
pub fn hostname() -> &'static str {
    lazy_static::lazy_static! {
        static ref HOSTNAME: String = {
            match ::hostname::get() {
                Ok(s) => s.to_string_lossy().into_owned(),
                Err(_) => "<anonymous>".into(),
            }
        };
    };

    &*HOSTNAME
}

/// Install the `env_logger` backend. Safe to call more than once.
pub fn initialize_logger() {
    use std::time::Instant;

    lazy_static::lazy_static! {
        static ref START_TIMING: Instant = Instant::now();
    }

    let _ = *START_TIMING;

    let _ = env_logger::Builder::from_default_env()
        .format(|formatter, record| {
            use std::io::Write;
            let duration = START_TIMING.elapsed();

            writeln!(
                formatter,
                "[{} {} {:.06}] {}: {}",
                hostname(),
                record.module_path().unwrap_or("?"),
                duration.as_secs_f64(),
                record.level(),
                record.args(),
            )
        })
        .try_init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_initialize_logger_twice() {
        initialize_logger();
        initialize_logger();
        assert!(!hostname().is_empty());
    }
}
