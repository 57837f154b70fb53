//! TEMPO collection IDs, fixed from CMR lookups made once at integration
//! time. We deliberately never call CMR from the ingestion path itself.

use aeris_common::Gas;

/// Default Harmony coverage variable: request every variable in the
/// collection rather than naming one.
pub const DEFAULT_VARIABLE: &str = "all";

pub fn collection_id(gas: Gas) -> &'static str {
    match gas {
        Gas::No2 => "C2930763263-LARC_CLOUD",
        Gas::Ch2o => "C2930763264-LARC_CLOUD",
        Gas::Ai => "C2930763265-LARC_CLOUD",
        Gas::Pm => "C2930763266-LARC_CLOUD",
        Gas::O3 => "C2930763267-LARC_CLOUD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_gas_has_a_collection_id() {
        for gas in Gas::ALL {
            assert!(!collection_id(gas).is_empty());
        }
    }
}
