//! Callsign-prefix classification (cargo vs. commercial)
//!
//! Pure and deterministic: the alert engine and the store both rely on the
//! same callsign always mapping to the same type.

use super::types::FlightType;

/// ICAO operator designators of well-known cargo carriers, used when the
/// configured tables do not match.
pub const BUILTIN_CARGO_PREFIXES: &[&str] = &[
    "FDX", // FedEx
    "UPS", // UPS Airlines
    "GTI", // Atlas Air
    "CLX", // Cargolux
    "ABW", // AirBridgeCargo
    "BOX", // AeroLogic
    "DHK", // DHL Air UK
    "DHX", // DHL International
    "BCS", // European Air Transport
    "GEC", // Lufthansa Cargo
    "CKS", // Kalitta Air
    "NCA", // Nippon Cargo
    "CAO", // Air China Cargo
    "MAA", // MasAir
    "ESF", // Estafeta
    "QAC", // Qatar Airways Cargo
    "AJT", // Amerijet
    "ABX", // ABX Air
    "ATN", // Air Transport International
    "WGN", // Western Global
];

/// Configured cargo/commercial prefixes, uppercase, immutable after startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorPrefixTable {
    cargo: Vec<String>,
    commercial: Vec<String>,
}

impl OperatorPrefixTable {
    pub fn new(cargo: Vec<String>, commercial: Vec<String>) -> Self {
        Self {
            cargo: normalize_prefixes(cargo),
            commercial: normalize_prefixes(commercial),
        }
    }

    pub fn cargo(&self) -> &[String] {
        &self.cargo
    }

    pub fn commercial(&self) -> &[String] {
        &self.commercial
    }
}

fn normalize_prefixes(prefixes: Vec<String>) -> Vec<String> {
    prefixes
        .into_iter()
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: OperatorPrefixTable,
}

impl Classifier {
    pub fn new(table: OperatorPrefixTable) -> Self {
        Self { table }
    }

    /// Classify a callsign
    ///
    /// Check order (first match wins):
    /// 1. configured cargo prefixes
    /// 2. configured commercial prefixes
    /// 3. built-in cargo prefixes
    /// 4. otherwise commercial
    ///
    /// Only a blank callsign is `Unknown`.
    pub fn classify(&self, callsign: &str) -> FlightType {
        let callsign = callsign.trim().to_uppercase();
        if callsign.is_empty() {
            return FlightType::Unknown;
        }

        if self.table.cargo.iter().any(|p| callsign.starts_with(p.as_str())) {
            return FlightType::Cargo;
        }
        if self.table.commercial.iter().any(|p| callsign.starts_with(p.as_str())) {
            return FlightType::Commercial;
        }
        if BUILTIN_CARGO_PREFIXES.iter().any(|p| callsign.starts_with(p)) {
            return FlightType::Cargo;
        }

        FlightType::Commercial
    }
}
