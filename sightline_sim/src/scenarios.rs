//! Simulation scenarios for the visual-delta pipeline.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: Staggered hand raises/lowers across a full grid
    HandRaiseStorm,

    /// SIM-002: Share start, slide advances, handoff to a second presenter
    PresenterHandoff,

    /// SIM-003: Joins and permanent leaves with short expiry
    TileChurn,

    /// SIM-004: Stationary tiles under heavy bbox jitter
    DriftField,

    /// SIM-005: Constant ground truth under isolated signal flicker
    FlickerNoise,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::HandRaiseStorm,
            ScenarioId::PresenterHandoff,
            ScenarioId::TileChurn,
            ScenarioId::DriftField,
            ScenarioId::FlickerNoise,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::HandRaiseStorm => "hand_raise_storm",
            ScenarioId::PresenterHandoff => "presenter_handoff",
            ScenarioId::TileChurn => "tile_churn",
            ScenarioId::DriftField => "drift_field",
            ScenarioId::FlickerNoise => "flicker_noise",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::HandRaiseStorm => {
                "9 tiles, staggered raises/lowers, event counts must equal true edges"
            }
            ScenarioId::PresenterHandoff => {
                "share start, slide advances, presenter handoff, one stop event"
            }
            ScenarioId::TileChurn => "joins and permanent leaves, handles unique, expiry clean",
            ScenarioId::DriftField => "heavy bbox jitter, no spurious handle mints",
            ScenarioId::FlickerNoise => "isolated signal flicker, zero hand events",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hand_raise_storm" | "sim-001" => Ok(ScenarioId::HandRaiseStorm),
            "presenter_handoff" | "sim-002" => Ok(ScenarioId::PresenterHandoff),
            "tile_churn" | "sim-003" => Ok(ScenarioId::TileChurn),
            "drift_field" | "sim-004" => Ok(ScenarioId::DriftField),
            "flicker_noise" | "sim-005" => Ok(ScenarioId::FlickerNoise),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
