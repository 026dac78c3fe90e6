// SDG taxonomy
// The sixteen fixed categories every record, artifact and metric is keyed by

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::AnalyticsError;

/// Sustainable Development Goal a course may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sdg {
    NoPoverty,
    ZeroHunger,
    GoodHealth,
    QualityEducation,
    GenderEquality,
    CleanWater,
    CleanEnergy,
    DecentWork,
    Industry,
    ReducedInequalities,
    SustainableCities,
    ResponsibleConsumption,
    ClimateAction,
    LifeBelowWater,
    LifeOnLand,
    PeaceJustice,
}

impl Sdg {
    pub const ALL: [Sdg; 16] = [
        Sdg::NoPoverty,
        Sdg::ZeroHunger,
        Sdg::GoodHealth,
        Sdg::QualityEducation,
        Sdg::GenderEquality,
        Sdg::CleanWater,
        Sdg::CleanEnergy,
        Sdg::DecentWork,
        Sdg::Industry,
        Sdg::ReducedInequalities,
        Sdg::SustainableCities,
        Sdg::ResponsibleConsumption,
        Sdg::ClimateAction,
        Sdg::LifeBelowWater,
        Sdg::LifeOnLand,
        Sdg::PeaceJustice,
    ];

    /// Goal number, 1 through 16
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    /// Canonical short key, e.g. "SDG 7"
    pub fn key(&self) -> String {
        format!("SDG {}", self.number())
    }

    /// Long form used by the annotation exports
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoPoverty => "1 - No Poverty",
            Self::ZeroHunger => "2 - Zero Hunger",
            Self::GoodHealth => "3 - Good Health and Well-Being",
            Self::QualityEducation => "4 - Quality Education",
            Self::GenderEquality => "5 - Gender Equality",
            Self::CleanWater => "6 - Clean Water and Sanitation",
            Self::CleanEnergy => "7 - Affordable and Clean Energy",
            Self::DecentWork => "8 - Decent Work and Economic Growth",
            Self::Industry => "9 - Industry, Innovation, and Infrastructure",
            Self::ReducedInequalities => "10 - Reduced Inequalities",
            Self::SustainableCities => "11 - Sustainable Cities and Communities",
            Self::ResponsibleConsumption => "12 - Responsible Consumption and Production",
            Self::ClimateAction => "13 - Climate Action",
            Self::LifeBelowWater => "14 - Life Below Water",
            Self::LifeOnLand => "15 - Life on Land",
            Self::PeaceJustice => "16 - Peace, Justice, and Strong Institutions",
        }
    }
}

impl fmt::Display for Sdg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDG {}", self.number())
    }
}

impl FromStr for Sdg {
    type Err = AnalyticsError;

    /// Accepts the short key ("SDG 7", "SDG-7") or the export description
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Some(sdg) = Self::ALL.iter().find(|sdg| sdg.description() == trimmed) {
            return Ok(*sdg);
        }

        trimmed
            .strip_prefix("SDG")
            .map(|rest| rest.trim_start_matches([' ', '-']))
            .and_then(|number| number.parse::<u8>().ok())
            .and_then(Self::from_number)
            .ok_or_else(|| AnalyticsError::UnknownCategory(s.to_string()))
    }
}

impl Serialize for Sdg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sdg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
