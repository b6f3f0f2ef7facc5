pub mod manager;
pub mod models;
pub mod radar;
#[cfg(test)]
mod tests;

pub use manager::RiskManager;
pub use models::*;
pub use radar::{
    AlertSeverity, RiskAlert, RiskLevel, RiskProfile, RiskRadar, RiskRadarCalculator,
    RiskTargetProfile,
};
