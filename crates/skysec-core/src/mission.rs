//! Mission records and the store they are read from

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MissionStoreError;
use crate::risk::{calculate_risk_score, RiskAssessment};

/// Placeholder asset name for missions without an assigned asset
pub const UNASSIGNED_ASSET: &str = "Unassigned";

/// A mission as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub mission_name: String,
    pub region: String,
    pub status: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,
}

impl Mission {
    /// Attach a risk assessment computed from the mission status
    pub fn enrich(&mut self, complexity: i64) -> RiskAssessment {
        let assessment = calculate_risk_score(&self.status, complexity);
        self.risk_assessment = Some(assessment);
        assessment
    }

    /// Case-insensitive region match
    pub fn in_region(&self, region: &str) -> bool {
        self.region.eq_ignore_ascii_case(region)
    }
}

/// Upstream source of mission records.
///
/// Reads are infallible by contract: an implementation that cannot reach its
/// upstream returns an empty list, so callers cannot tell "no missions" from
/// "store unavailable".
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Store identifier used in logs
    fn name(&self) -> &str;

    /// Currently active missions
    async fn active_missions(&self) -> Vec<Mission>;

    /// Set a mission's readiness status
    async fn update_mission_status(
        &self,
        mission_id: &str,
        status: &str,
    ) -> Result<(), MissionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLevel;

    fn mission(status: &str) -> Mission {
        Mission {
            id: "a0B5g00000XyZ1".to_string(),
            mission_name: "Northern Watch".to_string(),
            region: "EMEA".to_string(),
            status: status.to_string(),
            asset: UNASSIGNED_ASSET.to_string(),
            risk_assessment: None,
        }
    }

    #[test]
    fn test_enrich_attaches_assessment() {
        let mut m = mission("NOT_READY");
        let assessment = m.enrich(3);
        assert_eq!(assessment.score, 81.0);
        assert_eq!(m.risk_assessment.unwrap().risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_region_match_ignores_case() {
        let m = mission("READY");
        assert!(m.in_region("emea"));
        assert!(!m.in_region("APAC"));
    }

    #[test]
    fn test_serialization_omits_missing_assessment() {
        let json = serde_json::to_value(mission("READY")).unwrap();
        assert!(json.get("risk_assessment").is_none());
        assert_eq!(json["asset"], "Unassigned");
    }
}
