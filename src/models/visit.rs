use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad device class recorded with each visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

/// Agent-string fragments that classify a visit as mobile.
const MOBILE_MARKERS: &[&str] = &["mobile", "android", "iphone", "ipad", "ipod"];

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mobile" => Some(DeviceClass::Mobile),
            "desktop" => Some(DeviceClass::Desktop),
            _ => None,
        }
    }

    /// Classify a client agent string by case-insensitive substring match.
    pub fn classify(agent: &str) -> Self {
        let lowered = agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|m| lowered.contains(m)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Client metadata captured at page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub agent: String,
    pub device: DeviceClass,
    pub url: String,
}

impl ClientMetadata {
    /// Build metadata from the raw agent string and the requested URL,
    /// classifying the device from the agent.
    pub fn from_request(agent: &str, url: &str) -> Self {
        Self {
            agent: agent.to_string(),
            device: DeviceClass::classify(agent),
            url: url.to_string(),
        }
    }
}

/// One immutable log entry per dashboard load. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: String,
    pub user_id: String,
    pub visit_time: DateTime<Utc>,
    pub visit_data: ClientMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iphone_agent_classifies_as_mobile() {
        let agent = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        assert_eq!(DeviceClass::classify(agent), DeviceClass::Mobile);
    }

    #[test]
    fn android_agent_classifies_as_mobile_case_insensitive() {
        assert_eq!(
            DeviceClass::classify("mozilla/5.0 (linux; ANDROID 14)"),
            DeviceClass::Mobile
        );
    }

    #[test]
    fn desktop_agent_classifies_as_desktop() {
        let agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";
        assert_eq!(DeviceClass::classify(agent), DeviceClass::Desktop);
    }

    #[test]
    fn device_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeviceClass::Mobile).unwrap(),
            "\"mobile\""
        );
        assert_eq!(DeviceClass::from_str("desktop"), Some(DeviceClass::Desktop));
        assert_eq!(DeviceClass::from_str("tablet"), None);
    }

    #[test]
    fn metadata_from_request_classifies_device() {
        let meta = ClientMetadata::from_request(
            "Mozilla/5.0 (iPad; CPU OS 17_0)",
            "https://care.marutham.example/profile",
        );
        assert_eq!(meta.device, DeviceClass::Mobile);
        assert_eq!(meta.url, "https://care.marutham.example/profile");
    }
}
