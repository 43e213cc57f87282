//! Summary-generation flow: serialize the patient's record history into a
//! structured prompt, request one completion, and optionally hand the
//! result to the mail flow.
//!
//! Provider failures carry no structured code contract; they are mapped
//! to the user-facing taxonomy by substring match on the provider's
//! message.

pub mod gemini;
pub mod prompt;

pub use gemini::{GeminiClient, MockGenerator, TextGenerator};

use crate::models::ProfileRecord;

/// User-facing failure taxonomy for the summary flow.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,
    #[error("API key is not configured correctly")]
    BadApiKey,
    #[error("API quota exceeded. Please try again later")]
    QuotaExceeded,
    #[error("Network error. Please check your connection")]
    Network,
    #[error("{0}")]
    Provider(String),
}

/// Map a provider error message onto the taxonomy by substring match.
pub fn classify_provider_message(message: &str) -> SummaryError {
    let lowered = message.to_lowercase();
    if lowered.contains("api key") {
        SummaryError::BadApiKey
    } else if lowered.contains("quota") || lowered.contains("resource_exhausted") {
        SummaryError::QuotaExceeded
    } else if lowered.contains("network") {
        SummaryError::Network
    } else {
        SummaryError::Provider(message.to_string())
    }
}

/// The summary flow is only offered once the patient has saved at least
/// one profile; with no history there is nothing to narrate.
pub fn analysis_available(history: &[ProfileRecord]) -> bool {
    !history.is_empty()
}

/// Run the flow: build the prompt from the record collections and request
/// a single completion. No retry on failure.
pub async fn generate_summary(
    generator: &impl TextGenerator,
    history: &[ProfileRecord],
    visits: &[crate::models::VisitRecord],
    vitals: &[crate::models::VitalsReading],
) -> Result<String, SummaryError> {
    let prompt = prompt::build_summary_prompt(history, visits, vitals);
    generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> ProfileRecord {
        ProfileRecord {
            user_id: "pat@example.com".into(),
            title: title.into(),
            description: "Weekly headaches".into(),
            category: "female".into(),
            notes: "none".into(),
            updated_at: "2026-03-01T09:30:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn analysis_requires_history() {
        assert!(!analysis_available(&[]));
        assert!(analysis_available(&[record("Migraines")]));
    }

    #[test]
    fn provider_messages_map_by_substring() {
        assert!(matches!(
            classify_provider_message("API key not valid. Please pass a valid API key."),
            SummaryError::BadApiKey
        ));
        assert!(matches!(
            classify_provider_message("Quota exceeded for quota metric"),
            SummaryError::QuotaExceeded
        ));
        assert!(matches!(
            classify_provider_message("RESOURCE_EXHAUSTED"),
            SummaryError::QuotaExceeded
        ));
        assert!(matches!(
            classify_provider_message("network unreachable"),
            SummaryError::Network
        ));
        match classify_provider_message("model is overloaded") {
            SummaryError::Provider(msg) => assert_eq!(msg, "model is overloaded"),
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn flow_feeds_records_into_the_generator() {
        let generator = MockGenerator::new("A calm narrative.");
        let history = [record("Recurring migraines")];
        let summary = generate_summary(&generator, &history, &[], &[])
            .await
            .unwrap();
        assert_eq!(summary, "A calm narrative.");

        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Recurring migraines"));
        assert!(prompt.contains("Profile History:"));
    }
}
