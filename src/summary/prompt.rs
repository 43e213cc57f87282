//! Prompt and mail-body templating for the summary flow.

use serde::Serialize;

use crate::models::{ProfileRecord, VisitRecord, VitalsReading};

/// Subject line for the emailed copy.
pub const EMAIL_SUBJECT: &str = "Your Health History Summary - Marutham Care";

/// Dated view of one profile row as the model sees it.
#[derive(Serialize)]
struct ProfileEntry<'a> {
    date: String,
    title: &'a str,
    description: &'a str,
    category: &'a str,
    notes: &'a str,
}

#[derive(Serialize)]
struct VisitEntry {
    date: String,
    device: &'static str,
}

#[derive(Serialize)]
struct VitalsEntry<'a> {
    subject: &'a str,
    heart_rate: f64,
    oxygen_saturation: f64,
    condition: &'a str,
}

/// Serialize the three record collections into the structured prompt.
pub fn build_summary_prompt(
    history: &[ProfileRecord],
    visits: &[VisitRecord],
    vitals: &[VitalsReading],
) -> String {
    let profile_entries: Vec<ProfileEntry<'_>> = history
        .iter()
        .map(|p| ProfileEntry {
            date: p.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            title: &p.title,
            description: &p.description,
            category: &p.category,
            notes: &p.notes,
        })
        .collect();

    let visit_entries: Vec<VisitEntry> = visits
        .iter()
        .map(|v| VisitEntry {
            date: v.visit_time.format("%Y-%m-%d %H:%M").to_string(),
            device: v.visit_data.device.as_str(),
        })
        .collect();

    let vitals_entries: Vec<VitalsEntry<'_>> = vitals
        .iter()
        .map(|r| VitalsEntry {
            subject: &r.subject_id,
            heart_rate: r.heart_rate,
            oxygen_saturation: r.oxygen_saturation,
            condition: &r.condition,
        })
        .collect();

    let profiles_json = serde_json::to_string_pretty(&profile_entries)
        .unwrap_or_else(|_| "[]".to_string());
    let visits_json =
        serde_json::to_string_pretty(&visit_entries).unwrap_or_else(|_| "[]".to_string());
    let vitals_json =
        serde_json::to_string_pretty(&vitals_entries).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Analyze the following patient history data and provide insights:\n\
         \n\
         Profile History:\n\
         {profiles_json}\n\
         \n\
         Visit History:\n\
         {visits_json}\n\
         \n\
         Latest Device Vitals:\n\
         {vitals_json}\n\
         \n\
         Please provide:\n\
         1. Problem title and description patterns\n\
         2. Changes in the reported problems over time\n\
         3. Key symptoms and concerns mentioned\n\
         4. Health progression insights\n\
         5. Suggestions to discuss with the care team\n\
         \n\
         Format the response in a clear, concise manner with bullet points."
    )
}

/// Build the HTML body for the emailed copy: greeting, one paragraph per
/// summary line, team signature.
pub fn build_email_html(recipient_name: &str, summary: &str) -> String {
    let paragraphs: String = summary
        .lines()
        .map(|line| format!("<p>{line}</p>"))
        .collect();

    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\n\
           <h2 style=\"color: #2563eb;\">Health History Summary</h2>\n\
           <p>Dear {recipient_name},</p>\n\
           <p>Here is your health history summary as requested:</p>\n\
           <div style=\"background-color: #f3f4f6; padding: 20px; border-radius: 8px; margin: 20px 0;\">\n\
             {paragraphs}\n\
           </div>\n\
           <p>Best regards,<br>Marutham Care Team</p>\n\
         </div>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientMetadata;

    fn record() -> ProfileRecord {
        ProfileRecord {
            user_id: "pat@example.com".into(),
            title: "Recurring migraines".into(),
            description: "Weekly headaches".into(),
            category: "female".into(),
            notes: "Worse in the mornings".into(),
            updated_at: "2026-03-01T09:30:00Z".parse().unwrap(),
        }
    }

    fn visit() -> VisitRecord {
        VisitRecord {
            id: "v1".into(),
            user_id: "pat@example.com".into(),
            visit_time: "2026-03-02T08:00:00Z".parse().unwrap(),
            visit_data: ClientMetadata::from_request("Mozilla/5.0 (iPhone)", "/profile"),
        }
    }

    fn reading() -> VitalsReading {
        VitalsReading {
            id: 1,
            subject_id: "PD01".into(),
            display_name: "Rahul".into(),
            heart_rate: 78.0,
            oxygen_saturation: 97.5,
            active: true,
            recorded_at: 1_767_000_000,
            condition: "Normal".into(),
        }
    }

    #[test]
    fn prompt_contains_all_three_collections() {
        let prompt = build_summary_prompt(&[record()], &[visit()], &[reading()]);
        assert!(prompt.contains("Profile History:"));
        assert!(prompt.contains("Visit History:"));
        assert!(prompt.contains("Latest Device Vitals:"));
        assert!(prompt.contains("Recurring migraines"));
        assert!(prompt.contains("\"device\": \"mobile\""));
        assert!(prompt.contains("PD01"));
        assert!(prompt.contains("bullet points"));
    }

    #[test]
    fn prompt_lists_the_five_requested_insights() {
        let prompt = build_summary_prompt(&[record()], &[], &[]);
        for n in 1..=5 {
            assert!(prompt.contains(&format!("{n}. ")), "missing item {n}");
        }
    }

    #[test]
    fn prompt_dates_are_human_readable() {
        let prompt = build_summary_prompt(&[record()], &[], &[]);
        assert!(prompt.contains("2026-03-01 09:30"));
    }

    #[test]
    fn email_html_wraps_each_line_in_a_paragraph() {
        let html = build_email_html("Pat", "First insight\nSecond insight");
        assert!(html.contains("<p>Dear Pat,</p>"));
        assert!(html.contains("<p>First insight</p>"));
        assert!(html.contains("<p>Second insight</p>"));
        assert!(html.contains("Marutham Care Team"));
    }
}
