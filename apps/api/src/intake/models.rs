use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Applicant intake form. Every field is optional; the web form fills what
/// the applicant answered and the LLM sees only the answered fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeData {
    // Personal & contact
    pub nationality: Option<String>,
    pub citizenship_country: Option<String>,
    pub current_residence_country: Option<String>,
    pub applying_from_country: Option<String>,
    pub age: Option<i32>,
    pub marital_status: Option<String>,
    pub spouse_nationality: Option<String>,
    pub spouse_profession: Option<String>,
    pub dependents: Option<i32>,
    pub contact_methods: Option<Vec<String>>,
    pub wants_lawyer_consultation: Option<bool>,

    // Destination & timeline
    pub preferred_destinations: Option<String>,
    pub migration_timeline: Option<String>,
    pub commitment_level: Option<String>,
    pub target_timeline: Option<String>,
    pub target_move_date: Option<String>,
    pub deadline_hard: Option<bool>,
    pub deadline_reason: Option<String>,
    pub willing_to_consider_alternatives: Option<bool>,
    pub alternative_countries: Option<Vec<String>>,

    // Education
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    pub degrees: Option<Vec<String>>,
    pub has_academic_transcripts: Option<bool>,
    pub has_admission_offer: Option<bool>,
    pub admission_details: Option<String>,
    pub professional_certifications: Option<Vec<String>>,

    // Work experience
    pub current_job_title: Option<String>,
    pub current_employer: Option<String>,
    pub industry: Option<String>,
    pub total_experience_years: Option<f64>,
    pub experience_years_in_position: Option<f64>,
    pub is_self_employed: Option<bool>,
    pub business_management_experience: Option<bool>,
    pub is_business_owner: Option<bool>,
    pub employer_willing_to_sponsor: Option<bool>,
    pub has_job_offer_international: Option<bool>,

    // Skills & language
    pub skills: Option<Vec<String>>,
    pub languages_known: Option<Vec<String>>,
    pub language_tests_taken: Option<Vec<String>>,
    pub language_scores: Option<Map<String, Value>>,

    // Immigration history
    pub has_prior_visa_applications: Option<bool>,
    pub prior_visas: Option<Vec<String>>,
    pub has_active_visas: Option<bool>,
    pub current_visa_status: Option<String>,
    pub current_visa_country: Option<String>,
    pub current_visa_expiry: Option<String>,
    pub has_overstays: Option<bool>,
    pub overstay_details: Option<String>,
    pub criminal_records: Option<bool>,
    pub has_relatives_in_destination: Option<bool>,

    // Financial
    pub max_budget_usd: Option<f64>,
    pub budget_currency: Option<String>,
    pub budget_amount: Option<f64>,
    pub proof_of_funds_source: Option<String>,
    pub liquid_assets_usd: Option<f64>,
    pub has_property: Option<bool>,
    pub total_assets_usd: Option<f64>,
    pub annual_income_usd: Option<f64>,
    pub salary_usd: Option<f64>,

    // Special items / support
    pub has_special_needs: Option<bool>,
    pub has_medical_conditions: Option<bool>,
    pub has_invitation: Option<bool>,
    pub sponsor_in_destination: Option<bool>,
    pub international_achievements: Option<Vec<String>>,
    pub publications_count: Option<i32>,
    pub patents_count: Option<i32>,
    pub awards: Option<Vec<String>>,
    pub media_features: Option<Vec<String>>,
    pub professional_memberships: Option<Vec<String>>,
    pub recommendation_letters_count: Option<i32>,

    // Documents
    pub passport_expiry: Option<String>,
    pub has_birth_certificate: Option<bool>,
    pub has_financial_statements: Option<bool>,
    pub has_police_clearance: Option<bool>,
    pub has_medical_exam: Option<bool>,

    // Meta
    pub risk_tolerance: Option<String>,
    pub prefers_diy_or_guided: Option<String>,
}

impl IntakeData {
    /// JSON object holding only the answered fields (keys sorted).
    pub fn answered_fields(&self) -> Value {
        let mut object = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        object.retain(|_, v| !v.is_null());
        Value::Object(object)
    }
}

/// Body of `POST /intakes`.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeCreate {
    pub user_id: Option<String>,
    #[serde(default)]
    pub intake: IntakeData,
}

/// A stored intake, returned by the intake endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub payload: IntakeData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_are_ignored() {
        let intake: IntakeData = serde_json::from_value(serde_json::json!({
            "nationality": "Nigerian",
            "favourite_colour": "blue"
        }))
        .unwrap();
        assert_eq!(intake.nationality.as_deref(), Some("Nigerian"));
    }

    #[test]
    fn test_answered_fields_drops_nulls() {
        let intake = IntakeData {
            nationality: Some("Ghanaian".into()),
            age: Some(29),
            skills: Some(vec!["nursing".into()]),
            ..Default::default()
        };
        let answered = intake.answered_fields();
        let object = answered.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["age"], 29);
        assert!(!object.contains_key("dependents"));
    }

    #[test]
    fn test_intake_create_defaults_missing_intake() {
        let create: IntakeCreate = serde_json::from_str(r#"{"user_id": "u-1"}"#).unwrap();
        assert_eq!(create.intake, IntakeData::default());
        assert_eq!(create.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_language_scores_accepts_arbitrary_object() {
        let intake: IntakeData = serde_json::from_value(serde_json::json!({
            "language_scores": {"IELTS": 7.5, "TEF": {"listening": 300}}
        }))
        .unwrap();
        let scores = intake.language_scores.unwrap();
        assert_eq!(scores["IELTS"], 7.5);
    }
}
