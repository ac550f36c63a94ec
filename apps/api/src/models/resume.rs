use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::models::submission::SubmissionInput;

/// Namespace for resume records in the key-value store.
pub const RESUME_KEY_PREFIX: &str = "resume:";

/// Structured analysis result. Always a JSON object once parsed.
pub type Feedback = Map<String, Value>;

/// The durable resume-analysis record, stored as JSON under `resume:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    /// Empty until analysis completes.
    #[serde(default, deserialize_with = "deserialize_feedback")]
    pub feedback: Option<Feedback>,
}

impl ResumeRecord {
    /// Builds the first version of a record: both uploads done, no feedback yet.
    pub fn new(
        id: String,
        resume_path: String,
        image_path: String,
        input: &SubmissionInput,
    ) -> Self {
        Self {
            id,
            resume_path,
            image_path,
            company_name: input.company_name.clone(),
            job_title: input.job_title.clone(),
            job_description: input.job_description.clone(),
            feedback: None,
        }
    }

    pub fn key(&self) -> String {
        resume_key(&self.id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

pub fn resume_key(id: &str) -> String {
    format!("{RESUME_KEY_PREFIX}{id}")
}

/// Where the caller should send the user once the record is complete.
pub fn results_path(id: &str) -> String {
    format!("/resume/{id}")
}

// Older clients persisted the pending state as `"feedback": ""`.
fn deserialize_feedback<'de, D>(deserializer: D) -> Result<Option<Feedback>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(de::Error::custom(format!(
            "feedback must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_record() -> ResumeRecord {
        let input = SubmissionInput {
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            document: None,
        };
        ResumeRecord::new(
            "abc-123".to_string(),
            "uploads/1/cv.pdf".to_string(),
            "uploads/2/cv.png".to_string(),
            &input,
        )
    }

    #[test]
    fn test_key_is_namespaced_by_id() {
        assert_eq!(make_record().key(), "resume:abc-123");
        assert_eq!(resume_key("x"), "resume:x");
    }

    #[test]
    fn test_results_path_contains_id() {
        assert_eq!(results_path("abc-123"), "/resume/abc-123");
    }

    #[test]
    fn test_record_survives_json_round_trip_with_feedback() {
        let mut record = make_record();
        let json = record.to_json().unwrap();
        assert_eq!(ResumeRecord::from_json(&json).unwrap(), record);

        record.feedback = json!({"score": 80, "tips": ["quantify impact"]})
            .as_object()
            .cloned();
        let json = record.to_json().unwrap();
        assert_eq!(ResumeRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_record_uses_camel_case_field_names() {
        let value: Value = serde_json::from_str(&make_record().to_json().unwrap()).unwrap();
        assert_eq!(value["resumePath"], "uploads/1/cv.pdf");
        assert_eq!(value["imagePath"], "uploads/2/cv.png");
        assert_eq!(value["companyName"], "Acme");
        assert!(value["feedback"].is_null());
    }

    #[test]
    fn test_empty_string_feedback_reads_as_pending() {
        let raw = r#"{
            "id": "old",
            "resumePath": "a.pdf",
            "imagePath": "a.png",
            "companyName": "",
            "jobTitle": "",
            "jobDescription": "",
            "feedback": ""
        }"#;
        let record = ResumeRecord::from_json(raw).unwrap();
        assert!(record.feedback.is_none());
    }

    #[test]
    fn test_missing_feedback_field_reads_as_pending() {
        let raw = r#"{"id":"x","resumePath":"a","imagePath":"b","companyName":"","jobTitle":"","jobDescription":""}"#;
        assert!(ResumeRecord::from_json(raw).unwrap().feedback.is_none());
    }

    #[test]
    fn test_non_object_feedback_is_rejected() {
        let raw = r#"{"id":"x","resumePath":"a","imagePath":"b","companyName":"","jobTitle":"","jobDescription":"","feedback":"great resume"}"#;
        assert!(ResumeRecord::from_json(raw).is_err());
    }
}
