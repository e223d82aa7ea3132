/// Types for admission progress data
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::catalog::PhaseKey;
use super::overlays::PhaseOverlays;

/// Identifier as sent by the CRM backend (numeric or string keys both occur)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for RecordId {
    /// Numeric text becomes `Int`, matching how the CRM sends numeric keys.
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse()
            .map(RecordId::Int)
            .unwrap_or_else(|_| RecordId::Text(raw.to_string()))
    }
}

/// Document tag. Tags outside the phase-relevant set are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    Passport,
    AcademicTranscript,
    RecommendationLetter,
    StatementOfPurpose,
    EnglishTestScore,
    CvResume,
    FinancialStatement,
    MedicalCertificate,
    Other(String),
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Passport => "PASSPORT",
            DocumentType::AcademicTranscript => "ACADEMIC_TRANSCRIPT",
            DocumentType::RecommendationLetter => "RECOMMENDATION_LETTER",
            DocumentType::StatementOfPurpose => "STATEMENT_OF_PURPOSE",
            DocumentType::EnglishTestScore => "ENGLISH_TEST_SCORE",
            DocumentType::CvResume => "CV_RESUME",
            DocumentType::FinancialStatement => "FINANCIAL_STATEMENT",
            DocumentType::MedicalCertificate => "MEDICAL_CERTIFICATE",
            DocumentType::Other(tag) => tag,
        }
    }

    /// Parses a tag case-insensitively; never fails.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "PASSPORT" => DocumentType::Passport,
            "ACADEMIC_TRANSCRIPT" => DocumentType::AcademicTranscript,
            "RECOMMENDATION_LETTER" => DocumentType::RecommendationLetter,
            "STATEMENT_OF_PURPOSE" => DocumentType::StatementOfPurpose,
            "ENGLISH_TEST_SCORE" => DocumentType::EnglishTestScore,
            "CV_RESUME" => DocumentType::CvResume,
            "FINANCIAL_STATEMENT" => DocumentType::FinancialStatement,
            "MEDICAL_CERTIFICATE" => DocumentType::MedicalCertificate,
            _ => DocumentType::Other(tag.to_string()),
        }
    }
}

impl From<String> for DocumentType {
    fn from(tag: String) -> Self {
        DocumentType::from_tag(&tag)
    }
}

impl From<DocumentType> for String {
    fn from(doc_type: DocumentType) -> Self {
        doc_type.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(alias = "rejected")]
    Rejected,
    #[serde(alias = "expired")]
    Expired,
    #[serde(other)]
    Unknown,
}

impl DocumentStatus {
    /// Returns true if a document in this status counts toward phase readiness.
    pub fn counts_toward_readiness(&self) -> bool {
        matches!(self, DocumentStatus::Pending | DocumentStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uploader {
    #[serde(default)]
    pub role: Option<String>,
}

/// An uploaded document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: RecordId,
    #[serde(rename = "type", alias = "documentType")]
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<Uploader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Role of whoever uploaded the document, from either the flat field or
    /// the nested uploader object.
    pub fn uploader_role(&self) -> Option<&str> {
        self.uploader_role
            .as_deref()
            .or_else(|| self.uploader.as_ref().and_then(|u| u.role.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Anything else the CRM stores on the record (course, intake, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: RecordId,
    pub university: University,
    #[serde(default, alias = "status")]
    pub application_status: String,
}

impl Application {
    /// Returns true if the application status means the university made an offer.
    pub fn has_offer(&self) -> bool {
        matches!(
            self.application_status.trim().to_ascii_uppercase().as_str(),
            "ACCEPTED" | "OFFER" | "OFFER_RECEIVED" | "CONDITIONAL_OFFER" | "UNCONDITIONAL_OFFER"
        )
    }
}

/// Per-destination pipeline: its own phase pointer and notes blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryProfile {
    pub country: String,
    #[serde(default)]
    pub current_phase: Option<String>,
    /// Raw notes: a JSON-encoded string, an object, or null
    #[serde(default)]
    pub notes: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_country: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub current_phase: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_owner_id: Option<RecordId>,
    #[serde(default)]
    pub notes: Value,
}

impl Student {
    /// Marketing-sourced leads only count counselor uploads toward document collection.
    pub fn is_marketing_sourced(&self) -> bool {
        self.marketing_owner_id.is_some()
    }
}

/// Everything the engine reads, already fetched by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInput {
    pub student: Student,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub country_profiles: Vec<CountryProfile>,
    #[serde(default)]
    pub selected_country: Option<String>,
}

/// Derived state of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStatus {
    pub key: PhaseKey,
    pub label: String,
    pub color: String,
    pub required_docs: Vec<DocumentType>,
    pub is_completed: bool,
    pub is_current: bool,
    pub is_pending: bool,
    pub is_next_phase: bool,
    pub can_proceed_to_next: bool,
    pub is_ready: bool,
    pub doc_completion: f64,
    pub phase_completion: f64,
    pub uploaded_docs: Vec<Document>,
    pub missing_docs: Vec<DocumentType>,
}

/// Full engine output for one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub phases: Vec<PhaseStatus>,
    pub overall_progress: f64,
    /// Catalog index of the effective phase, -1 when unrecognized
    pub current_index: i32,
    pub effective_phase: Option<String>,
    pub document_collection_complete: bool,
    pub overlays: PhaseOverlays,
    /// Problems found while reading notes; never fatal
    pub notes_issues: Vec<String>,
}

impl ProgressReport {
    pub fn current_phase(&self) -> Option<&PhaseStatus> {
        self.phases.iter().find(|p| p.is_current)
    }

    pub fn phase(&self, key: PhaseKey) -> Option<&PhaseStatus> {
        self.phases.iter().find(|p| p.key == key)
    }
}
