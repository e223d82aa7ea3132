//! The static admission phase catalog.
//!
//! Order is meaningful: the only legal forward transition is from a phase to
//! the entry directly after it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKey {
    DocumentCollection,
    UniversityShortlisting,
    ApplicationSubmission,
    OfferReceived,
    InitialPayment,
    Interview,
    FinancialTbTest,
    CasVisa,
    VisaApplication,
    Enrollment,
}

impl PhaseKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKey::DocumentCollection => "DOCUMENT_COLLECTION",
            PhaseKey::UniversityShortlisting => "UNIVERSITY_SHORTLISTING",
            PhaseKey::ApplicationSubmission => "APPLICATION_SUBMISSION",
            PhaseKey::OfferReceived => "OFFER_RECEIVED",
            PhaseKey::InitialPayment => "INITIAL_PAYMENT",
            PhaseKey::Interview => "INTERVIEW",
            PhaseKey::FinancialTbTest => "FINANCIAL_TB_TEST",
            PhaseKey::CasVisa => "CAS_VISA",
            PhaseKey::VisaApplication => "VISA_APPLICATION",
            PhaseKey::Enrollment => "ENROLLMENT",
        }
    }

    /// Looks up a phase by its key, ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        PHASES
            .iter()
            .map(|p| p.key)
            .find(|k| k.as_str().eq_ignore_ascii_case(key))
    }

    /// Position in the catalog.
    pub fn index(&self) -> usize {
        PHASES
            .iter()
            .position(|p| p.key == *self)
            .unwrap_or_default()
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| PHASES.get(i))
            .map(|p| p.key)
    }

    /// Phases whose outcome is an approve/refuse decision recorded in notes.
    pub fn is_decision_phase(&self) -> bool {
        matches!(
            self,
            PhaseKey::Interview | PhaseKey::CasVisa | PhaseKey::VisaApplication
        )
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub key: PhaseKey,
    pub label: &'static str,
    pub color_hint: &'static str,
    #[serde(rename = "requiredDocumentTypes")]
    pub required_documents: &'static [DocumentType],
}

static NO_DOCS: [DocumentType; 0] = [];

static DOCUMENT_COLLECTION_DOCS: [DocumentType; 5] = [
    DocumentType::Passport,
    DocumentType::AcademicTranscript,
    DocumentType::RecommendationLetter,
    DocumentType::StatementOfPurpose,
    DocumentType::EnglishTestScore,
];

static APPLICATION_SUBMISSION_DOCS: [DocumentType; 2] =
    [DocumentType::StatementOfPurpose, DocumentType::CvResume];

static FINANCIAL_TB_TEST_DOCS: [DocumentType; 2] = [
    DocumentType::FinancialStatement,
    DocumentType::MedicalCertificate,
];

static CAS_VISA_DOCS: [DocumentType; 2] =
    [DocumentType::Passport, DocumentType::FinancialStatement];

static VISA_APPLICATION_DOCS: [DocumentType; 1] = [DocumentType::Passport];

static PHASES: [Phase; 10] = [
    Phase {
        key: PhaseKey::DocumentCollection,
        label: "Document Collection",
        color_hint: "#2196F3",
        required_documents: &DOCUMENT_COLLECTION_DOCS,
    },
    Phase {
        key: PhaseKey::UniversityShortlisting,
        label: "University Shortlisting",
        color_hint: "#3F51B5",
        required_documents: &NO_DOCS,
    },
    Phase {
        key: PhaseKey::ApplicationSubmission,
        label: "Application Submission",
        color_hint: "#673AB7",
        required_documents: &APPLICATION_SUBMISSION_DOCS,
    },
    Phase {
        key: PhaseKey::OfferReceived,
        label: "Offer Received",
        color_hint: "#9C27B0",
        required_documents: &NO_DOCS,
    },
    Phase {
        key: PhaseKey::InitialPayment,
        label: "Initial Payment",
        color_hint: "#E91E63",
        required_documents: &NO_DOCS,
    },
    Phase {
        key: PhaseKey::Interview,
        label: "Interview",
        color_hint: "#FF5722",
        required_documents: &NO_DOCS,
    },
    Phase {
        key: PhaseKey::FinancialTbTest,
        label: "Financial & TB Test",
        color_hint: "#FF9800",
        required_documents: &FINANCIAL_TB_TEST_DOCS,
    },
    Phase {
        key: PhaseKey::CasVisa,
        label: "CAS / Visa",
        color_hint: "#FFC107",
        required_documents: &CAS_VISA_DOCS,
    },
    Phase {
        key: PhaseKey::VisaApplication,
        label: "Visa Application",
        color_hint: "#8BC34A",
        required_documents: &VISA_APPLICATION_DOCS,
    },
    Phase {
        key: PhaseKey::Enrollment,
        label: "Enrollment",
        color_hint: "#4CAF50",
        required_documents: &NO_DOCS,
    },
];

/// The authoritative phase table, in pipeline order.
pub fn catalog() -> &'static [Phase] {
    &PHASES
}

/// Document types that must be present to finish document collection.
pub fn document_collection_requirements() -> &'static [DocumentType] {
    &DOCUMENT_COLLECTION_DOCS
}
