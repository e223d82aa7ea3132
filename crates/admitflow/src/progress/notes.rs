//! Typed view of the free-form notes blob attached to a student or country profile.
//!
//! Notes arrive either as a JSON-encoded string or as an object. Parsing is
//! lenient: a broken blob yields no notes, a broken section yields no value
//! for that section only. Problems are reported, never raised.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::PhaseKey;
use super::error::NotesError;
use super::types::University;

pub const UNIVERSITY_SHORTLIST: &str = "universityShortlist";
pub const APPLICATION_SUBMISSION_UNIVERSITIES: &str = "applicationSubmissionUniversities";
pub const UNIVERSITIES_WITH_OFFERS: &str = "universitiesWithOffers";
pub const INITIAL_PAYMENT_UNIVERSITY: &str = "initialPaymentUniversity";
pub const INTERVIEW_STATUS: &str = "interviewStatus";
pub const CAS_VISA_STATUS: &str = "casVisaStatus";
pub const VISA_STATUS: &str = "visaStatus";
pub const FINANCIAL_OPTION: &str = "financialOption";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversityList {
    #[serde(default)]
    pub universities: Vec<University>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversityPick {
    #[serde(default)]
    pub university: Option<University>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of an interview or visa step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Approved,
    Refused,
    /// Terminal: the student stopped after a refusal
    Stopped,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Refused => "REFUSED",
            DecisionStatus::Stopped => "STOPPED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Some(DecisionStatus::Approved),
            "REFUSED" => Some(DecisionStatus::Refused),
            "STOPPED" => Some(DecisionStatus::Stopped),
            _ => None,
        }
    }
}

/// A decision section. Fields besides `status` (remarks, dates) ride along
/// in `extra` so rewriting the status keeps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub status: DecisionStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialOption {
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parsed notes, one optional value per known section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryNotes {
    pub university_shortlist: Option<UniversityList>,
    pub application_submission_universities: Option<UniversityList>,
    pub universities_with_offers: Option<UniversityList>,
    pub initial_payment_university: Option<UniversityPick>,
    pub interview_status: Option<DecisionRecord>,
    pub cas_visa_status: Option<DecisionRecord>,
    pub visa_status: Option<DecisionRecord>,
    pub financial_option: Option<FinancialOption>,
    /// Unknown keys and unreadable sections, kept for round-tripping
    pub extra: Map<String, Value>,
}

/// Result of [`CountryNotes::parse`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedNotes {
    pub notes: Option<CountryNotes>,
    pub issues: Vec<NotesError>,
}

impl CountryNotes {
    /// Reads a raw notes value. Never fails; see [`ParsedNotes::issues`].
    pub fn parse(raw: &Value) -> ParsedNotes {
        match raw {
            Value::Null => ParsedNotes::default(),
            Value::String(text) if text.trim().is_empty() => ParsedNotes::default(),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Self::from_map(map),
                Ok(Value::Null) => ParsedNotes::default(),
                Ok(other) => ParsedNotes::rejected(NotesError::NotAnObject {
                    found: json_kind(&other),
                }),
                Err(e) => ParsedNotes::rejected(NotesError::InvalidJson {
                    message: e.to_string(),
                }),
            },
            Value::Object(map) => Self::from_map(map.clone()),
            other => ParsedNotes::rejected(NotesError::NotAnObject {
                found: json_kind(other),
            }),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> ParsedNotes {
        let mut issues = Vec::new();
        let mut extra = Map::new();

        let mut notes = CountryNotes {
            university_shortlist: take_section(
                &mut map,
                UNIVERSITY_SHORTLIST,
                &mut issues,
                &mut extra,
            ),
            application_submission_universities: take_section(
                &mut map,
                APPLICATION_SUBMISSION_UNIVERSITIES,
                &mut issues,
                &mut extra,
            ),
            universities_with_offers: take_section(
                &mut map,
                UNIVERSITIES_WITH_OFFERS,
                &mut issues,
                &mut extra,
            ),
            initial_payment_university: take_section(
                &mut map,
                INITIAL_PAYMENT_UNIVERSITY,
                &mut issues,
                &mut extra,
            ),
            interview_status: take_decision(&mut map, INTERVIEW_STATUS, &mut issues, &mut extra),
            cas_visa_status: take_decision(&mut map, CAS_VISA_STATUS, &mut issues, &mut extra),
            visa_status: take_decision(&mut map, VISA_STATUS, &mut issues, &mut extra),
            financial_option: take_section(&mut map, FINANCIAL_OPTION, &mut issues, &mut extra),
            extra: Map::new(),
        };

        // Whatever is left is not ours to interpret
        extra.extend(map);
        notes.extra = extra;

        ParsedNotes {
            notes: Some(notes),
            issues,
        }
    }

    /// Serializes back to a JSON object, unknown keys included.
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        put_section(&mut map, UNIVERSITY_SHORTLIST, &self.university_shortlist);
        put_section(
            &mut map,
            APPLICATION_SUBMISSION_UNIVERSITIES,
            &self.application_submission_universities,
        );
        put_section(&mut map, UNIVERSITIES_WITH_OFFERS, &self.universities_with_offers);
        put_section(&mut map, INITIAL_PAYMENT_UNIVERSITY, &self.initial_payment_university);
        put_section(&mut map, INTERVIEW_STATUS, &self.interview_status);
        put_section(&mut map, CAS_VISA_STATUS, &self.cas_visa_status);
        put_section(&mut map, VISA_STATUS, &self.visa_status);
        put_section(&mut map, FINANCIAL_OPTION, &self.financial_option);
        Value::Object(map)
    }

    /// The decision recorded for an interview/visa phase, if any.
    pub fn decision(&self, phase: PhaseKey) -> Option<DecisionStatus> {
        self.decision_slot(phase)
            .and_then(|slot| slot.as_ref())
            .map(|record| record.status)
    }

    /// Mutable access to the decision section for a phase; `None` for phases
    /// without a decision.
    pub fn decision_slot_mut(&mut self, phase: PhaseKey) -> Option<&mut Option<DecisionRecord>> {
        match phase {
            PhaseKey::Interview => Some(&mut self.interview_status),
            PhaseKey::CasVisa => Some(&mut self.cas_visa_status),
            PhaseKey::VisaApplication => Some(&mut self.visa_status),
            _ => None,
        }
    }

    /// Removes the status of a phase's decision. Other fields of the section
    /// stay in the notes; returns false for phases without a decision.
    pub fn clear_decision(&mut self, phase: PhaseKey) -> bool {
        let Some(key) = decision_key(phase) else {
            return false;
        };

        if let Some(record) = self.decision_slot_mut(phase).and_then(Option::take) {
            if !record.extra.is_empty() {
                self.extra.insert(key.to_string(), Value::Object(record.extra));
            }
        }
        true
    }

    fn decision_slot(&self, phase: PhaseKey) -> Option<&Option<DecisionRecord>> {
        match phase {
            PhaseKey::Interview => Some(&self.interview_status),
            PhaseKey::CasVisa => Some(&self.cas_visa_status),
            PhaseKey::VisaApplication => Some(&self.visa_status),
            _ => None,
        }
    }

    pub fn shortlisted(&self) -> &[University] {
        universities_of(&self.university_shortlist)
    }

    pub fn submitted(&self) -> &[University] {
        universities_of(&self.application_submission_universities)
    }

    pub fn offers(&self) -> &[University] {
        universities_of(&self.universities_with_offers)
    }

    pub fn payment_university(&self) -> Option<&University> {
        self.initial_payment_university
            .as_ref()
            .and_then(|pick| pick.university.as_ref())
    }

    pub fn financial_label(&self) -> Option<&str> {
        self.financial_option
            .as_ref()
            .map(|option| option.label.trim())
            .filter(|label| !label.is_empty())
    }
}

impl ParsedNotes {
    fn rejected(issue: NotesError) -> Self {
        ParsedNotes {
            notes: None,
            issues: vec![issue],
        }
    }
}

fn universities_of(list: &Option<UniversityList>) -> &[University] {
    list.as_ref().map(|l| l.universities.as_slice()).unwrap_or(&[])
}

/// Removes and decodes one section. A null section counts as absent; an
/// undecodable one is reported and parked in `extra`.
fn take_section<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
    issues: &mut Vec<NotesError>,
    extra: &mut Map<String, Value>,
) -> Option<T> {
    let value = map.remove(key)?;
    if value.is_null() {
        return None;
    }

    match serde_json::from_value::<T>(value.clone()) {
        Ok(section) => Some(section),
        Err(e) => {
            issues.push(NotesError::MalformedSection {
                section: key.to_string(),
                message: e.to_string(),
            });
            extra.insert(key.to_string(), value);
            None
        }
    }
}

fn take_decision(
    map: &mut Map<String, Value>,
    key: &str,
    issues: &mut Vec<NotesError>,
    extra: &mut Map<String, Value>,
) -> Option<DecisionRecord> {
    let value = map.remove(key)?;
    let label = match value.get("status") {
        Some(Value::String(label)) if !label.trim().is_empty() => label.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            // Undecided, but the section may hold e.g. a scheduled date
            extra.insert(key.to_string(), value);
            return None;
        }
        Some(_) => {
            issues.push(NotesError::MalformedSection {
                section: key.to_string(),
                message: "status must be a string".to_string(),
            });
            extra.insert(key.to_string(), value);
            return None;
        }
    };

    let Some(status) = DecisionStatus::from_label(&label) else {
        issues.push(NotesError::UnknownDecision {
            section: key.to_string(),
            value: label,
        });
        extra.insert(key.to_string(), value);
        return None;
    };

    let mut fields = match value {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.remove("status");

    Some(DecisionRecord {
        status,
        extra: fields,
    })
}

fn decision_key(phase: PhaseKey) -> Option<&'static str> {
    match phase {
        PhaseKey::Interview => Some(INTERVIEW_STATUS),
        PhaseKey::CasVisa => Some(CAS_VISA_STATUS),
        PhaseKey::VisaApplication => Some(VISA_STATUS),
        _ => None,
    }
}

fn put_section<T: Serialize>(map: &mut Map<String, Value>, key: &str, section: &Option<T>) {
    if let Some(Ok(value)) = section.as_ref().map(serde_json::to_value) {
        map.insert(key.to_string(), value);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
