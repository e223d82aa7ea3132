/// Read-only projections over notes and applications, one per later phase
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::PhaseKey;
use super::config::ProgressConfig;
use super::country::{countries_match, normalize_country_with};
use super::decisions::DecisionAction;
use super::notes::{CountryNotes, DecisionStatus};
use super::types::{Application, RecordId, University};

/// Why a selection may not show what the caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisoryKind {
    /// Nothing in the source list matched the selected country
    NoneForCountry,
    /// Nothing matched, so the unfiltered list is shown instead
    CountryMismatch,
    /// No offers recorded; showing the shortlist instead
    OffersNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

/// Universities to display for one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversitySelection {
    pub universities: Vec<University>,
    /// Size of the list before country filtering
    pub source_count: usize,
    /// Normalized country the list was filtered by
    pub country: Option<String>,
    /// True if the list comes from a fallback source
    pub is_fallback: bool,
    pub advisories: Vec<Advisory>,
}

impl UniversitySelection {
    pub fn has_advisory(&self, kind: AdvisoryKind) -> bool {
        self.advisories.iter().any(|a| a.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    /// University the initial payment was made to
    pub chosen: Option<University>,
    /// Universities the payment could go to
    pub candidates: UniversitySelection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOverlay {
    pub status: Option<DecisionStatus>,
    /// Operations the caller may offer; only populated after a refusal
    pub available_actions: Vec<DecisionAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOverlays {
    pub shortlist: UniversitySelection,
    pub application_submission: UniversitySelection,
    pub offers: UniversitySelection,
    pub initial_payment: PaymentSelection,
    pub interview: DecisionOverlay,
    pub cas_visa: DecisionOverlay,
    pub visa_application: DecisionOverlay,
    pub financial_option: Option<String>,
    pub enrollment_university: Option<University>,
}

/// Resolves every overlay
///
/// # Arguments
/// * `notes` - Parsed notes, `None` if absent or unreadable
/// * `applications` - Application records, used as an extra source of offers
/// * `country` - Selected country to filter by, if any
/// * `config` - Supplies extra country aliases
pub fn resolve_overlays(
    notes: Option<&CountryNotes>,
    applications: &[Application],
    country: Option<&str>,
    config: &ProgressConfig,
) -> PhaseOverlays {
    let filter = CountryFilter::new(country, config);

    let shortlisted = notes.map(|n| n.shortlisted()).unwrap_or(&[]);
    let submitted = notes.map(|n| n.submitted()).unwrap_or(&[]);
    let offers = merge_offers(notes.map(|n| n.offers()).unwrap_or(&[]), applications);

    let initial_payment = PaymentSelection {
        chosen: notes.and_then(|n| n.payment_university()).cloned(),
        candidates: if offers.is_empty() {
            filter.payment_fallback(shortlisted)
        } else {
            filter.lenient(&offers)
        },
    };

    PhaseOverlays {
        shortlist: filter.strict(shortlisted),
        application_submission: filter.lenient(submitted),
        offers: filter.lenient(&offers),
        enrollment_university: initial_payment.chosen.clone(),
        initial_payment,
        interview: decision_overlay(notes, PhaseKey::Interview),
        cas_visa: decision_overlay(notes, PhaseKey::CasVisa),
        visa_application: decision_overlay(notes, PhaseKey::VisaApplication),
        financial_option: notes.and_then(|n| n.financial_label()).map(str::to_string),
    }
}

/// Offers from notes first, then universities of applications with an offer
/// status, without duplicates.
fn merge_offers(from_notes: &[University], applications: &[Application]) -> Vec<University> {
    let mut seen: HashSet<RecordId> = HashSet::new();
    let mut merged = Vec::new();

    let from_applications = applications
        .iter()
        .filter(|a| a.has_offer())
        .map(|a| &a.university);

    for university in from_notes.iter().chain(from_applications) {
        if seen.insert(university.id.clone()) {
            merged.push(university.clone());
        }
    }

    merged
}

fn decision_overlay(notes: Option<&CountryNotes>, phase: PhaseKey) -> DecisionOverlay {
    let status = notes.and_then(|n| n.decision(phase));
    let available_actions = match status {
        Some(DecisionStatus::Refused) => vec![DecisionAction::Retry, DecisionAction::Stop],
        _ => Vec::new(),
    };

    DecisionOverlay {
        status,
        available_actions,
    }
}

struct CountryFilter<'a> {
    country: Option<&'a str>,
    config: &'a ProgressConfig,
}

impl<'a> CountryFilter<'a> {
    fn new(country: Option<&'a str>, config: &'a ProgressConfig) -> Self {
        let country = country.map(str::trim).filter(|c| !c.is_empty());
        Self { country, config }
    }

    fn matching(&self, source: &[University]) -> Option<Vec<University>> {
        let country = self.country?;
        Some(
            source
                .iter()
                .filter(|u| {
                    countries_match(
                        u.country.as_deref(),
                        Some(country),
                        &self.config.country_aliases,
                    )
                })
                .cloned()
                .collect(),
        )
    }

    fn selection(&self, universities: Vec<University>, source: &[University]) -> UniversitySelection {
        UniversitySelection {
            universities,
            source_count: source.len(),
            country: self
                .country
                .map(|c| normalize_country_with(c, &self.config.country_aliases)),
            is_fallback: false,
            advisories: Vec::new(),
        }
    }

    fn advisory(&self, kind: AdvisoryKind) -> Advisory {
        let country = self.country.unwrap_or_default();
        let message = match kind {
            AdvisoryKind::NoneForCountry => format!("No universities shortlisted for {country}"),
            AdvisoryKind::CountryMismatch => format!(
                "No universities matched {country}; showing all universities instead"
            ),
            AdvisoryKind::OffersNotFound => {
                "No offers recorded; showing shortlisted universities instead".to_string()
            }
        };
        Advisory { kind, message }
    }

    /// Filtered list; an empty match stays empty.
    fn strict(&self, source: &[University]) -> UniversitySelection {
        match self.matching(source) {
            Some(matched) => {
                let none_matched = matched.is_empty() && !source.is_empty();
                let mut selection = self.selection(matched, source);
                if none_matched {
                    selection.advisories.push(self.advisory(AdvisoryKind::NoneForCountry));
                }
                selection
            }
            None => self.selection(source.to_vec(), source),
        }
    }

    /// Filtered list; an empty match falls back to the unfiltered source.
    fn lenient(&self, source: &[University]) -> UniversitySelection {
        match self.matching(source) {
            Some(matched) if matched.is_empty() && !source.is_empty() => {
                let mut selection = self.selection(source.to_vec(), source);
                selection.advisories.push(self.advisory(AdvisoryKind::CountryMismatch));
                selection
            }
            Some(matched) => self.selection(matched, source),
            None => self.selection(source.to_vec(), source),
        }
    }

    /// Shortlist shown in place of missing offers during initial payment.
    fn payment_fallback(&self, shortlisted: &[University]) -> UniversitySelection {
        let mut selection = self.lenient(shortlisted);
        if !shortlisted.is_empty() {
            selection.is_fallback = true;
            selection.advisories.insert(0, self.advisory(AdvisoryKind::OffersNotFound));
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uni(id: i64, country: &str) -> University {
        University {
            id: RecordId::Int(id),
            name: format!("University {id}"),
            country: Some(country.to_string()),
            city: None,
            extra: serde_json::Map::new(),
        }
    }

    fn notes(value: serde_json::Value) -> CountryNotes {
        CountryNotes::parse(&value).notes.unwrap()
    }

    #[test]
    fn test_no_notes_resolves_to_nothing() {
        let overlays = resolve_overlays(None, &[], Some("UK"), &ProgressConfig::default());

        assert!(overlays.shortlist.universities.is_empty());
        assert!(overlays.shortlist.advisories.is_empty());
        assert!(overlays.initial_payment.chosen.is_none());
        assert!(!overlays.initial_payment.candidates.is_fallback);
        assert_eq!(overlays.interview, DecisionOverlay::default());
        assert!(overlays.financial_option.is_none());
        assert!(overlays.enrollment_university.is_none());
    }

    #[test]
    fn test_lenient_filter_falls_back_to_all() {
        let n = notes(json!({
            "applicationSubmissionUniversities": {
                "universities": [{ "id": 1, "name": "A", "country": "Australia" }]
            }
        }));
        let overlays = resolve_overlays(Some(&n), &[], Some("Canada"), &ProgressConfig::default());

        assert_eq!(overlays.application_submission.universities.len(), 1);
        assert!(overlays
            .application_submission
            .has_advisory(AdvisoryKind::CountryMismatch));
    }

    #[test]
    fn test_offers_merge_applications_without_duplicates() {
        let n = notes(json!({
            "universitiesWithOffers": { "universities": [{ "id": 1, "name": "A", "country": "UK" }] }
        }));
        let applications = vec![
            Application {
                id: RecordId::Int(10),
                university: uni(1, "UK"),
                application_status: "ACCEPTED".to_string(),
            },
            Application {
                id: RecordId::Int(11),
                university: uni(2, "U.K."),
                application_status: "conditional_offer".to_string(),
            },
            Application {
                id: RecordId::Int(12),
                university: uni(3, "UK"),
                application_status: "SUBMITTED".to_string(),
            },
        ];
        let overlays = resolve_overlays(
            Some(&n),
            &applications,
            Some("united kingdom"),
            &ProgressConfig::default(),
        );

        let ids: Vec<_> = overlays.offers.universities.iter().map(|u| u.id.clone()).collect();
        assert_eq!(ids, vec![RecordId::Int(1), RecordId::Int(2)]);
        assert_eq!(overlays.offers.country.as_deref(), Some("UNITED KINGDOM"));
    }

    #[test]
    fn test_payment_falls_back_to_shortlist() {
        let n = notes(json!({
            "universityShortlist": { "universities": [{ "id": 4, "name": "D", "country": "Canada" }] }
        }));
        let overlays = resolve_overlays(Some(&n), &[], None, &ProgressConfig::default());
        let candidates = &overlays.initial_payment.candidates;

        assert!(candidates.is_fallback);
        assert_eq!(candidates.universities.len(), 1);
        assert!(candidates.has_advisory(AdvisoryKind::OffersNotFound));
    }

    #[test]
    fn test_refused_decision_offers_actions() {
        let n = notes(json!({
            "interviewStatus": { "status": "REFUSED" },
            "visaStatus": { "status": "STOPPED" },
            "initialPaymentUniversity": { "university": { "id": 9, "name": "Chosen", "country": "UK" } },
            "financialOption": { "label": "Self funded" }
        }));
        let overlays = resolve_overlays(Some(&n), &[], None, &ProgressConfig::default());

        assert_eq!(
            overlays.interview.available_actions,
            vec![DecisionAction::Retry, DecisionAction::Stop]
        );
        assert_eq!(overlays.visa_application.status, Some(DecisionStatus::Stopped));
        assert!(overlays.visa_application.available_actions.is_empty());
        assert_eq!(overlays.cas_visa.status, None);
        assert_eq!(overlays.financial_option.as_deref(), Some("Self funded"));
        assert_eq!(
            overlays.enrollment_university.map(|u| u.name),
            Some("Chosen".to_string())
        );
    }
}
