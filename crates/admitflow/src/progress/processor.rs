/// Phase progress processing
use serde_json::Value;
use std::cmp::Reverse;
use tracing::{debug, warn};

use super::catalog::{catalog, document_collection_requirements, Phase, PhaseKey};
use super::config::ProgressConfig;
use super::country::{countries_match, normalize_country_with};
use super::notes::CountryNotes;
use super::overlays::resolve_overlays;
use super::types::*;

/// Computes per-phase progress for a student
///
/// Stateless apart from its configuration; safe to share between threads
/// and to call on every input change.
#[derive(Debug, Clone, Default)]
pub struct PhaseProgressProcessor {
    config: ProgressConfig,
}

/// Phase pointer, notes and country filter that apply to one invocation
struct ResolvedContext<'a> {
    phase: Option<&'a str>,
    notes: &'a Value,
    country: Option<&'a str>,
}

impl PhaseProgressProcessor {
    /// Creates a new processor with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// Computes the progress report for one student
    ///
    /// Never fails: unreadable notes degrade to "no decision recorded" and
    /// are listed in [`ProgressReport::notes_issues`].
    ///
    /// # Arguments
    /// * `input` - Student, documents, applications, country profiles and
    ///   the selected country
    pub fn compute_progress(&self, input: &ProgressInput) -> ProgressReport {
        let context = self.resolve_context(input);

        let parsed = CountryNotes::parse(context.notes);
        for issue in &parsed.issues {
            warn!("Student {}: {}", input.student.id, issue);
        }

        let current_index = context
            .phase
            .and_then(PhaseKey::from_key)
            .map(|key| key.index() as i32)
            .unwrap_or(-1);
        let current_key = PhaseKey::from_index(current_index);

        let document_collection_complete = current_key == Some(PhaseKey::DocumentCollection)
            && self.document_collection_complete(&input.student, &input.documents);

        let overlays = resolve_overlays(
            parsed.notes.as_ref(),
            &input.applications,
            context.country,
            &self.config,
        );

        let rules = UnlockRules {
            current_key,
            document_collection_complete,
            shortlist_ready: !overlays.shortlist.universities.is_empty(),
        };

        let phases: Vec<PhaseStatus> = catalog()
            .iter()
            .enumerate()
            .map(|(i, phase)| {
                build_phase_status(i as i32, phase, current_index, &input.documents, &rules)
            })
            .collect();

        let overall_progress = overall_progress(&phases, current_index);

        debug!(
            "Student {}: phase {:?} (index {}), overall {:.1}%",
            input.student.id, context.phase, current_index, overall_progress
        );

        ProgressReport {
            phases,
            overall_progress,
            current_index,
            effective_phase: context.phase.map(str::to_string),
            document_collection_complete,
            overlays,
            notes_issues: parsed.issues.iter().map(|i| i.to_string()).collect(),
        }
    }

    /// Normalizes a country name, applying configured aliases.
    pub fn normalize_country(&self, name: &str) -> String {
        normalize_country_with(name, &self.config.country_aliases)
    }

    /// Gets the configuration
    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Picks the phase pointer and notes: the selected country's profile if
    /// one matches, otherwise the student's own.
    fn resolve_context<'a>(&self, input: &'a ProgressInput) -> ResolvedContext<'a> {
        let student_context = ResolvedContext {
            phase: input.student.current_phase.as_deref(),
            notes: &input.student.notes,
            country: None,
        };

        // Without profiles the selected country means nothing
        if input.country_profiles.is_empty() {
            return student_context;
        }

        let Some(selected) = input
            .selected_country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            return student_context;
        };

        let profile = input.country_profiles.iter().find(|p| {
            countries_match(Some(&p.country), Some(selected), &self.config.country_aliases)
        });

        match profile {
            Some(profile) => ResolvedContext {
                phase: profile
                    .current_phase
                    .as_deref()
                    .or(input.student.current_phase.as_deref()),
                notes: &profile.notes,
                country: Some(selected),
            },
            None => ResolvedContext {
                country: Some(selected),
                ..student_context
            },
        }
    }

    /// Returns true if every document-collection type has a live document.
    ///
    /// Marketing-sourced students only get credit for counselor uploads.
    fn document_collection_complete(&self, student: &Student, documents: &[Document]) -> bool {
        let marketing = student.is_marketing_sourced();
        let eligible: Vec<&Document> = documents
            .iter()
            .filter(|d| d.status.counts_toward_readiness())
            .filter(|d| {
                !marketing || d.uploader_role().is_some_and(|role| self.config.is_counselor(role))
            })
            .collect();

        document_collection_requirements()
            .iter()
            .all(|required| eligible.iter().any(|d| d.doc_type == *required))
    }
}

/// Inputs to the phase-specific unlock overrides
struct UnlockRules {
    current_key: Option<PhaseKey>,
    document_collection_complete: bool,
    shortlist_ready: bool,
}

impl UnlockRules {
    /// Overrides `can_proceed_to_next` for the special cases; `None` keeps
    /// the readiness-based default.
    fn unlock(&self, key: PhaseKey, is_current: bool, is_next: bool) -> Option<bool> {
        match key {
            PhaseKey::DocumentCollection if is_current => Some(self.document_collection_complete),
            PhaseKey::UniversityShortlisting if is_next => Some(self.document_collection_complete),
            PhaseKey::ApplicationSubmission
                if is_next && self.current_key == Some(PhaseKey::UniversityShortlisting) =>
            {
                Some(self.shortlist_ready)
            }
            _ => None,
        }
    }
}

fn build_phase_status(
    index: i32,
    phase: &Phase,
    current_index: i32,
    documents: &[Document],
    rules: &UnlockRules,
) -> PhaseStatus {
    let is_completed = index < current_index;
    let is_current = index == current_index;
    let is_pending = !is_completed && !is_current;
    let is_next_phase = index == current_index + 1;

    let required_docs = phase.required_documents.to_vec();

    let (uploaded_docs, missing_docs, doc_completion) = if is_current || is_next_phase {
        let uploaded = uploaded_for(&required_docs, documents);
        let missing: Vec<DocumentType> = required_docs
            .iter()
            .filter(|t| !uploaded.iter().any(|d| d.doc_type == **t))
            .cloned()
            .collect();
        let completion = completion_percent(required_docs.len(), missing.len(), is_current);
        (uploaded, missing, completion)
    } else if is_completed {
        (Vec::new(), Vec::new(), 100.0)
    } else {
        (Vec::new(), Vec::new(), 0.0)
    };

    let is_ready = required_docs.is_empty() || missing_docs.is_empty();

    let phase_completion = if is_completed {
        100.0
    } else if is_current {
        doc_completion
    } else {
        0.0
    };

    let can_proceed_to_next = rules
        .unlock(phase.key, is_current, is_next_phase)
        .unwrap_or(is_current && is_ready);

    PhaseStatus {
        key: phase.key,
        label: phase.label.to_string(),
        color: phase.color_hint.to_string(),
        required_docs,
        is_completed,
        is_current,
        is_pending,
        is_next_phase,
        can_proceed_to_next,
        is_ready,
        doc_completion,
        phase_completion,
        uploaded_docs,
        missing_docs,
    }
}

/// Live documents of a required type, newest first.
fn uploaded_for(required: &[DocumentType], documents: &[Document]) -> Vec<Document> {
    let mut uploaded: Vec<Document> = documents
        .iter()
        .filter(|d| d.status.counts_toward_readiness() && required.contains(&d.doc_type))
        .cloned()
        .collect();
    uploaded.sort_by_key(|d| Reverse(d.uploaded_at));
    uploaded
}

fn completion_percent(required: usize, missing: usize, is_current: bool) -> f64 {
    if required == 0 {
        // A current phase with nothing to upload has no document progress to show
        return if is_current { 0.0 } else { 100.0 };
    }
    (required - missing) as f64 * 100.0 / required as f64
}

fn overall_progress(phases: &[PhaseStatus], current_index: i32) -> f64 {
    if phases.is_empty() || current_index < 0 {
        return 0.0;
    }

    let current_completion = phases
        .iter()
        .find(|p| p.is_current)
        .map(|p| p.phase_completion)
        .unwrap_or(0.0);

    // (completed + current fraction) / total, scaled to a percentage
    ((current_index as f64 * 100.0 + current_completion) / phases.len() as f64).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(phase: &str) -> Student {
        Student {
            id: RecordId::Int(1),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            current_phase: Some(phase.to_string()),
            status: Some("ACTIVE".to_string()),
            marketing_owner_id: None,
            notes: Value::Null,
        }
    }

    fn doc(id: i64, doc_type: DocumentType, status: DocumentStatus) -> Document {
        Document {
            id: RecordId::Int(id),
            doc_type,
            status,
            uploader_role: None,
            uploader: None,
            uploaded_at: None,
        }
    }

    fn input(student: Student) -> ProgressInput {
        ProgressInput {
            student,
            documents: Vec::new(),
            applications: Vec::new(),
            country_profiles: Vec::new(),
            selected_country: None,
        }
    }

    #[test]
    fn test_classification_is_exclusive() {
        let processor = PhaseProgressProcessor::default();
        for phase in catalog() {
            let report = processor.compute_progress(&input(student(phase.key.as_str())));
            for status in &report.phases {
                let flags = [status.is_completed, status.is_current, status.is_pending];
                assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{:?}", status.key);
            }
        }
    }

    #[test]
    fn test_unknown_phase_has_no_current() {
        let report = PhaseProgressProcessor::default().compute_progress(&input(student("GRADUATED")));

        assert_eq!(report.current_index, -1);
        assert!(report.current_phase().is_none());
        assert!(report.phases.iter().all(|p| p.is_pending));
        assert!(report.phases[0].is_next_phase);
        assert_eq!(report.overall_progress, 0.0);
    }

    #[test]
    fn test_partial_documents() {
        let mut data = input(student("DOCUMENT_COLLECTION"));
        data.documents = vec![
            doc(1, DocumentType::Passport, DocumentStatus::Approved),
            doc(2, DocumentType::AcademicTranscript, DocumentStatus::Pending),
            doc(3, DocumentType::EnglishTestScore, DocumentStatus::Rejected),
        ];
        let report = PhaseProgressProcessor::default().compute_progress(&data);
        let current = report.current_phase().unwrap();

        assert_eq!(current.doc_completion, 40.0);
        assert_eq!(current.phase_completion, 40.0);
        assert!(!current.is_ready);
        assert!(!current.can_proceed_to_next);
        assert_eq!(current.uploaded_docs.len(), 2);
        assert!(current.missing_docs.contains(&DocumentType::EnglishTestScore));
        assert_eq!(report.overall_progress, 4.0);
    }

    #[test]
    fn test_next_phase_readiness_is_evaluated() {
        let mut data = input(student("UNIVERSITY_SHORTLISTING"));
        data.documents = vec![doc(1, DocumentType::CvResume, DocumentStatus::Approved)];
        let report = PhaseProgressProcessor::default().compute_progress(&data);
        let next = report.phase(PhaseKey::ApplicationSubmission).unwrap();

        assert!(next.is_next_phase);
        assert_eq!(next.doc_completion, 50.0);
        assert_eq!(next.phase_completion, 0.0);
        assert_eq!(next.missing_docs, vec![DocumentType::StatementOfPurpose]);
        // No shortlist in notes
        assert!(!next.can_proceed_to_next);
    }

    #[test]
    fn test_far_phases_skip_document_inspection() {
        let mut data = input(student("OFFER_RECEIVED"));
        data.documents = vec![doc(1, DocumentType::Passport, DocumentStatus::Approved)];
        let report = PhaseProgressProcessor::default().compute_progress(&data);

        let done = report.phase(PhaseKey::DocumentCollection).unwrap();
        assert_eq!(done.doc_completion, 100.0);
        assert!(done.uploaded_docs.is_empty());
        assert!(done.missing_docs.is_empty());

        let far = report.phase(PhaseKey::CasVisa).unwrap();
        assert_eq!(far.doc_completion, 0.0);
        assert!(far.is_ready);
        assert!(!far.can_proceed_to_next);
    }

    #[test]
    fn test_zero_requirement_current_phase() {
        let report = PhaseProgressProcessor::default().compute_progress(&input(student("ENROLLMENT")));
        let current = report.current_phase().unwrap();

        assert_eq!(current.doc_completion, 0.0);
        assert!(current.is_ready);
        assert!(current.can_proceed_to_next);
        assert_eq!(report.overall_progress, 90.0);
    }

    #[test]
    fn test_uploaded_docs_newest_first() {
        let mut older = doc(1, DocumentType::Passport, DocumentStatus::Approved);
        older.uploaded_at = Some("2024-01-01T00:00:00Z".parse().unwrap());
        let mut newer = doc(2, DocumentType::Passport, DocumentStatus::Pending);
        newer.uploaded_at = Some("2024-06-01T00:00:00Z".parse().unwrap());
        let undated = doc(3, DocumentType::Passport, DocumentStatus::Approved);

        let uploaded = uploaded_for(&[DocumentType::Passport], &[older, undated, newer]);
        let ids: Vec<_> = uploaded.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(1), RecordId::Int(3)]);
    }

    #[test]
    fn test_profile_overrides_student_phase() {
        let mut data = input(student("DOCUMENT_COLLECTION"));
        data.country_profiles = vec![
            CountryProfile {
                country: "UK".to_string(),
                current_phase: Some("INTERVIEW".to_string()),
                notes: json!({ "interviewStatus": { "status": "APPROVED" } }),
                preferred_country: Some(true),
            },
            CountryProfile {
                country: "Canada".to_string(),
                current_phase: Some("OFFER_RECEIVED".to_string()),
                notes: Value::Null,
                preferred_country: None,
            },
        ];
        data.selected_country = Some("U.K.".to_string());

        let report = PhaseProgressProcessor::default().compute_progress(&data);
        assert_eq!(report.effective_phase.as_deref(), Some("INTERVIEW"));
        assert_eq!(report.current_index, PhaseKey::Interview.index() as i32);
        assert!(report.overlays.interview.status.is_some());
    }

    #[test]
    fn test_selected_country_ignored_without_profiles() {
        let mut data = input(student("UNIVERSITY_SHORTLISTING"));
        data.student.notes = json!({
            "universityShortlist": { "universities": [{ "id": 1, "name": "X", "country": "UK" }] }
        });
        data.selected_country = Some("Canada".to_string());

        let report = PhaseProgressProcessor::default().compute_progress(&data);
        assert_eq!(report.overlays.shortlist.universities.len(), 1);
        assert!(report.overlays.shortlist.country.is_none());
        assert!(report.phase(PhaseKey::ApplicationSubmission).unwrap().can_proceed_to_next);
    }
}
