//! Per-student memoization of progress reports.
//!
//! The CRM asks for a student's progress on every page load but the inputs
//! rarely change between loads. Only the latest report per student is kept,
//! tagged with a digest of the input it was computed from; a request with a
//! different input for the same student replaces it. The number of students
//! held is capped, and stale reports are dropped by [`ProgressCache::purge_expired`].

use super::types::{ProgressInput, ProgressReport, RecordId};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// SHA-256 of an input's JSON form, truncated to 128 bits.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct InputDigest(String);

impl InputDigest {
    pub fn of(input: &ProgressInput) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(input)?;
        let mut hex = format!("{:x}", Sha256::digest(&bytes));
        hex.truncate(32);
        Ok(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InputDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

struct StudentReport {
    digest: InputDigest,
    report: ProgressReport,
    computed_at: Instant,
}

impl StudentReport {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.computed_at.elapsed() < ttl
    }
}

/// Latest progress report per student.
pub struct ProgressCache {
    reports: DashMap<RecordId, StudentReport>,
    ttl: Duration,
    max_students: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProgressCache {
    pub fn new(ttl: Duration, max_students: usize) -> Self {
        Self {
            reports: DashMap::new(),
            ttl,
            max_students,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the student's report if it was computed from the same input
    /// and is still fresh.
    pub fn get(&self, student: &RecordId, digest: &InputDigest) -> Option<ProgressReport> {
        let report = self
            .reports
            .get(student)
            .filter(|cached| cached.digest == *digest && cached.is_fresh(self.ttl))
            .map(|cached| cached.report.clone());

        let counter = if report.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        report
    }

    /// Stores a report as the student's latest, replacing any older one.
    ///
    /// A new student arriving at capacity first purges stale reports, then
    /// evicts the oldest one if the cache is still full.
    pub fn store(&self, student: RecordId, digest: InputDigest, report: ProgressReport) {
        if self.reports.len() >= self.max_students && !self.reports.contains_key(&student) {
            self.purge_expired();
            if self.reports.len() >= self.max_students {
                self.evict_oldest();
            }
        }

        self.reports.insert(
            student,
            StudentReport {
                digest,
                report,
                computed_at: Instant::now(),
            },
        );
    }

    /// Drops one student's report. Returns true if there was one.
    pub fn invalidate_student(&self, student: &RecordId) -> bool {
        self.reports.remove(student).is_some()
    }

    pub fn clear(&self) {
        self.reports.clear();
    }

    /// Number of students with a report, fresh or not.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Removes stale reports and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.reports.len();
        self.reports.retain(|_, cached| cached.is_fresh(self.ttl));
        before.saturating_sub(self.reports.len())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .reports
            .iter()
            .min_by_key(|entry| entry.computed_at)
            .map(|entry| entry.key().clone());

        if let Some(student) = oldest {
            self.reports.remove(&student);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let students = self.reports.len();
        let stale = self
            .reports
            .iter()
            .filter(|entry| !entry.is_fresh(self.ttl))
            .count();

        CacheStats {
            students,
            stale,
            max_students: self.max_students,
            ttl_secs: self.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub students: usize,
    pub stale: usize,
    pub max_students: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
}
