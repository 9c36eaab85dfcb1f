use crate::shelf::events::{EventSink, IngestEvent};
use crate::shelf::merge::merge;
use crate::shelf::partition::{PartitionKey, derive};
use crate::shelf::record::{OfferRecord, RejectedOffer};
use crate::shelf::util::truncate_with_ellipsis;
use crate::store::ObjectStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const MAX_REJECT_PREVIEW_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Get,
    Encode,
    Put,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PartitionStatus {
    Written,
    Unchanged,
    Failed { stage: FailureStage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionOutcome {
    pub storage_key: String,
    pub observed: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub malformed_stored_lines: usize,
    pub status: PartitionStatus,
}

impl PartitionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PartitionStatus::Failed { .. })
    }
}

/// Totals for one or more ingestion batches.
///
/// `total_observed == total_accepted + total_duplicates + total_rejected + total_failed`
/// where `total_failed` counts records of partitions whose read or write failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub total_observed: usize,
    pub total_accepted: usize,
    pub total_duplicates: usize,
    pub total_rejected: usize,
    pub total_failed: usize,
    pub partitions: BTreeMap<PartitionKey, PartitionOutcome>,
}

impl IngestReport {
    pub fn has_failures(&self) -> bool {
        self.partitions.values().any(PartitionOutcome::is_failed)
    }

    pub fn failed_partitions(&self) -> impl Iterator<Item = (&PartitionKey, &PartitionOutcome)> {
        self.partitions.iter().filter(|(_, out)| out.is_failed())
    }

    /// Fold a later batch into this report. A partition touched by both keeps
    /// the most severe status and the highest malformed-line count seen.
    pub fn absorb(&mut self, other: IngestReport) {
        self.total_observed += other.total_observed;
        self.total_accepted += other.total_accepted;
        self.total_duplicates += other.total_duplicates;
        self.total_rejected += other.total_rejected;
        self.total_failed += other.total_failed;

        for (key, incoming) in other.partitions {
            let Some(current) = self.partitions.get_mut(&key) else {
                self.partitions.insert(key, incoming);
                continue;
            };
            current.observed += incoming.observed;
            current.accepted += incoming.accepted;
            current.duplicates += incoming.duplicates;
            current.malformed_stored_lines = current
                .malformed_stored_lines
                .max(incoming.malformed_stored_lines);
            current.status = match (&current.status, incoming.status) {
                (PartitionStatus::Failed { .. }, _) => current.status.clone(),
                (_, failed @ PartitionStatus::Failed { .. }) => failed,
                (PartitionStatus::Written, _) | (_, PartitionStatus::Written) => {
                    PartitionStatus::Written
                }
                _ => PartitionStatus::Unchanged,
            };
        }
    }
}

fn failed(
    storage_key: String,
    observed: usize,
    malformed_stored_lines: usize,
    stage: FailureStage,
    reason: String,
) -> PartitionOutcome {
    PartitionOutcome {
        storage_key,
        observed,
        accepted: 0,
        duplicates: 0,
        malformed_stored_lines,
        status: PartitionStatus::Failed { stage, reason },
    }
}

fn merge_partition(
    store: &dyn ObjectStore,
    sink: &dyn EventSink,
    key: &PartitionKey,
    storage_key: String,
    records: &[OfferRecord],
) -> PartitionOutcome {
    let label = Some(key.to_string());
    let observed = records.len();

    let existing = match store.get(&storage_key) {
        Ok(outcome) => outcome.into_option(),
        Err(err) => {
            let reason = err.to_string();
            sink.emit(&IngestEvent::error(
                "partition-failed",
                label,
                format!("read {storage_key} failed: {reason}"),
            ));
            return failed(storage_key, observed, 0, FailureStage::Get, reason);
        }
    };
    if existing.is_none() {
        sink.emit(&IngestEvent::info(
            "partition-created",
            label.clone(),
            format!("{storage_key} does not exist yet; it will be created"),
        ));
    }

    let merged = match merge(existing.as_deref(), records) {
        Ok(merged) => merged,
        Err(err) => {
            let reason = err.to_string();
            sink.emit(&IngestEvent::error(
                "partition-failed",
                label,
                format!("encoding offers for {storage_key} failed: {reason}"),
            ));
            return failed(storage_key, observed, 0, FailureStage::Encode, reason);
        }
    };

    if merged.malformed_lines > 0 {
        sink.emit(&IngestEvent::warn(
            "stored-line-malformed",
            label.clone(),
            format!(
                "{} stored line(s) in {storage_key} are not valid JSON; kept as-is",
                merged.malformed_lines
            ),
        ));
    }
    for slug in &merged.duplicate_slugs {
        sink.emit(&IngestEvent::info(
            "duplicate-skipped",
            label.clone(),
            format!("offer `{slug}` already stored; skipping"),
        ));
    }

    if !merged.needs_write() {
        sink.emit(&IngestEvent::info(
            "partition-unchanged",
            label,
            format!("all {observed} offer(s) for {key} are duplicates"),
        ));
        return PartitionOutcome {
            storage_key,
            observed,
            accepted: 0,
            duplicates: merged.duplicates,
            malformed_stored_lines: merged.malformed_lines,
            status: PartitionStatus::Unchanged,
        };
    }

    if let Err(err) = store.put(&storage_key, &merged.content) {
        let reason = err.to_string();
        sink.emit(&IngestEvent::error(
            "partition-failed",
            label,
            format!("write {storage_key} failed: {reason}"),
        ));
        return failed(
            storage_key,
            observed,
            merged.malformed_lines,
            FailureStage::Put,
            reason,
        );
    }

    sink.emit(&IngestEvent::info(
        "partition-written",
        label,
        format!("saved {} new offer(s) to {storage_key}", merged.accepted),
    ));
    PartitionOutcome {
        storage_key,
        observed,
        accepted: merged.accepted,
        duplicates: merged.duplicates,
        malformed_stored_lines: merged.malformed_lines,
        status: PartitionStatus::Written,
    }
}

/// Merge a batch of decoded offers into date-partitioned storage.
///
/// Invalid offers are rejected individually. Every partition is processed
/// even when a sibling partition's read or write fails.
pub fn ingest(
    store: &dyn ObjectStore,
    sink: &dyn EventSink,
    source_tag: &str,
    records: Vec<Value>,
) -> IngestReport {
    let mut report = IngestReport {
        total_observed: records.len(),
        ..IngestReport::default()
    };

    let mut groups: BTreeMap<PartitionKey, Vec<OfferRecord>> = BTreeMap::new();
    for value in records {
        let checked = OfferRecord::from_value(value).and_then(|record| match derive(&record) {
            Ok(key) => Ok((key, record)),
            Err(error) => Err(RejectedOffer {
                error,
                value: record.into_value(),
            }),
        });
        match checked {
            Ok((key, record)) => groups.entry(key).or_default().push(record),
            Err(rejected) => {
                report.total_rejected += 1;
                sink.emit(&IngestEvent::warn(
                    "record-rejected",
                    None,
                    format!(
                        "{}: {}: {}",
                        rejected.error.code(),
                        rejected.error,
                        truncate_with_ellipsis(&rejected.value.to_string(), MAX_REJECT_PREVIEW_CHARS)
                    ),
                ));
            }
        }
    }

    for (key, records) in groups {
        let outcome = merge_partition(store, sink, &key, key.storage_key(source_tag), &records);
        if outcome.is_failed() {
            report.total_failed += outcome.observed;
        } else {
            report.total_accepted += outcome.accepted;
            report.total_duplicates += outcome.duplicates;
        }
        report.partitions.insert(key, outcome);
    }

    sink.emit(&IngestEvent::info(
        "batch-summary",
        None,
        format!(
            "observed={} accepted={} duplicates={} rejected={} failed={}",
            report.total_observed,
            report.total_accepted,
            report.total_duplicates,
            report.total_rejected,
            report.total_failed
        ),
    ));
    report
}
