//! Encoding a batch of records into an export request.

use std::borrow::Cow;

use serde::Serialize;
use zenpipe_common::{Format, Record, RecordKind, Resource, encode_into};

use crate::config::{ExperimentalConfig, SdkLimits};
use crate::error::ExportError;
use crate::pool::PooledBuffer;

/// Log attributes stripped unless `emit_log_event_attributes` is enabled.
pub const LOG_EVENT_ATTRIBUTES: [&str; 2] = ["event.name", "event.id"];

/// Wire document published for one export attempt.
#[derive(Debug, Serialize)]
pub struct WireBatch<'a> {
    pub resource: Cow<'a, Resource>,
    pub records: Vec<Cow<'a, Record>>,
}

/// An encoded export request.
///
/// The payload lives in a pooled buffer that returns to its pool when the
/// request drops.
#[derive(Debug)]
pub struct ExportRequest {
    payload: PooledBuffer,
    format: Format,
    record_count: usize,
}

impl ExportRequest {
    /// Encode `batch` with `resource` into `buffer`, applying limits.
    ///
    /// Records are borrowed untouched unless a limit or filter changes them.
    pub fn encode(
        batch: &[Record],
        resource: &Resource,
        limits: &SdkLimits,
        experimental: &ExperimentalConfig,
        format: Format,
        mut buffer: PooledBuffer,
    ) -> Result<Self, ExportError> {
        let records = batch
            .iter()
            .map(|record| apply_limits(record, limits, experimental))
            .collect();
        let wire = WireBatch {
            resource: Cow::Borrowed(resource),
            records,
        };

        buffer.clear();
        encode_into(&wire, format, &mut buffer)?;

        Ok(Self {
            payload: buffer,
            format,
            record_count: batch.len(),
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

fn apply_limits<'a>(
    record: &'a Record,
    limits: &SdkLimits,
    experimental: &ExperimentalConfig,
) -> Cow<'a, Record> {
    let strip_events = record.kind == RecordKind::Log
        && !experimental.emit_log_event_attributes
        && LOG_EVENT_ATTRIBUTES
            .iter()
            .any(|key| record.attributes.contains_key(*key));
    let over_count = limits
        .attribute_count_limit
        .is_some_and(|max| record.attributes.len() > max);
    let over_length = limits.attribute_value_length_limit.is_some_and(|max| {
        record.attributes.values().any(|v| match v {
            zenpipe_common::AttributeValue::Text(s) => s.chars().count() > max,
            _ => false,
        })
    });

    if !(strip_events || over_count || over_length) {
        return Cow::Borrowed(record);
    }

    let mut record = record.clone();
    if strip_events {
        for key in LOG_EVENT_ATTRIBUTES {
            record.attributes.remove(key);
        }
    }
    if let Some(max) = limits.attribute_count_limit {
        // Attributes are key-ordered, so the kept set is deterministic.
        while record.attributes.len() > max {
            record.attributes.pop_last();
        }
    }
    if let Some(max) = limits.attribute_value_length_limit {
        for value in record.attributes.values_mut() {
            value.truncate(max);
        }
    }
    Cow::Owned(record)
}
