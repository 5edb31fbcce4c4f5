//! Loader service
//!
//! The request/response boundary around the core:
//! - `load_rules`: parse a rule document and publish it for a tenant
//! - `load_data`: decode records, map them with the tenant's rules, encode lines
//! - `load_static`: validate a static definition and encode its records
//!
//! Transport is out of scope; callers hand in bytes and get a [`LoadResponse`].

use crate::config::{DecodeErrorPolicy, LoaderConfig};
use crate::encoder::{encode_line, BatchEncoder};
use crate::error::{LoaderError, LoaderResult};
use crate::types::{Cancellation, LoadResponse, RecordFailure, StreamItem};
use marc_record::{DecodeError, RecordReader};
use marc_rules::{map, DomainRecord, ParseOptions, RuleSet, RuleSetRegistry, TenantId};
use marc_static::StaticLoader;
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Field added to mapped records when `assign_instance_ids` is on
pub const INSTANCE_ID_FIELD: &str = "id";

/// Service facade over registry, interpreter and static loader
#[derive(Debug)]
pub struct LoaderService {
    config: LoaderConfig,
    parse_options: ParseOptions,
    registry: Arc<RuleSetRegistry>,
    static_loader: StaticLoader,
}

impl Default for LoaderService {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl LoaderService {
    /// Create service with its own registry
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_registry(config, Arc::new(RuleSetRegistry::new()))
    }

    /// Create service over a shared registry
    #[must_use]
    pub fn with_registry(config: LoaderConfig, registry: Arc<RuleSetRegistry>) -> Self {
        Self {
            parse_options: config.parse_options(),
            static_loader: StaticLoader::new(config.shape_catalog()),
            config,
            registry,
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Tenant rule sets
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<RuleSetRegistry> {
        &self.registry
    }

    /// Parse a rule document and make it the tenant's rule set
    ///
    /// # Errors
    /// [`LoaderError::MissingTenant`], or the rule load error; the previous
    /// rule set stays in place on failure.
    pub fn load_rules(&self, tenant: &str, body: &[u8]) -> LoaderResult<LoadResponse> {
        let tenant = parse_tenant(tenant)?;
        self.registry.load(&tenant, body, &self.parse_options)?;
        Ok(LoadResponse::created(String::new()))
    }

    /// Decode, map and encode a batch of records
    ///
    /// # Errors
    /// [`LoaderError::MissingTenant`], [`LoaderError::NoRuleSet`], or a decode
    /// error under [`DecodeErrorPolicy::Abort`].
    pub fn load_data(&self, tenant: &str, stream_id: &str, body: &[u8]) -> LoaderResult<LoadResponse> {
        let rules = self.rules_for(tenant)?;
        tracing::info!(tenant, stream_id, bytes = body.len(), "data load started");

        let mut pipeline = self.pipeline(rules, body);
        let mut encoder = BatchEncoder::new(Vec::with_capacity(body.len()));
        for item in pipeline.by_ref() {
            let (ordinal, record) = item?;
            encoder.write_record(ordinal, &record)?;
        }

        let lines = encoder.lines_written();
        let skipped = pipeline.into_failures();
        let body = String::from_utf8(encoder.into_inner())
            .map_err(|e| LoaderError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        tracing::info!(tenant, stream_id, records = lines, skipped = skipped.len(), "data load finished");
        Ok(LoadResponse::created(body).with_skipped(skipped))
    }

    /// Streaming variant of [`load_data`](Self::load_data)
    ///
    /// Decoding and mapping run on a blocking worker; items arrive through a
    /// bounded channel in input order. Under [`DecodeErrorPolicy::Skip`] each
    /// skipped record arrives as [`StreamItem::Skipped`] ahead of the next line.
    /// The worker stops before its next record when the receiver is dropped or
    /// `cancel` is triggered. A failure is the last item.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`LoaderError::MissingTenant`] or [`LoaderError::NoRuleSet`], before any work starts.
    pub fn load_data_stream<R>(
        &self,
        tenant: &str,
        stream_id: &str,
        reader: R,
        cancel: Cancellation,
    ) -> LoaderResult<mpsc::Receiver<LoaderResult<StreamItem>>>
    where
        R: Read + Send + 'static,
    {
        let rules = self.rules_for(tenant)?;
        let (tx, rx) = mpsc::channel(self.config.stream_channel_capacity);
        let mut pipeline = self.pipeline(rules, reader);
        let tenant = tenant.to_string();
        let stream_id = stream_id.to_string();
        tracing::info!(%tenant, %stream_id, "streaming data load started");

        tokio::task::spawn_blocking(move || {
            let mut sent = 0usize;
            loop {
                if tx.is_closed() {
                    tracing::debug!(%tenant, %stream_id, sent, "receiver dropped, stopping");
                    return;
                }
                if cancel.is_cancelled() {
                    tracing::info!(%tenant, %stream_id, sent, "data load cancelled");
                    let _ = tx.blocking_send(Err(LoaderError::Cancelled));
                    return;
                }
                let item = pipeline.next();
                for failure in pipeline.unreported_failures() {
                    if tx.blocking_send(Ok(StreamItem::Skipped(failure))).is_err() {
                        tracing::debug!(%tenant, %stream_id, sent, "receiver dropped, stopping");
                        return;
                    }
                }
                let Some(item) = item else {
                    break;
                };
                let line = item.and_then(|(ordinal, record)| {
                    Ok(StreamItem::Line(encode_line(ordinal, &record)?))
                });
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() {
                    tracing::debug!(%tenant, %stream_id, sent, "receiver dropped, stopping");
                    return;
                }
                if failed {
                    return;
                }
                sent += 1;
            }
            tracing::info!(
                %tenant,
                %stream_id,
                records = sent,
                skipped = pipeline.failures().len(),
                "streaming data load finished"
            );
        });
        Ok(rx)
    }

    /// Validate a static definition and encode its records
    ///
    /// # Errors
    /// The static load error; nothing is emitted on failure.
    pub fn load_static(&self, stream_id: &str, body: &[u8]) -> LoaderResult<LoadResponse> {
        self.load_static_inner(stream_id, None, body)
    }

    /// As [`load_static`](Self::load_static), for an explicit record type
    ///
    /// # Errors
    /// The static load error; nothing is emitted on failure.
    pub fn load_static_as(&self, stream_id: &str, record_type: &str, body: &[u8]) -> LoaderResult<LoadResponse> {
        self.load_static_inner(stream_id, Some(record_type), body)
    }

    fn load_static_inner(
        &self,
        stream_id: &str,
        record_type: Option<&str>,
        body: &[u8],
    ) -> LoaderResult<LoadResponse> {
        let batch = match record_type {
            Some(record_type) => self.static_loader.load_as(record_type, body),
            None => self.static_loader.load(body),
        }
        .map_err(|e| {
            tracing::warn!(stream_id, kind = e.kind(), error = %e, "rejected static definition");
            e
        })?;

        let mut encoder = BatchEncoder::new(Vec::new());
        for record in batch.records() {
            encoder.push(record)?;
        }
        let body = String::from_utf8(encoder.into_inner())
            .map_err(|e| LoaderError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        tracing::info!(stream_id, record_type = batch.record_type(), records = batch.len(), "static load finished");
        Ok(LoadResponse::created(body))
    }

    fn rules_for(&self, tenant: &str) -> LoaderResult<Arc<RuleSet>> {
        let tenant = parse_tenant(tenant)?;
        self.registry.get(&tenant).ok_or_else(|| {
            tracing::warn!(tenant = %tenant, "data load without rule set");
            LoaderError::no_rule_set(tenant.as_str())
        })
    }

    fn pipeline<R: Read>(&self, rules: Arc<RuleSet>, reader: R) -> MapRecords<R> {
        MapRecords {
            reader: RecordReader::new(reader),
            rules,
            policy: self.config.decode_error_policy,
            assign_ids: self.config.assign_instance_ids,
            failures: Vec::new(),
            reported: 0,
            done: false,
        }
    }
}

fn parse_tenant(tenant: &str) -> LoaderResult<TenantId> {
    TenantId::new(tenant).map_err(|_| LoaderError::MissingTenant)
}

/// Decode → map, one record per `next`
struct MapRecords<R> {
    reader: RecordReader<R>,
    rules: Arc<RuleSet>,
    policy: DecodeErrorPolicy,
    assign_ids: bool,
    failures: Vec<RecordFailure>,
    /// Failures already handed to a stream
    reported: usize,
    done: bool,
}

impl<R> MapRecords<R> {
    /// Io failures end the stream under either policy
    fn skips(&self, error: &DecodeError) -> bool {
        self.policy == DecodeErrorPolicy::Skip && !matches!(error, DecodeError::Io { .. })
    }

    fn failures(&self) -> &[RecordFailure] {
        &self.failures
    }

    /// Failures recorded since the previous call
    fn unreported_failures(&mut self) -> Vec<RecordFailure> {
        let fresh = self.failures[self.reported..].to_vec();
        self.reported = self.failures.len();
        fresh
    }

    fn into_failures(self) -> Vec<RecordFailure> {
        self.failures
    }
}

impl<R: Read> Iterator for MapRecords<R> {
    type Item = LoaderResult<(usize, DomainRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.next()? {
                Ok(record) => {
                    let ordinal = self.reader.ordinal();
                    let mut mapped = map(&record, &self.rules);
                    if self.assign_ids && !mapped.contains_key(INSTANCE_ID_FIELD) {
                        mapped = with_generated_id(mapped);
                    }
                    tracing::debug!(ordinal, fields = record.fields().len(), "mapped record");
                    return Some(Ok((ordinal, mapped)));
                }
                Err(e) if self.skips(&e) => {
                    tracing::warn!(ordinal = e.ordinal(), offset = e.offset(), kind = e.kind(), error = %e, "skipping record");
                    self.failures.push(RecordFailure::from(&e));
                }
                Err(e) => {
                    tracing::warn!(ordinal = e.ordinal(), offset = e.offset(), kind = e.kind(), error = %e, "aborting data load");
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Put a fresh UUID `id` in front of the mapped fields
fn with_generated_id(mapped: DomainRecord) -> DomainRecord {
    let mut out = Map::with_capacity(mapped.len() + 1);
    out.insert(
        INSTANCE_ID_FIELD.to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );
    out.extend(mapped);
    out
}
