//! Link management service
//!
//! Owns the dual-store write path. The authoritative store is always written
//! first and the resolution store second; each second step has a
//! compensating action for the first one when it fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::LinksConfig;
use crate::errors::{Result, ShardlinkError};
use crate::resolution::{ResolutionRecord, ResolutionStore, codec, resolution_key};
use crate::services::code_encoder::CodeEncoder;
use crate::services::shard_counter::ShardCounter;
use crate::services::validation;
use crate::storage::{ClickCounters, LinkRecord, LinkRepository, LinkType, UtmInfo};

// ============ Request DTOs ============

/// Request to create a new link
///
/// Caller identity and quota decisions are made upstream; `creator` is
/// recorded as given.
#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    /// Custom short code; generated from the shard counter when None or empty
    pub custom: Option<String>,
    /// Custom host; empty means the default domain
    pub host: String,
    pub destination: String,
    pub query_params: BTreeMap<String, String>,
    /// UTM fields, merged into `query_params` (UTM wins on conflict)
    pub utm: Option<UtmInfo>,
    pub creator: String,
    pub note: String,
    pub tags: Vec<String>,
}

// ============ LinkService Implementation ============

pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    resolution: Arc<dyn ResolutionStore>,
    counter: ShardCounter,
    encoder: CodeEncoder,
    limits: LinksConfig,
}

impl LinkService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        resolution: Arc<dyn ResolutionStore>,
        counter: ShardCounter,
        encoder: CodeEncoder,
        limits: LinksConfig,
    ) -> Self {
        Self {
            links,
            resolution,
            counter,
            encoder,
            limits,
        }
    }

    /// Validate every field and return the merged query params
    fn validate_create(&self, req: &CreateLinkRequest) -> Result<BTreeMap<String, String>> {
        validation::validate_destination(&req.destination)?;
        validation::validate_host(&req.host)?;
        if let Some(custom) = req.custom.as_deref().filter(|c| !c.is_empty()) {
            validation::validate_custom_code(custom, &self.limits)?;
        }
        validation::validate_note(&req.note, &self.limits)?;
        validation::validate_tags(&req.tags, &self.limits)?;

        let mut params = req.query_params.clone();
        if let Some(utm) = &req.utm {
            params.extend(utm.to_query_params());
        }
        validation::validate_query_params(&params, &self.limits)?;
        Ok(params)
    }

    /// Mint a code from the shard counter
    async fn generate_code(&self) -> Result<String> {
        let digits = self.counter.next().await.inspect_err(|e| {
            error!("LinkService: counter increment failed: {}", e);
        })?;
        self.encoder
            .encode(&digits)
            .inspect_err(|e| log_internal("code encoding", &format!("{:?}", digits), e))
    }

    // ============ Write Path ============

    /// Create a new short link
    pub async fn create_link(&self, req: CreateLinkRequest) -> Result<LinkRecord> {
        let query_params = self.validate_create(&req)?;

        let (code, is_custom) = match req.custom.filter(|c| !c.is_empty()) {
            Some(c) => (c, true),
            None => (self.generate_code().await?, false),
        };

        let record = LinkRecord {
            id: uuid::Uuid::new_v4().to_string(),
            link_type: LinkType::Direct,
            deleted: false,
            code,
            host: req.host,
            destination: req.destination,
            is_custom,
            query_params,
            creator: req.creator,
            note: req.note,
            tags: req.tags,
            clicks: ClickCounters::default(),
            created_at: Utc::now(),
            deleted_at: None,
        };
        let projection = codec::encode(&ResolutionRecord::active(
            record.link_type,
            record.full_destination()?,
        ));

        // Phase 1: authoritative store. A uniqueness conflict ends here with
        // nothing written anywhere.
        let key = resolution_key(&record.code, &record.host);
        self.links
            .insert_link(&record)
            .await
            .inspect_err(|e| log_internal("authoritative insert", &key, e))?;

        // Phase 2: resolution store, create-if-absent.
        let failure = match self.resolution.create_if_absent(&key, projection).await {
            Ok(true) => {
                info!(
                    "LinkService: created link '{}' -> '{}' (id={}, custom={})",
                    key, record.destination, record.id, record.is_custom
                );
                return Ok(record);
            }
            Ok(false) => {
                error!(
                    "LinkService: resolution key '{}' already present after authoritative insert of {}",
                    key, record.id
                );
                ShardlinkError::internal(format!(
                    "resolution key '{}' unexpectedly present",
                    key
                ))
            }
            Err(e) => {
                error!(
                    "LinkService: resolution write for '{}' (id={}) failed: {}",
                    key, record.id, e
                );
                e
            }
        };

        self.rollback_create(&record, &key).await;
        Err(failure)
    }

    async fn rollback_create(&self, record: &LinkRecord, key: &str) {
        match self.links.remove_link(&record.id).await {
            Ok(true) => warn!(
                "LinkService: rolled back authoritative record {} for '{}'",
                record.id, key
            ),
            Ok(false) => error!(
                "LinkService: compensation failed: record {} for '{}' vanished before rollback",
                record.id, key
            ),
            Err(e) => error!(
                "LinkService: compensation failed: could not remove record {} for '{}', \
                 authoritative store now holds an unresolvable link: {}",
                record.id, key, e
            ),
        }
    }

    /// Soft-delete a link and tombstone its resolution record
    pub async fn delete_link(&self, id: &str) -> Result<()> {
        let record = self.get_link(id).await?;
        if record.deleted {
            info!("LinkService: link {} already deleted", id);
            return Ok(());
        }

        // Phase 1: authoritative soft delete.
        if !self
            .links
            .mark_deleted(id, Utc::now())
            .await
            .inspect_err(|e| log_internal("soft delete", id, e))?
        {
            return Err(ShardlinkError::not_found(format!("link '{}' not found", id)));
        }

        // Phase 2: tombstone overwrite.
        let key = resolution_key(&record.code, &record.host);
        let tombstone = codec::encode(&ResolutionRecord::Tombstone);
        if let Err(e) = self.resolution.put(&key, tombstone).await {
            error!(
                "LinkService: tombstone write for '{}' (id={}) failed: {}",
                key, id, e
            );
            match self.links.clear_deleted(id).await {
                Ok(_) => warn!("LinkService: reverted soft delete of {}", id),
                Err(ce) => error!(
                    "LinkService: compensation failed: link {} ('{}') stays deleted in the \
                     authoritative store but still resolves: {}",
                    id, key, ce
                ),
            }
            return Err(e);
        }

        info!("LinkService: deleted link '{}' (id={})", key, id);
        Ok(())
    }

    /// Re-project an authoritative record into the resolution store
    ///
    /// Manual repair for a resolution store that lost data. Overwrites
    /// unconditionally with either the active record or a tombstone.
    pub async fn republish(&self, id: &str) -> Result<ResolutionRecord> {
        let record = self.get_link(id).await?;

        let projection = if record.deleted {
            ResolutionRecord::Tombstone
        } else {
            ResolutionRecord::active(record.link_type, record.full_destination()?)
        };
        let key = resolution_key(&record.code, &record.host);
        self.resolution
            .put(&key, codec::encode(&projection))
            .await
            .inspect_err(|e| log_internal("republish write", &key, e))?;

        info!(
            "LinkService: republished '{}' (id={}, deleted={})",
            key, id, record.deleted
        );
        Ok(projection)
    }

    // ============ Read Path ============

    pub async fn get_link(&self, id: &str) -> Result<LinkRecord> {
        self.links
            .get_link(id)
            .await
            .inspect_err(|e| log_internal("lookup by id", id, e))?
            .ok_or_else(|| ShardlinkError::not_found(format!("link '{}' not found", id)))
    }

    pub async fn find_link(&self, code: &str, host: &str) -> Result<LinkRecord> {
        self.links
            .find_link(code, host)
            .await
            .inspect_err(|e| log_internal("lookup by code", &resolution_key(code, host), e))?
            .ok_or_else(|| ShardlinkError::not_found(format!("link '{}${}' not found", code, host)))
    }
}

/// 内部错误在转换为不透明形式之前记录完整上下文
fn log_internal(operation: &str, subject: &str, err: &ShardlinkError) {
    if err.is_internal() {
        error!("LinkService: {} for '{}' failed: {}", operation, subject, err);
    }
}
