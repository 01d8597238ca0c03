use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use vestige_config::VestigeConfig;
use vestige_core::audit::DeletionAuditRecord;
use vestige_db::audit::AuditFilter;
use vestige_db::service::VestigeService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::HistoryArgs;
use crate::commands::effective_limit;
use crate::output::output;

/// One deletion history row as printed by `vst history`.
#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub id: Option<i64>,
    pub entity_type: String,
    pub object_id: String,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `OrderLine(2)` style summary of cascaded children.
    pub cascade: Option<String>,
    pub data: Value,
}

impl From<DeletionAuditRecord> for HistoryView {
    fn from(record: DeletionAuditRecord) -> Self {
        Self {
            cascade: record.cascade_summary(),
            data: record.payload(),
            id: record.id,
            entity_type: record.entity_type,
            object_id: record.primary_key,
            deleted_by: record.actor_id,
            created_at: record.created_at,
        }
    }
}

/// Handle `vst history`.
pub async fn handle(
    args: &HistoryArgs,
    config: &VestigeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let service = VestigeService::from_config(config)
        .await
        .context("failed to open vestige database")?;

    if let Some(id) = args.id {
        let entry = service.history_entry(id).await?;
        return output(&HistoryView::from(entry), flags.format);
    }

    let filter = build_filter(args, flags)?;
    let entries = service.query_history(&filter).await?;
    let views: Vec<HistoryView> = entries.into_iter().map(HistoryView::from).collect();
    output(&views, flags.format)
}

fn build_filter(args: &HistoryArgs, flags: &GlobalFlags) -> anyhow::Result<AuditFilter> {
    Ok(AuditFilter {
        entity_type: args.entity_type.clone(),
        object_id: args.object_id.clone(),
        actor_id: args.actor.clone(),
        since: args.since.as_deref().map(|s| parse_time(s, "since")).transpose()?,
        until: args.until.as_deref().map(|s| parse_time(s, "until")).transpose()?,
        limit: Some(effective_limit(flags.limit, 50)),
    })
}

fn parse_time(value: &str, flag: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("--{flag} must be an RFC 3339 timestamp, got '{value}'"))
}
