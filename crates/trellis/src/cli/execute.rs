//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands. Reads go
//! through [`RecordStore::load`](crate::store::RecordStore::load); every
//! change goes through one locked update cycle so the checks and the write
//! see the same records.

use anyhow::Result;
use chrono::Utc;

use super::args::{
    BlockedArgs, CloseArgs, CommentArgs, CompactArgs, CreateArgs, DepAction, DepArgs, InitArgs,
    ListArgs, ProgressArgs, ReadyArgs, ShowArgs, StatusArgs,
};
use crate::app::App;
use crate::domain::{
    AcceptanceCriterion, Dependency, DependencyKind, Record, RecordId, RecordType, Status,
};
use crate::error::Error;
use crate::graph;
use crate::id_generation::IdGenerator;
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.prefix.as_deref()).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "trellis_dir": result.trellis_dir,
            "config_file": result.config_file,
            "data_file": result.data_file,
            "prefix": result.prefix,
        }))?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized trellis in {}", result.trellis_dir.display());
            println!("  Config:  {}", result.config_file.display());
            println!("  Records: {}", result.data_file.display());
            println!("  Record prefix: {}", result.prefix);
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// How often `create` regenerates an id that another writer took first.
const CREATE_ATTEMPTS: usize = 3;

/// Execute the create command
pub async fn execute_create(app: &App, args: &CreateArgs, output_mode: OutputMode) -> Result<()> {
    let title = match &args.title {
        Some(t) => t.clone(),
        None => {
            eprint!("Title: ");
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            super::validators::validate_title(input.trim()).map_err(|e| anyhow::anyhow!(e))?
        }
    };

    let mut dependencies = Vec::new();
    if let Some(parent) = &args.parent {
        dependencies.push(Dependency::new(parent.as_str(), DependencyKind::ParentChild));
    }
    for blocker in &args.blocked_by {
        dependencies.push(Dependency::new(blocker.as_str(), DependencyKind::BlockedBy));
    }

    let mut record = Record::new("", title);
    record.description = args.description.clone();
    record.record_type = args.record_type.map(Into::into);
    record.priority = args.priority.map(Into::into);
    record.assignee.clone_from(&args.assignee);
    record.labels.clone_from(&args.labels);
    record.notes.clone_from(&args.notes);
    record.acceptance_criteria = args
        .criteria
        .iter()
        .map(|text| AcceptanceCriterion::new(text.as_str(), false))
        .collect();
    record.dependencies = dependencies;

    let description = args.description.clone().unwrap_or_default();
    let mut written = false;
    for _ in 0..CREATE_ATTEMPTS {
        let (records, _) = app.store().load().await?;
        if let Some(missing) = record
            .dependencies
            .iter()
            .find(|dep| !records.iter().any(|r| r.id == dep.target_id))
        {
            return Err(Error::RecordNotFound(missing.target_id.clone()).into());
        }

        record.id = IdGenerator::for_records(app.prefix(), &records)
            .record_id(&record.title, &description)?;
        if app.store().create(record.clone()).await? {
            written = true;
            break;
        }
        tracing::debug!(id = %record.id, "Generated id was taken meanwhile, retrying");
    }
    if !written {
        anyhow::bail!("Could not find a free record id after {CREATE_ATTEMPTS} attempts");
    }
    let created = fetch(app, &record.id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&created)?,
        OutputMode::Text => println!("Created record: {}", created.id),
    }

    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let (records, _) = app.store().load().await?;
    let candidates = if args.top_level {
        graph::top_level(&records)
    } else {
        records
    };

    let status = args.status.map(Status::from);
    let record_type = args.record_type.map(RecordType::from);
    let matching: Vec<Record> = candidates
        .into_iter()
        .filter(|r| status.is_none_or(|s| r.status == s))
        .filter(|r| record_type.is_none_or(|t| r.record_type == Some(t)))
        .filter(|r| matches_assignee(r, args.assignee.as_deref()))
        .filter(|r| {
            args.label
                .as_ref()
                .is_none_or(|label| r.labels.contains(label))
        })
        .collect();

    output::print_records(&matching, output_mode)?;
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &App, args: &ShowArgs, output_mode: OutputMode) -> Result<()> {
    let id = RecordId::new(args.record_id.as_str());
    let (records, _) = app.store().load().await?;

    let mut index = graph::build_index(&records);
    let view = index
        .remove(&id)
        .ok_or_else(|| Error::RecordNotFound(id.clone()))?;

    let has_subtasks = !graph::epic_subtasks(&id, &records).is_empty();
    let progress = (has_subtasks || view.record.record_type == Some(RecordType::Epic))
        .then(|| graph::epic_progress(&id, &records));

    output::print_record_details(&view, progress.as_ref(), output_mode)?;
    Ok(())
}

/// Execute the ready command
///
/// Most urgent first, then oldest first. Unprioritized records sort last.
pub async fn execute_ready(app: &App, args: &ReadyArgs, output_mode: OutputMode) -> Result<()> {
    let (records, _) = app.store().load().await?;

    let mut ready: Vec<Record> = graph::ready_work(&records)
        .into_iter()
        .filter(|r| matches_assignee(r, args.assignee.as_deref()))
        .collect();
    ready.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    if let Some(limit) = args.limit {
        ready.truncate(limit);
    }

    output::print_records(&ready, output_mode)?;
    Ok(())
}

/// Execute the blocked command
pub async fn execute_blocked(
    app: &App,
    args: &BlockedArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let (records, _) = app.store().load().await?;

    let blocked: Vec<(Record, Vec<Record>)> = graph::blocked(&records)
        .into_iter()
        .filter(|r| matches_assignee(r, args.assignee.as_deref()))
        .map(|r| {
            let blockers = graph::blockers_of(&r.id, &records);
            (r, blockers)
        })
        .collect();

    output::print_blocked(&blocked, output_mode)?;
    Ok(())
}

/// Execute the status command
pub async fn execute_status(app: &App, args: &StatusArgs, output_mode: OutputMode) -> Result<()> {
    let id = RecordId::new(args.record_id.as_str());
    let status = Status::from(args.status);

    if status == Status::Closed {
        return close_record(app, &id, false, output_mode).await;
    }

    app.store()
        .try_update(|mut records| {
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| Error::RecordNotFound(id.clone()))?;
            record.set_status(status, Utc::now());
            Ok(records)
        })
        .await?;

    let updated = fetch(app, &id).await?;
    match output_mode {
        OutputMode::Json => output::print_json(&updated)?,
        OutputMode::Text => println!("{} is now {}", updated.id, updated.status),
    }
    Ok(())
}

/// Execute the close command
pub async fn execute_close(app: &App, args: &CloseArgs, output_mode: OutputMode) -> Result<()> {
    let id = RecordId::new(args.record_id.as_str());
    close_record(app, &id, args.force, output_mode).await
}

/// Close `id` if [`graph::can_close`] allows it or `force` is set.
///
/// The check runs inside the update cycle, against the records about to be
/// rewritten.
async fn close_record(app: &App, id: &RecordId, force: bool, output_mode: OutputMode) -> Result<()> {
    let mut overridden = None;

    app.store()
        .try_update(|mut records| {
            let check = graph::can_close(id, &records)?;
            if !check.can_close {
                let reason = check.reason.unwrap_or_default();
                if !force {
                    return Err(Error::CloseRefused {
                        id: id.clone(),
                        reason,
                    });
                }
                overridden = Some(reason);
            }

            if let Some(record) = records.iter_mut().find(|r| &r.id == id) {
                record.set_status(Status::Closed, Utc::now());
            }
            Ok(records)
        })
        .await?;

    let (records, _) = app.store().load().await?;
    let closed = records
        .iter()
        .find(|r| &r.id == id)
        .cloned()
        .ok_or_else(|| Error::RecordNotFound(id.clone()))?;
    let parent_ready = graph::subtask_parent(id, &records)
        .filter(|parent| !parent.is_closed() && graph::should_close_epic(&parent.id, &records));

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "record": closed,
            "forced": overridden.is_some(),
            "overridden_reason": overridden,
            "parent_ready_to_close": parent_ready.as_ref().map(|p| &p.id),
        }))?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!("{} {}", output::success("Closed record:", &config), closed.id);
            if let Some(reason) = overridden {
                println!("  {} {reason}", output::warning("Forced past:", &config));
            }
            if let Some(parent) = parent_ready {
                println!(
                    "  All subtasks of {} are closed; it can be closed now",
                    parent.id
                );
            }
        }
    }
    Ok(())
}

/// Execute the comment command
pub async fn execute_comment(
    app: &App,
    args: &CommentArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let id = RecordId::new(args.record_id.as_str());
    let author = args
        .author
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "anonymous".to_string());

    let comment = app.store().add_comment(&id, &author, &args.content).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&comment)?,
        OutputMode::Text => println!("Added comment {} to {id}", comment.id),
    }
    Ok(())
}

/// Execute the dep command
pub async fn execute_dep(app: &App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    match &args.action {
        DepAction::Add { from, to, kind } => {
            let from = RecordId::new(from.as_str());
            let to = RecordId::new(to.as_str());
            let kind = DependencyKind::from(*kind);

            app.store()
                .try_update(|records| graph::add_dependency(&from, &to, kind, &records))
                .await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "from": from,
                    "to": to,
                    "kind": kind,
                }))?,
                OutputMode::Text => println!("Added dependency: {from} -> {to} ({kind})"),
            }
        }
        DepAction::Remove { from, to, kind } => {
            let from = RecordId::new(from.as_str());
            let to = RecordId::new(to.as_str());
            let kind = kind.map(DependencyKind::from);
            let mut removed = 0;

            app.store()
                .update(|records| {
                    let before = edge_count(&records);
                    let records = graph::remove_dependency(&from, &to, kind, &records);
                    removed = before - edge_count(&records);
                    records
                })
                .await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "from": from,
                    "to": to,
                    "kind": kind,
                    "removed": removed,
                }))?,
                OutputMode::Text if removed == 0 => {
                    println!("No dependency from {from} to {to}");
                }
                OutputMode::Text => println!("Removed {removed} dependency(ies): {from} -> {to}"),
            }
        }
    }
    Ok(())
}

/// Execute the progress command
pub async fn execute_progress(
    app: &App,
    args: &ProgressArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let id = RecordId::new(args.epic_id.as_str());
    let (records, _) = app.store().load().await?;
    let epic = records
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| Error::RecordNotFound(id.clone()))?;

    let progress = graph::epic_progress(&id, &records);
    let subtasks = graph::epic_subtasks(&id, &records);
    let ready_to_close = !epic.is_closed() && graph::should_close_epic(&id, &records);

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "epic_id": id,
            "progress": progress,
            "ready_to_close": ready_to_close,
            "subtasks": subtasks,
        }))?,
        OutputMode::Text => {
            println!("{}: {}", epic.id, epic.title);
            println!(
                "{}/{} subtasks closed, {}% complete",
                progress.completed, progress.total, progress.percentage
            );
            if ready_to_close {
                println!("All subtasks are closed; the epic can be closed");
            }
            if !subtasks.is_empty() {
                println!();
                output::print_records(&subtasks, OutputMode::Text)?;
            }
        }
    }
    Ok(())
}

/// Execute the compact command
///
/// Shows what compaction would change. The record file is left alone.
pub async fn execute_compact(app: &App, args: &CompactArgs, output_mode: OutputMode) -> Result<()> {
    let mut policy = app.config().compaction_policy();
    if let Some(days) = args.days {
        policy.age_threshold_days = days;
    }

    let (records, _) = app.store().load().await?;
    let compacted = policy.compact_at(&records, Utc::now());
    let changed: Vec<Record> = compacted
        .into_iter()
        .zip(&records)
        .filter(|(after, before)| after != *before)
        .map(|(after, _)| after)
        .collect();

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "age_threshold_days": policy.age_threshold_days,
            "would_compact": changed,
        }))?,
        OutputMode::Text => {
            println!(
                "{} closed record(s) older than {} days would be compacted (preview, nothing written)",
                changed.len(),
                policy.age_threshold_days
            );
            if !changed.is_empty() {
                println!();
                output::print_records(&changed, OutputMode::Text)?;
            }
        }
    }
    Ok(())
}

/// Load the store and pick out one record.
async fn fetch(app: &App, id: &RecordId) -> Result<Record> {
    let (records, _) = app.store().load().await?;
    let record = records
        .into_iter()
        .find(|r| &r.id == id)
        .ok_or_else(|| Error::RecordNotFound(id.clone()))?;
    Ok(record)
}

fn matches_assignee(record: &Record, assignee: Option<&str>) -> bool {
    assignee.is_none_or(|a| record.assignee.as_deref() == Some(a))
}

fn edge_count(records: &[Record]) -> usize {
    records.iter().map(|r| r.dependencies.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;

    #[test]
    fn assignee_filter() {
        let mut record = Record::new("t-1", "One");
        record.assignee = Some("sam".to_string());

        assert!(matches_assignee(&record, None));
        assert!(matches_assignee(&record, Some("sam")));
        assert!(!matches_assignee(&record, Some("kim")));
        assert!(!matches_assignee(&Record::new("t-2", "Two"), Some("sam")));
    }

    #[test]
    fn edge_count_sums_all_records() {
        let mut a = Record::new("a", "A");
        a.dependencies = vec![
            Dependency::new("b", DependencyKind::BlockedBy),
            Dependency::new("b", DependencyKind::Related),
        ];
        let mut b = Record::new("b", "B");
        b.priority = Some(Priority::Low);
        b.dependencies = vec![Dependency::new("a", DependencyKind::DiscoveredFrom)];

        assert_eq!(edge_count(&[a, b]), 3);
    }
}
