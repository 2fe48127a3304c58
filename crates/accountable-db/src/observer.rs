//! Lifecycle observers.
//!
//! The record service invokes every observer registered for a record's table
//! around each write. Observers mutate the record in place; whatever they set
//! before the write is persisted by it.

use std::sync::Arc;

use accountable_core::{Actor, DeleteMode, LifecycleEvent, StampRole};

use crate::TRACING_TARGET_OBSERVER;
use crate::helpers::actor_to_value;
use crate::record::Record;

/// Per-call context handed to observer hooks.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Actor performing the change, `None` for system-initiated writes.
    pub actor: Option<&'a Actor>,
    pub event: LifecycleEvent,
    /// Set for `deleting` / `deleted` only.
    pub delete_mode: Option<DeleteMode>,
}

/// Callbacks around record writes. All hooks default to no-ops.
///
/// Hooks cannot fail. Persistence errors surface from the service call that
/// triggered them.
pub trait Observer: Send + Sync {
    fn creating(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn created(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn updating(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn updated(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn deleting(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn deleted(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn restoring(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
    fn restored(&self, _ctx: &HookContext<'_>, _record: &mut Record) {}
}

/// Dispatch `ctx.event` to the matching hook.
pub(crate) fn dispatch(observer: &dyn Observer, ctx: &HookContext<'_>, record: &mut Record) {
    match ctx.event {
        LifecycleEvent::Creating => observer.creating(ctx, record),
        LifecycleEvent::Created => observer.created(ctx, record),
        LifecycleEvent::Updating => observer.updating(ctx, record),
        LifecycleEvent::Updated => observer.updated(ctx, record),
        LifecycleEvent::Deleting => observer.deleting(ctx, record),
        LifecycleEvent::Deleted => observer.deleted(ctx, record),
        LifecycleEvent::Restoring => observer.restoring(ctx, record),
        LifecycleEvent::Restored => observer.restored(ctx, record),
    }
}

/// Writes the acting user into the stamp columns a record type supports.
///
/// | event | column | rule |
/// |-------|--------|------|
/// | creating | `created_by`, `updated_by` | fill when blank |
/// | updating | `updated_by` | always overwrite |
/// | deleting (soft) | `deleted_by` | always overwrite |
/// | restoring | `deleted_by` | clear |
///
/// Columns come from the record's schema, as resolved and checked when the
/// type was registered. A role the schema does not resolve, or a missing
/// actor, leaves the record untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountableObserver;

impl AccountableObserver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn stamp(ctx: &HookContext<'_>, record: &mut Record, role: StampRole, overwrite: bool) {
        let schema = Arc::clone(record.schema());
        let Some(column) = schema.stamp_column(role) else {
            tracing::trace!(target: TRACING_TARGET_OBSERVER, table = schema.table(), %role, event = %ctx.event, "stamp not supported, skipping");
            return;
        };
        let Some(actor) = ctx.actor else {
            tracing::trace!(target: TRACING_TARGET_OBSERVER, table = schema.table(), %role, event = %ctx.event, "no actor, skipping");
            return;
        };

        if !overwrite && !record.is_blank(column) {
            tracing::trace!(target: TRACING_TARGET_OBSERVER, table = schema.table(), column, "explicit value kept");
            return;
        }

        record.set(column, actor_to_value(&actor.id));
        tracing::debug!(target: TRACING_TARGET_OBSERVER, table = schema.table(), column, actor = %actor.id, event = %ctx.event, "stamped");
    }
}

impl Observer for AccountableObserver {
    fn creating(&self, ctx: &HookContext<'_>, record: &mut Record) {
        Self::stamp(ctx, record, StampRole::CreatedBy, false);
        Self::stamp(ctx, record, StampRole::UpdatedBy, false);
    }

    fn updating(&self, ctx: &HookContext<'_>, record: &mut Record) {
        Self::stamp(ctx, record, StampRole::UpdatedBy, true);
    }

    fn deleting(&self, ctx: &HookContext<'_>, record: &mut Record) {
        if ctx.delete_mode == Some(DeleteMode::Soft) {
            Self::stamp(ctx, record, StampRole::DeletedBy, true);
        }
    }

    fn restoring(&self, _ctx: &HookContext<'_>, record: &mut Record) {
        let schema = Arc::clone(record.schema());
        if let Some(column) = schema.stamp_column(StampRole::DeletedBy) {
            record.set(column, libsql::Value::Null);
        }
    }
}
