//! Permission catalog and bulk grant/revoke commands.

use std::collections::BTreeSet;

use anyhow::Result;
use marquee_delegation::{BulkReport, ChangeKind, PermissionChangeRequest};
use marquee_types::{PartnerId, StaffId};

use super::{partner_ids, permission_codes, print_failures};
use crate::GlobalArgs;
use crate::context::Context;
use crate::style::{self, SemanticStyle};

/// List permission groups available for per-partner delegation.
pub fn groups(global: &GlobalArgs) -> Result<()> {
    let ctx = Context::load(global)?;
    let groups = ctx.service.list_permission_groups(&ctx.caller)?;

    let mut table = style::styled_table(&["Resource", "Code", "Name", "Description"]);
    let mut count = 0;
    for group in &groups {
        for def in &group.permissions {
            table.add_row(vec![
                group.resource_name.clone(),
                def.permission_code.to_string(),
                def.permission_name.clone(),
                def.description.clone(),
            ]);
            count += 1;
        }
    }
    style::print_table(&table, count, "permission");

    let exclusive = ctx.service.catalog().exclusive_resource_type();
    style::print_hint(&format!(
        "{} permissions are assigned to a single staff member with 'marquee voucher assign'.",
        exclusive.display_name()
    ));
    Ok(())
}

/// Show a staff member's permissions per partner.
pub fn show(global: &GlobalArgs, staff: u64, partners: &[u64], json: bool) -> Result<()> {
    let ctx = Context::load(global)?;
    let filter: Option<BTreeSet<PartnerId>> = if partners.is_empty() {
        None
    } else {
        Some(partner_ids(partners).into_iter().collect())
    };

    let entries =
        ctx.service
            .get_staff_permissions(&ctx.caller, StaffId::new(staff), filter.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        style::print_warn(&format!("Staff {staff} manages none of the requested partners"));
        return Ok(());
    }

    let mut table = style::styled_table(&["Partner", "Name", "Permissions"]);
    for entry in &entries {
        let codes: Vec<String> = entry
            .permissions
            .iter()
            .map(|p| p.permission_code.to_string())
            .collect();
        let codes = if codes.is_empty() {
            "-".to_string()
        } else {
            codes.join(", ")
        };
        table.add_row(vec![
            entry.partner_id.to_string(),
            entry.partner_name.clone(),
            codes,
        ]);
    }
    style::print_table(&table, entries.len(), "partner");
    Ok(())
}

/// Grant permissions on partners.
pub fn grant(global: &GlobalArgs, staff: u64, partners: &[u64], codes: &[String]) -> Result<()> {
    change(global, staff, partners, codes, ChangeKind::Grant)
}

/// Revoke permissions on partners.
pub fn revoke(global: &GlobalArgs, staff: u64, partners: &[u64], codes: &[String]) -> Result<()> {
    change(global, staff, partners, codes, ChangeKind::Revoke)
}

fn change(
    global: &GlobalArgs,
    staff: u64,
    partners: &[u64],
    codes: &[String],
    kind: ChangeKind,
) -> Result<()> {
    let ctx = Context::load(global)?;
    let request = PermissionChangeRequest::new(partner_ids(partners), permission_codes(codes));
    let staff_id = StaffId::new(staff);

    let result = match kind {
        ChangeKind::Grant => ctx.service.grant_permissions(&ctx.caller, staff_id, &request),
        ChangeKind::Revoke => ctx.service.revoke_permissions(&ctx.caller, staff_id, &request),
    };

    // Partial failures still applied some pairs
    ctx.save()?;

    match result {
        Ok(report) => {
            print_summary(&report, kind);
            Ok(())
        }
        Err(e) => {
            print_failures(&e);
            Err(e.into())
        }
    }
}

fn print_summary(report: &BulkReport, kind: ChangeKind) {
    let verb = match kind {
        ChangeKind::Grant => "granted",
        ChangeKind::Revoke => "revoked",
    };
    style::print_success(&format!(
        "{} permission(s) {verb}, {} already in place",
        report.applied.to_string().code(),
        report.unchanged
    ));
}
