//! Staged editing of one staff member's permissions over a partner selection.

use anyhow::{Result, bail};
use comfy_table::Cell;
use marquee_delegation::EditSession;
use marquee_types::{ResourceType, StaffId};

use super::{partner_ids, permission_codes, print_failures};
use crate::GlobalArgs;
use crate::context::Context;
use crate::style::{self, SemanticStyle};

/// Edits requested on the command line.
pub struct EditPlan {
    pub staff: u64,
    pub partners: Vec<u64>,
    pub toggles: Vec<String>,
    pub select_all: Vec<String>,
    pub deselect_all: Vec<String>,
    pub dry_run: bool,
}

impl EditPlan {
    fn has_edits(&self) -> bool {
        !(self.toggles.is_empty() && self.select_all.is_empty() && self.deselect_all.is_empty())
    }
}

/// Applies group selections, then group deselections, then toggles, and
/// commits unless this is a dry run.
pub fn run(global: &GlobalArgs, plan: &EditPlan) -> Result<()> {
    let ctx = Context::load(global)?;
    let mut session = ctx
        .service
        .open_session(&ctx.caller, StaffId::new(plan.staff))?;

    if session.is_terminal_empty() {
        style::print_warn(&format!(
            "{} manages no partners. Use 'marquee assign-partner' first.",
            session.staff().name
        ));
        return Ok(());
    }

    let requested = partner_ids(&plan.partners);
    let assigned = session.assigned_partners();
    for partner in requested.iter().filter(|p| !assigned.contains(*p)) {
        style::print_warn(&format!(
            "{} does not manage partner {partner}, ignoring it",
            session.staff().name
        ));
    }
    session.select_partners(requested);

    for name in &plan.select_all {
        let resource = parse_resource(name);
        if !session.select_resource(&resource) {
            bail!("{name} is not a delegable resource group");
        }
    }
    for name in &plan.deselect_all {
        let resource = parse_resource(name);
        if !session.deselect_resource(&resource) {
            bail!("{name} is not a delegable resource group");
        }
    }
    for code in permission_codes(&plan.toggles) {
        session.toggle(&code);
    }

    print_status(&session);

    if plan.dry_run || !plan.has_edits() {
        style::print_hint(&format!(
            "{} staged change(s) not committed",
            session.changes().len()
        ));
        return Ok(());
    }

    let result = ctx.service.commit_session(&ctx.caller, &mut session);
    ctx.save()?;

    match result {
        Ok(report) => {
            style::print_success(&format!(
                "Committed for {} on {} partner(s): {} granted, {} revoked",
                session.staff().name,
                report.partners.len(),
                report.granted.len(),
                report.revoked.len()
            ));
            if !report.refreshed {
                style::print_warn("Changes were saved but the view could not be reloaded");
            }
            Ok(())
        }
        Err(e) => {
            print_failures(&e);
            Err(e.into())
        }
    }
}

fn parse_resource(name: &str) -> ResourceType {
    let Ok(resource) = name.parse::<ResourceType>();
    resource
}

fn print_status(session: &EditSession) {
    let n = session.selected_partners().len();
    let changes = session.changes();

    style::print_header(&format!(
        "{} (staff {}), {} of {} partner(s) selected",
        session.staff().name,
        session.staff_id(),
        n,
        session.assigned_partners().len()
    ));

    let mut table = style::styled_table(&["Resource", "Code", "Granted", "After", "Status", "Pending"]);
    let mut rows = 0;
    for group in session.matrix().catalog().delegable_groups() {
        for def in &group.permissions {
            let code = &def.permission_code;
            let pending = if changes.is_pending_grant(code) {
                "+ grant".success()
            } else if changes.is_pending_revoke(code) {
                "- revoke".error()
            } else {
                String::new()
            };
            table.add_row(vec![
                Cell::new(&group.resource_name),
                Cell::new(code.as_str()),
                Cell::new(format!("{}/{n}", session.granted_count(code))),
                Cell::new(format!("{}/{n}", session.effective_granted_count(code))),
                style::status_cell(session.status(code)),
                Cell::new(pending),
            ]);
            rows += 1;
        }
    }
    style::print_table(&table, rows, "permission");
}
