//! Voucher category commands.

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use marquee_delegation::{AssignOutcome, RevokeOutcome};
use marquee_types::StaffId;

use crate::GlobalArgs;
use crate::context::Context;
use crate::style::{self, SemanticStyle};

/// Show the current voucher manager.
pub fn holder(global: &GlobalArgs) -> Result<()> {
    let ctx = Context::load(global)?;
    match ctx.service.get_current_voucher_manager(&ctx.caller)? {
        Some(manager) => {
            style::print_labeled("Voucher manager", &manager.staff_name);
            style::print_labeled("Staff ID", &manager.staff_id.to_string());
        }
        None => style::print_hint("No staff member manages vouchers."),
    }
    Ok(())
}

/// Make a staff member the voucher manager.
///
/// Taking the category away from another staff member asks for
/// confirmation unless `yes` is set.
pub fn assign(global: &GlobalArgs, staff: u64, yes: bool) -> Result<()> {
    let ctx = Context::load(global)?;
    let plan = ctx
        .service
        .plan_voucher_assignment(&ctx.caller, StaffId::new(staff))?;

    if let Some(warning) = plan.warning() {
        style::print_warn(&warning);
        if !yes {
            let confirmed = Confirm::new()
                .with_prompt("Transfer voucher management?")
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }

    let result = ctx.service.confirm_voucher_assignment(&ctx.caller, &plan);
    ctx.save()?;

    match result? {
        AssignOutcome::Granted { to } => {
            style::print_success(&format!("Staff {} now manages vouchers", to.code()));
        }
        AssignOutcome::Transferred { from, to } => {
            style::print_success(&format!(
                "Voucher management moved from staff {} to staff {}",
                from.code(),
                to.code()
            ));
        }
        AssignOutcome::Unchanged { holder } => {
            style::print_hint(&format!("Staff {holder} already manages vouchers"));
        }
    }
    Ok(())
}

/// Revoke voucher permissions from a staff member.
pub fn revoke(global: &GlobalArgs, staff: u64) -> Result<()> {
    let ctx = Context::load(global)?;
    let outcome = ctx
        .service
        .revoke_voucher_permissions(&ctx.caller, StaffId::new(staff))?;
    ctx.save()?;

    match outcome {
        RevokeOutcome::Revoked => {
            style::print_success(&format!("Voucher permissions revoked from staff {}", staff.code()));
        }
        RevokeOutcome::NotHolder => {
            style::print_hint(&format!("Staff {staff} does not manage vouchers, nothing to revoke"));
        }
    }
    Ok(())
}
