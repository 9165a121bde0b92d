//! Staff and partner directory commands.

use anyhow::Result;
use marquee_types::{PartnerId, StaffId};

use crate::GlobalArgs;
use crate::context::Context;
use crate::style::{self, SemanticStyle};

/// Register or rename a staff member.
pub fn add_staff(global: &GlobalArgs, id: u64, name: &str) -> Result<()> {
    let ctx = Context::load(global)?;
    ctx.store.register_staff(StaffId::new(id), name)?;
    ctx.save()?;
    style::print_success(&format!("Staff {} registered as {}", id.code(), name));
    Ok(())
}

/// List registered staff with their voucher status.
pub fn list_staff(global: &GlobalArgs) -> Result<()> {
    let ctx = Context::load(global)?;
    let holder = ctx.service.steward().current_holder()?;
    let staff = ctx.store.list_staff()?;

    if staff.is_empty() {
        style::print_hint("No staff registered. Use 'marquee staff add <id> <name>'.");
        return Ok(());
    }

    let mut table = style::styled_table(&["ID", "Name", "Vouchers"]);
    for record in &staff {
        let vouchers = if holder == Some(record.id) { "holder" } else { "" };
        table.add_row(vec![record.id.to_string(), record.name.clone(), vouchers.to_string()]);
    }
    style::print_table(&table, staff.len(), "staff member");
    Ok(())
}

/// Register or rename a partner.
pub fn add_partner(global: &GlobalArgs, id: u64, name: &str) -> Result<()> {
    let ctx = Context::load(global)?;
    ctx.store.register_partner(PartnerId::new(id), name)?;
    ctx.save()?;
    style::print_success(&format!("Partner {} registered as {}", id.code(), name));
    Ok(())
}

pub fn list_partners(global: &GlobalArgs) -> Result<()> {
    let ctx = Context::load(global)?;
    let partners = ctx.store.list_partners()?;

    if partners.is_empty() {
        style::print_hint("No partners registered. Use 'marquee partner add <id> <name>'.");
        return Ok(());
    }

    let mut table = style::styled_table(&["ID", "Name"]);
    for record in &partners {
        table.add_row(vec![record.id.to_string(), record.name.clone()]);
    }
    style::print_table(&table, partners.len(), "partner");
    Ok(())
}

/// Record that a staff member manages a partner.
pub fn assign_partner(global: &GlobalArgs, staff: u64, partner: u64) -> Result<()> {
    let ctx = Context::load(global)?;
    let created = ctx.service.assign_partner_to_staff(
        &ctx.caller,
        StaffId::new(staff),
        PartnerId::new(partner),
    )?;
    ctx.save()?;

    if created {
        style::print_success(&format!(
            "Staff {} now manages partner {}",
            staff.code(),
            partner.code()
        ));
    } else {
        style::print_warn(&format!(
            "Staff {staff} already manages partner {partner}"
        ));
    }
    Ok(())
}
