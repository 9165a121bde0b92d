//! CLI command implementations.

pub mod directory;
pub mod edit;
pub mod permissions;
pub mod voucher;

use marquee_delegation::{BulkReport, DelegationError};
use marquee_types::{PartnerId, PermissionCode};

use crate::style;

pub(crate) fn partner_ids(ids: &[u64]) -> Vec<PartnerId> {
    ids.iter().copied().map(PartnerId::new).collect()
}

pub(crate) fn permission_codes(codes: &[String]) -> Vec<PermissionCode> {
    codes
        .iter()
        .map(|c| PermissionCode::new(c.trim().to_ascii_uppercase()))
        .collect()
}

/// Prints the per-pair failures of a partial failure before the error is
/// returned to `main`.
pub(crate) fn print_failures(err: &DelegationError) {
    if let DelegationError::PartialFailure { report } = err {
        print_failure_table(report);
    }
}

fn print_failure_table(report: &BulkReport) {
    let mut table = style::styled_table(&["Partner", "Permission", "Operation", "Reason"]);
    for failure in &report.failures {
        table.add_row(vec![
            failure.partner_id.to_string(),
            failure.permission_code.to_string(),
            format!("{:?}", failure.operation).to_lowercase(),
            failure.reason(),
        ]);
    }
    style::print_error(&format!(
        "{} of {} changes failed",
        report.failed_count(),
        report.attempted_count()
    ));
    println!("{table}");
    style::print_hint("Re-run the same command to retry; applied changes are kept.");
}
