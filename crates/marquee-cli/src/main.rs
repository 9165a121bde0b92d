//! Marquee operator CLI.
//!
//! Manages staff permission delegation for the cinema manager console.
//!
//! # Quick Start
//!
//! ```bash
//! # Register people and partners
//! marquee staff add 2 "Ada Lovelace"
//! marquee partner add 10 "Lumiere Cinemas"
//! marquee --caller 1 assign-partner --staff 2 --partner 10
//!
//! # Delegate permissions
//! marquee --caller 1 grant --staff 2 --partner 10 --permission CONTRACT_READ
//! marquee --caller 1 edit --staff 2 --partner 10 --select-all movie
//!
//! # Hand the voucher category to one staff member
//! marquee --caller 1 voucher assign --staff 2
//! ```

mod commands;
mod context;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use marquee_delegation::Authority;

/// Marquee - staff permission delegation for cinema partner managers.
#[derive(Parser)]
#[command(name = "marquee")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Staff ID of the operator issuing the command.
    #[arg(long, global = true, default_value = "0")]
    pub caller: u64,

    /// Authority level of the operator.
    #[arg(long, global = true, value_enum, default_value = "manager")]
    pub authority: AuthorityArg,

    /// Project directory used for layered configuration.
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Load a single configuration file instead of the layered sources.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Authority levels accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityArg {
    Staff,
    ManagerStaff,
    Manager,
    Administrator,
}

impl From<AuthorityArg> for Authority {
    fn from(value: AuthorityArg) -> Self {
        match value {
            AuthorityArg::Staff => Authority::Staff,
            AuthorityArg::ManagerStaff => Authority::ManagerStaff,
            AuthorityArg::Manager => Authority::Manager,
            AuthorityArg::Administrator => Authority::Administrator,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Staff directory commands.
    #[command(subcommand)]
    Staff(StaffCommands),

    /// Partner directory commands.
    #[command(subcommand)]
    Partner(PartnerCommands),

    /// Record that a staff member manages a partner.
    AssignPartner {
        /// Staff ID.
        #[arg(long)]
        staff: u64,

        /// Partner ID.
        #[arg(long)]
        partner: u64,
    },

    /// List permission groups available for per-partner delegation.
    Groups,

    /// Show a staff member's permissions per partner.
    Show {
        /// Staff ID.
        #[arg(long)]
        staff: u64,

        /// Limit to these partners (repeatable).
        #[arg(long = "partner")]
        partners: Vec<u64>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Grant permissions on partners.
    Grant(ChangeArgs),

    /// Revoke permissions on partners.
    Revoke(ChangeArgs),

    /// Stage permission changes for a partner selection and commit them.
    Edit {
        /// Staff ID.
        #[arg(long)]
        staff: u64,

        /// Selected partners (repeatable).
        #[arg(long = "partner")]
        partners: Vec<u64>,

        /// Toggle a permission code (repeatable).
        #[arg(long = "toggle", value_name = "CODE")]
        toggles: Vec<String>,

        /// Grant every permission of a resource group (repeatable).
        #[arg(long = "select-all", value_name = "RESOURCE")]
        select_all: Vec<String>,

        /// Revoke every permission of a resource group (repeatable).
        #[arg(long = "deselect-all", value_name = "RESOURCE")]
        deselect_all: Vec<String>,

        /// Show the resulting status without committing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Voucher category commands.
    #[command(subcommand)]
    Voucher(VoucherCommands),
}

#[derive(Args)]
struct ChangeArgs {
    /// Staff ID.
    #[arg(long)]
    staff: u64,

    /// Partner IDs (repeatable).
    #[arg(long = "partner", required = true)]
    partners: Vec<u64>,

    /// Permission codes (repeatable).
    #[arg(long = "permission", required = true)]
    permissions: Vec<String>,
}

#[derive(Subcommand)]
enum StaffCommands {
    /// Register or rename a staff member.
    Add {
        /// Staff ID.
        id: u64,

        /// Display name.
        name: String,
    },

    /// List registered staff.
    List,
}

#[derive(Subcommand)]
enum PartnerCommands {
    /// Register or rename a partner.
    Add {
        /// Partner ID.
        id: u64,

        /// Display name.
        name: String,
    },

    /// List registered partners.
    List,
}

#[derive(Subcommand)]
enum VoucherCommands {
    /// Show the current voucher manager.
    Holder,

    /// Make a staff member the voucher manager.
    Assign {
        /// Staff ID.
        #[arg(long)]
        staff: u64,

        /// Skip the transfer confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Revoke voucher permissions from a staff member.
    Revoke {
        /// Staff ID.
        #[arg(long)]
        staff: u64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.global.no_color);
    let global = cli.global;

    match cli.command {
        Commands::Staff(cmd) => match cmd {
            StaffCommands::Add { id, name } => commands::directory::add_staff(&global, id, &name),
            StaffCommands::List => commands::directory::list_staff(&global),
        },
        Commands::Partner(cmd) => match cmd {
            PartnerCommands::Add { id, name } => {
                commands::directory::add_partner(&global, id, &name)
            }
            PartnerCommands::List => commands::directory::list_partners(&global),
        },
        Commands::AssignPartner { staff, partner } => {
            commands::directory::assign_partner(&global, staff, partner)
        }
        Commands::Groups => commands::permissions::groups(&global),
        Commands::Show {
            staff,
            partners,
            json,
        } => commands::permissions::show(&global, staff, &partners, json),
        Commands::Grant(args) => {
            commands::permissions::grant(&global, args.staff, &args.partners, &args.permissions)
        }
        Commands::Revoke(args) => {
            commands::permissions::revoke(&global, args.staff, &args.partners, &args.permissions)
        }
        Commands::Edit {
            staff,
            partners,
            toggles,
            select_all,
            deselect_all,
            dry_run,
        } => commands::edit::run(
            &global,
            &commands::edit::EditPlan {
                staff,
                partners,
                toggles,
                select_all,
                deselect_all,
                dry_run,
            },
        ),
        Commands::Voucher(cmd) => match cmd {
            VoucherCommands::Holder => commands::voucher::holder(&global),
            VoucherCommands::Assign { staff, yes } => commands::voucher::assign(&global, staff, yes),
            VoucherCommands::Revoke { staff } => commands::voucher::revoke(&global, staff),
        },
    }
}
