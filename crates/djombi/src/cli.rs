//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use djombi_core::Category;

#[derive(Debug, Parser)]
#[command(name = "djombi")]
#[command(about = "Djombi mail client", long_about = None)]
pub struct Cli {
    /// Cookie jar file (defaults to the user data directory)
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exchange an Adafri token for a Djombi session
    Login {
        #[arg(long)]
        adafri_token: String,
    },

    /// Show the stored session
    Status,

    /// Manage the selected email account
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// Manage the current organization
    Org {
        #[command(subcommand)]
        action: OrgAction,
    },

    /// List the emails of a category (inbox, sent, spam, drafts)
    List {
        #[arg(value_parser = parse_category)]
        category: Category,
    },

    /// Send an email from the selected account
    Send {
        /// Recipient (repeatable)
        #[arg(long, required = true)]
        to: Vec<String>,
        /// Carbon-copy recipient (repeatable)
        #[arg(long)]
        cc: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },

    /// Move an email to another category
    Move {
        id: String,
        #[arg(value_parser = parse_category)]
        category: Category,
    },

    /// Manage drafts
    Drafts {
        #[command(subcommand)]
        action: DraftsAction,
    },

    /// Forget every stored credential
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum AccountsAction {
    /// Select the account email operations run against
    Select {
        id: String,
        /// Account kind (personal, professional, custom)
        #[arg(long = "type")]
        account_type: Option<String>,
    },
    /// Remember a linked account for later selection
    Link {
        id: String,
        email: String,
        #[arg(long = "type")]
        account_type: Option<String>,
    },
    /// List linked accounts
    List,
    /// Clear the selection
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum OrgAction {
    /// Set the current organization
    Set {
        id: String,
        /// Organization payload as JSON
        #[arg(long)]
        data: Option<String>,
    },
    /// Clear the current organization
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum DraftsAction {
    /// Save a new draft
    Save {
        #[arg(long)]
        to: Vec<String>,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    /// Delete a draft
    Delete { id: String },
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse()
}
