//! # Stemma CLI Module
//!
//! This module implements the CLI interface for Stemma.
//!
//! ## Available Commands
//!
//! - `init` - Create an empty tree file
//! - `status` - Show tree counts
//! - `add-member` / `update-member` / `delete-member` - Edit members
//! - `add-relationship` / `delete-relationship` - Edit relationships
//! - `focus` - Set the person of interest
//! - `show` - Show one member with relatives
//! - `summary` - Plain-text relationship summary
//! - `render` - Emit the render view as JSON
//! - `merge` - Reconcile another tree into this one
//! - `export` / `import` - Convert between JSON and binary snapshots
//! - `hash` - Compute BLAKE3 hash of the tree snapshot

mod commands;

use crate::config::{DEFAULT_CONFIG_FILE, StemmaConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stemma_core::{DateParts, MemberDraft, StemmaError, TraditionalDraft};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stemma - family tree keeper
///
/// Records members and relationships, infers the obvious ones, and merges
/// trees that describe the same family.
#[derive(Parser, Debug)]
#[command(name = "stemma")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the tree file (defaults to the configured tree)
    #[arg(short = 'T', long, global = true)]
    pub tree: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short = 'C', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Optional member fields shared by add and update.
#[derive(Args, Debug, Clone, Default)]
pub struct MemberFields {
    /// Nickname (repeatable; replaces existing nicknames)
    #[arg(long = "nickname")]
    pub nicknames: Vec<String>,

    /// Gender (MALE, FEMALE, OTHER, UNKNOWN)
    #[arg(short, long)]
    pub gender: Option<String>,

    /// Living status
    #[arg(long)]
    pub alive: Option<bool>,

    /// Date of birth
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub born: Option<String>,

    /// Date of death
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub died: Option<String>,

    /// Wedding date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub married: Option<String>,

    /// Tamil month of birth (e.g. THAI)
    #[arg(long, value_name = "MONTH")]
    pub born_month: Option<String>,

    /// Birth star (e.g. ROHINI)
    #[arg(long, value_name = "STAR")]
    pub born_star: Option<String>,

    /// Tamil month of death
    #[arg(long, value_name = "MONTH")]
    pub died_month: Option<String>,

    /// Paksham of death (KRISHNA or SHUKLA)
    #[arg(long, value_name = "PAKSHAM")]
    pub died_paksham: Option<String>,

    /// Thithi of death (e.g. AMAVASYA)
    #[arg(long, value_name = "THITHI")]
    pub died_thithi: Option<String>,

    /// Extra attribute (repeatable)
    #[arg(long = "info", value_name = "KEY=VALUE")]
    pub info: Vec<String>,
}

impl MemberFields {
    /// Overwrite the fields of `draft` that were given on the command line.
    pub fn apply(&self, draft: &mut MemberDraft) -> Result<(), StemmaError> {
        if !self.nicknames.is_empty() {
            draft.nicknames = self.nicknames.clone();
        }
        if let Some(gender) = &self.gender {
            draft.gender = Some(gender.clone());
        }
        if self.alive.is_some() {
            draft.alive = self.alive;
        }
        if let Some(born) = &self.born {
            draft.date_of_birth = Some(DateParts::parse(born)?);
        }
        if let Some(died) = &self.died {
            draft.date_of_death = Some(DateParts::parse(died)?);
        }
        if let Some(married) = &self.married {
            draft.wedding_date = Some(DateParts::parse(married)?);
        }
        if self.born_month.is_some() || self.born_star.is_some() {
            let date = draft
                .traditional_date_of_birth
                .get_or_insert_with(TraditionalDraft::default);
            overwrite(&mut date.month, &self.born_month);
            overwrite(&mut date.star, &self.born_star);
        }
        let death_parts = [&self.died_month, &self.died_paksham, &self.died_thithi];
        if death_parts.iter().any(|p| p.is_some()) {
            let date = draft
                .traditional_date_of_death
                .get_or_insert_with(TraditionalDraft::default);
            overwrite(&mut date.month, &self.died_month);
            overwrite(&mut date.paksham, &self.died_paksham);
            overwrite(&mut date.thithi, &self.died_thithi);
        }
        for entry in &self.info {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                StemmaError::invalid_input(
                    "parse_info",
                    Some("info"),
                    format!("Expected KEY=VALUE, got '{}'.", entry),
                )
            })?;
            draft
                .additional_info
                .insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(())
    }
}

fn overwrite(slot: &mut Option<String>, given: &Option<String>) {
    if given.is_some() {
        slot.clone_from(given);
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty tree file
    Init {
        /// Overwrite an existing tree
        #[arg(short, long)]
        force: bool,

        /// Also write a default configuration file if none exists
        #[arg(long)]
        write_config: bool,
    },

    /// Show tree status
    Status,

    /// Add a family member
    AddMember {
        /// Display name
        name: String,

        /// Requested member ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        fields: MemberFields,

        /// Existing member the new one is related to
        #[arg(short, long)]
        source: Option<String>,

        /// Relationship from the source to the new member (child, parent, spouse)
        #[arg(short, long)]
        relationship: Option<String>,

        /// Do not infer further relationships
        #[arg(long)]
        no_infer: bool,
    },

    /// Add a relationship between two members
    AddRelationship {
        /// Source member ID
        source: String,

        /// Target member ID
        target: String,

        /// Relationship from source to target (child, parent, spouse)
        relationship: String,

        /// Do not infer further relationships
        #[arg(long)]
        no_infer: bool,
    },

    /// Update fields of a member
    UpdateMember {
        /// Member ID
        id: String,

        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        fields: MemberFields,
    },

    /// Delete a member and its relationships
    DeleteMember {
        /// Member ID
        id: String,

        /// Also delete relatives left without any relationship
        #[arg(long)]
        cascade: bool,
    },

    /// Delete a relationship
    DeleteRelationship {
        /// Source member ID
        source: String,

        /// Target member ID
        target: String,

        /// Keep the reciprocal relationship (refused: a tree file always
        /// stores both directions)
        #[arg(long)]
        keep_inverse: bool,
    },

    /// Make a member the person of interest
    Focus {
        /// Member ID
        id: String,
    },

    /// Show one member with parents, spouses and children
    Show {
        /// Member ID
        id: String,
    },

    /// Print a relationship summary
    Summary {
        /// Maximum number of members listed
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Emit the render view as JSON
    Render {
        /// Person of interest
        #[arg(short, long)]
        poi: Option<String>,

        /// Neighborhood of the person of interest to expand (repeatable)
        #[arg(short, long)]
        expand: Vec<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge another tree into this one
    Merge {
        /// Tree file to merge in (JSON or binary)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Export the tree
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, binary)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Replace the tree with an imported one
    Import {
        /// Input file path (JSON or binary)
        #[arg(short, long)]
        input: PathBuf,

        /// Overwrite a non-empty tree
        #[arg(short, long)]
        force: bool,
    },

    /// Compute BLAKE3 cryptographic hash of the tree snapshot
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), StemmaError> {
    let config = StemmaConfig::load(&cli.config)?;
    let tree = cli
        .tree
        .clone()
        .unwrap_or_else(|| config.tree.default_path.clone());
    let ctx = Context {
        tree,
        config_path: cli.config.clone(),
        config,
        json_mode: cli.json,
    };

    match cli.command {
        Some(Commands::Init {
            force,
            write_config,
        }) => cmd_init(&ctx, force, write_config),
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::AddMember {
            name,
            id,
            fields,
            source,
            relationship,
            no_infer,
        }) => cmd_add_member(
            &ctx,
            &name,
            id,
            &fields,
            source.as_deref(),
            relationship.as_deref(),
            !no_infer,
        ),
        Some(Commands::AddRelationship {
            source,
            target,
            relationship,
            no_infer,
        }) => cmd_add_relationship(&ctx, &source, &target, &relationship, !no_infer),
        Some(Commands::UpdateMember { id, name, fields }) => {
            cmd_update_member(&ctx, &id, name.as_deref(), &fields)
        }
        Some(Commands::DeleteMember { id, cascade }) => cmd_delete_member(&ctx, &id, cascade),
        Some(Commands::DeleteRelationship {
            source,
            target,
            keep_inverse,
        }) => cmd_delete_relationship(&ctx, &source, &target, keep_inverse),
        Some(Commands::Focus { id }) => cmd_focus(&ctx, &id),
        Some(Commands::Show { id }) => cmd_show(&ctx, &id),
        Some(Commands::Summary { limit }) => cmd_summary(&ctx, limit),
        Some(Commands::Render {
            poi,
            expand,
            output,
        }) => cmd_render(&ctx, poi.as_deref(), &expand, output.as_deref()),
        Some(Commands::Merge { input }) => cmd_merge(&ctx, &input),
        Some(Commands::Export { output, format }) => cmd_export(&ctx, &output, &format),
        Some(Commands::Import { input, force }) => cmd_import(&ctx, &input, force),
        Some(Commands::Hash) => cmd_hash(&ctx),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}
