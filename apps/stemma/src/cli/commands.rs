//! # CLI Command Implementations
//!
//! Every command opens the tree file, runs one session operation and, when
//! the operation mutates, writes the tree back. A failed operation leaves
//! the file untouched.

use super::MemberFields;
use crate::config::StemmaConfig;
use stemma_core::{
    EdgeType, EntityStore, MemberDraft, MemberId, Neighborhood, OperationResult, StemmaError,
    TreeSession,
    primitives::{MAGIC_BYTES, MAX_SNAPSHOT_SIZE},
    snapshot_digest, store_from_bytes, store_from_json, store_to_bytes, store_to_json,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Tree file the command works on.
    pub tree: PathBuf,
    /// Configuration file, written by `init --write-config`.
    pub config_path: PathBuf,
    pub config: StemmaConfig,
    pub json_mode: bool,
}

// =============================================================================
// FILE HANDLING
// =============================================================================

/// Maximum tree file size accepted for reading.
const MAX_TREE_FILE_SIZE: u64 = MAX_SNAPSHOT_SIZE as u64;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), StemmaError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StemmaError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(StemmaError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StemmaError> {
    let canonical = path.canonicalize().map_err(|e| {
        StemmaError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StemmaError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, StemmaError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        StemmaError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(StemmaError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| StemmaError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// On-disk encoding of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    /// Pretty JSON, the interchange format.
    Json,
    /// Versioned postcard snapshot.
    Binary,
}

impl TreeFormat {
    /// Binary for `.stma` and `.bin` files, JSON otherwise.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("stma" | "bin") => Self::Binary,
            _ => Self::Json,
        }
    }
}

impl FromStr for TreeFormat {
    type Err = StemmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "binary" | "bin" | "stma" => Ok(Self::Binary),
            other => Err(StemmaError::invalid_input(
                "export",
                Some("format"),
                format!("Unknown format '{}'. Use json or binary.", other),
            )),
        }
    }
}

/// Read a tree file in either format; binary is recognized by its magic.
pub fn read_store(path: &Path) -> Result<EntityStore, StemmaError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_TREE_FILE_SIZE)?;

    let bytes = std::fs::read(&validated)
        .map_err(|e| StemmaError::IoError(format!("Read file: {}", e)))?;

    if bytes.starts_with(MAGIC_BYTES) {
        store_from_bytes(&bytes)
    } else {
        let text = String::from_utf8(bytes).map_err(|e| {
            StemmaError::SerializationError(format!("Tree file is not UTF-8 JSON: {}", e))
        })?;
        store_from_json(&text)
    }
}

/// Write `store` to `path` in `format`.
pub fn write_store(
    path: &Path,
    store: &EntityStore,
    format: TreeFormat,
) -> Result<(), StemmaError> {
    let validated = validate_output_path(path)?;
    let bytes = match format {
        TreeFormat::Json => store_to_json(store)?.into_bytes(),
        TreeFormat::Binary => store_to_bytes(store)?,
    };
    std::fs::write(&validated, bytes)
        .map_err(|e| StemmaError::IoError(format!("Write file: {}", e)))?;
    tracing::debug!(path = %validated.display(), ?format, "tree written");
    Ok(())
}

/// Open the context's tree; a missing file is an empty tree.
pub fn open_session(ctx: &Context) -> Result<TreeSession, StemmaError> {
    let store = if ctx.tree.exists() {
        read_store(&ctx.tree)?
    } else {
        tracing::debug!(path = %ctx.tree.display(), "tree file not found, starting empty");
        EntityStore::new()
    };

    let ids = ctx.config.ids.generator(store.members.keys());
    let mut session = TreeSession::new(ids, ctx.config.merge);
    session.load_tree(&store)?;
    Ok(session)
}

/// Write the session back to the context's tree, in the file's own format.
pub fn save_session(ctx: &Context, session: &TreeSession) -> Result<(), StemmaError> {
    write_store(&ctx.tree, &session.save_tree(), TreeFormat::for_path(&ctx.tree))
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_result(ctx: &Context, result: &OperationResult) {
    if ctx.json_mode {
        print_json(result);
        return;
    }

    println!("{}", result.message);
    if let Some(id) = &result.member_id {
        println!("Member: {}", id);
    }
    for edge in &result.established {
        println!("  + {} -[{}]-> {}", edge.source, edge.edge_type, edge.target);
    }
    for edge in &result.removed_edges {
        println!("  - {} -[{}]-> {}", edge.source, edge.edge_type, edge.target);
    }
    for id in &result.removed_members {
        println!("  - member {}", id);
    }
}

fn parse_relationship(token: &str) -> Result<EdgeType, StemmaError> {
    EdgeType::from_str(token)
}

// =============================================================================
// INIT / STATUS
// =============================================================================

/// Create an empty tree file.
pub fn cmd_init(ctx: &Context, force: bool, write_config: bool) -> Result<(), StemmaError> {
    if ctx.tree.exists() && !force {
        return Err(StemmaError::invalid_input(
            "init",
            Some("tree"),
            format!(
                "Tree file '{}' already exists. Use --force to overwrite.",
                ctx.tree.display()
            ),
        ));
    }

    write_store(&ctx.tree, &EntityStore::new(), TreeFormat::for_path(&ctx.tree))?;
    tracing::info!(path = %ctx.tree.display(), "empty tree created");

    if write_config && !ctx.config_path.exists() {
        let validated = validate_output_path(&ctx.config_path)?;
        std::fs::write(&validated, ctx.config.to_toml()?)
            .map_err(|e| StemmaError::IoError(format!("Write config: {}", e)))?;
        tracing::info!(path = %validated.display(), "configuration written");
    }

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "tree": ctx.tree.to_string_lossy(),
            "created": true
        }));
    } else {
        println!("Created empty tree at {}", ctx.tree.display());
    }
    Ok(())
}

/// Show tree counts.
pub fn cmd_status(ctx: &Context) -> Result<(), StemmaError> {
    let session = open_session(ctx)?;
    let graph = session.graph();
    let family_units = graph.family_units().count();

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "tree": ctx.tree.to_string_lossy(),
            "members": graph.node_count(),
            "edges": graph.edge_count(),
            "family_units": family_units,
            "person_of_interest": graph.person_of_interest(),
        }));
        return Ok(());
    }

    println!("Stemma Tree Status");
    println!("==================");
    println!("Tree:         {}", ctx.tree.display());
    println!();
    println!("Members:      {}", graph.node_count());
    println!("Edges:        {}", graph.edge_count());
    println!("Family units: {}", family_units);
    match graph.person_of_interest() {
        Some(poi) => println!("Focus:        {}", poi),
        None => println!("Focus:        (none)"),
    }

    Ok(())
}

// =============================================================================
// MEMBER COMMANDS
// =============================================================================

/// Add a member, optionally related to an existing one.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add_member(
    ctx: &Context,
    name: &str,
    id: Option<String>,
    fields: &MemberFields,
    source: Option<&str>,
    relationship: Option<&str>,
    infer: bool,
) -> Result<(), StemmaError> {
    let mut draft = MemberDraft::named(name);
    draft.id = id;
    fields.apply(&mut draft)?;

    let source = source.map(MemberId::new);
    let relationship = relationship.map(parse_relationship).transpose()?;

    let mut session = open_session(ctx)?;
    let result = session.add_member(&draft, source.as_ref(), relationship, infer)?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Replace the given fields of an existing member.
pub fn cmd_update_member(
    ctx: &Context,
    id: &str,
    name: Option<&str>,
    fields: &MemberFields,
) -> Result<(), StemmaError> {
    let id = MemberId::new(id);
    let mut session = open_session(ctx)?;

    let current = &session.graph().require(&id, "update_member")?.member;
    let mut draft = MemberDraft::from_member(current);
    if let Some(name) = name {
        draft.name = name.to_string();
    }
    fields.apply(&mut draft)?;

    let result = session.update_member(&id, &draft)?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Delete a member.
pub fn cmd_delete_member(ctx: &Context, id: &str, cascade: bool) -> Result<(), StemmaError> {
    let mut session = open_session(ctx)?;
    let result = session.delete_member(&MemberId::new(id), cascade)?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Show one member with parents, spouses and children.
pub fn cmd_show(ctx: &Context, id: &str) -> Result<(), StemmaError> {
    let session = open_session(ctx)?;
    let info = session.member_info(&MemberId::new(id))?;

    if ctx.json_mode {
        print_json(&info);
        return Ok(());
    }

    let member = &info.member;
    println!("{} ({})", member.name, member.id);
    if !member.nicknames.is_empty() {
        println!("  Also known as: {}", member.nicknames.join(", "));
    }
    println!("  Gender:  {}", member.gender);
    println!("  Alive:   {}", if member.is_alive() { "yes" } else { "no" });
    if let Some(date) = member.date_of_birth {
        println!("  Born:    {}", date);
    }
    if let Some(date) = member.date_of_death {
        println!("  Died:    {}", date);
    }
    if let Some(date) = member.wedding_date {
        println!("  Married: {}", date);
    }
    if let Some(date) = &member.traditional_date_of_birth {
        println!("  Born (traditional): {}", date);
    }
    if let Some(date) = &member.traditional_date_of_death {
        println!("  Died (traditional): {}", date);
    }
    for (key, value) in &member.additional_info {
        println!("  {}: {}", key, value);
    }

    for (label, relatives) in [
        ("Parents", &info.parents),
        ("Spouses", &info.spouses),
        ("Children", &info.children),
    ] {
        if relatives.is_empty() {
            continue;
        }
        println!();
        println!("{}:", label);
        for relative in relatives {
            println!("  - {} ({})", relative.name, relative.id);
        }
    }

    Ok(())
}

// =============================================================================
// RELATIONSHIP COMMANDS
// =============================================================================

/// Assert a relationship and its inferences.
pub fn cmd_add_relationship(
    ctx: &Context,
    source: &str,
    target: &str,
    relationship: &str,
    infer: bool,
) -> Result<(), StemmaError> {
    let edge_type = parse_relationship(relationship)?;
    let mut session = open_session(ctx)?;
    let result = session.add_relationship(
        &MemberId::new(source),
        &MemberId::new(target),
        edge_type,
        infer,
    )?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Delete a relationship.
pub fn cmd_delete_relationship(
    ctx: &Context,
    source: &str,
    target: &str,
    keep_inverse: bool,
) -> Result<(), StemmaError> {
    if keep_inverse {
        return Err(StemmaError::invalid_input(
            "delete_relationship",
            Some("keep_inverse"),
            "A tree file cannot keep one direction of a relationship: loading restores \
             every reciprocal. Omit --keep-inverse to delete both directions.",
        ));
    }
    let mut session = open_session(ctx)?;
    let result =
        session.delete_relationship(&MemberId::new(source), &MemberId::new(target), true)?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

// =============================================================================
// VIEW COMMANDS
// =============================================================================

/// Make `id` the person of interest and store it with the tree.
pub fn cmd_focus(ctx: &Context, id: &str) -> Result<(), StemmaError> {
    let mut session = open_session(ctx)?;
    let result = session.set_person_of_interest(&MemberId::new(id))?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Print the relationship summary.
pub fn cmd_summary(ctx: &Context, limit: usize) -> Result<(), StemmaError> {
    let session = open_session(ctx)?;
    let summary = session.summary_text(limit);

    if ctx.json_mode {
        print_json(&serde_json::json!({ "summary": summary }));
    } else {
        print!("{}", summary);
    }
    Ok(())
}

/// Emit the render view, after focusing and expanding as requested.
///
/// The view state is not written back to the tree file.
pub fn cmd_render(
    ctx: &Context,
    poi: Option<&str>,
    expand: &[String],
    output: Option<&Path>,
) -> Result<(), StemmaError> {
    let mut session = open_session(ctx)?;
    if let Some(poi) = poi {
        session.set_person_of_interest(&MemberId::new(poi))?;
    }

    if !expand.is_empty() {
        let focus = session.graph().person_of_interest().cloned().ok_or_else(|| {
            StemmaError::invalid_input(
                "render",
                Some("poi"),
                "No person of interest to expand around. Pass --poi.",
            )
        })?;
        for token in expand {
            let neighborhood = Neighborhood::from_str(token)?;
            let shown = session.expand(&focus, neighborhood)?;
            tracing::debug!(%neighborhood, shown = shown.len(), "neighborhood expanded");
        }
    }

    let view = session.render_view();
    let json = serde_json::to_string_pretty(&view)
        .map_err(|e| StemmaError::SerializationError(format!("Render view: {}", e)))?;

    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, json)
                .map_err(|e| StemmaError::IoError(format!("Write file: {}", e)))?;
            if !ctx.json_mode {
                println!(
                    "Rendered {} nodes and {} edges to {}",
                    view.nodes.len(),
                    view.edges.len(),
                    validated.display()
                );
            }
        }
        None => println!("{}", json),
    }
    Ok(())
}

// =============================================================================
// MERGE / EXPORT / IMPORT / HASH
// =============================================================================

/// Merge another tree file into the open tree.
pub fn cmd_merge(ctx: &Context, input: &Path) -> Result<(), StemmaError> {
    let incoming = read_store(input)?;
    let mut session = open_session(ctx)?;
    let (result, report) = session.merge_tree(&incoming)?;
    save_session(ctx, &session)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "result": result,
            "report": report,
        }));
        return Ok(());
    }

    println!("{}", result.message);
    println!(
        "Matched: {}  Added: {}  Skipped: {}",
        report.matched.len(),
        report.added.len(),
        report.skipped_sources.len()
    );
    for m in &report.matched {
        println!(
            "  = {} -> {} (score {})",
            m.incoming, m.matched, m.score_per_mille
        );
    }
    for id in &report.added {
        println!("  + {}", id);
    }
    Ok(())
}

/// Export the tree to a file.
pub fn cmd_export(ctx: &Context, output: &Path, format: &str) -> Result<(), StemmaError> {
    let format = TreeFormat::from_str(format)?;
    let session = open_session(ctx)?;
    let store = session.save_tree();
    write_store(output, &store, format)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "members": store.member_count(),
            "relationships": store.relationship_count(),
        }));
    } else {
        println!(
            "Exported {} members to {}",
            store.member_count(),
            output.display()
        );
    }
    Ok(())
}

/// Replace the tree with the contents of another file.
pub fn cmd_import(ctx: &Context, input: &Path, force: bool) -> Result<(), StemmaError> {
    let store = read_store(input)?;
    let mut session = open_session(ctx)?;

    if !session.graph().is_empty() && !force {
        return Err(StemmaError::invalid_input(
            "import",
            Some("tree"),
            format!(
                "Tree '{}' already has {} members. Use --force to replace it.",
                ctx.tree.display(),
                session.graph().node_count()
            ),
        ));
    }

    let result = session.load_tree(&store)?;
    save_session(ctx, &session)?;

    print_result(ctx, &result);
    Ok(())
}

/// Compute the BLAKE3 digest of the tree snapshot.
pub fn cmd_hash(ctx: &Context) -> Result<(), StemmaError> {
    let session = open_session(ctx)?;
    let store = session.save_tree();
    let digest = snapshot_digest(&store)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "algorithm": "BLAKE3",
            "hash": digest,
            "members": store.member_count(),
        }));
    } else {
        println!("BLAKE3: {}", digest);
    }
    Ok(())
}
