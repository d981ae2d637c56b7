/*!
 * Orbit command-line front end.
 *
 * Two families of subcommands:
 * - `copy`, the legacy single-direction transfer pipeline in [`orbit::core`].
 * - `compare`/`sync`, the bidirectional sync engine in [`orbit::sync`].
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use orbit::config::CopyConfig;
use orbit::core::copy_file;
use orbit::sync::{
    copy_to_with_overwrite, AndFilter, CancelToken, ComparisonVariant, CopyToItem, HardFilter,
    LastSyncState, NoopCallback, OneWayPolicy, SyncDirection, SyncEngine, SyncItem, SyncPolicy,
};
use orbit::system::LocalSystem;
use orbit_core_interface::{ItemType, NoopProgress, OrbitSystem, RelPath};

#[derive(Parser)]
#[command(
    name = "orbit",
    version,
    about = "Bidirectional file synchronization decision engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Single-direction file copy (the legacy pipeline).
    Copy {
        source: PathBuf,
        dest: PathBuf,
        #[arg(long)]
        verify_checksum: bool,
    },
    /// Scan two folders and print the resolved category/direction for every item.
    Compare {
        left: PathBuf,
        right: PathBuf,
        #[arg(long, value_enum, default_value = "two-way")]
        policy: PolicyArg,
        #[arg(long, value_enum, default_value = "time-size")]
        variant: VariantArg,
    },
    /// Scan, resolve, and execute the resulting plan.
    Sync {
        left: PathBuf,
        right: PathBuf,
        #[arg(long, value_enum, default_value = "two-way")]
        policy: PolicyArg,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum PolicyArg {
    Mirror,
    Update,
    TwoWay,
}

#[derive(Copy, Clone, ValueEnum)]
enum VariantArg {
    TimeSize,
    Content,
    Size,
}

impl From<VariantArg> for ComparisonVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::TimeSize => ComparisonVariant::TimeSize,
            VariantArg::Content => ComparisonVariant::Content,
            VariantArg::Size => ComparisonVariant::Size,
        }
    }
}

fn build_policy(arg: PolicyArg) -> SyncPolicy {
    match arg {
        PolicyArg::Mirror => SyncPolicy::OneWay {
            policy: OneWayPolicy::mirror(),
            detect_moves: true,
        },
        PolicyArg::Update => SyncPolicy::OneWay {
            policy: OneWayPolicy::update(),
            detect_moves: true,
        },
        PolicyArg::TwoWay => SyncPolicy::TwoWay { detect_moves: true },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Copy {
            source,
            dest,
            verify_checksum,
        } => run_copy(&source, &dest, verify_checksum),
        Commands::Compare {
            left,
            right,
            policy,
            variant,
        } => run_compare(left, right, build_policy(policy), variant.into()).await,
        Commands::Sync {
            left,
            right,
            policy,
            dry_run,
        } => run_sync(left, right, build_policy(policy), dry_run).await,
    }
}

fn run_copy(source: &Path, dest: &Path, verify_checksum: bool) -> Result<()> {
    let mut config = CopyConfig::default();
    config.verify_checksum = verify_checksum;
    let stats = copy_file(source, dest, &config).context("copy failed")?;
    println!(
        "copied {} bytes in {:?}",
        stats.bytes_copied, stats.duration
    );
    Ok(())
}

async fn scanned_pair(
    left: PathBuf,
    right: PathBuf,
    policy: SyncPolicy,
    variant: ComparisonVariant,
) -> Result<orbit::sync::BaseFolderPair> {
    let left_device: Arc<dyn OrbitSystem> = Arc::new(LocalSystem::new(left));
    let right_device: Arc<dyn OrbitSystem> = Arc::new(LocalSystem::new(right));
    let mut pair =
        orbit::sync::BaseFolderPair::new(left_device, right_device, RelPath::root(), RelPath::root());
    orbit::sync::scan(&mut pair).await.context("scan failed")?;

    let engine = SyncEngine::new(policy, variant).with_hard_filter(AndFilter {
        left: HardFilter::new(),
        right: HardFilter::new(),
    });
    let db = LastSyncState::new();
    let cancel = CancelToken::new();
    engine
        .resolve(&mut pair, &db, &cancel, &NoopCallback)
        .context("direction resolution failed")?;
    Ok(pair)
}

async fn run_compare(
    left: PathBuf,
    right: PathBuf,
    policy: SyncPolicy,
    variant: ComparisonVariant,
) -> Result<()> {
    let pair = scanned_pair(left, right, policy, variant).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["path", "category", "direction"]);

    for id in pair.walk_sorted() {
        let Some(node) = pair.tree.get(id) else {
            continue;
        };
        let path = node
            .rel_path()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default();
        let category = node
            .category()
            .map(|c| format!("{c:?}"))
            .unwrap_or_else(|| "-".to_string());
        let direction = match node.direction() {
            Some(SyncDirection::None) | None => "-".to_string(),
            Some(d) => format!("{d:?}"),
        };
        table.add_row(vec![path, category, direction]);
    }

    println!("{table}");
    Ok(())
}

async fn run_sync(left: PathBuf, right: PathBuf, policy: SyncPolicy, dry_run: bool) -> Result<()> {
    let pair = scanned_pair(left, right, policy, ComparisonVariant::TimeSize).await?;

    let mut to_right = Vec::new();
    let mut to_left = Vec::new();
    for id in pair.walk_sorted() {
        let Some(SyncItem::File(f)) = pair.tree.get(id) else {
            continue;
        };
        match &f.direction {
            Some(SyncDirection::Right) => to_right.push(CopyToItem {
                rel_path: RelPath::new(&f.name),
                item_type: ItemType::File,
            }),
            Some(SyncDirection::Left) => to_left.push(CopyToItem {
                rel_path: RelPath::new(&f.name),
                item_type: ItemType::File,
            }),
            _ => {}
        }
    }

    if dry_run {
        for item in &to_right {
            println!("would copy left -> right: {}", item.rel_path.as_str());
        }
        for item in &to_left {
            println!("would copy right -> left: {}", item.rel_path.as_str());
        }
        return Ok(());
    }

    // Resolved sync directions (unlike a manual copy-to-folder selection)
    // already imply the destination should end up matching the source, so
    // an existing-but-stale destination file must be overwritten rather
    // than skipped.
    let root = RelPath::root();
    let right_outcome = copy_to_with_overwrite(
        &pair.left_device,
        &pair.right_device,
        &root,
        &root,
        &to_right,
        &NoopProgress,
        true,
        &NoopCallback,
    )
    .await
    .context("copy to right failed")?;
    let left_outcome = copy_to_with_overwrite(
        &pair.right_device,
        &pair.left_device,
        &root,
        &root,
        &to_left,
        &NoopProgress,
        true,
        &NoopCallback,
    )
    .await
    .context("copy to left failed")?;

    println!(
        "synchronized {} item(s) to right, {} item(s) to left",
        right_outcome.copied.len(),
        left_outcome.copied.len()
    );
    Ok(())
}
