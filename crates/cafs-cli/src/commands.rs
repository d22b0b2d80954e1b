use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use colored::Colorize;
use serde_json::json;

use cafs_fs::load_local;
use cafs_store::{BlockStore, DiskBlockStore, LinkKind};
use cafs_types::{abs_path, path_kind, Context, Key};
use cafs_writer::TreeWriter;

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        config.store.root = store.clone();
    }
    let format = cli.format;

    match cli.command {
        Command::Write(args) => cmd_write(&config, format, args).await,
        Command::Cat(args) => cmd_cat(&config, args).await,
        Command::Ls(args) => cmd_ls(&config, format, args).await,
        Command::Has(args) => cmd_has(&config, format, args).await,
        Command::Pin(args) => cmd_pin(&config, args, true).await,
        Command::Unpin(args) => cmd_pin(&config, args, false).await,
        Command::Kind(args) => cmd_kind(format, args),
        Command::Abs(args) => cmd_abs(format, args),
        Command::Config => cmd_config(&config),
    }
}

async fn open_store(config: &CliConfig) -> anyhow::Result<DiskBlockStore> {
    DiskBlockStore::open(&config.store.root)
        .await
        .with_context(|| format!("failed to open store at {}", config.store.root.display()))
}

fn parse_key(text: &str) -> anyhow::Result<Key> {
    Key::from_hex(text).with_context(|| format!("invalid key {text:?}"))
}

/// Split `<key>/<path>` into the key text and the path below it.
fn split_target(text: &str) -> (&str, &str) {
    text.split_once('/').unwrap_or((text, ""))
}

/// Key of the object named by `<key>` or `<key>/<path>`.
async fn locate(store: &DiskBlockStore, text: &str) -> anyhow::Result<Key> {
    let (key, path) = split_target(text);
    let root = parse_key(key)?;
    store
        .resolve(&root, path)
        .await
        .with_context(|| format!("cannot resolve {text:?}"))
}

async fn cmd_write(config: &CliConfig, format: OutputFormat, args: WriteArgs) -> anyhow::Result<()> {
    let tree = load_local(&args.path)
        .with_context(|| format!("failed to load {}", args.path.display()))?;
    let store = Arc::new(open_store(config).await?);

    let mut writer_config = config.writer.clone();
    writer_config.pin_root |= args.pin;
    let ctx = match args.timeout.or(config.timeout_secs) {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let outcome = TreeWriter::new(store)
        .with_config(writer_config)
        .write_tree(&ctx, &tree)
        .await
        .with_context(|| format!("failed to write {}", args.path.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            println!(
                "{} Wrote {} → {}",
                "✓".green().bold(),
                outcome.root_path.bold(),
                outcome.root_key.to_string().yellow()
            );
            println!(
                "  {} paths, {} new objects{}",
                outcome.path_map.len(),
                outcome.created,
                if outcome.pinned { ", pinned" } else { "" }
            );
        }
    }
    Ok(())
}

async fn cmd_cat(config: &CliConfig, args: TargetArgs) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let key = locate(&store, &args.target).await?;
    let data = store.get(&key).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

async fn cmd_ls(config: &CliConfig, format: OutputFormat, args: TargetArgs) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let key = locate(&store, &args.target).await?;
    let links = store.get_node(&key).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&links)?),
        OutputFormat::Text => {
            if links.is_empty() {
                println!("(empty directory)");
            }
            for link in &links {
                let name = match link.kind {
                    LinkKind::Directory => format!("{}/", link.name).blue().bold(),
                    LinkKind::File => link.name.normal(),
                };
                println!("{}  {:>10}  {}", link.key.short_hex().dimmed(), link.size, name);
            }
        }
    }
    Ok(())
}

async fn cmd_has(config: &CliConfig, format: OutputFormat, args: KeyArgs) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let present = open_store(config).await?.has(&key).await?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": key, "present": present })),
        OutputFormat::Text if present => println!("{} {}", "✓".green(), key.to_string().yellow()),
        OutputFormat::Text => println!("{} {} not found", "✗".red(), key.to_string().yellow()),
    }
    Ok(())
}

async fn cmd_pin(config: &CliConfig, args: PinArgs, pin: bool) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let store = open_store(config).await?;
    if pin {
        store.pin(&key, args.recursive).await?;
    } else {
        store.unpin(&key, args.recursive).await?;
    }
    let verb = if pin { "Pinned" } else { "Unpinned" };
    let scope = if args.recursive { " (recursive)" } else { "" };
    println!("{} {} {}{}", "✓".green(), verb, key.to_string().yellow(), scope);
    Ok(())
}

fn cmd_kind(format: OutputFormat, args: PathArgs) -> anyhow::Result<()> {
    let kind = path_kind(&args.path);
    match format {
        OutputFormat::Json => println!("{}", json!({ "path": args.path, "kind": kind })),
        OutputFormat::Text => println!("{kind}"),
    }
    Ok(())
}

fn cmd_abs(format: OutputFormat, args: PathArgs) -> anyhow::Result<()> {
    let absolute = abs_path(&args.path)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "path": args.path, "absolute": absolute })),
        OutputFormat::Text => println!("{absolute}"),
    }
    Ok(())
}

fn cmd_config(config: &CliConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_fs::{Directory, FileNode, RegularFile};

    #[test]
    fn target_splits_at_first_slash() {
        assert_eq!(split_target("abc"), ("abc", ""));
        assert_eq!(split_target("abc/"), ("abc", ""));
        assert_eq!(split_target("abc/docs/a.txt"), ("abc", "docs/a.txt"));
    }

    #[tokio::test]
    async fn locate_walks_below_a_written_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskBlockStore::open(dir.path()).await.unwrap());
        let docs = Directory::with_children(
            "docs",
            [FileNode::from(RegularFile::from_bytes("a.txt", "alpha"))],
        );
        let tree: FileNode = Directory::with_children("/t", [FileNode::from(docs)]).into();
        let outcome = TreeWriter::new(store.clone())
            .write_tree(&Context::background(), &tree)
            .await
            .unwrap();
        let root = outcome.root_key.to_string();

        assert_eq!(locate(&store, &root).await.unwrap(), outcome.root_key);
        let a = locate(&store, &format!("{root}/docs/a.txt")).await.unwrap();
        assert_eq!(Some(&a), outcome.path_map.get("/t/docs/a.txt"));
        assert_eq!(store.get(&a).await.unwrap(), b"alpha");
        assert!(locate(&store, &format!("{root}/docs/b.txt")).await.is_err());
        assert!(locate(&store, "not-a-key/docs").await.is_err());
    }
}
