use anyhow::{bail, Context};
use colored::Colorize;
use hdc_container::{
    CodecOptions, OrderedContainer, PersistenceCodec, RealizerRegistry, Value, WireVersion,
};
use hdc_store::{DirectoryGroup, GroupHandle, StorageGroup};
use hdc_types::{Builtin, Key};
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;

/// Longest value preview printed by `show`.
const PREVIEW_WIDTH: usize = 60;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let registry = RealizerRegistry::with_defaults();
    let session = Session {
        config: &config,
        registry: &registry,
    };
    match cli.command {
        Command::Import(args) => cmd_import(&session, args),
        Command::Export(args) => cmd_export(&session, args),
        Command::Show(args) => cmd_show(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Set(args) => cmd_set(&session, args),
        Command::Lock(args) => cmd_set_lock(&session, args, true),
        Command::Unlock(args) => cmd_set_lock(&session, args, false),
    }
}

struct Session<'a> {
    config: &'a CliConfig,
    registry: &'a RealizerRegistry,
}

impl Session<'_> {
    fn codec(&self, lazy: bool) -> PersistenceCodec<'_> {
        let options = CodecOptions {
            lazy,
            ..self.config.codec.clone()
        };
        PersistenceCodec::with_options(self.registry, options)
    }

    fn group_path(&self, target: &StoreArgs) -> Option<String> {
        target
            .group
            .clone()
            .or_else(|| self.config.default_group.clone())
    }

    /// Open the target group, creating it only if `create` is set.
    fn open(&self, target: &StoreArgs, create: bool) -> anyhow::Result<GroupHandle> {
        if !create && !target.store.is_dir() {
            bail!("no store at {}", target.store.display());
        }
        let mut group = DirectoryGroup::open(&target.store)
            .with_context(|| format!("opening store {}", target.store.display()))?
            .handle();
        if let Some(path) = self.group_path(target) {
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                group = if create {
                    group.open_or_create_subgroup(segment)?
                } else {
                    group
                        .open_subgroup(segment)
                        .with_context(|| format!("no group {path:?} in store"))?
                };
            }
        }
        debug!(group = %group.path(), create, "opened target group");
        Ok(group)
    }

    fn load(&self, target: &StoreArgs, lazy: bool) -> anyhow::Result<(GroupHandle, OrderedContainer)> {
        let group = self.open(target, false)?;
        let container = self
            .codec(lazy)
            .read(&group)
            .with_context(|| format!("reading container at {}", group.path()))?
            .with_lock_mode(self.config.lock_mode);
        Ok((group, container))
    }
}

fn cmd_import(session: &Session, args: ImportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.json)
        .with_context(|| format!("reading {}", args.json.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.json.display()))?;
    let mut container = OrderedContainer::from_builtin(Builtin::from_json(&json))?;
    if args.read_only {
        container.lock();
    }

    let group = session.open(&args.target, true)?;
    let mut options = session.config.codec.clone();
    if args.legacy {
        options.wire_version = WireVersion::Legacy;
    }
    PersistenceCodec::with_options(session.registry, options.clone()).write(&container, &group)?;
    println!(
        "{} Imported {} items into {} ({})",
        "✓".green().bold(),
        container.len(),
        group.path().bold(),
        options.wire_version
    );
    Ok(())
}

fn cmd_export(session: &Session, args: ExportArgs) -> anyhow::Result<()> {
    let (_, container) = session.load(&args.target, false)?;
    let json = container.to_builtin(false)?.to_json();
    let text = if args.pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{text}");
    Ok(())
}

fn cmd_show(session: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let lazy = args.lazy || session.config.codec.lazy;
    let (group, container) = session.load(&args.target, lazy)?;
    let schema = container.schema();
    let lock = if container.read_only() {
        "read-only".red().to_string()
    } else {
        "writable".green().to_string()
    };
    println!(
        "{} {} v{} ({})",
        group.path().bold(),
        schema.name.cyan(),
        schema.version,
        lock
    );
    for line in render_tree(&container, 1) {
        println!("{line}");
    }
    Ok(())
}

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let (_, mut container) = session.load(&args.target, true)?;
    let value = container.fetch(Key::from(args.path.as_str()), session.registry)?;
    match value {
        Value::Leaf(leaf) => println!("{leaf}"),
        Value::Nested(c) => {
            let mut c = c.clone();
            c.force_load(session.registry, true)?;
            println!("{}", serde_json::to_string_pretty(&c.to_builtin(false)?.to_json())?);
        }
        Value::Lazy(stub) => println!("{}", stub.repr()),
    }
    Ok(())
}

fn cmd_set(session: &Session, args: SetArgs) -> anyhow::Result<()> {
    let (group, mut container) = session.load(&args.target, false)?;
    let json: serde_json::Value =
        serde_json::from_str(&args.value).with_context(|| format!("parsing value {:?}", args.value))?;
    let value = Value::from_builtin(Builtin::from_json(&json))?;
    let outcome = container.set(Key::from(args.path.as_str()), value)?;
    if outcome.is_suppressed() {
        bail!("container at {} is read-only, nothing written", group.path());
    }
    session.codec(false).write(&container, &group)?;
    println!("{} Set {} at {}", "✓".green().bold(), args.path.bold(), group.path());
    Ok(())
}

fn cmd_set_lock(session: &Session, args: StoreArgs, lock: bool) -> anyhow::Result<()> {
    let (group, mut container) = session.load(&args, false)?;
    if lock {
        container.lock();
    } else {
        container.unlock();
    }
    session.codec(false).write(&container, &group)?;
    let state = if lock { "Locked" } else { "Unlocked" };
    println!("{} {} {}", "✓".green().bold(), state, group.path().bold());
    Ok(())
}

/// One line per item: position, key, type and a value preview. Nested
/// containers are indented below their parent.
pub fn render_tree(container: &OrderedContainer, depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let indent = "  ".repeat(depth);
    for (position, (key, value)) in container.entries().enumerate() {
        let key = key.map(|k| k.bold().to_string()).unwrap_or_else(|| "-".dimmed().to_string());
        let head = format!("{indent}[{}] {key}", position.to_string().dimmed());
        match value {
            Value::Leaf(leaf) => lines.push(format!(
                "{head}: {} = {}",
                leaf.type_name().cyan(),
                preview(&leaf.repr())
            )),
            Value::Nested(child) => {
                lines.push(format!("{head}: {} ({} items)", child.schema().name.cyan(), child.len()));
                lines.extend(render_tree(child, depth + 1));
            }
            Value::Lazy(stub) => lines.push(format!(
                "{head}: {} {}",
                "not loaded".yellow(),
                stub.location().dimmed()
            )),
        }
    }
    lines
}

fn preview(repr: &str) -> String {
    if repr.chars().count() <= PREVIEW_WIDTH {
        return repr.to_string();
    }
    let cut: String = repr.chars().take(PREVIEW_WIDTH - 3).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use hdc_types::Leaf;

    fn run(args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["hdc"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn read_back(store: &std::path::Path, group: Option<&str>) -> OrderedContainer {
        let registry = RealizerRegistry::new();
        let mut handle = DirectoryGroup::open(store).unwrap().handle();
        if let Some(g) = group {
            handle = handle.open_subgroup(g).unwrap();
        }
        PersistenceCodec::new(&registry).read(&handle).unwrap()
    }

    fn imported() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("in.json");
        std::fs::write(&json, r#"{"name": "relax", "steps": [1, 2, 3], "done": false}"#).unwrap();
        let store = dir.path().join("store");
        run(&["import", json.to_str().unwrap(), store.to_str().unwrap(), "-g", "job"]).unwrap();
        (dir, store.to_str().unwrap().to_string())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    #[test]
    fn import_writes_container() {
        let (dir, _) = imported();
        let c = read_back(&dir.path().join("store"), Some("job"));
        assert_eq!(c.get("name").unwrap(), &Leaf::from("relax"));
        assert_eq!(c.get("steps/2").unwrap(), &Leaf::Int(3));
        assert!(!c.read_only());
    }

    #[test]
    fn set_updates_store() {
        let (dir, store) = imported();
        run(&["set", &store, "-g", "job", "steps/0", "10"]).unwrap();
        run(&["set", &store, "-g", "job", "extra/note", "\"hi\""]).unwrap();

        let c = read_back(&dir.path().join("store"), Some("job"));
        assert_eq!(c.get("steps/0").unwrap(), &Leaf::Int(10));
        assert_eq!(c.get("extra/note").unwrap(), &Leaf::from("hi"));
    }

    #[test]
    fn set_on_locked_container_fails() {
        let (dir, store) = imported();
        run(&["lock", &store, "-g", "job"]).unwrap();
        assert!(read_back(&dir.path().join("store"), Some("job")).read_only());
        assert!(run(&["set", &store, "-g", "job", "name", "\"x\""]).is_err());

        run(&["unlock", &store, "-g", "job"]).unwrap();
        run(&["set", &store, "-g", "job", "name", "\"x\""]).unwrap();
        let c = read_back(&dir.path().join("store"), Some("job"));
        assert_eq!(c.get("name").unwrap(), &Leaf::from("x"));
    }

    #[test]
    fn read_commands_need_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(run(&["export", missing.to_str().unwrap()]).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn read_commands_succeed() {
        let (_dir, store) = imported();
        run(&["export", &store, "-g", "job", "--pretty"]).unwrap();
        run(&["show", &store, "-g", "job", "--lazy"]).unwrap();
        run(&["get", &store, "-g", "job", "steps/1"]).unwrap();
        assert!(run(&["get", &store, "-g", "job", "nope"]).is_err());
        assert!(run(&["show", &store, "-g", "other"]).is_err());
    }

    #[test]
    fn legacy_import_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("in.json");
        std::fs::write(&json, "[1, 2]").unwrap();
        let store = dir.path().join("store");
        run(&["import", json.to_str().unwrap(), store.to_str().unwrap(), "--legacy"]).unwrap();
        assert!(store.join("data").is_dir());
        assert_eq!(read_back(&store, None).len(), 2);
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    #[test]
    fn tree_lines() {
        colored::control::set_override(false);
        let mut c = OrderedContainer::new();
        c.set("a", 1i64).unwrap();
        c.set("g/b", "x").unwrap();
        c.append(2.5).unwrap();
        let lines = render_tree(&c, 0);
        assert_eq!(
            lines,
            vec![
                "[0] a: int = 1",
                "[1] g: OrderedContainer (1 items)",
                "  [0] b: str = \"x\"",
                "[2] -: float = 2.5",
            ]
        );
    }

    #[test]
    fn long_previews_are_cut() {
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_WIDTH);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
