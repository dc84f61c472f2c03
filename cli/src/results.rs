use anyhow::{Context, Result};
use clap::Parser;
use model::result_tree::ResultItem;
use model::slot::ResultStatus;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Mode {
    Report,
    Detailed,
    Dump,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "report" => Ok(Mode::Report),
            "detailed" => Ok(Mode::Detailed),
            "dump" => Ok(Mode::Dump),
            other => Err(format!("unknown mode '{}' (expected report|detailed|dump)", other)),
        }
    }
}

/// Render the post-processed result trees inside a Sonobuoy archive.
#[derive(Debug, Parser)]
pub(crate) struct Results {
    /// Path to an archive produced by `run` or `retrieve`.
    archive: PathBuf,

    /// Only render this plugin's tree.
    #[clap(long)]
    plugin: Option<String>,

    /// Only render this node's subtree (DaemonSet plugins only).
    #[clap(long)]
    node: Option<String>,

    /// How to render the trees: `report` (pass/fail counts), `detailed` (full tree), or `dump`
    /// (raw YAML).
    #[clap(long, default_value = "report")]
    mode: Mode,
}

impl Results {
    pub(crate) fn run(self) -> Result<i32> {
        let workdir = tempfile::tempdir().context("unable to create scratch directory")?;
        let file = std::fs::File::open(&self.archive)
            .with_context(|| format!("unable to open archive '{}'", self.archive.display()))?;
        archive::extract_gzip_tar(file, workdir.path())
            .with_context(|| format!("unable to extract archive '{}'", self.archive.display()))?;

        let plugins_dir = workdir.path().join("plugins");
        let mut plugin_names: Vec<String> = match &self.plugin {
            Some(name) => vec![name.clone()],
            None => std::fs::read_dir(&plugins_dir)
                .with_context(|| format!("unable to read '{}'", plugins_dir.display()))?
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
        };
        plugin_names.sort();

        let mut trees = Vec::new();
        for name in &plugin_names {
            let tree_path = plugins_dir.join(name).join("sonobuoy_results.yaml");
            let raw = std::fs::read_to_string(&tree_path)
                .with_context(|| format!("unable to read '{}'", tree_path.display()))?;
            let tree: ResultItem = serde_yaml::from_str(&raw)
                .with_context(|| format!("unable to parse '{}'", tree_path.display()))?;
            trees.push((name.clone(), raw, tree));
        }

        let any_failed = match self.mode {
            Mode::Report => render_report(&trees, self.node.as_deref()),
            Mode::Detailed => render_detailed(&trees, self.node.as_deref()),
            Mode::Dump => render_dump(&trees),
        };

        Ok(if any_failed { 1 } else { 0 })
    }
}

/// Picks the subtree(s) `--node` names out of a plugin's tree: the whole tree when no filter is
/// given, the matching child for a DaemonSet plugin, or the tree itself if its own name matches
/// (a Job plugin's flat root).
fn select<'a>(tree: &'a ResultItem, node: Option<&str>) -> Vec<&'a ResultItem> {
    match node {
        None => vec![tree],
        Some(node) => {
            if tree.name == node {
                return vec![tree];
            }
            tree.items.iter().filter(|item| item.name == node).collect()
        }
    }
}

#[derive(Default)]
struct Buckets {
    passed: u64,
    failed: u64,
    unknown: u64,
    other: BTreeMap<String, u64>,
}

fn bucket(buckets: &mut Buckets, status: &ResultStatus) {
    match status {
        ResultStatus::Passed => buckets.passed += 1,
        ResultStatus::Failed => buckets.failed += 1,
        ResultStatus::Unknown => buckets.unknown += 1,
        // Built-ins always take precedence over a custom string in a summary (SPEC_FULL.md §9,
        // resolved): anything that is not one of the three variants above, including the
        // synthetic "skipped"/"timeout" strings, lands in the secondary bucket.
        ResultStatus::Other(label) => *buckets.other.entry(label.clone()).or_insert(0) += 1,
    }
}

fn render_report(trees: &[(String, String, ResultItem)], node: Option<&str>) -> bool {
    let mut any_failed = false;
    for (name, _raw, tree) in trees {
        let mut buckets = Buckets::default();
        for subtree in select(tree, node) {
            for counted in leaves(subtree) {
                bucket(&mut buckets, counted);
            }
        }
        any_failed |= buckets.failed > 0 || buckets.other.get("timeout").copied().unwrap_or(0) > 0;
        let total = buckets.passed + buckets.failed + buckets.unknown + buckets.other.values().sum::<u64>();
        println!(
            "{}: Total: {}, Passed: {}, Failed: {}, Unknown: {}",
            name, total, buckets.passed, buckets.failed, buckets.unknown
        );
        for (label, count) in &buckets.other {
            println!("  {}: {}", label, count);
        }
    }
    any_failed
}

fn leaves(tree: &ResultItem) -> Vec<&ResultStatus> {
    if tree.items.is_empty() {
        vec![&tree.status]
    } else {
        tree.items.iter().flat_map(leaves).collect()
    }
}

fn render_detailed(trees: &[(String, String, ResultItem)], node: Option<&str>) -> bool {
    let mut any_failed = false;
    for (name, _raw, tree) in trees {
        println!("{}", name);
        for subtree in select(tree, node) {
            any_failed |= print_tree(subtree, 1);
        }
    }
    any_failed
}

fn print_tree(item: &ResultItem, depth: usize) -> bool {
    println!("{}{}: {}", "  ".repeat(depth), item.name, item.status);
    let mut any_failed = matches!(&item.status, ResultStatus::Failed)
        || matches!(&item.status, ResultStatus::Other(s) if s == "timeout");
    for child in &item.items {
        any_failed |= print_tree(child, depth + 1);
    }
    any_failed
}

fn render_dump(trees: &[(String, String, ResultItem)]) -> bool {
    let mut any_failed = false;
    for (name, raw, tree) in trees {
        println!("---\n# {}\n{}", name, raw.trim_end());
        any_failed |= !matches!(tree.status, ResultStatus::Passed);
    }
    any_failed
}
