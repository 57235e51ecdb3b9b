use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use xastshim_ast::{arena::Allocator, node::Ref, parse::roxmltree::parse_path, selectors::Selector};

use crate::{config::Config, fs::load_files};

pub trait RunCommand {
    /// # Errors
    ///
    /// If any part of the lifecycle fails
    /// * Fails to read or parse any files
    /// * Fails to write to stdout
    fn run(&self, config: Config) -> anyhow::Result<()>;
}

#[derive(Parser)]
#[clap(
    bin_name = "xastshim",
    name = "xastshim",
    author,
    version,
    about = "Query XML documents with a small selector grammar",
    long_about = None
)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the elements matching a selector
    Query(Query),
}

#[derive(clap::Args)]
pub struct Query {
    /// The files or directories to query
    #[clap(value_parser, default_value = ".")]
    pub paths: Vec<PathBuf>,
    /// A tag name, `tag[attr="value"]`, or a comma separated list of these
    #[clap(long = "selector", short = 's')]
    pub selector: String,
    /// Only print the first match of each file
    #[clap(long = "first")]
    pub first: bool,
}

impl Query {
    /// Writes a line for each match of `selector` in the tree
    fn write_matches(
        &self,
        path: &Path,
        root: Ref<'_>,
        selector: &Selector,
        out: &mut impl Write,
    ) -> std::io::Result<usize> {
        let matches = if self.first {
            selector.select_first(root).into_iter().collect()
        } else {
            selector.select_all(root)
        };
        for node in &matches {
            writeln!(out, "{}: {}", path.display(), node.formatter())?;
        }
        Ok(matches.len())
    }
}

impl RunCommand for Query {
    fn run(&self, config: Config) -> anyhow::Result<()> {
        let options = config.parse.unwrap_or_default();
        let selector = Selector::parse(&self.selector);
        if matches!(selector, Selector::Unsupported(_)) {
            log::warn!("`{selector}` is not a supported selector, nothing will match");
        }

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for path in load_files(&self.paths)? {
            let raw = parse_path(&path, &options)
                .with_context(|| format!("cannot parse {}", path.display()))?;
            let arena = Allocator::new_arena();
            let allocator = Allocator::new(&arena);
            let root = allocator.wrap(Some(&raw))?;
            let count = self.write_matches(&path, root, &selector, &mut out)?;
            log::debug!("{count} matches in {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
fn query(first: bool) -> Query {
    Query {
        paths: vec![],
        selector: String::from("path, rect"),
        first,
    }
}

#[test]
fn write_matches() -> anyhow::Result<()> {
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let root = allocator.parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
            <rect width="10"/>
            <g><path d="M0 0"/></g>
        </svg>"#,
        &xastshim_ast::parse::Options::default(),
    )?;
    let path = Path::new("icon.svg");

    let all = query(false);
    let mut out: Vec<u8> = vec![];
    let count = all.write_matches(path, root, &Selector::parse(&all.selector), &mut out)?;
    assert_eq!(count, 2);
    insta::assert_snapshot!(String::from_utf8(out)?.trim_end(), @r#"
    icon.svg: <rect width="10">
    icon.svg: <path d="M0 0">
    "#);

    let first = query(true);
    let mut out: Vec<u8> = vec![];
    let count = first.write_matches(path, root, &Selector::parse(&first.selector), &mut out)?;
    assert_eq!(count, 1);
    assert_eq!(String::from_utf8(out)?, "icon.svg: <rect width=\"10\">\n");

    let mut out: Vec<u8> = vec![];
    let count = all.write_matches(path, root, &Selector::parse("circle"), &mut out)?;
    assert_eq!(count, 0);
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn parse_args() {
    let args = Args::parse_from(["xastshim", "query", "a.svg", "b", "-s", "path", "--first"]);
    let Command::Query(query) = args.command;
    assert_eq!(query.paths, vec![PathBuf::from("a.svg"), PathBuf::from("b")]);
    assert_eq!(query.selector, "path");
    assert!(query.first);
}
