use anyhow::Context;
use clap::ValueEnum;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::database::models::{Company, Menu};
use crate::database::{CompanyRepository, MenuRepository};
use crate::tree::{assemble, TreeItem, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TreeKind {
    Companies,
    Menus,
}

impl TreeKind {
    fn name(self) -> &'static str {
        match self {
            TreeKind::Companies => "companies",
            TreeKind::Menus => "menus",
        }
    }
}

pub async fn handle(
    kind: TreeKind,
    input: Option<PathBuf>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match kind {
        TreeKind::Companies => {
            let rows: Vec<Company> = match input {
                Some(path) => read_rows(&path)?,
                None => {
                    let (database, store) = super::connect_store().await?;
                    let rows = store.list_companies().await;
                    database.close().await;
                    rows?
                }
            };
            print_forest(kind, &assemble(rows), &output_format, |c| {
                format!("[{}] {}", c.id, c.name)
            })
        }
        TreeKind::Menus => {
            let rows: Vec<Menu> = match input {
                Some(path) => read_rows(&path)?,
                None => {
                    let (database, store) = super::connect_store().await?;
                    let rows = store.list_menus().await;
                    database.close().await;
                    rows?
                }
            };
            print_forest(kind, &assemble(rows), &output_format, |m| {
                if m.is_active {
                    format!("[{}] {}", m.id, m.name)
                } else {
                    format!("[{}] {} (inactive)", m.id, m.name)
                }
            })
        }
    }
}

fn read_rows<N: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<N>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid rows in {}", path.display()))
}

fn print_forest<N>(
    kind: TreeKind,
    forest: &[TreeItem<N>],
    output_format: &OutputFormat,
    label: impl Fn(&N) -> String,
) -> anyhow::Result<()>
where
    N: TreeNode + Serialize,
{
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ kind.name(): forest }))?);
        }
        OutputFormat::Text => {
            if forest.is_empty() {
                println!("No {} found", kind.name());
            }
            for line in render_lines(forest, &label) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// One line per node, indented two spaces per level
fn render_lines<N>(forest: &[TreeItem<N>], label: &impl Fn(&N) -> String) -> Vec<String> {
    let mut lines = Vec::new();
    for root in forest {
        root.walk(0, &mut |node, depth| {
            lines.push(format!("{}{}", "  ".repeat(depth), label(node)));
        });
    }
    lines
}
