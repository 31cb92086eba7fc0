use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foundation::{DiffEntry, array_diff};
use layers::{LayerTree, RawLayer};
use mantle::{Expression, Feature, LayerStyle};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as Json, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Layer tree and style expression tooling")]
struct Args {
    /// Pretty-print JSON output (also enabled by ATLAS_PRETTY=1)
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one expression against every feature
    Eval {
        /// Expression AST as JSON
        #[arg(long)]
        expr: PathBuf,

        /// GeoJSON FeatureCollection or plain array of features
        #[arg(long)]
        features: PathBuf,
    },

    /// Apply a layer style to every feature
    Style {
        /// Style rules as JSON (key -> { expression, default })
        #[arg(long)]
        style: PathBuf,

        /// GeoJSON FeatureCollection or plain array of features
        #[arg(long)]
        features: PathBuf,
    },

    /// Query a layer tree
    Tree {
        /// Root layer as JSON
        #[arg(long)]
        layers: PathBuf,

        #[command(subcommand)]
        query: TreeQuery,
    },

    /// Positional diff between two comma-separated lists
    Diff {
        #[arg(long, value_delimiter = ',')]
        old: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        new: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TreeQuery {
    /// Look up layers by id, one result per id in request order
    Find { ids: Vec<String> },

    /// Data layers visible through their whole ancestor chain
    Leaves,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureInput {
    Collection { features: Vec<Feature> },
    List(Vec<Feature>),
}

impl FeatureInput {
    fn into_features(self) -> Vec<Feature> {
        match self {
            FeatureInput::Collection { features } | FeatureInput::List(features) => features,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let pretty = args.pretty
        || env::var("ATLAS_PRETTY").is_ok_and(|v| matches!(v.as_str(), "1" | "true"));

    let output = run(args.command)?;
    let text = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

fn run(command: Command) -> Result<Json> {
    match command {
        Command::Eval { expr, features } => {
            let expr: Expression = read_json(&expr)?;
            let features = read_features(&features)?;
            info!(features = features.len(), "evaluating expression");
            Ok(eval_features(&expr, &features))
        }
        Command::Style { style, features } => {
            let style: LayerStyle = read_json(&style)?;
            let features = read_features(&features)?;
            info!(rules = style.len(), features = features.len(), "applying style");
            Ok(serde_json::to_value(style.apply_all(&features))?)
        }
        Command::Tree { layers, query } => {
            let raw: RawLayer = read_json(&layers)?;
            let tree = LayerTree::new(raw);
            Ok(match query {
                TreeQuery::Find { ids } => find_layers(&tree, &ids),
                TreeQuery::Leaves => {
                    let ids: Vec<&str> = tree.visible_leaves().iter().map(|l| l.id()).collect();
                    json!(ids)
                }
            })
        }
        Command::Diff { old, new } => Ok(diff_json(&array_diff(&old, &new))),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn read_features(path: &Path) -> Result<Vec<Feature>> {
    Ok(read_json::<FeatureInput>(path)?.into_features())
}

fn eval_features(expr: &Expression, features: &[Feature]) -> Json {
    features
        .iter()
        .map(|feature| match expr.evaluate(feature) {
            Ok(value) => json!({ "id": feature.id, "value": value.to_json() }),
            Err(err) => json!({ "id": feature.id, "error": err.to_string() }),
        })
        .collect()
}

fn find_layers(tree: &LayerTree, ids: &[String]) -> Json {
    tree.find_by_ids(ids)
        .into_iter()
        .map(|layer| match layer {
            Some(layer) => json!({
                "id": layer.id(),
                "title": layer.title(),
                "depth": layer.depth(),
                "group": layer.is_group(),
                "visible": layer.is_effectively_visible(),
            }),
            None => Json::Null,
        })
        .collect()
}

fn diff_json(entries: &[DiffEntry<String>]) -> Json {
    entries
        .iter()
        .map(|entry| {
            json!({
                "element": entry.element,
                "kind": format!("{:?}", entry.kind()).to_lowercase(),
                "oldIndex": entry.old_index,
                "newIndex": entry.new_index,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureInput, diff_json, eval_features, find_layers};
    use foundation::array_diff;
    use layers::{LayerTree, RawLayer};
    use mantle::{BinaryOp, Expression};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn accepts_collections_and_plain_arrays() {
        let collection: FeatureInput = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{ "id": 1, "properties": { "a": 1 } }]
        }))
        .unwrap();
        assert_eq!(collection.into_features().len(), 1);

        let list: FeatureInput =
            serde_json::from_value(json!([{ "properties": null }, { "properties": {} }])).unwrap();
        assert_eq!(list.into_features().len(), 2);
    }

    #[test]
    fn eval_reports_errors_per_feature() {
        let features: FeatureInput = serde_json::from_value(json!([
            { "id": "ok", "properties": { "n": 2 } },
            { "id": "bad", "properties": { "n": "two" } }
        ]))
        .unwrap();
        let expr = Expression::binary(BinaryOp::Mul, Expression::property("n"), Expression::number(3.0));
        let out = eval_features(&expr, &features.into_features());
        assert_eq!(out[0], json!({ "id": "ok", "value": 6.0 }));
        assert!(out[1]["error"].as_str().unwrap().contains("type mismatch"));
    }

    #[test]
    fn find_keeps_request_order() {
        let tree = LayerTree::new(
            RawLayer::new("root").with_children(vec![RawLayer::new("a").with_title("A"), RawLayer::new("b")]),
        );
        let out = find_layers(&tree, &["b".to_string(), "x".to_string(), "a".to_string()]);
        assert_eq!(out[0]["id"], json!("b"));
        assert_eq!(out[1], json!(null));
        assert_eq!(out[2]["title"], json!("A"));
    }

    #[test]
    fn diff_output_shape() {
        let old = vec!["a".to_string(), "b".to_string()];
        let new = vec!["b".to_string(), "c".to_string()];
        let out = diff_json(&array_diff(&old, &new));
        assert_eq!(out[0], json!({ "element": "c", "kind": "added", "oldIndex": null, "newIndex": 2 }));
        assert_eq!(out[2]["kind"], json!("removed"));
    }
}
