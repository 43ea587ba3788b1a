use anyhow::{Context, Result};
use clap::Args;
use hugeload_core::algo::{MinMaxScaler, NodeAlgorithm};
use hugeload_core::memory::human_readable;
use hugeload_core::properties::ArrayPropertyMap;
use hugeload_core::store::MemoryStore;
use hugeload_core::{
    GraphLoader, IdAssignment, IdsAndProperties, LoaderConfig, NodePropertyValues,
    PropertyMapping,
};
use std::path::Path;
use std::sync::Arc;

use super::{OutputContext, create_progress_bar, create_spinner};

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// JSON file with an array of nodes (or an object with a `nodes` array)
    pub file: String,

    /// Number of partitions scanned in parallel
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Only load nodes carrying this label (repeatable)
    #[arg(short, long = "label")]
    pub labels: Vec<String>,

    /// Property to load as `name` or `name=default` (repeatable)
    #[arg(short, long = "property", value_parser = parse_property)]
    pub properties: Vec<PropertyMapping>,

    /// Dense id assignment (reserved, shared-counter)
    #[arg(long, value_parser = parse_id_assignment)]
    pub id_assignment: Option<IdAssignment>,

    /// Upper bound on bytes allocated by the import
    #[arg(long)]
    pub memory_limit: Option<u64>,

    /// Records per store page
    #[arg(long, default_value = "8192")]
    pub records_per_page: usize,

    /// Rescale this loaded property into [0, 1]
    #[arg(long)]
    pub normalize: Option<String>,

    /// Print the first N nodes
    #[arg(long, default_value = "0")]
    pub show: u64,
}

fn parse_property(s: &str) -> std::result::Result<PropertyMapping, String> {
    s.parse::<PropertyMapping>().map_err(|e| e.to_string())
}

fn parse_id_assignment(s: &str) -> std::result::Result<IdAssignment, String> {
    s.parse::<IdAssignment>().map_err(|e| e.to_string())
}

/// Merge command-line options over the file and environment configuration
pub fn build_config(config_path: Option<&str>, args: &LoadArgs) -> Result<LoaderConfig> {
    let mut config =
        LoaderConfig::load(config_path.map(Path::new)).context("failed to load configuration")?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if !args.labels.is_empty() {
        config.node_labels = args.labels.clone();
    }
    if !args.properties.is_empty() {
        config.property_mappings = args.properties.clone();
    }
    if let Some(id_assignment) = args.id_assignment {
        config.id_assignment = id_assignment;
    }
    if let Some(limit) = args.memory_limit {
        config.memory_limit_bytes = Some(limit);
    }
    config.validate()?;
    Ok(config)
}

pub fn execute(config_path: Option<&str>, args: LoadArgs, output: &OutputContext) -> Result<()> {
    let config = build_config(config_path, &args)?;
    output.print_info(&format!(
        "{} workers, {:?} id assignment, {} properties",
        config.concurrency,
        config.id_assignment,
        config.property_mappings.len()
    ));

    let store = read_store(&args, output)?;

    let progress = if output.json {
        None
    } else {
        Some(create_progress_bar(
            store.qualifying_count(&config.node_labels) as u64,
            "Importing nodes...",
        )?)
    };
    let mut loader = GraphLoader::new(config);
    if let Some(pb) = &progress {
        let pb = pb.clone();
        loader = loader.with_progress(Arc::new(move |processed| pb.set_position(processed)));
    }
    let graph = loader
        .load(&store)
        .with_context(|| format!("failed to import {}", args.file))?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let normalized = match &args.normalize {
        Some(property) => Some(
            MinMaxScaler::new(property.as_str())
                .compute_property(&graph, loader.tracker().clone(), 0.0)
                .with_context(|| format!("failed to normalize '{}'", property))?,
        ),
        None => None,
    };

    if output.json {
        print_json_report(&graph, normalized.as_ref(), &args, output)
    } else {
        print_report(&graph, normalized.as_ref(), &args, output);
        output.print_success(&format!(
            "Loaded {} nodes from {}",
            graph.node_count(),
            args.file
        ));
        Ok(())
    }
}

fn read_store(args: &LoadArgs, output: &OutputContext) -> Result<MemoryStore> {
    let spinner = if output.json {
        None
    } else {
        Some(create_spinner(&format!("Reading {}...", args.file))?)
    };
    let store = MemoryStore::from_json_file(&args.file, args.records_per_page)
        .with_context(|| format!("failed to read nodes from {}", args.file))?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok(store)
}

fn node_rows(
    graph: &IdsAndProperties,
    normalized: Option<&ArrayPropertyMap>,
    limit: u64,
) -> Vec<(u64, u64, Vec<f64>)> {
    graph
        .id_map
        .iter()
        .take(limit as usize)
        .map(|(dense, original)| {
            let mut values: Vec<f64> = graph
                .properties
                .iter()
                .map(|(_, column)| column.value_at(dense))
                .collect();
            if let Some(scaled) = normalized {
                values.push(scaled.value_at(dense));
            }
            (dense, original, values)
        })
        .collect()
}

fn print_json_report(
    graph: &IdsAndProperties,
    normalized: Option<&ArrayPropertyMap>,
    args: &LoadArgs,
    output: &OutputContext,
) -> Result<()> {
    let names: Vec<String> = graph
        .properties
        .names()
        .map(str::to_string)
        .chain(args.normalize.iter().map(|p| format!("{}_normalized", p)))
        .collect();
    let nodes: Vec<serde_json::Value> = node_rows(graph, normalized, args.show)
        .into_iter()
        .map(|(dense, original, values)| {
            let properties: serde_json::Map<String, serde_json::Value> = names
                .iter()
                .cloned()
                .zip(values.into_iter().map(serde_json::Value::from))
                .collect();
            serde_json::json!({
                "dense_id": dense,
                "original_id": original,
                "properties": properties,
            })
        })
        .collect();

    output.print_json(&serde_json::json!({
        "stats": graph.stats,
        "schema": graph.schema,
        "memory_bytes": graph.memory_bytes(),
        "nodes": nodes,
    }))
}

fn print_report(
    graph: &IdsAndProperties,
    normalized: Option<&ArrayPropertyMap>,
    args: &LoadArgs,
    output: &OutputContext,
) {
    let stats = &graph.stats;
    output.print_table(
        "Import",
        &["Metric", "Value"],
        vec![
            vec!["Nodes".to_string(), stats.node_count.to_string()],
            vec![
                "Highest original id".to_string(),
                stats
                    .highest_original_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
            ],
            vec!["Partitions".to_string(), stats.partitions.to_string()],
            vec![
                "Allocated".to_string(),
                human_readable(stats.bytes_allocated),
            ],
            vec!["Duration".to_string(), format!("{:?}", stats.duration)],
        ],
    );

    if !graph.properties.is_empty() {
        let rows = graph
            .properties
            .iter()
            .map(|(name, column)| {
                vec![
                    name.to_string(),
                    (!column.is_constant()).to_string(),
                    column.default_value().to_string(),
                    human_readable(column.memory_bytes()),
                ]
            })
            .collect();
        output.print_table(
            "Properties",
            &["Name", "Resolved", "Default", "Memory"],
            rows,
        );
    }

    if args.show > 0 {
        let mut header: Vec<String> = vec!["Dense".to_string(), "Original".to_string()];
        header.extend(graph.properties.names().map(str::to_string));
        if let Some(property) = &args.normalize {
            header.push(format!("{} (normalized)", property));
        }
        let header: Vec<&str> = header.iter().map(String::as_str).collect();
        let rows = node_rows(graph, normalized, args.show)
            .into_iter()
            .map(|(dense, original, values)| {
                let mut row = vec![dense.to_string(), original.to_string()];
                row.extend(values.iter().map(|v| v.to_string()));
                row
            })
            .collect();
        output.print_table("Nodes", &header, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(file: &str) -> LoadArgs {
        LoadArgs {
            file: file.to_string(),
            concurrency: Some(2),
            labels: vec![],
            properties: vec![PropertyMapping::new("weight", 1.0)],
            id_assignment: None,
            memory_limit: None,
            records_per_page: 1,
            normalize: Some("weight".to_string()),
            show: 3,
        }
    }

    fn nodes_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 0}}, {{"id": 5, "properties": {{"weight": 7.5}}}}, {{"id": 10}}]"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_build_config_prefers_arguments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = 8\nnode_labels = [\"A\"]").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = build_config(Some(&path), &args("unused.json")).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.node_labels, vec!["A".to_string()]);
        assert_eq!(config.property_mappings, vec![PropertyMapping::new("weight", 1.0)]);
    }

    #[test]
    fn test_node_rows_include_normalized_values() {
        let file = nodes_file();
        let store = MemoryStore::from_json_file(file.path(), 1).unwrap();
        let config = LoaderConfig::new()
            .with_concurrency(2)
            .with_property("weight", 1.0);
        let loader = GraphLoader::new(config);
        let graph = loader.load(&store).unwrap();
        let scaled = MinMaxScaler::new("weight")
            .compute_property(&graph, loader.tracker().clone(), 0.0)
            .unwrap();

        let rows = node_rows(&graph, Some(&scaled), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (0, 0, vec![1.0, 0.0]));
        assert_eq!(rows[1], (1, 5, vec![7.5, 1.0]));
    }

    #[test]
    fn test_execute_json_report() {
        let file = nodes_file();
        let path = file.path().to_string_lossy().to_string();
        let output = OutputContext {
            json: true,
            verbose: false,
        };
        execute(None, args(&path), &output).unwrap();
    }

    #[test]
    fn test_execute_missing_file() {
        let output = OutputContext {
            json: true,
            verbose: false,
        };
        let err = execute(None, args("/definitely/not/nodes.json"), &output).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read nodes"));
    }
}
