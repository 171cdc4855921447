// SPDX-License-Identifier: MIT OR Apache-2.0
//! Batch compilation of every graph in an asset store.

use crate::compile::ScriptCompiler;
use crate::context::TranslationOptions;
use ordoplay_script_graph::AssetStore;
use serde::Serialize;
use std::time::Instant;

/// A graph that compiled cleanly
#[derive(Debug, Clone, Serialize)]
pub struct CompiledGraph {
    /// Asset path
    pub path: String,
    /// Generated class
    pub class_name: String,
    /// Printed source
    pub source: String,
}

/// A graph that failed to load or compile
#[derive(Debug, Clone, Serialize)]
pub struct FailedGraph {
    /// Asset path
    pub path: String,
    /// Error messages
    pub errors: Vec<String>,
}

/// Outcome of a batch build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Graphs that compiled
    pub compiled: Vec<CompiledGraph>,
    /// Graphs that did not
    pub failed: Vec<FailedGraph>,
}

impl BatchReport {
    /// Whether every graph compiled
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Compile the graphs at `paths`, continuing past failures.
///
/// Each graph gets its own class named after the graph, whatever
/// `options.class_name` says.
pub fn build_all(
    store: &dyn AssetStore,
    paths: &[String],
    compiler: &mut ScriptCompiler<'_>,
    options: &TranslationOptions,
) -> BatchReport {
    let start = Instant::now();
    tracing::info!(graphs = paths.len(), "Starting script build");

    let options = TranslationOptions {
        class_name: None,
        ..options.clone()
    };
    let mut report = BatchReport::default();

    for path in paths {
        let mut graph = match store.load(path) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::error!(path = %path, "Failed to load graph: {err}");
                report.failed.push(FailedGraph {
                    path: path.clone(),
                    errors: vec![err.to_string()],
                });
                continue;
            }
        };

        let mut errors = compiler.prepare(&mut graph);
        let result = compiler.compile(&graph, &options);
        errors.extend(result.errors);
        if !errors.is_empty() {
            tracing::warn!(path = %path, errors = errors.len(), "Graph failed to compile");
            report.failed.push(FailedGraph {
                path: path.clone(),
                errors: errors.iter().map(ToString::to_string).collect(),
            });
            continue;
        }

        report.compiled.push(CompiledGraph {
            path: path.clone(),
            class_name: result.unit.class.name,
            source: result.source.text,
        });
    }

    tracing::info!(
        "Build completed in {:.2}s: {} compiled, {} failed",
        start.elapsed().as_secs_f64(),
        report.compiled.len(),
        report.failed.len()
    );
    report
}
