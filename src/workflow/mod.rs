// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The streaming acquisition pipeline.
//!
//! Movies are aligned, CTF-corrected and picked as they arrive; particles go
//! through 2D classification, initial volume estimation and 3D analysis.
//! Every stage is assembled from the switches of a [`WorkflowConfig`] onto a
//! [`GraphBuilder`], so ids follow build order and every input points back.

mod analysis3d;
mod classify2d;
mod monitors;
mod particles;
mod picking;
mod preprocess;
mod resources;
mod volume;

pub use resources::{
    cl2d_mpi, cryosparc_symmetry, even_box_size, init_volume_cpus, motioncor_threads,
    relion_mpi, streamer_interval,
};

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, WorkflowGraph};
use crate::observability::messages::graph::{StageSkipped, WorkflowBuildStarted, WorkflowBuilt};
use crate::observability::messages::StructuredLog;
use std::path::Path;
use std::time::Instant;

/// Assemble the whole acquisition workflow.
///
/// `gain_file` is the gain reference handed to the movie import, if one was
/// found next to the movies.
///
/// # Errors
/// [`GraphError::MissingAlternative`] when an enabled stage has none of its
/// protocols switched on, or a binding error if the topology is inconsistent.
pub fn build_acquisition_workflow(
    cfg: &WorkflowConfig,
    gain_file: Option<&Path>,
) -> Result<WorkflowGraph, GraphError> {
    let start_msg = WorkflowBuildStarted {
        project: &cfg.project.name,
        simulation: cfg.acquisition.simulation,
        has_gain: gain_file.is_some(),
    };
    let span = start_msg.span("build_acquisition_workflow");
    let _guard = span.enter();
    start_msg.log();

    let started = Instant::now();
    let mut b = GraphBuilder::new();

    let mics = preprocess::build_preprocessing(&mut b, cfg, gain_file)?;
    let picked = picking::build_picking(&mut b, cfg, &mics)?;
    let particles = particles::build_particles(&mut b, cfg, &mics, &picked)?;

    let classified = if cfg.classify2d.enabled {
        Some(classify2d::build_classify2d(&mut b, cfg, &particles)?)
    } else {
        StageSkipped {
            stage: "2D classification",
            switch: "DO_2DCLASS",
        }
        .log();
        None
    };

    let volume = match (&classified, cfg.initial_volume.enabled) {
        (Some(classified), true) => Some(volume::build_initial_volume(&mut b, cfg, classified)?),
        (None, true) => return Err(GraphError::MissingAlternative("2D classification")),
        (_, false) => {
            StageSkipped {
                stage: "initial volume",
                switch: "DO_INITVOL",
            }
            .log();
            None
        }
    };

    let last_relion = analysis3d::build_analysis3d(&mut b, cfg, &mics, &particles, volume)?;

    if let Some(classified) = &classified {
        monitors::build_streaming_2d(&mut b, cfg, &particles, classified, last_relion)?;
    }
    monitors::build_summary_monitor(&mut b)?;

    let graph = b.finish()?;
    WorkflowBuilt {
        node_count: graph.nodes.len(),
        label_count: graph.labels.len(),
        duration: started.elapsed(),
    }
    .log();
    Ok(graph)
}
