// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sizing rules shared by the workflow stages.

use crate::config::{GpuSelection, WorkflowConfig};
use serde_json::Value;

/// Smallest even integer strictly greater than `x`: `(floor(x / 2) + 1) * 2`.
pub fn even_box_size(x: f64) -> i64 {
    ((x / 2.0).floor() as i64 + 1) * 2
}

/// Symmetry group as cryoSPARC numbers it: `(group index, order)`.
///
/// `cN` and `dN` carry their order; `t`, `o`, `i1`, `i2` have order 1;
/// anything unrecognised falls back to `c1`.
pub fn cryosparc_symmetry(symmetry: &str) -> (i64, i64) {
    let sym = symmetry.trim().to_ascii_lowercase();
    let order = |rest: &str| rest.parse::<i64>().unwrap_or(1);
    if let Some(rest) = sym.strip_prefix('c') {
        (0, order(rest))
    } else if let Some(rest) = sym.strip_prefix('d') {
        (1, order(rest))
    } else {
        match sym.as_str() {
            "t" => (2, 1),
            "o" => (3, 1),
            "i1" => (4, 1),
            "i2" => (5, 1),
            _ => (0, 1),
        }
    }
}

/// MPI processes for Relion: 3 on GPU, otherwise most of the host.
pub fn relion_mpi(cfg: &WorkflowConfig) -> usize {
    if cfg.resources.relion.is_enabled() {
        return 3;
    }
    let cpus = cfg.num_cpus();
    if cpus > 10 {
        cpus - 10
    } else {
        4
    }
}

pub fn init_volume_cpus(cpus: usize) -> usize {
    if cpus > 8 {
        cpus - 8
    } else {
        cpus / 2 + 1
    }
}

/// MotionCor2 threads: one per GPU plus a feeder when there are several.
pub fn motioncor_threads(gpus: &GpuSelection) -> usize {
    match gpus.count() {
        0 | 1 => 1,
        n => n + 1,
    }
}

/// CL2D leaves 20 CPUs to the rest of the pipeline, keeping at least one.
pub fn cl2d_mpi(cpus: usize) -> usize {
    cpus.saturating_sub(20).max(1)
}

/// Streamer sampling interval in minutes.
pub fn streamer_interval(timeout: f64) -> i64 {
    if timeout < 10.0 {
        1
    } else {
        10
    }
}

/// `gpuList`-style value, `null` when running on CPU.
pub fn gpu_param(gpus: &GpuSelection) -> Value {
    if gpus.is_enabled() {
        Value::String(gpus.to_string())
    } else {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{config_from, minimal_raw};
    use crate::config::ConfKey;

    #[test]
    fn even_box_sizes() {
        assert_eq!(even_box_size(60.0), 62);
        assert_eq!(even_box_size(61.0), 62);
        assert_eq!(even_box_size(83.33), 84);
        assert_eq!(even_box_size(0.5), 2);
    }

    #[test]
    fn symmetry_groups() {
        assert_eq!(cryosparc_symmetry("c1"), (0, 1));
        assert_eq!(cryosparc_symmetry("c7"), (0, 7));
        assert_eq!(cryosparc_symmetry("D2"), (1, 2));
        assert_eq!(cryosparc_symmetry("t"), (2, 1));
        assert_eq!(cryosparc_symmetry("o"), (3, 1));
        assert_eq!(cryosparc_symmetry("i2"), (5, 1));
        assert_eq!(cryosparc_symmetry("h"), (0, 1));
    }

    #[test]
    fn relion_mpi_rules() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::NumCpu, "32");
        assert_eq!(relion_mpi(&config_from(&raw)), 3);

        raw.set(ConfKey::RelionGpu, "-1");
        assert_eq!(relion_mpi(&config_from(&raw)), 22);

        raw.set(ConfKey::NumCpu, "8");
        assert_eq!(relion_mpi(&config_from(&raw)), 4);
    }

    #[test]
    fn cpu_splits() {
        assert_eq!(init_volume_cpus(32), 24);
        assert_eq!(init_volume_cpus(8), 5);
        assert_eq!(init_volume_cpus(1), 1);
        assert_eq!(cl2d_mpi(32), 12);
        assert_eq!(cl2d_mpi(8), 1);
        assert_eq!(motioncor_threads(&GpuSelection::Devices(vec![2, 3])), 3);
        assert_eq!(motioncor_threads(&GpuSelection::Devices(vec![0])), 1);
        assert_eq!(streamer_interval(5.0), 1);
        assert_eq!(streamer_interval(60.0), 10);
    }

    #[test]
    fn gpu_params() {
        assert_eq!(gpu_param(&GpuSelection::Disabled), Value::Null);
        assert_eq!(gpu_param(&GpuSelection::Devices(vec![1])), Value::from("1"));
    }
}
