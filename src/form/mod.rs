// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Interactive terminal form over the raw configuration.
//!
//! Fields are grouped in sections under the `WINDOWS_TITLE` heading and
//! shown according to their `ASK_*` switch (or `ASK_ALL`). Answers are
//! written back as raw strings, so the usual casting and launch checks apply
//! to them afterwards.

use crate::config::{cast_bool, ConfKey, RawConfig};
use crate::observability::messages::config::FormValueEdited;
use crate::observability::messages::StructuredLog;
use std::io::{self, BufRead, Write};

/// When a field is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Always,
    /// Behind its own switch
    When(ConfKey),
    /// Hidden once the project name is fixed in the config
    UnlessNamed,
    /// Behind `ASK_PATH`, for the given `SIMULATION` value
    DataPath { simulation: bool },
}

#[derive(Debug, Clone, Copy)]
struct Field {
    key: ConfKey,
    shown: Shown,
    hint: &'static str,
}

const fn field(key: ConfKey, shown: Shown, hint: &'static str) -> Field {
    Field { key, shown, hint }
}

struct Section {
    title: &'static str,
    fields: &'static [Field],
}

use Shown::*;

const SECTIONS: &[Section] = &[
    Section {
        title: "Acquisition info",
        fields: &[
            field(ConfKey::UserName, UnlessNamed, ""),
            field(ConfKey::SampleName, UnlessNamed, ""),
            field(ConfKey::DepositionDir, DataPath { simulation: false }, "folder the microscope writes to"),
            field(ConfKey::RawDataSim, DataPath { simulation: true }, "folder with the movies to replay"),
        ],
    },
    Section {
        title: "Movie alignment",
        fields: &[
            field(ConfKey::Frames, Always, "ex: 2-15 (empty = all frames, 0 = last frame)"),
            field(ConfKey::DoseInitial, Always, "e/A^2"),
            field(ConfKey::DosePerFrame, Always, "if 0, no dose weight is applied"),
        ],
    },
    Section {
        title: "Picking",
        fields: &[
            field(ConfKey::PartSize, When(ConfKey::AskPartSize), "Angstroms (if 0, manual picking is launched)"),
            field(ConfKey::Mics2Pick, When(ConfKey::AskMics2Pick), "if 0, automatic sample size estimation"),
            field(ConfKey::Cryolo, When(ConfKey::AskPickProt), "true/false"),
            field(ConfKey::RelionPick, When(ConfKey::AskPickProt), "true/false"),
            field(ConfKey::Sparx, When(ConfKey::AskPickProt), "true/false"),
            field(ConfKey::DogPick, When(ConfKey::AskPickProt), "true/false"),
        ],
    },
    Section {
        title: "2D classification",
        fields: &[
            field(ConfKey::Do2dClass, Always, "true/false"),
            field(ConfKey::Sampling2d, When(ConfKey::Ask2dSamp), "A/pixel (-1 to keep original size)"),
            field(ConfKey::Parts2Class, When(ConfKey::AskParts2Class), ""),
            field(ConfKey::Relion2d, When(ConfKey::Ask2dProt), "true/false"),
            field(ConfKey::Xmipp2d, When(ConfKey::Ask2dProt), "true/false"),
            field(ConfKey::Cryos2d, When(ConfKey::Ask2dProt), "true/false"),
        ],
    },
    Section {
        title: "Initial volume",
        fields: &[
            field(ConfKey::DoInitVol, Always, "true/false"),
            field(ConfKey::SymGroup, When(ConfKey::AskSymGroup), "if unknown, set at c1"),
            field(ConfKey::EmanInitial, When(ConfKey::AskInitVolProt), "true/false"),
            field(ConfKey::Significant, When(ConfKey::AskInitVolProt), "true/false"),
            field(ConfKey::Ransac, When(ConfKey::AskInitVolProt), "true/false"),
        ],
    },
    Section {
        title: "3D analysis",
        fields: &[
            field(ConfKey::Do3dClass, Always, "true/false"),
            field(ConfKey::Sampling3d, When(ConfKey::Ask3dSamp), "A/pixel (-1 to keep original size)"),
            field(ConfKey::Parts3d, When(ConfKey::AskParts3d), "-1 for an automatic value"),
            field(ConfKey::RelionRefine, When(ConfKey::Ask3dProt), "true/false"),
            field(ConfKey::Relion3dcl, When(ConfKey::Ask3dProt), "true/false"),
            field(ConfKey::Cryos3d, When(ConfKey::Ask3dProt), "true/false"),
        ],
    },
    Section {
        title: "Full size",
        fields: &[field(ConfKey::DoFullSize, When(ConfKey::AskFullSize), "true/false")],
    },
    Section {
        title: "GPU resources",
        fields: &[
            field(ConfKey::MotionCor2Gpu, When(ConfKey::AskResources), "GPU ids, -1 to use Xmipp"),
            field(ConfKey::GctfGpu, When(ConfKey::AskResources), "GPU id, -1 to use Xmipp CTF"),
            field(ConfKey::RelionGpu, When(ConfKey::AskResources), "GPU ids, -1 to run Relion on CPU"),
            field(ConfKey::Gl2dGpu, When(ConfKey::AskResources), "GPU id, -1 to stream 2D classes in batches"),
        ],
    },
];

fn switch_on(raw: &RawConfig, key: ConfKey) -> bool {
    raw.get_or_default(key)
        .and_then(cast_bool)
        .unwrap_or(false)
}

impl Field {
    fn is_shown(&self, raw: &RawConfig) -> bool {
        let ask_all = switch_on(raw, ConfKey::AskAll);
        match self.shown {
            Always => true,
            When(switch) => ask_all || switch_on(raw, switch),
            UnlessNamed => !raw.contains(ConfKey::ProjectName),
            DataPath { simulation } => {
                (ask_all || switch_on(raw, ConfKey::AskPath))
                    && switch_on(raw, ConfKey::Simulation) == simulation
            }
        }
    }
}

/// Keys the form would present for `raw`, in order.
pub fn visible_fields(raw: &RawConfig) -> Vec<ConfKey> {
    SECTIONS
        .iter()
        .flat_map(|s| s.fields.iter())
        .filter(|f| f.is_shown(raw))
        .map(|f| f.key)
        .collect()
}

/// Ask every visible field on `output`, reading answers from `input`.
///
/// Returns the keys whose value changed. End of input keeps every remaining
/// value as it is.
pub fn run_form<R: BufRead, W: Write>(
    raw: &mut RawConfig,
    input: &mut R,
    output: &mut W,
) -> io::Result<Vec<ConfKey>> {
    let mut edited = Vec::new();
    let mut line = String::new();

    let title = raw.get_or_default(ConfKey::WindowsTitle).unwrap_or_default();
    writeln!(output, "{}", title)?;
    writeln!(output, "{}", "=".repeat(title.chars().count()))?;

    for section in SECTIONS {
        let fields: Vec<&Field> = section.fields.iter().filter(|f| f.is_shown(raw)).collect();
        if fields.is_empty() {
            continue;
        }
        writeln!(output, "\n== {} ==", section.title)?;

        for field in fields {
            let current = raw.get_or_default(field.key).unwrap_or_default().to_string();
            write!(output, "{} [{}]", field.key.label(), current)?;
            if !field.hint.is_empty() {
                write!(output, " ({})", field.hint)?;
            }
            write!(output, ": ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(edited);
            }
            let answer = line.trim();
            if answer.is_empty() || answer == current {
                continue;
            }

            FormValueEdited {
                key: field.key.name(),
                previous: &current,
                value: answer,
            }
            .log();
            raw.set(field.key, answer);
            edited.push(field.key);
        }
    }
    Ok(edited)
}
