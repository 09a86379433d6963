//! OUTCAR reader.
//!
//! Collects what vasprun.xml does not carry: the symmetry analysis of the
//! initial and the relaxing structure, the elastic moduli in kBar, and the
//! magnetization projected on the atomic spheres and of the full cell.
//! Everything else in the file is skipped.

mod error;


pub use error::OutcarError;

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use ndarray::Array2;
use regex::Regex;
use serde::Serialize;

/// Symmetry found for one structure
///
/// VASP may repeat the analysis, so every field keeps one entry per pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymmetryAnalysis {
    pub original_cell_type: Vec<String>,
    pub symmetrized_cell_type: Vec<String>,
    pub num_space_group_operations: Vec<usize>,
    pub site_symmetry_at_origin: Vec<String>,
    /// Only written by recent VASP versions
    pub point_group: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Symmetry {
    /// Analysis of the initial positions
    #[serde(rename = "static")]
    pub initial: SymmetryAnalysis,
    /// Analysis with the positions allowed to change
    pub dynamic: SymmetryAnalysis,
    pub primitive_translations: Vec<usize>,
}

/// 6x6 elastic tensors in kBar, Voigt order `XX YY ZZ XY YZ ZX`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElasticModuli {
    pub non_symmetrized: Option<Array2<f64>>,
    pub symmetrized: Option<Array2<f64>>,
    /// Including the ionic relaxation contribution
    pub total: Option<Array2<f64>>,
}

/// Orbital-resolved moment of one site or of the sum over sites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalMoment {
    /// s, p, d and, when written, f contributions
    pub orbitals: Vec<f64>,
    pub total: f64,
}

impl OrbitalMoment {
    pub fn s(&self) -> Option<f64> {
        self.orbitals.first().copied()
    }

    pub fn p(&self) -> Option<f64> {
        self.orbitals.get(1).copied()
    }

    pub fn d(&self) -> Option<f64> {
        self.orbitals.get(2).copied()
    }

    pub fn f(&self) -> Option<f64> {
        self.orbitals.get(3).copied()
    }
}

/// Magnetization integrated over the atomic spheres along one axis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SphereMagnetization {
    /// Keyed by 1-based ion index
    pub sites: BTreeMap<usize, OrbitalMoment>,
    pub total: Option<OrbitalMoment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Magnetization {
    pub x: Option<SphereMagnetization>,
    pub y: Option<SphereMagnetization>,
    pub z: Option<SphereMagnetization>,
    /// Cell magnetization from the last `number of electron` line, one
    /// value when collinear and three when noncollinear
    pub full_cell: Vec<f64>,
}

/// Quantities read from an OUTCAR
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcar {
    pub symmetry: Symmetry,
    pub elastic_moduli: ElasticModuli,
    pub magnetization: Magnetization,
}

impl Outcar {
    /// Read an OUTCAR file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, OutcarError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

struct Patterns {
    primitive_cells: Regex,
    space_group_operations: Regex,
    point_symmetry: Regex,
    point_group: Regex,
    primitive_translations: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            primitive_cells: Regex::new(r"(\d+)\s+primitive cells build up your supercell")?,
            space_group_operations: Regex::new(r"GETGRP returns: Found\s+(\d+)")?,
            point_symmetry: Regex::new(r"configuration has the point symmetry\s+(\S+)")?,
            point_group: Regex::new(r"full space group is\s+(\S+)")?,
            primitive_translations: Regex::new(r"found\s+(\d+)\s+'primitive' translations")?,
        })
    }
}

#[derive(Clone, Copy)]
enum Analysis {
    Initial,
    Dynamic,
}

fn number<T: FromStr>(line: usize, text: &str) -> Result<T, OutcarError> {
    text.parse().map_err(|_| OutcarError::InvalidNumber {
        line,
        text: text.to_string(),
    })
}

fn floats<'a, I>(line: usize, tokens: I) -> Result<Vec<f64>, OutcarError>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().map(|t| number(line, t)).collect()
}

fn symbol(text: &str) -> String {
    text.trim_end_matches('.').to_string()
}

/// Six rows below a tensor title, each led by its direction label
fn tensor(lines: &[&str], title: usize) -> Result<Array2<f64>, OutcarError> {
    let mut tensor = Array2::<f64>::zeros((6, 6));
    for i in 0..6 {
        let index = title + 3 + i;
        let text = lines.get(index).ok_or(OutcarError::UnexpectedEnd {
            line: index + 1,
            section: "elastic moduli",
        })?;
        let values = floats(index + 1, text.split_whitespace().skip(1))?;
        if values.len() < 6 {
            return Err(OutcarError::MissingFields {
                line: index + 1,
                expected: 7,
                found: values.len() + 1,
            });
        }
        for (j, value) in values.into_iter().take(6).enumerate() {
            tensor[[i, j]] = value;
        }
    }
    Ok(tensor)
}

/// Label followed by the orbital contributions and the total
fn orbital_moment(line: usize, text: &str) -> Result<OrbitalMoment, OutcarError> {
    let mut orbitals = floats(line, text.split_whitespace().skip(1))?;
    let total = orbitals.pop().ok_or(OutcarError::MissingFields {
        line,
        expected: 2,
        found: 1,
    })?;
    Ok(OrbitalMoment { orbitals, total })
}

/// Site table starting four lines below its `magnetization (x)` title
///
/// The table ends at the `tot` row. A blank line ends it early, in which
/// case the first site stands in for the total.
fn sphere(lines: &[&str], title: usize) -> Result<SphereMagnetization, OutcarError> {
    let mut sphere = SphereMagnetization::default();
    for (index, raw) in lines.iter().enumerate().skip(title + 4) {
        let line = raw.trim();
        if line.is_empty() {
            sphere.total = sphere.sites.values().next().cloned();
            break;
        }
        if line.starts_with('-') {
            continue;
        }
        let moment = orbital_moment(index + 1, line)?;
        if line.starts_with("tot") {
            sphere.total = Some(moment);
            break;
        }
        let site = line.split_whitespace().next().unwrap_or_default();
        sphere.sites.insert(number(index + 1, site)?, moment);
    }
    Ok(sphere)
}

impl FromStr for Outcar {
    type Err = OutcarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let patterns = Patterns::new()?;
        let lines: Vec<&str> = s.lines().collect();
        let following = |index: usize| lines.get(index).copied().map(str::trim).unwrap_or_default();

        let mut outcar = Outcar::default();
        let mut spheres: [Option<SphereMagnetization>; 3] = Default::default();
        let mut analysis = None;

        for (index, raw) in lines.iter().enumerate() {
            let n = index + 1;
            let line = raw.trim();

            if line.starts_with("Analysis of symmetry for initial positions (statically)") {
                analysis = Some(Analysis::Initial);
            }
            if line.starts_with("Analysis of symmetry for dynamics") {
                analysis = Some(Analysis::Dynamic);
            }

            if let Some(which) = analysis {
                let target = match which {
                    Analysis::Initial => &mut outcar.symmetry.initial,
                    Analysis::Dynamic => &mut outcar.symmetry.dynamic,
                };
                if line.starts_with("Subroutine PRICEL returns") && !following(index + 1).is_empty()
                {
                    target.original_cell_type.push("primitive cell".to_string());
                }
                if let Some(caps) = patterns.primitive_cells.captures(line) {
                    target
                        .original_cell_type
                        .push(format!("{} primitive cells", &caps[1]));
                }
                if line.starts_with("Routine SETGRP: Setting up the symmetry group for a") {
                    target
                        .symmetrized_cell_type
                        .push(following(index + 1).to_lowercase());
                }
                if let Some(caps) = patterns.space_group_operations.captures(line) {
                    target.num_space_group_operations.push(number(n, &caps[1])?);
                }
                // The point symmetry line closes one analysis pass
                if let Some(caps) = patterns.point_symmetry.captures(line) {
                    target.site_symmetry_at_origin.push(symbol(&caps[1]));
                    let group = patterns
                        .point_group
                        .captures(following(index + 1))
                        .map(|caps| symbol(&caps[1]));
                    target.point_group.push(group);
                    analysis = None;
                }
            }

            if line.starts_with("Subroutine INISYM returns") {
                match patterns.primitive_translations.captures(following(index + 2)) {
                    Some(caps) => outcar
                        .symmetry
                        .primitive_translations
                        .push(number(index + 3, &caps[1])?),
                    None => debug!("line {}: INISYM without primitive translations", n),
                }
            }

            let moduli = &mut outcar.elastic_moduli;
            let slot = if line.starts_with("ELASTIC MODULI  (kBar)") {
                Some(&mut moduli.non_symmetrized)
            } else if line.starts_with("SYMMETRIZED ELASTIC MODULI") {
                Some(&mut moduli.symmetrized)
            } else if line.starts_with("TOTAL ELASTIC MODULI") {
                Some(&mut moduli.total)
            } else {
                None
            };
            if let Some(slot) = slot {
                *slot = Some(tensor(&lines, index)?);
            }

            let axis = if line.starts_with("magnetization (x)") {
                Some(0)
            } else if line.starts_with("magnetization (y)") {
                Some(1)
            } else if line.starts_with("magnetization (z)") {
                Some(2)
            } else {
                None
            };
            if let Some(axis) = axis {
                spheres[axis] = Some(sphere(&lines, index)?);
            }

            if line.starts_with("number of electron") {
                outcar.magnetization.full_cell = floats(n, line.split_whitespace().skip(5))?;
            }
        }

        let [x, y, z] = spheres;
        outcar.magnetization.x = x;
        outcar.magnetization.y = y;
        outcar.magnetization.z = z;

        debug!(
            "OUTCAR: {} symmetry passes, elastic moduli {}",
            outcar.symmetry.initial.site_symmetry_at_origin.len()
                + outcar.symmetry.dynamic.site_symmetry_at_origin.len(),
            if outcar.elastic_moduli.total.is_some() {
                "present"
            } else {
                "absent"
            }
        );
        Ok(outcar)
    }
}
