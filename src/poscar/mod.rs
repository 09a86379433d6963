//! POSCAR reader and writer.
//!
//! Reads the VASP 5 layout: comment, scaling factor, three lattice vectors,
//! species names, counts, optional `Selective dynamics`, and the positions
//! in `Direct` or `Cartesian` coordinates. The lattice is stored with the
//! scaling applied and positions are stored as fractional coordinates, so a
//! structure is always written back in direct form with a scale of one.
//!
//! A CONTCAR of a molecular dynamics run may continue after the positions.
//! A `Direct` or `Cartesian` line opens a block of velocities, and a blank
//! line followed by coordinates opens the predictor-corrector block.

mod error;


pub use error::PoscarError;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1};
use serde::Serialize;

use crate::elements;

const PRECISION: usize = 12;
const WIDTH: usize = 16;

/// Crystal structure from a POSCAR or CONTCAR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Poscar {
    pub comment: String,
    /// Lattice vectors as rows, scaling applied
    pub lattice: Array2<f64>,
    pub species: Vec<String>,
    /// Number of atoms per species
    pub counts: Vec<usize>,
    /// Fractional coordinates, one row per atom
    pub positions: Array2<f64>,
    /// Per-atom relaxation flags
    pub selective: Option<Vec<[bool; 3]>>,
    /// Velocities in fractional coordinates, one row per atom
    pub velocities: Option<Array2<f64>>,
    /// Predictor-corrector coordinates, kept as written
    pub predictors: Option<Array2<f64>>,
}

impl Poscar {
    /// Read a POSCAR file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PoscarError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn num_atoms(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Species name of every atom, in file order
    pub fn atom_species(&self) -> Vec<&str> {
        self.species
            .iter()
            .zip(&self.counts)
            .flat_map(|(name, &count)| std::iter::repeat(name.as_str()).take(count))
            .collect()
    }

    /// Atomic number of every atom
    ///
    /// POTCAR suffixes such as `Fe_pv` or `Si/3ab2` are ignored.
    pub fn atomic_numbers(&self) -> Result<Vec<u32>, PoscarError> {
        let per_species = self
            .species
            .iter()
            .map(|name| {
                let symbol = name.split(&['_', '/'][..]).next().unwrap_or_default();
                elements::atomic_number(symbol)
                    .ok_or_else(|| PoscarError::UnknownElement(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(per_species
            .iter()
            .zip(&self.counts)
            .flat_map(|(&z, &count)| std::iter::repeat(z).take(count))
            .collect())
    }

    /// Cell volume
    pub fn volume(&self) -> f64 {
        determinant(&self.lattice).abs()
    }

    /// Cartesian positions, in the units of the lattice
    pub fn cartesian_positions(&self) -> Array2<f64> {
        self.positions.dot(&self.lattice)
    }

    /// Cartesian velocities, in the units of the lattice
    pub fn cartesian_velocities(&self) -> Option<Array2<f64>> {
        self.velocities.as_ref().map(|v| v.dot(&self.lattice))
    }

    /// Write the rendered POSCAR to a file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), PoscarError> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}

fn determinant(m: &Array2<f64>) -> f64 {
    m[[0, 0]] * (m[[1, 1]] * m[[2, 2]] - m[[1, 2]] * m[[2, 1]])
        - m[[0, 1]] * (m[[1, 0]] * m[[2, 2]] - m[[1, 2]] * m[[2, 0]])
        + m[[0, 2]] * (m[[1, 0]] * m[[2, 1]] - m[[1, 1]] * m[[2, 0]])
}

fn inverse(m: &Array2<f64>) -> Result<Array2<f64>, PoscarError> {
    let det = determinant(m);
    if det.abs() < f64::EPSILON {
        return Err(PoscarError::SingularLattice);
    }
    let mut inv = Array2::zeros((3, 3));
    for i in 0..3 {
        for j in 0..3 {
            let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
            let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
            inv[[i, j]] = (m[[r0, c0]] * m[[r1, c1]] - m[[r0, c1]] * m[[r1, c0]]) / det;
        }
    }
    Ok(inv)
}

/// Lines of the file with 1-based numbers
struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn take(&mut self, expected: &'static str) -> Result<(usize, &'a str), PoscarError> {
        let line = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or(PoscarError::UnexpectedEnd(expected))?;
        self.pos += 1;
        Ok((self.pos, line))
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }
}

/// `rows` lines of three coordinates
fn block(
    lines: &mut Lines<'_>,
    rows: usize,
    expected: &'static str,
) -> Result<Array2<f64>, PoscarError> {
    let mut out = Array2::<f64>::zeros((rows, 3));
    for i in 0..rows {
        let (n, text) = lines.take(expected)?;
        for (j, value) in floats(n, text, 3)?.into_iter().enumerate() {
            out[[i, j]] = value;
        }
    }
    Ok(out)
}

fn is_coordinate_line(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .is_some_and(|t| t.parse::<f64>().is_ok())
}

fn number<T: FromStr>(line: usize, text: &str) -> Result<T, PoscarError> {
    text.parse().map_err(|_| PoscarError::InvalidNumber {
        line,
        text: text.to_string(),
    })
}

fn floats(line: usize, text: &str, expected: usize) -> Result<Vec<f64>, PoscarError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < expected {
        return Err(PoscarError::MissingFields {
            line,
            expected,
            found: tokens.len(),
        });
    }
    tokens[..expected].iter().map(|t| number(line, t)).collect()
}

fn starts_with_ignore_case(text: &str, c: char) -> bool {
    text.trim_start()
        .chars()
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case(&c))
}

impl FromStr for Poscar {
    type Err = PoscarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = Lines {
            lines: s.lines().collect(),
            pos: 0,
        };

        let (_, comment) = lines.take("comment")?;
        let (n, scale) = lines.take("scaling factor")?;
        let scale = floats(n, scale, 1)?[0];

        let mut raw = Array2::<f64>::zeros((3, 3));
        for i in 0..3 {
            let (n, text) = lines.take("lattice vector")?;
            for (j, value) in floats(n, text, 3)?.into_iter().enumerate() {
                raw[[i, j]] = value;
            }
        }
        // A negative scaling factor is the target cell volume
        let factor = if scale < 0.0 {
            (scale.abs() / determinant(&raw).abs()).cbrt()
        } else {
            scale
        };
        let lattice = raw * factor;

        let (_, names) = lines.take("species names")?;
        if names.split_whitespace().all(|t| t.parse::<usize>().is_ok()) {
            return Err(PoscarError::MissingSpecies);
        }
        let species: Vec<String> = names.split_whitespace().map(str::to_string).collect();

        let (n, text) = lines.take("species counts")?;
        let counts = text
            .split_whitespace()
            .map(|t| number(n, t))
            .collect::<Result<Vec<usize>, _>>()?;
        if counts.len() != species.len() {
            return Err(PoscarError::CountMismatch {
                species: species.len(),
                counts: counts.len(),
            });
        }

        let mut selective_dynamics = false;
        if lines.peek().is_some_and(|l| starts_with_ignore_case(l, 's')) {
            lines.take("selective dynamics")?;
            selective_dynamics = true;
        }
        let (_, mode) = lines.take("coordinate mode")?;
        let cartesian = starts_with_ignore_case(mode, 'c') || starts_with_ignore_case(mode, 'k');

        let num_atoms: usize = counts.iter().sum();
        let mut positions = Array2::<f64>::zeros((num_atoms, 3));
        let mut flags = Vec::new();
        for atom in 0..num_atoms {
            let (n, text) = lines.take("atomic position")?;
            let expected = if selective_dynamics { 6 } else { 3 };
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.len() < expected {
                return Err(PoscarError::MissingFields {
                    line: n,
                    expected,
                    found: tokens.len(),
                });
            }
            for j in 0..3 {
                positions[[atom, j]] = number(n, tokens[j])?;
            }
            if selective_dynamics {
                let relax = |t: &str| !t.to_ascii_lowercase().contains('f');
                flags.push([relax(tokens[3]), relax(tokens[4]), relax(tokens[5])]);
            }
        }

        // Cartesian positions carry the same scaling as the lattice, so it cancels
        if cartesian {
            positions = positions.dot(&inverse(&(&lattice / factor))?);
        }

        let mut velocities = None;
        if let Some(mode) = lines.peek().filter(|l| !l.trim().is_empty()) {
            if !(starts_with_ignore_case(mode, 'd') || starts_with_ignore_case(mode, 'c')) {
                return Err(PoscarError::UnexpectedBlock { line: lines.pos + 1 });
            }
            lines.take("velocity mode")?;
            let rows = block(&mut lines, num_atoms, "velocity")?;
            velocities = Some(if starts_with_ignore_case(mode, 'c') {
                rows.dot(&inverse(&lattice)?)
            } else {
                rows
            });
        }

        let mut predictors = None;
        if lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.take("blank line")?;
            match lines.peek() {
                Some(text) if is_coordinate_line(text) => {
                    predictors = Some(block(&mut lines, num_atoms, "predictor-corrector")?);
                }
                Some(text) if !text.trim().is_empty() => {
                    return Err(PoscarError::UnexpectedBlock { line: lines.pos + 1 });
                }
                _ => {}
            }
        }

        Ok(Poscar {
            comment: comment.trim().to_string(),
            lattice,
            species,
            counts,
            positions,
            selective: selective_dynamics.then_some(flags),
            velocities,
            predictors,
        })
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, row: ArrayView1<'_, f64>) -> fmt::Result {
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{:w$.p$}", value, w = WIDTH, p = PRECISION)?;
    }
    Ok(())
}

fn flag(relax: bool) -> &'static str {
    if relax {
        "T"
    } else {
        "F"
    }
}

impl fmt::Display for Poscar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.comment)?;
        writeln!(f, "{:w$.p$}", 1.0, w = WIDTH, p = PRECISION)?;
        for row in self.lattice.rows() {
            write_row(f, row)?;
            writeln!(f)?;
        }
        let species: Vec<String> = self.species.iter().map(|s| format!("{:>5}", s)).collect();
        writeln!(f, "{}", species.join(""))?;
        let counts: Vec<String> = self.counts.iter().map(|c| format!("{:>5}", c)).collect();
        writeln!(f, "{}", counts.join(""))?;
        if self.selective.is_some() {
            writeln!(f, "Selective dynamics")?;
        }
        writeln!(f, "Direct")?;
        for (atom, row) in self.positions.rows().into_iter().enumerate() {
            write_row(f, row)?;
            if let Some(flags) = self.selective.as_ref().and_then(|s| s.get(atom)) {
                write!(f, " {} {} {}", flag(flags[0]), flag(flags[1]), flag(flags[2]))?;
            }
            writeln!(f)?;
        }
        if let Some(velocities) = &self.velocities {
            writeln!(f, "Direct")?;
            for row in velocities.rows() {
                write_row(f, row)?;
                writeln!(f)?;
            }
        }
        if let Some(predictors) = &self.predictors {
            writeln!(f)?;
            for row in predictors.rows() {
                write_row(f, row)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
