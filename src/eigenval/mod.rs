//! EIGENVAL reader.
//!
//! The six header lines carry the ion and spin counts, the coordinate tag,
//! the system name and the number of electrons, k-points and bands. Every
//! k-point then follows as a blank-line separated block: its coordinates
//! and weight on the first line, then one row per band holding the band
//! index, an energy per spin channel and, in files from VASP 5.4.4 on, the
//! matching occupations.

mod error;


pub use error::EigenvalError;

use std::path::Path;
use std::str::FromStr;

use log::debug;
use ndarray::Array2;
use serde::Serialize;

use crate::vasprun::Polarization;

/// Header of an EIGENVAL file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenvalMetadata {
    pub num_ions: usize,
    pub num_atoms: usize,
    /// Third field of the first line
    pub p00: i64,
    pub num_spins: usize,
    /// The coordinate tag on the fourth line starts with `C`
    pub cartesian: bool,
    pub system: String,
    pub num_electrons: usize,
    pub num_kpoints: usize,
    pub num_bands: usize,
    /// Raw numbers of the second and third lines
    pub header: [Vec<f64>; 2],
}

/// Band energies per k-point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eigenval {
    pub metadata: EigenvalMetadata,
    /// Coordinates and weight of each k-point, shape `[K, 4]`
    pub kpoints: Array2<f64>,
    /// Energies per channel, shape `[K, B]`
    pub eigenvalues: Polarization<Array2<f64>>,
    /// Occupations per channel, shape `[K, B]`, when the file carries them
    pub occupations: Option<Polarization<Array2<f64>>>,
}

impl Eigenval {
    /// Read an EIGENVAL file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EigenvalError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// K-point weights
    pub fn weights(&self) -> Vec<f64> {
        self.kpoints.column(3).to_vec()
    }
}

fn number<T: FromStr>(line: usize, text: &str) -> Result<T, EigenvalError> {
    text.parse().map_err(|_| EigenvalError::InvalidNumber {
        line,
        text: text.to_string(),
    })
}

fn fields(line: usize, text: &str, expected: usize) -> Result<Vec<&str>, EigenvalError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < expected {
        return Err(EigenvalError::MissingFields {
            line,
            expected,
            found: tokens.len(),
        });
    }
    Ok(tokens)
}

fn floats(line: usize, text: &str) -> Result<Vec<f64>, EigenvalError> {
    text.split_whitespace().map(|t| number(line, t)).collect()
}

fn polarization(arrays: Vec<Array2<f64>>) -> Option<Polarization<Array2<f64>>> {
    let mut arrays = arrays.into_iter();
    let first = arrays.next()?;
    Some(Polarization::from_channels(first, arrays.next()))
}

impl FromStr for Eigenval {
    type Err = EigenvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().collect();
        let header = |index: usize, expected: &'static str| {
            lines
                .get(index)
                .copied()
                .ok_or(EigenvalError::UnexpectedEnd(expected))
        };

        let counts = fields(1, header(0, "ion and spin counts")?, 4)?;
        let num_ions = number(1, counts[0])?;
        let num_atoms = number(1, counts[1])?;
        let p00 = number(1, counts[2])?;
        let num_spins: usize = number(1, counts[3])?;
        if !(1..=2).contains(&num_spins) {
            return Err(EigenvalError::UnsupportedSpin(num_spins));
        }

        let second = floats(2, header(1, "cell header")?)?;
        let third = floats(3, header(2, "cell header")?)?;
        let cartesian = header(3, "coordinate tag")?
            .trim_start()
            .starts_with(&['c', 'C'][..]);
        let system = header(4, "system name")?.trim().to_string();

        let sizes = fields(6, header(5, "electron, k-point and band counts")?, 3)?;
        let num_electrons = number(6, sizes[0])?;
        let num_kpoints: usize = number(6, sizes[1])?;
        let num_bands: usize = number(6, sizes[2])?;

        let mut blocks: Vec<Vec<(usize, &str)>> = Vec::new();
        let mut current = Vec::new();
        for (index, line) in lines.iter().enumerate().skip(6) {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
            } else {
                current.push((index + 1, *line));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        if blocks.len() != num_kpoints {
            return Err(EigenvalError::KpointCountMismatch {
                expected: num_kpoints,
                found: blocks.len(),
            });
        }

        // Array sizes stay bounded by the blocks actually present
        for (k, block) in blocks.iter().enumerate() {
            if block.len() - 1 != num_bands {
                return Err(EigenvalError::BandCountMismatch {
                    kpoint: k + 1,
                    expected: num_bands,
                    found: block.len() - 1,
                });
            }
        }

        // Occupation columns are decided once, from the first band row
        let with_occupations = blocks
            .first()
            .and_then(|block| block.get(1))
            .is_some_and(|(_, text)| text.split_whitespace().count() >= 1 + 2 * num_spins);
        let columns = if with_occupations {
            1 + 2 * num_spins
        } else {
            1 + num_spins
        };

        let mut kpoints = Array2::<f64>::zeros((num_kpoints, 4));
        let mut energies = vec![Array2::<f64>::zeros((num_kpoints, num_bands)); num_spins];
        let mut occupations = if with_occupations {
            vec![Array2::<f64>::zeros((num_kpoints, num_bands)); num_spins]
        } else {
            Vec::new()
        };

        for (k, block) in blocks.iter().enumerate() {
            let Some((&(n, text), bands)) = block.split_first() else {
                continue;
            };
            let coords = fields(n, text, 4)?;
            for (j, token) in coords.iter().take(4).enumerate() {
                kpoints[[k, j]] = number(n, token)?;
            }
            for &(n, text) in bands {
                let tokens = fields(n, text, columns)?;
                let index: usize = number(n, tokens[0])?;
                if index == 0 || index > num_bands {
                    return Err(EigenvalError::BandOutOfRange { line: n, index });
                }
                for spin in 0..num_spins {
                    energies[spin][[k, index - 1]] = number(n, tokens[1 + spin])?;
                    if with_occupations {
                        occupations[spin][[k, index - 1]] =
                            number(n, tokens[1 + num_spins + spin])?;
                    }
                }
            }
        }

        debug!(
            "EIGENVAL: {} k-points, {} bands, {} spin channels",
            num_kpoints, num_bands, num_spins
        );

        let eigenvalues =
            polarization(energies).ok_or(EigenvalError::UnsupportedSpin(num_spins))?;

        Ok(Eigenval {
            metadata: EigenvalMetadata {
                num_ions,
                num_atoms,
                p00,
                num_spins,
                cartesian,
                system,
                num_electrons,
                num_kpoints,
                num_bands,
                header: [second, third],
            },
            kpoints,
            eigenvalues,
            occupations: polarization(occupations),
        })
    }
}
