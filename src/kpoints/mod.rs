//! KPOINTS reader and writer.
//!
//! Supports the explicit list (with an optional tetrahedron block), the
//! automatic schemes (Gamma or Monkhorst-Pack divisions, a generating basis,
//! and the fully automatic length) and line mode for band structures.
//! Files are written back with 9 decimals in fields of width 13.

mod error;


pub use error::KpointsError;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

const PRECISION: usize = 9;
const WIDTH: usize = 13;

/// Frame the coordinates are given in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coordinates {
    /// Fractional coordinates of the reciprocal lattice
    Reciprocal,
    Cartesian,
}

impl Coordinates {
    /// VASP reads `C`/`K` as Cartesian and anything else as reciprocal
    fn from_line(line: &str) -> Self {
        match line.trim_start().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('c') | Some('k') => Coordinates::Cartesian,
            _ => Coordinates::Reciprocal,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinates::Reciprocal => f.write_str("Reciprocal"),
            Coordinates::Cartesian => f.write_str("Cartesian"),
        }
    }
}

/// Centering of an automatic mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Centering {
    Gamma,
    MonkhorstPack,
}

impl fmt::Display for Centering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Centering::Gamma => f.write_str("Gamma"),
            Centering::MonkhorstPack => f.write_str("Monkhorst-Pack"),
        }
    }
}

/// One k-point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpoint {
    pub coords: [f64; 3],
    pub weight: f64,
    /// High-symmetry label (line mode)
    pub label: Option<String>,
}

impl Kpoint {
    pub fn new(coords: [f64; 3], weight: f64) -> Self {
        Self {
            coords,
            weight,
            label: None,
        }
    }
}

/// Tetrahedron block of an explicit list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tetrahedra {
    /// Volume weight shared by all tetrahedra
    pub volume: f64,
    /// `weight i j k l` per tetrahedron
    pub corners: Vec<[i64; 5]>,
}

/// How the k-points are given
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum KpointsMode {
    Explicit {
        coordinates: Coordinates,
        points: Vec<Kpoint>,
        tetrahedra: Option<Tetrahedra>,
    },
    /// Regular mesh of `divisions`
    Automatic {
        centering: Centering,
        divisions: [u32; 3],
        shift: [f64; 3],
    },
    /// Mesh spanned by an explicit generating basis
    Basis {
        coordinates: Coordinates,
        basis: [[f64; 3]; 3],
        shift: [f64; 3],
    },
    /// Fully automatic mesh from a length parameter
    Auto { length: f64 },
    /// Band-structure paths, `points` holds start/end pairs
    Line {
        per_segment: usize,
        coordinates: Coordinates,
        points: Vec<Kpoint>,
    },
}

/// Contents of a KPOINTS file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpoints {
    pub comment: String,
    pub mode: KpointsMode,
}

impl Kpoints {
    /// Gamma-centered mesh without shift
    pub fn gamma(comment: &str, divisions: [u32; 3]) -> Self {
        Self {
            comment: comment.to_string(),
            mode: KpointsMode::Automatic {
                centering: Centering::Gamma,
                divisions,
                shift: [0.0; 3],
            },
        }
    }

    /// Read a KPOINTS file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, KpointsError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Number of listed points, `None` for generated meshes
    pub fn num_points(&self) -> Option<usize> {
        match &self.mode {
            KpointsMode::Explicit { points, .. } | KpointsMode::Line { points, .. } => {
                Some(points.len())
            }
            _ => None,
        }
    }

    /// Write the rendered KPOINTS to a file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), KpointsError> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Non-empty lines after the comment, with 1-based line numbers
struct Lines<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(content: &'a str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .skip(1)
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| (i + 1, l))
            .collect();
        Self { lines, pos: 0 }
    }

    fn take(&mut self, expected: &'static str) -> Result<(usize, &'a str), KpointsError> {
        let line = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or(KpointsError::UnexpectedEnd(expected))?;
        self.pos += 1;
        Ok(line)
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).map(|(_, l)| *l)
    }

    fn remaining(&mut self) -> Vec<(usize, &'a str)> {
        let rest = self.lines[self.pos..].to_vec();
        self.pos = self.lines.len();
        rest
    }
}

fn number<T: FromStr>(line: usize, text: &str) -> Result<T, KpointsError> {
    text.parse().map_err(|_| KpointsError::InvalidNumber {
        line,
        text: text.to_string(),
    })
}

/// First `N` fields of a line as numbers
fn fields<T: FromStr + Copy + Default, const N: usize>(
    line: usize,
    text: &str,
) -> Result<[T; N], KpointsError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < N {
        return Err(KpointsError::MissingFields {
            line,
            expected: N,
            found: tokens.len(),
        });
    }
    let mut values = [T::default(); N];
    for (value, token) in values.iter_mut().zip(&tokens) {
        *value = number(line, token)?;
    }
    Ok(values)
}

fn first_char(text: &str) -> char {
    text.trim_start()
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or(' ')
}

/// Optional shift line, zero when absent
fn shift(lines: &mut Lines<'_>) -> Result<[f64; 3], KpointsError> {
    match lines.peek() {
        Some(_) => {
            let (n, text) = lines.take("shift")?;
            fields(n, text)
        }
        None => Ok([0.0; 3]),
    }
}

fn parse_explicit(lines: &mut Lines<'_>, count: usize) -> Result<KpointsMode, KpointsError> {
    let (_, coordinates) = lines.take("coordinate mode")?;
    let coordinates = Coordinates::from_line(coordinates);

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let (n, text) = lines.take("k-point")?;
        let coords = fields::<f64, 3>(n, text)?;
        let weight = match text.split_whitespace().nth(3) {
            Some(w) => number(n, w)?,
            None => 1.0,
        };
        points.push(Kpoint::new(coords, weight));
    }

    let tetrahedra = match lines.peek() {
        Some(line) if first_char(line) == 't' => {
            lines.take("tetrahedra")?;
            let (n, header) = lines.take("tetrahedron count and volume")?;
            let tokens: Vec<&str> = header.split_whitespace().collect();
            let [total, volume] = tokens.as_slice() else {
                return Err(KpointsError::MissingFields {
                    line: n,
                    expected: 2,
                    found: tokens.len(),
                });
            };
            let total: usize = number(n, total)?;
            let volume: f64 = number(n, volume)?;
            let mut corners = Vec::with_capacity(total);
            for _ in 0..total {
                let (n, text) = lines.take("tetrahedron")?;
                corners.push(fields::<i64, 5>(n, text)?);
            }
            Some(Tetrahedra { volume, corners })
        }
        _ => None,
    };

    Ok(KpointsMode::Explicit {
        coordinates,
        points,
        tetrahedra,
    })
}

fn parse_automatic(lines: &mut Lines<'_>, scheme: &str) -> Result<KpointsMode, KpointsError> {
    let centering = match first_char(scheme) {
        'g' => Some(Centering::Gamma),
        'm' => Some(Centering::MonkhorstPack),
        _ => None,
    };
    if let Some(centering) = centering {
        let (n, text) = lines.take("divisions")?;
        return Ok(KpointsMode::Automatic {
            centering,
            divisions: fields(n, text)?,
            shift: shift(lines)?,
        });
    }

    match first_char(scheme) {
        'a' => {
            let (n, text) = lines.take("length")?;
            let [length] = fields::<f64, 1>(n, text)?;
            Ok(KpointsMode::Auto { length })
        }
        'c' | 'k' | 'r' => {
            let mut basis = [[0.0; 3]; 3];
            for vector in basis.iter_mut() {
                let (n, text) = lines.take("generating vector")?;
                *vector = fields(n, text)?;
            }
            Ok(KpointsMode::Basis {
                coordinates: Coordinates::from_line(scheme),
                basis,
                shift: shift(lines)?,
            })
        }
        _ => Err(KpointsError::UnsupportedScheme(scheme.trim().to_string())),
    }
}

fn parse_line_mode(lines: &mut Lines<'_>, per_segment: usize) -> Result<KpointsMode, KpointsError> {
    let (_, coordinates) = lines.take("coordinate mode")?;
    let coordinates = Coordinates::from_line(coordinates);

    let mut points = Vec::new();
    for (n, text) in lines.remaining() {
        let coords = fields::<f64, 3>(n, text)?;
        let label: String = text
            .split_whitespace()
            .skip(3)
            .collect::<Vec<_>>()
            .join(" ");
        let label = label.trim_start_matches('!').trim();
        points.push(Kpoint {
            coords,
            weight: 1.0,
            label: (!label.is_empty()).then(|| label.to_string()),
        });
    }
    if points.len() % 2 != 0 {
        return Err(KpointsError::UnpairedLinePoints(points.len()));
    }

    Ok(KpointsMode::Line {
        per_segment,
        coordinates,
        points,
    })
}

impl FromStr for Kpoints {
    type Err = KpointsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let comment = s
            .lines()
            .next()
            .ok_or(KpointsError::UnexpectedEnd("comment"))?
            .trim()
            .to_string();
        let mut lines = Lines::new(s);

        let (n, count) = lines.take("number of k-points")?;
        let [count] = fields::<i64, 1>(n, count)?;
        let scheme = lines
            .peek()
            .ok_or(KpointsError::UnexpectedEnd("generation scheme"))?;

        // An explicit list has its coordinate mode where the scheme would be
        let mode = if first_char(scheme) == 'l' {
            lines.take("generation scheme")?;
            parse_line_mode(&mut lines, count.max(0) as usize)?
        } else if count <= 0 {
            lines.take("generation scheme")?;
            parse_automatic(&mut lines, scheme)?
        } else {
            parse_explicit(&mut lines, count as usize)?
        };

        Ok(Kpoints { comment, mode })
    }
}

fn write_vector(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{:w$.p$}", value, w = WIDTH, p = PRECISION)?;
    }
    Ok(())
}

impl fmt::Display for Kpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.comment)?;
        match &self.mode {
            KpointsMode::Explicit {
                coordinates,
                points,
                tetrahedra,
            } => {
                writeln!(f, "{:6}", points.len())?;
                writeln!(f, "{}", coordinates)?;
                for point in points {
                    write_vector(f, &point.coords)?;
                    f.write_str(" ")?;
                    write_vector(f, &[point.weight])?;
                    writeln!(f)?;
                }
                if let Some(tetrahedra) = tetrahedra {
                    writeln!(f, "Tetrahedra")?;
                    write!(f, "{:6} ", tetrahedra.corners.len())?;
                    write_vector(f, &[tetrahedra.volume])?;
                    writeln!(f)?;
                    for corner in &tetrahedra.corners {
                        let line: Vec<String> = corner.iter().map(|c| format!("{:6}", c)).collect();
                        writeln!(f, "{}", line.join(" "))?;
                    }
                }
            }
            KpointsMode::Automatic {
                centering,
                divisions,
                shift,
            } => {
                writeln!(f, "0")?;
                writeln!(f, "{}", centering)?;
                writeln!(f, "{:6} {:6} {:6}", divisions[0], divisions[1], divisions[2])?;
                write_vector(f, shift)?;
                writeln!(f)?;
            }
            KpointsMode::Basis {
                coordinates,
                basis,
                shift,
            } => {
                writeln!(f, "0")?;
                writeln!(f, "{}", coordinates)?;
                for vector in basis {
                    write_vector(f, vector)?;
                    writeln!(f)?;
                }
                write_vector(f, shift)?;
                writeln!(f)?;
            }
            KpointsMode::Auto { length } => {
                writeln!(f, "0")?;
                writeln!(f, "Auto")?;
                writeln!(f, "{}", length)?;
            }
            KpointsMode::Line {
                per_segment,
                coordinates,
                points,
            } => {
                writeln!(f, "{:6}", per_segment)?;
                writeln!(f, "Line-mode")?;
                writeln!(f, "{}", coordinates)?;
                for (i, point) in points.iter().enumerate() {
                    if i > 0 && i % 2 == 0 {
                        writeln!(f)?;
                    }
                    write_vector(f, &point.coords)?;
                    if let Some(label) = &point.label {
                        write!(f, " ! {}", label)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
