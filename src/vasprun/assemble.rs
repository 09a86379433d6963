//! Shaping of raw element text into typed quantities.
//!
//! Both extraction strategies collect the text of the value elements of a
//! section in document order and hand it to the functions here, so shape and
//! prerequisite checks are identical no matter how the rows were gathered.

use ndarray::{s, Array1, Array2, Array3, Array4, Axis};

use super::convert;
use super::error::{ExtractError, Prerequisite};
use super::models::{BandData, DielectricFunction, Dos, DosChannel, DynamicalMatrix, Polarization, RunParameters};

/// Value rows of a section, split by spin channel
#[derive(Debug, Default, Clone)]
pub(crate) struct SpinRows {
    pub first: Vec<String>,
    pub second: Vec<String>,
}

impl SpinRows {
    pub fn push(&mut self, spin: u8, row: String) {
        if spin == 2 {
            self.second.push(row);
        } else {
            self.first.push(row);
        }
    }

    fn second(&self) -> Option<&[String]> {
        (!self.second.is_empty()).then_some(self.second.as_slice())
    }
}

/// Spin channel from a `comment` attribute such as `spin 1` or `spin2`
pub(crate) fn spin_channel(comment: &str) -> Option<u8> {
    let rest = comment.trim().strip_prefix("spin")?;
    match rest.trim() {
        "1" => Some(1),
        "2" => Some(2),
        _ => None,
    }
}

/// Raw content of a `dos` section
#[derive(Debug, Default, Clone)]
pub(crate) struct DosRows {
    pub efermi: Vec<String>,
    pub total: SpinRows,
    pub partial: SpinRows,
}

/// One `i` element of the `parameters` section
#[derive(Debug, Clone)]
pub(crate) struct ParameterEntry {
    pub name: String,
    /// `name` of the enclosing separator, if any
    pub separator: Option<String>,
    pub text: String,
}

fn require<T>(value: Option<T>, section: &'static str, prerequisite: Prerequisite) -> Result<T, ExtractError> {
    value.ok_or_else(|| ExtractError::missing(section, prerequisite))
}

fn check_rows(section: &'static str, rows: &[String], expected: usize) -> Result<(), ExtractError> {
    if rows.len() != expected {
        return Err(ExtractError::mismatch(section, expected, rows.len()));
    }
    Ok(())
}

fn shape_error(section: &'static str, expected: usize, found: usize) -> impl Fn(ndarray::ShapeError) -> ExtractError {
    move |_| ExtractError::mismatch(section, expected, found)
}

/// Separator each run parameter is read from
const PARAMETER_SEPARATORS: &[(&str, &str)] = &[
    ("SYMPREC", "symmetry"),
    ("SIGMA", "electronic smearing"),
    ("ISMEAR", "electronic smearing"),
    ("ISPIN", "electronic spin"),
    ("NBANDS", "electronic"),
    ("NELECT", "electronic"),
    ("SYSTEM", "general"),
    ("NELM", "electronic convergence"),
    ("NSW", "ionic"),
];

/// Collect the scalar run parameters, first occurrence wins
///
/// A parameter only counts inside its own separator, the same name under
/// another separator is ignored.
pub(crate) fn parameters(entries: &[ParameterEntry]) -> Result<RunParameters, ExtractError> {
    let mut params = RunParameters::default();
    for entry in entries {
        let name = entry.name.as_str();
        let in_place = PARAMETER_SEPARATORS
            .iter()
            .any(|&(n, separator)| n == name && entry.separator.as_deref() == Some(separator));
        if !in_place {
            continue;
        }
        let text = entry.text.as_str();
        match name {
            "SYMPREC" if params.symprec.is_none() => params.symprec = Some(convert::scalar_f64("SYMPREC", text)?),
            "SIGMA" if params.sigma.is_none() => params.sigma = Some(convert::scalar_f64("SIGMA", text)?),
            "ISMEAR" if params.ismear.is_none() => params.ismear = Some(convert::scalar_i64("ISMEAR", text)?),
            "ISPIN" if params.ispin.is_none() => params.ispin = Some(convert::scalar_i64("ISPIN", text)?),
            "NBANDS" if params.nbands.is_none() => {
                let value = convert::scalar_i64("NBANDS", text)?;
                let nbands = usize::try_from(value).map_err(|_| ExtractError::InvalidNumber {
                    section: "NBANDS",
                    text: text.trim().to_string(),
                })?;
                params.nbands = Some(nbands);
            }
            "NELECT" if params.nelect.is_none() => params.nelect = Some(convert::scalar_f64("NELECT", text)?),
            "SYSTEM" if params.system.is_none() => params.system = Some(text.trim().to_string()),
            "NELM" if params.nelm.is_none() => params.nelm = Some(convert::scalar_i64("NELM", text)?),
            "NSW" if params.nsw.is_none() => params.nsw = Some(convert::scalar_i64("NSW", text)?),
            _ => {}
        }
    }
    Ok(params)
}

/// Lattice vectors of one structure
pub(crate) fn basis(rows: &[String]) -> Result<Array2<f64>, ExtractError> {
    convert::fixed_matrix("basis", rows, 3, 3)
}

/// Any `[atoms, 3]` array (positions, forces)
pub(crate) fn per_atom_vectors(
    section: &'static str,
    rows: &[String],
    natoms: Option<usize>,
) -> Result<Array2<f64>, ExtractError> {
    let natoms = require(natoms, section, Prerequisite::Species)?;
    convert::fixed_matrix(section, rows, natoms, 3)
}

/// Any 3x3 tensor (stress, static dielectric tensors)
pub(crate) fn tensor(section: &'static str, rows: &[String]) -> Result<Array2<f64>, ExtractError> {
    convert::fixed_matrix(section, rows, 3, 3)
}

pub(crate) fn kpoint_list(section: &'static str, rows: &[String]) -> Result<Array2<f64>, ExtractError> {
    convert::matrix(section, rows, 3)
}

pub(crate) fn kpoint_weights(section: &'static str, rows: &[String]) -> Result<Array1<f64>, ExtractError> {
    convert::column(section, rows)
}

pub(crate) fn kpoint_divisions(text: &str) -> Result<Vec<i64>, ExtractError> {
    let divisions = convert::ints("divisions", text)?;
    if divisions.len() != 3 {
        return Err(ExtractError::mismatch("divisions", 3, divisions.len()));
    }
    Ok(divisions)
}

/// Put a k-point major `[K, B]` array into the requested orientation
fn orient(values: Array2<f64>, k_before_band: bool) -> Array2<f64> {
    if k_before_band {
        values
    } else {
        values.reversed_axes().as_standard_layout().into_owned()
    }
}

fn band_channel(
    section: &'static str,
    rows: &[String],
    nkpoints: usize,
    nbands: usize,
    k_before_band: bool,
) -> Result<(Array2<f64>, Option<Array2<f64>>), ExtractError> {
    check_rows(section, rows, nkpoints * nbands)?;
    let cols = convert::columns(rows).max(1);
    let data = convert::matrix(section, rows, cols)?;
    let reshape = |col: usize| -> Result<Array2<f64>, ExtractError> {
        let values = data.column(col).to_vec();
        Array2::from_shape_vec((nkpoints, nbands), values)
            .map(|a| orient(a, k_before_band))
            .map_err(shape_error(section, nkpoints * nbands, rows.len()))
    };
    let eigenvalues = reshape(0)?;
    let occupancies = if cols > 1 { Some(reshape(1)?) } else { None };
    Ok((eigenvalues, occupancies))
}

/// Eigenvalues and occupancies from `r` rows of `eigenvalue occupancy`
///
/// Rows are ordered by k-point, then band.
pub(crate) fn bands(
    section: &'static str,
    rows: &SpinRows,
    nkpoints: Option<usize>,
    ispin: Option<i64>,
    nbands: Option<usize>,
    k_before_band: bool,
) -> Result<BandData, ExtractError> {
    require(ispin, section, Prerequisite::Ispin)?;
    let nbands = require(nbands, section, Prerequisite::Nbands)?;
    let nkpoints = require(nkpoints, section, Prerequisite::Kpoints)?;

    let (eig1, occ1) = band_channel(section, &rows.first, nkpoints, nbands, k_before_band)?;
    let second = rows
        .second()
        .map(|r| band_channel(section, r, nkpoints, nbands, k_before_band))
        .transpose()?;

    let (eigenvalues, occupancies) = match second {
        Some((eig2, occ2)) => {
            let occupancies = match (occ1, occ2) {
                (Some(up), Some(down)) => Some(Polarization::Spin { up, down }),
                _ => None,
            };
            (Polarization::Spin { up: eig1, down: eig2 }, occupancies)
        }
        None => (Polarization::Total(eig1), occ1.map(Polarization::Total)),
    };
    Ok(BandData {
        eigenvalues,
        occupancies,
    })
}

fn velocity_channel(
    rows: &[String],
    nkpoints: usize,
    nbands: usize,
    k_before_band: bool,
) -> Result<Array3<f64>, ExtractError> {
    const SECTION: &str = "eigenvelocities";
    check_rows(SECTION, rows, nkpoints * nbands)?;
    let data = convert::matrix(SECTION, rows, 4)?;
    let values = Array3::from_shape_vec((nkpoints, nbands, 4), data.into_raw_vec())
        .map_err(shape_error(SECTION, nkpoints * nbands, rows.len()))?;
    Ok(if k_before_band {
        values
    } else {
        values.permuted_axes([1, 0, 2]).as_standard_layout().into_owned()
    })
}

/// Eigenvalues with band velocities, `[bands, kpoints, 4]`
pub(crate) fn eigenvelocities(
    rows: &SpinRows,
    nkpoints: Option<usize>,
    ispin: Option<i64>,
    nbands: Option<usize>,
    k_before_band: bool,
) -> Result<Polarization<Array3<f64>>, ExtractError> {
    const SECTION: &str = "eigenvelocities";
    require(ispin, SECTION, Prerequisite::Ispin)?;
    let nbands = require(nbands, SECTION, Prerequisite::Nbands)?;
    let nkpoints = require(nkpoints, SECTION, Prerequisite::Kpoints)?;
    let first = velocity_channel(&rows.first, nkpoints, nbands, k_before_band)?;
    let second = rows
        .second()
        .map(|r| velocity_channel(r, nkpoints, nbands, k_before_band))
        .transpose()?;
    Ok(Polarization::from_channels(first, second))
}

fn projector_channel(
    rows: &[String],
    nkpoints: usize,
    nbands: usize,
    natoms: usize,
    k_before_band: bool,
) -> Result<Array4<f64>, ExtractError> {
    const SECTION: &str = "projected";
    let expected = nkpoints * nbands * natoms;
    check_rows(SECTION, rows, expected)?;
    let data = convert::matrix(SECTION, rows, 9)?;
    let values = Array4::from_shape_vec((nkpoints, nbands, natoms, 9), data.into_raw_vec())
        .map_err(shape_error(SECTION, expected, rows.len()))?;
    let axes = if k_before_band { [2, 0, 1, 3] } else { [2, 1, 0, 3] };
    Ok(values.permuted_axes(axes).as_standard_layout().into_owned())
}

/// Projections onto atomic orbitals, `[atoms, bands, kpoints, 9]`
///
/// Rows are ordered by k-point, then band, then atom.
pub(crate) fn projectors(
    rows: &SpinRows,
    nkpoints: Option<usize>,
    ispin: Option<i64>,
    nbands: Option<usize>,
    natoms: Option<usize>,
    k_before_band: bool,
) -> Result<Polarization<Array4<f64>>, ExtractError> {
    const SECTION: &str = "projected";
    let nkpoints = require(nkpoints, SECTION, Prerequisite::Kpoints)?;
    require(ispin, SECTION, Prerequisite::Ispin)?;
    let nbands = require(nbands, SECTION, Prerequisite::Nbands)?;
    let natoms = require(natoms, SECTION, Prerequisite::Species)?;
    let first = projector_channel(&rows.first, nkpoints, nbands, natoms, k_before_band)?;
    let second = rows
        .second()
        .map(|r| projector_channel(r, nkpoints, nbands, natoms, k_before_band))
        .transpose()?;
    Ok(Polarization::from_channels(first, second))
}

fn partial_dos(
    section: &'static str,
    rows: &[String],
    nenergies: usize,
    natoms: Option<usize>,
) -> Result<Option<Array3<f64>>, ExtractError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let natoms = require(natoms, section, Prerequisite::Species)?;
    check_rows(section, rows, natoms * nenergies)?;
    let data = convert::matrix(section, rows, 10)?;
    // The energy column repeats the total grid
    let channels: Vec<f64> = data.slice(s![.., 1..]).iter().copied().collect();
    Array3::from_shape_vec((natoms, nenergies, 9), channels)
        .map(Some)
        .map_err(shape_error(section, natoms * nenergies, rows.len()))
}

/// Total and partial density of states
pub(crate) fn dos(section: &'static str, rows: &DosRows, natoms: Option<usize>) -> Result<Dos, ExtractError> {
    let fermi_level = match rows.efermi.as_slice() {
        [] => None,
        [text] => Some(convert::scalar_f64("efermi", text)?),
        _ => return Err(ExtractError::MultipleEntries("efermi")),
    };

    let total = convert::matrix(section, &rows.total.first, 3)?;
    let nenergies = total.nrows();
    let energy = total.column(0).to_owned();
    let first = DosChannel {
        total: total.column(1).to_owned(),
        integrated: total.column(2).to_owned(),
        partial: partial_dos(section, &rows.partial.first, nenergies, natoms)?,
    };

    let second = match rows.total.second() {
        Some(down_rows) => {
            check_rows(section, down_rows, nenergies)?;
            let total = convert::matrix(section, down_rows, 3)?;
            Some(DosChannel {
                total: total.column(1).to_owned(),
                integrated: total.column(2).to_owned(),
                partial: partial_dos(section, &rows.partial.second, nenergies, natoms)?,
            })
        }
        None => None,
    };

    Ok(Dos {
        energy,
        fermi_level,
        channels: Polarization::from_channels(first, second),
    })
}

/// Dielectric function from the `imag` and `real` blocks, 7 columns each
///
/// Returns `None` when both blocks are empty.
pub(crate) fn dielectric_function(
    imag: &[String],
    real: &[String],
) -> Result<Option<DielectricFunction>, ExtractError> {
    const SECTION: &str = "dielectricfunction";
    let block = |rows: &[String]| -> Result<Option<(Array1<f64>, Array2<f64>)>, ExtractError> {
        if rows.is_empty() {
            return Ok(None);
        }
        let data = convert::matrix(SECTION, rows, 7)?;
        Ok(Some((data.column(0).to_owned(), data.slice(s![.., 1..]).to_owned())))
    };
    let imag = block(imag)?;
    let real = block(real)?;
    if let (Some((e_imag, _)), Some((e_real, _))) = (&imag, &real) {
        if e_imag.len() != e_real.len() {
            return Err(ExtractError::mismatch(SECTION, e_imag.len(), e_real.len()));
        }
    }
    let energy = match (&imag, &real) {
        (Some((energy, _)), _) | (None, Some((energy, _))) => energy.clone(),
        (None, None) => return Ok(None),
    };
    Ok(Some(DielectricFunction {
        energy,
        imag: imag.map(|(_, values)| values),
        real: real.map(|(_, values)| values),
    }))
}

/// Born effective charges, `[atoms, 3, 3]`
pub(crate) fn born_charges(rows: &[String], natoms: Option<usize>) -> Result<Array3<f64>, ExtractError> {
    const SECTION: &str = "born_charges";
    let natoms = require(natoms, SECTION, Prerequisite::Species)?;
    let data = convert::fixed_matrix(SECTION, rows, 3 * natoms, 3)?;
    Array3::from_shape_vec((natoms, 3, 3), data.into_raw_vec())
        .map_err(shape_error(SECTION, 3 * natoms, rows.len()))
}

/// Hessian, `[3 * atoms, 3 * atoms]`
pub(crate) fn hessian(rows: &[String], natoms: Option<usize>) -> Result<Array2<f64>, ExtractError> {
    let natoms = require(natoms, "hessian", Prerequisite::Species)?;
    convert::fixed_matrix("hessian", rows, 3 * natoms, 3 * natoms)
}

/// Eigenvalues and eigenvectors of the dynamical matrix
pub(crate) fn dynamical_matrix(
    eigenvalues: &str,
    eigenvectors: &[String],
    natoms: Option<usize>,
) -> Result<DynamicalMatrix, ExtractError> {
    let natoms = require(natoms, "dynmat", Prerequisite::Species)?;
    let eigenvalues = Array1::from(convert::floats("dynmat eigenvalues", eigenvalues)?);
    let eigenvectors = convert::fixed_matrix("dynmat eigenvectors", eigenvectors, 3 * natoms, 3 * natoms)?;
    if eigenvectors.len_of(Axis(0)) != eigenvalues.len() {
        return Err(ExtractError::mismatch(
            "dynmat eigenvectors",
            eigenvalues.len(),
            eigenvectors.nrows(),
        ));
    }
    Ok(DynamicalMatrix {
        eigenvalues,
        eigenvectors,
    })
}
