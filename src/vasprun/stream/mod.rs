//! Streaming strategy.
//!
//! A single forward pass over the document. Open sections are tracked on a
//! stack; the text of value elements (`v`, `r`, `c`, `i`) is buffered on the
//! innermost collecting section and converted when that section closes.
//! Memory stays bounded by the largest single section.

use std::io::BufRead;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::assemble::{self, DosRows, ParameterEntry, SpinRows};
use super::convert;
use super::data::Extraction;
use super::error::ExtractError;
use super::helpers::{attributes, tag_name};
use super::models::{EnergyKind, StepEnergies};
use super::{ParserOptions, Strategy, Vasprun, VasprunError};

use rules::Section;

pub(crate) mod rules;


const VALUE_TAGS: [&str; 4] = ["v", "r", "c", "i"];

/// Text of one value element
#[derive(Debug)]
struct Value {
    tag: String,
    name: Option<String>,
    text: String,
    spin: u8,
    /// Enclosing parameter separator
    group: Option<String>,
}

/// One open element
#[derive(Debug)]
struct Frame {
    tag: String,
    section: Option<Section>,
    name: Option<String>,
    comment: Option<String>,
    /// Value children seen so far
    cells: usize,
    values: Vec<Value>,
}

#[derive(Debug, Default)]
struct DynmatRows {
    hessian: Option<Vec<String>>,
    eigenvalues: Option<String>,
    eigenvectors: Vec<String>,
}

/// Where a k-point list belongs
enum KpointTarget {
    Regular,
    Specific,
    Velocities,
}

/// Single pass extractor over a vasprun.xml stream
pub struct StreamExtractor<R: BufRead> {
    reader: Reader<R>,
    options: ParserOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<R: BufRead> StreamExtractor<R> {
    /// Create a new extractor from a BufRead source
    pub fn new(reader: R, options: ParserOptions) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Self {
            reader: xml_reader,
            options,
            cancel: None,
        }
    }

    /// Stop with [`VasprunError::Cancelled`] once `flag` is set
    ///
    /// The flag is checked each time a section closes.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the pass and build the result
    pub fn parse(self) -> Result<Vasprun, VasprunError> {
        let options = self.options.clone();
        let mut data = self.run()?;
        data.finalize(options.extract_all);
        Ok(Vasprun::from_extraction(data, Strategy::Streaming, false))
    }

    pub(crate) fn run(mut self) -> Result<Extraction, VasprunError> {
        let mut state = State::new(self.options.k_before_band);
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => state.open(e)?,
                Ok(Event::Empty(ref e)) => {
                    state.open(e)?;
                    if state.close()?.is_some() {
                        self.check_cancel()?;
                    }
                }
                Ok(Event::Text(t)) => state.text(&t.unescape()?),
                Ok(Event::CData(t)) => state.text(&String::from_utf8_lossy(&t)),
                Ok(Event::End(_)) => {
                    if let Some(section) = state.close()? {
                        debug!("Closed section {:?}", section);
                        self.check_cancel()?;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(VasprunError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        if let Some(frame) = state.frames.last() {
            return Err(VasprunError::StructuralParse(format!(
                "unexpected end of document inside <{}>",
                frame.tag
            )));
        }
        debug!("Streamed {} calculation steps", state.data.steps);
        Ok(state.data)
    }

    fn check_cancel(&self) -> Result<(), VasprunError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(VasprunError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Section stack and pending buffers of a running pass
struct State {
    frames: Vec<Frame>,
    sections: Vec<Section>,
    value: Option<Value>,
    data: Extraction,
    k_before_band: bool,
    energies: Result<StepEnergies, ExtractError>,
    dos: DosRows,
    dielectric: (Vec<String>, Vec<String>),
    dynmat: DynmatRows,
}

impl State {
    fn new(k_before_band: bool) -> Self {
        Self {
            frames: Vec::new(),
            sections: Vec::new(),
            value: None,
            data: Extraction::default(),
            k_before_band,
            energies: Ok(StepEnergies::default()),
            dos: DosRows::default(),
            dielectric: (Vec::new(), Vec::new()),
            dynmat: DynmatRows::default(),
        }
    }

    fn within(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }

    /// 1-based index of the calculation being read
    fn step(&self) -> usize {
        self.data.steps + 1
    }

    fn open(&mut self, e: &BytesStart) -> Result<(), VasprunError> {
        let tag = tag_name(e);
        let attributes = attributes(e)?;
        let section = rules::classify(&tag, &attributes, &self.sections);
        let lookup = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let mut capture = VALUE_TAGS.contains(&tag.as_str());
        // Only the first cell of a species row names the element
        if tag == "c" {
            if let Some(row) = self.frames.last_mut().filter(|f| f.tag == "rc") {
                capture = row.cells == 0;
                row.cells += 1;
            }
        }

        if let Some(section) = section {
            self.sections.push(section);
        }
        capture &= self.sections.last().is_some_and(|s| s.collects());
        if capture {
            self.value = Some(Value {
                tag: tag.clone(),
                name: lookup("name"),
                text: String::new(),
                spin: self.spin(),
                group: self
                    .frames
                    .iter()
                    .rev()
                    .find(|f| f.tag == "separator")
                    .and_then(|f| f.name.clone()),
            });
        }

        self.frames.push(Frame {
            tag,
            section,
            name: lookup("name"),
            comment: lookup("comment"),
            cells: 0,
            values: Vec::new(),
        });
        Ok(())
    }

    /// Spin channel of the innermost `set` carrying one
    fn spin(&self) -> u8 {
        self.frames
            .iter()
            .rev()
            .filter_map(|f| f.comment.as_deref())
            .find_map(assemble::spin_channel)
            .unwrap_or(1)
    }

    fn text(&mut self, text: &str) {
        if let Some(value) = &mut self.value {
            if !value.text.is_empty() {
                value.text.push(' ');
            }
            value.text.push_str(text);
        }
    }

    /// Close the innermost element, returning the section it ended
    fn close(&mut self) -> Result<Option<Section>, VasprunError> {
        let Some(mut frame) = self.frames.pop() else {
            return Err(VasprunError::StructuralParse("unbalanced closing tag".to_string()));
        };

        if VALUE_TAGS.contains(&frame.tag.as_str()) {
            if let Some(value) = self.value.take() {
                if frame.section.is_some() {
                    frame.values.push(value);
                } else if let Some(owner) = self.frames.iter_mut().rev().find(|f| f.section.is_some()) {
                    owner.values.push(value);
                }
            }
        }

        let Some(section) = frame.section else {
            return Ok(None);
        };
        self.sections.pop();
        self.drain(section, frame)?;
        Ok(Some(section))
    }

    fn kpoint_target(&self) -> KpointTarget {
        if self.within(Section::SpecificEigenvalues) {
            KpointTarget::Specific
        } else if self.within(Section::Eigenvelocities) {
            KpointTarget::Velocities
        } else {
            KpointTarget::Regular
        }
    }

    /// Convert the buffer of a closed section
    fn drain(&mut self, section: Section, frame: Frame) -> Result<(), VasprunError> {
        let spin_rows = |values: Vec<Value>| {
            let mut rows = SpinRows::default();
            for value in values {
                rows.push(value.spin, value.text);
            }
            rows
        };
        let texts = |values: Vec<Value>| values.into_iter().map(|v| v.text).collect::<Vec<_>>();
        let step = self.step();
        let natoms = self.data.natoms();
        let data = &mut self.data;

        match section {
            Section::Version => data.version = frame.values.into_iter().next().map(|v| v.text),
            Section::Parameters => {
                let entries: Vec<ParameterEntry> = frame
                    .values
                    .into_iter()
                    .filter(|v| v.tag == "i")
                    .filter_map(|v| {
                        Some(ParameterEntry {
                            name: v.name?,
                            separator: v.group,
                            text: v.text,
                        })
                    })
                    .collect();
                data.parameters.set("parameters", assemble::parameters(&entries));
            }
            Section::Species => {
                let symbols = texts(frame.values);
                if !symbols.is_empty() {
                    data.species = Some(convert::species(&symbols)?);
                }
            }
            Section::KpointList => {
                let value = assemble::kpoint_list("kpointlist", &texts(frame.values));
                match self.kpoint_target() {
                    KpointTarget::Regular => self.data.kpoints.set("kpointlist", value),
                    KpointTarget::Specific => self.data.kpoints_specific.set("specific kpointlist", value),
                    KpointTarget::Velocities => self.data.kpoints_velocities.set("velocity kpointlist", value),
                }
            }
            Section::KpointWeights => {
                let value = assemble::kpoint_weights("weights", &texts(frame.values));
                match self.kpoint_target() {
                    KpointTarget::Regular => self.data.kpoint_weights.set("weights", value),
                    KpointTarget::Specific => self.data.kpoint_weights_specific.set("specific weights", value),
                    KpointTarget::Velocities => self.data.kpoint_weights_velocities.set("velocity weights", value),
                }
            }
            Section::Divisions => {
                let text = texts(frame.values).join(" ");
                data.kpoint_divisions.set("divisions", assemble::kpoint_divisions(&text));
            }
            Section::Basis => {
                data.unitcell
                    .insert_step("basis", step, assemble::basis(&texts(frame.values)));
            }
            Section::Positions => {
                let value = assemble::per_atom_vectors("positions", &texts(frame.values), natoms);
                data.positions.insert_step("positions", step, value);
            }
            Section::Forces => {
                let value = assemble::per_atom_vectors("forces", &texts(frame.values), natoms);
                data.forces.insert_step("forces", step, value);
            }
            Section::Stress => {
                data.stress
                    .insert_step("stress", step, assemble::tensor("stress", &texts(frame.values)));
            }
            Section::Energy => {
                // Energies of an electronic step never count as finalized
                let electronic = self.within(Section::Scstep);
                for value in frame.values {
                    let Some(kind) = value.name.as_deref().and_then(EnergyKind::from_xml_name) else {
                        continue;
                    };
                    match convert::scalar_f64(kind.xml_name(), &value.text) {
                        Ok(energy) => {
                            if let Ok(energies) = &mut self.energies {
                                if electronic {
                                    energies.electronic.entry(kind).or_default().push(energy);
                                } else {
                                    energies.finalized.insert(kind, energy);
                                }
                            }
                        }
                        Err(e) => {
                            if self.energies.is_ok() {
                                self.energies = Err(e);
                            }
                        }
                    }
                }
            }
            Section::Calculation => {
                let energies = mem::replace(&mut self.energies, Ok(StepEnergies::default()));
                self.data.energies.insert_step("energies", step, energies);
                self.data.steps += 1;
                debug!("Finished calculation step {}", step);
            }
            Section::Eigenvalues => self.drain_eigenvalues(spin_rows(frame.values)),
            Section::Efermi => self.dos.efermi.extend(texts(frame.values)),
            Section::DosTotal => {
                for value in frame.values {
                    self.dos.total.push(value.spin, value.text);
                }
            }
            Section::DosPartial => {
                for value in frame.values {
                    self.dos.partial.push(value.spin, value.text);
                }
            }
            Section::Dos | Section::DosSpecific => {
                let rows = mem::take(&mut self.dos);
                if rows.total.first.is_empty() {
                    return Ok(());
                }
                let value = assemble::dos("dos", &rows, natoms);
                if section == Section::Dos {
                    self.data.dos.set("dos", value);
                } else {
                    self.data.dos_specific.set("specific dos", value);
                }
            }
            Section::DielectricImag => self.dielectric.0 = texts(frame.values),
            Section::DielectricReal => self.dielectric.1 = texts(frame.values),
            Section::Dielectric => {
                let (imag, real) = mem::take(&mut self.dielectric);
                let value = match assemble::dielectric_function(&imag, &real) {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => return Ok(()),
                    Err(e) => Err(e),
                };
                // The first section of each transfer kind is kept
                match frame.comment.as_deref() {
                    None | Some("density-density") if self.data.dielectrics.is_vacant() => {
                        self.data.dielectrics.set("dielectricfunction", value)
                    }
                    Some("current-current") if self.data.dielectrics_current.is_vacant() => self
                        .data
                        .dielectrics_current
                        .set("current-current dielectricfunction", value),
                    other => debug!("Skipping dielectric function {:?}", other),
                }
            }
            Section::Epsilon => {
                data.epsilon
                    .set("epsilon", assemble::tensor("epsilon", &texts(frame.values)));
            }
            Section::EpsilonIon => {
                data.epsilon_ion
                    .set("epsilon_ion", assemble::tensor("epsilon_ion", &texts(frame.values)));
            }
            Section::Projected => {
                let value = assemble::projectors(
                    &spin_rows(frame.values),
                    data.kpoints.value().map(|k| k.nrows()),
                    data.ispin(),
                    data.nbands(),
                    natoms,
                    self.k_before_band,
                );
                self.data.projectors.set("projected", value);
            }
            Section::Born => {
                data.born
                    .set("born_charges", assemble::born_charges(&texts(frame.values), natoms));
            }
            Section::Hessian => self.dynmat.hessian = Some(texts(frame.values)),
            Section::DynmatEigenvalues => {
                self.dynmat.eigenvalues = Some(texts(frame.values).join(" "));
            }
            Section::DynmatEigenvectors => self.dynmat.eigenvectors = texts(frame.values),
            Section::Dynmat => {
                let rows = mem::take(&mut self.dynmat);
                if let Some(hessian) = rows.hessian {
                    self.data.hessian.set("hessian", assemble::hessian(&hessian, natoms));
                }
                if let Some(eigenvalues) = rows.eigenvalues {
                    self.data.dynmat.set(
                        "dynmat",
                        assemble::dynamical_matrix(&eigenvalues, &rows.eigenvectors, natoms),
                    );
                }
            }
            Section::Generator
            | Section::Atominfo
            | Section::Kpoints
            | Section::Structure
            | Section::Scstep
            | Section::SpecificEigenvalues
            | Section::Eigenvelocities
            | Section::ProjectedEigenvalues => {}
        }
        Ok(())
    }

    fn drain_eigenvalues(&mut self, rows: SpinRows) {
        let data = &mut self.data;
        let (ispin, nbands) = (data.ispin(), data.nbands());
        if self.sections.contains(&Section::Eigenvelocities) {
            let nkpoints = data.kpoints_velocities.value().map(|k| k.nrows());
            let value = assemble::eigenvelocities(&rows, nkpoints, ispin, nbands, self.k_before_band);
            data.eigenvelocities.set("eigenvelocities", value);
        } else if self.sections.contains(&Section::SpecificEigenvalues) {
            let nkpoints = data.kpoints_specific.value().map(|k| k.nrows());
            let value = assemble::bands(
                "specific eigenvalues",
                &rows,
                nkpoints,
                ispin,
                nbands,
                self.k_before_band,
            );
            data.bands_specific.set("specific eigenvalues", value);
        } else {
            let nkpoints = data.kpoints.value().map(|k| k.nrows());
            let value = assemble::bands("eigenvalues", &rows, nkpoints, ispin, nbands, self.k_before_band);
            data.bands.set("eigenvalues", value);
        }
    }
}
