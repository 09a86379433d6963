//! Quantity fetchers for the whole-document strategy.
//!
//! Each fetcher runs its own queries; a failure is recorded against its
//! quantity only. Sections that occur in several calculations are fetched
//! in document order so the last occurrence wins, as in the streaming pass.

use log::debug;

use super::Element;
use crate::vasprun::assemble::{self, DosRows, ParameterEntry, SpinRows};
use crate::vasprun::convert;
use crate::vasprun::data::Extraction;
use crate::vasprun::error::ExtractError;
use crate::vasprun::models::{EnergyKind, StepEnergies};
use crate::vasprun::{ParserOptions, VasprunError};

/// Fetch every supported quantity from a loaded document
pub(crate) fn extract(root: &Element, options: &ParserOptions) -> Result<Extraction, VasprunError> {
    let mut data = Extraction {
        version: root.find("generator/i[name=version]").map(|e| e.text.clone()),
        ..Extraction::default()
    };

    fetch_parameters(root, &mut data);
    fetch_species(root, &mut data)?;
    fetch_kpoints(root, &mut data);

    let calculations = root.find_all(".//calculation");
    data.steps = calculations.len();
    debug!("Found {} calculation steps", data.steps);

    for (index, calculation) in calculations.iter().enumerate() {
        fetch_step(calculation, index + 1, &mut data);
    }
    for calculation in &calculations {
        fetch_bands(calculation, options, &mut data);
        fetch_dos(calculation, &mut data);
        fetch_dielectrics(calculation, &mut data);
        fetch_response(calculation, &mut data);
    }
    // Projectors need the final k-point sets
    for calculation in &calculations {
        fetch_projectors(calculation, options, &mut data);
    }

    Ok(data)
}

fn fetch_parameters(root: &Element, data: &mut Extraction) {
    let Some(parameters) = root.find("parameters") else {
        return;
    };
    let mut entries = Vec::new();
    collect_parameters(parameters, None, &mut entries);
    data.parameters.set("parameters", assemble::parameters(&entries));
}

fn collect_parameters(element: &Element, separator: Option<&str>, out: &mut Vec<ParameterEntry>) {
    for child in &element.children {
        match child.name.as_str() {
            "separator" => collect_parameters(child, child.attr("name"), out),
            "i" => {
                if let Some(name) = child.attr("name") {
                    out.push(ParameterEntry {
                        name: name.to_string(),
                        separator: separator.map(str::to_string),
                        text: child.text.clone(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn fetch_species(root: &Element, data: &mut Extraction) -> Result<(), VasprunError> {
    let symbols: Vec<String> = root
        .find_all("atominfo/array[name=atoms]/set/rc")
        .into_iter()
        .filter_map(|rc| rc.children.iter().find(|c| c.name == "c"))
        .map(|c| c.text.clone())
        .collect();
    if !symbols.is_empty() {
        data.species = Some(convert::species(&symbols)?);
    }
    Ok(())
}

fn fetch_kpoints(root: &Element, data: &mut Extraction) {
    let Some(kpoints) = root.find("kpoints") else {
        return;
    };
    if let Some(divisions) = kpoints.find("generation/v[name=divisions]") {
        data.kpoint_divisions
            .set("divisions", assemble::kpoint_divisions(&divisions.text));
    }
    if let Some(list) = kpoints.find("varray[name=kpointlist]") {
        data.kpoints
            .set("kpointlist", assemble::kpoint_list("kpointlist", &list.texts("v")));
    }
    if let Some(weights) = kpoints.find("varray[name=weights]") {
        data.kpoint_weights
            .set("weights", assemble::kpoint_weights("weights", &weights.texts("v")));
    }
}

fn fetch_step(calculation: &Element, step: usize, data: &mut Extraction) {
    if let Some(basis) = calculation.find("structure/crystal/varray[name=basis]") {
        data.unitcell
            .insert_step("basis", step, assemble::basis(&basis.texts("v")));
    }
    if let Some(positions) = calculation.find("structure/varray[name=positions]") {
        let value = assemble::per_atom_vectors("positions", &positions.texts("v"), data.natoms());
        data.positions.insert_step("positions", step, value);
    }
    if let Some(forces) = calculation.find("varray[name=forces]") {
        let value = assemble::per_atom_vectors("forces", &forces.texts("v"), data.natoms());
        data.forces.insert_step("forces", step, value);
    }
    if let Some(stress) = calculation.find("varray[name=stress]") {
        data.stress
            .insert_step("stress", step, assemble::tensor("stress", &stress.texts("v")));
    }

    let energies = step_energies(calculation);
    data.energies.insert_step("energies", step, energies);
}

fn step_energies(calculation: &Element) -> Result<StepEnergies, ExtractError> {
    let mut energies = StepEnergies::default();
    for kind in EnergyKind::ALL {
        let selector = format!("i[name={}]", kind.xml_name());
        let electronic = calculation
            .texts(&format!("scstep/energy/{}", selector))
            .iter()
            .map(|text| convert::scalar_f64(kind.xml_name(), text))
            .collect::<Result<Vec<_>, _>>()?;
        if !electronic.is_empty() {
            energies.electronic.insert(kind, electronic);
        }
        if let Some(last) = calculation.find(&format!("energy/{}", selector)) {
            energies
                .finalized
                .insert(kind, convert::scalar_f64(kind.xml_name(), &last.text)?);
        }
    }
    Ok(energies)
}

/// Rows of an `array` whose spin sets hold `depth` further levels of `set`
fn spin_rows(array: &Element, depth: usize) -> SpinRows {
    let mut rows = SpinRows::default();
    for spin_set in array.find_all("set/set") {
        let spin = spin_set
            .attr("comment")
            .and_then(assemble::spin_channel)
            .unwrap_or(1);
        let path = format!("{}r", "set/".repeat(depth));
        for row in spin_set.find_all(&path) {
            rows.push(spin, row.text.clone());
        }
    }
    rows
}

fn fetch_bands(calculation: &Element, options: &ParserOptions, data: &mut Extraction) {
    let k_before_band = options.k_before_band;

    if let Some(array) = calculation.find("eigenvalues[!comment]/array") {
        let value = assemble::bands(
            "eigenvalues",
            &spin_rows(array, 1),
            data.kpoints.value().map(|k| k.nrows()),
            data.ispin(),
            data.nbands(),
            k_before_band,
        );
        data.bands.set("eigenvalues", value);
    }

    for interpolated in calculation.find_all("eigenvalues[comment=interpolated]") {
        if let Some(list) = interpolated.find("kpoints/varray[name=kpointlist]") {
            data.kpoints_specific.set(
                "specific kpointlist",
                assemble::kpoint_list("specific kpointlist", &list.texts("v")),
            );
        }
        if let Some(weights) = interpolated.find("kpoints/varray[name=weights]") {
            data.kpoint_weights_specific.set(
                "specific weights",
                assemble::kpoint_weights("specific weights", &weights.texts("v")),
            );
        }
        if let Some(array) = interpolated.find("eigenvalues/array") {
            let value = assemble::bands(
                "specific eigenvalues",
                &spin_rows(array, 1),
                data.kpoints_specific.value().map(|k| k.nrows()),
                data.ispin(),
                data.nbands(),
                k_before_band,
            );
            data.bands_specific.set("specific eigenvalues", value);
        }
    }

    if let Some(velocities) = calculation.find("eigenvelocities") {
        let kpoints = velocities
            .find("kpoints/varray[name=kpointlist]")
            .map(|list| assemble::kpoint_list("velocity kpointlist", &list.texts("v")));
        let weights = velocities
            .find("kpoints/varray[name=weights]")
            .map(|w| assemble::kpoint_weights("velocity weights", &w.texts("v")));
        let nkpoints = kpoints.as_ref().and_then(|k| k.as_ref().ok()).map(|k| k.nrows());
        if let Some(kpoints) = kpoints {
            data.kpoints_velocities.set("velocity kpointlist", kpoints);
        }
        if let Some(weights) = weights {
            data.kpoint_weights_velocities.set("velocity weights", weights);
        }
        if let Some(array) = velocities.find("eigenvalues/array") {
            let value = assemble::eigenvelocities(
                &spin_rows(array, 1),
                nkpoints,
                data.ispin(),
                data.nbands(),
                k_before_band,
            );
            data.eigenvelocities.set("eigenvelocities", value);
        }
    }
}

fn dos_rows(dos: &Element) -> DosRows {
    let mut rows = DosRows {
        efermi: dos.texts("i[name=efermi]"),
        ..DosRows::default()
    };
    if let Some(array) = dos.find("total/array") {
        rows.total = spin_rows(array, 0);
    }
    if let Some(array) = dos.find("partial/array") {
        // One set per ion, each holding the spin sets
        for ion in array.find_all("set/set") {
            for spin_set in ion.find_all("set") {
                let spin = spin_set
                    .attr("comment")
                    .and_then(assemble::spin_channel)
                    .unwrap_or(1);
                for row in spin_set.find_all("r") {
                    rows.partial.push(spin, row.text.clone());
                }
            }
        }
    }
    rows
}

fn fetch_dos(calculation: &Element, data: &mut Extraction) {
    for dos in calculation.find_all("dos") {
        let rows = dos_rows(dos);
        if rows.total.first.is_empty() {
            continue;
        }
        let value = assemble::dos("dos", &rows, data.natoms());
        match dos.attr("comment") {
            None => data.dos.set("dos", value),
            Some("interpolated") => data.dos_specific.set("specific dos", value),
            Some(other) => debug!("Skipping dos section {:?}", other),
        }
    }
}

fn fetch_dielectrics(calculation: &Element, data: &mut Extraction) {
    for function in calculation.find_all("dielectricfunction") {
        let imag = function.texts("imag/array/set/r");
        let real = function.texts("real/array/set/r");
        let value = match assemble::dielectric_function(&imag, &real) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => continue,
            Err(e) => Err(e),
        };
        // The first section of each transfer kind is kept
        match function.attr("comment") {
            None | Some("density-density") if data.dielectrics.is_vacant() => {
                data.dielectrics.set("dielectricfunction", value)
            }
            Some("current-current") if data.dielectrics_current.is_vacant() => data
                .dielectrics_current
                .set("current-current dielectricfunction", value),
            other => debug!("Skipping dielectric function {:?}", other),
        }
    }
    if let Some(epsilon) = calculation.find("varray[name=epsilon]") {
        data.epsilon
            .set("epsilon", assemble::tensor("epsilon", &epsilon.texts("v")));
    }
    if let Some(epsilon) = calculation.find("varray[name=epsilon_ion]") {
        data.epsilon_ion
            .set("epsilon_ion", assemble::tensor("epsilon_ion", &epsilon.texts("v")));
    }
}

fn fetch_response(calculation: &Element, data: &mut Extraction) {
    if let Some(born) = calculation.find("array[name=born_charges]") {
        data.born
            .set("born_charges", assemble::born_charges(&born.texts("set/v"), data.natoms()));
    }
    if let Some(hessian) = calculation.find("dynmat/varray[name=hessian]") {
        data.hessian
            .set("hessian", assemble::hessian(&hessian.texts("v"), data.natoms()));
    }
    if let Some(eigenvalues) = calculation.find("dynmat/v[name=eigenvalues]") {
        let eigenvectors = calculation.texts("dynmat/varray[name=eigenvectors]/v");
        data.dynmat.set(
            "dynmat",
            assemble::dynamical_matrix(&eigenvalues.text, &eigenvectors, data.natoms()),
        );
    }
}

fn fetch_projectors(calculation: &Element, options: &ParserOptions, data: &mut Extraction) {
    let Some(array) = calculation.find("projected/array") else {
        return;
    };
    let value = assemble::projectors(
        &spin_rows(array, 2),
        data.kpoints.value().map(|k| k.nrows()),
        data.ispin(),
        data.nbands(),
        data.natoms(),
        options.k_before_band,
    );
    data.projectors.set("projected", value);
}
