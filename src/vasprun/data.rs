//! Extraction state shared by both strategies.

use log::warn;
use ndarray::{Array1, Array2, Array3, Array4};

use super::error::ExtractError;
use super::models::{
    BandData, DielectricFunction, Dos, DynamicalMatrix, Polarization, RunParameters,
    StepEnergies, StepMap,
};

/// Outcome of extracting one quantity
///
/// `Ok(None)` means the document has no such data. Once a failure is
/// recorded it sticks, later values for the same quantity are ignored.
#[derive(Debug, Clone)]
pub(crate) struct Slot<T>(Result<Option<T>, ExtractError>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot(Ok(None))
    }
}

impl<T> Slot<T> {
    pub fn set(&mut self, name: &str, value: Result<T, ExtractError>) {
        if self.0.is_err() {
            return;
        }
        match value {
            Ok(v) => self.0 = Ok(Some(v)),
            Err(e) => self.fail(name, e),
        }
    }

    pub fn fail(&mut self, name: &str, error: ExtractError) {
        warn!("Could not extract {}: {}", name, error);
        self.0 = Err(error);
    }

    pub fn get(&self) -> Result<Option<&T>, ExtractError> {
        match &self.0 {
            Ok(value) => Ok(value.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Nothing recorded yet, neither a value nor a failure
    pub fn is_vacant(&self) -> bool {
        matches!(self.0, Ok(None))
    }

    /// The value, ignoring both absence and failure
    pub fn value(&self) -> Option<&T> {
        self.0.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.0.as_mut().ok().and_then(Option::as_mut)
    }
}

impl<T> Slot<StepMap<T>> {
    /// Record the value of one ionic step
    pub fn insert_step(&mut self, name: &str, step: usize, value: Result<T, ExtractError>) {
        match value {
            Ok(v) => {
                if let Ok(map) = &mut self.0 {
                    map.get_or_insert_with(StepMap::new).insert(step, v);
                }
            }
            Err(e) if self.0.is_ok() => self.fail(name, e),
            Err(_) => {}
        }
    }

    /// Keep only the first and the last step
    pub fn retain_endpoints(&mut self) {
        if let Ok(Some(map)) = &mut self.0 {
            let first = map.keys().next().copied();
            let last = map.keys().next_back().copied();
            map.retain(|step, _| Some(*step) == first || Some(*step) == last);
        }
    }
}

/// Everything extracted from one document
#[derive(Debug, Default)]
pub(crate) struct Extraction {
    pub version: Option<String>,
    pub parameters: Slot<RunParameters>,
    pub species: Option<Array1<u32>>,
    pub unitcell: Slot<StepMap<Array2<f64>>>,
    pub positions: Slot<StepMap<Array2<f64>>>,
    pub forces: Slot<StepMap<Array2<f64>>>,
    pub stress: Slot<StepMap<Array2<f64>>>,
    pub energies: Slot<StepMap<StepEnergies>>,
    pub kpoints: Slot<Array2<f64>>,
    pub kpoint_weights: Slot<Array1<f64>>,
    pub kpoint_divisions: Slot<Vec<i64>>,
    pub kpoints_specific: Slot<Array2<f64>>,
    pub kpoint_weights_specific: Slot<Array1<f64>>,
    /// K-points of the band velocity section
    pub kpoints_velocities: Slot<Array2<f64>>,
    pub kpoint_weights_velocities: Slot<Array1<f64>>,
    pub bands: Slot<BandData>,
    pub bands_specific: Slot<BandData>,
    pub eigenvelocities: Slot<Polarization<Array3<f64>>>,
    pub dos: Slot<Dos>,
    pub dos_specific: Slot<Dos>,
    pub dielectrics: Slot<DielectricFunction>,
    pub dielectrics_current: Slot<DielectricFunction>,
    pub epsilon: Slot<Array2<f64>>,
    pub epsilon_ion: Slot<Array2<f64>>,
    pub projectors: Slot<Polarization<Array4<f64>>>,
    pub born: Slot<Array3<f64>>,
    pub hessian: Slot<Array2<f64>>,
    pub dynmat: Slot<DynamicalMatrix>,
    /// Number of ionic steps (calculation sections) seen
    pub steps: usize,
}

impl Extraction {
    pub fn natoms(&self) -> Option<usize> {
        self.species.as_ref().map(|s| s.len())
    }

    pub fn ispin(&self) -> Option<i64> {
        self.parameters.value().and_then(|p| p.ispin)
    }

    pub fn nbands(&self) -> Option<usize> {
        self.parameters.value().and_then(|p| p.nbands)
    }

    /// Apply the step retention policy once all sections are in
    pub fn finalize(&mut self, extract_all: bool) {
        // Steps without any energy value do not count as data
        if let Some(map) = self.energies.value_mut() {
            map.retain(|_, energies| !energies.is_empty());
        }
        if self.energies.value().is_some_and(|map| map.is_empty()) {
            self.energies = Slot::default();
        }

        // Velocity k-points stand in for a missing interpolated set
        if self.kpoints_specific.is_vacant() {
            self.kpoints_specific = std::mem::take(&mut self.kpoints_velocities);
            self.kpoint_weights_specific = std::mem::take(&mut self.kpoint_weights_velocities);
        }

        if !extract_all {
            self.unitcell.retain_endpoints();
            self.positions.retain_endpoints();
            self.forces.retain_endpoints();
            self.stress.retain_endpoints();
            self.energies.retain_endpoints();
        }
    }
}

/// Initial entry of a step map
pub(crate) fn initial_step<T>(map: &StepMap<T>) -> Option<&T> {
    map.values().next()
}

/// Final entry of a step map
///
/// This is the entry of the last ionic step. When that step has no entry,
/// for example because the run was cut short, the initial entry is used.
pub(crate) fn final_step<T>(map: &StepMap<T>, steps: usize) -> Option<&T> {
    map.get(&steps).or_else(|| initial_step(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vasprun::ErrorKind;

    #[test]
    fn test_slot_failure_sticks() {
        let mut slot: Slot<i32> = Slot::default();
        assert_eq!(slot.get().unwrap(), None);
        slot.set("x", Ok(1));
        assert_eq!(slot.get().unwrap(), Some(&1));
        slot.set("x", Err(ExtractError::MultipleEntries("efermi")));
        slot.set("x", Ok(2));
        assert_eq!(slot.get().unwrap_err().kind(), ErrorKind::MultipleEntries);
        assert_eq!(slot.value(), None);
    }

    #[test]
    fn test_final_step_collapses_to_initial() {
        let mut map = StepMap::new();
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(final_step(&map, 2), Some(&"b"));
        // Last step (3) never produced an entry
        assert_eq!(final_step(&map, 3), Some(&"a"));
        assert_eq!(initial_step(&map), Some(&"a"));
    }

    #[test]
    fn test_retain_endpoints() {
        let mut slot: Slot<StepMap<usize>> = Slot::default();
        for step in 1..=5 {
            slot.insert_step("positions", step, Ok(step * 10));
        }
        slot.retain_endpoints();
        let map = slot.value().unwrap();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 5]);
    }
}
