#![no_main]

use libfuzzer_sys::fuzz_target;
use vaspio::eigenval::Eigenval;
use vaspio::incar::Incar;
use vaspio::kpoints::Kpoints;
use vaspio::outcar::Outcar;
use vaspio::poscar::Poscar;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing and rendering back may fail, never panic
    if let Ok(incar) = text.parse::<Incar>() {
        let _ = incar.to_string().parse::<Incar>();
    }
    if let Ok(kpoints) = text.parse::<Kpoints>() {
        let _ = kpoints.to_string().parse::<Kpoints>();
    }
    if let Ok(poscar) = text.parse::<Poscar>() {
        let _ = poscar.atomic_numbers();
        let _ = poscar.to_string().parse::<Poscar>();
    }
    let _ = text.parse::<Eigenval>();
    let _ = text.parse::<Outcar>();
});
