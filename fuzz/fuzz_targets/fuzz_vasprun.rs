#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use vaspio::vasprun::{EnergyKind, ParserOptions, Status, Vasprun};

fuzz_target!(|data: &[u8]| {
    // Either strategy may reject the input, neither may panic
    for streaming in [false, true] {
        let options = ParserOptions::default().with_force_streaming(streaming);
        let Ok(run) = Vasprun::from_reader(Cursor::new(data), options) else {
            continue;
        };

        // Touch every quantity so conversion errors surface
        let _ = run.parameters();
        let _ = run.positions(Status::All);
        let _ = run.forces(Status::Final);
        let _ = run.unitcell(Status::Initial);
        let _ = run.stress(Status::All);
        let _ = run.kpoints();
        let _ = run.eigenvalues();
        let _ = run.occupancies();
        let _ = run.dos();
        let _ = run.dielectrics();
        let _ = run.projectors();
        let _ = run.born();
        let _ = run.dynmat();
        let _ = run.energies(Status::All, &EnergyKind::ALL, true);
    }
});
