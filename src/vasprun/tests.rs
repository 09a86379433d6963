use super::*;
use ndarray::array;

/// Two ionic steps of a two atom run with bands, DOS, projections and optics
pub(crate) const FULL: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <generator>
  <i name="program" type="string">vasp </i>
  <i name="version" type="string">6.3.2  </i>
  <i name="platform" type="string">LinuxIFC </i>
 </generator>
 <kpoints>
  <generation param="Gamma">
   <v type="int" name="divisions">       1        1        1 </v>
   <v name="usershift">      0.00000000      0.00000000      0.00000000 </v>
  </generation>
  <varray name="kpointlist" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
  </varray>
  <varray name="weights" >
   <v>       1.00000000 </v>
  </varray>
 </kpoints>
 <parameters>
  <separator name="general" >
   <i type="string" name="SYSTEM">unknown system</i>
  </separator>
  <separator name="electronic" >
   <i type="int" name="NBANDS">      2</i>
   <i name="NELECT">      8.00000000</i>
   <separator name="electronic smearing" >
    <i name="SIGMA">      0.05000000</i>
    <i type="int" name="ISMEAR">     0</i>
   </separator>
   <separator name="electronic spin" >
    <i type="int" name="ISPIN">      1</i>
   </separator>
   <separator name="electronic convergence" >
    <i type="int" name="NELM">     60</i>
   </separator>
  </separator>
  <separator name="ionic" >
   <i type="int" name="NSW">      2</i>
  </separator>
  <separator name="symmetry" >
   <i name="SYMPREC">      0.00001000</i>
  </separator>
 </parameters>
 <atominfo>
  <atoms>       2 </atoms>
  <types>       1 </types>
  <array name="atoms" >
   <dimension dim="1">ion</dimension>
   <field type="string">element</field>
   <field type="int">atomtype</field>
   <set>
    <rc><c>Si</c><c>   1</c></rc>
    <rc><c>Si</c><c>   1</c></rc>
   </set>
  </array>
  <array name="atomtypes" >
   <set>
    <rc><c>   2</c><c>Si</c><c>     28.08500000</c></rc>
   </set>
  </array>
 </atominfo>
 <structure name="initialpos" >
  <crystal>
   <varray name="basis" >
    <v>       9.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       9.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       9.00000000 </v>
   </varray>
  </crystal>
 </structure>
 <calculation>
  <scstep>
   <energy>
    <i name="e_fr_energy">    -10.00000000 </i>
    <i name="e_wo_entrp">    -10.10000000 </i>
    <i name="e_0_energy">    -10.05000000 </i>
   </energy>
  </scstep>
  <scstep>
   <energy>
    <i name="e_fr_energy">    -10.50000000 </i>
    <i name="e_wo_entrp">    -10.60000000 </i>
    <i name="e_0_energy">    -10.55000000 </i>
   </energy>
  </scstep>
  <structure>
   <crystal>
    <varray name="basis" >
     <v>       5.00000000       0.00000000       0.00000000 </v>
     <v>       0.00000000       5.00000000       0.00000000 </v>
     <v>       0.00000000       0.00000000       5.00000000 </v>
    </varray>
   </crystal>
   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       0.25000000       0.25000000       0.25000000 </v>
   </varray>
  </structure>
  <varray name="forces" >
   <v>       0.11100000       0.00000000       0.00000000 </v>
   <v>      -0.11100000       0.00000000       0.00000000 </v>
  </varray>
  <varray name="stress" >
   <v>       1.00000000       0.00000000       0.00000000 </v>
   <v>       0.00000000       1.00000000       0.00000000 </v>
   <v>       0.00000000       0.00000000       1.00000000 </v>
  </varray>
  <energy>
   <i name="e_fr_energy">    -10.51000000 </i>
   <i name="e_wo_entrp">    -10.61000000 </i>
   <i name="e_0_energy">    -10.56000000 </i>
  </energy>
 </calculation>
 <calculation>
  <scstep>
   <energy>
    <i name="e_fr_energy">    -11.00000000 </i>
    <i name="e_wo_entrp">    -11.10000000 </i>
    <i name="e_0_energy">    -11.05000000 </i>
   </energy>
  </scstep>
  <structure>
   <crystal>
    <varray name="basis" >
     <v>       5.10000000       0.00000000       0.00000000 </v>
     <v>       0.00000000       5.10000000       0.00000000 </v>
     <v>       0.00000000       0.00000000       5.10000000 </v>
    </varray>
   </crystal>
   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       0.26000000       0.26000000       0.26000000 </v>
   </varray>
  </structure>
  <varray name="forces" >
   <v>       0.02200000       0.00000000       0.00000000 </v>
   <v>      -0.02200000       0.00000000       0.00000000 </v>
  </varray>
  <varray name="stress" >
   <v>       2.00000000       0.00000000       0.00000000 </v>
   <v>       0.00000000       2.00000000       0.00000000 </v>
   <v>       0.00000000       0.00000000       2.00000000 </v>
  </varray>
  <energy>
   <i name="e_fr_energy">    -11.01000000 </i>
   <i name="e_wo_entrp">    -11.11000000 </i>
   <i name="e_0_energy">    -11.06000000 </i>
  </energy>
  <eigenvalues>
   <array>
    <dimension dim="1">band</dimension>
    <dimension dim="2">kpoint</dimension>
    <dimension dim="3">spin</dimension>
    <field>eigene</field>
    <field>occ</field>
    <set>
     <set comment="spin 1">
      <set comment="kpoint 1">
       <r>   -1.0000    1.0000 </r>
       <r>    2.0000    0.0000 </r>
      </set>
     </set>
    </set>
   </array>
  </eigenvalues>
  <dos>
   <i name="efermi">      5.92134456 </i>
   <total>
    <array>
     <dimension dim="1">gridpoints</dimension>
     <dimension dim="2">spin</dimension>
     <field>energy</field>
     <field>total</field>
     <field>integrated</field>
     <set>
      <set comment="spin 1">
       <r>   -5.0000    0.0000    0.0000 </r>
       <r>    0.0000    1.5000    0.7500 </r>
       <r>    5.0000    0.5000    1.0000 </r>
      </set>
     </set>
    </array>
   </total>
   <partial>
    <array>
     <dimension dim="1">gridpoints</dimension>
     <dimension dim="2">spin</dimension>
     <dimension dim="3">ion</dimension>
     <field>energy</field>
     <field>s</field>
     <field>py</field>
     <field>pz</field>
     <field>px</field>
     <field>dxy</field>
     <field>dyz</field>
     <field>dz2</field>
     <field>dxz</field>
     <field>x2-y2</field>
     <set>
      <set comment="ion 1">
       <set comment="spin 1">
        <r>   -5.0000    0.0100    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000 </r>
        <r>    0.0000    0.0200    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000 </r>
        <r>    5.0000    0.0300    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0400 </r>
       </set>
      </set>
      <set comment="ion 2">
       <set comment="spin 1">
        <r>   -5.0000    0.0500    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000 </r>
        <r>    0.0000    0.0600    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000 </r>
        <r>    5.0000    0.0700    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000    0.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </partial>
  </dos>
  <projected>
   <eigenvalues>
    <array>
     <set>
      <set comment="spin 1">
       <set comment="kpoint 1">
        <r>   -1.0000    1.0000 </r>
        <r>    2.0000    0.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </eigenvalues>
   <array>
    <dimension dim="1">ion</dimension>
    <dimension dim="2">band</dimension>
    <dimension dim="3">kpoint</dimension>
    <dimension dim="4">spin</dimension>
    <field>s</field>
    <field>py</field>
    <field>pz</field>
    <field>px</field>
    <field>dxy</field>
    <field>dyz</field>
    <field>dz2</field>
    <field>dxz</field>
    <field>x2-y2</field>
    <set>
     <set comment="spin1">
      <set comment="kpoint 1">
       <set comment="band 1">
        <r>  0.1000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000 </r>
        <r>  0.2000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000 </r>
       </set>
       <set comment="band 2">
        <r>  0.3000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000 </r>
        <r>  0.4000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0000  0.0900 </r>
       </set>
      </set>
     </set>
    </set>
   </array>
  </projected>
  <dielectricfunction>
   <imag>
    <array>
     <dimension dim="1">gridpoints</dimension>
     <field>energy</field>
     <field>xx</field>
     <field>yy</field>
     <field>zz</field>
     <field>xy</field>
     <field>yz</field>
     <field>zx</field>
     <set>
      <r>     0.0000     0.0000     0.0000     0.0000     0.0000     0.0000     0.0000 </r>
      <r>     1.0000     0.5000     0.5000     0.5000     0.0000     0.0000     0.0000 </r>
     </set>
    </array>
   </imag>
   <real>
    <array>
     <set>
      <r>     0.0000    12.0000    12.0000    12.0000     0.0000     0.0000     0.0000 </r>
      <r>     1.0000    12.5000    12.5000    12.5000     0.0000     0.0000     0.0000 </r>
     </set>
    </array>
   </real>
  </dielectricfunction>
  <dielectricfunction comment="current-current">
   <imag>
    <array>
     <set>
      <r>     0.0000     0.0000     0.0000     0.0000     0.0000     0.0000     0.0000 </r>
      <r>     1.0000     0.7000     0.7000     0.7000     0.0000     0.0000     0.0000 </r>
     </set>
    </array>
   </imag>
   <real>
    <array>
     <set>
      <r>     0.0000    13.0000    13.0000    13.0000     0.0000     0.0000     0.0000 </r>
      <r>     1.0000    13.5000    13.5000    13.5000     0.0000     0.0000     0.0000 </r>
     </set>
    </array>
   </real>
  </dielectricfunction>
  <varray name="epsilon" >
   <v>      11.90000000       0.00000000       0.00000000 </v>
   <v>       0.00000000      11.90000000       0.00000000 </v>
   <v>       0.00000000       0.00000000      11.90000000 </v>
  </varray>
  <varray name="epsilon_ion" >
   <v>       0.30000000       0.00000000       0.00000000 </v>
   <v>       0.00000000       0.30000000       0.00000000 </v>
   <v>       0.00000000       0.00000000       0.30000000 </v>
  </varray>
 </calculation>
 <structure name="finalpos" >
  <crystal>
   <varray name="basis" >
    <v>       5.10000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       5.10000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       5.10000000 </v>
   </varray>
  </crystal>
 </structure>
</modeling>
"#;

const SPIN_HEAD: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <kpoints>
  <varray name="kpointlist" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
  </varray>
  <varray name="weights" >
   <v>       1.00000000 </v>
  </varray>
 </kpoints>
 <parameters>
  <separator name="electronic" >
   <i type="int" name="NBANDS">      1</i>
   <separator name="electronic spin" >
    <i type="int" name="ISPIN">      2</i>
   </separator>
  </separator>
 </parameters>
 <atominfo>
  <array name="atoms" >
   <set>
    <rc><c>Fe</c><c>   1</c></rc>
   </set>
  </array>
 </atominfo>
 <calculation>
  <eigenvalues>
   <array>
    <set>
     <set comment="spin 1">
      <set comment="kpoint 1">
       <r>   -3.0000    1.0000 </r>
      </set>
     </set>
     <set comment="spin 2">
      <set comment="kpoint 1">
       <r>   -2.5000    1.0000 </r>
      </set>
     </set>
    </set>
   </array>
  </eigenvalues>
"#;

const SPIN_INTERPOLATED: &str = r#"  <eigenvalues comment="interpolated">
   <kpoints>
    <varray name="kpointlist" >
     <v>       0.00000000       0.00000000       0.00000000 </v>
     <v>       0.50000000       0.00000000       0.00000000 </v>
    </varray>
    <varray name="weights" >
     <v>       0.50000000 </v>
     <v>       0.50000000 </v>
    </varray>
   </kpoints>
   <eigenvalues>
    <array>
     <set>
      <set comment="spin 1">
       <set comment="kpoint 1">
        <r>   -3.0000    1.0000 </r>
       </set>
       <set comment="kpoint 2">
        <r>   -1.0000    1.0000 </r>
       </set>
      </set>
      <set comment="spin 2">
       <set comment="kpoint 1">
        <r>   -2.5000    1.0000 </r>
       </set>
       <set comment="kpoint 2">
        <r>   -0.5000    1.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </eigenvalues>
  </eigenvalues>
"#;

const SPIN_VELOCITIES: &str = r#"  <eigenvelocities>
   <kpoints>
    <varray name="kpointlist" >
     <v>       0.00000000       0.00000000       0.00000000 </v>
     <v>       0.25000000       0.00000000       0.00000000 </v>
     <v>       0.50000000       0.00000000       0.00000000 </v>
    </varray>
    <varray name="weights" >
     <v>       0.25000000 </v>
     <v>       0.50000000 </v>
     <v>       0.25000000 </v>
    </varray>
   </kpoints>
   <eigenvalues>
    <array>
     <set>
      <set comment="spin 1">
       <set comment="kpoint 1">
        <r>   -3.0000    0.0000    0.0000    0.0000 </r>
       </set>
       <set comment="kpoint 2">
        <r>   -2.0000    0.1000    0.0000    0.0000 </r>
       </set>
       <set comment="kpoint 3">
        <r>   -1.0000    0.2000    0.0000    0.0000 </r>
       </set>
      </set>
      <set comment="spin 2">
       <set comment="kpoint 1">
        <r>   -2.5000    0.0000    0.0000    0.0000 </r>
       </set>
       <set comment="kpoint 2">
        <r>   -1.5000    0.1500    0.0000    0.0000 </r>
       </set>
       <set comment="kpoint 3">
        <r>   -0.5000    0.2500    0.0000    0.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </eigenvalues>
  </eigenvelocities>
"#;

const SPIN_TAIL: &str = r#"  <dos comment="interpolated">
   <i name="efermi">      1.50000000 </i>
   <total>
    <array>
     <set>
      <set comment="spin 1">
       <r>   -1.0000    0.5000    0.2000 </r>
       <r>    1.0000    0.7000    0.9000 </r>
      </set>
      <set comment="spin 2">
       <r>   -1.0000    0.4000    0.1000 </r>
       <r>    1.0000    0.6000    0.8000 </r>
      </set>
     </set>
    </array>
   </total>
  </dos>
 </calculation>
</modeling>
"#;

/// A single atom with linear response data
const RESPONSE: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <atominfo>
  <array name="atoms" >
   <set>
    <rc><c>Na</c><c>   1</c></rc>
   </set>
  </array>
 </atominfo>
 <calculation>
  <array name="born_charges" >
   <set>
    <v>       1.10000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       1.20000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       1.30000000 </v>
   </set>
  </array>
  <dynmat>
   <varray name="hessian" >
    <v>      -1.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000      -2.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000      -3.00000000 </v>
   </varray>
   <v name="eigenvalues">      -1.00000000      -2.00000000      -3.00000000 </v>
   <varray name="eigenvectors" >
    <v>       1.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       1.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       1.00000000 </v>
   </varray>
  </dynmat>
 </calculation>
</modeling>
"#;

fn spin_document(interpolated: bool) -> String {
    let mut xml = String::from(SPIN_HEAD);
    if interpolated {
        xml.push_str(SPIN_INTERPOLATED);
    }
    xml.push_str(SPIN_VELOCITIES);
    xml.push_str(SPIN_TAIL);
    xml
}

fn parse(xml: &str, options: ParserOptions) -> Vasprun {
    Vasprun::from_str(xml, options).unwrap()
}

/// The same document read with both strategies
fn both_with(xml: &str, options: ParserOptions) -> Vec<Vasprun> {
    let runs = vec![
        parse(xml, options.clone()),
        parse(xml, options.with_force_streaming(true)),
    ];
    assert_eq!(runs[0].strategy(), Strategy::WholeDocument);
    assert_eq!(runs[1].strategy(), Strategy::Streaming);
    runs
}

fn both(xml: &str) -> Vec<Vasprun> {
    both_with(xml, ParserOptions::default())
}

fn without_lines_containing(xml: &str, marker: &str) -> String {
    xml.lines()
        .filter(|line| !line.contains(marker))
        .map(|line| format!("{}\n", line))
        .collect()
}

#[test]
fn test_header_quantities() {
    for run in both(FULL) {
        assert!(!run.truncated());
        assert_eq!(run.version().as_deref(), Some("6.3.2"));
        assert_eq!(run.ionic_steps(), 2);

        let params = run.parameters().unwrap().unwrap();
        assert_eq!(params.ispin, Some(1));
        assert_eq!(params.nbands, Some(2));
        assert_eq!(params.ismear, Some(0));
        assert_eq!(params.sigma, Some(0.05));
        assert_eq!(params.nelect, Some(8.0));
        assert_eq!(params.nelm, Some(60));
        assert_eq!(params.nsw, Some(2));
        assert_eq!(params.symprec, Some(0.00001));
        assert_eq!(params.system.as_deref(), Some("unknown system"));

        assert_eq!(run.species().unwrap(), &array![14, 14]);
        assert_eq!(run.kpoints().unwrap().unwrap(), &array![[0.0, 0.0, 0.0]]);
        assert_eq!(run.kpoint_weights().unwrap().unwrap(), &array![1.0]);
        assert_eq!(run.kpoint_divisions().unwrap(), Some(&[1, 1, 1][..]));
        assert_eq!(run.kpoints_specific().unwrap(), None);
    }
}

#[test]
fn test_eigenvalues_band_major() {
    for run in both(FULL) {
        let eigenvalues = run.eigenvalues().unwrap().unwrap();
        assert_eq!(eigenvalues.total().unwrap(), &array![[-1.0], [2.0]]);
        let occupancies = run.occupancies().unwrap().unwrap();
        assert_eq!(occupancies.total().unwrap(), &array![[1.0], [0.0]]);
        assert!(!eigenvalues.is_spin_polarized());
    }
}

#[test]
fn test_eigenvalues_k_before_band() {
    let options = ParserOptions::default().with_k_before_band(true);
    for run in both_with(FULL, options) {
        let eigenvalues = run.eigenvalues().unwrap().unwrap();
        assert_eq!(eigenvalues.total().unwrap(), &array![[-1.0, 2.0]]);
        let occupancies = run.occupancies().unwrap().unwrap();
        assert_eq!(occupancies.total().unwrap(), &array![[1.0, 0.0]]);
    }
}

#[test]
fn test_per_step_status() {
    for run in both(FULL) {
        let initial = run.unitcell(Status::Initial).unwrap().unwrap().single().unwrap();
        assert_eq!(initial[[0, 0]], 5.0);
        let last = run.unitcell("final").unwrap().unwrap().single().unwrap();
        assert_eq!(last[[2, 2]], 5.1);

        let positions = run.positions(Status::All).unwrap().unwrap().all().unwrap();
        assert_eq!(positions.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(positions[&2][[1, 0]], 0.26);

        let forces = run.forces(Status::Final).unwrap().unwrap().single().unwrap();
        assert_eq!(forces, &array![[0.022, 0.0, 0.0], [-0.022, 0.0, 0.0]]);
        let stress = run.stress(Status::Initial).unwrap().unwrap().single().unwrap();
        assert_eq!(stress[[1, 1]], 1.0);
    }
}

#[test]
fn test_unknown_status_is_rejected() {
    let run = parse(FULL, ParserOptions::default());
    let err = run.positions("last").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatusSelector);
    assert_eq!(err.kind().code(), 507);
    let err = run.energies("Final", &[], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatusSelector);
}

#[test]
fn test_fermi_level_is_bit_exact() {
    for run in both(FULL) {
        assert_eq!(run.fermi_level().unwrap(), Some(5.92134456));
    }
}

#[test]
fn test_dos() {
    for run in both(FULL) {
        let dos = run.dos().unwrap().unwrap();
        assert_eq!(dos.energy, array![-5.0, 0.0, 5.0]);
        let channel = dos.channels.total().unwrap();
        assert_eq!(channel.total, array![0.0, 1.5, 0.5]);
        assert_eq!(channel.integrated, array![0.0, 0.75, 1.0]);

        let partial = channel.partial.as_ref().unwrap();
        assert_eq!(partial.shape(), &[2, 3, 9]);
        assert_eq!(partial[[0, 1, 0]], 0.02);
        assert_eq!(partial[[0, 2, 8]], 0.04);
        assert_eq!(partial[[1, 2, 0]], 0.07);
        assert_eq!(run.dos_specific().unwrap(), None);
    }
}

#[test]
fn test_projectors() {
    for run in both(FULL) {
        let projectors = run.projectors().unwrap().unwrap().total().unwrap();
        assert_eq!(projectors.shape(), &[2, 2, 1, 9]);
        assert_eq!(projectors[[0, 0, 0, 0]], 0.1);
        assert_eq!(projectors[[1, 0, 0, 0]], 0.2);
        assert_eq!(projectors[[0, 1, 0, 0]], 0.3);
        assert_eq!(projectors[[1, 1, 0, 8]], 0.09);
    }

    let options = ParserOptions::default().with_k_before_band(true);
    for run in both_with(FULL, options) {
        let projectors = run.projectors().unwrap().unwrap().total().unwrap();
        assert_eq!(projectors.shape(), &[2, 1, 2, 9]);
        assert_eq!(projectors[[0, 0, 1, 0]], 0.3);
    }
}

#[test]
fn test_dielectrics() {
    for run in both(FULL) {
        let density = run.dielectrics().unwrap().unwrap();
        assert_eq!(density.energy, array![0.0, 1.0]);
        let imag = density.imag.as_ref().unwrap();
        assert_eq!(imag.shape(), &[2, 6]);
        assert_eq!(imag[[1, 0]], 0.5);
        assert_eq!(density.real.as_ref().unwrap()[[0, 2]], 12.0);

        let current = run.dielectrics_current_current().unwrap().unwrap();
        assert_eq!(current.imag.as_ref().unwrap()[[1, 1]], 0.7);
        assert_eq!(current.real.as_ref().unwrap()[[1, 2]], 13.5);

        assert_eq!(run.epsilon().unwrap().unwrap()[[0, 0]], 11.9);
        assert_eq!(run.epsilon_ion().unwrap().unwrap()[[2, 2]], 0.3);
    }
}

#[test]
fn test_energies() {
    for run in both(FULL) {
        let report = run
            .energies(Status::All, &[EnergyKind::Free, EnergyKind::NoEntropy], true)
            .unwrap()
            .unwrap();
        let free = report.get(EnergyKind::Free).unwrap();
        assert_eq!(free.electronic, vec![-10.0, -10.5, -11.0]);
        assert_eq!(free.electronic_steps, vec![2, 1]);
        assert_eq!(free.finalized, vec![Some(-10.51), Some(-11.01)]);
        let no_entropy = report.get(EnergyKind::NoEntropy).unwrap();
        assert_eq!(no_entropy.finalized, vec![Some(-10.61), Some(-11.11)]);
        assert!(report.get(EnergyKind::Extrapolated).is_none());

        // Only the last electronic value of each step
        let report = run.energies(Status::Initial, &[], false).unwrap().unwrap();
        let extrapolated = report.get(EnergyKind::Extrapolated).unwrap();
        assert_eq!(extrapolated.electronic, vec![-10.55]);
        assert_eq!(extrapolated.electronic_steps, vec![1]);
        assert_eq!(extrapolated.finalized, vec![Some(-10.56)]);

        assert_eq!(run.final_energy(EnergyKind::Free).unwrap(), Some(-11.01));
    }
}

#[test]
fn test_energies_absent() {
    for run in both(RESPONSE) {
        assert_eq!(run.energies(Status::All, &[], true).unwrap(), None);
        assert_eq!(run.final_energy(EnergyKind::Free).unwrap(), None);
    }
}

#[test]
fn test_response_functions() {
    for run in both(RESPONSE) {
        let born = run.born().unwrap().unwrap();
        assert_eq!(born.shape(), &[1, 3, 3]);
        assert_eq!(born[[0, 2, 2]], 1.3);

        let hessian = run.hessian().unwrap().unwrap();
        assert_eq!(hessian.shape(), &[3, 3]);
        assert_eq!(hessian[[1, 1]], -2.0);

        let dynmat = run.dynmat().unwrap().unwrap();
        assert_eq!(dynmat.eigenvalues, array![-1.0, -2.0, -3.0]);
        assert_eq!(dynmat.eigenvectors[[2, 2]], 1.0);

        // No bands were written, and no parameters either
        assert_eq!(run.eigenvalues().unwrap(), None);
        assert_eq!(run.parameters().unwrap(), None);
    }
}

#[test]
fn test_spin_polarized_and_interpolated() {
    for run in both(&spin_document(true)) {
        let eigenvalues = run.eigenvalues().unwrap().unwrap();
        assert_eq!(eigenvalues.up().unwrap(), &array![[-3.0]]);
        assert_eq!(eigenvalues.down().unwrap(), &array![[-2.5]]);

        // Interpolated k-points take precedence over the velocity grid
        assert_eq!(run.kpoints_specific().unwrap().unwrap().nrows(), 2);
        assert_eq!(run.kpoint_weights_specific().unwrap().unwrap(), &array![0.5, 0.5]);
        let specific = run.eigenvalues_specific().unwrap().unwrap();
        assert_eq!(specific.up().unwrap(), &array![[-3.0, -1.0]]);
        assert_eq!(specific.down().unwrap(), &array![[-2.5, -0.5]]);

        let velocities = run.eigenvelocities().unwrap().unwrap();
        let down = velocities.down().unwrap();
        assert_eq!(down.shape(), &[1, 3, 4]);
        assert_eq!(down[[0, 2, 1]], 0.25);

        assert_eq!(run.dos().unwrap(), None);
        assert_eq!(run.fermi_level().unwrap(), None);
        let dos = run.dos_specific().unwrap().unwrap();
        assert_eq!(dos.fermi_level, Some(1.5));
        assert_eq!(dos.channels.down().unwrap().integrated, array![0.1, 0.8]);
        assert!(dos.channels.up().unwrap().partial.is_none());
    }
}

#[test]
fn test_velocity_kpoints_fill_specific_set() {
    for run in both(&spin_document(false)) {
        assert_eq!(run.kpoints_specific().unwrap().unwrap().nrows(), 3);
        assert_eq!(run.eigenvalues_specific().unwrap(), None);
    }
}

#[test]
fn test_overflow_is_contained() {
    let xml = FULL.replace("0.11100000", "**********");
    for run in both(&xml) {
        let err = run.forces(Status::Final).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert!(run.positions(Status::Final).unwrap().is_some());
        assert!(run.eigenvalues().unwrap().is_some());
    }
}

#[test]
fn test_partial_dos_count_mismatch() {
    let xml = without_lines_containing(FULL, "0.0700");
    for run in both(&xml) {
        let err = run.dos().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CountMismatch);
        assert_eq!(run.fermi_level().unwrap_err().kind(), ErrorKind::CountMismatch);
        assert!(run.eigenvalues().unwrap().is_some());
    }
}

#[test]
fn test_eigenvalue_count_mismatch() {
    let xml = FULL.replacen("       <r>    2.0000    0.0000 </r>\n", "", 1);
    for run in both(&xml) {
        assert_eq!(run.eigenvalues().unwrap_err().kind(), ErrorKind::CountMismatch);
        // The copy inside the projections is not band data
        assert!(run.projectors().unwrap().is_some());
    }
}

#[test]
fn test_missing_prerequisite() {
    let xml = without_lines_containing(FULL, "NBANDS");
    for run in both(&xml) {
        let err = run.eigenvalues().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingPrerequisite);
        assert_eq!(run.projectors().unwrap_err().kind(), ErrorKind::MissingPrerequisite);
        assert!(run.dos().unwrap().is_some());
    }
}

#[test]
fn test_multiple_fermi_levels() {
    let xml = FULL.replace(
        "<i name=\"efermi\">      5.92134456 </i>",
        "<i name=\"efermi\">      5.92134456 </i><i name=\"efermi\"> 1.0 </i>",
    );
    for run in both(&xml) {
        assert_eq!(run.dos().unwrap_err().kind(), ErrorKind::MultipleEntries);
    }
}

#[test]
fn test_unknown_species_is_fatal() {
    let xml = FULL.replace("<c>Si</c>", "<c>Qq</c>");
    for options in [ParserOptions::default(), ParserOptions::default().with_force_streaming(true)] {
        let err = Vasprun::from_str(&xml, options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvableSpecies);
    }
}

#[test]
fn test_truncated_document_is_recovered() {
    let cut = &FULL[..FULL.find("<dos>").unwrap()];
    let run = parse(cut, ParserOptions::default().with_force_streaming(true));
    assert!(run.truncated());
    assert_eq!(run.strategy(), Strategy::WholeDocument);
    assert_eq!(run.species().unwrap().len(), 2);
    assert!(run.eigenvalues().unwrap().is_some());
    assert_eq!(run.dos().unwrap(), None);
    let last = run.unitcell(Status::Final).unwrap().unwrap().single().unwrap();
    assert_eq!(last[[0, 0]], 5.1);
}

#[test]
fn test_truncation_at_every_line() {
    let lines: Vec<&str> = FULL.lines().collect();
    let atominfo_end = lines.iter().position(|l| l.contains("</atominfo>")).unwrap();
    let first_step_end = lines.iter().position(|l| l.contains("</calculation>")).unwrap();
    for keep in 2..lines.len() {
        let cut = lines[..keep].join("\n");
        let run = Vasprun::from_str(&cut, ParserOptions::default()).unwrap();
        assert!(run.truncated());
        if keep > atominfo_end {
            assert_eq!(run.species().unwrap().len(), 2);
        }
        // A completed ionic step survives whatever follows it
        if keep > first_step_end {
            let forces = run.forces(Status::All).unwrap().unwrap().all().unwrap();
            assert_eq!(forces[&1], array![[0.111, 0.0, 0.0], [-0.111, 0.0, 0.0]]);
            let positions = run.positions(Status::Initial).unwrap().unwrap().single().unwrap();
            assert_eq!(positions[[1, 0]], 0.25);
            let cell = run.unitcell(Status::Initial).unwrap().unwrap().single().unwrap();
            assert_eq!(cell[[0, 0]], 5.0);
        }
    }
}

#[test]
fn test_cut_inside_forces_keeps_earlier_steps() {
    let second = FULL.match_indices("<varray name=\"forces\" >").nth(1).unwrap().0;
    let cut = second + FULL[second..].find("</v>").unwrap() + 4;
    let run = parse(&FULL[..cut], ParserOptions::default());
    assert!(run.truncated());
    assert_eq!(run.ionic_steps(), 2);

    // Step two has its structure but no forces
    let positions = run.positions(Status::All).unwrap().unwrap().all().unwrap();
    assert_eq!(positions.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    let forces = run.forces(Status::All).unwrap().unwrap().all().unwrap();
    assert_eq!(forces.keys().copied().collect::<Vec<_>>(), vec![1]);
    let initial = run.forces(Status::Initial).unwrap().unwrap().single().unwrap();
    assert_eq!(initial[[0, 0]], 0.111);
}

#[test]
fn test_hessian_row_count_mismatch() {
    let xml = RESPONSE.replacen(
        "    <v>       0.00000000      -2.00000000       0.00000000 </v>\n",
        "",
        1,
    );
    assert_ne!(xml, RESPONSE);
    for run in both(&xml) {
        let err = run.hessian().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CountMismatch);
        // Other sections are unaffected
        assert!(run.dynmat().unwrap().is_some());
        assert_eq!(run.born().unwrap().unwrap().shape(), &[1, 3, 3]);
    }
}

#[test]
fn test_dynmat_eigenvector_row_count_mismatch() {
    let xml = RESPONSE.replacen(
        "    <v>       0.00000000       0.00000000       1.00000000 </v>\n",
        "",
        1,
    );
    for run in both(&xml) {
        let err = run.dynmat().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CountMismatch);
        assert_eq!(run.hessian().unwrap().unwrap().shape(), &[3, 3]);
    }
}

#[test]
fn test_parameters_are_read_from_their_separator() {
    let xml = FULL.replace(
        "   <i type=\"string\" name=\"SYSTEM\">unknown system</i>\n",
        "   <i type=\"int\" name=\"NBANDS\">     99</i>\n   <i name=\"SIGMA\">      9.00000000</i>\n   <i type=\"string\" name=\"SYSTEM\">unknown system</i>\n",
    );
    assert_ne!(xml, FULL);
    for run in both(&xml) {
        let params = run.parameters().unwrap().unwrap();
        assert_eq!(params.nbands, Some(2));
        assert_eq!(params.sigma, Some(0.05));
        assert_eq!(params.system.as_deref(), Some("unknown system"));
    }
}

#[test]
fn test_initial_and_final_only() {
    let options = ParserOptions::default().with_extract_all(false);
    for run in both_with(FULL, options) {
        let map = run.unitcell(Status::All).unwrap().unwrap().all().unwrap();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
