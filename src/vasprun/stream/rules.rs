//! Section recognition for the streaming strategy.
//!
//! An opening tag starts a section when a rule matches its tag, its
//! attributes and the sections already open around it. Rules are tried in
//! order and the first match wins.

/// Semantic sections tracked while streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Section {
    Generator,
    Version,
    Parameters,
    Atominfo,
    Species,
    Kpoints,
    KpointList,
    KpointWeights,
    Divisions,
    Calculation,
    Structure,
    Basis,
    Positions,
    Forces,
    Stress,
    Scstep,
    Energy,
    Eigenvalues,
    SpecificEigenvalues,
    Eigenvelocities,
    Dos,
    DosSpecific,
    Efermi,
    DosTotal,
    DosPartial,
    Dielectric,
    DielectricImag,
    DielectricReal,
    Epsilon,
    EpsilonIon,
    Projected,
    /// Band energies repeated inside the projections, skipped
    ProjectedEigenvalues,
    Born,
    Dynmat,
    Hessian,
    DynmatEigenvalues,
    DynmatEigenvectors,
}

impl Section {
    /// Whether value text inside this section is kept
    pub fn collects(self) -> bool {
        !matches!(
            self,
            Section::Generator
                | Section::Atominfo
                | Section::Kpoints
                | Section::Calculation
                | Section::Structure
                | Section::Scstep
                | Section::SpecificEigenvalues
                | Section::Eigenvelocities
                | Section::Dos
                | Section::DosSpecific
                | Section::Dielectric
                | Section::ProjectedEigenvalues
                | Section::Dynmat
        )
    }
}

/// Attribute predicate of a rule
#[derive(Debug, Clone, Copy)]
pub(crate) enum AttrMatch {
    Any,
    Equals(&'static str, &'static str),
    Absent(&'static str),
}

impl AttrMatch {
    fn matches(&self, attributes: &[(String, String)]) -> bool {
        let lookup = |key: &str| attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        match self {
            AttrMatch::Any => true,
            AttrMatch::Equals(key, value) => lookup(key) == Some(*value),
            AttrMatch::Absent(key) => lookup(key).is_none(),
        }
    }
}

/// Enclosing sections a rule requires or forbids
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    /// At least one of these must be open, empty means anywhere
    pub inside: &'static [Section],
    /// None of these may be open
    pub outside: &'static [Section],
}

impl Context {
    const ANYWHERE: Context = Context {
        inside: &[],
        outside: &[],
    };

    const fn inside(inside: &'static [Section]) -> Context {
        Context { inside, outside: &[] }
    }

    fn matches(&self, open: &[Section]) -> bool {
        (self.inside.is_empty() || self.inside.iter().any(|s| open.contains(s)))
            && !self.outside.iter().any(|s| open.contains(s))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Rule {
    pub tag: &'static str,
    pub attr: AttrMatch,
    pub within: Context,
    pub section: Section,
}

const fn rule(tag: &'static str, attr: AttrMatch, within: Context, section: Section) -> Rule {
    Rule {
        tag,
        attr,
        within,
        section,
    }
}

use AttrMatch::{Absent, Any, Equals};
use Section::*;

const IN_CALCULATION: Context = Context::inside(&[Calculation]);

pub(crate) static RULES: &[Rule] = &[
    rule("generator", Any, Context::ANYWHERE, Generator),
    rule("i", Equals("name", "version"), Context::inside(&[Generator]), Version),
    rule("parameters", Any, Context::ANYWHERE, Parameters),
    rule("atominfo", Any, Context::ANYWHERE, Atominfo),
    rule("array", Equals("name", "atoms"), Context::inside(&[Atominfo]), Species),
    rule("kpoints", Any, Context::ANYWHERE, Kpoints),
    rule("varray", Equals("name", "kpointlist"), Context::inside(&[Kpoints]), KpointList),
    rule("varray", Equals("name", "weights"), Context::inside(&[Kpoints]), KpointWeights),
    rule("v", Equals("name", "divisions"), Context::inside(&[Kpoints]), Divisions),
    rule("calculation", Any, Context::ANYWHERE, Calculation),
    rule("structure", Any, IN_CALCULATION, Structure),
    rule("varray", Equals("name", "basis"), Context::inside(&[Structure]), Basis),
    rule("varray", Equals("name", "positions"), Context::inside(&[Structure]), Positions),
    rule("varray", Equals("name", "forces"), IN_CALCULATION, Forces),
    rule("varray", Equals("name", "stress"), IN_CALCULATION, Stress),
    rule("scstep", Any, IN_CALCULATION, Scstep),
    rule("energy", Any, IN_CALCULATION, Energy),
    rule("eigenvalues", Any, Context::inside(&[Projected]), ProjectedEigenvalues),
    rule(
        "eigenvalues",
        Equals("comment", "interpolated"),
        Context {
            inside: &[Calculation],
            outside: &[SpecificEigenvalues, Eigenvelocities],
        },
        SpecificEigenvalues,
    ),
    rule("eigenvelocities", Any, IN_CALCULATION, Eigenvelocities),
    rule("eigenvalues", Any, IN_CALCULATION, Eigenvalues),
    rule("dos", Absent("comment"), IN_CALCULATION, Dos),
    rule("dos", Equals("comment", "interpolated"), IN_CALCULATION, DosSpecific),
    rule("i", Equals("name", "efermi"), Context::inside(&[Dos, DosSpecific]), Efermi),
    rule("total", Any, Context::inside(&[Dos, DosSpecific]), DosTotal),
    rule("partial", Any, Context::inside(&[Dos, DosSpecific]), DosPartial),
    rule("dielectricfunction", Any, IN_CALCULATION, Dielectric),
    rule("imag", Any, Context::inside(&[Dielectric]), DielectricImag),
    rule("real", Any, Context::inside(&[Dielectric]), DielectricReal),
    rule("varray", Equals("name", "epsilon"), IN_CALCULATION, Epsilon),
    rule("varray", Equals("name", "epsilon_ion"), IN_CALCULATION, EpsilonIon),
    rule("projected", Any, IN_CALCULATION, Projected),
    rule("array", Equals("name", "born_charges"), IN_CALCULATION, Born),
    rule("dynmat", Any, IN_CALCULATION, Dynmat),
    rule("varray", Equals("name", "hessian"), Context::inside(&[Dynmat]), Hessian),
    rule("v", Equals("name", "eigenvalues"), Context::inside(&[Dynmat]), DynmatEigenvalues),
    rule("varray", Equals("name", "eigenvectors"), Context::inside(&[Dynmat]), DynmatEigenvectors),
];

/// Section started by an opening tag, given the sections already open
pub(crate) fn classify(tag: &str, attributes: &[(String, String)], open: &[Section]) -> Option<Section> {
    RULES
        .iter()
        .find(|r| r.tag == tag && r.attr.matches(attributes) && r.within.matches(open))
        .map(|r| r.section)
}
