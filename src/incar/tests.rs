use super::*;
use proptest::prelude::*;

const INCAR: &str = r#"# relaxation of bulk Si
SYSTEM = Si  bulk ; ENCUT = 400
PREC = Accurate   ! precision mode
ediff = 1E-6
EDIFFG = -0.01d0
LWAVE = .FALSE.
LCHARG = F
MAGMOM = 2*1.0 0.5
KPOINT_BSE = -1 0 0 0
RWIGS = 1.1 1.2

  # trailing comment
"#;

#[test]
fn test_parse_value_types() {
    let incar: Incar = INCAR.parse().unwrap();

    assert_eq!(incar.header.as_deref(), Some("relaxation of bulk Si"));
    assert_eq!(incar.len(), 10);
    assert_eq!(incar.get("system"), Some(&IncarValue::Str("Si  bulk".to_string())));
    assert_eq!(incar.get("ENCUT"), Some(&IncarValue::Int(400)));
    assert_eq!(incar.get("prec").and_then(IncarValue::as_str), Some("Accurate"));
    assert_eq!(incar.comment("prec"), Some("precision mode"));
    assert_eq!(incar.get("ediff"), Some(&IncarValue::Float(1e-6)));
    assert_eq!(incar.get("ediffg"), Some(&IncarValue::Float(-0.01)));
    assert_eq!(incar.get("lwave").and_then(IncarValue::as_bool), Some(false));
    assert_eq!(incar.get("lcharg").and_then(IncarValue::as_bool), Some(false));
    assert_eq!(incar.get("magmom"), Some(&IncarValue::Str("2*1.0 0.5".to_string())));
    assert_eq!(incar.get("kpoint_bse"), Some(&IncarValue::from(vec![-1, 0, 0, 0])));
    assert_eq!(incar.get("rwigs"), Some(&IncarValue::from(vec![1.1, 1.2])));
}

#[test]
fn test_render_sorted_upper_case() {
    let incar: Incar = "ismear = 0\nLorbit = 11 # projections\nalgo = Fast\nlreal = .t.".parse().unwrap();
    assert_eq!(
        incar.to_string(),
        "ALGO = Fast\nISMEAR = 0\nLORBIT = 11 # projections\nLREAL = .TRUE.\n"
    );
}

#[test]
fn test_modify_and_remove() {
    let mut incar = Incar::new();
    assert_eq!(incar.set("ENCUT", 300), None);
    assert_eq!(incar.set("encut", 520), Some(IncarValue::Int(300)));
    incar.set_with_comment("nbands", 24, " bands ");
    incar.set("ldau", true);

    assert!(incar.contains("NBANDS"));
    assert_eq!(incar.comment("NBANDS"), Some("bands"));
    assert_eq!(incar.remove("LDAU"), Some(IncarValue::Bool(true)));
    assert_eq!(incar.remove("ldau"), None);
    assert_eq!(incar.to_string(), "ENCUT = 520\nNBANDS = 24 # bands\n");
}

#[test]
fn test_duplicate_tag_keeps_last() {
    let incar: Incar = "ISPIN = 1\nispin = 2".parse().unwrap();
    assert_eq!(incar.len(), 1);
    assert_eq!(incar.get("ISPIN"), Some(&IncarValue::Int(2)));
}

#[test]
fn test_malformed_directives() {
    assert!(matches!(
        "ENCUT = 400 = 500".parse::<Incar>(),
        Err(IncarError::MultipleEquals { line: 1, .. })
    ));
    assert!(matches!(
        "ENCUT = 400\nISMEAR 0".parse::<Incar>(),
        Err(IncarError::MissingEquals { line: 2, .. })
    ));
    assert!(matches!("= 4".parse::<Incar>(), Err(IncarError::EmptyTag { line: 1 })));
    assert!(matches!("NSW =".parse::<Incar>(), Err(IncarError::EmptyValue(tag)) if tag == "NSW"));
}

#[test]
fn test_mixed_list_is_rejected() {
    let err = "LDAUL = 2 -1 1.5".parse::<Incar>().unwrap_err();
    assert!(matches!(err, IncarError::MixedTypes(ref tag) if tag == "LDAUL"));
}

#[test]
fn test_words_that_look_numeric_stay_strings() {
    assert_eq!(IncarValue::parse("gga", "PE").unwrap(), IncarValue::Str("PE".to_string()));
    assert_eq!(IncarValue::parse("algo", "nan").unwrap(), IncarValue::Str("nan".to_string()));
    assert_eq!(IncarValue::parse("x", "inf").unwrap(), IncarValue::Str("inf".to_string()));
    assert_eq!(IncarValue::parse("x", "1.5D2").unwrap(), IncarValue::Float(150.0));
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("INCAR");
    let incar: Incar = INCAR.parse().unwrap();
    incar.write_to(&path).unwrap();
    assert_eq!(Incar::from_path(&path).unwrap(), incar);
}

fn scalar() -> impl Strategy<Value = IncarValue> {
    prop_oneof![
        any::<bool>().prop_map(IncarValue::Bool),
        any::<i64>().prop_map(IncarValue::Int),
        (-1.0e12f64..1.0e12).prop_map(IncarValue::Float),
        "[A-Z][a-z_]{2,8}"
            .prop_filter("not a boolean", |s| parse_bool(s).is_none())
            .prop_map(IncarValue::Str),
    ]
}

fn value() -> impl Strategy<Value = IncarValue> {
    prop_oneof![
        scalar(),
        prop::collection::vec(any::<i64>(), 2..6).prop_map(IncarValue::from),
        prop::collection::vec(-1.0e3f64..1.0e3, 2..6).prop_map(IncarValue::from),
        prop::collection::vec(any::<bool>(), 2..4).prop_map(IncarValue::from),
    ]
}

proptest! {
    /// Rendering and reading back gives the same tags, values and comments
    #[test]
    fn test_render_parse_roundtrip(
        entries in prop::collection::btree_map("[a-l][a-z_]{2,7}", (value(), prop::option::of("[a-z]{1,10}")), 0..12),
        header in prop::option::of("[A-Za-z][A-Za-z ]{0,20}[a-z]"),
    ) {
        let mut incar = Incar::new();
        incar.header = header;
        for (tag, (value, comment)) in entries {
            match comment {
                Some(comment) => incar.set_with_comment(&tag, value, &comment),
                None => incar.set(&tag, value),
            };
        }

        let reparsed: Incar = incar.to_string().parse().unwrap();
        prop_assert_eq!(&reparsed, &incar);
        prop_assert_eq!(reparsed.to_string(), incar.to_string());
    }
}
