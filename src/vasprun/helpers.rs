use quick_xml::escape::unescape;
use quick_xml::events::BytesStart;

use super::VasprunError;

/// All attributes of an element in document order, entities resolved
pub(super) fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, VasprunError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| VasprunError::Xml(quick_xml::Error::from(e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|e| VasprunError::Xml(quick_xml::Error::from(e)))?;
        out.push((key, value.into_owned()));
    }
    Ok(out)
}

/// Tag name of an element
pub(super) fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_unescaped() {
        let e = BytesStart::from_content(r#"i name="SYSTEM" comment="a &amp; b""#, 1);
        assert_eq!(tag_name(&e), "i");
        let attrs = attributes(&e).unwrap();
        assert_eq!(
            attrs,
            vec![
                ("name".to_string(), "SYSTEM".to_string()),
                ("comment".to_string(), "a & b".to_string()),
            ]
        );
    }
}
