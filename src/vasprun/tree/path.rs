//! Path queries against the document tree.
//!
//! A path is a `/` separated list of steps. Each step is a tag name followed
//! by optional attribute predicates:
//!
//! * `varray[name=forces]` the attribute equals the value
//! * `dos[comment]` the attribute is present
//! * `dos[!comment]` the attribute is absent
//!
//! A leading `.//` lets the first step match at any depth below the context
//! element, otherwise every step matches direct children.

use super::Element;

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Equals(String, String),
    Present(String),
    Absent(String),
}

impl Predicate {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(attr) = raw.strip_prefix('!') {
            return Predicate::Absent(attr.trim().to_string());
        }
        match raw.split_once('=') {
            Some((attr, value)) => {
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                Predicate::Equals(attr.trim().trim_start_matches('@').to_string(), value.to_string())
            }
            None => Predicate::Present(raw.trim_start_matches('@').to_string()),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            Predicate::Equals(attr, value) => element.attr(attr) == Some(value.as_str()),
            Predicate::Present(attr) => element.attr(attr).is_some(),
            Predicate::Absent(attr) => element.attr(attr).is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    tag: String,
    predicates: Vec<Predicate>,
}

impl Step {
    fn parse(raw: &str) -> Self {
        let (tag, mut rest) = match raw.find('[') {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        };
        let mut predicates = Vec::new();
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']') else {
                break;
            };
            predicates.push(Predicate::parse(&rest[open + 1..open + close]));
            rest = &rest[open + close + 1..];
        }
        Self {
            tag: tag.trim().to_string(),
            predicates,
        }
    }

    fn matches(&self, element: &Element) -> bool {
        (self.tag == "*" || element.name == self.tag) && self.predicates.iter().all(|p| p.matches(element))
    }
}

/// A parsed path query
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    descendant: bool,
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(path: &str) -> Self {
        let (descendant, body) = match path.strip_prefix(".//") {
            Some(rest) => (true, rest),
            None => (false, path.trim_start_matches("./")),
        };

        // Split on '/' outside of predicates
        let mut steps = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in body.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '/' if depth == 0 => {
                    steps.push(Step::parse(&body[start..i]));
                    start = i + 1;
                }
                _ => {}
            }
        }
        if start < body.len() {
            steps.push(Step::parse(&body[start..]));
        }
        Self { descendant, steps }
    }

    /// All matches below `context`, in document order
    pub fn find_all<'a>(&self, context: &'a Element) -> Vec<&'a Element> {
        let Some((first, rest)) = self.steps.split_first() else {
            return Vec::new();
        };
        let mut current = Vec::new();
        if self.descendant {
            collect_descendants(context, first, &mut current);
        } else {
            current.extend(context.children.iter().filter(|c| first.matches(c)));
        }
        for step in rest {
            current = current
                .into_iter()
                .flat_map(move |e| e.children.iter().filter(move |c| step.matches(c)))
                .collect();
        }
        current
    }

    /// First match below `context`
    pub fn find<'a>(&self, context: &'a Element) -> Option<&'a Element> {
        self.find_all(context).into_iter().next()
    }
}

fn collect_descendants<'a>(element: &'a Element, step: &Step, out: &mut Vec<&'a Element>) {
    for child in &element.children {
        if step.matches(child) {
            out.push(child);
        }
        collect_descendants(child, step, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, attrs: &[(&str, &str)], text: &str) -> Element {
        Element {
            name: name.to_string(),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            text: text.to_string(),
            children: Vec::new(),
        }
    }

    fn node(name: &str, attrs: &[(&str, &str)], children: Vec<Element>) -> Element {
        Element {
            children,
            ..leaf(name, attrs, "")
        }
    }

    fn sample() -> Element {
        node(
            "modeling",
            &[],
            vec![node(
                "calculation",
                &[],
                vec![
                    node("dos", &[], vec![leaf("i", &[("name", "efermi")], "1.0")]),
                    node(
                        "dos",
                        &[("comment", "interpolated")],
                        vec![leaf("i", &[("name", "efermi")], "2.0")],
                    ),
                ],
            )],
        )
    }

    #[test]
    fn test_child_and_descendant_paths() {
        let root = sample();
        assert_eq!(Path::parse("calculation/dos").find_all(&root).len(), 2);
        assert_eq!(Path::parse("dos").find_all(&root).len(), 0);
        assert_eq!(Path::parse(".//dos").find_all(&root).len(), 2);
    }

    #[test]
    fn test_predicates() {
        let root = sample();
        let regular = Path::parse(".//calculation/dos[!comment]/i[name=efermi]").find(&root).unwrap();
        assert_eq!(regular.text, "1.0");
        let specific = Path::parse(r#"calculation/dos[comment="interpolated"]/i[name=efermi]"#)
            .find(&root)
            .unwrap();
        assert_eq!(specific.text, "2.0");
        assert_eq!(Path::parse("calculation/dos[comment]").find_all(&root).len(), 1);
    }

    #[test]
    fn test_predicate_value_with_space() {
        let root = node(
            "set",
            &[],
            vec![node("set", &[("comment", "spin 2")], vec![leaf("r", &[], "1 2")])],
        );
        let rows = Path::parse("set[comment=spin 2]/r").find_all(&root);
        assert_eq!(rows.len(), 1);
    }
}
