use std::fmt;

use crate::schema::{Attrs, MarkType};

/// A mark (emphasis, link, ...) attached to inline content.
///
/// Mark sets are plain `Vec<Mark>`s kept sorted by [`MarkType::rank`]; the associated
/// functions here maintain that order.
#[derive(Clone, PartialEq, Eq)]
pub struct Mark {
    ty: MarkType,
    attrs: Attrs,
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty.name())?;
        if !self.attrs.is_empty() {
            let attrs: Vec<String> = self
                .attrs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", attrs.join(" "))?;
        }
        Ok(())
    }
}

impl Mark {
    pub(crate) fn new(ty: MarkType, attrs: Attrs) -> Self {
        Self { ty, attrs }
    }

    /// The mark's type.
    pub fn mark_type(&self) -> &MarkType {
        &self.ty
    }

    /// The mark's attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to `set`, replacing marks it excludes. Returns `set` unchanged when the
    /// mark is already present or is itself excluded by a member.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.ty.excludes(&other.ty) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.ty.excludes(&self.ty) {
                return set.to_vec();
            } else {
                if !placed && other.ty.rank() > self.ty.rank() {
                    copy.get_or_insert_with(|| set[..i].to_vec())
                        .push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    /// `set` without this exact mark.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    /// Whether this exact mark is in `set`.
    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    /// Whether two sets hold the same marks.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    /// Build a well-formed set out of arbitrary marks.
    pub fn set_from(marks: Vec<Mark>) -> Vec<Mark> {
        if marks.len() < 2 {
            return marks;
        }
        let mut set = Vec::with_capacity(marks.len());
        for mark in &marks {
            set = mark.add_to_set(&set);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrSpec, AttrValue, MarkSpec, NodeSpec, Schema, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new().inline())
                .mark("link", MarkSpec::new().attr("href", AttrSpec::required()))
                .mark("em", MarkSpec::new())
                .mark("strong", MarkSpec::new())
                .mark("code", MarkSpec::new().excludes("_")),
        )
        .unwrap()
    }

    fn link(schema: &Schema, href: &str) -> Mark {
        let mut attrs = Attrs::new();
        attrs.insert("href".into(), AttrValue::from(href));
        schema.mark("link", Some(&attrs)).unwrap()
    }

    #[test]
    fn test_add_keeps_rank_order() {
        let s = schema();
        let em = s.mark("em", None).unwrap();
        let strong = s.mark("strong", None).unwrap();
        let set = strong.add_to_set(&[]);
        let set = em.add_to_set(&set);
        assert_eq!(set, vec![em.clone(), strong.clone()]);
        assert_eq!(em.add_to_set(&set), set);
    }

    #[test]
    fn test_same_type_replaces() {
        let s = schema();
        let a = link(&s, "a");
        let b = link(&s, "b");
        assert_eq!(b.add_to_set(&[a]), vec![b.clone()]);
    }

    #[test]
    fn test_excluding_mark() {
        let s = schema();
        let em = s.mark("em", None).unwrap();
        let code = s.mark("code", None).unwrap();
        assert_eq!(code.add_to_set(&[em.clone()]), vec![code.clone()]);
        assert_eq!(em.add_to_set(&[code.clone()]), vec![code]);
    }

    #[test]
    fn test_missing_attr() {
        let s = schema();
        assert!(s.mark("link", None).is_err());
        assert!(Mark::same_set(&[], &[]));
    }
}
