//! `(Namespace, local name)` pairs and the string parser (spec.md §4.1).

use std::fmt;

use crate::namespace::Namespace;

/// A qualified name. `local` is `None` for the "any name" case used in
/// lookups (spec.md §3 "the null local name is reserved for the any-name
/// case").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub ns: Namespace,
    pub local: Option<String>,
}

impl QName {
    pub fn new(ns: Namespace, local: impl Into<String>) -> QName {
        QName {
            ns,
            local: Some(local.into()),
        }
    }

    /// The "any" QName: any namespace, no local name.
    pub fn any() -> QName {
        QName {
            ns: Namespace::Any,
            local: None,
        }
    }

    pub fn local_str(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// Parse a qualified-name string per spec.md §4.1's five ordered rules.
    /// `input = None` maps to rule 1 ("null input → default any QName").
    pub fn parse(input: Option<&str>) -> QName {
        // Rule 1: null input.
        let s = match input {
            None => return QName::any(),
            Some(s) => s,
        };

        // Rule 2: empty string / bare "*".
        if s.is_empty() {
            return QName::new(Namespace::public(), "");
        }
        if s == "*" {
            return QName {
                ns: Namespace::Any,
                local: Some("*".to_string()),
            };
        }

        // Rule 3: "::" splits at the LAST occurrence.
        if let Some(split_at) = s.rfind("::") {
            let (left, right) = (&s[..split_at], &s[split_at + 2..]);
            let ns = if left == "*" {
                Namespace::Any
            } else {
                Namespace::package(left)
            };
            return QName::new(ns, right);
        }

        // Rule 4: last '.' not immediately followed by '<' (Vector.<int>
        // stays a single local name under package "").
        if let Some(dot_at) = last_package_dot(s) {
            let (left, right) = (&s[..dot_at], &s[dot_at + 1..]);
            return QName::new(Namespace::package(left), right);
        }

        // Rule 5: public namespace, whole string as local name.
        QName::new(Namespace::public(), s)
    }
}

/// Find the last `.` in `s` that is not immediately followed by `<`.
fn last_package_dot(s: &str) -> Option<usize> {
    s.char_indices()
        .rev()
        .find(|&(idx, ch)| ch == '.' && s[idx + 1..].chars().next() != Some('<'))
        .map(|(idx, _)| idx)
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.local.as_deref().unwrap_or("*");
        match &self.ns {
            Namespace::Any => write!(f, "{local}"),
            Namespace::Namespace(uri) if uri.is_empty() => write!(f, "{local}"),
            Namespace::Namespace(uri) => write!(f, "{uri}::{local}"),
            other => write!(f, "{other}::{local}"),
        }
    }
}
