//! Folder entries reported by LIST

use serde::Serialize;
use std::fmt;

/// A folder as reported by the server's LIST response.
///
/// # Examples
///
/// ```
/// use mailscope::FolderInfo;
///
/// let work = FolderInfo::new("Work", Some("/"));
/// assert_eq!(work.child_pattern("%"), "Work/%");
/// assert_eq!(work.leaf_name(), "Work");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderInfo {
    /// Full hierarchical name, e.g. `Work/Reports`.
    pub name: String,
    /// Hierarchy separator, `None` for flat namespaces.
    pub delimiter: Option<String>,
    /// False for `\Noselect` placeholders that hold no messages.
    pub selectable: bool,
}

impl FolderInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, delimiter: Option<&str>) -> Self {
        Self {
            name: name.into(),
            delimiter: delimiter.map(str::to_string),
            selectable: true,
        }
    }

    /// Build from an async-imap LIST entry.
    #[must_use]
    pub fn from_name(name: &async_imap::types::Name) -> Self {
        let selectable = !name
            .attributes()
            .iter()
            .any(|a| matches!(a, async_imap::types::NameAttribute::NoSelect));
        Self {
            name: name.name().to_string(),
            delimiter: name.delimiter().map(str::to_string),
            selectable,
        }
    }

    /// LIST pattern selecting this folder's children.
    ///
    /// Without a delimiter the namespace is flat and the folder has no
    /// children, so the pattern is the folder name itself.
    #[must_use]
    pub fn child_pattern(&self, pattern: &str) -> String {
        match &self.delimiter {
            Some(delim) => format!("{}{delim}{pattern}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether `other` lies below this folder in the hierarchy.
    ///
    /// LIST patterns are built from the raw name, so a `%` or `*` in
    /// it can match folders outside the subtree; this filters them out.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        match &self.delimiter {
            Some(delim) if !delim.is_empty() => other
                .name
                .strip_prefix(self.name.as_str())
                .and_then(|rest| rest.strip_prefix(delim.as_str()))
                .is_some_and(|rest| !rest.is_empty()),
            _ => false,
        }
    }

    /// Last path component of the name.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        match &self.delimiter {
            Some(delim) if !delim.is_empty() => {
                self.name.rsplit(delim.as_str()).next().unwrap_or(&self.name)
            }
            _ => &self.name,
        }
    }

    /// Nesting depth; top-level folders are 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match &self.delimiter {
            Some(delim) if !delim.is_empty() => self.name.matches(delim.as_str()).count(),
            _ => 0,
        }
    }
}

impl fmt::Display for FolderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
