//! Edit records of an augmented diff.

use serde::Serialize;

use crate::ObjectSnapshot;

/// Kind of change applied to an object or to one of its categories.
///
/// # Examples
/// ```
/// use roadchanges_core::ChangeType;
///
/// assert_eq!(ChangeType::Modify.to_string(), "modify");
/// assert_eq!("delete".parse::<ChangeType>(), Ok(ChangeType::Delete));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Something appeared.
    Create,
    /// Something changed value.
    Modify,
    /// Something disappeared.
    Delete,
}

impl ChangeType {
    /// Return the change type as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "modify" => Ok(Self::Modify),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("unknown action type '{s}'")),
        }
    }
}

/// One edit within an augmented diff.
///
/// A `create` carries only the new snapshot; `modify` and `delete` carry both
/// sides. The constructors are the only way to build an action, so the other
/// shapes cannot occur.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    change_type: ChangeType,
    old: Option<ObjectSnapshot>,
    new: ObjectSnapshot,
}

impl Action {
    /// An object that did not exist before this diff.
    #[must_use]
    pub const fn create(new: ObjectSnapshot) -> Self {
        Self {
            change_type: ChangeType::Create,
            old: None,
            new,
        }
    }

    /// An object whose state changed.
    #[must_use]
    pub const fn modify(old: ObjectSnapshot, new: ObjectSnapshot) -> Self {
        Self {
            change_type: ChangeType::Modify,
            old: Some(old),
            new,
        }
    }

    /// An object removed by this diff.
    #[must_use]
    pub const fn delete(old: ObjectSnapshot, new: ObjectSnapshot) -> Self {
        Self {
            change_type: ChangeType::Delete,
            old: Some(old),
            new,
        }
    }

    /// Type of the whole-object change.
    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Snapshot after the edit (the only snapshot of a `create`).
    #[must_use]
    pub const fn new_snapshot(&self) -> &ObjectSnapshot {
        &self.new
    }

    /// Snapshot before the edit; `None` for `create`.
    #[must_use]
    pub const fn old_snapshot(&self) -> Option<&ObjectSnapshot> {
        self.old.as_ref()
    }
}
