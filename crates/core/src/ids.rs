use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!("invalid {} '{value}': {error}", $label))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Stable subject (user) identifier used as the assignment store foreign key.
    SubjectId,
    "subject id"
);

uuid_identifier!(
    /// Role identifier.
    RoleId,
    "role id"
);

uuid_identifier!(
    /// Department identifier.
    DepartmentId,
    "department id"
);

uuid_identifier!(
    /// User group identifier.
    GroupId,
    "group id"
);

uuid_identifier!(
    /// Training item identifier (module or document).
    ItemId,
    "item id"
);

uuid_identifier!(
    /// Assignment row identifier.
    AssignmentId,
    "assignment id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{RoleId, SubjectId};
    use crate::AppError;

    #[test]
    fn subject_id_parses_display_value() {
        let subject_id = SubjectId::new();
        let parsed = SubjectId::from_str(subject_id.to_string().as_str());

        assert!(matches!(parsed, Ok(value) if value == subject_id));
    }

    #[test]
    fn malformed_role_id_is_validation_error() {
        let parsed = RoleId::from_str("not-a-uuid");

        assert!(matches!(parsed, Err(AppError::Validation(message)) if message.contains("role id")));
    }

    #[test]
    fn identifiers_serialize_as_plain_uuid_strings() {
        let subject_id = SubjectId::new();
        let encoded = serde_json::to_string(&subject_id).unwrap_or_default();

        assert_eq!(encoded, format!("\"{subject_id}\""));
    }
}
