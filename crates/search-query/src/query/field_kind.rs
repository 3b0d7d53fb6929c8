//! Static classification of predicate field names.

/// How a predicate field is normalized, compiled and explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Date fields hold a date range or a relative date.
    Date,
    /// Copied verbatim; never coerced to match options.
    PassThrough,
    /// Everything else, including unknown fields.
    Match,
}

impl FieldKind {
    pub fn of(field: &str) -> Self {
        match field {
            "created" | "modified" | "lastlogin" | "startDate" | "endDate" => FieldKind::Date,
            "term" | "bbox" | "name" | "searchUserAccess" | "searchUserName" | "categoryFilter"
            | "isopendata" | "isviewonly" | "isInvitation" | "fields" | "flatten" => {
                FieldKind::PassThrough
            }
            _ => FieldKind::Match,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_classifies_known_fields() {
        assert_eq!(FieldKind::of("created"), FieldKind::Date);
        assert_eq!(FieldKind::of("lastlogin"), FieldKind::Date);
        assert_eq!(FieldKind::of("term"), FieldKind::PassThrough);
        assert_eq!(FieldKind::of("isopendata"), FieldKind::PassThrough);
        assert_eq!(FieldKind::of("tags"), FieldKind::Match);
    }

    #[test]
    fn unknown_fields_are_match_fields() {
        assert_eq!(FieldKind::of("customField"), FieldKind::Match);
    }
}
