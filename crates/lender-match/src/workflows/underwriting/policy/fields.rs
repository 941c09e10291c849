use super::super::profile::{ApplicationProfile, FieldValue, Record};

/// Sub-record of the profile a field path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Borrower,
    Loan,
    Derived,
    PrimaryGuarantor,
    BusinessCredit,
}

impl Namespace {
    const PREFIXES: [(&'static str, Namespace); 5] = [
        ("borrower.", Namespace::Borrower),
        ("loan.", Namespace::Loan),
        ("derived.", Namespace::Derived),
        ("guarantor.primary.", Namespace::PrimaryGuarantor),
        ("business_credit.", Namespace::BusinessCredit),
    ];
}

/// A dotted field path split into its namespace and the segments walked inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath<'a> {
    pub namespace: Namespace,
    pub segments: Vec<&'a str>,
}

impl<'a> FieldPath<'a> {
    /// Unrecognized prefixes are looked up in `derived` using the whole path.
    pub fn parse(path: &'a str) -> Self {
        for (prefix, namespace) in Namespace::PREFIXES {
            if let Some(rest) = path.strip_prefix(prefix) {
                return Self {
                    namespace,
                    segments: split_segments(rest),
                };
            }
        }

        Self {
            namespace: Namespace::Derived,
            segments: split_segments(path),
        }
    }
}

fn split_segments(rest: &str) -> Vec<&str> {
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('.').collect()
    }
}

/// Resolve `path` against the profile. `None` means "no value": the field is missing,
/// explicitly null, or an intermediate segment is not a record.
pub fn resolve<'p>(profile: &'p ApplicationProfile, path: Option<&str>) -> Option<&'p FieldValue> {
    let path = FieldPath::parse(path?);
    let root = namespace_record(profile, path.namespace)?;
    walk(root, &path.segments)
}

fn namespace_record(profile: &ApplicationProfile, namespace: Namespace) -> Option<&Record> {
    match namespace {
        Namespace::Borrower => Some(&profile.borrower),
        Namespace::Loan => Some(&profile.loan_request),
        Namespace::Derived => Some(&profile.derived),
        // A missing guarantor or bureau record behaves like an empty mapping.
        Namespace::PrimaryGuarantor => profile.primary_guarantor(),
        Namespace::BusinessCredit => profile.business_credit.as_ref(),
    }
}

fn walk<'p>(root: &'p Record, segments: &[&str]) -> Option<&'p FieldValue> {
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get(*segment)?.as_record()?;
    }

    current.get(*last).filter(|value| !value.is_null())
}
