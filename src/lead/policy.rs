//! Required-field policy for lead validation

use std::str::FromStr;

use super::{LeadField, LeadFields};
use crate::Error;

/// Which lead fields must be present and non-blank at submission
///
/// `child_class`, `subjects` and `contact_phone` are always required; a
/// policy can only add to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    required: Vec<LeadField>,
}

impl ValidationPolicy {
    /// The three core fields only
    #[must_use]
    pub fn standard() -> Self {
        Self {
            required: LeadField::CORE.to_vec(),
        }
    }

    /// Every BANT field except the child's name
    #[must_use]
    pub fn strict() -> Self {
        Self::with_required(
            LeadField::ALL
                .into_iter()
                .filter(|f| *f != LeadField::ChildName),
        )
    }

    /// Core fields plus `extra`, deduplicated and kept in record order
    #[must_use]
    pub fn with_required(extra: impl IntoIterator<Item = LeadField>) -> Self {
        let mut required: Vec<LeadField> = LeadField::CORE.into_iter().chain(extra).collect();
        required.sort_by_key(|f| LeadField::ALL.iter().position(|a| a == f));
        required.dedup();
        Self { required }
    }

    /// Required fields, in record order
    #[must_use]
    pub fn required(&self) -> &[LeadField] {
        &self.required
    }

    /// Fields the model may omit, in record order
    pub fn optional(&self) -> impl Iterator<Item = LeadField> + '_ {
        LeadField::ALL
            .into_iter()
            .filter(|f| !self.required.contains(f))
    }

    /// Whether `field` must be supplied
    #[must_use]
    pub fn is_required(&self, field: LeadField) -> bool {
        self.required.contains(&field)
    }

    /// Required fields that are absent or blank in `fields`
    #[must_use]
    pub fn missing(&self, fields: &LeadFields) -> Vec<LeadField> {
        self.required
            .iter()
            .copied()
            .filter(|f| !fields.is_filled(*f))
            .collect()
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl FromStr for ValidationPolicy {
    type Err = Error;

    /// Parse a preset name (`standard`, `strict`) or a comma-separated field list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "standard" | "" => Ok(Self::standard()),
            "strict" => Ok(Self::strict()),
            list => {
                let extra = list
                    .split(',')
                    .map(str::parse)
                    .collect::<Result<Vec<LeadField>, _>>()?;
                Ok(Self::with_required(extra))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_requires_core_only() {
        let policy = ValidationPolicy::standard();
        assert_eq!(policy.required(), &LeadField::CORE);
        assert_eq!(policy.optional().count(), 6);
        assert!(!policy.is_required(LeadField::ChildName));
    }

    #[test]
    fn test_strict_requires_all_but_name() {
        let policy = ValidationPolicy::strict();
        assert_eq!(policy.required().len(), 8);
        assert_eq!(policy.optional().collect::<Vec<_>>(), vec![LeadField::ChildName]);
    }

    #[test]
    fn test_custom_list_cannot_drop_core() {
        let policy: ValidationPolicy = "urgency, budget_range".parse().unwrap();
        assert_eq!(
            policy.required(),
            &[
                LeadField::ChildClass,
                LeadField::Subjects,
                LeadField::BudgetRange,
                LeadField::Urgency,
                LeadField::ContactPhone,
            ]
        );
    }

    #[test]
    fn test_duplicate_entries_collapse() {
        let policy = ValidationPolicy::with_required([LeadField::Subjects, LeadField::Subjects]);
        assert_eq!(policy, ValidationPolicy::standard());
    }

    #[test]
    fn test_unknown_preset_rejected() {
        assert!("lenient".parse::<ValidationPolicy>().is_err());
    }

    #[test]
    fn test_strict_reports_missing_bant_fields() {
        let fields = LeadFields {
            child_class: Some("9".to_string()),
            subjects: Some("Maths".to_string()),
            contact_phone: Some("9000000000".to_string()),
            urgency: Some("High".to_string()),
            ..LeadFields::default()
        };

        assert_eq!(
            ValidationPolicy::strict().missing(&fields),
            vec![
                LeadField::ExamInfo,
                LeadField::BudgetRange,
                LeadField::DecisionMaker,
                LeadField::Timeline,
            ]
        );
    }
}
