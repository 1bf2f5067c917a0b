use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::entities::package_plan;

/// The fields that decide whether two plans collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanKey {
    /// Set when the candidate edits a persisted plan.
    pub id: Option<Uuid>,
    pub plan_type: String,
    pub duration_days: i32,
}

impl From<&package_plan::Model> for PlanKey {
    fn from(plan: &package_plan::Model) -> Self {
        Self {
            id: Some(plan.id),
            plan_type: plan.plan_type.clone(),
            duration_days: plan.duration_days,
        }
    }
}

/// A rejected plan set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicatePlan {
    /// Two candidates share a type and duration.
    WithinRequest { plan_type: String, duration_days: i32 },
    /// A new candidate matches a plan already stored on the package.
    InPackage { plan_type: String, duration_days: i32 },
}

impl fmt::Display for DuplicatePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinRequest {
                plan_type,
                duration_days,
            } => write!(
                f,
                "Duplicate plan found: Plan Type \"{plan_type}\" with Duration {duration_days} days already exists."
            ),
            Self::InPackage {
                plan_type,
                duration_days,
            } => write!(
                f,
                "Duplicate plan found: Plan Type \"{plan_type}\" with Duration {duration_days} days already exists in the package."
            ),
        }
    }
}

impl std::error::Error for DuplicatePlan {}

/// Reject a plan set that would leave two active plans with the same type and duration.
///
/// Candidates are scanned in order and the first repeat wins. Afterwards every candidate
/// without an `id` is compared to `existing`; candidates with an `id` are edits and skip
/// that comparison.
///
/// # Errors
///
/// Returns the first [`DuplicatePlan`] found.
pub fn validate_duplicate_plans(
    candidates: &[PlanKey],
    existing: &[PlanKey],
) -> Result<(), DuplicatePlan> {
    let mut seen: HashSet<(&str, i32)> = HashSet::with_capacity(candidates.len());
    for plan in candidates {
        if !seen.insert((plan.plan_type.as_str(), plan.duration_days)) {
            return Err(DuplicatePlan::WithinRequest {
                plan_type: plan.plan_type.clone(),
                duration_days: plan.duration_days,
            });
        }
    }

    let stored: HashSet<(&str, i32)> = existing
        .iter()
        .map(|p| (p.plan_type.as_str(), p.duration_days))
        .collect();
    for plan in candidates.iter().filter(|p| p.id.is_none()) {
        if stored.contains(&(plan.plan_type.as_str(), plan.duration_days)) {
            return Err(DuplicatePlan::InPackage {
                plan_type: plan.plan_type.clone(),
                duration_days: plan.duration_days,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(plan_type: &str, duration_days: i32) -> PlanKey {
        PlanKey {
            id: None,
            plan_type: plan_type.to_string(),
            duration_days,
        }
    }

    #[test]
    fn test_duplicate_within_request() {
        let err = validate_duplicate_plans(&[key("monthly", 30), key("monthly", 30)], &[]);
        assert_eq!(
            err,
            Err(DuplicatePlan::WithinRequest {
                plan_type: "monthly".to_string(),
                duration_days: 30
            })
        );
        assert_eq!(
            err.err().map(|e| e.to_string()).unwrap_or_default(),
            "Duplicate plan found: Plan Type \"monthly\" with Duration 30 days already exists."
        );
    }

    #[test]
    fn test_distinct_plans_pass() {
        assert!(validate_duplicate_plans(&[key("monthly", 30), key("yearly", 365)], &[]).is_ok());
        // same type, different duration is a different plan
        assert!(validate_duplicate_plans(&[key("monthly", 30), key("monthly", 31)], &[]).is_ok());
    }

    #[test]
    fn test_first_repeat_is_reported() {
        let err = validate_duplicate_plans(
            &[
                key("yearly", 365),
                key("monthly", 30),
                key("monthly", 30),
                key("yearly", 365),
            ],
            &[],
        );
        assert!(matches!(
            err,
            Err(DuplicatePlan::WithinRequest { ref plan_type, .. }) if plan_type == "monthly"
        ));
    }

    #[test]
    fn test_new_plan_clashes_with_existing() {
        let existing = [key("quarterly", 90)];
        let err = validate_duplicate_plans(&[key("quarterly", 90)], &existing);
        assert!(matches!(err, Err(DuplicatePlan::InPackage { .. })));
        assert!(
            err.err()
                .map(|e| e.to_string())
                .unwrap_or_default()
                .ends_with("already exists in the package.")
        );
    }

    #[test]
    fn test_edited_plan_is_exempt_from_existing_check() {
        let existing = [key("quarterly", 90)];
        let edit = PlanKey {
            id: Some(Uuid::new_v4()),
            ..key("quarterly", 90)
        };
        assert!(validate_duplicate_plans(&[edit], &existing).is_ok());
    }

    #[test]
    fn test_empty_candidates() {
        assert!(validate_duplicate_plans(&[], &[key("monthly", 30)]).is_ok());
    }
}
