use super::{TicketCategory, TicketType, User, UserRole};

/// What to do when more than one user holds the role being tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMultiple {
    /// Take the most recently created user.
    PickNewest,
    /// Refuse to guess.
    Conflict,
}

/// One role lookup in an assignment rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleStep {
    pub role: UserRole,
    pub on_multiple: OnMultiple,
}

/// How a ticket type is categorized and who may be assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentRule {
    pub ticket_type: TicketType,
    pub category: TicketCategory,
    /// Roles tried in order; an empty role falls through to the next one.
    pub steps: &'static [RoleStep],
    /// Only one open ticket of this type may exist per company.
    pub unique_open_per_company: bool,
    /// Creating this ticket resolves the company's other open tickets.
    pub resolves_open_tickets: bool,
}

const SECRETARY_THEN_DIRECTOR: &[RoleStep] = &[
    RoleStep {
        role: UserRole::CorporateSecretary,
        on_multiple: OnMultiple::Conflict,
    },
    RoleStep {
        role: UserRole::Director,
        on_multiple: OnMultiple::Conflict,
    },
];

pub static ASSIGNMENT_RULES: [AssignmentRule; 4] = [
    AssignmentRule {
        ticket_type: TicketType::ManagementReport,
        category: TicketCategory::Accounting,
        steps: &[RoleStep {
            role: UserRole::Accountant,
            on_multiple: OnMultiple::PickNewest,
        }],
        unique_open_per_company: false,
        resolves_open_tickets: false,
    },
    AssignmentRule {
        ticket_type: TicketType::StrikeOff,
        category: TicketCategory::Management,
        steps: &[RoleStep {
            role: UserRole::Director,
            on_multiple: OnMultiple::Conflict,
        }],
        unique_open_per_company: false,
        resolves_open_tickets: true,
    },
    AssignmentRule {
        ticket_type: TicketType::RegistrationAddressChange,
        category: TicketCategory::Corporate,
        steps: SECRETARY_THEN_DIRECTOR,
        unique_open_per_company: true,
        resolves_open_tickets: false,
    },
    AssignmentRule {
        ticket_type: TicketType::Other,
        category: TicketCategory::Corporate,
        steps: SECRETARY_THEN_DIRECTOR,
        unique_open_per_company: false,
        resolves_open_tickets: false,
    },
];

/// Look up the rule for a ticket type. Types without an entry are
/// treated like `other`.
pub fn rule_for(ticket_type: TicketType) -> &'static AssignmentRule {
    ASSIGNMENT_RULES
        .iter()
        .find(|rule| rule.ticket_type == ticket_type)
        .unwrap_or(&ASSIGNMENT_RULES[3])
}

/// Outcome of applying one role step to the users holding that role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<'a> {
    Assigned(&'a User),
    /// Nobody holds the role; try the next step.
    Vacant,
    Ambiguous { role: UserRole, count: usize },
}

/// Apply a role step to the candidate users for that role.
pub fn apply_step<'a>(step: &RoleStep, candidates: &'a [User]) -> StepOutcome<'a> {
    match candidates {
        [] => StepOutcome::Vacant,
        [only] => StepOutcome::Assigned(only),
        many => match step.on_multiple {
            OnMultiple::PickNewest => many
                .iter()
                .max_by_key(|user| user.created_at)
                .map(StepOutcome::Assigned)
                .unwrap_or(StepOutcome::Vacant),
            OnMultiple::Conflict => StepOutcome::Ambiguous {
                role: step.role,
                count: many.len(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn user(role: UserRole, minutes_ago: i64) -> User {
        User::new("someone", role, Uuid::new_v4())
            .with_created_at(Utc::now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_every_type_has_a_rule() {
        for ticket_type in TicketType::ALL {
            assert_eq!(rule_for(ticket_type).ticket_type, ticket_type);
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            rule_for(TicketType::ManagementReport).category,
            TicketCategory::Accounting
        );
        assert_eq!(
            rule_for(TicketType::StrikeOff).category,
            TicketCategory::Management
        );
        assert_eq!(
            rule_for(TicketType::RegistrationAddressChange).category,
            TicketCategory::Corporate
        );
        assert_eq!(rule_for(TicketType::Other).category, TicketCategory::Corporate);
    }

    #[test]
    fn test_corporate_rules_fall_back_to_director() {
        let roles: Vec<UserRole> = rule_for(TicketType::Other)
            .steps
            .iter()
            .map(|s| s.role)
            .collect();
        assert_eq!(roles, vec![UserRole::CorporateSecretary, UserRole::Director]);
    }

    #[test]
    fn test_only_address_change_is_unique_and_only_strike_off_resolves() {
        for rule in &ASSIGNMENT_RULES {
            assert_eq!(
                rule.unique_open_per_company,
                rule.ticket_type == TicketType::RegistrationAddressChange
            );
            assert_eq!(
                rule.resolves_open_tickets,
                rule.ticket_type == TicketType::StrikeOff
            );
        }
    }

    #[test]
    fn test_single_candidate_is_assigned() {
        let step = rule_for(TicketType::StrikeOff).steps[0];
        let users = vec![user(UserRole::Director, 5)];
        assert_eq!(apply_step(&step, &users), StepOutcome::Assigned(&users[0]));
    }

    #[test]
    fn test_no_candidate_is_vacant() {
        let step = rule_for(TicketType::ManagementReport).steps[0];
        assert_eq!(apply_step(&step, &[]), StepOutcome::Vacant);
    }

    #[test]
    fn test_pick_newest_accountant() {
        let step = rule_for(TicketType::ManagementReport).steps[0];
        let users = vec![
            user(UserRole::Accountant, 30),
            user(UserRole::Accountant, 1),
            user(UserRole::Accountant, 10),
        ];
        assert_eq!(apply_step(&step, &users), StepOutcome::Assigned(&users[1]));
    }

    #[test]
    fn test_multiple_directors_is_ambiguous() {
        let step = rule_for(TicketType::StrikeOff).steps[0];
        let users = vec![user(UserRole::Director, 2), user(UserRole::Director, 1)];
        assert_eq!(
            apply_step(&step, &users),
            StepOutcome::Ambiguous {
                role: UserRole::Director,
                count: 2
            }
        );
    }
}
