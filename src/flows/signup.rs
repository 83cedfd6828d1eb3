//! A ready-made account-creation flow built from the engine primitives.
//!
//! Selectors ship with generic defaults matching common sign-up screens and
//! are fully overridable per app; all form values come from the caller.

use std::time::Duration;

use crate::driver::LocatorStrategy;
use crate::engine::{self, HoldTarget};
use crate::runner::step::{Criticality, WorkflowStep};

/// Minimum hold on the final press-and-hold verification control.
const VERIFY_HOLD_MS: u64 = 15_000;

/// Form values supplied by the caller.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Day of month as displayed in the picker, e.g. "12".
    pub birth_day: String,
    /// Month as displayed in the picker, e.g. "June".
    pub birth_month: String,
    /// Four-digit year, e.g. "1994".
    pub birth_year: String,
}

/// Strategy ladders for each control the flow touches.
#[derive(Debug, Clone)]
pub struct SignupSelectors {
    pub create_account_button: Vec<LocatorStrategy>,
    pub email_field: Vec<LocatorStrategy>,
    pub password_field: Vec<LocatorStrategy>,
    pub day_dropdown: Vec<LocatorStrategy>,
    pub month_dropdown: Vec<LocatorStrategy>,
    pub year_field: Vec<LocatorStrategy>,
    pub first_name_field: Vec<LocatorStrategy>,
    pub last_name_field: Vec<LocatorStrategy>,
    pub next_button: Vec<LocatorStrategy>,
    pub verify_hold_button: Vec<LocatorStrategy>,
}

impl Default for SignupSelectors {
    fn default() -> Self {
        Self {
            create_account_button: vec![
                LocatorStrategy::TextContains("Create account".into()),
                LocatorStrategy::TextContains("Sign up".into()),
                LocatorStrategy::DescriptionContains("Create account".into()),
            ],
            email_field: vec![
                LocatorStrategy::HintContains("email".into()),
                LocatorStrategy::DescriptionContains("email".into()),
                LocatorStrategy::ClassName("android.widget.EditText".into()),
            ],
            password_field: vec![
                LocatorStrategy::HintContains("assword".into()),
                LocatorStrategy::DescriptionContains("assword".into()),
                LocatorStrategy::ClassName("android.widget.EditText".into()),
            ],
            day_dropdown: vec![
                LocatorStrategy::TextContains("Day".into()),
                LocatorStrategy::DescriptionContains("Day".into()),
            ],
            month_dropdown: vec![
                LocatorStrategy::TextContains("Month".into()),
                LocatorStrategy::DescriptionContains("Month".into()),
            ],
            year_field: vec![
                LocatorStrategy::TextContains("Year".into()),
                LocatorStrategy::HintContains("Year".into()),
                LocatorStrategy::DescriptionContains("Year".into()),
                LocatorStrategy::ClassInstance {
                    class: "android.widget.EditText".into(),
                    instance: 2,
                },
            ],
            first_name_field: vec![
                LocatorStrategy::HintContains("First name".into()),
                LocatorStrategy::DescriptionContains("First name".into()),
                LocatorStrategy::ClassInstance {
                    class: "android.widget.EditText".into(),
                    instance: 0,
                },
            ],
            last_name_field: vec![
                LocatorStrategy::HintContains("Last name".into()),
                LocatorStrategy::DescriptionContains("Last name".into()),
                LocatorStrategy::ClassInstance {
                    class: "android.widget.EditText".into(),
                    instance: 1,
                },
            ],
            next_button: vec![
                LocatorStrategy::Text("Next".into()),
                LocatorStrategy::TextContains("Next".into()),
                LocatorStrategy::DescriptionContains("Next".into()),
            ],
            verify_hold_button: vec![
                LocatorStrategy::TextContains("Press and hold".into()),
                LocatorStrategy::DescriptionContains("Press and hold".into()),
                LocatorStrategy::ClassName("android.widget.Button".into()),
            ],
        }
    }
}

fn tap_step(
    name: &str,
    criticality: Criticality,
    strategies: Vec<LocatorStrategy>,
) -> WorkflowStep {
    let description = name.to_string();
    WorkflowStep::new(name, criticality, move |ctx| {
        let strategies = strategies.clone();
        let description = description.clone();
        Box::pin(async move { engine::tap(&ctx, &strategies, &description).await })
    })
}

fn field_step(
    name: &str,
    criticality: Criticality,
    strategies: Vec<LocatorStrategy>,
    value: String,
) -> WorkflowStep {
    let description = name.to_string();
    WorkflowStep::new(name, criticality, move |ctx| {
        let strategies = strategies.clone();
        let value = value.clone();
        let description = description.clone();
        Box::pin(async move { engine::type_text(&ctx, &strategies, &value, &description).await })
    })
}

fn hold_step(
    name: &str,
    criticality: Criticality,
    strategies: Vec<LocatorStrategy>,
    min_duration: Duration,
) -> WorkflowStep {
    let description = name.to_string();
    WorkflowStep::new(name, criticality, move |ctx| {
        let strategies = strategies.clone();
        let description = description.clone();
        Box::pin(async move {
            engine::press_and_hold(
                &ctx,
                &HoldTarget::Element(strategies),
                min_duration,
                &description,
            )
            .await
        })
    })
}

fn dropdown_step(
    name: &str,
    criticality: Criticality,
    strategies: Vec<LocatorStrategy>,
    value: String,
) -> WorkflowStep {
    let description = name.to_string();
    WorkflowStep::new(name, criticality, move |ctx| {
        let strategies = strategies.clone();
        let value = value.clone();
        let description = description.clone();
        Box::pin(async move {
            engine::select_value(&ctx, &strategies, &value, &description).await
        })
    })
}

/// Assemble the full account-creation step sequence.
///
/// Day and month pickers are optional: a default or slightly wrong birth
/// date rarely blocks account creation, while the year field is validated
/// by most forms and stays critical.
pub fn signup_steps(input: &SignupInput, selectors: &SignupSelectors) -> Vec<WorkflowStep> {
    vec![
        tap_step(
            "open signup form",
            Criticality::Critical,
            selectors.create_account_button.clone(),
        ),
        field_step(
            "email",
            Criticality::Critical,
            selectors.email_field.clone(),
            input.email.clone(),
        ),
        tap_step(
            "confirm email",
            Criticality::Critical,
            selectors.next_button.clone(),
        ),
        field_step(
            "password",
            Criticality::Critical,
            selectors.password_field.clone(),
            input.password.clone(),
        ),
        tap_step(
            "confirm password",
            Criticality::Critical,
            selectors.next_button.clone(),
        ),
        dropdown_step(
            "birth day",
            Criticality::Optional,
            selectors.day_dropdown.clone(),
            input.birth_day.clone(),
        ),
        dropdown_step(
            "birth month",
            Criticality::Optional,
            selectors.month_dropdown.clone(),
            input.birth_month.clone(),
        ),
        field_step(
            "birth year",
            Criticality::Critical,
            selectors.year_field.clone(),
            input.birth_year.clone(),
        ),
        tap_step(
            "confirm birth date",
            Criticality::Critical,
            selectors.next_button.clone(),
        ),
        field_step(
            "first name",
            Criticality::Critical,
            selectors.first_name_field.clone(),
            input.first_name.clone(),
        ),
        field_step(
            "last name",
            Criticality::Critical,
            selectors.last_name_field.clone(),
            input.last_name.clone(),
        ),
        tap_step(
            "submit details",
            Criticality::Critical,
            selectors.next_button.clone(),
        ),
        hold_step(
            "hold to verify",
            Criticality::Critical,
            selectors.verify_hold_button.clone(),
            Duration::from_millis(VERIFY_HOLD_MS),
        ),
    ]
}
