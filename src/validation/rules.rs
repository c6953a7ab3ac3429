use crate::validation::{Rule, RuleContext, ValidationResult, rule_fn};
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid regex pattern")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()-]{5,18}[0-9]$").expect("Invalid regex pattern"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("Invalid regex pattern"));

/// Named rules a `FormConfig` can reference from `validation_rule`.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `email`, `phone`, `numeric` and `date`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_rule("email", email())
            .with_rule("phone", phone())
            .with_rule("numeric", numeric())
            .with_rule("date", date())
    }

    pub fn with_rule(mut self, name: impl Into<String>, rule: Arc<dyn Rule>) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: Arc<dyn Rule>) {
        self.rules.insert(name.into(), rule);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

/// Text rules skip empty values; emptiness belongs to the required check.
fn text_rule<F>(check: F) -> Arc<dyn Rule>
where
    F: Fn(&str, &RuleContext) -> ValidationResult + Send + Sync + 'static,
{
    rule_fn(move |ctx: &RuleContext| {
        if ctx.value.is_empty() {
            return ValidationResult::valid();
        }
        let text = ctx.value.display();
        check(text.trim(), ctx)
    })
}

pub fn email() -> Arc<dyn Rule> {
    text_rule(|value, ctx| {
        if EMAIL.is_match(value) {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!("{} must be a valid email address", ctx.label))
        }
    })
}

pub fn phone() -> Arc<dyn Rule> {
    text_rule(|value, ctx| {
        if PHONE.is_match(value) {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!("{} must be a valid phone number", ctx.label))
        }
    })
}

pub fn numeric() -> Arc<dyn Rule> {
    rule_fn(|ctx: &RuleContext| {
        if ctx.value.is_empty() || ctx.value.as_number().is_some() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!("{} must be a number", ctx.label))
        }
    })
}

pub fn date() -> Arc<dyn Rule> {
    text_rule(|value, ctx| {
        if is_iso_date(value) {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!("{} must be a date (YYYY-MM-DD)", ctx.label))
        }
    })
}

pub fn min_length(min: usize) -> Arc<dyn Rule> {
    text_rule(move |value, ctx| {
        if value.chars().count() < min {
            ValidationResult::invalid(format!("{} must be at least {min} characters", ctx.label))
        } else {
            ValidationResult::valid()
        }
    })
}

pub fn max_length(max: usize) -> Arc<dyn Rule> {
    text_rule(move |value, ctx| {
        if value.chars().count() > max {
            ValidationResult::invalid(format!("{} must be at most {max} characters", ctx.label))
        } else {
            ValidationResult::valid()
        }
    })
}

pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Arc<dyn Rule>, regex::Error> {
    let re = Regex::new(pattern)?;
    let message = message.into();
    Ok(text_rule(move |value, _ctx| {
        if re.is_match(value) {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(message.clone())
        }
    }))
}

/// Cross-field rule: the number in `min_field` may not exceed the number in
/// `max_field`. Attach it to both fields so either side reports the conflict.
pub fn range_pair(
    min_field: impl Into<String>,
    max_field: impl Into<String>,
    message: impl Into<String>,
) -> Arc<dyn Rule> {
    let min_field = min_field.into();
    let max_field = max_field.into();
    let message = message.into();
    rule_fn(move |ctx: &RuleContext| {
        let min = ctx.other(&min_field).as_number();
        let max = ctx.other(&max_field).as_number();
        match (min, max) {
            (Some(min), Some(max)) if min > max => ValidationResult::invalid(message.clone()),
            _ => ValidationResult::valid(),
        }
    })
}

fn is_iso_date(value: &str) -> bool {
    let Some(caps) = ISO_DATE.captures(value) else {
        return false;
    };
    let parse = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());
    let (Some(year), Some(month), Some(day)) = (parse(1), parse(2), parse(3)) else {
        return false;
    };
    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }
    day <= days_in_month(year, month)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
