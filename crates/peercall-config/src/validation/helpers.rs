//! Shared validation helpers used by the section validators.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error unless `value` starts with one of `prefixes`.
pub(crate) fn validate_scheme(errors: &mut Vec<String>, name: &str, value: &str, prefixes: &[&str]) {
    if !prefixes.iter().any(|p| value.starts_with(p)) {
        errors.push(format!(
            "{name} = {value:?} must start with one of {}",
            prefixes.join(", ")
        ));
    }
}
