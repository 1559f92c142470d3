use crate::types::{Diagnostics, Dynamic};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.add_error(
                        format!("{} must have minimum length of {}", attribute_path, min),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.add_error(
                        format!("{} must have maximum length of {}", attribute_path, max),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.add_error(
                    format!("{} must match {}", attribute_path, self.description),
                    Some(format!("Value '{}' does not match pattern", s)),
                );
            }
        }
    }
}

/// Accepts only the listed strings
pub struct StringInSliceValidator {
    pub allowed: Vec<String>,
}

impl StringInSliceValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for StringInSliceValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.allowed.iter().any(|allowed| allowed == s) {
                diagnostics.add_error(
                    format!(
                        "{} must be one of [{}]",
                        attribute_path,
                        self.allowed.join(", ")
                    ),
                    Some(format!("Got '{}'", s)),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.add_error(
                        format!("{} must be at least {}", attribute_path, min),
                        Some(format!("Got {}", n)),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.add_error(
                        format!("{} must be at most {}", attribute_path, max),
                        Some(format!("Got {}", n)),
                    );
                }
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.add_error(
                        format!("{} must have at least {} items", attribute_path, min),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.add_error(
                        format!("{} must have at most {} items", attribute_path, max),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
        }
    }
}

/// Accepts Terraform-style durations such as `"30s"`, `"10m"` or `"1h"`
pub struct DurationValidator;

impl Validator for DurationValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if crate::timeouts::parse_duration(s).is_none() {
                diagnostics.add_error(
                    format!("{} must be a duration like \"30s\" or \"10m\"", attribute_path),
                    Some(format!("Got '{}'", s)),
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::types::{Diagnostics, Dynamic};

    #[test]
    fn string_length_validator_counts_characters() {
        let validator = StringLengthValidator {
            min: Some(1),
            max: Some(3),
        };

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("百度云".to_string()), "name", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::String("".to_string()), "name", &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("minimum length"));
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"^\d+\.\d+\.\d+\.\d+/\d+$").unwrap(),
            description: "CIDR notation".to_string(),
        };

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("10.0.0.0/16".to_string()), "cidr", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::String("invalid".to_string()), "cidr", &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("CIDR notation"));
    }

    #[test]
    fn string_in_slice_validator_lists_allowed_values() {
        let validator = StringInSliceValidator::new(&["start", "stop"]);

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("stop".to_string()), "action", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::String("reboot".to_string()), "action", &mut diags);
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("[start, stop]"));
    }

    #[test]
    fn number_range_validator_rejects_out_of_range() {
        let validator = NumberRangeValidator {
            min: Some(1.0),
            max: Some(200.0),
        };

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::Number(50.0), "bandwidth_in_mbps", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::Number(0.0), "bandwidth_in_mbps", &mut diags);
        validator.validate(&Dynamic::Number(500.0), "bandwidth_in_mbps", &mut diags);
        assert_eq!(diags.errors.len(), 2);
        assert!(diags.errors[0].summary.contains("at least"));
        assert!(diags.errors[1].summary.contains("at most"));
    }

    #[test]
    fn list_length_validator_accepts_valid_length() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(5),
        };

        let mut diags = Diagnostics::new();
        let list = Dynamic::List(vec![
            Dynamic::String("a".to_string()),
            Dynamic::String("b".to_string()),
        ]);
        validator.validate(&list, "items", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::List(vec![]), "items", &mut diags);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn duration_validator_rejects_garbage() {
        let mut diags = Diagnostics::new();
        DurationValidator.validate(&Dynamic::String("20m".to_string()), "create", &mut diags);
        assert!(diags.errors.is_empty());

        DurationValidator.validate(&Dynamic::String("soon".to_string()), "create", &mut diags);
        assert_eq!(diags.errors.len(), 1);
    }
}
