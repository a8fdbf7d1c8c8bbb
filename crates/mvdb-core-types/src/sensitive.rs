//! Redaction wrapper for connection secrets

use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// A value that never shows up in formatted output
///
/// Connection specs are `Debug`-printed by callers and by the logging layer;
/// the password they carry is wrapped in this type.
///
/// ```
/// use mvdb_core_types::Sensitive;
///
/// let password = Sensitive::new(String::from("secret123"));
/// assert_eq!(format!("{:?}", password), "***REDACTED***");
/// assert_eq!(password.expose(), "secret123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret; only the store driver should need it
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct Login {
        user: String,
        password: Sensitive<String>,
    }

    #[test]
    fn test_formatting_hides_the_value() {
        let secret = Sensitive::new("hunter2");

        assert_eq!(format!("{:?}", secret), REDACTED);
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(*secret.expose(), "hunter2");
    }

    #[test]
    fn test_nested_debug_output() {
        let login = Login {
            user: "sa".into(),
            password: "hunter2".to_string().into(),
        };

        let printed = format!("{:?}", login);

        assert!(printed.contains("\"sa\""));
        assert!(printed.contains(REDACTED));
        assert!(!printed.contains("hunter2"));
        assert_eq!(login.password.into_inner(), "hunter2");
    }
}
