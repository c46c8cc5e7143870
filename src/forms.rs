//! Login and registration payloads with their client-side validation rules.

/// Login credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub const MIN_PASSWORD: usize = 6;

    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;

        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        if self.password.chars().count() < Self::MIN_PASSWORD {
            return Err(ValidationError::TooShort { field: "password", min: Self::MIN_PASSWORD });
        }

        Ok(())
    }
}

/// Sign-up form
#[derive(Debug, Clone)]
pub struct Registration {
    pub nombre: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub const DEFAULT_AVATAR: &'static str = "assets/images/default-avatar.png";

    const NAME_LEN: (usize, usize) = (2, 50);
    const PASSWORD_LEN: (usize, usize) = (6, 30);

    pub fn new(
        nombre: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            nombre: nombre.into(),
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("nombre", &self.nombre, Self::NAME_LEN)?;
        if !self.nombre.chars().all(|c| c == ' ' || is_spanish_letter(c)) {
            return Err(ValidationError::Pattern {
                field: "nombre",
                rule: "only letters and spaces",
            });
        }

        validate_email(&self.email)?;

        check_length("password", &self.password, Self::PASSWORD_LEN)?;
        let has_lower = self.password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = self.password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            return Err(ValidationError::Pattern {
                field: "password",
                rule: "at least one uppercase letter, one lowercase letter and one digit",
            });
        }

        Ok(())
    }
}

fn is_spanish_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || "áéíóúÁÉÍÓÚñÑ".contains(c)
}

fn check_length(field: &'static str, value: &str, (min, max): (usize, usize)) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::Required(field));
    }
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split('.')
                    .all(|label| !label.is_empty())
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::Email)
    }
}

/// Form validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("please enter a valid email")]
    Email,

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must contain {rule}")]
    Pattern { field: &'static str, rule: &'static str },
}
