use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "admin123",
    "abcd1234",
    "senha123",
    "escola123",
];

/// 用户名：3 到 32 个字符，字母、数字、点、下划线或连字符
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 32 {
        return Err("Username length must be between 3 and 32 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username may contain only letters, digits, dots, underscores or hyphens");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

/// 姓名等必填文本：去除首尾空白后非空且不超过上限
pub fn validate_required_text(
    value: &str,
    field: &'static str,
    max_len: usize,
) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("{field} must be at most {max_len} characters"));
    }
    Ok(())
}

/// 外部链接必须是 http(s)
pub fn validate_http_url(url: &str) -> Result<(), &'static str> {
    let lower = url.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or("Link must start with http:// or https://")?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err("Link host is missing");
    }
    Ok(())
}

/// 密码策略验证结果
#[derive(Debug, Clone)]
pub struct PasswordValidationResult {
    pub is_valid: bool,
    pub errors: Vec<&'static str>,
}

impl PasswordValidationResult {
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

/// 密码策略：至少 8 个字符，包含大写、小写字母和数字，且不是常见弱密码
pub fn validate_password(password: &str) -> PasswordValidationResult {
    let checks: [(bool, &'static str); 4] = [
        (
            password.chars().count() >= 8,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one digit",
        ),
    ];

    let mut errors: Vec<&'static str> = checks
        .iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, msg)| *msg)
        .collect();

    if COMMON_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        errors.push("Password is too common, please choose a stronger password");
    }

    PasswordValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

pub fn validate_password_simple(password: &str) -> Result<(), String> {
    let result = validate_password(password);
    if result.is_valid {
        Ok(())
    } else {
        Err(result.error_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("maria.silva").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("aluno@escola.com.br").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("x@y").is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Ana", "full_name", 10).is_ok());
        assert_eq!(
            validate_required_text("   ", "full_name", 10).unwrap_err(),
            "full_name is required"
        );
        assert!(validate_required_text("abcdefghijk", "title", 10).is_err());
    }

    #[test]
    fn test_http_url() {
        assert!(validate_http_url("https://drive.example.com/file").is_ok());
        assert!(validate_http_url("HTTP://example.com").is_ok());
        assert!(validate_http_url("ftp://example.com").is_err());
        assert!(validate_http_url("https://").is_err());
    }

    #[test]
    fn test_valid_password() {
        assert!(validate_password("SecurePass123").is_valid);
        assert!(validate_password("Aluno2025x").is_valid);
    }

    #[test]
    fn test_password_missing_classes() {
        let result = validate_password("abcdefgh");
        assert!(!result.is_valid);
        assert!(result
            .errors
            .contains(&"Password must contain at least one uppercase letter"));
        assert!(result
            .errors
            .contains(&"Password must contain at least one digit"));
    }

    #[test]
    fn test_short_password() {
        let result = validate_password("Ab1");
        assert!(result
            .errors
            .contains(&"Password must be at least 8 characters long"));
    }

    #[test]
    fn test_common_password() {
        let result = validate_password("Senha123");
        assert!(!result.is_valid);
        assert_eq!(
            validate_password_simple("Senha123").unwrap_err(),
            "Password is too common, please choose a stronger password"
        );
    }
}
