use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::request::{BuildRequest, RequestField};

/// Longest accepted app name, counted in characters.
pub const APP_NAME_MAX_CHARS: usize = 30;

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").expect("package name pattern is valid")
    })
}

/// Reverse-domain package identifier: at least two `[a-z][a-z0-9_]*`
/// segments joined by dots.
pub fn is_valid_package_name(name: &str) -> bool {
    package_pattern().is_match(name)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Check every field of a build request independently.
///
/// Returns one message per violated field; an empty list means the request
/// is valid. Pure and total.
pub fn validate(req: &BuildRequest) -> Vec<String> {
    let mut errors = Vec::new();
    let mut check = |field: RequestField, problem: Option<String>| {
        if req.mistyped.contains(&field) {
            errors.push(format!("{} must be a string", field.label()));
        } else if let Some(problem) = problem {
            errors.push(problem);
        }
    };

    check(
        RequestField::WebsiteUrl,
        match present(&req.website_url) {
            None => Some("Website URL is required".to_string()),
            Some(raw) => match Url::parse(raw) {
                Ok(url) if url.scheme() == "https" => None,
                Ok(_) => Some("URL must use HTTPS protocol".to_string()),
                Err(_) => Some("Invalid URL format".to_string()),
            },
        },
    );

    check(
        RequestField::AppName,
        match present(&req.app_name) {
            None => Some("App name is required".to_string()),
            Some(name) if name.chars().count() > APP_NAME_MAX_CHARS => {
                Some(format!("App name must be {APP_NAME_MAX_CHARS} characters or less"))
            }
            Some(_) => None,
        },
    );

    check(
        RequestField::PackageName,
        match present(&req.package_name) {
            None => Some("Package name is required".to_string()),
            Some(name) if !is_valid_package_name(name) => {
                Some("Invalid package name format. Use: com.company.appname".to_string())
            }
            Some(_) => None,
        },
    );

    check(
        RequestField::BuildType,
        match present(&req.build_type) {
            None => Some("Build type is required".to_string()),
            Some("apk") | Some("aab") => None,
            Some(_) => Some(r#"Build type must be "apk" or "aab""#.to_string()),
        },
    );

    errors
}
