use std::{fmt, str::FromStr};

use serde::{de::IgnoredAny, Deserialize, Serialize};
use thiserror::Error;

use crate::validate::validate;

/// Artifact flavour requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Installable package for testing and sideloading
    Apk,
    /// App bundle for Google Play
    Aab,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown build type: {0}")]
pub struct ParseBuildTypeError(pub String);

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Apk => "apk",
            BuildType::Aab => "aab",
        }
    }

    /// Provider-side build profile. Fixed policy, not user-configurable.
    pub fn profile(&self) -> &'static str {
        match self {
            BuildType::Apk => "preview",
            BuildType::Aab => "production",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = ParseBuildTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apk" => Ok(BuildType::Apk),
            "aab" => Ok(BuildType::Aab),
            other => Err(ParseBuildTypeError(other.to_string())),
        }
    }
}

/// One of the user-supplied request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    WebsiteUrl,
    AppName,
    PackageName,
    BuildType,
}

impl RequestField {
    /// Human label used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            RequestField::WebsiteUrl => "Website URL",
            RequestField::AppName => "App name",
            RequestField::PackageName => "Package name",
            RequestField::BuildType => "Build type",
        }
    }
}

/// Raw submission as it arrives over the wire.
///
/// Every field is optional and any JSON type is accepted, so that a missing
/// or mistyped field becomes a validation message rather than a body
/// rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireBuildRequest")]
pub struct BuildRequest {
    pub website_url: Option<String>,
    pub app_name: Option<String>,
    pub package_name: Option<String>,
    pub build_type: Option<String>,
    /// Fields that arrived holding something other than a string.
    #[serde(skip_serializing)]
    pub mistyped: Vec<RequestField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBuildRequest {
    #[serde(default)]
    website_url: Option<LooseText>,
    #[serde(default)]
    app_name: Option<LooseText>,
    #[serde(default)]
    package_name: Option<LooseText>,
    #[serde(default)]
    build_type: Option<LooseText>,
}

fn take_text(
    field: RequestField,
    value: Option<LooseText>,
    mistyped: &mut Vec<RequestField>,
) -> Option<String> {
    match value? {
        LooseText::Text(text) => Some(text),
        LooseText::Other(_) => {
            mistyped.push(field);
            None
        }
    }
}

impl From<WireBuildRequest> for BuildRequest {
    fn from(wire: WireBuildRequest) -> Self {
        let mut mistyped = Vec::new();
        Self {
            website_url: take_text(RequestField::WebsiteUrl, wire.website_url, &mut mistyped),
            app_name: take_text(RequestField::AppName, wire.app_name, &mut mistyped),
            package_name: take_text(RequestField::PackageName, wire.package_name, &mut mistyped),
            build_type: take_text(RequestField::BuildType, wire.build_type, &mut mistyped),
            mistyped,
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub website_url: String,
    pub app_name: String,
    pub package_name: String,
    pub build_type: BuildType,
}

impl BuildRequest {
    pub fn new(
        website_url: impl Into<String>,
        app_name: impl Into<String>,
        package_name: impl Into<String>,
        build_type: BuildType,
    ) -> Self {
        Self {
            website_url: Some(website_url.into()),
            app_name: Some(app_name.into()),
            package_name: Some(package_name.into()),
            build_type: Some(build_type.as_str().to_string()),
            mistyped: Vec::new(),
        }
    }

    /// Validate and convert into a [`BuildSpec`], returning every violation
    /// on failure.
    pub fn into_spec(self) -> Result<BuildSpec, Vec<String>> {
        let errors = validate(&self);
        if !errors.is_empty() {
            return Err(errors);
        }

        match (self.website_url, self.app_name, self.package_name, self.build_type) {
            (Some(website_url), Some(app_name), Some(package_name), Some(build_type)) => {
                let build_type = build_type
                    .parse()
                    .map_err(|e: ParseBuildTypeError| vec![e.to_string()])?;
                Ok(BuildSpec {
                    website_url,
                    app_name,
                    package_name,
                    build_type,
                })
            }
            _ => Err(vec!["Incomplete build request".to_string()]),
        }
    }
}
