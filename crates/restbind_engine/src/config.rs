//! Configuration for the binding engine.

use crate::codec::FieldBinding;
use crate::error::ConfigError;
use crate::hooks::Hooks;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CONTENT_TYPE: &str = "Content-Type";
const JSON_MEDIA_TYPE: &str = "application/json";

/// Configuration binding one REST resource to a listing and an editing
/// surface. Frozen once the engine is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BindingConfig {
    /// Resource endpoint URL, e.g. `/api/widgets`. May carry a query string,
    /// which is kept for searches.
    pub endpoint: String,
    /// Record field that identifies an item.
    pub identity_field: String,
    /// Record field used to name an item in status messages.
    pub display_field: String,
    /// Dotted paths rendered as listing columns, in order.
    pub columns: Vec<String>,
    /// Style tags keyed by column path.
    pub column_styles: BTreeMap<String, String>,
    /// Query parameter carrying the search term.
    pub search_param: String,
    /// Pagination parameters.
    pub pagination: Pagination,
    /// Dotted path to the total item count in search responses.
    pub total_path: Option<String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Lifecycle hooks. Attached programmatically only.
    #[serde(skip)]
    pub hooks: Hooks,
}

/// Pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    /// Query parameter carrying the page size.
    pub size_param: Option<String>,
    /// Page size sent in `size_param`.
    pub size: u64,
    /// Query parameter carrying the page offset.
    pub number_param: Option<String>,
    /// Amount the offset moves per next/previous page.
    pub increment: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            size_param: None,
            size: 10,
            number_param: None,
            increment: 10,
        }
    }
}

impl BindingConfig {
    /// Creates a configuration for the given endpoint with default settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            identity_field: "id".into(),
            display_field: "name".into(),
            columns: Vec::new(),
            column_styles: BTreeMap::new(),
            search_param: "search".into(),
            pagination: Pagination::default(),
            total_path: None,
            headers: BTreeMap::from([(CONTENT_TYPE.to_string(), JSON_MEDIA_TYPE.to_string())]),
            hooks: Hooks::default(),
        }
    }

    /// Sets the identity field.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Sets the display-name field.
    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = field.into();
        self
    }

    /// Sets the listing columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the style tag of one column.
    pub fn with_column_style(mut self, column: impl Into<String>, style: impl Into<String>) -> Self {
        self.column_styles.insert(column.into(), style.into());
        self
    }

    /// Sets the search query parameter.
    pub fn with_search_param(mut self, param: impl Into<String>) -> Self {
        self.search_param = param.into();
        self
    }

    /// Sets the pagination parameters.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the dotted path of the total count in search responses.
    pub fn with_total_path(mut self, path: impl Into<String>) -> Self {
        self.total_path = Some(path.into());
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Checks every field that does not depend on the surfaces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.identity_field.is_empty() {
            return Err(ConfigError::MissingIdentityField);
        }
        if self.columns.is_empty() {
            return Err(ConfigError::MissingColumns);
        }
        if let Some(column) = self
            .columns
            .iter()
            .find(|column| column.split('.').any(str::is_empty))
        {
            return Err(ConfigError::InvalidColumn(column.clone()));
        }
        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }
        if self.pagination.increment == 0 {
            return Err(ConfigError::InvalidIncrement);
        }
        Ok(())
    }

    /// Checks that the bound editing surface carries the identity control.
    pub fn validate_fields(&self, fields: &[FieldBinding]) -> Result<(), ConfigError> {
        if fields.iter().any(|field| field.name == self.identity_field) {
            Ok(())
        } else {
            Err(ConfigError::MissingIdentityControl(
                self.identity_field.clone(),
            ))
        }
    }

    /// Returns the headers sent with every request, including the JSON
    /// content type unless one is configured.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        if !headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            headers.insert(CONTENT_TYPE.to_string(), JSON_MEDIA_TYPE.to_string());
        }
        headers
    }

    /// Returns the endpoint without query string or trailing slash.
    pub fn endpoint_base(&self) -> &str {
        let endpoint = self.endpoint.trim();
        let base = endpoint.split_once('?').map_or(endpoint, |(base, _)| base);
        base.trim_end_matches('/')
    }

    /// Returns the URL of one item.
    pub fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.endpoint_base(), urlencoding::encode(id))
    }

    /// Returns the search URL for a term and page offset.
    pub fn search_url(&self, term: Option<&str>, offset: u64) -> String {
        let mut params = Vec::new();
        if let Some(term) = term.filter(|term| !term.is_empty()) {
            params.push(format!(
                "{}={}",
                urlencoding::encode(&self.search_param),
                urlencoding::encode(term)
            ));
        }
        if let Some(param) = &self.pagination.size_param {
            params.push(format!(
                "{}={}",
                urlencoding::encode(param),
                self.pagination.size
            ));
        }
        if let Some(param) = &self.pagination.number_param {
            params.push(format!("{}={}", urlencoding::encode(param), offset));
        }

        let endpoint = self.endpoint.trim();
        if params.is_empty() {
            return endpoint.to_string();
        }
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{endpoint}{separator}{}", params.join("&"))
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self::new("")
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if !name.bytes().all(is_token_byte) {
        return Err(invalid("name contains characters outside the token set"));
    }
    if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
        return Err(invalid("value contains a line break"));
    }
    Ok(())
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
