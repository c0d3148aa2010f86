//! @ai:module:intent Policy tables and settings for an enrichment pass
//! @ai:module:layer infrastructure
//! @ai:module:public_api EnrichConfig, BaseCatalog, BaseKind, DirectiveNames, AnnotationCatalog, PolicyConfig, AncestorOrder
//! @ai:module:stateless true

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// @ai:intent Complete configuration for one enrichment pass
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichConfig {
    #[serde(default)]
    pub bases: BaseCatalog,
    #[serde(default)]
    pub directives: DirectiveNames,
    #[serde(default)]
    pub annotations: AnnotationCatalog,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// @ai:intent Which family of well-known base a supertype belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKind {
    Crud,
    Predicate,
    Plain,
}

/// @ai:intent Well-known repository base names that terminate hierarchy walks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseCatalog {
    #[serde(default = "default_crud_bases")]
    pub crud: Vec<String>,
    #[serde(default = "default_predicate_bases")]
    pub predicate: Vec<String>,
    #[serde(default = "default_plain_bases")]
    pub plain: Vec<String>,
    #[serde(default = "default_predicate_type")]
    pub predicate_type: String,
}

/// @ai:intent Names of the pre-existing export-policy directives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveNames {
    #[serde(default = "default_method_directive")]
    pub method: String,
    #[serde(default = "default_repository_directive")]
    pub repository: String,
    #[serde(default = "default_hidden")]
    pub hidden: String,
    #[serde(default = "default_param")]
    pub param: String,
}

/// @ai:intent Qualified class names of every annotation the synthesizers emit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationCatalog {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_get")]
    pub get: String,
    #[serde(default = "default_post")]
    pub post: String,
    #[serde(default = "default_put")]
    pub put: String,
    #[serde(default = "default_patch")]
    pub patch: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_path_param")]
    pub path_param: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_parameter")]
    pub parameter: String,
    #[serde(default = "default_operation")]
    pub operation: String,
    #[serde(default = "default_request_body")]
    pub request_body: String,
    #[serde(default = "default_api_response")]
    pub api_response: String,
    #[serde(default = "default_content")]
    pub content: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_array_schema")]
    pub array_schema: String,
}

/// @ai:intent Tie-break order among multiple extended types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorOrder {
    #[default]
    Declaration,
    Reverse,
}

/// @ai:intent Behavioural switches of the synthesizers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub suppress_put: bool,
    #[serde(default = "default_companion_suffix")]
    pub companion_suffix: String,
    #[serde(default = "default_media_types")]
    pub media_types: Vec<String>,
    #[serde(default = "default_reserved_methods")]
    pub reserved_methods: Vec<String>,
    #[serde(default = "default_finder_pattern")]
    pub finder_pattern: String,
    #[serde(default = "default_remover_pattern")]
    pub remover_pattern: String,
    #[serde(default)]
    pub ancestor_order: AncestorOrder,
}

impl Default for BaseCatalog {
    fn default() -> Self {
        Self {
            crud: default_crud_bases(),
            predicate: default_predicate_bases(),
            plain: default_plain_bases(),
            predicate_type: default_predicate_type(),
        }
    }
}

impl Default for DirectiveNames {
    fn default() -> Self {
        Self {
            method: default_method_directive(),
            repository: default_repository_directive(),
            hidden: default_hidden(),
            param: default_param(),
        }
    }
}

impl Default for AnnotationCatalog {
    fn default() -> Self {
        Self {
            path: default_path(),
            get: default_get(),
            post: default_post(),
            put: default_put(),
            patch: default_patch(),
            delete: default_delete(),
            path_param: default_path_param(),
            query_param: default_query_param(),
            parameter: default_parameter(),
            operation: default_operation(),
            request_body: default_request_body(),
            api_response: default_api_response(),
            content: default_content(),
            schema: default_schema(),
            array_schema: default_array_schema(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            suppress_put: false,
            companion_suffix: default_companion_suffix(),
            media_types: default_media_types(),
            reserved_methods: default_reserved_methods(),
            finder_pattern: default_finder_pattern(),
            remover_pattern: default_remover_pattern(),
            ancestor_order: AncestorOrder::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_crud_bases() -> Vec<String> {
    strings(&[
        "CrudRepository",
        "ListCrudRepository",
        "PagingAndSortingRepository",
        "ListPagingAndSortingRepository",
        "JpaRepository",
        "MongoRepository",
    ])
}

fn default_predicate_bases() -> Vec<String> {
    strings(&["QuerydslPredicateExecutor"])
}

fn default_plain_bases() -> Vec<String> {
    strings(&["Repository"])
}

fn default_predicate_type() -> String {
    "com.querydsl.core.types.Predicate".to_string()
}

fn default_method_directive() -> String {
    "org.springframework.data.rest.core.annotation.RestResource".to_string()
}

fn default_repository_directive() -> String {
    "org.springframework.data.rest.core.annotation.RepositoryRestResource".to_string()
}

fn default_hidden() -> String {
    "io.swagger.v3.oas.annotations.Hidden".to_string()
}

fn default_param() -> String {
    "org.springframework.data.repository.query.Param".to_string()
}

fn default_path() -> String {
    "jakarta.ws.rs.Path".to_string()
}

fn default_get() -> String {
    "jakarta.ws.rs.GET".to_string()
}

fn default_post() -> String {
    "jakarta.ws.rs.POST".to_string()
}

fn default_put() -> String {
    "jakarta.ws.rs.PUT".to_string()
}

fn default_patch() -> String {
    "jakarta.ws.rs.PATCH".to_string()
}

fn default_delete() -> String {
    "jakarta.ws.rs.DELETE".to_string()
}

fn default_path_param() -> String {
    "jakarta.ws.rs.PathParam".to_string()
}

fn default_query_param() -> String {
    "jakarta.ws.rs.QueryParam".to_string()
}

fn default_parameter() -> String {
    "io.swagger.v3.oas.annotations.Parameter".to_string()
}

fn default_operation() -> String {
    "io.swagger.v3.oas.annotations.Operation".to_string()
}

fn default_request_body() -> String {
    "io.swagger.v3.oas.annotations.parameters.RequestBody".to_string()
}

fn default_api_response() -> String {
    "io.swagger.v3.oas.annotations.responses.ApiResponse".to_string()
}

fn default_content() -> String {
    "io.swagger.v3.oas.annotations.media.Content".to_string()
}

fn default_schema() -> String {
    "io.swagger.v3.oas.annotations.media.Schema".to_string()
}

fn default_array_schema() -> String {
    "io.swagger.v3.oas.annotations.media.ArraySchema".to_string()
}

fn default_companion_suffix() -> String {
    "Custom".to_string()
}

fn default_media_types() -> Vec<String> {
    strings(&["application/json", "application/hal+json"])
}

fn default_reserved_methods() -> Vec<String> {
    strings(&[
        "findById",
        "findAll",
        "findAllById",
        "existsById",
        "count",
        "save",
        "saveAll",
        "delete",
        "deleteById",
        "deleteAll",
        "deleteAllById",
        "update",
        "patch",
    ])
}

fn default_finder_pattern() -> String {
    r"^(find|read|get|query|search|stream|count|exists)\w*By".to_string()
}

fn default_remover_pattern() -> String {
    r"^(delete|remove)\w*By".to_string()
}

impl EnrichConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Compile the finder and remover name patterns
    /// @ai:effects pure
    pub fn method_patterns(&self) -> Result<(Regex, Regex)> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source: e,
            })
        };
        Ok((
            compile(&self.policy.finder_pattern)?,
            compile(&self.policy.remover_pattern)?,
        ))
    }

    pub fn is_reserved(&self, method_name: &str) -> bool {
        self.policy.reserved_methods.iter().any(|m| m == method_name)
    }
}

impl BaseCatalog {
    /// @ai:intent Classify a supertype by its simple name
    /// @ai:example ("PagingAndSortingRepository") -> Some(Crud)
    /// @ai:effects pure
    pub fn kind_of(&self, name: &str) -> Option<BaseKind> {
        let simple = crate::ast::simple_name_of(name);
        let contains = |names: &[String]| names.iter().any(|n| crate::ast::simple_name_of(n) == simple);
        if contains(&self.crud) {
            Some(BaseKind::Crud)
        } else if contains(&self.predicate) {
            Some(BaseKind::Predicate)
        } else if contains(&self.plain) {
            Some(BaseKind::Plain)
        } else {
            None
        }
    }
}

impl AnnotationCatalog {
    pub fn verbs(&self) -> [&str; 5] {
        [&self.get, &self.post, &self.put, &self.patch, &self.delete]
    }

    /// @ai:intent Every annotation class the synthesizers may emit
    pub fn all(&self) -> Vec<&str> {
        vec![
            &self.path,
            &self.get,
            &self.post,
            &self.put,
            &self.patch,
            &self.delete,
            &self.path_param,
            &self.query_param,
            &self.parameter,
            &self.operation,
            &self.request_body,
            &self.api_response,
            &self.content,
            &self.schema,
            &self.array_schema,
        ]
    }
}
