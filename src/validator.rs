//! # Schema Validator Module
//!
//! Compiles the JSON schemas produced by field classification into
//! [`jsonschema::Validator`]s, once, at registration time.
//!
//! ## Formats
//!
//! Built-in JSON Schema formats (`email`, `date-time`, `uuid`, ...) are always
//! checked. Extra string formats are registered on a [`FormatRegistry`] owned by
//! the router; only validators compiled after a format is added know about it,
//! so formats must be registered before the operations that use them.
//!
//! ## Thread Safety
//!
//! A [`CompiledSchema`] is immutable after construction and wraps its validator in
//! an `Arc`, so operations can be shared across request threads without locking.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

/// A string format checker.
pub type FormatFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Custom string formats available to schema compilation.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<(String, FormatFn)>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.formats.iter().map(|(name, _)| name))
            .finish()
    }
}

impl FormatRegistry {
    /// Register `name`; a later registration of the same name replaces the earlier one.
    pub fn add(&mut self, name: &str, check: FormatFn) {
        self.formats.retain(|(n, _)| n != name);
        self.formats.push((name.to_string(), check));
        debug!(format = %name, "Registered custom format");
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.formats.iter().any(|(n, _)| n == name)
    }

    /// Compile `schema` with every registered format enabled.
    ///
    /// # Errors
    ///
    /// Returns the compiler's message when `schema` is not a valid JSON Schema.
    pub fn compile(&self, schema: Value) -> Result<CompiledSchema, String> {
        let mut options = jsonschema::options().should_validate_formats(true);
        for (name, check) in &self.formats {
            let check = Arc::clone(check);
            options = options.with_format(name.clone(), move |s: &str| check(s));
        }
        let validator = options.build(&schema).map_err(|e| e.to_string())?;
        Ok(CompiledSchema {
            schema,
            validator: Arc::new(validator),
        })
    }
}

/// A schema together with its compiled validator.
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Value,
    validator: Arc<jsonschema::Validator>,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// The source schema, for documentation.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }

    /// Validate `value`, joining every violation into one message.
    ///
    /// # Errors
    ///
    /// Returns `"; "`-separated violation messages when `value` does not conform.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if self.validator.is_valid(value) {
            return Ok(());
        }
        let issues: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                let at = e.instance_path().to_string();
                if at.is_empty() {
                    e.to_string()
                } else {
                    format!("{at}: {e}")
                }
            })
            .collect();
        Err(issues.join("; "))
    }
}
