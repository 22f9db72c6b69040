//! Field declarations.
//!
//! Instead of inspecting a struct at runtime, each bindable struct describes its
//! fields once through [`Fields::describe`]. `#[derive(Params)]` writes that
//! function; it can also be written by hand:
//!
//! ```rust
//! use typeroute::params::{FieldSet, Fields};
//!
//! struct Page {
//!     size: u32,
//!     cursor: Option<String>,
//! }
//!
//! impl Fields for Page {
//!     fn describe(fields: &mut FieldSet) {
//!         fields.plain::<u32>("size").default_literal("20").maximum(100.0);
//!         fields.optional::<String>("cursor");
//!     }
//! }
//! ```
//!
//! Embedded structs are flattened in declaration order; each flattened entry keeps
//! the path of identifiers leading to it so the loader can write nested values.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::value::{literal, ParamValue};

/// Embedding deeper than this is reported as a configuration error.
pub const MAX_EMBED_DEPTH: usize = 16;

/// A struct whose fields can be declared to the classifier.
pub trait Fields {
    fn describe(fields: &mut FieldSet);
}

impl<T: Fields + ?Sized> Fields for Box<T> {
    fn describe(fields: &mut FieldSet) {
        T::describe(fields);
    }
}

/// Wrapping recognised on a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `T`
    Plain,
    /// `Option<T>`
    Optional,
    /// `Vec<T>`
    Repeated,
}

/// One declared field, before classification.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub(crate) origin: Vec<String>,
    pub(crate) arity: Arity,
    pub(crate) item_type: &'static str,
    pub(crate) item_schema: fn() -> Value,
    pub(crate) decode: fn(&str) -> anyhow::Result<Value>,
    pub(crate) check: fn(&Value) -> anyhow::Result<()>,
    pub(crate) name: Option<String>,
    pub(crate) default: Option<String>,
    pub(crate) example: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) constraints: Map<String, Value>,
}

fn check_as<T: DeserializeOwned>(value: &Value) -> anyhow::Result<()> {
    T::deserialize(value)?;
    Ok(())
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

impl FieldDecl {
    /// The declared identifier (last element of the origin path).
    #[must_use]
    pub fn ident(&self) -> &str {
        self.origin.last().map_or("", String::as_str)
    }

    /// Override the wire name.
    pub fn rename(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Default value as a JSON literal, e.g. `"\"all\""` or `"[1, 2]"`.
    pub fn default_literal(&mut self, json: &str) -> &mut Self {
        self.default = Some(json.to_string());
        self
    }

    /// Example value as a JSON literal.
    pub fn example(&mut self, json: &str) -> &mut Self {
        self.example = Some(json.to_string());
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn minimum(&mut self, n: f64) -> &mut Self {
        self.constraints.insert("minimum".into(), number(n));
        self
    }

    pub fn maximum(&mut self, n: f64) -> &mut Self {
        self.constraints.insert("maximum".into(), number(n));
        self
    }

    pub fn min_length(&mut self, n: u64) -> &mut Self {
        self.constraints.insert("minLength".into(), Value::from(n));
        self
    }

    pub fn max_length(&mut self, n: u64) -> &mut Self {
        self.constraints.insert("maxLength".into(), Value::from(n));
        self
    }

    pub fn pattern(&mut self, regex: &str) -> &mut Self {
        self.constraints
            .insert("pattern".into(), Value::String(regex.to_string()));
        self
    }

    /// A named string format, built in (`email`, `date-time`, ...) or registered
    /// with [`Router::add_format`](crate::Router::add_format).
    pub fn format(&mut self, name: &str) -> &mut Self {
        self.constraints
            .insert("format".into(), Value::String(name.to_string()));
        self
    }

    /// Restrict values to an explicit list of JSON literals.
    pub fn one_of(&mut self, values: &[Value]) -> &mut Self {
        self.constraints
            .insert("enum".into(), Value::Array(values.to_vec()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flatten,
    Shallow,
}

/// Ordered list of declared fields, built by [`Fields::describe`].
#[derive(Debug)]
pub struct FieldSet {
    mode: Mode,
    prefix: Vec<String>,
    fields: Vec<FieldDecl>,
    too_deep: Option<String>,
}

impl FieldSet {
    /// Collect the flattened declarations of `F`.
    #[must_use]
    pub fn of<F: Fields + ?Sized>() -> Self {
        let mut set = Self::new(Mode::Flatten);
        F::describe(&mut set);
        set
    }

    /// Collect the top-level declarations of `F`, keeping embedded structs as
    /// single nested entries. Used for body schemas.
    #[must_use]
    pub(crate) fn shallow<F: Fields + ?Sized>() -> Self {
        let mut set = Self::new(Mode::Shallow);
        F::describe(&mut set);
        set
    }

    fn new(mode: Mode) -> Self {
        Self {
            mode,
            prefix: Vec::new(),
            fields: Vec::new(),
            too_deep: None,
        }
    }

    fn push(
        &mut self,
        ident: &str,
        arity: Arity,
        item_type: &'static str,
        item_schema: fn() -> Value,
        decode: fn(&str) -> anyhow::Result<Value>,
        check: fn(&Value) -> anyhow::Result<()>,
    ) -> &mut FieldDecl {
        let mut origin = self.prefix.clone();
        origin.push(ident.strip_prefix("r#").unwrap_or(ident).to_string());
        self.fields.push(FieldDecl {
            origin,
            arity,
            item_type,
            item_schema,
            decode,
            check,
            name: None,
            default: None,
            example: None,
            description: None,
            constraints: Map::new(),
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    /// A required field of type `T` (unless it gets a default).
    pub fn plain<T: ParamValue>(&mut self, ident: &str) -> &mut FieldDecl {
        self.push(
            ident,
            Arity::Plain,
            std::any::type_name::<T>(),
            T::schema,
            T::decode_param,
            check_as::<T>,
        )
    }

    /// An `Option<T>` field.
    pub fn optional<T: ParamValue>(&mut self, ident: &str) -> &mut FieldDecl {
        self.push(
            ident,
            Arity::Optional,
            std::any::type_name::<T>(),
            T::schema,
            T::decode_param,
            check_as::<T>,
        )
    }

    /// A `Vec<T>` field; consumes every value under its name.
    pub fn repeated<T: ParamValue>(&mut self, ident: &str) -> &mut FieldDecl {
        self.push(
            ident,
            Arity::Repeated,
            std::any::type_name::<T>(),
            T::schema,
            T::decode_param,
            check_as::<Vec<T>>,
        )
    }

    /// Embed the fields of `E` under `ident`.
    pub fn embed<E: Fields + DeserializeOwned + 'static>(&mut self, ident: &str) {
        let ident = ident.strip_prefix("r#").unwrap_or(ident);
        if self.mode == Mode::Shallow {
            self.push(
                ident,
                Arity::Plain,
                std::any::type_name::<E>(),
                super::object_schema::<E>,
                literal::<E>,
                check_as::<E>,
            );
            return;
        }
        if self.prefix.len() >= MAX_EMBED_DEPTH {
            if self.too_deep.is_none() {
                let mut path = self.prefix.clone();
                path.push(ident.to_string());
                self.too_deep = Some(path.join("."));
            }
            return;
        }
        self.prefix.push(ident.to_string());
        E::describe(self);
        self.prefix.pop();
    }

    #[must_use]
    pub fn decls(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub(crate) fn into_parts(self) -> (Vec<FieldDecl>, Option<String>) {
        (self.fields, self.too_deep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Page {
        size: u32,
        cursor: Option<String>,
    }

    impl Fields for Page {
        fn describe(fields: &mut FieldSet) {
            fields.plain::<u32>("size").default_literal("20");
            fields.optional::<String>("cursor");
        }
    }

    struct Query;

    impl Fields for Query {
        fn describe(fields: &mut FieldSet) {
            fields.plain::<i64>("id");
            fields.embed::<Page>("page");
            fields.repeated::<String>("r#type");
        }
    }

    #[test]
    fn test_embedding_flattens_in_declaration_order() {
        let set = FieldSet::of::<Query>();
        let origins: Vec<String> = set.decls().iter().map(|d| d.origin.join(".")).collect();
        assert_eq!(origins, vec!["id", "page.size", "page.cursor", "type"]);
        assert_eq!(set.decls()[3].arity, Arity::Repeated);
        assert_eq!(set.decls()[1].ident(), "size");
    }

    #[test]
    fn test_shallow_keeps_embedded_struct_whole() {
        let set = FieldSet::shallow::<Query>();
        let origins: Vec<&str> = set.decls().iter().map(FieldDecl::ident).collect();
        assert_eq!(origins, vec!["id", "page", "type"]);
    }

    struct Boxed;

    impl Fields for Boxed {
        fn describe(fields: &mut FieldSet) {
            fields.embed::<Box<Page>>("page");
        }
    }

    #[test]
    fn test_boxed_embed_flattens_like_by_value() {
        let set = FieldSet::of::<Boxed>();
        let origins: Vec<String> = set.decls().iter().map(|d| d.origin.join(".")).collect();
        assert_eq!(origins, vec!["page.size", "page.cursor"]);

        let shallow = FieldSet::shallow::<Boxed>();
        assert_eq!(shallow.decls().len(), 1);
        assert_eq!(shallow.decls()[0].ident(), "page");
    }

    struct Loop;

    impl Fields for Loop {
        fn describe(fields: &mut FieldSet) {
            fields.embed::<Page>("page");
            fields.embed::<LoopInner>("inner");
        }
    }

    #[derive(Deserialize)]
    struct LoopInner;

    impl Fields for LoopInner {
        fn describe(fields: &mut FieldSet) {
            fields.embed::<LoopInner>("inner");
        }
    }

    #[test]
    fn test_runaway_embedding_is_recorded() {
        let (decls, too_deep) = FieldSet::of::<Loop>().into_parts();
        assert_eq!(decls.len(), 2);
        assert!(too_deep.unwrap().starts_with("inner.inner"));
    }

    #[test]
    fn test_constraints_keep_integers_integral() {
        let mut set = FieldSet::of::<Page>();
        let d = &mut set.fields[0];
        d.minimum(1.0).maximum(2.5);
        assert_eq!(d.constraints["minimum"], serde_json::json!(1));
        assert_eq!(d.constraints["maximum"], serde_json::json!(2.5));
    }
}
