//! Symbol descriptors: the compiled-code side of every comparison.
//!
//! A descriptor names a type, field or method the way an instruction operand refers to it,
//! without requiring the referenced symbol to be loaded. Descriptors are plain owned values:
//! they are built when a body is decoded (or by a rule constructing a replacement), compared
//! structurally by [`crate::symbols::matcher`], and dropped afterwards.
//!
//! # Naming
//!
//! `Display` renders descriptors in the conventional CIL full-name format:
//!
//! - `System.Collections.Generic.List`1<System.String>` for generic instances
//! - `StardewValley.Menus.ShopMenu/Tab` for nested types
//! - `!0` / `!!0` for unnamed type / method generic parameters
//! - `System.String StardewValley.WorldDate::get_Season()` for methods
//!
//! The rendered name is for diagnostics and map keys only; identity is decided by the
//! matcher, never by comparing strings.

use std::fmt;

use strum::{Display, EnumIter};

/// The kind of symbol a descriptor identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SymbolKind {
    /// A type
    #[strum(serialize = "type")]
    Type,
    /// A field
    #[strum(serialize = "field")]
    Field,
    /// A method (including constructors)
    #[strum(serialize = "method")]
    Method,
}

/// Whether a generic parameter is declared by a type or by a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// Declared by the enclosing type (`!n`)
    Type,
    /// Declared by the method (`!!n`)
    Method,
}

/// A generic parameter placeholder, e.g. the `!0` in `List`1<!0>`.
///
/// Compiled references usually only know the position; definitions usually know the name
/// (`TKey`). Exact comparison requires both to agree; heuristic comparison lets a positional
/// placeholder stand in for a named one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParam {
    /// The declaring scope
    pub owner: GenericOwner,
    /// Position within the owner's generic parameter list
    pub index: u32,
    /// Declared name, if known
    pub name: Option<String>,
}

impl fmt::Display for GenericParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.owner) {
            (Some(name), _) => f.write_str(name),
            (None, GenericOwner::Type) => write!(f, "!{}", self.index),
            (None, GenericOwner::Method) => write!(f, "!!{}", self.index),
        }
    }
}

/// A type identified by namespace and name, optionally nested and optionally a generic instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// Dotted namespace (empty for nested types' inner part and the global namespace)
    pub namespace: String,
    /// Simple name, including the arity suffix for generic types (`List`1`)
    pub name: String,
    /// Enclosing type for nested types
    pub declaring: Option<Box<NamedType>>,
    /// Generic arguments; empty unless this is a generic instance
    pub generic_args: Vec<TypeRef>,
    /// Name of the assembly the reference resolves against, if recorded
    pub scope: Option<String>,
}

impl NamedType {
    /// The outermost namespace of this type, walking out of nested declarations.
    #[must_use]
    pub fn effective_namespace(&self) -> &str {
        match &self.declaring {
            Some(outer) => outer.effective_namespace(),
            None => &self.namespace,
        }
    }

    fn write_definition_name(&self, f: &mut impl fmt::Write) -> fmt::Result {
        match &self.declaring {
            Some(outer) => {
                outer.write_definition_name(f)?;
                write!(f, "/{}", self.name)
            }
            None if self.namespace.is_empty() => f.write_str(&self.name),
            None => write!(f, "{}.{}", self.namespace, self.name),
        }
    }
}

/// A reference to a type, as it appears in compiled code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A named (possibly generic, possibly nested) type
    Named(NamedType),
    /// A generic parameter placeholder
    GenericParam(GenericParam),
    /// An array of `element` with `rank` dimensions
    Array {
        /// Element type
        element: Box<TypeRef>,
        /// Number of dimensions (1 for `T[]`)
        rank: u32,
    },
    /// A managed reference (`T&`)
    ByRef(Box<TypeRef>),
    /// An unmanaged pointer (`T*`)
    Pointer(Box<TypeRef>),
}

impl TypeRef {
    /// A non-generic top-level type.
    #[must_use]
    pub fn named(namespace: &str, name: &str) -> Self {
        TypeRef::Named(NamedType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            declaring: None,
            generic_args: Vec::new(),
            scope: None,
        })
    }

    /// A generic instance, e.g. `generic("System.Collections.Generic", "List`1", vec![string])`.
    #[must_use]
    pub fn generic(namespace: &str, name: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Named(NamedType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            declaring: None,
            generic_args: args,
            scope: None,
        })
    }

    /// A type nested inside `outer`.
    ///
    /// Returns `None` if `outer` is not a named type.
    #[must_use]
    pub fn nested(outer: TypeRef, name: &str) -> Option<Self> {
        match outer {
            TypeRef::Named(outer) => Some(TypeRef::Named(NamedType {
                namespace: String::new(),
                name: name.to_string(),
                declaring: Some(Box::new(outer)),
                generic_args: Vec::new(),
                scope: None,
            })),
            _ => None,
        }
    }

    /// An unnamed type-level generic parameter (`!index`).
    #[must_use]
    pub fn type_param(index: u32) -> Self {
        TypeRef::GenericParam(GenericParam {
            owner: GenericOwner::Type,
            index,
            name: None,
        })
    }

    /// An unnamed method-level generic parameter (`!!index`).
    #[must_use]
    pub fn method_param(index: u32) -> Self {
        TypeRef::GenericParam(GenericParam {
            owner: GenericOwner::Method,
            index,
            name: None,
        })
    }

    /// A named generic parameter, as found on definitions (`TKey`).
    #[must_use]
    pub fn named_param(owner: GenericOwner, index: u32, name: &str) -> Self {
        TypeRef::GenericParam(GenericParam {
            owner,
            index,
            name: Some(name.to_string()),
        })
    }

    /// A single-dimension array of `element`.
    #[must_use]
    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// A managed reference to `inner`.
    #[must_use]
    pub fn by_ref(inner: TypeRef) -> Self {
        TypeRef::ByRef(Box::new(inner))
    }

    /// `System.Void`
    #[must_use]
    pub fn void() -> Self {
        Self::named("System", "Void")
    }

    /// `System.Boolean`
    #[must_use]
    pub fn boolean() -> Self {
        Self::named("System", "Boolean")
    }

    /// `System.Int32`
    #[must_use]
    pub fn int32() -> Self {
        Self::named("System", "Int32")
    }

    /// `System.Int64`
    #[must_use]
    pub fn int64() -> Self {
        Self::named("System", "Int64")
    }

    /// `System.String`
    #[must_use]
    pub fn string() -> Self {
        Self::named("System", "String")
    }

    /// `System.Object`
    #[must_use]
    pub fn object() -> Self {
        Self::named("System", "Object")
    }

    /// Attaches the assembly this reference resolves against. No-op for non-named types.
    #[must_use]
    pub fn with_scope(mut self, scope: &str) -> Self {
        if let TypeRef::Named(named) = &mut self {
            named.scope = Some(scope.to_string());
        }
        self
    }

    /// The namespace as seen by a name-based lookup.
    ///
    /// Arrays, references and pointers report their element's namespace; generic parameters
    /// have none. Nested types report the namespace of their outermost enclosing type.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            TypeRef::Named(named) => named.effective_namespace(),
            TypeRef::GenericParam(_) => "",
            TypeRef::Array { element, .. } => element.namespace(),
            TypeRef::ByRef(inner) | TypeRef::Pointer(inner) => inner.namespace(),
        }
    }

    /// The simple name, decorated for arrays (`Int32[]`), references (`Int32&`) and pointers.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            TypeRef::Named(named) => named.name.clone(),
            TypeRef::GenericParam(param) => param.to_string(),
            TypeRef::Array { element, rank } => format!("{}{}", element.name(), array_suffix(*rank)),
            TypeRef::ByRef(inner) => format!("{}&", inner.name()),
            TypeRef::Pointer(inner) => format!("{}*", inner.name()),
        }
    }

    /// The generic arguments of a generic instance; empty otherwise.
    #[must_use]
    pub fn generic_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named(named) => &named.generic_args,
            _ => &[],
        }
    }

    /// Returns `true` for generic instances such as `List`1<String>`.
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        !self.generic_args().is_empty()
    }

    /// Returns `true` if this is, or contains, a generic parameter placeholder.
    #[must_use]
    pub fn contains_generic_param(&self) -> bool {
        match self {
            TypeRef::GenericParam(_) => true,
            TypeRef::Named(named) => {
                named.generic_args.iter().any(TypeRef::contains_generic_param)
                    || named
                        .declaring
                        .as_ref()
                        .is_some_and(|outer| outer.generic_args.iter().any(TypeRef::contains_generic_param))
            }
            TypeRef::Array { element, .. } => element.contains_generic_param(),
            TypeRef::ByRef(inner) | TypeRef::Pointer(inner) => inner.contains_generic_param(),
        }
    }

    /// The name of the type definition this reference instantiates, without generic arguments.
    ///
    /// This is the key used to look types up in the host API table. Returns `None` for
    /// placeholders, arrays, references and pointers.
    #[must_use]
    pub fn definition_name(&self) -> Option<String> {
        match self {
            TypeRef::Named(named) => {
                let mut name = String::new();
                named.write_definition_name(&mut name).ok()?;
                Some(name)
            }
            _ => None,
        }
    }

    /// The assembly this reference resolves against, if recorded.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            TypeRef::Named(named) => named
                .scope
                .as_deref()
                .or_else(|| named.declaring.as_ref().and_then(|outer| outer.scope.as_deref())),
            TypeRef::Array { element, .. } => element.scope(),
            TypeRef::ByRef(inner) | TypeRef::Pointer(inner) => inner.scope(),
            TypeRef::GenericParam(_) => None,
        }
    }
}

pub(crate) fn array_suffix(rank: u32) -> String {
    if rank <= 1 {
        "[]".to_string()
    } else {
        format!("[{}]", ",".repeat(rank as usize - 1))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(named) => {
                named.write_definition_name(f)?;
                if !named.generic_args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in named.generic_args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::GenericParam(param) => write!(f, "{param}"),
            TypeRef::Array { element, rank } => write!(f, "{element}{}", array_suffix(*rank)),
            TypeRef::ByRef(inner) => write!(f, "{inner}&"),
            TypeRef::Pointer(inner) => write!(f, "{inner}*"),
        }
    }
}

/// A reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// The type declaring the field
    pub declaring_type: TypeRef,
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: TypeRef,
}

impl FieldRef {
    /// Creates a field reference.
    #[must_use]
    pub fn new(declaring_type: TypeRef, name: &str, field_type: TypeRef) -> Self {
        FieldRef {
            declaring_type,
            name: name.to_string(),
            field_type,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}", self.field_type, self.declaring_type, self.name)
    }
}

/// A reference to a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The type declaring the method
    pub declaring_type: TypeRef,
    /// Method name (`.ctor` / `.cctor` for constructors)
    pub name: String,
    /// Return type (`System.Void` for constructors)
    pub return_type: TypeRef,
    /// Parameter types, excluding the implicit `this`
    pub parameters: Vec<TypeRef>,
    /// Whether the method takes an implicit `this`
    pub has_this: bool,
    /// Generic arguments of a generic method instantiation
    pub generic_args: Vec<TypeRef>,
}

impl MethodRef {
    /// Creates a static method reference.
    #[must_use]
    pub fn new(declaring_type: TypeRef, name: &str, return_type: TypeRef, parameters: Vec<TypeRef>) -> Self {
        MethodRef {
            declaring_type,
            name: name.to_string(),
            return_type,
            parameters,
            has_this: false,
            generic_args: Vec::new(),
        }
    }

    /// Creates an instance constructor reference.
    #[must_use]
    pub fn constructor(declaring_type: TypeRef, parameters: Vec<TypeRef>) -> Self {
        MethodRef {
            declaring_type,
            name: ".ctor".to_string(),
            return_type: TypeRef::void(),
            parameters,
            has_this: true,
            generic_args: Vec::new(),
        }
    }

    /// Marks the method as an instance method.
    #[must_use]
    pub fn instance(mut self) -> Self {
        self.has_this = true;
        self
    }

    /// Returns `true` for instance and type constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}", self.return_type, self.declaring_type, self.name)?;
        if !self.generic_args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        f.write_str("(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Any symbol an instruction can reference through a metadata token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A type reference
    Type(TypeRef),
    /// A field reference
    Field(FieldRef),
    /// A method reference
    Method(MethodRef),
}

impl Symbol {
    /// The kind of symbol.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Type(_) => SymbolKind::Type,
            Symbol::Field(_) => SymbolKind::Field,
            Symbol::Method(_) => SymbolKind::Method,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Type(ty) => write!(f, "{ty}"),
            Symbol::Field(field) => write!(f, "{field}"),
            Symbol::Method(method) => write!(f, "{method}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_generic_instance() {
        let furniture = TypeRef::named("StardewValley.Objects", "Furniture");
        let collection = TypeRef::generic("Netcode", "NetCollection`1", vec![furniture]);

        assert_eq!(
            collection.to_string(),
            "Netcode.NetCollection`1<StardewValley.Objects.Furniture>"
        );
        assert_eq!(collection.definition_name().unwrap(), "Netcode.NetCollection`1");
        assert!(collection.is_generic_instance());
        assert!(!collection.contains_generic_param());
    }

    #[test]
    fn display_nested_and_shapes() {
        let outer = TypeRef::named("StardewValley.Menus", "ShopMenu");
        let nested = TypeRef::nested(outer, "Tab").unwrap();

        assert_eq!(nested.to_string(), "StardewValley.Menus.ShopMenu/Tab");
        assert_eq!(nested.namespace(), "StardewValley.Menus");
        assert_eq!(nested.name(), "Tab");

        let array = TypeRef::array(TypeRef::int32());
        assert_eq!(array.to_string(), "System.Int32[]");
        assert_eq!(array.name(), "Int32[]");
        assert_eq!(array.namespace(), "System");
        assert!(array.definition_name().is_none());

        let matrix = TypeRef::Array {
            element: Box::new(TypeRef::int32()),
            rank: 3,
        };
        assert_eq!(matrix.to_string(), "System.Int32[,,]");

        assert_eq!(TypeRef::by_ref(TypeRef::string()).to_string(), "System.String&");
        assert!(TypeRef::nested(TypeRef::type_param(0), "X").is_none());
    }

    #[test]
    fn display_generic_params() {
        assert_eq!(TypeRef::type_param(1).to_string(), "!1");
        assert_eq!(TypeRef::method_param(0).to_string(), "!!0");
        assert_eq!(
            TypeRef::named_param(GenericOwner::Type, 0, "TKey").to_string(),
            "TKey"
        );

        let dictionary = TypeRef::generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![
                TypeRef::type_param(0),
                TypeRef::generic("Netcode", "NetRef`1", vec![TypeRef::type_param(1)]),
            ],
        );
        assert_eq!(
            dictionary.to_string(),
            "System.Collections.Generic.Dictionary`2<!0,Netcode.NetRef`1<!1>>"
        );
        assert!(dictionary.contains_generic_param());
    }

    #[test]
    fn display_members() {
        let date = TypeRef::named("StardewValley", "WorldDate");
        let getter = MethodRef::new(date.clone(), "get_Season", TypeRef::string(), vec![]).instance();
        assert_eq!(
            getter.to_string(),
            "System.String StardewValley.WorldDate::get_Season()"
        );
        assert!(!getter.is_constructor());

        let ctor = MethodRef::constructor(date.clone(), vec![TypeRef::int32(), TypeRef::string()]);
        assert_eq!(
            ctor.to_string(),
            "System.Void StardewValley.WorldDate::.ctor(System.Int32,System.String)"
        );
        assert!(ctor.is_constructor());
        assert!(ctor.has_this);

        let field = FieldRef::new(date, "seasonKey", TypeRef::string());
        assert_eq!(field.to_string(), "System.String StardewValley.WorldDate::seasonKey");
        assert_eq!(Symbol::Field(field).kind(), SymbolKind::Field);
        assert_eq!(SymbolKind::Method.to_string(), "method");
    }

    #[test]
    fn scope_is_inherited_from_outer_type() {
        let outer = TypeRef::named("StardewValley", "Game1").with_scope("Stardew Valley");
        let nested = TypeRef::nested(outer, "Inner").unwrap();
        assert_eq!(nested.scope(), Some("Stardew Valley"));
        assert_eq!(TypeRef::array(nested).scope(), Some("Stardew Valley"));
        assert_eq!(TypeRef::type_param(0).scope(), None);
    }
}
