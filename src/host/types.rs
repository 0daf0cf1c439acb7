//! Live host type model.
//!
//! These types describe what is actually loaded in the host process: concrete types only, no
//! generic placeholders. A [`HostTypeDef`] carries the member surface the matcher searches
//! when deciding whether a compiled reference still resolves.

use std::fmt;

use crate::{
    host::HostValue,
    symbols::{FieldRef, MethodRef, NamedType, TypeRef},
};

/// A type loaded in the host process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    /// A named (possibly generic, possibly nested) type
    Named {
        /// Dotted namespace, empty for nested types
        namespace: String,
        /// Simple name including any arity suffix
        name: String,
        /// Assembly declaring the type
        assembly: Option<String>,
        /// Enclosing type for nested types
        declaring: Option<Box<HostType>>,
        /// Concrete generic arguments of a constructed generic type
        generic_args: Vec<HostType>,
    },
    /// An array type
    Array {
        /// Element type
        element: Box<HostType>,
        /// Number of dimensions
        rank: u32,
    },
    /// A managed reference
    ByRef(Box<HostType>),
    /// An unmanaged pointer
    Pointer(Box<HostType>),
}

impl HostType {
    /// A non-generic top-level type.
    #[must_use]
    pub fn named(namespace: &str, name: &str) -> Self {
        HostType::Named {
            namespace: namespace.to_string(),
            name: name.to_string(),
            assembly: None,
            declaring: None,
            generic_args: Vec::new(),
        }
    }

    /// A constructed generic type.
    #[must_use]
    pub fn generic(namespace: &str, name: &str, args: Vec<HostType>) -> Self {
        HostType::Named {
            namespace: namespace.to_string(),
            name: name.to_string(),
            assembly: None,
            declaring: None,
            generic_args: args,
        }
    }

    /// A type nested inside `outer`.
    #[must_use]
    pub fn nested(outer: HostType, name: &str) -> Self {
        HostType::Named {
            namespace: String::new(),
            name: name.to_string(),
            assembly: None,
            declaring: Some(Box::new(outer)),
            generic_args: Vec::new(),
        }
    }

    /// A single-dimension array.
    #[must_use]
    pub fn array(element: HostType) -> Self {
        HostType::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// A managed reference.
    #[must_use]
    pub fn by_ref(inner: HostType) -> Self {
        HostType::ByRef(Box::new(inner))
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

    /// Records the declaring assembly. No-op for non-named types.
    #[must_use]
    pub fn in_assembly(mut self, name: &str) -> Self {
        if let HostType::Named { assembly, .. } = &mut self {
            *assembly = Some(name.to_string());
        }
        self
    }

    /// The declaring assembly, inherited from the enclosing type for nested types.
    #[must_use]
    pub fn assembly(&self) -> Option<&str> {
        match self {
            HostType::Named {
                assembly, declaring, ..
            } => assembly
                .as_deref()
                .or_else(|| declaring.as_ref().and_then(|outer| outer.assembly())),
            HostType::Array { element, .. } => element.assembly(),
            HostType::ByRef(inner) | HostType::Pointer(inner) => inner.assembly(),
        }
    }

    /// The namespace, taken from the outermost enclosing type for nested types.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            HostType::Named {
                namespace, declaring, ..
            } => match declaring {
                Some(outer) => outer.namespace(),
                None => namespace,
            },
            HostType::Array { element, .. } => element.namespace(),
            HostType::ByRef(inner) | HostType::Pointer(inner) => inner.namespace(),
        }
    }

    /// The simple name, decorated for arrays, references and pointers.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_type_ref().name()
    }

    /// Concrete generic arguments; empty unless this is a constructed generic type.
    #[must_use]
    pub fn generic_args(&self) -> &[HostType] {
        match self {
            HostType::Named { generic_args, .. } => generic_args,
            _ => &[],
        }
    }

    /// The definition name used as the host API lookup key.
    #[must_use]
    pub fn definition_name(&self) -> Option<String> {
        self.to_type_ref().definition_name()
    }

    /// Produces the descriptor of this live type.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            HostType::Named { .. } => TypeRef::Named(self.to_named()),
            HostType::Array { element, rank } => TypeRef::Array {
                element: Box::new(element.to_type_ref()),
                rank: *rank,
            },
            HostType::ByRef(inner) => TypeRef::ByRef(Box::new(inner.to_type_ref())),
            HostType::Pointer(inner) => TypeRef::Pointer(Box::new(inner.to_type_ref())),
        }
    }

    fn to_named(&self) -> NamedType {
        match self {
            HostType::Named {
                namespace,
                name,
                assembly,
                declaring,
                generic_args,
            } => NamedType {
                namespace: namespace.clone(),
                name: name.clone(),
                declaring: declaring.as_ref().map(|outer| Box::new(outer.to_named())),
                generic_args: generic_args.iter().map(HostType::to_type_ref).collect(),
                scope: assembly.clone(),
            },
            // shapes never appear as enclosing types
            other => NamedType {
                namespace: String::new(),
                name: other.to_type_ref().to_string(),
                declaring: None,
                generic_args: Vec::new(),
                scope: None,
            },
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_type_ref())
    }
}

/// A parameter of a host method.
#[derive(Debug, Clone, PartialEq)]
pub struct HostParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: HostType,
    /// Default value, for optional parameters
    pub default: Option<HostValue>,
}

/// A method or constructor exposed by a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMethod {
    /// Method name (`.ctor` for constructors)
    pub name: String,
    /// Declared parameters
    pub parameters: Vec<HostParameter>,
    /// Return type
    pub return_type: HostType,
    /// Whether the method is static
    pub is_static: bool,
}

impl HostMethod {
    /// An instance method with no parameters.
    #[must_use]
    pub fn new(name: &str, return_type: HostType) -> Self {
        HostMethod {
            name: name.to_string(),
            parameters: Vec::new(),
            return_type,
            is_static: false,
        }
    }

    /// An instance constructor with no parameters.
    #[must_use]
    pub fn constructor() -> Self {
        Self::new(".ctor", HostType::void())
    }

    /// Appends a required parameter.
    #[must_use]
    pub fn param(mut self, name: &str, ty: HostType) -> Self {
        self.parameters.push(HostParameter {
            name: name.to_string(),
            ty,
            default: None,
        });
        self
    }

    /// Appends an optional parameter with a default value.
    #[must_use]
    pub fn optional_param(mut self, name: &str, ty: HostType, default: HostValue) -> Self {
        self.parameters.push(HostParameter {
            name: name.to_string(),
            ty,
            default: Some(default),
        });
        self
    }

    /// Marks the method static.
    #[must_use]
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Returns `true` for constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// Number of leading parameters without a default value.
    #[must_use]
    pub fn required_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .rposition(|param| param.default.is_none())
            .map_or(0, |last| last + 1)
    }

    /// Builds the descriptor a compiled call to this method on `declaring` would carry.
    #[must_use]
    pub fn to_method_ref(&self, declaring: &HostType) -> MethodRef {
        MethodRef {
            declaring_type: declaring.to_type_ref(),
            name: self.name.clone(),
            return_type: self.return_type.to_type_ref(),
            parameters: self.parameters.iter().map(|p| p.ty.to_type_ref()).collect(),
            has_this: !self.is_static,
            generic_args: Vec::new(),
        }
    }
}

/// A field exposed by a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct HostField {
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: HostType,
    /// Whether the field is static
    pub is_static: bool,
    /// Literal value for `const` fields
    pub constant: Option<HostValue>,
}

impl HostField {
    /// An instance field.
    #[must_use]
    pub fn new(name: &str, field_type: HostType) -> Self {
        HostField {
            name: name.to_string(),
            field_type,
            is_static: false,
            constant: None,
        }
    }

    /// Marks the field static.
    #[must_use]
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Builds the descriptor a compiled access to this field on `declaring` would carry.
    #[must_use]
    pub fn to_field_ref(&self, declaring: &HostType) -> FieldRef {
        FieldRef {
            declaring_type: declaring.to_type_ref(),
            name: self.name.clone(),
            field_type: self.field_type.to_type_ref(),
        }
    }
}

/// A property exposed by a host type; its accessors are also listed as methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProperty {
    /// Property name
    pub name: String,
    /// Property type
    pub property_type: HostType,
    /// Whether a getter exists
    pub can_read: bool,
    /// Whether a setter exists
    pub can_write: bool,
    /// Whether the property is static
    pub is_static: bool,
}

impl HostProperty {
    /// Name of the getter method.
    #[must_use]
    pub fn getter_name(&self) -> String {
        format!("get_{}", self.name)
    }

    /// Name of the setter method.
    #[must_use]
    pub fn setter_name(&self) -> String {
        format!("set_{}", self.name)
    }
}

/// The member surface of a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTypeDef {
    /// The type itself
    pub ty: HostType,
    /// The base type, if any
    pub base: Option<HostType>,
    /// Instance constructors
    pub constructors: Vec<HostMethod>,
    /// Declared methods, including property accessors
    pub methods: Vec<HostMethod>,
    /// Declared fields
    pub fields: Vec<HostField>,
    /// Declared properties
    pub properties: Vec<HostProperty>,
}

impl HostTypeDef {
    /// An empty definition of `ty`.
    #[must_use]
    pub fn new(ty: HostType) -> Self {
        HostTypeDef {
            ty,
            base: None,
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn extends(mut self, base: HostType) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds a constructor.
    #[must_use]
    pub fn constructor(mut self, ctor: HostMethod) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, method: HostMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an instance property together with its accessor methods.
    #[must_use]
    pub fn property(mut self, name: &str, ty: HostType, can_read: bool, can_write: bool) -> Self {
        let property = HostProperty {
            name: name.to_string(),
            property_type: ty.clone(),
            can_read,
            can_write,
            is_static: false,
        };
        if can_read {
            self.methods
                .push(HostMethod::new(&property.getter_name(), ty.clone()));
        }
        if can_write {
            self.methods
                .push(HostMethod::new(&property.setter_name(), HostType::void()).param("value", ty));
        }
        self.properties.push(property);
        self
    }

    /// Methods declared with `name`, in declaration order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HostMethod> + 'a {
        self.methods.iter().filter(move |method| method.name == name)
    }

    /// The field declared with `name`.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&HostField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The property declared with `name`.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&HostProperty> {
        self.properties.iter().find(|property| property.name == name)
    }
}
