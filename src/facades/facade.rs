//! The facade contract and the link-level description every facade publishes.

use std::{any::Any, fmt};

use crate::{
    facades::{FACADE_ASSEMBLY, FACADE_NAMESPACE},
    host::{HostMethod, HostType, HostTypeDef, HostValue},
    symbols::{
        matcher::{has_matching_signature, is_same_type},
        MethodRef,
    },
    Error, Result,
};

/// Dispatch entry of one legacy member: receiver, then the arguments after `this`.
pub type FacadeInvoke = fn(&mut dyn Any, &[HostValue]) -> Result<Option<HostValue>>;

type ConstructBase = fn(&[HostValue]) -> Result<Box<dyn Any + Send>>;
type Substitute = fn(Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>>;
type DeclaredConstructor = fn() -> Result<Box<dyn Any + Send>>;

/// A substitute type carrying a legacy member surface over a current host type.
///
/// Implementors own an instance of [`RewriteFacade::Base`] and implement every legacy member
/// by delegating to it. Facades are link targets for the rewriter only: the declared
/// constructor [`RewriteFacade::new`] always fails with [`Error::FacadeConstructed`], and
/// instances come into existence through [`RewriteFacade::from_base`], the equivalent of the
/// runtime satisfying a redirected `newobj` through the base type's construction.
pub trait RewriteFacade: Any + Send + Sync + Sized {
    /// The current host type the facade extends.
    type Base: Any + Send + Sync;

    /// Simple name of the facade type.
    const NAME: &'static str;

    /// Wraps an existing base instance.
    fn from_base(base: Self::Base) -> Self;

    /// The wrapped base instance.
    fn base(&self) -> &Self::Base;

    /// The wrapped base instance, mutably.
    fn base_mut(&mut self) -> &mut Self::Base;

    /// Unwraps the base instance.
    fn into_base(self) -> Self::Base;

    /// Runs the base type's construction for a redirected constructor call.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if no base constructor accepts `args`.
    fn construct_base(args: &[HostValue]) -> Result<Self::Base>;

    /// Describes the facade for link resolution and dispatch.
    fn facade_type() -> FacadeType;

    /// The facade's declared constructor.
    ///
    /// # Errors
    /// Always returns [`Error::FacadeConstructed`].
    fn new() -> Result<Self> {
        Err(Error::FacadeConstructed(Self::NAME))
    }

    /// Borrows the base instance behind a dispatch receiver.
    ///
    /// The receiver may be the facade itself or a plain base instance, since a redirected
    /// call site passes whatever object the mod holds.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] for any other receiver type.
    fn base_of(receiver: &mut dyn Any) -> Result<&mut Self::Base> {
        if receiver.is::<Self>() {
            return receiver
                .downcast_mut::<Self>()
                .map(|facade| facade.base_mut())
                .ok_or_else(|| receiver_mismatch(Self::NAME));
        }
        receiver
            .downcast_mut::<Self::Base>()
            .ok_or_else(|| receiver_mismatch(Self::NAME))
    }

    /// Fully qualified descriptor of the facade type.
    #[must_use]
    fn host_type() -> HostType {
        HostType::named(FACADE_NAMESPACE, Self::NAME).in_assembly(FACADE_ASSEMBLY)
    }
}

fn receiver_mismatch(name: &str) -> Error {
    Error::FacadeMismatch(format!("receiver is neither a {name} nor its base type"))
}

fn construct_base<F: RewriteFacade>(args: &[HostValue]) -> Result<Box<dyn Any + Send>> {
    Ok(Box::new(F::construct_base(args)?))
}

fn substitute<F: RewriteFacade>(base: Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>> {
    match base.downcast::<F::Base>() {
        Ok(base) => Ok(Box::new(F::from_base(*base))),
        Err(_) => Err(Error::FacadeMismatch(format!(
            "{} can only substitute its own base type",
            F::NAME
        ))),
    }
}

fn declared_constructor<F: RewriteFacade>() -> Result<Box<dyn Any + Send>> {
    Ok(Box::new(F::new()?))
}

/// One member of a facade's legacy surface and its dispatch entry.
#[derive(Clone)]
pub struct FacadeMember {
    /// The legacy signature, as old compiled code references it
    pub method: HostMethod,
    invoke: FacadeInvoke,
}

impl fmt::Debug for FacadeMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeMember").field("method", &self.method).finish_non_exhaustive()
    }
}

/// Link-level description of a facade: its type, the type it replaces, the constructors it
/// inherits from the base and the legacy members it adds.
#[derive(Clone)]
pub struct FacadeType {
    /// The facade type itself
    pub ty: HostType,
    /// The host type whose references the facade takes over
    pub replaces: HostType,
    /// Base constructors a redirected `newobj` can bind to
    pub constructors: Vec<HostMethod>,
    members: Vec<FacadeMember>,
    construct_base: ConstructBase,
    substitute: Substitute,
    declared_constructor: DeclaredConstructor,
}

impl fmt::Debug for FacadeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeType")
            .field("ty", &self.ty)
            .field("replaces", &self.replaces)
            .field("constructors", &self.constructors)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

impl FacadeType {
    /// Starts the description of facade `F` over the current definition of its base type.
    ///
    /// The base's constructors are inherited; legacy members are added with
    /// [`FacadeType::member`].
    #[must_use]
    pub fn new<F: RewriteFacade>(base: &HostTypeDef) -> Self {
        FacadeType {
            ty: F::host_type(),
            replaces: base.ty.clone(),
            constructors: base.constructors.clone(),
            members: Vec::new(),
            construct_base: construct_base::<F>,
            substitute: substitute::<F>,
            declared_constructor: declared_constructor::<F>,
        }
    }

    /// Adds a legacy member and its dispatch entry.
    #[must_use]
    pub fn member(mut self, method: HostMethod, invoke: FacadeInvoke) -> Self {
        self.members.push(FacadeMember { method, invoke });
        self
    }

    /// The legacy members.
    #[must_use]
    pub fn members(&self) -> &[FacadeMember] {
        &self.members
    }

    /// The facade as a host type definition extending the replaced type.
    #[must_use]
    pub fn definition(&self) -> HostTypeDef {
        let mut definition = HostTypeDef::new(self.ty.clone()).extends(self.replaces.clone());
        definition.constructors.clone_from(&self.constructors);
        definition.methods = self.members.iter().map(|member| member.method.clone()).collect();
        definition
    }

    /// Finds the legacy member a compiled reference binds to.
    ///
    /// Unlike ordinary member lookup, the return type must match too: legacy members often
    /// differ from their current namesakes in nothing else.
    #[must_use]
    pub fn find_member(&self, reference: &MethodRef) -> Option<&FacadeMember> {
        self.members.iter().find(|member| {
            has_matching_signature(&member.method, reference)
                && is_same_type(&member.method.return_type, &reference.return_type)
        })
    }

    /// Finds the inherited constructor a compiled constructor reference binds to.
    #[must_use]
    pub fn find_constructor(&self, reference: &MethodRef) -> Option<&HostMethod> {
        if !reference.is_constructor() {
            return None;
        }
        self.constructors
            .iter()
            .find(|ctor| has_matching_signature(ctor, reference))
    }

    /// The reference to emit in place of `reference`, if the facade takes it over.
    #[must_use]
    pub fn retarget(&self, reference: &MethodRef) -> Option<MethodRef> {
        let method = if reference.is_constructor() {
            self.find_constructor(reference)?
        } else {
            &self.find_member(reference)?.method
        };
        Some(method.to_method_ref(&self.ty))
    }

    /// Dispatches a call to a legacy member.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if the facade has no such member or the member
    /// rejects the receiver or arguments.
    pub fn invoke(&self, reference: &MethodRef, receiver: &mut dyn Any, args: &[HostValue]) -> Result<Option<HostValue>> {
        let member = self
            .find_member(reference)
            .ok_or_else(|| Error::FacadeMismatch(format!("{} has no member {}", self.ty, reference)))?;
        if args.len() != member.method.parameters.len() {
            return Err(Error::FacadeMismatch(format!(
                "{} expects {} arguments, got {}",
                reference,
                member.method.parameters.len(),
                args.len()
            )));
        }
        (member.invoke)(receiver, args)
    }

    /// Satisfies a redirected constructor call through the base type's construction.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if the facade inherits no matching constructor or
    /// the base rejects the arguments.
    pub fn construct(&self, reference: &MethodRef, args: &[HostValue]) -> Result<Box<dyn Any + Send>> {
        if self.find_constructor(reference).is_none() {
            return Err(Error::FacadeMismatch(format!("{} inherits no constructor {}", self.ty, reference)));
        }
        let base = (self.construct_base)(args)?;
        (self.substitute)(base)
    }

    /// Turns an existing base instance into an instance of the facade.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if `base` is not of the replaced type.
    pub fn substitute(&self, base: Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>> {
        (self.substitute)(base)
    }

    /// Runs the facade's own declared constructor.
    ///
    /// # Errors
    /// Always returns [`Error::FacadeConstructed`].
    pub fn construct_declared(&self) -> Result<Box<dyn Any + Send>> {
        (self.declared_constructor)()
    }
}

/// Reads a string argument of a facade member.
pub(crate) fn string_arg<'a>(args: &'a [HostValue], index: usize, member: &str) -> Result<&'a str> {
    args.get(index)
        .and_then(HostValue::as_str)
        .ok_or_else(|| Error::FacadeMismatch(format!("{member} expects a string argument at position {index}")))
}
