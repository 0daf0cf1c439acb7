//! Token resolution at the binary boundary.
//!
//! Method bodies refer to symbols and string literals through metadata tokens. Decoding
//! turns those tokens into descriptors through a [`SymbolResolver`]; encoding turns
//! descriptors (including the new ones a rewrite introduced) back into tokens through a
//! [`SymbolEmitter`]. [`ReferenceScope`] is an in-memory implementation of both, suitable
//! for a binary whose reference tables are rebuilt after rewriting.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::{
    metadata::token::{Token, TokenTable},
    symbols::{FieldRef, MethodRef, Symbol, TypeRef},
    Error::UnresolvedToken,
    Result,
};

/// Resolves operand tokens to symbols while decoding.
pub trait SymbolResolver: Sync {
    /// Resolves a type token.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the token does not name a type.
    fn resolve_type(&self, token: Token) -> Result<TypeRef>;

    /// Resolves a field token.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the token does not name a field.
    fn resolve_field(&self, token: Token) -> Result<FieldRef>;

    /// Resolves a method token.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the token does not name a method.
    fn resolve_method(&self, token: Token) -> Result<MethodRef>;

    /// Resolves a user string token.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the token does not name a string.
    fn resolve_string(&self, token: Token) -> Result<String>;

    /// Resolves the token of an `ldtoken` operand, which may name any kind of symbol.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the token names nothing.
    fn resolve_symbol(&self, token: Token) -> Result<Symbol> {
        match token.kind() {
            Some(TokenTable::Field) => self.resolve_field(token).map(Symbol::Field),
            Some(TokenTable::MethodDef | TokenTable::MethodSpec) => self.resolve_method(token).map(Symbol::Method),
            Some(TokenTable::MemberRef) => self
                .resolve_method(token)
                .map(Symbol::Method)
                .or_else(|_| self.resolve_field(token).map(Symbol::Field)),
            Some(TokenTable::TypeRef | TokenTable::TypeDef | TokenTable::TypeSpec) => {
                self.resolve_type(token).map(Symbol::Type)
            }
            _ => Err(UnresolvedToken(token)),
        }
    }
}

/// Produces operand tokens for symbols while encoding.
pub trait SymbolEmitter: Sync {
    /// Returns the token referencing `ty`, allocating one if needed.
    ///
    /// # Errors
    /// Implementations may fail if no token can be allocated.
    fn type_token(&self, ty: &TypeRef) -> Result<Token>;

    /// Returns the token referencing `field`, allocating one if needed.
    ///
    /// # Errors
    /// Implementations may fail if no token can be allocated.
    fn field_token(&self, field: &FieldRef) -> Result<Token>;

    /// Returns the token referencing `method`, allocating one if needed.
    ///
    /// # Errors
    /// Implementations may fail if no token can be allocated.
    fn method_token(&self, method: &MethodRef) -> Result<Token>;

    /// Returns the token referencing the user string `value`, allocating one if needed.
    ///
    /// # Errors
    /// Implementations may fail if no token can be allocated.
    fn string_token(&self, value: &str) -> Result<Token>;
}

/// An in-memory, bidirectional token table.
///
/// Tokens are allocated per table in ascending row order starting at 1. Interning the same
/// symbol twice returns the same token. Named non-generic types go to the `TypeRef` table,
/// every other type shape to `TypeSpec`; fields and methods to `MemberRef`, generic method
/// instantiations to `MethodSpec`; strings to the user string heap.
///
/// # Thread Safety
///
/// [`ReferenceScope`] is [`Send`] and [`Sync`]: tokens may be interned from several
/// method bodies being encoded in parallel.
#[derive(Debug, Default)]
pub struct ReferenceScope {
    symbols: DashMap<Token, Symbol>,
    strings: DashMap<Token, String>,
    symbol_tokens: DashMap<Symbol, Token>,
    string_tokens: DashMap<String, Token>,
    rows: DashMap<TokenTable, AtomicU32>,
}

impl ReferenceScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an existing token of the binary.
    ///
    /// Later allocations in the same table continue after the highest recorded row.
    pub fn define(&self, token: Token, symbol: Symbol) {
        self.bump(token);
        self.symbol_tokens.entry(symbol.clone()).or_insert(token);
        self.symbols.insert(token, symbol);
    }

    /// Records an existing user string token of the binary.
    pub fn define_string(&self, token: Token, value: &str) {
        self.bump(token);
        self.string_tokens.entry(value.to_string()).or_insert(token);
        self.strings.insert(token, value.to_string());
    }

    /// Returns the token for `symbol`, allocating a new one on first use.
    pub fn intern(&self, symbol: &Symbol) -> Token {
        if let Some(token) = self.symbol_tokens.get(symbol) {
            return *token;
        }

        let table = table_for(symbol);
        let token = *self
            .symbol_tokens
            .entry(symbol.clone())
            .or_insert_with(|| self.allocate(table));
        self.symbols.entry(token).or_insert_with(|| symbol.clone());
        token
    }

    /// Returns the token for the user string `value`, allocating a new one on first use.
    pub fn intern_string(&self, value: &str) -> Token {
        if let Some(token) = self.string_tokens.get(value) {
            return *token;
        }

        let token = *self
            .string_tokens
            .entry(value.to_string())
            .or_insert_with(|| self.allocate(TokenTable::UserString));
        self.strings.entry(token).or_insert_with(|| value.to_string());
        token
    }

    /// Looks up the symbol behind a token.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<Symbol> {
        self.symbols.get(&token).map(|entry| entry.value().clone())
    }

    /// Number of symbols and strings known to the scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len() + self.strings.len()
    }

    /// Returns `true` if the scope knows no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate(&self, table: TokenTable) -> Token {
        let counter = self.rows.entry(table).or_insert_with(|| AtomicU32::new(0));
        let row = counter.fetch_add(1, Ordering::Relaxed) + 1;
        Token::from_parts(table, row)
    }

    fn bump(&self, token: Token) {
        let Some(table) = token.kind() else {
            return;
        };
        let counter = self.rows.entry(table).or_insert_with(|| AtomicU32::new(0));
        counter.fetch_max(token.row(), Ordering::Relaxed);
    }
}

fn table_for(symbol: &Symbol) -> TokenTable {
    match symbol {
        Symbol::Type(TypeRef::Named(named)) if named.generic_args.is_empty() => TokenTable::TypeRef,
        Symbol::Type(_) => TokenTable::TypeSpec,
        Symbol::Field(_) => TokenTable::MemberRef,
        Symbol::Method(method) if !method.generic_args.is_empty() => TokenTable::MethodSpec,
        Symbol::Method(_) => TokenTable::MemberRef,
    }
}

impl SymbolResolver for ReferenceScope {
    fn resolve_type(&self, token: Token) -> Result<TypeRef> {
        match self.get(token) {
            Some(Symbol::Type(ty)) => Ok(ty),
            _ => Err(UnresolvedToken(token)),
        }
    }

    fn resolve_field(&self, token: Token) -> Result<FieldRef> {
        match self.get(token) {
            Some(Symbol::Field(field)) => Ok(field),
            _ => Err(UnresolvedToken(token)),
        }
    }

    fn resolve_method(&self, token: Token) -> Result<MethodRef> {
        match self.get(token) {
            Some(Symbol::Method(method)) => Ok(method),
            _ => Err(UnresolvedToken(token)),
        }
    }

    fn resolve_string(&self, token: Token) -> Result<String> {
        self.strings
            .get(&token)
            .map(|entry| entry.value().clone())
            .ok_or(UnresolvedToken(token))
    }

    fn resolve_symbol(&self, token: Token) -> Result<Symbol> {
        self.get(token).ok_or(UnresolvedToken(token))
    }
}

impl SymbolEmitter for ReferenceScope {
    fn type_token(&self, ty: &TypeRef) -> Result<Token> {
        Ok(self.intern(&Symbol::Type(ty.clone())))
    }

    fn field_token(&self, field: &FieldRef) -> Result<Token> {
        Ok(self.intern(&Symbol::Field(field.clone())))
    }

    fn method_token(&self, method: &MethodRef) -> Result<Token> {
        Ok(self.intern(&Symbol::Method(method.clone())))
    }

    fn string_token(&self, value: &str) -> Result<Token> {
        Ok(self.intern_string(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn intern_allocates_per_table() {
        let scope = ReferenceScope::new();
        let farmer = TypeRef::named("StardewValley", "Farmer");
        let list = TypeRef::generic("System.Collections.Generic", "List`1", vec![farmer.clone()]);

        let farmer_token = scope.type_token(&farmer).unwrap();
        let list_token = scope.type_token(&list).unwrap();
        assert_eq!(farmer_token, Token::from_parts(TokenTable::TypeRef, 1));
        assert_eq!(list_token, Token::from_parts(TokenTable::TypeSpec, 1));

        // interning again yields the same token
        assert_eq!(scope.type_token(&farmer).unwrap(), farmer_token);

        let method = MethodRef::new(farmer.clone(), "getTexture", TypeRef::object(), vec![]);
        let method_token = scope.method_token(&method).unwrap();
        let field = FieldRef::new(farmer, "name", TypeRef::string());
        let field_token = scope.field_token(&field).unwrap();
        assert_eq!(method_token.kind(), Some(TokenTable::MemberRef));
        assert_eq!(field_token.row(), method_token.row() + 1);

        assert_eq!(scope.resolve_method(method_token).unwrap(), method);
        assert_eq!(scope.resolve_field(field_token).unwrap(), field);
    }

    #[test]
    fn strings_round_trip() {
        let scope = ReferenceScope::new();
        let token = scope.string_token("summer").unwrap();
        assert_eq!(token.kind(), Some(TokenTable::UserString));
        assert_eq!(scope.resolve_string(token).unwrap(), "summer");
        assert_eq!(scope.string_token("summer").unwrap(), token);
    }

    #[test]
    fn define_continues_after_existing_rows() {
        let scope = ReferenceScope::new();
        let existing = Token::from_parts(TokenTable::MemberRef, 41);
        let method = MethodRef::new(TypeRef::named("StardewValley", "Game1"), "drawDialogue", TypeRef::void(), vec![]);
        scope.define(existing, Symbol::Method(method.clone()));

        assert_eq!(scope.method_token(&method).unwrap(), existing);

        let other = MethodRef::new(TypeRef::named("StardewValley", "Game1"), "playSound", TypeRef::void(), vec![]);
        assert_eq!(scope.method_token(&other).unwrap().row(), 42);
    }

    #[test]
    fn resolve_wrong_kind_fails() {
        let scope = ReferenceScope::new();
        let ty = scope.type_token(&TypeRef::int32()).unwrap();

        assert!(matches!(scope.resolve_method(ty), Err(Error::UnresolvedToken(t)) if t == ty));
        assert!(scope.resolve_string(ty).is_err());
        assert!(matches!(scope.resolve_symbol(ty), Ok(Symbol::Type(_))));
        assert!(scope.resolve_symbol(Token::new(0x0A00_0099)).is_err());
    }
}
