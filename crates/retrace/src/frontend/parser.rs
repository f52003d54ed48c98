//! Recursive descent parser for C declarations
//!
//! Types are built straight into a [`TypeContext`]; there is no syntax
//! tree. Function bodies and initializers are skipped, not parsed.

use tracing::debug;

use crate::common::{FrontendError, FrontendResult, Span};
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::types::{
    BuiltinKind, CallConv, FunctionExt, Qualifiers, TagKind, TypeContext, TypeId, TypeKind,
    VectorKind,
};

/// One step from a declarator's base type towards the declared type
#[derive(Debug, Clone)]
enum Derivation {
    Pointer(Qualifiers),
    BlockPointer(Qualifiers),
    LValueReference,
    RValueReference,
    MemberPointer { class: TypeId, qualifiers: Qualifiers },
    Array(ArraySize),
    Function { params: Vec<TypeId>, variadic: bool },
    FunctionNoProto,
}

#[derive(Debug, Clone, Copy)]
enum ArraySize {
    Constant(u64),
    Incomplete,
    Variable,
}

/// A declarator whose derivations have not been applied yet
#[derive(Debug, Default)]
struct Declarator {
    name: Option<(String, Span)>,
    /// Closest to the base type first
    derivations: Vec<Derivation>,
    span: Span,
}

impl Declarator {
    fn is_function(&self) -> bool {
        matches!(
            self.derivations.last(),
            Some(Derivation::Function { .. } | Derivation::FunctionNoProto)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaratorKind {
    /// Must declare a name
    Named,
    /// Must not declare a name (type names)
    Abstract,
    /// Parameters: either form
    Either,
}

/// The `__attribute__` bits that change a type
#[derive(Debug, Clone, Copy, Default)]
struct Attributes {
    vector_size: Option<(i128, Span)>,
    ext: FunctionExt,
}

impl Attributes {
    fn merge(self, later: Attributes) -> Attributes {
        Attributes {
            vector_size: later.vector_size.or(self.vector_size),
            ext: FunctionExt {
                call_conv: if later.ext.call_conv == CallConv::default() {
                    self.ext.call_conv
                } else {
                    later.ext.call_conv
                },
                is_const: self.ext.is_const || later.ext.is_const,
            },
        }
    }
}

struct Specifiers {
    is_typedef: bool,
    ty: TypeId,
    attributes: Attributes,
}

/// Builtin type keywords seen in one specifier list
#[derive(Debug, Default)]
struct SpecifierSet {
    void: u8,
    bool_: u8,
    char_: u8,
    short: u8,
    long: u8,
    int128: u8,
    int: u8,
    float: u8,
    double: u8,
    half: u8,
    wchar: u8,
    char16: u8,
    char32: u8,
    signed: u8,
    unsigned: u8,
    complex: u8,
}

impl SpecifierSet {
    fn add(&mut self, kind: &TokenKind) {
        let counter = match kind {
            TokenKind::Void => &mut self.void,
            TokenKind::Bool => &mut self.bool_,
            TokenKind::Char => &mut self.char_,
            TokenKind::Short => &mut self.short,
            TokenKind::Long => &mut self.long,
            TokenKind::Int128 => &mut self.int128,
            TokenKind::Int => &mut self.int,
            TokenKind::Float => &mut self.float,
            TokenKind::Double => &mut self.double,
            TokenKind::Fp16 => &mut self.half,
            TokenKind::WChar => &mut self.wchar,
            TokenKind::Char16 => &mut self.char16,
            TokenKind::Char32 => &mut self.char32,
            TokenKind::Signed => &mut self.signed,
            TokenKind::Unsigned => &mut self.unsigned,
            TokenKind::Complex => &mut self.complex,
            _ => return,
        };
        *counter = counter.saturating_add(1);
    }

    fn is_empty(&self) -> bool {
        self.words().is_empty() && self.signed == 0 && self.unsigned == 0 && self.complex == 0
    }

    /// Type words in a fixed order, signedness and `_Complex` left out
    fn words(&self) -> Vec<&'static str> {
        let mut words = Vec::new();
        let counts = [
            (self.void, "void"),
            (self.bool_, "_Bool"),
            (self.char_, "char"),
            (self.short, "short"),
            (self.long, "long"),
            (self.int128, "__int128"),
            (self.int, "int"),
            (self.float, "float"),
            (self.double, "double"),
            (self.half, "__fp16"),
            (self.wchar, "wchar_t"),
            (self.char16, "char16_t"),
            (self.char32, "char32_t"),
        ];
        for (count, word) in counts {
            words.extend(std::iter::repeat_n(word, usize::from(count)));
        }
        words
    }
}

/// Recursive descent parser for C declarations
pub struct Parser<'a, 'c> {
    lexer: Lexer<'a>,
    current: Token,
    ctx: &'c mut TypeContext,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(source: &'a str, ctx: &'c mut TypeContext) -> FrontendResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, ctx })
    }

    /// Parse a sequence of file-scope declarations into the context
    pub fn parse_declarations(&mut self) -> FrontendResult<()> {
        while !self.at_end() {
            self.parse_external_declaration()?;
        }
        Ok(())
    }

    /// Parse a complete abstract type name such as `struct node *`
    pub fn parse_type_name(&mut self) -> FrontendResult<TypeId> {
        let ty = self.parse_type_name_inner()?;
        if !self.at_end() {
            return Err(FrontendError::parser(
                format!("unexpected {} after type name", self.current.kind),
                self.current.span,
            ));
        }
        Ok(ty)
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> FrontendResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> FrontendResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> FrontendResult<Token> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(FrontendError::parser(
                format!("expected {}, found {}", kind, self.current.kind),
                self.current.span,
            ))
        }
    }

    fn expect_identifier(&mut self) -> FrontendResult<(String, Span)> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            let span = self.advance()?.span;
            Ok((name, span))
        } else {
            Err(FrontendError::parser(
                format!("expected identifier, found {}", self.current.kind),
                self.current.span,
            ))
        }
    }

    fn is_typedef_name(&self, name: &str) -> bool {
        self.ctx.lookup_typedef(name).is_some()
    }

    fn kind_starts_type(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Identifier(name) => self.is_typedef_name(name),
            other => other.can_start_declaration(),
        }
    }

    fn starts_type(&self) -> bool {
        self.kind_starts_type(&self.current.kind)
    }

    /// Does the token after the current one start a type name?
    fn next_starts_type(&mut self) -> FrontendResult<bool> {
        let next = self.lexer.peek()?.kind.clone();
        Ok(self.kind_starts_type(&next))
    }

    // =========================================================================
    // External declarations
    // =========================================================================

    fn parse_external_declaration(&mut self) -> FrontendResult<()> {
        if self.match_token(&TokenKind::Semi)? {
            return Ok(());
        }

        let specs = self.parse_declaration_specifiers()?;

        // Tag declaration or definition only
        if self.match_token(&TokenKind::Semi)? {
            return Ok(());
        }

        loop {
            let declarator = self.parse_declarator(DeclaratorKind::Named)?;
            let attributes = specs.attributes.merge(self.parse_attributes()?);
            let ty = self.apply_declarator(specs.ty, &declarator, attributes)?;
            let (name, name_span) = declarator.name.clone().unwrap_or_default();

            if specs.is_typedef {
                self.ctx
                    .define_typedef(&name, ty)
                    .map_err(|err| FrontendError::type_error(err, name_span))?;
            } else {
                self.ctx
                    .declare_value(&name, ty)
                    .map_err(|err| FrontendError::type_error(err, name_span))?;
            }
            debug!(name = %name, ty = %self.ctx.describe(ty), typedef = specs.is_typedef, "declared");

            if declarator.is_function() && !specs.is_typedef {
                // Old-style parameter declarations come before the body
                if !self.check(&TokenKind::LBrace) && self.starts_type() {
                    self.skip_until_body()?;
                }
                if self.check(&TokenKind::LBrace) {
                    self.skip_balanced()?;
                    return Ok(());
                }
            }

            if self.match_token(&TokenKind::Eq)? {
                self.skip_initializer()?;
            }
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }

        self.expect(TokenKind::Semi)?;
        Ok(())
    }

    fn parse_type_name_inner(&mut self) -> FrontendResult<TypeId> {
        let start = self.current.span;
        let specs = self.parse_declaration_specifiers()?;
        if specs.is_typedef {
            return Err(FrontendError::semantic(
                "'typedef' is not allowed in a type name",
                start,
            ));
        }
        let declarator = self.parse_declarator(DeclaratorKind::Abstract)?;
        let attributes = specs.attributes.merge(self.parse_attributes()?);
        self.apply_declarator(specs.ty, &declarator, attributes)
    }

    // =========================================================================
    // Declaration specifiers
    // =========================================================================

    fn parse_declaration_specifiers(&mut self) -> FrontendResult<Specifiers> {
        let start_span = self.current.span;
        let mut is_typedef = false;
        let mut qualifiers = Qualifiers::default();
        let mut atomic = false;
        let mut set = SpecifierSet::default();
        let mut named: Option<TypeId> = None;
        let mut attributes = Attributes::default();

        loop {
            let span = self.current.span;
            match &self.current.kind {
                TokenKind::Typedef => {
                    self.advance()?;
                    is_typedef = true;
                }
                kind if kind.is_storage_class() => {
                    self.advance()?;
                }

                TokenKind::Const => {
                    self.advance()?;
                    qualifiers.is_const = true;
                }
                TokenKind::Volatile => {
                    self.advance()?;
                    qualifiers.is_volatile = true;
                }
                TokenKind::Restrict => {
                    self.advance()?;
                    qualifiers.is_restrict = true;
                }
                TokenKind::Atomic => {
                    self.advance()?;
                    if self.match_token(&TokenKind::LParen)? {
                        let value = self.parse_type_name_inner()?;
                        self.expect(TokenKind::RParen)?;
                        let ty = self.ctx.intern(TypeKind::Atomic { value });
                        self.set_named(&mut named, &set, ty, span)?;
                    } else {
                        atomic = true;
                    }
                }

                TokenKind::Attribute => {
                    let parsed = self.parse_attributes()?;
                    attributes = attributes.merge(parsed);
                }

                kind if kind.is_builtin_specifier() => {
                    if named.is_some() {
                        return Err(FrontendError::parser(
                            format!("unexpected {} after a complete type", kind),
                            span,
                        ));
                    }
                    let kind = kind.clone();
                    self.advance()?;
                    set.add(&kind);
                }

                TokenKind::Struct | TokenKind::Union => {
                    let tag = if self.check(&TokenKind::Struct) {
                        TagKind::Struct
                    } else {
                        TagKind::Union
                    };
                    self.advance()?;
                    let ty = self.parse_record(tag, span)?;
                    self.set_named(&mut named, &set, ty, span)?;
                }
                TokenKind::Enum => {
                    self.advance()?;
                    let ty = self.parse_enum(span)?;
                    self.set_named(&mut named, &set, ty, span)?;
                }
                TokenKind::AutoType => {
                    self.advance()?;
                    let ty = self.ctx.intern(TypeKind::Auto);
                    self.set_named(&mut named, &set, ty, span)?;
                }

                // A typedef name only counts when no other type was given
                TokenKind::Identifier(name) if named.is_none() && set.is_empty() => {
                    match self.ctx.lookup_typedef(name) {
                        Some(ty) => {
                            self.advance()?;
                            named = Some(ty);
                        }
                        None => break,
                    }
                }

                _ => break,
            }
        }

        let base = match named {
            Some(ty) => ty,
            None => self.resolve_builtin(&set, start_span.merge(self.current.span))?,
        };
        let base = if atomic {
            self.ctx.intern(TypeKind::Atomic { value: base })
        } else {
            base
        };

        Ok(Specifiers {
            is_typedef,
            ty: self.ctx.qualified(base, qualifiers),
            attributes,
        })
    }

    fn set_named(
        &self,
        named: &mut Option<TypeId>,
        set: &SpecifierSet,
        ty: TypeId,
        span: Span,
    ) -> FrontendResult<()> {
        if named.is_some() || !set.is_empty() {
            return Err(FrontendError::parser(
                "two or more data types in declaration specifiers",
                span,
            ));
        }
        *named = Some(ty);
        Ok(())
    }

    fn resolve_builtin(&mut self, set: &SpecifierSet, span: Span) -> FrontendResult<TypeId> {
        let words = set.words();
        let signedness = match (set.signed, set.unsigned) {
            (0, 0) => None,
            (_, 0) => Some(true),
            (0, _) => Some(false),
            _ => {
                return Err(FrontendError::parser(
                    "both 'signed' and 'unsigned' in declaration specifiers",
                    span,
                ));
            }
        };
        let unsigned = signedness == Some(false);
        let invalid = || {
            let spelled = if words.is_empty() {
                "nothing".to_string()
            } else {
                words.join(" ")
            };
            FrontendError::parser(format!("invalid type specifier combination: {}", spelled), span)
        };

        let kind = match (words.as_slice(), signedness) {
            ([], None) if set.complex > 0 => BuiltinKind::Double,
            ([], None) => {
                return Err(FrontendError::parser(
                    format!("expected a type, found {}", self.current.kind),
                    span,
                ));
            }
            (["void"], None) => BuiltinKind::Void,
            (["_Bool"], None) => BuiltinKind::Bool,
            (["char"], None) => self.ctx.layout().plain_char(),
            (["char"], Some(true)) => BuiltinKind::SChar,
            (["char"], Some(false)) => BuiltinKind::UChar,
            (["short"] | ["short", "int"], _) if unsigned => BuiltinKind::UShort,
            (["short"] | ["short", "int"], _) => BuiltinKind::Short,
            ([] | ["int"], _) if unsigned => BuiltinKind::UInt,
            ([] | ["int"], _) => BuiltinKind::Int,
            (["long"] | ["long", "int"], _) if unsigned => BuiltinKind::ULong,
            (["long"] | ["long", "int"], _) => BuiltinKind::Long,
            (["long", "long"] | ["long", "long", "int"], _) if unsigned => BuiltinKind::ULongLong,
            (["long", "long"] | ["long", "long", "int"], _) => BuiltinKind::LongLong,
            (["__int128"], _) if unsigned => BuiltinKind::UInt128,
            (["__int128"], _) => BuiltinKind::Int128,
            (["float"], None) => BuiltinKind::Float,
            (["double"], None) => BuiltinKind::Double,
            (["long", "double"], None) => BuiltinKind::LongDouble,
            (["__fp16"], None) => BuiltinKind::Half,
            (["wchar_t"], None) => self.ctx.layout().wchar_kind(),
            (["char16_t"], None) => BuiltinKind::Char16,
            (["char32_t"], None) => BuiltinKind::Char32,
            _ => return Err(invalid()),
        };

        let ty = self.ctx.builtin(kind);
        if set.complex == 0 {
            return Ok(ty);
        }
        if !kind.is_floating() || kind == BuiltinKind::Half {
            return Err(FrontendError::semantic(
                format!("'_Complex {}' is not supported", kind.name()),
                span,
            ));
        }
        Ok(self.ctx.complex_of(ty))
    }

    // =========================================================================
    // Tagged types
    // =========================================================================

    /// `struct`/`union` after the keyword
    fn parse_record(&mut self, tag: TagKind, keyword: Span) -> FrontendResult<TypeId> {
        // Layout attributes such as `packed` are not modelled
        self.parse_attributes()?;

        let name = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ => None,
        };

        if !self.check(&TokenKind::LBrace) {
            let Some(name) = name else {
                return Err(FrontendError::parser(
                    format!("expected {} name or body", tag),
                    self.current.span,
                ));
            };
            return self.reference_tag(tag, &name, keyword);
        }

        let ty = match &name {
            Some(name) => self.reference_tag(tag, name, keyword)?,
            None => self.ctx.declare_record(tag, None),
        };

        self.expect(TokenKind::LBrace)?;
        let mut fields: Vec<(String, TypeId)> = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(FrontendError::parser(
                    format!("unterminated {} body", tag),
                    keyword,
                ));
            }

            let specs = self.parse_declaration_specifiers()?;

            if self.match_token(&TokenKind::Semi)? {
                if self.is_anonymous_record(specs.ty) {
                    fields.push((String::new(), specs.ty));
                }
                continue;
            }

            loop {
                let declarator = self.parse_declarator(DeclaratorKind::Named)?;
                if self.check(&TokenKind::Colon) {
                    return Err(FrontendError::semantic(
                        "bit-fields are not supported",
                        self.current.span,
                    ));
                }
                let attributes = specs.attributes.merge(self.parse_attributes()?);
                let field_ty = self.apply_declarator(specs.ty, &declarator, attributes)?;
                let (field_name, span) = declarator.name.unwrap_or_default();
                if fields.iter().any(|(existing, _)| *existing == field_name) {
                    return Err(FrontendError::semantic(
                        format!("duplicate member '{}'", field_name),
                        span,
                    ));
                }
                fields.push((field_name, field_ty));

                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::Semi)?;
        }

        let end = self.expect(TokenKind::RBrace)?.span;
        let members: Vec<(&str, TypeId)> = fields
            .iter()
            .map(|(name, ty)| (name.as_str(), *ty))
            .collect();
        self.ctx
            .complete_record(ty, &members)
            .map_err(|err| FrontendError::type_error(err, keyword.merge(end)))?;
        Ok(ty)
    }

    fn is_anonymous_record(&self, ty: TypeId) -> bool {
        match self.ctx.canonical_kind(ty) {
            TypeKind::Record(record) => self.ctx.record(*record).name.is_none(),
            _ => false,
        }
    }

    /// `enum` after the keyword
    fn parse_enum(&mut self, keyword: Span) -> FrontendResult<TypeId> {
        self.parse_attributes()?;

        let name = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ => None,
        };

        let fixed = if self.match_token(&TokenKind::Colon)? {
            Some(self.parse_type_name_inner()?)
        } else {
            None
        };

        if !self.check(&TokenKind::LBrace) {
            let Some(name) = name else {
                return Err(FrontendError::parser(
                    "expected enum name or body",
                    self.current.span,
                ));
            };
            return self.reference_tag(TagKind::Enum, &name, keyword);
        }

        let ty = match &name {
            Some(name) => self.reference_tag(TagKind::Enum, name, keyword)?,
            None => self.ctx.declare_enum(None),
        };

        self.expect(TokenKind::LBrace)?;
        let mut enumerators: Vec<(String, i128)> = Vec::new();
        let mut next: Option<i128> = Some(0);

        while !self.check(&TokenKind::RBrace) {
            let (constant, span) = self.expect_identifier()?;
            let value = if self.match_token(&TokenKind::Eq)? {
                self.parse_constant_expression()?.ok_or_else(|| {
                    FrontendError::semantic(
                        format!("value of enumerator '{}' is not an integer constant", constant),
                        span,
                    )
                })?
            } else {
                next.ok_or_else(|| {
                    FrontendError::semantic(
                        format!("overflow in value of enumerator '{}'", constant),
                        span,
                    )
                })?
            };

            self.ctx
                .define_constant(&constant, value, ty)
                .map_err(|err| FrontendError::type_error(err, span))?;
            enumerators.push((constant, value));
            next = value.checked_add(1);

            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        let span = keyword.merge(end);

        let values: Vec<i128> = enumerators.iter().map(|(_, value)| *value).collect();
        let integer_type = match fixed {
            Some(fixed) => {
                self.check_enumerators_fit(fixed, &values, span)?;
                fixed
            }
            None => self.pick_enum_type(&values, span)?,
        };

        let constants: Vec<(&str, i128)> = enumerators
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        self.ctx
            .complete_enum(ty, integer_type, &constants)
            .map_err(|err| FrontendError::type_error(err, span))?;
        Ok(ty)
    }

    /// Smallest of `int`, `unsigned`, `long`, ... holding every value
    fn pick_enum_type(&mut self, values: &[i128], span: Span) -> FrontendResult<TypeId> {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let candidates = [
            BuiltinKind::Int,
            BuiltinKind::UInt,
            BuiltinKind::Long,
            BuiltinKind::ULong,
            BuiltinKind::LongLong,
            BuiltinKind::ULongLong,
        ];
        let kind = candidates
            .into_iter()
            .find(|kind| {
                self.integer_range(*kind)
                    .is_some_and(|(low, high)| low <= min && max <= high)
            })
            .ok_or_else(|| {
                FrontendError::semantic("enumerator values do not fit any integer type", span)
            })?;
        Ok(self.ctx.builtin(kind))
    }

    fn check_enumerators_fit(&self, fixed: TypeId, values: &[i128], span: Span) -> FrontendResult<()> {
        let TypeKind::Builtin(kind) = *self.ctx.canonical_kind(fixed) else {
            // complete_enum rejects it with a better message
            return Ok(());
        };
        let Some((low, high)) = self.integer_range(kind) else {
            return Ok(());
        };
        match values.iter().find(|value| **value < low || **value > high) {
            Some(value) => Err(FrontendError::semantic(
                format!("enumerator value {} is outside the range of '{}'", value, kind),
                span,
            )),
            None => Ok(()),
        }
    }

    /// Inclusive value range of an integer builtin on the current target
    fn integer_range(&self, kind: BuiltinKind) -> Option<(i128, i128)> {
        if !kind.is_integer() {
            return None;
        }
        let width = self.ctx.layout().builtin(kind)?.width;
        let signed = kind.is_signed_integer();
        if width >= 128 {
            return Some(if signed { (i128::MIN, i128::MAX) } else { (0, i128::MAX) });
        }
        Some(if signed {
            (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
        } else {
            (0, (1i128 << width) - 1)
        })
    }

    /// The type a tag name refers to, declaring it on first use
    fn reference_tag(&mut self, tag: TagKind, name: &str, span: Span) -> FrontendResult<TypeId> {
        match self.ctx.lookup_tag(name) {
            Some(existing) => {
                self.check_tag_kind(existing, tag, name, span)?;
                Ok(existing)
            }
            None => self.declare_tag(tag, name, span),
        }
    }

    fn declare_tag(&mut self, tag: TagKind, name: &str, span: Span) -> FrontendResult<TypeId> {
        let ty = match tag {
            TagKind::Enum => self.ctx.declare_enum(Some(name)),
            _ => self.ctx.declare_record(tag, Some(name)),
        };
        self.ctx
            .define_tag(name, ty)
            .map_err(|err| FrontendError::type_error(err, span))?;
        Ok(ty)
    }

    fn check_tag_kind(&self, existing: TypeId, tag: TagKind, name: &str, span: Span) -> FrontendResult<()> {
        let found = match self.ctx.canonical_kind(existing) {
            TypeKind::Record(record) => self.ctx.record(*record).tag,
            _ => TagKind::Enum,
        };
        if found == tag {
            Ok(())
        } else {
            Err(FrontendError::semantic(
                format!("'{}' declared as {} but used as {}", name, found, tag),
                span,
            ))
        }
    }

    // =========================================================================
    // Declarators
    // =========================================================================

    fn parse_declarator(&mut self, kind: DeclaratorKind) -> FrontendResult<Declarator> {
        let start = self.current.span;
        let mut pointers = Vec::new();

        loop {
            if self.is_member_pointer_start()? {
                let (class_name, span) = self.expect_identifier()?;
                self.expect(TokenKind::ColonColon)?;
                self.expect(TokenKind::Star)?;
                let class = self
                    .ctx
                    .lookup_tag(&class_name)
                    .or_else(|| self.ctx.lookup_typedef(&class_name))
                    .ok_or_else(|| {
                        FrontendError::semantic(format!("unknown class '{}'", class_name), span)
                    })?;
                let qualifiers = self.parse_qualifiers()?;
                pointers.push(Derivation::MemberPointer { class, qualifiers });
                continue;
            }

            let derivation = match self.current.kind {
                TokenKind::Star => {
                    self.advance()?;
                    Derivation::Pointer(self.parse_qualifiers()?)
                }
                TokenKind::Caret => {
                    self.advance()?;
                    Derivation::BlockPointer(self.parse_qualifiers()?)
                }
                TokenKind::Amp => {
                    self.advance()?;
                    Derivation::LValueReference
                }
                TokenKind::AmpAmp => {
                    self.advance()?;
                    Derivation::RValueReference
                }
                _ => break,
            };
            pointers.push(derivation);
        }

        let mut name = None;
        let mut inner = None;
        if self.is_nested_declarator()? {
            self.advance()?;
            inner = Some(self.parse_declarator(kind)?);
            self.expect(TokenKind::RParen)?;
        } else if let TokenKind::Identifier(identifier) = &self.current.kind {
            if kind != DeclaratorKind::Abstract {
                let identifier = identifier.clone();
                let span = self.advance()?.span;
                name = Some((identifier, span));
            }
        }

        let mut suffixes = Vec::new();
        loop {
            if self.check(&TokenKind::LBracket) {
                suffixes.push(Derivation::Array(self.parse_array_size()?));
            } else if self.check(&TokenKind::LParen) {
                self.advance()?;
                suffixes.push(self.parse_parameter_list()?);
                self.expect(TokenKind::RParen)?;
            } else {
                break;
            }
        }

        let mut derivations = pointers;
        derivations.extend(suffixes.into_iter().rev());
        if let Some(inner) = inner {
            derivations.extend(inner.derivations);
            name = name.or(inner.name);
        }

        if kind == DeclaratorKind::Named && name.is_none() {
            return Err(FrontendError::parser(
                format!("expected identifier in declarator, found {}", self.current.kind),
                self.current.span,
            ));
        }

        Ok(Declarator {
            name,
            derivations,
            span: start.merge(self.current.span),
        })
    }

    fn is_member_pointer_start(&mut self) -> FrontendResult<bool> {
        if !matches!(self.current.kind, TokenKind::Identifier(_)) {
            return Ok(false);
        }
        Ok(matches!(self.lexer.peek()?.kind, TokenKind::ColonColon))
    }

    /// Is the current `(` the start of a parenthesized declarator rather
    /// than a parameter list?
    fn is_nested_declarator(&mut self) -> FrontendResult<bool> {
        if !self.check(&TokenKind::LParen) {
            return Ok(false);
        }
        let next = self.lexer.peek()?.kind.clone();
        Ok(match next {
            TokenKind::Star
            | TokenKind::Caret
            | TokenKind::Amp
            | TokenKind::AmpAmp
            | TokenKind::Attribute => true,
            TokenKind::Identifier(name) => !self.is_typedef_name(&name),
            _ => false,
        })
    }

    fn parse_qualifiers(&mut self) -> FrontendResult<Qualifiers> {
        let mut qualifiers = Qualifiers::default();
        loop {
            match self.current.kind {
                TokenKind::Const => qualifiers.is_const = true,
                TokenKind::Volatile => qualifiers.is_volatile = true,
                TokenKind::Restrict => qualifiers.is_restrict = true,
                _ => break,
            }
            self.advance()?;
        }
        Ok(qualifiers)
    }

    fn parse_array_size(&mut self) -> FrontendResult<ArraySize> {
        self.expect(TokenKind::LBracket)?;
        // `static` and qualifiers only matter for parameters
        while self.check(&TokenKind::Static) || self.current.kind.is_type_qualifier() {
            self.advance()?;
        }

        if self.match_token(&TokenKind::RBracket)? {
            return Ok(ArraySize::Incomplete);
        }
        if self.check(&TokenKind::Star) && matches!(self.lexer.peek()?.kind, TokenKind::RBracket) {
            self.advance()?;
            self.advance()?;
            return Ok(ArraySize::Variable);
        }

        let span = self.current.span;
        let size = match self.parse_constant_expression()? {
            None => ArraySize::Variable,
            Some(size) => ArraySize::Constant(u64::try_from(size).map_err(|_| {
                FrontendError::semantic(format!("array size {} is negative", size), span)
            })?),
        };
        self.expect(TokenKind::RBracket)?;
        Ok(size)
    }

    /// Parameter list after the opening parenthesis
    fn parse_parameter_list(&mut self) -> FrontendResult<Derivation> {
        if self.check(&TokenKind::RParen) {
            return Ok(Derivation::FunctionNoProto);
        }

        if self.check(&TokenKind::Void) && matches!(self.lexer.peek()?.kind, TokenKind::RParen) {
            self.advance()?;
            return Ok(Derivation::Function {
                params: Vec::new(),
                variadic: false,
            });
        }

        // Old-style identifier list
        if matches!(self.current.kind, TokenKind::Identifier(_)) && !self.starts_type() {
            loop {
                self.expect_identifier()?;
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            return Ok(Derivation::FunctionNoProto);
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.match_token(&TokenKind::Ellipsis)? {
                variadic = true;
                break;
            }

            let specs = self.parse_declaration_specifiers()?;
            let declarator = self.parse_declarator(DeclaratorKind::Either)?;
            let attributes = specs.attributes.merge(self.parse_attributes()?);
            let ty = self.apply_declarator(specs.ty, &declarator, attributes)?;
            params.push(self.adjust_parameter(ty));

            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }

        Ok(Derivation::Function { params, variadic })
    }

    /// Array and function parameters decay to pointers
    fn adjust_parameter(&mut self, ty: TypeId) -> TypeId {
        let pointee = match *self.ctx.canonical_kind(ty) {
            TypeKind::ConstantArray { element, .. }
            | TypeKind::IncompleteArray { element }
            | TypeKind::VariableArray { element } => element,
            TypeKind::FunctionProto { .. } | TypeKind::FunctionNoProto { .. } => ty,
            _ => return ty,
        };
        self.ctx.pointer_to(pointee)
    }

    /// Build the declared type from the base type outwards.
    ///
    /// Calling-convention attributes go to the function closest to the
    /// declared name.
    fn apply_declarator(
        &mut self,
        base: TypeId,
        declarator: &Declarator,
        attributes: Attributes,
    ) -> FrontendResult<TypeId> {
        let span = declarator.span;
        let mut ty = match attributes.vector_size {
            Some((bytes, vector_span)) => self.vector_of(base, bytes, vector_span)?,
            None => base,
        };

        let ext_index = declarator.derivations.iter().rposition(|derivation| {
            matches!(
                derivation,
                Derivation::Function { .. } | Derivation::FunctionNoProto
            )
        });

        for (index, derivation) in declarator.derivations.iter().enumerate() {
            let ext = if Some(index) == ext_index {
                attributes.ext
            } else {
                FunctionExt::default()
            };

            ty = match derivation {
                Derivation::Pointer(qualifiers) => {
                    let pointer = self.ctx.pointer_to(ty);
                    self.ctx.qualified(pointer, *qualifiers)
                }
                Derivation::BlockPointer(qualifiers) => {
                    let pointer = self.ctx.block_pointer_to(ty);
                    self.ctx.qualified(pointer, *qualifiers)
                }
                Derivation::LValueReference => self.ctx.lvalue_reference_to(ty),
                Derivation::RValueReference => self.ctx.rvalue_reference_to(ty),
                Derivation::MemberPointer { class, qualifiers } => {
                    let pointer = self.ctx.member_pointer_to(ty, *class);
                    self.ctx.qualified(pointer, *qualifiers)
                }
                Derivation::Array(size) => {
                    if self.ctx.canonical_kind(ty).is_function() {
                        return Err(FrontendError::semantic("array of functions", span));
                    }
                    match size {
                        ArraySize::Constant(size) => self.ctx.constant_array_of(ty, *size),
                        ArraySize::Incomplete => self.ctx.incomplete_array_of(ty),
                        ArraySize::Variable => self.ctx.variable_array_of(ty),
                    }
                }
                Derivation::Function { params, variadic } => {
                    self.check_return_type(ty, span)?;
                    self.ctx.function_proto(ty, params.clone(), *variadic, ext)
                }
                Derivation::FunctionNoProto => {
                    self.check_return_type(ty, span)?;
                    self.ctx.function_no_proto(ty, ext)
                }
            };
        }

        Ok(ty)
    }

    fn check_return_type(&self, ret: TypeId, span: Span) -> FrontendResult<()> {
        let kind = self.ctx.canonical_kind(ret);
        if kind.is_array() || kind.is_function() {
            return Err(FrontendError::semantic(
                format!("function cannot return '{}'", self.ctx.describe(ret)),
                span,
            ));
        }
        Ok(())
    }

    fn vector_of(&mut self, element: TypeId, bytes: i128, span: Span) -> FrontendResult<TypeId> {
        let scalar = matches!(
            *self.ctx.canonical_kind(element),
            TypeKind::Builtin(kind) if kind.is_integer() || kind.is_floating()
        );
        let element_bytes = match self.ctx.type_info(element) {
            Some(info) if scalar => i128::from(info.size_in_bytes()),
            _ => {
                return Err(FrontendError::semantic(
                    format!("invalid vector element type '{}'", self.ctx.describe(element)),
                    span,
                ));
            }
        };
        if bytes <= 0 || element_bytes == 0 || bytes % element_bytes != 0 {
            return Err(FrontendError::semantic(
                "vector size is not a multiple of the element size",
                span,
            ));
        }
        let count = u32::try_from(bytes / element_bytes)
            .ok()
            .filter(|count| count.is_power_of_two())
            .ok_or_else(|| {
                FrontendError::semantic("number of vector elements must be a power of two", span)
            })?;
        Ok(self.ctx.vector_of(element, count, VectorKind::Generic))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn parse_attributes(&mut self) -> FrontendResult<Attributes> {
        let mut attributes = Attributes::default();

        while self.match_token(&TokenKind::Attribute)? {
            self.expect(TokenKind::LParen)?;
            self.expect(TokenKind::LParen)?;

            while !self.check(&TokenKind::RParen) {
                if self.match_token(&TokenKind::Comma)? {
                    continue;
                }
                let span = self.current.span;
                let name = match &self.current.kind {
                    TokenKind::Identifier(name) => name.trim_matches('_').to_string(),
                    TokenKind::Const => "const".to_string(),
                    other => {
                        return Err(FrontendError::parser(
                            format!("expected attribute name, found {}", other),
                            span,
                        ));
                    }
                };
                self.advance()?;

                match name.as_str() {
                    "vector_size" => {
                        self.expect(TokenKind::LParen)?;
                        let bytes = self.parse_constant_expression()?.ok_or_else(|| {
                            FrontendError::semantic("vector_size needs an integer constant", span)
                        })?;
                        self.expect(TokenKind::RParen)?;
                        attributes.vector_size = Some((bytes, span));
                    }
                    "cdecl" => attributes.ext.call_conv = CallConv::C,
                    "stdcall" => attributes.ext.call_conv = CallConv::StdCall,
                    "fastcall" => attributes.ext.call_conv = CallConv::FastCall,
                    "thiscall" => attributes.ext.call_conv = CallConv::ThisCall,
                    "vectorcall" => attributes.ext.call_conv = CallConv::VectorCall,
                    "swiftcall" => attributes.ext.call_conv = CallConv::Swift,
                    "const" => attributes.ext.is_const = true,
                    other => {
                        debug!(attribute = other, "ignoring attribute");
                        if self.check(&TokenKind::LParen) {
                            self.skip_balanced()?;
                        }
                    }
                }
            }

            self.expect(TokenKind::RParen)?;
            self.expect(TokenKind::RParen)?;
        }

        Ok(attributes)
    }

    // =========================================================================
    // Constant expressions
    // =========================================================================

    /// Evaluate an integer constant expression.
    ///
    /// `None` means the expression is well formed but not constant, such
    /// as the bound of a variable length array.
    fn parse_constant_expression(&mut self) -> FrontendResult<Option<i128>> {
        let condition = self.parse_binary(0)?;
        if !self.match_token(&TokenKind::Question)? {
            return Ok(condition);
        }
        let then = self.parse_constant_expression()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_constant_expression()?;
        Ok(condition.and_then(|condition| if condition != 0 { then } else { otherwise }))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> FrontendResult<Option<i128>> {
        let mut lhs = self.parse_unary()?;

        while let Some(precedence) = self.current.kind.binary_precedence() {
            if precedence < min_precedence {
                break;
            }
            let op = self.advance()?;
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => Some(fold_binary(&op, lhs, rhs)?),
                _ => None,
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> FrontendResult<Option<i128>> {
        let span = self.current.span;
        if self.check(&TokenKind::LParen) && self.next_starts_type()? {
            self.advance()?;
            let ty = self.parse_type_name_inner()?;
            self.expect(TokenKind::RParen)?;
            return Ok(self.parse_unary()?.map(|value| self.convert(ty, value)));
        }

        match self.current.kind {
            TokenKind::Minus => {
                self.advance()?;
                match self.parse_unary()? {
                    Some(value) => value
                        .checked_neg()
                        .map(Some)
                        .ok_or_else(|| overflow(span)),
                    None => Ok(None),
                }
            }
            TokenKind::Plus => {
                self.advance()?;
                self.parse_unary()
            }
            TokenKind::Tilde => {
                self.advance()?;
                Ok(self.parse_unary()?.map(|value| !value))
            }
            TokenKind::Bang => {
                self.advance()?;
                Ok(self.parse_unary()?.map(|value| i128::from(value == 0)))
            }
            TokenKind::Sizeof | TokenKind::Alignof => self.parse_sizeof(),
            _ => self.parse_primary(),
        }
    }

    fn parse_sizeof(&mut self) -> FrontendResult<Option<i128>> {
        let keyword = self.advance()?;
        let is_alignof = matches!(keyword.kind, TokenKind::Alignof);

        let ty = if self.check(&TokenKind::LParen) && self.next_starts_type()? {
            self.advance()?;
            let ty = self.parse_type_name_inner()?;
            self.expect(TokenKind::RParen)?;
            ty
        } else {
            let parenthesized = self.match_token(&TokenKind::LParen)?;
            let (name, span) = self.expect_identifier()?;
            if parenthesized {
                self.expect(TokenKind::RParen)?;
            }
            match self.ctx.lookup_value(&name) {
                Some(decl) => decl.ty,
                None => {
                    return Err(FrontendError::semantic(
                        format!("'{}' is not a declared variable", name),
                        span,
                    ));
                }
            }
        };

        let info = self.ctx.type_info(ty).ok_or_else(|| {
            FrontendError::semantic(
                format!(
                    "invalid application of '{}' to incomplete type '{}'",
                    if is_alignof { "_Alignof" } else { "sizeof" },
                    self.ctx.describe(ty)
                ),
                keyword.span,
            )
        })?;
        let bytes = if is_alignof {
            info.align / 8
        } else {
            info.size_in_bytes()
        };
        Ok(Some(i128::from(bytes)))
    }

    fn parse_primary(&mut self) -> FrontendResult<Option<i128>> {
        let token = self.advance()?;
        let span = token.span;
        match token.kind {
            TokenKind::IntLiteral(text) => integer_literal(&text, 0, 10, span).map(Some),
            TokenKind::HexLiteral(text) => integer_literal(&text, 2, 16, span).map(Some),
            TokenKind::BinaryLiteral(text) => integer_literal(&text, 2, 2, span).map(Some),
            TokenKind::OctalLiteral(text) => integer_literal(&text, 1, 8, span).map(Some),
            TokenKind::CharLiteral(text) => self.char_literal(&text, span).map(Some),
            TokenKind::Identifier(name) => match self.ctx.lookup_constant(&name) {
                Some((value, _)) => Ok(Some(value)),
                None => {
                    debug!(name = %name, "identifier is not an integer constant");
                    Ok(None)
                }
            },
            TokenKind::LParen => {
                let value = self.parse_constant_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(value)
            }
            other => Err(FrontendError::parser(
                format!("expected constant expression, found {}", other),
                span,
            )),
        }
    }

    /// Value of `value` after conversion to the integer type `ty`
    fn convert(&self, ty: TypeId, value: i128) -> i128 {
        let TypeKind::Builtin(kind) = *self.ctx.canonical_kind(ty) else {
            return value;
        };
        if kind == BuiltinKind::Bool {
            return i128::from(value != 0);
        }
        let Some(width) = self.ctx.layout().builtin(kind).map(|info| info.width) else {
            return value;
        };
        if !kind.is_integer() || width >= 128 {
            return value;
        }
        let modulus = 1i128 << width;
        let wrapped = value.rem_euclid(modulus);
        if kind.is_signed_integer() && wrapped >= modulus / 2 {
            wrapped - modulus
        } else {
            wrapped
        }
    }

    fn char_literal(&self, text: &str, span: Span) -> FrontendResult<i128> {
        let inner = text
            .strip_prefix('\'')
            .and_then(|text| text.strip_suffix('\''))
            .unwrap_or_default();
        let invalid = || FrontendError::lexer(format!("invalid character constant {}", text), span);

        let mut chars = inner.chars();
        let code = match chars.next() {
            Some('\\') => match chars.next() {
                Some('n') => 0x0a,
                Some('t') => 0x09,
                Some('r') => 0x0d,
                Some('a') => 0x07,
                Some('b') => 0x08,
                Some('f') => 0x0c,
                Some('v') => 0x0b,
                Some(c @ ('\\' | '\'' | '"' | '?')) => u32::from(c),
                Some('x') => u32::from_str_radix(chars.as_str(), 16).map_err(|_| invalid())?,
                Some(digit @ '0'..='7') => {
                    let digits = format!("{}{}", digit, chars.as_str());
                    u32::from_str_radix(&digits, 8).map_err(|_| invalid())?
                }
                _ => return Err(invalid()),
            },
            Some(c) if chars.as_str().is_empty() => u32::from(c),
            _ => return Err(invalid()),
        };

        let code = i128::from(code);
        if (0x80..0x100).contains(&code) && self.ctx.layout().char_is_signed {
            Ok(code - 0x100)
        } else {
            Ok(code)
        }
    }

    // =========================================================================
    // Skipping
    // =========================================================================

    /// Skip a balanced `(...)`, `[...]` or `{...}` group
    fn skip_balanced(&mut self) -> FrontendResult<()> {
        let open = self.advance()?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.current.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth -= 1,
                TokenKind::Eof => {
                    return Err(FrontendError::parser(
                        format!("unterminated {}", open.kind),
                        open.span,
                    ));
                }
                _ => {}
            }
            self.advance()?;
        }
        Ok(())
    }

    /// Skip an initializer up to the `,` or `;` that ends it
    fn skip_initializer(&mut self) -> FrontendResult<()> {
        let start = self.current.span;
        loop {
            match self.current.kind {
                TokenKind::Comma | TokenKind::Semi => return Ok(()),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.skip_balanced()?;
                }
                TokenKind::Eof => {
                    return Err(FrontendError::parser("unterminated initializer", start));
                }
                _ => {
                    self.advance()?;
                }
            }
        }
    }

    /// Skip old-style parameter declarations up to the function body
    fn skip_until_body(&mut self) -> FrontendResult<()> {
        let start = self.current.span;
        while !self.check(&TokenKind::LBrace) {
            if self.at_end() {
                return Err(FrontendError::parser("expected function body", start));
            }
            self.advance()?;
        }
        Ok(())
    }
}

fn overflow(span: Span) -> FrontendError {
    FrontendError::semantic("integer overflow in constant expression", span)
}

fn fold_binary(op: &Token, lhs: i128, rhs: i128) -> FrontendResult<i128> {
    let span = op.span;
    let result = match op.kind {
        TokenKind::Plus => lhs.checked_add(rhs),
        TokenKind::Minus => lhs.checked_sub(rhs),
        TokenKind::Star => lhs.checked_mul(rhs),
        TokenKind::Slash | TokenKind::Percent if rhs == 0 => {
            return Err(FrontendError::semantic(
                "division by zero in constant expression",
                span,
            ));
        }
        TokenKind::Slash => lhs.checked_div(rhs),
        TokenKind::Percent => lhs.checked_rem(rhs),
        TokenKind::LtLt | TokenKind::GtGt => {
            let amount = u32::try_from(rhs)
                .ok()
                .filter(|amount| *amount < 128)
                .ok_or_else(|| {
                    FrontendError::semantic(format!("invalid shift amount {}", rhs), span)
                })?;
            if matches!(op.kind, TokenKind::LtLt) {
                lhs.checked_shl(amount)
            } else {
                lhs.checked_shr(amount)
            }
        }
        TokenKind::Lt => Some(i128::from(lhs < rhs)),
        TokenKind::Gt => Some(i128::from(lhs > rhs)),
        TokenKind::LtEq => Some(i128::from(lhs <= rhs)),
        TokenKind::GtEq => Some(i128::from(lhs >= rhs)),
        TokenKind::EqEq => Some(i128::from(lhs == rhs)),
        TokenKind::NotEq => Some(i128::from(lhs != rhs)),
        TokenKind::Amp => Some(lhs & rhs),
        TokenKind::Pipe => Some(lhs | rhs),
        TokenKind::Caret => Some(lhs ^ rhs),
        TokenKind::AmpAmp => Some(i128::from(lhs != 0 && rhs != 0)),
        TokenKind::PipePipe => Some(i128::from(lhs != 0 || rhs != 0)),
        _ => {
            return Err(FrontendError::parser(
                format!("unexpected {} in constant expression", op.kind),
                span,
            ));
        }
    };
    result.ok_or_else(|| overflow(span))
}

/// Value of an integer literal; `prefix` bytes of radix marker are skipped
fn integer_literal(text: &str, prefix: usize, radix: u32, span: Span) -> FrontendResult<i128> {
    let digits = text
        .get(prefix..)
        .unwrap_or_default()
        .trim_end_matches(['u', 'U', 'l', 'L']);
    if digits.is_empty() {
        return Ok(0);
    }
    i128::from_str_radix(digits, radix)
        .map_err(|_| FrontendError::lexer(format!("invalid integer literal '{}'", text), span))
}
