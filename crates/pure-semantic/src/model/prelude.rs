//! Built-in declarations available to every program.
//!
//! The prelude is an ordinary source file of native definitions. It is
//! analysed together with the program, so built-in types go through the same
//! declare and determine-types passes as user types. Its node ids start at
//! [`FIRST_NODE_ID`] to stay clear of ids handed out for user trees.

use crate::ast::{Builder, OperatorKind, SourceFile, TypeDef};

pub const FIRST_NODE_ID: u32 = 0x8000_0000;

pub const FILE_NAME: &str = "Prelude";

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const BOOL: &str = "Bool";
pub const STRING: &str = "String";
pub const ERROR: &str = "Error";

/// Build the prelude file.
pub fn file() -> SourceFile {
    let b = Builder::with_first_id(FIRST_NODE_ID);
    let body = b.block(Vec::new());
    b.file(FILE_NAME, body)
        .with_type(number(&b, INT).with_member(b.initializer(1).native()))
        .with_type(
            number(&b, FLOAT)
                .with_member(b.initializer(1).native())
                .with_member(
                    b.initializer(1)
                        .with_parameter(b.param(1, "value", b.ty(INT)))
                        .converting()
                        .native(),
                ),
        )
        .with_type(b.class(1, BOOL).with_member(b.initializer(1).native()))
        .with_type(
            b.class(1, STRING).with_member(b.initializer(1).native()).with_member(
                b.operator(1, OperatorKind::Add)
                    .with_parameter(b.param(1, "other", b.ty(STRING)))
                    .with_return(b.ty(STRING))
                    .native(),
            ),
        )
        .with_type(b.class(1, ERROR).with_member(b.initializer(1).native()))
        .with_type(
            b.class(1, "Range")
                .with_member(
                    b.initializer(1)
                        .with_parameter(b.param(1, "start", b.ty(INT)))
                        .with_parameter(b.param(1, "end", b.ty(INT)))
                        .native(),
                )
                .with_member(
                    b.function(1, "createIterator")
                        .with_return(b.ty("RangeIterator"))
                        .native(),
                ),
        )
        .with_type(
            b.class(1, "RangeIterator")
                .with_member(b.initializer(1).native())
                .with_member(b.computed(1, "currentValue", b.ty(INT), None, None)),
        )
}

/// A numeric class with arithmetic, comparison and step operators.
fn number(b: &Builder, name: &str) -> TypeDef {
    let mut def = b.class(1, name);
    for operator in [
        OperatorKind::Add,
        OperatorKind::Subtract,
        OperatorKind::Multiply,
        OperatorKind::Divide,
    ] {
        def = def.with_member(
            b.operator(1, operator)
                .with_parameter(b.param(1, "other", b.ty(name)))
                .with_return(b.ty(name))
                .native(),
        );
    }
    for operator in [
        OperatorKind::Less,
        OperatorKind::Greater,
        OperatorKind::LessOrEqual,
        OperatorKind::GreaterOrEqual,
    ] {
        def = def.with_member(
            b.operator(1, operator)
                .with_parameter(b.param(1, "other", b.ty(name)))
                .with_return(b.ty(BOOL))
                .native(),
        );
    }
    def.with_member(b.operator(1, OperatorKind::Negate).with_return(b.ty(name)).native())
        .with_member(b.operator(1, OperatorKind::Increment).native())
        .with_member(b.operator(1, OperatorKind::Decrement).native())
}
