//! Constant folding of literal operands.
//!
//! Folding never guesses: any operand combination it cannot evaluate
//! exactly, integer overflow and division by zero yield `None`.

use pure_core::LiteralValue;

use crate::ast::{BinaryOp, StepDirection, UnaryOp};

/// Numeric operand, integers promoted to float when mixed.
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

fn number(value: &LiteralValue) -> Option<Number> {
    match value {
        LiteralValue::Int(value) => Some(Number::Int(*value)),
        LiteralValue::Float(value) => Some(Number::Float(value.into_inner())),
        _ => None,
    }
}

fn as_float(number: Number) -> f64 {
    match number {
        Number::Int(value) => value as f64,
        Number::Float(value) => value,
    }
}

pub fn fold_binary(op: BinaryOp, left: &LiteralValue, right: &LiteralValue) -> Option<LiteralValue> {
    match op {
        BinaryOp::Add => {
            if let (LiteralValue::String(left), LiteralValue::String(right)) = (left, right) {
                return Some(LiteralValue::String(format!("{}{}", left, right)));
            }
            arithmetic(op, number(left)?, number(right)?)
        }
        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => arithmetic(op, number(left)?, number(right)?),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessOrEqual | BinaryOp::GreaterOrEqual => {
            compare(op, number(left)?, number(right)?)
        }
        BinaryOp::Equal | BinaryOp::Identical => Some(LiteralValue::Bool(equals(left, right))),
        BinaryOp::NotEqual | BinaryOp::NotIdentical => Some(LiteralValue::Bool(!equals(left, right))),
        BinaryOp::And => Some(LiteralValue::Bool(left.as_bool()? && right.as_bool()?)),
        BinaryOp::Or => Some(LiteralValue::Bool(left.as_bool()? || right.as_bool()?)),
        BinaryOp::NullCoalesce => Some(if left.is_null() { right.clone() } else { left.clone() }),
    }
}

fn arithmetic(op: BinaryOp, left: Number, right: Number) -> Option<LiteralValue> {
    if let (Number::Int(left), Number::Int(right)) = (left, right) {
        let result = match op {
            BinaryOp::Add => left.checked_add(right),
            BinaryOp::Subtract => left.checked_sub(right),
            BinaryOp::Multiply => left.checked_mul(right),
            _ => left.checked_div(right),
        };
        return result.map(LiteralValue::Int);
    }
    let (left, right) = (as_float(left), as_float(right));
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Subtract => left - right,
        BinaryOp::Multiply => left * right,
        _ if right == 0.0 => return None,
        _ => left / right,
    };
    result.is_finite().then(|| LiteralValue::float(result))
}

fn compare(op: BinaryOp, left: Number, right: Number) -> Option<LiteralValue> {
    let ordering = match (left, right) {
        (Number::Int(left), Number::Int(right)) => left.cmp(&right),
        (left, right) => as_float(left).partial_cmp(&as_float(right))?,
    };
    let result = match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::LessOrEqual => ordering.is_le(),
        _ => ordering.is_ge(),
    };
    Some(LiteralValue::Bool(result))
}

fn equals(left: &LiteralValue, right: &LiteralValue) -> bool {
    match (number(left), number(right)) {
        (Some(Number::Int(left)), Some(Number::Int(right))) => left == right,
        (Some(left), Some(right)) => as_float(left) == as_float(right),
        _ => left == right,
    }
}

pub fn fold_unary(op: UnaryOp, operand: &LiteralValue) -> Option<LiteralValue> {
    match (op, operand) {
        (UnaryOp::Not, LiteralValue::Bool(value)) => Some(LiteralValue::Bool(!value)),
        (UnaryOp::Negate, LiteralValue::Int(value)) => value.checked_neg().map(LiteralValue::Int),
        (UnaryOp::Negate, LiteralValue::Float(value)) => Some(LiteralValue::float(-value.into_inner())),
        _ => None,
    }
}

/// Value after `++` or `--`.
pub fn fold_step(direction: StepDirection, operand: &LiteralValue) -> Option<LiteralValue> {
    let step = LiteralValue::Int(1);
    match direction {
        StepDirection::Increment => fold_binary(BinaryOp::Add, operand, &step),
        StepDirection::Decrement => fold_binary(BinaryOp::Subtract, operand, &step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_is_exact() {
        let folded = fold_binary(BinaryOp::Multiply, &LiteralValue::Int(6), &LiteralValue::Int(7));
        assert_eq!(folded, Some(LiteralValue::Int(42)));
        let overflow = fold_binary(BinaryOp::Add, &LiteralValue::Int(i64::MAX), &LiteralValue::Int(1));
        assert_eq!(overflow, None);
    }

    #[test]
    fn division_by_zero_is_unknown() {
        assert_eq!(fold_binary(BinaryOp::Divide, &LiteralValue::Int(1), &LiteralValue::Int(0)), None);
        assert_eq!(
            fold_binary(BinaryOp::Divide, &LiteralValue::float(1.0), &LiteralValue::float(0.0)),
            None
        );
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        let folded = fold_binary(BinaryOp::Add, &LiteralValue::Int(1), &LiteralValue::float(0.5));
        assert_eq!(folded, Some(LiteralValue::float(1.5)));
        let equal = fold_binary(BinaryOp::Equal, &LiteralValue::Int(2), &LiteralValue::float(2.0));
        assert_eq!(equal, Some(LiteralValue::Bool(true)));
    }

    #[test]
    fn non_numeric_operands_are_not_folded() {
        assert_eq!(fold_binary(BinaryOp::Less, &LiteralValue::Null, &LiteralValue::Int(1)), None);
        assert_eq!(fold_binary(BinaryOp::And, &LiteralValue::Int(1), &LiteralValue::Bool(true)), None);
        assert_eq!(fold_unary(UnaryOp::Not, &LiteralValue::Int(1)), None);
    }

    #[test]
    fn strings_concatenate_and_null_coalesces() {
        let joined = fold_binary(
            BinaryOp::Add,
            &LiteralValue::String("ab".to_string()),
            &LiteralValue::String("c".to_string()),
        );
        assert_eq!(joined, Some(LiteralValue::String("abc".to_string())));
        assert_eq!(
            fold_binary(BinaryOp::NullCoalesce, &LiteralValue::Null, &LiteralValue::Int(3)),
            Some(LiteralValue::Int(3))
        );
    }

    #[test]
    fn steps_fold_like_addition() {
        assert_eq!(fold_step(StepDirection::Increment, &LiteralValue::Int(1)), Some(LiteralValue::Int(2)));
        assert_eq!(fold_step(StepDirection::Decrement, &LiteralValue::Int(i64::MIN)), None);
    }
}
